// src/db.rs - Postgres schema for the remote store
//
// Column names follow the abbreviated layout the hosted database has always
// used (mfr, exp_date, batch_no, ...). `PgStore` owns the mapping to the
// camelCase domain model.

use sqlx::PgPool;

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS medicines (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK(length(name) > 0 AND length(name) <= 255),
            category TEXT NOT NULL,
            strength TEXT,
            mfr TEXT NOT NULL,
            stock BIGINT NOT NULL DEFAULT 0 CHECK(stock >= 0),
            min_stock BIGINT NOT NULL DEFAULT 0 CHECK(min_stock >= 0),
            max_stock BIGINT NOT NULL DEFAULT 0,
            price DOUBLE PRECISION NOT NULL CHECK(price >= 0),
            exp_date DATE,
            batch_no TEXT,
            loc TEXT,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            cust_name TEXT,
            cust_phone TEXT,
            items JSONB NOT NULL DEFAULT '[]'::jsonb,
            total DOUBLE PRECISION NOT NULL CHECK(total >= 0),
            pay_method TEXT NOT NULL CHECK(pay_method IN ('cash', 'card', 'insurance', 'mobile')),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prescriptions (
            id TEXT PRIMARY KEY,
            patient_name TEXT NOT NULL,
            patient_age INTEGER NOT NULL CHECK(patient_age >= 0 AND patient_age <= 150),
            doctor_name TEXT NOT NULL,
            medicines TEXT[] NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'pending' CHECK(
                status IN ('pending', 'verified', 'rejected', 'dispensed')
            ),
            verified_by TEXT,
            verify_notes TEXT,
            approved BOOLEAN,
            verified_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            role TEXT NOT NULL,
            dept TEXT,
            salary DOUBLE PRECISION NOT NULL DEFAULT 0 CHECK(salary >= 0),
            hire_date DATE NOT NULL,
            status TEXT NOT NULL DEFAULT 'active' CHECK(
                status IN ('active', 'inactive', 'on_leave')
            ),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS time_entries (
            id TEXT PRIMARY KEY,
            emp_id TEXT NOT NULL REFERENCES employees (id) ON DELETE CASCADE,
            work_date DATE NOT NULL,
            clock_in TIMESTAMPTZ NOT NULL,
            clock_out TIMESTAMPTZ,
            hours DOUBLE PRECISION
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tickets (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            descr TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'general',
            priority TEXT NOT NULL DEFAULT 'medium' CHECK(
                priority IN ('low', 'medium', 'high', 'urgent')
            ),
            status TEXT NOT NULL DEFAULT 'open' CHECK(
                status IN ('open', 'in_progress', 'resolved', 'closed')
            ),
            created_by TEXT NOT NULL,
            assigned_to TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_medicines_name ON medicines (LOWER(name))",
        "CREATE INDEX IF NOT EXISTS idx_medicines_category ON medicines (category)",
        "CREATE INDEX IF NOT EXISTS idx_medicines_exp_date ON medicines (exp_date)",
        "CREATE INDEX IF NOT EXISTS idx_sales_created_at ON sales (created_at)",
        "CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions (status)",
        "CREATE INDEX IF NOT EXISTS idx_time_entries_emp ON time_entries (emp_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_time_entries_one_open ON time_entries (emp_id) WHERE clock_out IS NULL",
        "CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets (status)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    log::info!("Database schema is up to date");
    Ok(())
}
