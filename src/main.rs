// src/main.rs
use actix_web::{
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpServer,
};
use actix_web::http::header;
use actix_web_httpauth::middleware::HttpAuthentication;
use actix_cors::Cors;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod dashboard;
mod dashboard_handlers;
mod db;
mod employee_handlers;
mod error;
mod handlers;
mod medicine_handlers;
mod models;
mod monitoring;
mod prescription_handlers;
mod sale_handlers;
mod store;
mod ticket_handlers;
pub mod validator;


use auth::{token_middleware, TokenAuth};
use config::{load_config, Config, StorageMode};
use monitoring::{Metrics, RequestLogger};
use store::Repository;

pub struct AppState {
    pub repository: Repository,
    pub config: Config,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(repository: Repository, config: Config) -> Self {
        Self {
            repository,
            config,
            started_at: Utc::now(),
        }
    }
}

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    setup_logging(&config)?;
    config.print_startup_info();

    if config.is_production() {
        validate_production_config(&config)?;
    }

    let repository = Repository::from_config(&config)
        .await
        .context("Failed to set up storage")?;

    // A primary that is down at boot is not fatal; schema creation is retried via /api/init-db.
    match repository.initialize().await {
        Ok(served) if served.degraded => log::warn!("Storage initialised on fallback {} store only", served.source),
        Ok(served) => log::info!("Storage initialised on {} store", served.source),
        Err(e) => log::warn!("Storage initialisation failed, continuing: {}", e),
    }

    let app_state = Arc::new(AppState::new(repository, config.clone()));

    if config.storage.mode == StorageMode::RemoteWithFallback && config.storage.probe_interval_seconds > 0 {
        let watchdog_state = app_state.clone();
        let period = Duration::from_secs(config.storage.probe_interval_seconds);
        tokio::spawn(async move {
            monitoring::start_storage_watchdog(watchdog_state, period).await;
        });
    }

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let metrics_arc = Arc::new(Metrics::new());
    let metrics = web::Data::new(metrics_arc.clone());
    let token_auth = web::Data::new(TokenAuth::new(config.auth.api_token.trim()));
    let server_config = config.server.clone();

    let mut server = HttpServer::new(move || {
        let cors = setup_improved_cors(&config.security.allowed_origins, config.is_production());
        let security_headers = setup_security_headers(&config.security);

        App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .wrap(RequestLogger::new(metrics_arc.clone()))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(token_auth.clone())
            .app_data(metrics.clone())
            .app_data(json_config(config.security.max_request_size))
            .app_data(query_config())
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(server_config.keep_alive))
    .client_request_timeout(Duration::from_secs(server_config.client_timeout))
    .client_disconnect_timeout(Duration::from_secs(server_config.client_shutdown));

    if let Some(workers) = server_config.workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await
        .context("Server failed to run")?;

    Ok(())
}

// ==================== ROUTES ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Health check and metrics (no auth)
    cfg.service(
        web::scope("/health")
            .route("", web::get().to(monitoring::health_check))
            .route("/metrics", web::get().to(monitoring::metrics_endpoint)),
    );

    cfg.service(
        web::scope("/api")
            .wrap(HttpAuthentication::bearer(token_middleware))
            .route("/init-db", web::post().to(handlers::init_db))

            // Inventory
            .service(
                web::scope("/medicines")
                    .route("", web::get().to(medicine_handlers::get_medicines))
                    .route("", web::post().to(medicine_handlers::create_medicine))
                    .route("/{id}", web::get().to(medicine_handlers::get_medicine))
                    .route("/{id}", web::put().to(medicine_handlers::update_medicine))
                    .route("/{id}", web::delete().to(medicine_handlers::delete_medicine))
                    .route("/{id}/stock", web::post().to(medicine_handlers::adjust_stock)),
            )

            // Sales; /export must precede /{id}
            .service(
                web::scope("/sales")
                    .route("", web::get().to(sale_handlers::get_sales))
                    .route("", web::post().to(sale_handlers::create_sale))
                    .route("/export", web::get().to(sale_handlers::export_sales))
                    .route("/{id}", web::get().to(sale_handlers::get_sale)),
            )

            .service(
                web::scope("/prescriptions")
                    .route("", web::get().to(prescription_handlers::get_prescriptions))
                    .route("", web::post().to(prescription_handlers::create_prescription))
                    .route("/{id}", web::get().to(prescription_handlers::get_prescription))
                    .route("/{id}/status", web::patch().to(prescription_handlers::update_prescription_status))
                    .route("/{id}/verify", web::post().to(prescription_handlers::verify_prescription)),
            )

            // Staff and time tracking
            .service(
                web::scope("/employees")
                    .route("", web::get().to(employee_handlers::get_employees))
                    .route("", web::post().to(employee_handlers::create_employee))
                    .route("/{id}", web::get().to(employee_handlers::get_employee))
                    .route("/{id}", web::put().to(employee_handlers::update_employee))
                    .route("/{id}", web::delete().to(employee_handlers::delete_employee))
                    .route("/{id}/clock-in", web::post().to(employee_handlers::clock_in))
                    .route("/{id}/clock-out", web::post().to(employee_handlers::clock_out))
                    .route("/{id}/time-entries", web::get().to(employee_handlers::get_employee_time_entries)),
            )
            .route("/time-entries", web::get().to(employee_handlers::get_time_entries))

            .service(
                web::scope("/tickets")
                    .route("", web::get().to(ticket_handlers::get_tickets))
                    .route("", web::post().to(ticket_handlers::create_ticket))
                    .route("/{id}", web::get().to(ticket_handlers::get_ticket))
                    .route("/{id}", web::put().to(ticket_handlers::update_ticket))
                    .route("/{id}", web::delete().to(ticket_handlers::delete_ticket))
                    .route("/{id}/status", web::patch().to(ticket_handlers::update_ticket_status)),
            )

            .service(
                web::scope("/dashboard")
                    .route("/stats", web::get().to(dashboard_handlers::get_dashboard_stats))
                    .route("/activity", web::get().to(dashboard_handlers::get_recent_activity))
                    .route("/alerts", web::get().to(dashboard_handlers::get_alerts)),
            ),
    );
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(handlers::json_error_handler)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(handlers::query_error_handler)
}

// ==================== HELPER FUNCTIONS ====================

pub fn setup_improved_cors(allowed_origins: &[String], is_production: bool) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![
            header::CONTENT_LENGTH,
            header::CONTENT_DISPOSITION,
            header::HeaderName::from_static("x-data-source"),
            header::HeaderName::from_static("x-degraded-mode"),
        ])
        .max_age(3600);

    // Wildcards are refused earlier by validate_production_config.
    if allowed_origins.iter().any(|o| o == "*") && !is_production {
        log::warn!("⚠️  Using wildcard CORS (*) in development mode");
        return cors.allow_any_origin();
    }

    for origin in allowed_origins.iter().filter(|o| !o.is_empty() && o.as_str() != "*") {
        log::debug!("Adding CORS origin: {}", origin);
        cors = cors.allowed_origin(origin);
    }
    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to initialise logging")?;
    }

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.auth.api_token == config::AuthConfig::default().api_token {
        anyhow::bail!("Default API token in production! Set API_TOKEN.");
    }

    if config.security.allowed_origins.contains(&"*".to_string()) {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    Ok(())
}

fn setup_security_headers(config: &config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}
