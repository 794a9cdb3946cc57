// src/store/repository.rs
//! Store selection and the remote-to-local fallback path.

use anyhow::Context;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{DataSource, JsonStore, PgStore, PharmacyStore, StoreError, StoreResult};
use crate::config::{Config, StorageMode};
use crate::models::*;

/// A result together with the store that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub data: T,
    pub source: DataSource,
    pub degraded: bool,
}

impl<T> Served<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        Served {
            data: f(self.data),
            source: self.source,
            degraded: self.degraded,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub mode: StorageMode,
    pub primary: String,
    pub primary_reachable: bool,
    pub fallback: Option<String>,
    pub degraded: bool,
}

/// Everything the dashboard needs, read in one fan-out.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub medicines: Vec<Medicine>,
    pub sales: Vec<Sale>,
    pub prescriptions: Vec<Prescription>,
    pub employees: Vec<Employee>,
    pub tickets: Vec<Ticket>,
}

async fn open_local(config: &Config) -> anyhow::Result<Arc<dyn PharmacyStore>> {
    let storage = &config.storage;
    let store = JsonStore::open(&storage.local_path, storage.local_stock_policy)
        .await
        .with_context(|| format!("Failed to open local store {}", storage.local_path))?;
    Ok(Arc::new(store))
}

fn connect_remote(config: &Config) -> anyhow::Result<Arc<dyn PharmacyStore>> {
    let store = PgStore::connect_lazy(&config.database, StockPolicy::Strict)
        .context("Failed to configure database pool")?;
    Ok(Arc::new(store))
}

pub struct Repository {
    mode: StorageMode,
    primary: Arc<dyn PharmacyStore>,
    fallback: Option<Arc<dyn PharmacyStore>>,
    degraded: AtomicBool,
}

/// Runs `$call` against the primary store and, when it reports the backend
/// as unavailable, once more against the fallback.
macro_rules! served {
    ($self:ident, $op:expr, |$store:ident| $call:expr) => {{
        let $store = &$self.primary;
        match $call.await {
            Ok(data) => {
                $self.mark_recovered();
                Ok(Served { data, source: $self.primary.source(), degraded: false })
            }
            Err(err) if err.is_unavailable() => match $self.fallback {
                Some(ref fallback_store) => {
                    $self.mark_degraded($op, &err);
                    let $store = fallback_store;
                    let data = $call.await?;
                    Ok(Served { data, source: fallback_store.source(), degraded: true })
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }};
}

impl Repository {
    pub fn new(
        mode: StorageMode,
        primary: Arc<dyn PharmacyStore>,
        fallback: Option<Arc<dyn PharmacyStore>>,
    ) -> Self {
        Self {
            mode,
            primary,
            fallback,
            degraded: AtomicBool::new(false),
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mode = config.storage.mode;
        let repository = match mode {
            StorageMode::Local => Self::new(mode, open_local(config).await?, None),
            StorageMode::Remote => Self::new(mode, connect_remote(config)?, None),
            StorageMode::RemoteWithFallback => {
                Self::new(mode, connect_remote(config)?, Some(open_local(config).await?))
            }
        };

        info!(
            "Storage mode {}: primary {}, fallback {}",
            repository.mode,
            repository.primary.describe(),
            repository
                .fallback
                .as_ref()
                .map(|f| f.describe())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(repository)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn mark_degraded(&self, op: &str, err: &StoreError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(
                "Primary store {} unavailable ({}); entering degraded mode, serving from fallback",
                self.primary.describe(),
                err
            );
        }
        warn!("{} served by fallback store: {}", op, err);
    }

    fn mark_recovered(&self) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            info!(
                "Primary store {} reachable again; leaving degraded mode. Records written to the fallback meanwhile stay there",
                self.primary.describe()
            );
        }
    }

    pub async fn status(&self) -> StoreStatus {
        let primary_reachable = match self.primary.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Primary store ping failed: {}", e);
                false
            }
        };

        StoreStatus {
            mode: self.mode,
            primary: self.primary.describe(),
            primary_reachable,
            fallback: self.fallback.as_ref().map(|f| f.describe()),
            degraded: self.is_degraded(),
        }
    }

    /// Pings the primary and leaves degraded mode when it answers.
    pub async fn probe_primary(&self) -> bool {
        match self.primary.ping().await {
            Ok(()) => {
                self.mark_recovered();
                true
            }
            Err(e) => {
                debug!("Primary store probe failed: {}", e);
                false
            }
        }
    }

    /// Creates the schema on the primary; a configured fallback document is
    /// initialised as well.
    pub async fn initialize(&self) -> StoreResult<Served<()>> {
        if let Some(ref fallback) = self.fallback {
            if let Err(e) = fallback.init().await {
                warn!("Failed to initialise fallback store {}: {}", fallback.describe(), e);
            }
        }
        served!(self, "initialize", |store| store.init())
    }

    // ==================== MEDICINES ====================

    pub async fn list_medicines(&self, filter: &MedicineFilter) -> StoreResult<Served<Vec<Medicine>>> {
        served!(self, "list_medicines", |store| store.list_medicines(filter))
    }

    pub async fn get_medicine(&self, id: &str) -> StoreResult<Served<Medicine>> {
        served!(self, "get_medicine", |store| store.get_medicine(id))
    }

    pub async fn create_medicine(&self, medicine: &Medicine) -> StoreResult<Served<Medicine>> {
        served!(self, "create_medicine", |store| store.create_medicine(medicine))
    }

    pub async fn update_medicine(&self, id: &str, update: &UpdateMedicineRequest) -> StoreResult<Served<Medicine>> {
        served!(self, "update_medicine", |store| store.update_medicine(id, update))
    }

    pub async fn deactivate_medicine(&self, id: &str) -> StoreResult<Served<Medicine>> {
        served!(self, "deactivate_medicine", |store| store.deactivate_medicine(id))
    }

    pub async fn adjust_stock(&self, id: &str, adjustment: StockAdjustment) -> StoreResult<Served<Medicine>> {
        served!(self, "adjust_stock", |store| store.adjust_stock(id, adjustment))
    }

    // ==================== SALES ====================

    pub async fn list_sales(&self, filter: &SaleFilter) -> StoreResult<Served<Vec<Sale>>> {
        served!(self, "list_sales", |store| store.list_sales(filter))
    }

    pub async fn get_sale(&self, id: &str) -> StoreResult<Served<Sale>> {
        served!(self, "get_sale", |store| store.get_sale(id))
    }

    pub async fn record_sale(&self, sale: &NewSale) -> StoreResult<Served<Sale>> {
        served!(self, "record_sale", |store| store.record_sale(sale))
    }

    // ==================== PRESCRIPTIONS ====================

    pub async fn list_prescriptions(&self, status: Option<PrescriptionStatus>) -> StoreResult<Served<Vec<Prescription>>> {
        served!(self, "list_prescriptions", |store| store.list_prescriptions(status))
    }

    pub async fn get_prescription(&self, id: &str) -> StoreResult<Served<Prescription>> {
        served!(self, "get_prescription", |store| store.get_prescription(id))
    }

    pub async fn create_prescription(&self, prescription: &Prescription) -> StoreResult<Served<Prescription>> {
        served!(self, "create_prescription", |store| store.create_prescription(prescription))
    }

    pub async fn set_prescription_status(
        &self,
        id: &str,
        status: PrescriptionStatus,
    ) -> StoreResult<Served<Prescription>> {
        served!(self, "set_prescription_status", |store| store.set_prescription_status(id, status))
    }

    pub async fn verify_prescription(
        &self,
        id: &str,
        request: &VerifyPrescriptionRequest,
    ) -> StoreResult<Served<Prescription>> {
        served!(self, "verify_prescription", |store| store.verify_prescription(id, request))
    }

    // ==================== EMPLOYEES ====================

    pub async fn list_employees(&self) -> StoreResult<Served<Vec<Employee>>> {
        served!(self, "list_employees", |store| store.list_employees())
    }

    pub async fn get_employee(&self, id: &str) -> StoreResult<Served<Employee>> {
        served!(self, "get_employee", |store| store.get_employee(id))
    }

    pub async fn create_employee(&self, employee: &Employee) -> StoreResult<Served<Employee>> {
        served!(self, "create_employee", |store| store.create_employee(employee))
    }

    pub async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> StoreResult<Served<Employee>> {
        served!(self, "update_employee", |store| store.update_employee(id, update))
    }

    pub async fn delete_employee(&self, id: &str) -> StoreResult<Served<()>> {
        served!(self, "delete_employee", |store| store.delete_employee(id))
    }

    pub async fn list_time_entries(&self, employee_id: Option<&str>) -> StoreResult<Served<Vec<TimeEntry>>> {
        served!(self, "list_time_entries", |store| store.list_time_entries(employee_id))
    }

    pub async fn clock_in(&self, employee_id: &str) -> StoreResult<Served<TimeEntry>> {
        served!(self, "clock_in", |store| store.clock_in(employee_id))
    }

    pub async fn clock_out(&self, employee_id: &str) -> StoreResult<Served<TimeEntry>> {
        served!(self, "clock_out", |store| store.clock_out(employee_id))
    }

    // ==================== TICKETS ====================

    pub async fn list_tickets(&self, status: Option<TicketStatus>) -> StoreResult<Served<Vec<Ticket>>> {
        served!(self, "list_tickets", |store| store.list_tickets(status))
    }

    pub async fn get_ticket(&self, id: &str) -> StoreResult<Served<Ticket>> {
        served!(self, "get_ticket", |store| store.get_ticket(id))
    }

    pub async fn create_ticket(&self, ticket: &Ticket) -> StoreResult<Served<Ticket>> {
        served!(self, "create_ticket", |store| store.create_ticket(ticket))
    }

    pub async fn update_ticket(&self, id: &str, update: &TicketUpdate) -> StoreResult<Served<Ticket>> {
        served!(self, "update_ticket", |store| store.update_ticket(id, update))
    }

    pub async fn set_ticket_status(&self, id: &str, status: TicketStatus) -> StoreResult<Served<Ticket>> {
        served!(self, "set_ticket_status", |store| store.set_ticket_status(id, status))
    }

    pub async fn delete_ticket(&self, id: &str) -> StoreResult<Served<()>> {
        served!(self, "delete_ticket", |store| store.delete_ticket(id))
    }

    // ==================== DASHBOARD ====================

    pub async fn dashboard_snapshot(&self) -> StoreResult<Served<DashboardSnapshot>> {
        let all_medicines = MedicineFilter::default();
        let all_sales = SaleFilter::default();

        let (medicines, sales, prescriptions, employees, tickets) = futures::try_join!(
            self.list_medicines(&all_medicines),
            self.list_sales(&all_sales),
            self.list_prescriptions(None),
            self.list_employees(),
            self.list_tickets(None),
        )?;

        let degraded = medicines.degraded
            || sales.degraded
            || prescriptions.degraded
            || employees.degraded
            || tickets.degraded;
        let source = [
            medicines.source,
            sales.source,
            prescriptions.source,
            employees.source,
            tickets.source,
        ]
        .into_iter()
        .find(|s| *s != self.primary.source())
        .unwrap_or_else(|| self.primary.source());

        Ok(Served {
            data: DashboardSnapshot {
                medicines: medicines.data,
                sales: sales.data,
                prescriptions: prescriptions.data,
                employees: employees.data,
                tickets: tickets.data,
            },
            source,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use chrono::Utc;

    fn unreachable_pg() -> Arc<dyn PharmacyStore> {
        let config = DatabaseConfig {
            url: "postgres://nobody@127.0.0.1:1/none".to_string(),
            max_connections: 1,
            min_connections: 0,
            acquire_timeout_seconds: 1,
            idle_timeout_seconds: 60,
        };
        Arc::new(PgStore::connect_lazy(&config, StockPolicy::Strict).unwrap())
    }

    fn sample_medicine() -> Medicine {
        Medicine::new(
            CreateMedicineRequest {
                name: "Aspirin".to_string(),
                category: "Pain Relief".to_string(),
                strength: None,
                manufacturer: "Acme".to_string(),
                stock: 10,
                min_stock: 2,
                max_stock: 50,
                price: 3.0,
                expiry_date: None,
                batch_number: None,
                location: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_local_mode_serves_from_local() {
        let repo = Repository::new(
            StorageMode::Local,
            Arc::new(JsonStore::in_memory(StockPolicy::Clamp)),
            None,
        );
        let served = repo.create_medicine(&sample_medicine()).await.unwrap();
        assert_eq!(served.source, DataSource::Local);
        assert!(!served.degraded);
        assert!(!repo.is_degraded());
    }

    #[tokio::test]
    async fn test_unreachable_primary_falls_back_and_reports_degraded() {
        let local = Arc::new(JsonStore::in_memory(StockPolicy::Clamp));
        let repo = Repository::new(
            StorageMode::RemoteWithFallback,
            unreachable_pg(),
            Some(local.clone() as Arc<dyn PharmacyStore>),
        );

        let medicine = sample_medicine();
        let served = repo.create_medicine(&medicine).await.unwrap();
        assert_eq!(served.source, DataSource::Local);
        assert!(served.degraded);
        assert!(repo.is_degraded());

        // The write landed in the local document.
        assert_eq!(local.get_medicine(&medicine.id).await.unwrap().name, "Aspirin");

        let status = repo.status().await;
        assert!(status.degraded);
        assert!(!status.primary_reachable);
    }

    #[tokio::test]
    async fn test_unreachable_primary_without_fallback_is_an_error() {
        let repo = Repository::new(StorageMode::Remote, unreachable_pg(), None);
        let err = repo.list_employees().await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_domain_errors_do_not_trigger_fallback() {
        let primary = Arc::new(JsonStore::in_memory(StockPolicy::Strict));
        let fallback = Arc::new(JsonStore::in_memory(StockPolicy::Clamp));
        let repo = Repository::new(
            StorageMode::RemoteWithFallback,
            primary,
            Some(fallback as Arc<dyn PharmacyStore>),
        );

        let err = repo.get_medicine("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(!repo.is_degraded());
    }

    #[tokio::test]
    async fn test_dashboard_snapshot_reads_every_collection() {
        let repo = Repository::new(
            StorageMode::Local,
            Arc::new(JsonStore::in_memory(StockPolicy::Clamp)),
            None,
        );
        repo.create_medicine(&sample_medicine()).await.unwrap();

        let snapshot = repo.dashboard_snapshot().await.unwrap();
        assert_eq!(snapshot.data.medicines.len(), 1);
        assert!(snapshot.data.sales.is_empty());
        assert_eq!(snapshot.source, DataSource::Local);
        assert!(!snapshot.degraded);
    }
}
