// src/store/mod.rs
//! Storage backends behind a single trait.
//!
//! `PgStore` talks to the hosted Postgres instance, `JsonStore` keeps every
//! collection in one JSON document on local disk. Handlers never see either
//! directly: they go through [`Repository`], which picks the backend from
//! configuration and reports which one served each call.

pub mod local;
pub mod postgres;
pub mod repository;

pub use local::JsonStore;
pub use postgres::PgStore;
pub use repository::{Repository, Served, StoreStatus};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, AsRefStr};
use std::fmt;

use crate::models::*;

// ==================== ERRORS ====================

#[derive(Debug)]
pub enum StoreError {
    NotFound { entity: &'static str, id: String },
    InsufficientStock { available: i64, requested: i64 },
    Conflict(String),
    /// The merged record breaks a domain rule.
    Invalid(String),
    /// The backend could not be reached (network, pool, TLS).
    Unavailable(String),
    /// The backend answered but the schema has not been created.
    TableMissing(String),
    Backend(String),
    Io(String),
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }

    /// Errors that make a fallback store worth trying.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::TableMissing(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{} '{}' not found", entity, id),
            StoreError::InsufficientStock { available, requested } => write!(
                f,
                "Insufficient stock (available {}, requested {})",
                available, requested
            ),
            StoreError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            StoreError::Invalid(msg) => write!(f, "Invalid: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::TableMissing(msg) => write!(f, "Table missing: {}", msg),
            StoreError::Backend(msg) => write!(f, "Backend error: {}", msg),
            StoreError::Io(msg) => write!(f, "I/O error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StockShortfall> for StoreError {
    fn from(shortfall: StockShortfall) -> Self {
        StoreError::InsufficientStock {
            available: shortfall.available,
            requested: shortfall.requested,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

// ==================== SOURCE ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Remote,
    Local,
}

// ==================== STORE TRAIT ====================

/// Persistence operations shared by every backend.
///
/// Entities arrive fully built, with ids and timestamps assigned by the caller.
#[async_trait]
pub trait PharmacyStore: Send + Sync {
    fn source(&self) -> DataSource;

    /// Human-readable location, for logs and the health endpoint.
    fn describe(&self) -> String;

    /// Creates the schema or the empty document.
    async fn init(&self) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;

    // Medicines
    async fn list_medicines(&self, filter: &MedicineFilter) -> StoreResult<Vec<Medicine>>;
    async fn get_medicine(&self, id: &str) -> StoreResult<Medicine>;
    async fn create_medicine(&self, medicine: &Medicine) -> StoreResult<Medicine>;
    async fn update_medicine(&self, id: &str, update: &UpdateMedicineRequest) -> StoreResult<Medicine>;
    /// Soft delete: the record stays with `active = false`.
    async fn deactivate_medicine(&self, id: &str) -> StoreResult<Medicine>;
    async fn adjust_stock(&self, id: &str, adjustment: StockAdjustment) -> StoreResult<Medicine>;

    // Sales
    async fn list_sales(&self, filter: &SaleFilter) -> StoreResult<Vec<Sale>>;
    async fn get_sale(&self, id: &str) -> StoreResult<Sale>;
    /// Prices the lines from inventory, decrements stock for each line and
    /// stores the sale as one unit of work.
    async fn record_sale(&self, sale: &NewSale) -> StoreResult<Sale>;

    // Prescriptions
    async fn list_prescriptions(&self, status: Option<PrescriptionStatus>) -> StoreResult<Vec<Prescription>>;
    async fn get_prescription(&self, id: &str) -> StoreResult<Prescription>;
    async fn create_prescription(&self, prescription: &Prescription) -> StoreResult<Prescription>;
    async fn set_prescription_status(&self, id: &str, status: PrescriptionStatus) -> StoreResult<Prescription>;
    async fn verify_prescription(&self, id: &str, request: &VerifyPrescriptionRequest) -> StoreResult<Prescription>;

    // Employees
    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;
    async fn get_employee(&self, id: &str) -> StoreResult<Employee>;
    async fn create_employee(&self, employee: &Employee) -> StoreResult<Employee>;
    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> StoreResult<Employee>;
    async fn delete_employee(&self, id: &str) -> StoreResult<()>;

    // Time tracking
    async fn list_time_entries(&self, employee_id: Option<&str>) -> StoreResult<Vec<TimeEntry>>;
    async fn clock_in(&self, employee_id: &str) -> StoreResult<TimeEntry>;
    async fn clock_out(&self, employee_id: &str) -> StoreResult<TimeEntry>;

    // Tickets
    async fn list_tickets(&self, status: Option<TicketStatus>) -> StoreResult<Vec<Ticket>>;
    async fn get_ticket(&self, id: &str) -> StoreResult<Ticket>;
    async fn create_ticket(&self, ticket: &Ticket) -> StoreResult<Ticket>;
    async fn update_ticket(&self, id: &str, update: &TicketUpdate) -> StoreResult<Ticket>;
    async fn set_ticket_status(&self, id: &str, status: TicketStatus) -> StoreResult<Ticket>;
    async fn delete_ticket(&self, id: &str) -> StoreResult<()>;
}
