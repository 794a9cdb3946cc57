// src/models/mod.rs

pub mod employee;
pub mod medicine;
pub mod prescription;
pub mod sale;
pub mod ticket;

pub use employee::*;
pub use medicine::*;
pub use prescription::*;
pub use sale::*;
pub use ticket::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, AsRefStr};

// ==================== DASHBOARD ====================

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_medicines: i64,
    pub low_stock_medicines: i64,
    pub out_of_stock_medicines: i64,
    pub expiring_soon_medicines: i64,
    pub inventory_value: f64,
    pub sales_today: i64,
    pub revenue_today: f64,
    pub total_revenue: f64,
    pub pending_prescriptions: i64,
    pub active_employees: i64,
    pub open_tickets: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Sale,
    Prescription,
    Ticket,
    Medicine,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub entity_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub medicine_id: String,
    pub medicine_name: String,
    pub message: String,
}
