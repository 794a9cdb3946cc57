// src/models/ticket.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};
use strum::{EnumString, Display, AsRefStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(request: CreateTicketRequest, priority: TicketPriority, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            category: request.category.unwrap_or_else(|| "general".to_string()),
            priority,
            status: TicketStatus::Open,
            created_by: request.created_by.trim().to_string(),
            assigned_to: request.assigned_to,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: &TicketUpdate, now: DateTime<Utc>) {
        let fields = &update.fields;
        if let Some(ref v) = fields.title { self.title = v.trim().to_string(); }
        if let Some(ref v) = fields.description { self.description = v.trim().to_string(); }
        if let Some(ref v) = fields.category { self.category = v.clone(); }
        if let Some(ref v) = fields.assigned_to { self.assigned_to = Some(v.clone()); }
        if let Some(v) = update.priority { self.priority = v; }
        if let Some(v) = update.status { self.status = v; }
        self.updated_at = now;
    }

    /// Returns false when the ticket already had `status`.
    pub fn set_status(&mut self, status: TicketStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    #[validate(length(max = 255, message = "Title cannot exceed 255 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description cannot exceed 5000 characters"))]
    pub description: String,
    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,
    pub priority: Option<String>,
    #[validate(length(max = 255, message = "Creator cannot exceed 255 characters"))]
    pub created_by: String,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    #[validate(length(max = 255, message = "Title cannot exceed 255 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description cannot exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub fields: UpdateTicketRequest,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
}
