// src/models/employee.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use strum::{EnumString, Display, AsRefStr};
use uuid::Uuid;

use super::sale::round_currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
}

// ==================== EMPLOYEE ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub department: Option<String>,
    pub salary: f64,
    pub hire_date: NaiveDate,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn new(request: CreateEmployeeRequest, status: EmployeeStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            phone: request.phone.trim().to_string(),
            role: request.role.trim().to_string(),
            department: request.department,
            salary: request.salary,
            hire_date: request.hire_date,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: &EmployeeUpdate, now: DateTime<Utc>) {
        let fields = &update.fields;
        if let Some(ref v) = fields.name { self.name = v.trim().to_string(); }
        if let Some(ref v) = fields.email { self.email = v.trim().to_lowercase(); }
        if let Some(ref v) = fields.phone { self.phone = v.trim().to_string(); }
        if let Some(ref v) = fields.role { self.role = v.trim().to_string(); }
        if let Some(ref v) = fields.department { self.department = Some(v.clone()); }
        if let Some(v) = fields.salary { self.salary = v; }
        if let Some(v) = fields.hire_date { self.hire_date = v; }
        if let Some(v) = update.status { self.status = v; }
        self.updated_at = now;
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: String,
    #[validate(length(max = 255, message = "Email cannot exceed 255 characters"))]
    pub email: String,
    #[validate(length(max = 30, message = "Phone cannot exceed 30 characters"))]
    pub phone: String,
    #[validate(length(max = 100, message = "Role cannot exceed 100 characters"))]
    pub role: String,
    #[validate(length(max = 100, message = "Department cannot exceed 100 characters"))]
    pub department: Option<String>,
    pub salary: f64,
    pub hire_date: NaiveDate,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Email cannot exceed 255 characters"))]
    pub email: Option<String>,
    #[validate(length(max = 30, message = "Phone cannot exceed 30 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "Role cannot exceed 100 characters"))]
    pub role: Option<String>,
    #[validate(length(max = 100, message = "Department cannot exceed 100 characters"))]
    pub department: Option<String>,
    pub salary: Option<f64>,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<String>,
}

/// An update request whose status string has already been parsed.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub fields: UpdateEmployeeRequest,
    pub status: Option<EmployeeStatus>,
}

// ==================== TIME TRACKING ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub hours_worked: Option<f64>,
}

impl TimeEntry {
    pub fn open(employee_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            employee_id: employee_id.to_string(),
            date: at.date_naive(),
            clock_in: at,
            clock_out: None,
            hours_worked: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    pub fn close(&mut self, at: DateTime<Utc>) {
        let seconds = (at - self.clock_in).num_seconds().max(0);
        self.clock_out = Some(at);
        self.hours_worked = Some(round_currency(seconds as f64 / 3600.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_close_computes_hours() {
        let start = Utc::now();
        let mut entry = TimeEntry::open("emp-1", start);
        assert!(entry.is_open());
        entry.close(start + Duration::minutes(450));
        assert!(!entry.is_open());
        assert_eq!(entry.hours_worked, Some(7.5));
    }

    #[test]
    fn test_close_before_open_yields_zero_hours() {
        let start = Utc::now();
        let mut entry = TimeEntry::open("emp-1", start);
        entry.close(start - Duration::minutes(5));
        assert_eq!(entry.hours_worked, Some(0.0));
    }

    #[test]
    fn test_status_wire_names() {
        use std::str::FromStr;
        assert_eq!(EmployeeStatus::from_str("on_leave").unwrap(), EmployeeStatus::OnLeave);
        assert_eq!(serde_json::to_value(EmployeeStatus::OnLeave).unwrap(), "on_leave");
    }
}
