// src/validator.rs - Centralized validation module
use std::str::FromStr;
use serde::Serialize;
use regex::Regex;
use lazy_static::lazy_static;
use chrono::{NaiveDate, Utc};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};
use crate::error::ApiError;
use crate::models::*;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9(][0-9 ()-]{6,19}$").unwrap();
}

// ==================== VALIDATION RESULT ====================

/// Outcome of running a rule list; errors keep rule order so the first one
/// can be shown on its own.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(message.into());
    }

    /// Records the error of a rule that returned `Err`.
    pub fn check(&mut self, outcome: Result<(), String>) {
        if let Err(message) = outcome {
            self.add_error(message);
        }
    }

    pub fn merge(&mut self, other: ValidationResult) {
        for error in other.errors {
            self.add_error(error);
        }
    }

    #[cfg(test)]
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl From<ValidationErrors> for ValidationResult {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_messages(&errors, "", &mut messages);
        let mut result = ValidationResult::new();
        for message in messages {
            result.add_error(message);
        }
        result
    }
}

fn collect_messages(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    match error.message {
                        Some(ref message) => out.push(message.to_string()),
                        None => out.push(format!("{} is invalid", path)),
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_messages(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_messages(inner, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

// ==================== FIELD VALIDATORS ====================

pub struct FieldValidator;

impl FieldValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            Err(format!("{} is required", field))
        } else {
            Ok(())
        }
    }

    pub fn min_length(value: &str, field: &str, min: usize) -> Result<(), String> {
        if value.trim().chars().count() < min {
            Err(format!("{} must be at least {} characters", field, min))
        } else {
            Ok(())
        }
    }

    pub fn range<T: PartialOrd + std::fmt::Display>(
        value: T,
        field: &str,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), String> {
        if let Some(min_val) = min {
            if value < min_val {
                return Err(format!("{} must be at least {}", field, min_val));
            }
        }

        if let Some(max_val) = max {
            if value > max_val {
                return Err(format!("{} must not exceed {}", field, max_val));
            }
        }

        Ok(())
    }

    pub fn positive(value: f64, field: &str) -> Result<(), String> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(format!("{} must be greater than 0", field))
        }
    }

    pub fn email(value: &str) -> Result<(), String> {
        if EMAIL_REGEX.is_match(value.trim()) {
            Ok(())
        } else {
            Err("Invalid email format".to_string())
        }
    }

    pub fn phone(value: &str) -> Result<(), String> {
        if PHONE_REGEX.is_match(value.trim()) {
            Ok(())
        } else {
            Err("Invalid phone number format".to_string())
        }
    }

    pub fn future_date(value: NaiveDate, field: &str, today: NaiveDate) -> Result<(), String> {
        if value > today {
            Ok(())
        } else {
            Err(format!("{} must be in the future", field))
        }
    }

    pub fn not_future_date(value: NaiveDate, field: &str, today: NaiveDate) -> Result<(), String> {
        if value <= today {
            Ok(())
        } else {
            Err(format!("{} cannot be in the future", field))
        }
    }

    pub fn one_of<T: FromStr>(value: &str, field: &str, allowed: &[&str]) -> Result<T, String> {
        T::from_str(value.trim()).map_err(|_| {
            format!("{} must be one of: {}", field, allowed.join(", "))
        })
    }
}

pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "insurance", "mobile"];
pub const PRESCRIPTION_STATUSES: &[&str] = &["pending", "verified", "rejected", "dispensed"];
pub const EMPLOYEE_STATUSES: &[&str] = &["active", "inactive", "on_leave"];
pub const TICKET_PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];
pub const TICKET_STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed"];
pub const STOCK_OPERATIONS: &[&str] = &["add", "subtract"];

// ==================== CUSTOM VALIDATION ====================

pub trait CustomValidate {
    fn custom_validate(&self) -> ValidationResult;
}

/// Runs the ordered rule list first, then the derived length caps.
pub fn validate_request<T: Validate + CustomValidate>(request: &T) -> Result<(), ApiError> {
    let mut result = request.custom_validate();
    if let Err(errors) = request.validate() {
        result.merge(errors.into());
    }
    result.into_result()
}

fn medicine_stock_rules(
    result: &mut ValidationResult,
    stock: Option<i64>,
    min_stock: Option<i64>,
    max_stock: Option<i64>,
) {
    if let Some(stock) = stock {
        result.check(FieldValidator::range(stock, "Stock", Some(0), None));
    }
    if let Some(min) = min_stock {
        result.check(FieldValidator::range(min, "Minimum stock", Some(0), None));
    }
    if let (Some(min), Some(max)) = (min_stock, max_stock) {
        if min >= max {
            result.add_error("Maximum stock must be greater than minimum stock");
        }
    }
}

impl CustomValidate for CreateMedicineRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        let today = Utc::now().date_naive();

        result.check(FieldValidator::min_length(&self.name, "Name", 2));
        result.check(FieldValidator::not_empty(&self.category, "Category"));
        result.check(FieldValidator::min_length(&self.manufacturer, "Manufacturer", 2));
        medicine_stock_rules(&mut result, Some(self.stock), Some(self.min_stock), Some(self.max_stock));
        result.check(FieldValidator::positive(self.price, "Price"));
        if let Some(expiry) = self.expiry_date {
            result.check(FieldValidator::future_date(expiry, "Expiry date", today));
        }

        result
    }
}

impl CustomValidate for UpdateMedicineRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        let today = Utc::now().date_naive();

        if let Some(ref name) = self.name {
            result.check(FieldValidator::min_length(name, "Name", 2));
        }
        if let Some(ref category) = self.category {
            result.check(FieldValidator::not_empty(category, "Category"));
        }
        if let Some(ref manufacturer) = self.manufacturer {
            result.check(FieldValidator::min_length(manufacturer, "Manufacturer", 2));
        }
        medicine_stock_rules(&mut result, self.stock, self.min_stock, self.max_stock);
        if let Some(price) = self.price {
            result.check(FieldValidator::positive(price, "Price"));
        }
        if let Some(expiry) = self.expiry_date {
            result.check(FieldValidator::future_date(expiry, "Expiry date", today));
        }

        result
    }
}

impl CustomValidate for StockAdjustmentRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(FieldValidator::range(self.quantity, "Quantity", Some(1), None));
        result.check(
            FieldValidator::one_of::<StockOperation>(&self.operation, "Operation", STOCK_OPERATIONS).map(|_| ()),
        );
        result
    }
}

impl CustomValidate for CreateSaleRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.items.is_empty() {
            result.add_error("Sale must contain at least one item");
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.quantity < 1 {
                result.add_error(format!("Item {}: quantity must be at least 1", index + 1));
            }
            if let Some(price) = item.price {
                if !(price.is_finite() && price >= 0.0) {
                    result.add_error(format!("Item {}: price cannot be negative", index + 1));
                }
            }
        }
        if let Some(ref phone) = self.customer_phone {
            if !phone.trim().is_empty() {
                result.check(FieldValidator::phone(phone));
            }
        }
        result.check(
            FieldValidator::one_of::<PaymentMethod>(&self.payment_method, "Payment method", PAYMENT_METHODS)
                .map(|_| ()),
        );

        result
    }
}

impl CustomValidate for CreatePrescriptionRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.check(FieldValidator::min_length(&self.patient_name, "Patient name", 2));
        result.check(FieldValidator::range(self.patient_age, "Patient age", Some(0), Some(150)));
        result.check(FieldValidator::min_length(&self.doctor_name, "Doctor name", 2));
        if self.medicines.is_empty() {
            result.add_error("At least one medicine is required");
        } else if self.medicines.iter().any(|m| m.trim().is_empty()) {
            result.add_error("Medicine names cannot be blank");
        }

        result
    }
}

impl CustomValidate for VerifyPrescriptionRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.check(FieldValidator::min_length(&self.verified_by, "Verifier name", 2));
        result
    }
}

impl CustomValidate for CreateEmployeeRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        let today = Utc::now().date_naive();

        result.check(FieldValidator::min_length(&self.name, "Name", 2));
        result.check(FieldValidator::email(&self.email));
        result.check(FieldValidator::phone(&self.phone));
        result.check(FieldValidator::not_empty(&self.role, "Role"));
        result.check(FieldValidator::range(self.salary, "Salary", Some(0.0), None));
        result.check(FieldValidator::not_future_date(self.hire_date, "Hire date", today));
        if let Some(ref status) = self.status {
            result.check(
                FieldValidator::one_of::<EmployeeStatus>(status, "Status", EMPLOYEE_STATUSES).map(|_| ()),
            );
        }

        result
    }
}

impl CustomValidate for UpdateEmployeeRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        let today = Utc::now().date_naive();

        if let Some(ref name) = self.name {
            result.check(FieldValidator::min_length(name, "Name", 2));
        }
        if let Some(ref email) = self.email {
            result.check(FieldValidator::email(email));
        }
        if let Some(ref phone) = self.phone {
            result.check(FieldValidator::phone(phone));
        }
        if let Some(ref role) = self.role {
            result.check(FieldValidator::not_empty(role, "Role"));
        }
        if let Some(salary) = self.salary {
            result.check(FieldValidator::range(salary, "Salary", Some(0.0), None));
        }
        if let Some(hire_date) = self.hire_date {
            result.check(FieldValidator::not_future_date(hire_date, "Hire date", today));
        }
        if let Some(ref status) = self.status {
            result.check(
                FieldValidator::one_of::<EmployeeStatus>(status, "Status", EMPLOYEE_STATUSES).map(|_| ()),
            );
        }

        result
    }
}

impl CustomValidate for CreateTicketRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.check(FieldValidator::min_length(&self.title, "Title", 3));
        result.check(FieldValidator::min_length(&self.description, "Description", 10));
        result.check(FieldValidator::min_length(&self.created_by, "Created by", 2));
        if let Some(ref priority) = self.priority {
            result.check(
                FieldValidator::one_of::<TicketPriority>(priority, "Priority", TICKET_PRIORITIES).map(|_| ()),
            );
        }

        result
    }
}

impl CustomValidate for UpdateTicketRequest {
    fn custom_validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(ref title) = self.title {
            result.check(FieldValidator::min_length(title, "Title", 3));
        }
        if let Some(ref description) = self.description {
            result.check(FieldValidator::min_length(description, "Description", 10));
        }
        if let Some(ref priority) = self.priority {
            result.check(
                FieldValidator::one_of::<TicketPriority>(priority, "Priority", TICKET_PRIORITIES).map(|_| ()),
            );
        }
        if let Some(ref status) = self.status {
            result.check(
                FieldValidator::one_of::<TicketStatus>(status, "Status", TICKET_STATUSES).map(|_| ()),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn medicine_request() -> CreateMedicineRequest {
        CreateMedicineRequest {
            name: "Test".to_string(),
            category: "Pain Relief".to_string(),
            strength: Some("500mg".to_string()),
            manufacturer: "Acme".to_string(),
            stock: 10,
            min_stock: 5,
            max_stock: 50,
            price: 9.99,
            expiry_date: Some(Utc::now().date_naive() + Duration::days(365)),
            batch_number: Some("B-001".to_string()),
            location: None,
        }
    }

    fn employee_request() -> CreateEmployeeRequest {
        CreateEmployeeRequest {
            name: "Alex Doe".to_string(),
            email: "alex@pharmacy.test".to_string(),
            phone: "+1 555 123 4567".to_string(),
            role: "Pharmacist".to_string(),
            department: Some("Dispensary".to_string()),
            salary: 52000.0,
            hire_date: Utc::now().date_naive() - Duration::days(30),
            status: None,
        }
    }

    #[test]
    fn test_valid_medicine_passes() {
        let result = medicine_request().custom_validate();
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(validate_request(&medicine_request()).is_ok());
    }

    #[test]
    fn test_min_stock_not_below_max_is_invalid() {
        for (min, max) in [(50, 50), (60, 50), (0, 0)] {
            let request = CreateMedicineRequest { min_stock: min, max_stock: max, ..medicine_request() };
            let result = request.custom_validate();
            assert!(!result.is_valid);
            assert!(result.errors.iter().any(|e| e.contains("Maximum stock")));
        }
    }

    #[test]
    fn test_expired_medicine_is_invalid() {
        let request = CreateMedicineRequest {
            expiry_date: Some(Utc::now().date_naive() - Duration::days(1)),
            ..medicine_request()
        };
        assert_eq!(request.custom_validate().first_error(), Some("Expiry date must be in the future"));
    }

    #[test]
    fn test_errors_keep_rule_order() {
        let request = CreateMedicineRequest {
            name: "X".to_string(),
            price: 0.0,
            ..medicine_request()
        };
        let result = request.custom_validate();
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.first_error(), Some("Name must be at least 2 characters"));
        assert_eq!(result.errors[1], "Price must be greater than 0");
    }

    #[test]
    fn test_update_checks_pair_only_when_both_present() {
        let only_min = UpdateMedicineRequest { min_stock: Some(100), ..Default::default() };
        assert!(only_min.custom_validate().is_valid);

        let both = UpdateMedicineRequest { min_stock: Some(100), max_stock: Some(10), ..Default::default() };
        assert!(!both.custom_validate().is_valid);
    }

    #[test]
    fn test_prescription_without_medicines_is_invalid() {
        let request = CreatePrescriptionRequest {
            patient_name: "Jane Roe".to_string(),
            patient_age: 30,
            doctor_name: "Dr. Who".to_string(),
            medicines: vec![],
        };
        let result = request.custom_validate();
        assert!(!result.is_valid);
        assert_eq!(result.first_error(), Some("At least one medicine is required"));
    }

    #[test]
    fn test_prescription_age_bounds() {
        let request = CreatePrescriptionRequest {
            patient_name: "Jane Roe".to_string(),
            patient_age: 151,
            doctor_name: "Dr. Who".to_string(),
            medicines: vec!["Amoxicillin".to_string()],
        };
        assert!(!request.custom_validate().is_valid);
    }

    #[test]
    fn test_malformed_email_is_invalid() {
        for email in ["plainaddress", "missing@tld", "@nouser.com", "two@@at.com"] {
            let request = CreateEmployeeRequest { email: email.to_string(), ..employee_request() };
            let result = request.custom_validate();
            assert!(!result.is_valid, "{} should be rejected", email);
            assert!(result.errors.contains(&"Invalid email format".to_string()));
        }
        assert!(employee_request().custom_validate().is_valid);
    }

    #[test]
    fn test_phone_format() {
        assert!(FieldValidator::phone("+44 20 7946 0958").is_ok());
        assert!(FieldValidator::phone("(555) 123-4567").is_ok());
        assert!(FieldValidator::phone("call me").is_err());
        assert!(FieldValidator::phone("12").is_err());
    }

    #[test]
    fn test_sale_rules() {
        let request = CreateSaleRequest {
            customer_name: None,
            customer_phone: Some("not a phone".to_string()),
            items: vec![],
            payment_method: "barter".to_string(),
        };
        let result = request.custom_validate();
        assert_eq!(result.errors, vec![
            "Sale must contain at least one item".to_string(),
            "Invalid phone number format".to_string(),
            "Payment method must be one of: cash, card, insurance, mobile".to_string(),
        ]);
    }

    #[test]
    fn test_derived_length_caps_are_reported() {
        let request = CreateMedicineRequest { name: "N".repeat(300), ..medicine_request() };
        let err = validate_request(&request).unwrap_err();
        match err {
            ApiError::ValidationFailed(errors) => {
                assert!(errors.contains(&"Name cannot exceed 255 characters".to_string()));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut result = ValidationResult::new();
        result.add_error("Title must be at least 3 characters");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["errors"][0], "Title must be at least 3 characters");
    }
}
