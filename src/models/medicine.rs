// src/models/medicine.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use strum::{EnumString, Display, AsRefStr};
use uuid::Uuid;

fn default_active() -> bool {
    true
}

// ==================== MEDICINE ====================

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: String,
    pub name: String,
    pub category: String,
    pub strength: Option<String>,
    pub manufacturer: String,
    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    pub price: f64,
    pub expiry_date: Option<NaiveDate>,
    pub batch_number: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn new(request: CreateMedicineRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            category: request.category.trim().to_string(),
            strength: request.strength,
            manufacturer: request.manufacturer.trim().to_string(),
            stock: request.stock,
            min_stock: request.min_stock,
            max_stock: request.max_stock,
            price: request.price,
            expiry_date: request.expiry_date,
            batch_number: request.batch_number,
            location: request.location,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in `update`, leaving the rest untouched.
    pub fn apply_update(&mut self, update: &UpdateMedicineRequest, now: DateTime<Utc>) {
        if let Some(ref v) = update.name { self.name = v.trim().to_string(); }
        if let Some(ref v) = update.category { self.category = v.trim().to_string(); }
        if let Some(ref v) = update.strength { self.strength = Some(v.clone()); }
        if let Some(ref v) = update.manufacturer { self.manufacturer = v.trim().to_string(); }
        if let Some(v) = update.stock { self.stock = v.max(0); }
        if let Some(v) = update.min_stock { self.min_stock = v; }
        if let Some(v) = update.max_stock { self.max_stock = v; }
        if let Some(v) = update.price { self.price = v; }
        if let Some(v) = update.expiry_date { self.expiry_date = Some(v); }
        if let Some(ref v) = update.batch_number { self.batch_number = Some(v.clone()); }
        if let Some(ref v) = update.location { self.location = Some(v.clone()); }
        if let Some(v) = update.active { self.active = v; }
        self.updated_at = now;
    }

    /// Checked on the merged record, since an update may carry only one bound.
    pub fn check_stock_bounds(&self) -> Result<(), String> {
        if self.min_stock >= self.max_stock {
            return Err(format!(
                "Maximum stock ({}) must be greater than minimum stock ({})",
                self.max_stock, self.min_stock
            ));
        }
        Ok(())
    }

    pub fn ensure_sellable(&self) -> Result<(), String> {
        if !self.active {
            return Err(format!("Medicine '{}' has been discontinued and cannot be sold", self.name));
        }
        Ok(())
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Negative when already expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date.map(|date| (date - today).num_days())
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicineRequest {
    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: String,

    #[validate(length(max = 50, message = "Strength cannot exceed 50 characters"))]
    pub strength: Option<String>,

    #[validate(length(max = 255, message = "Manufacturer cannot exceed 255 characters"))]
    pub manufacturer: String,

    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    pub price: f64,
    pub expiry_date: Option<NaiveDate>,

    #[validate(length(max = 100, message = "Batch number cannot exceed 100 characters"))]
    pub batch_number: Option<String>,

    #[validate(length(max = 100, message = "Location cannot exceed 100 characters"))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, Validate, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicineRequest {
    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Category cannot exceed 100 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 50, message = "Strength cannot exceed 50 characters"))]
    pub strength: Option<String>,

    #[validate(length(max = 255, message = "Manufacturer cannot exceed 255 characters"))]
    pub manufacturer: Option<String>,

    pub stock: Option<i64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
    pub price: Option<f64>,
    pub expiry_date: Option<NaiveDate>,

    #[validate(length(max = 100, message = "Batch number cannot exceed 100 characters"))]
    pub batch_number: Option<String>,

    #[validate(length(max = 100, message = "Location cannot exceed 100 characters"))]
    pub location: Option<String>,

    pub active: Option<bool>,
}

// ==================== STOCK ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockOperation {
    Add,
    Subtract,
}

/// How a subtraction larger than the stock on hand is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Reject the adjustment and leave stock unchanged.
    Strict,
    /// Floor the result at zero.
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockShortfall {
    pub available: i64,
    pub requested: i64,
}

impl StockOperation {
    pub fn apply(self, current: i64, quantity: i64, policy: StockPolicy) -> Result<i64, StockShortfall> {
        match self {
            StockOperation::Add => Ok(current.saturating_add(quantity).max(0)),
            StockOperation::Subtract => {
                if quantity > current && policy == StockPolicy::Strict {
                    return Err(StockShortfall { available: current, requested: quantity });
                }
                Ok(current.saturating_sub(quantity).max(0))
            }
        }
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustmentRequest {
    pub quantity: i64,
    pub operation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub quantity: i64,
    pub operation: StockOperation,
}

// ==================== FILTER ====================

#[derive(Debug, Clone, Default)]
pub struct MedicineFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub low_stock: bool,
    pub include_inactive: bool,
}

impl MedicineFilter {
    pub fn matches(&self, medicine: &Medicine) -> bool {
        if !self.include_inactive && !medicine.active {
            return false;
        }
        if self.low_stock && !medicine.is_low_stock() {
            return false;
        }
        if let Some(ref category) = self.category {
            if !medicine.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty()
                && !medicine.name.to_lowercase().contains(&needle)
                && !medicine.manufacturer.to_lowercase().contains(&needle)
                && !medicine.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> CreateMedicineRequest {
        CreateMedicineRequest {
            name: "Test".to_string(),
            category: "Pain Relief".to_string(),
            strength: None,
            manufacturer: "Acme".to_string(),
            stock: 10,
            min_stock: 5,
            max_stock: 50,
            price: 9.99,
            expiry_date: None,
            batch_number: None,
            location: None,
        }
    }

    #[test]
    fn test_partial_update_checked_against_stored_bounds() {
        let mut medicine = Medicine::new(sample_request(), Utc::now());
        let update = UpdateMedicineRequest { min_stock: Some(500), ..Default::default() };
        medicine.apply_update(&update, Utc::now());
        assert!(medicine.check_stock_bounds().is_err());

        let update = UpdateMedicineRequest { max_stock: Some(1000), ..Default::default() };
        medicine.apply_update(&update, Utc::now());
        assert!(medicine.check_stock_bounds().is_ok());
    }

    #[test]
    fn test_subtract_floors_at_zero() {
        for before in 0..6 {
            for q in 0..8 {
                let after = StockOperation::Subtract.apply(before, q, StockPolicy::Clamp).unwrap();
                assert_eq!(after, (before - q).max(0));
            }
        }
    }

    #[test]
    fn test_strict_subtract_rejects_shortfall() {
        assert_eq!(StockOperation::Subtract.apply(10, 4, StockPolicy::Strict), Ok(6));
        assert_eq!(StockOperation::Subtract.apply(10, 10, StockPolicy::Strict), Ok(0));
        assert_eq!(
            StockOperation::Subtract.apply(3, 5, StockPolicy::Strict),
            Err(StockShortfall { available: 3, requested: 5 })
        );
    }

    #[test]
    fn test_add_increases_stock() {
        assert_eq!(StockOperation::Add.apply(3, 5, StockPolicy::Strict), Ok(8));
    }

    #[test]
    fn test_new_medicine_is_active() {
        let medicine = Medicine::new(sample_request(), Utc::now());
        assert!(medicine.active);
        assert_eq!(medicine.name, "Test");
        assert_eq!(medicine.min_stock, 5);
        assert_eq!(medicine.max_stock, 50);
    }

    #[test]
    fn test_apply_update_only_touches_present_fields() {
        let mut medicine = Medicine::new(sample_request(), Utc::now());
        let update = UpdateMedicineRequest {
            price: Some(12.5),
            location: Some("Shelf B".to_string()),
            ..Default::default()
        };
        medicine.apply_update(&update, Utc::now());
        assert_eq!(medicine.price, 12.5);
        assert_eq!(medicine.location.as_deref(), Some("Shelf B"));
        assert_eq!(medicine.name, "Test");
        assert_eq!(medicine.stock, 10);
    }

    #[test]
    fn test_filter_hides_inactive_and_matches_search() {
        let mut medicine = Medicine::new(sample_request(), Utc::now());
        let filter = MedicineFilter { search: Some("acm".to_string()), ..Default::default() };
        assert!(filter.matches(&medicine));

        medicine.active = false;
        assert!(!filter.matches(&medicine));

        let with_inactive = MedicineFilter { include_inactive: true, ..filter };
        assert!(with_inactive.matches(&medicine));
    }

    #[test]
    fn test_operation_parses_from_wire_name() {
        use std::str::FromStr;
        assert_eq!(StockOperation::from_str("subtract").unwrap(), StockOperation::Subtract);
        assert!(StockOperation::from_str("multiply").is_err());
    }
}
