// src/models/sale.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use strum::{EnumString, Display, AsRefStr};
use uuid::Uuid;

use super::medicine::Medicine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Insurance,
    Mobile,
}

/// Line item frozen at sale time; later inventory edits do not change it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub medicine_id: String,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

impl SaleItem {
    pub fn snapshot(line: &SaleLineRequest, medicine: &Medicine) -> Self {
        Self {
            medicine_id: medicine.id.clone(),
            name: line.name.clone().unwrap_or_else(|| medicine.name.clone()),
            quantity: line.quantity,
            price: line.price.unwrap_or(medicine.price),
        }
    }

    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<SaleItem>,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
}

impl Sale {
    pub fn assemble(sale: &NewSale, items: Vec<SaleItem>, now: DateTime<Utc>) -> Self {
        let total = round_currency(items.iter().map(SaleItem::line_total).sum());
        Self {
            id: Uuid::new_v4().to_string(),
            customer_name: sale.customer_name.clone(),
            customer_phone: sale.customer_phone.clone(),
            items,
            total,
            payment_method: sale.payment_method,
            timestamp: now,
        }
    }
}

pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    #[validate(length(min = 1, message = "Medicine ID is required"))]
    pub medicine_id: String,
    pub quantity: i64,
    pub name: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[validate(length(max = 255, message = "Customer name cannot exceed 255 characters"))]
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    #[validate(nested)]
    pub items: Vec<SaleLineRequest>,
    pub payment_method: String,
}

/// A validated sale request, ready for a store to price and record.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub lines: Vec<SaleLineRequest>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        let day = sale.timestamp.date_naive();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::medicine::CreateMedicineRequest;

    fn medicine(name: &str, price: f64) -> Medicine {
        Medicine::new(
            CreateMedicineRequest {
                name: name.to_string(),
                category: "General".to_string(),
                strength: None,
                manufacturer: "Acme".to_string(),
                stock: 20,
                min_stock: 2,
                max_stock: 100,
                price,
                expiry_date: None,
                batch_number: None,
                location: None,
            },
            Utc::now(),
        )
    }

    fn line(id: &str, quantity: i64, price: Option<f64>) -> SaleLineRequest {
        SaleLineRequest { medicine_id: id.to_string(), quantity, name: None, price }
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let a = medicine("Aspirin", 5.0);
        let b = medicine("Ibuprofen", 10.0);
        let items = vec![
            SaleItem::snapshot(&line(&a.id, 2, None), &a),
            SaleItem::snapshot(&line(&b.id, 3, None), &b),
        ];
        let new_sale = NewSale {
            customer_name: None,
            customer_phone: None,
            lines: vec![],
            payment_method: PaymentMethod::Cash,
        };
        let sale = Sale::assemble(&new_sale, items, Utc::now());
        assert_eq!(sale.total, 40.0);
        assert_eq!(sale.items[0].name, "Aspirin");
    }

    #[test]
    fn test_line_price_overrides_inventory_price() {
        let a = medicine("Aspirin", 5.0);
        let item = SaleItem::snapshot(&line(&a.id, 1, Some(4.5)), &a);
        assert_eq!(item.price, 4.5);
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(0.1 + 0.2), 0.3);
        assert_eq!(round_currency(3.0 * 9.99), 29.97);
    }
}
