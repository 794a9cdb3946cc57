// src/dashboard.rs
//! Reporting figures derived from a snapshot of every collection.

use chrono::NaiveDate;

use crate::models::*;
use crate::store::repository::DashboardSnapshot;

pub fn compute_stats(snapshot: &DashboardSnapshot, today: NaiveDate, expiry_warning_days: i64) -> DashboardStats {
    let active: Vec<&Medicine> = snapshot.medicines.iter().filter(|m| m.active).collect();

    let todays_sales: Vec<&Sale> = snapshot
        .sales
        .iter()
        .filter(|s| s.timestamp.date_naive() == today)
        .collect();

    DashboardStats {
        total_medicines: active.len() as i64,
        low_stock_medicines: active.iter().filter(|m| !m.is_out_of_stock() && m.is_low_stock()).count() as i64,
        out_of_stock_medicines: active.iter().filter(|m| m.is_out_of_stock()).count() as i64,
        expiring_soon_medicines: active
            .iter()
            .filter(|m| matches!(m.days_until_expiry(today), Some(d) if (0..=expiry_warning_days).contains(&d)))
            .count() as i64,
        inventory_value: round_currency(active.iter().map(|m| m.stock as f64 * m.price).sum()),
        sales_today: todays_sales.len() as i64,
        revenue_today: round_currency(todays_sales.iter().map(|s| s.total).sum()),
        total_revenue: round_currency(snapshot.sales.iter().map(|s| s.total).sum()),
        pending_prescriptions: snapshot
            .prescriptions
            .iter()
            .filter(|p| p.status == PrescriptionStatus::Pending)
            .count() as i64,
        active_employees: snapshot
            .employees
            .iter()
            .filter(|e| e.status == EmployeeStatus::Active)
            .count() as i64,
        open_tickets: snapshot.tickets.iter().filter(|t| t.status.is_active()).count() as i64,
    }
}

/// Most recent events across sales, prescriptions, tickets and inventory,
/// newest first.
pub fn recent_activity(snapshot: &DashboardSnapshot, limit: usize) -> Vec<ActivityItem> {
    let mut items: Vec<ActivityItem> = Vec::new();

    items.extend(snapshot.sales.iter().map(|s| ActivityItem {
        kind: ActivityKind::Sale,
        entity_id: s.id.clone(),
        description: format!(
            "Sale of {} item(s) totalling {:.2} ({})",
            s.items.iter().map(|i| i.quantity).sum::<i64>(),
            s.total,
            s.payment_method
        ),
        timestamp: s.timestamp,
    }));

    items.extend(snapshot.prescriptions.iter().map(|p| ActivityItem {
        kind: ActivityKind::Prescription,
        entity_id: p.id.clone(),
        description: format!("Prescription for {} from {} is {}", p.patient_name, p.doctor_name, p.status),
        timestamp: p.updated_at,
    }));

    items.extend(snapshot.tickets.iter().map(|t| ActivityItem {
        kind: ActivityKind::Ticket,
        entity_id: t.id.clone(),
        description: format!("Ticket '{}' ({}) is {}", t.title, t.priority, t.status),
        timestamp: t.updated_at,
    }));

    items.extend(snapshot.medicines.iter().map(|m| ActivityItem {
        kind: ActivityKind::Medicine,
        entity_id: m.id.clone(),
        description: if m.active {
            format!("{} updated, {} in stock", m.name, m.stock)
        } else {
            format!("{} discontinued", m.name)
        },
        timestamp: m.updated_at,
    }));

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(limit);
    items
}

/// Stock and expiry alerts for active medicines, most severe first.
pub fn alerts(medicines: &[Medicine], today: NaiveDate, expiry_warning_days: i64) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for medicine in medicines.iter().filter(|m| m.active) {
        if medicine.is_out_of_stock() {
            alerts.push(alert(medicine, AlertKind::OutOfStock, AlertSeverity::Critical, format!("{} is out of stock", medicine.name)));
        } else if medicine.is_low_stock() {
            alerts.push(alert(
                medicine,
                AlertKind::LowStock,
                AlertSeverity::Warning,
                format!("{} is low on stock ({} left, minimum {})", medicine.name, medicine.stock, medicine.min_stock),
            ));
        }

        match medicine.days_until_expiry(today) {
            Some(days) if days < 0 => alerts.push(alert(
                medicine,
                AlertKind::Expired,
                AlertSeverity::Critical,
                format!("{} expired {} day(s) ago", medicine.name, -days),
            )),
            Some(days) if days <= expiry_warning_days => alerts.push(alert(
                medicine,
                AlertKind::ExpiringSoon,
                AlertSeverity::Warning,
                format!("{} expires in {} day(s)", medicine.name, days),
            )),
            _ => {}
        }
    }

    alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.medicine_name.cmp(&b.medicine_name)));
    alerts
}

fn alert(medicine: &Medicine, kind: AlertKind, severity: AlertSeverity, message: String) -> Alert {
    Alert {
        kind,
        severity,
        medicine_id: medicine.id.clone(),
        medicine_name: medicine.name.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn medicine(name: &str, stock: i64, min_stock: i64, expiry: Option<NaiveDate>) -> Medicine {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Medicine::new(
            CreateMedicineRequest {
                name: name.to_string(),
                category: "General".to_string(),
                strength: None,
                manufacturer: "Acme".to_string(),
                stock,
                min_stock,
                max_stock: 100,
                price: 2.0,
                expiry_date: expiry,
                batch_number: None,
                location: None,
            },
            now,
        )
    }

    fn snapshot(medicines: Vec<Medicine>, sales: Vec<Sale>) -> DashboardSnapshot {
        DashboardSnapshot {
            medicines,
            sales,
            prescriptions: Vec::new(),
            employees: Vec::new(),
            tickets: Vec::new(),
        }
    }

    fn sale_at(total_price: f64, at: chrono::DateTime<Utc>) -> Sale {
        Sale {
            id: format!("s-{}", at.timestamp()),
            customer_name: None,
            customer_phone: None,
            items: vec![SaleItem {
                medicine_id: "m".to_string(),
                name: "M".to_string(),
                quantity: 1,
                price: total_price,
            }],
            total: total_price,
            payment_method: PaymentMethod::Card,
            timestamp: at,
        }
    }

    #[test]
    fn test_stats_count_stock_levels_and_revenue() {
        let mut inactive = medicine("Old", 0, 5, None);
        inactive.active = false;
        let medicines = vec![
            medicine("Plenty", 50, 5, None),
            medicine("Low", 3, 5, None),
            medicine("Empty", 0, 5, None),
            medicine("Soon", 20, 5, Some(today() + Duration::days(10))),
            inactive,
        ];
        let today_noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let sales = vec![sale_at(10.0, today_noon), sale_at(5.5, today_noon - Duration::days(2))];

        let stats = compute_stats(&snapshot(medicines, sales), today(), 30);
        assert_eq!(stats.total_medicines, 4);
        assert_eq!(stats.low_stock_medicines, 1);
        assert_eq!(stats.out_of_stock_medicines, 1);
        assert_eq!(stats.expiring_soon_medicines, 1);
        assert_eq!(stats.inventory_value, 146.0);
        assert_eq!(stats.sales_today, 1);
        assert_eq!(stats.revenue_today, 10.0);
        assert_eq!(stats.total_revenue, 15.5);
    }

    #[test]
    fn test_alerts_are_ordered_by_severity() {
        let medicines = vec![
            medicine("Low", 3, 5, None),
            medicine("Empty", 0, 5, None),
            medicine("Expired", 20, 5, Some(today() - Duration::days(1))),
            medicine("Fine", 20, 5, Some(today() + Duration::days(365))),
        ];

        let alerts = alerts(&medicines, today(), 30);
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[1].severity, AlertSeverity::Critical);
        assert_eq!(alerts[2].kind, AlertKind::LowStock);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::Expired && a.medicine_name == "Expired"));
    }

    #[test]
    fn test_activity_is_newest_first_and_limited() {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let sales = (0..5).map(|i| sale_at(1.0, base + Duration::hours(i))).collect();
        let activity = recent_activity(&snapshot(vec![medicine("A", 1, 0, None)], sales), 3);

        assert_eq!(activity.len(), 3);
        assert!(activity.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert_eq!(activity[0].timestamp, base + Duration::hours(4));
        assert_eq!(activity[0].kind, ActivityKind::Sale);
    }
}
