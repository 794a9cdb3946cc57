// src/store/local.rs
//! Single-file JSON document store.
//!
//! The whole document is held in memory behind an `RwLock`. Writes work on a
//! copy under the write lock, persist it (temp file + rename) and only then
//! swap it in, so a failed write leaves both memory and disk untouched.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

use super::{DataSource, PharmacyStore, StoreError, StoreResult};
use crate::models::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalDocument {
    pub medicines: Vec<Medicine>,
    pub sales: Vec<Sale>,
    pub prescriptions: Vec<Prescription>,
    pub employees: Vec<Employee>,
    pub time_entries: Vec<TimeEntry>,
    pub tickets: Vec<Ticket>,
}

pub struct JsonStore {
    path: Option<PathBuf>,
    stock_policy: StockPolicy,
    document: RwLock<LocalDocument>,
}

impl JsonStore {
    /// Loads `path` if it exists; a missing file starts an empty document.
    pub async fn open(path: impl Into<PathBuf>, stock_policy: StockPolicy) -> StoreResult<Self> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => LocalDocument::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Local store {} does not exist yet, starting empty", path.display());
                LocalDocument::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: Some(path),
            stock_policy,
            document: RwLock::new(document),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(stock_policy: StockPolicy) -> Self {
        Self {
            path: None,
            stock_policy,
            document: RwLock::new(LocalDocument::default()),
        }
    }

    async fn persist(&self, document: &LocalDocument) -> StoreResult<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Persisted local store ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&LocalDocument) -> StoreResult<T>) -> StoreResult<T> {
        let document = self.document.read().await;
        f(&document)
    }

    async fn write<T>(&self, f: impl FnOnce(&mut LocalDocument) -> StoreResult<T>) -> StoreResult<T> {
        let mut document = self.document.write().await;
        let mut draft = document.clone();
        let result = f(&mut draft)?;
        self.persist(&draft).await?;
        *document = draft;
        Ok(result)
    }
}

fn find_mut<'a, T>(
    items: &'a mut [T],
    entity: &'static str,
    id: &str,
    key: impl Fn(&T) -> &str,
) -> StoreResult<&'a mut T> {
    items
        .iter_mut()
        .find(|item| key(item) == id)
        .ok_or_else(|| StoreError::not_found(entity, id))
}

fn find<T: Clone>(items: &[T], entity: &'static str, id: &str, key: impl Fn(&T) -> &str) -> StoreResult<T> {
    items
        .iter()
        .find(|item| key(item) == id)
        .cloned()
        .ok_or_else(|| StoreError::not_found(entity, id))
}

fn remove<T>(items: &mut Vec<T>, entity: &'static str, id: &str, key: impl Fn(&T) -> &str) -> StoreResult<()> {
    let before = items.len();
    items.retain(|item| key(item) != id);
    if items.len() == before {
        return Err(StoreError::not_found(entity, id));
    }
    Ok(())
}

fn reject_duplicate<T>(items: &[T], entity: &str, id: &str, key: impl Fn(&T) -> &str) -> StoreResult<()> {
    if items.iter().any(|item| key(item) == id) {
        return Err(StoreError::Conflict(format!("{} '{}' already exists", entity, id)));
    }
    Ok(())
}

/// Emails are unique case-insensitively; `own_id` may keep its own address.
fn reject_taken_email(employees: &[Employee], email: &str, own_id: &str) -> StoreResult<()> {
    if employees
        .iter()
        .any(|e| e.id != own_id && e.email.eq_ignore_ascii_case(email))
    {
        return Err(StoreError::Conflict(format!("Employee with email '{}' already exists", email)));
    }
    Ok(())
}

#[async_trait]
impl PharmacyStore for JsonStore {
    fn source(&self) -> DataSource {
        DataSource::Local
    }

    fn describe(&self) -> String {
        match self.path {
            Some(ref path) => format!("json:{}", path.display()),
            None => "json:memory".to_string(),
        }
    }

    async fn init(&self) -> StoreResult<()> {
        let document = self.document.read().await;
        self.persist(&document).await
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // ==================== MEDICINES ====================

    async fn list_medicines(&self, filter: &MedicineFilter) -> StoreResult<Vec<Medicine>> {
        self.read(|doc| {
            let mut medicines: Vec<Medicine> = doc
                .medicines
                .iter()
                .filter(|m| filter.matches(m))
                .cloned()
                .collect();
            medicines.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            Ok(medicines)
        })
        .await
    }

    async fn get_medicine(&self, id: &str) -> StoreResult<Medicine> {
        self.read(|doc| find(&doc.medicines, "Medicine", id, |m| m.id.as_str())).await
    }

    async fn create_medicine(&self, medicine: &Medicine) -> StoreResult<Medicine> {
        self.write(|doc| {
            reject_duplicate(&doc.medicines, "Medicine", &medicine.id, |m| m.id.as_str())?;
            doc.medicines.push(medicine.clone());
            Ok(medicine.clone())
        })
        .await
    }

    async fn update_medicine(&self, id: &str, update: &UpdateMedicineRequest) -> StoreResult<Medicine> {
        self.write(|doc| {
            let medicine = find_mut(&mut doc.medicines, "Medicine", id, |m| m.id.as_str())?;
            medicine.apply_update(update, Utc::now());
            medicine.check_stock_bounds().map_err(StoreError::Invalid)?;
            Ok(medicine.clone())
        })
        .await
    }

    async fn deactivate_medicine(&self, id: &str) -> StoreResult<Medicine> {
        self.write(|doc| {
            let medicine = find_mut(&mut doc.medicines, "Medicine", id, |m| m.id.as_str())?;
            medicine.active = false;
            medicine.updated_at = Utc::now();
            Ok(medicine.clone())
        })
        .await
    }

    async fn adjust_stock(&self, id: &str, adjustment: StockAdjustment) -> StoreResult<Medicine> {
        let policy = self.stock_policy;
        self.write(|doc| {
            let medicine = find_mut(&mut doc.medicines, "Medicine", id, |m| m.id.as_str())?;
            medicine.stock = adjustment.operation.apply(medicine.stock, adjustment.quantity, policy)?;
            medicine.updated_at = Utc::now();
            Ok(medicine.clone())
        })
        .await
    }

    // ==================== SALES ====================

    async fn list_sales(&self, filter: &SaleFilter) -> StoreResult<Vec<Sale>> {
        self.read(|doc| {
            let mut sales: Vec<Sale> = doc.sales.iter().filter(|s| filter.matches(s)).cloned().collect();
            sales.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Ok(sales)
        })
        .await
    }

    async fn get_sale(&self, id: &str) -> StoreResult<Sale> {
        self.read(|doc| find(&doc.sales, "Sale", id, |s| s.id.as_str())).await
    }

    async fn record_sale(&self, sale: &NewSale) -> StoreResult<Sale> {
        let policy = self.stock_policy;
        self.write(|doc| {
            let now = Utc::now();
            let mut items = Vec::with_capacity(sale.lines.len());
            for line in &sale.lines {
                let medicine = find_mut(&mut doc.medicines, "Medicine", &line.medicine_id, |m| m.id.as_str())?;
                medicine.ensure_sellable().map_err(StoreError::Invalid)?;
                medicine.stock = StockOperation::Subtract.apply(medicine.stock, line.quantity, policy)?;
                medicine.updated_at = now;
                items.push(SaleItem::snapshot(line, medicine));
            }
            let recorded = Sale::assemble(sale, items, now);
            doc.sales.push(recorded.clone());
            Ok(recorded)
        })
        .await
    }

    // ==================== PRESCRIPTIONS ====================

    async fn list_prescriptions(&self, status: Option<PrescriptionStatus>) -> StoreResult<Vec<Prescription>> {
        self.read(|doc| {
            let mut prescriptions: Vec<Prescription> = doc
                .prescriptions
                .iter()
                .filter(|p| status.map_or(true, |s| p.status == s))
                .cloned()
                .collect();
            prescriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(prescriptions)
        })
        .await
    }

    async fn get_prescription(&self, id: &str) -> StoreResult<Prescription> {
        self.read(|doc| find(&doc.prescriptions, "Prescription", id, |p| p.id.as_str())).await
    }

    async fn create_prescription(&self, prescription: &Prescription) -> StoreResult<Prescription> {
        self.write(|doc| {
            reject_duplicate(&doc.prescriptions, "Prescription", &prescription.id, |p| p.id.as_str())?;
            doc.prescriptions.push(prescription.clone());
            Ok(prescription.clone())
        })
        .await
    }

    async fn set_prescription_status(&self, id: &str, status: PrescriptionStatus) -> StoreResult<Prescription> {
        self.write(|doc| {
            let prescription = find_mut(&mut doc.prescriptions, "Prescription", id, |p| p.id.as_str())?;
            prescription.set_status(status, Utc::now());
            Ok(prescription.clone())
        })
        .await
    }

    async fn verify_prescription(&self, id: &str, request: &VerifyPrescriptionRequest) -> StoreResult<Prescription> {
        self.write(|doc| {
            let prescription = find_mut(&mut doc.prescriptions, "Prescription", id, |p| p.id.as_str())?;
            prescription.verify(request, Utc::now());
            Ok(prescription.clone())
        })
        .await
    }

    // ==================== EMPLOYEES ====================

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.read(|doc| {
            let mut employees = doc.employees.clone();
            employees.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            Ok(employees)
        })
        .await
    }

    async fn get_employee(&self, id: &str) -> StoreResult<Employee> {
        self.read(|doc| find(&doc.employees, "Employee", id, |e| e.id.as_str())).await
    }

    async fn create_employee(&self, employee: &Employee) -> StoreResult<Employee> {
        self.write(|doc| {
            reject_duplicate(&doc.employees, "Employee", &employee.id, |e| e.id.as_str())?;
            reject_taken_email(&doc.employees, &employee.email, &employee.id)?;
            doc.employees.push(employee.clone());
            Ok(employee.clone())
        })
        .await
    }

    async fn update_employee(&self, id: &str, update: &EmployeeUpdate) -> StoreResult<Employee> {
        self.write(|doc| {
            if let Some(ref email) = update.fields.email {
                reject_taken_email(&doc.employees, email.trim(), id)?;
            }
            let employee = find_mut(&mut doc.employees, "Employee", id, |e| e.id.as_str())?;
            employee.apply_update(update, Utc::now());
            Ok(employee.clone())
        })
        .await
    }

    async fn delete_employee(&self, id: &str) -> StoreResult<()> {
        self.write(|doc| {
            remove(&mut doc.employees, "Employee", id, |e| e.id.as_str())?;
            doc.time_entries.retain(|t| t.employee_id != id);
            Ok(())
        })
        .await
    }

    // ==================== TIME TRACKING ====================

    async fn list_time_entries(&self, employee_id: Option<&str>) -> StoreResult<Vec<TimeEntry>> {
        self.read(|doc| {
            let mut entries: Vec<TimeEntry> = doc
                .time_entries
                .iter()
                .filter(|t| employee_id.map_or(true, |id| t.employee_id == id))
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.clock_in.cmp(&a.clock_in));
            Ok(entries)
        })
        .await
    }

    async fn clock_in(&self, employee_id: &str) -> StoreResult<TimeEntry> {
        self.write(|doc| {
            find(&doc.employees, "Employee", employee_id, |e| e.id.as_str())?;
            if doc.time_entries.iter().any(|t| t.employee_id == employee_id && t.is_open()) {
                return Err(StoreError::Conflict(format!(
                    "Employee '{}' is already clocked in",
                    employee_id
                )));
            }
            let entry = TimeEntry::open(employee_id, Utc::now());
            doc.time_entries.push(entry.clone());
            Ok(entry)
        })
        .await
    }

    async fn clock_out(&self, employee_id: &str) -> StoreResult<TimeEntry> {
        self.write(|doc| {
            find(&doc.employees, "Employee", employee_id, |e| e.id.as_str())?;
            let entry = doc
                .time_entries
                .iter_mut()
                .find(|t| t.employee_id == employee_id && t.is_open())
                .ok_or_else(|| StoreError::Conflict(format!("Employee '{}' is not clocked in", employee_id)))?;
            entry.close(Utc::now());
            Ok(entry.clone())
        })
        .await
    }

    // ==================== TICKETS ====================

    async fn list_tickets(&self, status: Option<TicketStatus>) -> StoreResult<Vec<Ticket>> {
        self.read(|doc| {
            let mut tickets: Vec<Ticket> = doc
                .tickets
                .iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .cloned()
                .collect();
            tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(tickets)
        })
        .await
    }

    async fn get_ticket(&self, id: &str) -> StoreResult<Ticket> {
        self.read(|doc| find(&doc.tickets, "Ticket", id, |t| t.id.as_str())).await
    }

    async fn create_ticket(&self, ticket: &Ticket) -> StoreResult<Ticket> {
        self.write(|doc| {
            reject_duplicate(&doc.tickets, "Ticket", &ticket.id, |t| t.id.as_str())?;
            doc.tickets.push(ticket.clone());
            Ok(ticket.clone())
        })
        .await
    }

    async fn update_ticket(&self, id: &str, update: &TicketUpdate) -> StoreResult<Ticket> {
        self.write(|doc| {
            let ticket = find_mut(&mut doc.tickets, "Ticket", id, |t| t.id.as_str())?;
            ticket.apply_update(update, Utc::now());
            Ok(ticket.clone())
        })
        .await
    }

    async fn set_ticket_status(&self, id: &str, status: TicketStatus) -> StoreResult<Ticket> {
        self.write(|doc| {
            let ticket = find_mut(&mut doc.tickets, "Ticket", id, |t| t.id.as_str())?;
            ticket.set_status(status, Utc::now());
            Ok(ticket.clone())
        })
        .await
    }

    async fn delete_ticket(&self, id: &str) -> StoreResult<()> {
        self.write(|doc| remove(&mut doc.tickets, "Ticket", id, |t| t.id.as_str())).await
    }
}
