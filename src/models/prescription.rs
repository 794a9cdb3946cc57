// src/models/prescription.rs
use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};
use strum::{EnumString, Display, AsRefStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Pending,
    Verified,
    Rejected,
    Dispensed,
}

/// A medicine named on a prescription.
///
/// This is the prescriber's free text, not a link into inventory: it is never
/// resolved to a `Medicine` id and may name something the pharmacy does not stock.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct PrescribedMedicine(pub String);

impl PrescribedMedicine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub verified_by: String,
    pub notes: Option<String>,
    pub approved: bool,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub patient_name: String,
    pub patient_age: i32,
    pub doctor_name: String,
    pub medicines: Vec<PrescribedMedicine>,
    pub status: PrescriptionStatus,
    pub verification: Option<Verification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    pub fn new(request: CreatePrescriptionRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_name: request.patient_name.trim().to_string(),
            patient_age: request.patient_age,
            doctor_name: request.doctor_name.trim().to_string(),
            medicines: request
                .medicines
                .into_iter()
                .map(|name| PrescribedMedicine(name.trim().to_string()))
                .collect(),
            status: PrescriptionStatus::Pending,
            verification: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns false when the prescription already had `status`.
    pub fn set_status(&mut self, status: PrescriptionStatus, now: DateTime<Utc>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = now;
        true
    }

    pub fn verify(&mut self, request: &VerifyPrescriptionRequest, now: DateTime<Utc>) {
        self.verification = Some(Verification {
            verified_by: request.verified_by.trim().to_string(),
            notes: request.notes.clone(),
            approved: request.approved,
            verified_at: now,
        });
        self.status = if request.approved {
            PrescriptionStatus::Verified
        } else {
            PrescriptionStatus::Rejected
        };
        self.updated_at = now;
    }
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    #[validate(length(max = 255, message = "Patient name cannot exceed 255 characters"))]
    pub patient_name: String,
    pub patient_age: i32,
    #[validate(length(max = 255, message = "Doctor name cannot exceed 255 characters"))]
    pub doctor_name: String,
    #[serde(default)]
    pub medicines: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPrescriptionRequest {
    #[validate(length(max = 255, message = "Verifier name cannot exceed 255 characters"))]
    pub verified_by: String,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub approved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Prescription {
        Prescription::new(
            CreatePrescriptionRequest {
                patient_name: "Jane Roe".to_string(),
                patient_age: 42,
                doctor_name: "Dr. Who".to_string(),
                medicines: vec!["Amoxicillin 500mg".to_string()],
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_prescription_is_pending() {
        let rx = sample();
        assert_eq!(rx.status, PrescriptionStatus::Pending);
        assert_eq!(rx.medicines[0].as_str(), "Amoxicillin 500mg");
    }

    #[test]
    fn test_set_status_is_idempotent() {
        let mut rx = sample();
        assert!(rx.set_status(PrescriptionStatus::Dispensed, Utc::now()));
        let stamp = rx.updated_at;
        assert!(!rx.set_status(PrescriptionStatus::Dispensed, Utc::now()));
        assert_eq!(rx.status, PrescriptionStatus::Dispensed);
        assert_eq!(rx.updated_at, stamp);
    }

    #[test]
    fn test_rejected_verification() {
        let mut rx = sample();
        let request = VerifyPrescriptionRequest {
            verified_by: "Pharmacist Joe".to_string(),
            notes: Some("Dose too high".to_string()),
            approved: false,
        };
        rx.verify(&request, Utc::now());
        assert_eq!(rx.status, PrescriptionStatus::Rejected);
        assert!(!rx.verification.unwrap().approved);
    }

    #[test]
    fn test_prescribed_medicines_serialize_as_strings() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["medicines"][0], "Amoxicillin 500mg");
        assert_eq!(json["status"], "pending");
        assert!(json.get("patientName").is_some());
    }
}
