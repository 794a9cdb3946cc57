// src/prescription_handlers.rs
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{served_response, PaginationQuery};
use crate::models::*;
use crate::validator::{validate_request, FieldValidator, PRESCRIPTION_STATUSES};

pub async fn get_prescriptions(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let status = query.status_filter::<PrescriptionStatus>()?;
    let served = app_state.repository.list_prescriptions(status).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn get_prescription(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.get_prescription(&path).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn create_prescription(
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreatePrescriptionRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let prescription = Prescription::new(request, Utc::now());
    let served = app_state.repository.create_prescription(&prescription).await?;
    info!(
        "Prescription {} created for {} ({} medicine(s))",
        served.data.id,
        served.data.patient_name,
        served.data.medicines.len()
    );

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Prescription created successfully".to_string()),
    ))
}

/// Setting the status a prescription already has succeeds without touching it.
pub async fn update_prescription_status(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> ApiResult<HttpResponse> {
    let status: PrescriptionStatus =
        FieldValidator::one_of(&body.status, "Status", PRESCRIPTION_STATUSES)
            .map_err(|e| ApiError::ValidationFailed(vec![e]))?;

    let served = app_state.repository.set_prescription_status(&path, status).await?;
    info!("Prescription {} is now {}", served.data.id, served.data.status);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Prescription status updated".to_string()),
    ))
}

pub async fn verify_prescription(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<VerifyPrescriptionRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let served = app_state.repository.verify_prescription(&path, &request).await?;
    info!(
        "Prescription {} {} by {}",
        served.data.id,
        if request.approved { "approved" } else { "rejected" },
        request.verified_by.trim()
    );

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Prescription verified".to_string()),
    ))
}
