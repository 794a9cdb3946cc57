// src/employee_handlers.rs
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::AppState;
use crate::error::ApiResult;
use crate::handlers::{parse_enum, served_response, PaginationQuery};
use crate::models::*;
use crate::validator::validate_request;

// ==================== EMPLOYEES ====================

pub async fn get_employees(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let status = query.status_filter::<EmployeeStatus>()?;
    let needle = query.needle();

    let served = app_state.repository.list_employees().await?;
    let served = served.map(|employees| {
        employees
            .into_iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .filter(|e| match needle {
                Some(ref n) => {
                    e.name.to_lowercase().contains(n)
                        || e.email.contains(n)
                        || e.role.to_lowercase().contains(n)
                }
                None => true,
            })
            .collect::<Vec<_>>()
    });

    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn get_employee(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.get_employee(&path).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn create_employee(
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreateEmployeeRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let status = match request.status.as_deref() {
        Some(raw) => parse_enum(raw, "status")?,
        None => EmployeeStatus::Active,
    };
    let employee = Employee::new(request, status, Utc::now());
    let served = app_state.repository.create_employee(&employee).await?;
    info!("Employee {} added: {} ({})", served.data.id, served.data.name, served.data.role);

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Employee created successfully".to_string()),
    ))
}

pub async fn update_employee(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<UpdateEmployeeRequest>,
) -> ApiResult<HttpResponse> {
    let fields = body.into_inner();
    validate_request(&fields)?;

    let update = EmployeeUpdate {
        status: fields.status.as_deref().map(|s| parse_enum(s, "status")).transpose()?,
        fields,
    };
    let served = app_state.repository.update_employee(&path, &update).await?;
    info!("Employee {} updated", served.data.id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Employee updated successfully".to_string()),
    ))
}

/// Removes the employee together with their time entries.
pub async fn delete_employee(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let served = app_state.repository.delete_employee(&id).await?;
    info!("Employee {} deleted", id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Employee deleted successfully".to_string()),
    ))
}

// ==================== TIME TRACKING ====================

pub async fn clock_in(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.clock_in(&path).await?;
    info!("Employee {} clocked in at {}", served.data.employee_id, served.data.clock_in);

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Clocked in".to_string()),
    ))
}

pub async fn clock_out(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.clock_out(&path).await?;
    info!(
        "Employee {} clocked out after {:.2}h",
        served.data.employee_id,
        served.data.hours_worked.unwrap_or_default()
    );

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Clocked out".to_string()),
    ))
}

pub async fn get_employee_time_entries(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    app_state.repository.get_employee(&id).await?;

    let served = app_state.repository.list_time_entries(Some(&id)).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn get_time_entries(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let employee_id = query.employee_id.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let served = app_state.repository.list_time_entries(employee_id).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}
