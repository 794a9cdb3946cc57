// src/ticket_handlers.rs
//! Internal support tickets raised by staff.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{parse_enum, served_response, PaginationQuery};
use crate::models::*;
use crate::validator::{validate_request, FieldValidator, TICKET_STATUSES};

pub async fn get_tickets(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let status = query.status_filter::<TicketStatus>()?;
    let served = app_state.repository.list_tickets(status).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn get_ticket(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.get_ticket(&path).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn create_ticket(
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreateTicketRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let priority = match request.priority.as_deref() {
        Some(raw) => parse_enum(raw, "priority")?,
        None => TicketPriority::Medium,
    };
    let ticket = Ticket::new(request, priority, Utc::now());
    let served = app_state.repository.create_ticket(&ticket).await?;
    info!("Ticket {} opened: {} ({})", served.data.id, served.data.title, served.data.priority);

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Ticket created successfully".to_string()),
    ))
}

pub async fn update_ticket(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<UpdateTicketRequest>,
) -> ApiResult<HttpResponse> {
    let fields = body.into_inner();
    validate_request(&fields)?;

    let update = TicketUpdate {
        priority: fields.priority.as_deref().map(|p| parse_enum(p, "priority")).transpose()?,
        status: fields.status.as_deref().map(|s| parse_enum(s, "status")).transpose()?,
        fields,
    };
    let served = app_state.repository.update_ticket(&path, &update).await?;
    info!("Ticket {} updated", served.data.id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Ticket updated successfully".to_string()),
    ))
}

pub async fn update_ticket_status(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
) -> ApiResult<HttpResponse> {
    let status: TicketStatus = FieldValidator::one_of(&body.status, "Status", TICKET_STATUSES)
        .map_err(|e| ApiError::ValidationFailed(vec![e]))?;

    let served = app_state.repository.set_ticket_status(&path, status).await?;
    info!("Ticket {} is now {}", served.data.id, served.data.status);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Ticket status updated".to_string()),
    ))
}

pub async fn delete_ticket(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = path.into_inner();
    let served = app_state.repository.delete_ticket(&id).await?;
    info!("Ticket {} deleted", id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Ticket deleted successfully".to_string()),
    ))
}
