// src/medicine_handlers.rs
//! Inventory endpoints. Deleting a medicine only deactivates it so that past
//! sales keep pointing at a real record.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::AppState;
use crate::error::ApiResult;
use crate::handlers::{parse_enum, served_response, PaginatedResponse, PaginationQuery};
use crate::models::*;
use crate::validator::validate_request;

pub async fn get_medicines(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let filter = MedicineFilter {
        search: query.needle(),
        category: query.category.clone().filter(|c| !c.trim().is_empty()),
        low_stock: query.low_stock.unwrap_or(false),
        include_inactive: query.include_inactive.unwrap_or(false),
    };

    let served = app_state.repository.list_medicines(&filter).await?;
    let page = served.map(|medicines| PaginatedResponse::paginate(medicines, &query));
    Ok(served_response(HttpResponse::Ok(), page, None))
}

pub async fn get_medicine(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.get_medicine(&path).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

pub async fn create_medicine(
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreateMedicineRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let medicine = Medicine::new(request, Utc::now());
    let served = app_state.repository.create_medicine(&medicine).await?;
    info!("Medicine created: {} ({}) on {}", served.data.name, served.data.id, served.source);

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Medicine created successfully".to_string()),
    ))
}

pub async fn update_medicine(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<UpdateMedicineRequest>,
) -> ApiResult<HttpResponse> {
    let update = body.into_inner();
    validate_request(&update)?;

    let served = app_state.repository.update_medicine(&path, &update).await?;
    info!("Medicine updated: {}", served.data.id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Medicine updated successfully".to_string()),
    ))
}

pub async fn delete_medicine(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.deactivate_medicine(&path).await?;
    info!("Medicine deactivated: {}", served.data.id);

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Medicine deactivated".to_string()),
    ))
}

pub async fn adjust_stock(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
    body: web::Json<StockAdjustmentRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let adjustment = StockAdjustment {
        quantity: request.quantity,
        operation: parse_enum(&request.operation, "operation")?,
    };
    let served = app_state.repository.adjust_stock(&path, adjustment).await?;
    info!(
        "Stock {} {} for {}: now {}",
        adjustment.operation, adjustment.quantity, served.data.id, served.data.stock
    );

    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Stock updated successfully".to_string()),
    ))
}
