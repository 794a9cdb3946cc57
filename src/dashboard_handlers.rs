// src/dashboard_handlers.rs
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use crate::dashboard;
use crate::error::ApiResult;
use crate::handlers::served_response;
use crate::models::MedicineFilter;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

pub async fn get_dashboard_stats(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let today = Utc::now().date_naive();
    let warning_days = app_state.config.dashboard.expiry_warning_days;

    let snapshot = app_state.repository.dashboard_snapshot().await?;
    let stats = snapshot.map(|s| dashboard::compute_stats(&s, today, warning_days));
    Ok(served_response(HttpResponse::Ok(), stats, None))
}

pub async fn get_recent_activity(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<ActivityQuery>,
) -> ApiResult<HttpResponse> {
    let limit = query
        .limit
        .unwrap_or(app_state.config.dashboard.activity_limit)
        .clamp(1, 100);

    let snapshot = app_state.repository.dashboard_snapshot().await?;
    let activity = snapshot.map(|s| dashboard::recent_activity(&s, limit));
    Ok(served_response(HttpResponse::Ok(), activity, None))
}

pub async fn get_alerts(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let today = Utc::now().date_naive();
    let warning_days = app_state.config.dashboard.expiry_warning_days;

    let served = app_state.repository.list_medicines(&MedicineFilter::default()).await?;
    let alerts = served.map(|medicines| dashboard::alerts(&medicines, today, warning_days));
    Ok(served_response(HttpResponse::Ok(), alerts, None))
}
