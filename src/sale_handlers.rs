// src/sale_handlers.rs
use actix_web::{web, HttpResponse};
use log::info;
use std::sync::Arc;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{parse_enum, served_response, PaginatedResponse, PaginationQuery};
use crate::handlers::{DATA_SOURCE_HEADER, DEGRADED_HEADER};
use crate::models::*;
use crate::validator::validate_request;

fn sale_filter(query: &PaginationQuery) -> ApiResult<SaleFilter> {
    let (from, to) = query.date_range()?;
    Ok(SaleFilter { from, to })
}

pub async fn get_sales(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let filter = sale_filter(&query)?;
    let served = app_state.repository.list_sales(&filter).await?;
    let page = served.map(|sales| PaginatedResponse::paginate(sales, &query));
    Ok(served_response(HttpResponse::Ok(), page, None))
}

pub async fn get_sale(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let served = app_state.repository.get_sale(&path).await?;
    Ok(served_response(HttpResponse::Ok(), served, None))
}

/// Records a sale and takes its quantities out of stock in one step.
pub async fn create_sale(
    app_state: web::Data<Arc<AppState>>,
    body: web::Json<CreateSaleRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();
    validate_request(&request)?;

    let new_sale = NewSale {
        customer_name: request.customer_name.filter(|n| !n.trim().is_empty()),
        customer_phone: request.customer_phone.filter(|p| !p.trim().is_empty()),
        payment_method: parse_enum(&request.payment_method, "payment method")?,
        lines: request.items,
    };

    let served = app_state.repository.record_sale(&new_sale).await?;
    info!(
        "Sale {} recorded: {} line(s), total {:.2} ({})",
        served.data.id,
        served.data.items.len(),
        served.data.total,
        served.source
    );

    Ok(served_response(
        HttpResponse::Created(),
        served,
        Some("Sale recorded successfully".to_string()),
    ))
}

pub async fn export_sales(
    app_state: web::Data<Arc<AppState>>,
    query: web::Query<PaginationQuery>,
) -> ApiResult<HttpResponse> {
    let filter = sale_filter(&query)?;
    let served = app_state.repository.list_sales(&filter).await?;
    let count = served.data.len();

    let mut csv_data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut csv_data);

        writer.write_record([
            "Sale ID", "Timestamp", "Customer", "Phone", "Payment Method", "Items", "Units", "Total",
        ])?;

        for sale in &served.data {
            let units: i64 = sale.items.iter().map(|i| i.quantity).sum();
            let items = sale
                .items
                .iter()
                .map(|i| format!("{} x{}", i.name, i.quantity))
                .collect::<Vec<_>>()
                .join("; ");

            writer.write_record([
                sale.id.clone(),
                sale.timestamp.to_rfc3339(),
                sale.customer_name.clone().unwrap_or_default(),
                sale.customer_phone.clone().unwrap_or_default(),
                sale.payment_method.to_string(),
                items,
                units.to_string(),
                format!("{:.2}", sale.total),
            ])?;
        }

        writer.flush().map_err(|e| ApiError::InternalServerError(e.to_string()))?;
    }

    info!("Exported {} sale(s) as CSV", count);

    let mut response = HttpResponse::Ok();
    response
        .content_type("text/csv; charset=utf-8")
        .insert_header(("Content-Disposition", "attachment; filename=\"sales.csv\""))
        .insert_header((DATA_SOURCE_HEADER, served.source.as_ref()));
    if served.degraded {
        response.insert_header((DEGRADED_HEADER, "true"));
    }
    Ok(response.body(csv_data))
}
