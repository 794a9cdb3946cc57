// src/handlers.rs
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, HttpResponseBuilder};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::store::{DataSource, Served};
use crate::AppState;

pub const DATA_SOURCE_HEADER: &str = "X-Data-Source";
pub const DEGRADED_HEADER: &str = "X-Degraded-Mode";

// ==================== COMMON STRUCTURES ====================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Which store served the data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DataSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
}

impl<T> ApiResponse<T> {
    pub fn served(served: Served<T>, message: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(served.data),
            message,
            source: Some(served.source),
            degraded: Some(served.degraded),
        }
    }
}

/// Wraps `served` in the envelope and tags the response with its source.
pub fn served_response<T: Serialize>(
    mut builder: HttpResponseBuilder,
    served: Served<T>,
    message: Option<String>,
) -> HttpResponse {
    builder.insert_header((DATA_SOURCE_HEADER, served.source.as_ref()));
    if served.degraded {
        builder.insert_header((DEGRADED_HEADER, "true"));
    }
    builder.json(ApiResponse::served(served, message))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    /// Slices an already filtered and ordered list.
    pub fn paginate(items: Vec<T>, query: &PaginationQuery) -> Self {
        let (page, per_page, offset) = query.normalize();
        let total = items.len() as i64;
        let total_pages = (total + per_page - 1) / per_page;
        let data = items
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .collect();

        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub low_stock: Option<bool>,
    pub include_inactive: Option<bool>,
    pub employee_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PaginationQuery {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }

    /// `search`, trimmed and lowercased, when non-blank.
    pub fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn date_range(&self) -> ApiResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ApiError::BadRequest(format!(
                    "'from' ({}) must not be after 'to' ({})",
                    from, to
                )));
            }
        }
        Ok((self.from, self.to))
    }

    /// Parses the optional `status` filter into `T`.
    pub fn status_filter<T: FromStr>(&self) -> ApiResult<Option<T>> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => T::from_str(raw)
                .map(Some)
                .map_err(|_| ApiError::invalid_query("status", raw)),
            None => Ok(None),
        }
    }
}

/// Parses a wire enum value that validation has already checked.
pub fn parse_enum<T: FromStr>(value: &str, field: &str) -> ApiResult<T> {
    T::from_str(value.trim())
        .map_err(|_| ApiError::ValidationFailed(vec![format!("Invalid {}: '{}'", field, value)]))
}

// ==================== PAYLOAD ERRORS ====================

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected JSON body on {}: {}", req.path(), err);
    match err {
        // Well-formed JSON whose values do not fit the request type (dates, enums, numbers).
        JsonPayloadError::Deserialize(ref e) if e.is_data() => {
            ApiError::ValidationFailed(vec![format!("Invalid field value: {}", e)]).into()
        }
        _ => ApiError::BadRequest(format!("Invalid JSON payload: {}", err)).into(),
    }
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected query string on {}: {}", req.path(), err);
    ApiError::BadRequest(format!("Invalid query parameters: {}", err)).into()
}

// ==================== SETUP ====================

pub async fn init_db(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let served = app_state.repository.initialize().await?;
    log::info!("Storage initialised on {} store", served.source);
    Ok(served_response(
        HttpResponse::Ok(),
        served,
        Some("Storage initialised".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps_page_and_size() {
        let query = PaginationQuery { page: Some(0), per_page: Some(500), ..Default::default() };
        assert_eq!(query.normalize(), (1, 100, 0));

        let query = PaginationQuery { page: Some(3), per_page: Some(10), ..Default::default() };
        assert_eq!(query.normalize(), (3, 10, 20));
    }

    #[test]
    fn test_normalize_caps_huge_page() {
        let query = PaginationQuery { page: Some(i64::MAX), per_page: Some(100), ..Default::default() };
        let (page, per_page, offset) = query.normalize();
        assert_eq!(page, MAX_PAGE);
        assert_eq!(offset, (MAX_PAGE - 1) * per_page);

        let page = PaginatedResponse::paginate(vec![1, 2, 3], &query);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_unparseable_field_value_is_validation_error() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let bad_date = serde_json::from_str::<NaiveDate>("\"2024-13-45\"").unwrap_err();
        let err = json_error_handler(JsonPayloadError::Deserialize(bad_date), &req);
        assert_eq!(err.error_response().status(), actix_web::http::StatusCode::UNPROCESSABLE_ENTITY);

        let truncated = serde_json::from_str::<NaiveDate>("\"2024-01-01").unwrap_err();
        let err = json_error_handler(JsonPayloadError::Deserialize(truncated), &req);
        assert_eq!(err.error_response().status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_paginate_slices_items() {
        let query = PaginationQuery { page: Some(2), per_page: Some(2), ..Default::default() };
        let page = PaginatedResponse::paginate(vec![1, 2, 3, 4, 5], &query);
        assert_eq!(page.data, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_inverted_date_range_is_rejected() {
        let query = PaginationQuery {
            from: NaiveDate::from_ymd_opt(2024, 6, 2),
            to: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..Default::default()
        };
        assert!(query.date_range().is_err());
    }

    #[test]
    fn test_served_envelope_carries_source() {
        let served = Served { data: 7, source: DataSource::Local, degraded: true };
        let body = serde_json::to_value(ApiResponse::served(served, None)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 7);
        assert_eq!(body["source"], "local");
        assert_eq!(body["degraded"], true);
        assert!(body.get("message").is_none());
    }
}
