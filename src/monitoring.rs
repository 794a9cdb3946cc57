// src/monitoring.rs
use actix_web::{HttpResponse, web};
use futures_util::future::LocalBoxFuture;
use serde::Serialize;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use chrono::{DateTime, Utc};
use tokio::time::{interval, Duration};

use crate::handlers::DEGRADED_HEADER;
use crate::store::{Repository, StoreStatus};
use crate::AppState;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub degraded_count: Arc<AtomicU64>,
    pub response_times: Arc<std::sync::Mutex<Vec<u64>>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
            degraded_count: Arc::new(AtomicU64::new(0)),
            response_times: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn increment_requests(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_degraded(&self) {
        self.degraded_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response_time(&self, time_ms: u64) {
        if let Ok(mut times) = self.response_times.lock() {
            times.push(time_ms);
            if times.len() > 1000 {
                times.remove(0);
            }
        }
    }

    pub fn average_response_time(&self) -> f64 {
        match self.response_times.lock() {
            Ok(times) if !times.is_empty() => times.iter().sum::<u64>() as f64 / times.len() as f64,
            _ => 0.0,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: StoreStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub requests_total: u64,
    pub errors_total: u64,
    pub degraded_responses_total: u64,
    pub avg_response_time_ms: f64,
}

/// `healthy` when the primary store answers; `degraded` when requests are
/// being served by the fallback; `unavailable` when there is nowhere to go.
pub async fn health_check(app_state: web::Data<Arc<AppState>>) -> HttpResponse {
    let storage = app_state.repository.status().await;
    let status = match (storage.primary_reachable, storage.fallback.is_some()) {
        (true, _) if !storage.degraded => "healthy",
        (_, true) => "degraded",
        _ => "unavailable",
    };

    let response = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (Utc::now() - app_state.started_at).num_seconds().max(0) as u64,
        storage,
    };

    if status == "unavailable" {
        HttpResponse::ServiceUnavailable().json(response)
    } else {
        HttpResponse::Ok().json(response)
    }
}

pub async fn metrics_endpoint(metrics: web::Data<Arc<Metrics>>) -> HttpResponse {
    let response = MetricsResponse {
        requests_total: metrics.request_count.load(Ordering::Relaxed),
        errors_total: metrics.error_count.load(Ordering::Relaxed),
        degraded_responses_total: metrics.degraded_count.load(Ordering::Relaxed),
        avg_response_time_ms: metrics.average_response_time(),
    };

    HttpResponse::Ok().json(response)
}

pub struct RequestLogger {
    metrics: Arc<Metrics>,
}

impl RequestLogger {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> actix_web::dev::Transform<S, actix_web::dev::ServiceRequest> for RequestLogger
where
    S: actix_web::dev::Service<
        actix_web::dev::ServiceRequest,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
    B: 'static,
{
    type Response = actix_web::dev::ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerMiddleware {
            service,
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
    metrics: Arc<Metrics>,
}

impl<S, B> actix_web::dev::Service<actix_web::dev::ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: actix_web::dev::Service<
        actix_web::dev::ServiceRequest,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    S::Future: 'static,
    B: 'static,
{
    type Response = actix_web::dev::ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: actix_web::dev::ServiceRequest) -> Self::Future {
        let start_time = std::time::Instant::now();
        let metrics = self.metrics.clone();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let fut = self.service.call(req);

        Box::pin(async move {
            metrics.increment_requests();
            let res = fut.await;
            let elapsed_ms = start_time.elapsed().as_millis() as u64;
            metrics.record_response_time(elapsed_ms);

            if let Ok(ref response) = res {
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    metrics.increment_errors();
                }
                if status.is_server_error() {
                    tracing::warn!(%method, %path, status = status.as_u16(), elapsed_ms, "request failed");
                }
                if response.headers().contains_key(DEGRADED_HEADER) {
                    metrics.increment_degraded();
                    tracing::debug!(%method, %path, elapsed_ms, "served from fallback store");
                }
            }
            res
        })
    }
}

/// Re-checks the primary store on a fixed interval while the repository is degraded.
pub async fn start_storage_watchdog(app_state: Arc<AppState>, period: Duration) {
    let mut ticker = interval(period);
    log::info!("Storage watchdog started ({}s interval)", period.as_secs());

    loop {
        ticker.tick().await;
        probe(&app_state.repository).await;
    }
}

async fn probe(repository: &Repository) {
    if !repository.is_degraded() {
        return;
    }
    if repository.probe_primary().await {
        log::info!("Storage watchdog: primary store is back");
    } else {
        log::debug!("Storage watchdog: primary store still unreachable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[::core::prelude::v1::test]
    fn test_average_response_time() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_response_time(), 0.0);
        metrics.record_response_time(10);
        metrics.record_response_time(30);
        assert_eq!(metrics.average_response_time(), 20.0);
    }

    #[actix_rt::test]
    async fn test_request_logger_counts_errors() {
        let metrics = Arc::new(Metrics::new());
        let app = test::init_service(
            App::new()
                .wrap(RequestLogger::new(metrics.clone()))
                .route("/ok", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        test::call_service(&app, test::TestRequest::get().uri("/ok").to_request()).await;
        test::call_service(&app, test::TestRequest::get().uri("/missing").to_request()).await;

        assert_eq!(metrics.request_count.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.error_count.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.degraded_count.load(Ordering::Relaxed), 0);
    }
}
