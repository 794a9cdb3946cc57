// src/auth.rs
//! Static bearer-token check for the `/api` scope.
use actix_web::{dev::ServiceRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;

use crate::error::ApiError;

/// The token every API caller must present.
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn verify(&self, presented: &str) -> Result<(), ApiError> {
        if constant_time_eq(self.token.as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Invalid API token".to_string()))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn token_middleware(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let auth = match req.app_data::<web::Data<TokenAuth>>() {
        Some(auth) => auth,
        None => {
            log::error!("TokenAuth not found in app data");
            return Err((
                ApiError::InternalServerError("Auth not configured".to_string()).into(),
                req,
            ));
        }
    };

    match auth.verify(credentials.token()) {
        Ok(()) => Ok(req),
        Err(err) => {
            log::warn!("Rejected request to {}: {}", req.path(), err);
            Err((err.into(), req))
        }
    }
}
