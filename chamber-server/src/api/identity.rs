//! Requester identity
//!
//! Authentication happens upstream; the identity layer forwards the
//! authenticated requester in the `x-requester-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::utils::AppError;
use crate::utils::validation::MAX_REQUESTER_ID_LEN;

pub const REQUESTER_HEADER: &str = "x-requester-id";

/// Authenticated requester making the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterId(pub String);

impl<S> FromRequestParts<S> for RequesterId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(REQUESTER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                tracing::debug!(uri = %parts.uri, "Request without requester identity");
                AppError::invalid_request(format!("Missing {} header", REQUESTER_HEADER))
            })?;

        if value.len() > MAX_REQUESTER_ID_LEN {
            return Err(AppError::validation(format!(
                "{} is too long (max {})",
                REQUESTER_HEADER, MAX_REQUESTER_ID_LEN
            )));
        }

        Ok(RequesterId(value.to_string()))
    }
}
