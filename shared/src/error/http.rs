//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::LocationNotFound
            | Self::BookingNotFound
            | Self::ProviderNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict (retryable contention + duplicates)
            Self::AlreadyExists | Self::SerialConflict | Self::LocationBusy => {
                StatusCode::CONFLICT
            }

            // 422 Unprocessable (rejected by current state)
            Self::AdmissionClosed
            | Self::QueueExhausted
            | Self::BookingStatusInvalid
            | Self::TravelTransitionInvalid => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::ValueOutOfRange => StatusCode::BAD_REQUEST,
        }
    }
}
