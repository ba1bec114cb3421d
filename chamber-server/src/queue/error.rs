use super::storage::StorageError;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Queue / journey errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    /// Per-location lock could not be acquired within the configured wait
    #[error("Location {0} is busy, try again")]
    LocationBusy(String),

    #[error("Serial {serial} already taken at {location_id} on {date}")]
    SerialTaken {
        location_id: String,
        date: String,
        serial: u32,
    },

    #[error("Admission is closed for location {0}")]
    AdmissionClosed(String),

    #[error("All booked patients have been called")]
    QueueExhausted,

    #[error("Invalid booking status change: {0}")]
    InvalidBookingStatus(String),

    #[error("Invalid travel transition: {0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Validation(String),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl QueueError {
    /// Contention failures; the same request may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LocationBusy(_) | Self::SerialTaken { .. })
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Storage(e) => {
                tracing::error!(error = %e, "Storage error occurred");
                AppError::database(e.to_string())
            }
            QueueError::LocationNotFound(id) => AppError::with_message(
                ErrorCode::LocationNotFound,
                format!("Location not found: {}", id),
            )
            .with_detail("location_id", id),
            QueueError::ProviderNotFound(id) => AppError::with_message(
                ErrorCode::ProviderNotFound,
                format!("Provider not found: {}", id),
            )
            .with_detail("provider_id", id),
            QueueError::BookingNotFound(id) => AppError::with_message(
                ErrorCode::BookingNotFound,
                format!("Booking not found: {}", id),
            )
            .with_detail("booking_id", id),
            QueueError::LocationBusy(id) => {
                AppError::busy(format!("Location {} is busy, try again", id))
                    .with_detail("location_id", id)
            }
            e @ QueueError::SerialTaken { .. } => {
                AppError::with_message(ErrorCode::SerialConflict, e.to_string())
                    .with_detail("retryable", true)
            }
            QueueError::AdmissionClosed(id) => AppError::with_message(
                ErrorCode::AdmissionClosed,
                "Admission is closed for this location",
            )
            .with_detail("location_id", id),
            QueueError::QueueExhausted => AppError::new(ErrorCode::QueueExhausted),
            QueueError::InvalidBookingStatus(msg) => {
                AppError::with_message(ErrorCode::BookingStatusInvalid, msg)
            }
            QueueError::InvalidTransition(msg) => {
                AppError::with_message(ErrorCode::TravelTransitionInvalid, msg)
            }
            QueueError::Validation(msg) => AppError::validation(msg),
        }
    }
}
