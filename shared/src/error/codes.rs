//! Unified error codes for the chamber queue service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Queue errors
//! - 5xxx: Journey errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Queue ====================
    /// Location not found
    LocationNotFound = 4001,
    /// Booking not found
    BookingNotFound = 4002,
    /// Admission gate is closed
    AdmissionClosed = 4003,
    /// Every issued ticket has already been called
    QueueExhausted = 4004,
    /// Serial number already taken for (location, date)
    SerialConflict = 4005,
    /// Location lock could not be acquired in time
    LocationBusy = 4006,
    /// Booking status transition not allowed
    BookingStatusInvalid = 4007,

    // ==================== 5xxx: Journey ====================
    /// Provider not found
    ProviderNotFound = 5001,
    /// Travel status transition not allowed
    TravelTransitionInvalid = 5002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the caller may retry the same request unchanged
    ///
    /// Lock contention and serial collisions are transient; the core never
    /// retries on its own, backoff is left to the caller.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::LocationBusy | ErrorCode::SerialConflict | ErrorCode::TimeoutError
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Queue
            ErrorCode::LocationNotFound => "Location not found",
            ErrorCode::BookingNotFound => "Booking not found",
            ErrorCode::AdmissionClosed => "Admission is closed for this location",
            ErrorCode::QueueExhausted => "All booked patients have been called",
            ErrorCode::SerialConflict => "Serial number already allocated",
            ErrorCode::LocationBusy => "Location is busy, retry later",
            ErrorCode::BookingStatusInvalid => "Booking status change not allowed",

            // Journey
            ErrorCode::ProviderNotFound => "Provider not found",
            ErrorCode::TravelTransitionInvalid => "Travel status change not allowed",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Queue
            4001 => Ok(ErrorCode::LocationNotFound),
            4002 => Ok(ErrorCode::BookingNotFound),
            4003 => Ok(ErrorCode::AdmissionClosed),
            4004 => Ok(ErrorCode::QueueExhausted),
            4005 => Ok(ErrorCode::SerialConflict),
            4006 => Ok(ErrorCode::LocationBusy),
            4007 => Ok(ErrorCode::BookingStatusInvalid),

            // Journey
            5001 => Ok(ErrorCode::ProviderNotFound),
            5002 => Ok(ErrorCode::TravelTransitionInvalid),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
