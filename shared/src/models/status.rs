//! Live status views (polled or streamed by clients)

use serde::{Deserialize, Serialize};

use super::location::TravelStatus;

/// Status read for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStatusView {
    pub location_id: String,
    pub status: TravelStatus,
    /// Great-circle distance from the provider to the destination
    pub distance_km: Option<f64>,
    /// Approximate, see journey ETA heuristic
    pub eta_minutes: Option<u32>,
    pub delay_minutes: u32,
    pub current_served: u32,
    pub total_issued: u32,
    pub is_admitting: bool,
    pub max_admissions: u32,
}

/// Result of a position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOutcome {
    pub provider_id: String,
    pub location_id: Option<String>,
    pub distance_km: Option<f64>,
    pub eta_minutes: Option<u32>,
    pub arrived: bool,
}

/// Result of a daily reset run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetReport {
    pub date: chrono::NaiveDate,
    pub locations_reset: usize,
    pub providers_reset: usize,
}
