//! Provider Model (the mobile service provider travelling to a location)

use serde::{Deserialize, Serialize};

use super::location::Coordinates;

/// Provider record
///
/// `position` holds the latest report and is what location status reads
/// while the provider is en route. It is cleared on arrival, session end and
/// the daily reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub position: Option<Coordinates>,
    pub is_en_route: bool,
    /// Location of the journey in progress
    pub active_location_id: Option<String>,
    /// Last position report (Unix millis)
    pub last_report_at: Option<i64>,
    pub created_at: i64,
}

/// Register provider payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCreate {
    pub name: String,
}

/// Start journey payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyStart {
    pub location_id: String,
}

/// Position report payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionReport {
    pub lat: f64,
    pub lng: f64,
}

/// End session payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnd {
    pub location_id: String,
}
