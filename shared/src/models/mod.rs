//! Data models
//!
//! Shared between chamber-server and clients (via API).
//! IDs are UUID v4 strings; dates are calendar days (`YYYY-MM-DD`).

pub mod booking;
pub mod location;
pub mod provider;
pub mod schedule;
pub mod status;

// Re-exports
pub use booking::*;
pub use location::*;
pub use provider::*;
pub use schedule::*;
pub use status::*;
