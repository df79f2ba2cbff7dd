//! AIS Contact Tracking
//!
//! This module turns raw AIS contacts into a list of tracked contacts with
//! bearing, distance, freshness and collision risk (CPA/TCPA). It is
//! platform-independent and has no I/O.
//!
//! # Architecture
//!
//! - **cpa**: CPA/TCPA calculation on a linear relative-motion model
//! - **cache**: per-contact CPA cache with hysteresis
//! - **tracker**: per-cycle processing and the [`ContactTracker`]
//! - **types**: output types, settings, alert levels
//!
//! # Usage
//!
//! ```rust
//! use seawatch_core::ais::{ContactTracker, TrackerSettings};
//! use seawatch_core::telemetry::{Position, RawContact, TelemetrySnapshot};
//!
//! let mut telemetry = TelemetrySnapshot::default();
//! telemetry.own_position = Some(Position::new(52.0, 4.0));
//! telemetry.contacts.insert(
//!     "urn:mrn:imo:mmsi:244123456".to_string(),
//!     RawContact {
//!         latitude: Some(52.01),
//!         longitude: Some(4.0),
//!         timestamp: Some(1_700_000_000_000),
//!         ..Default::default()
//!     },
//! );
//!
//! let mut tracker = ContactTracker::new(telemetry, TrackerSettings::default());
//! tracker.on_telemetry_update(1_700_000_001_000);
//! assert_eq!(tracker.tracked_contacts().len(), 1);
//! ```

mod cache;
mod cpa;
mod tracker;
mod types;

pub use cache::{is_significant_change, CpaCache};
pub use cpa::{
    calculate_cpa_tcpa, CpaInput, CpaResult, Kinematics, MIN_RELATIVE_SPEED_SQ, MIN_SPEED_MS,
};
pub use tracker::{track_contacts, ContactTracker, CycleInput};
pub use types::*;
