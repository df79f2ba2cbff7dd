//! Telemetry abstraction for the contact tracker.
//!
//! The tracker does not subscribe to anything. It pulls own-ship state and
//! the current AIS contact snapshot from a [`TelemetryService`] each time the
//! host calls [`ContactTracker::on_telemetry_update`].
//!
//! # Design
//!
//! The trait is **pull-based** and synchronous. A SignalK client, an NMEA
//! decoder or a test fixture can all sit behind it; the tracker only needs
//! the four accessors below.
//!
//! Units at this seam are fixed: degrees for positions and courses, meters
//! per second for speeds, milliseconds since the Unix epoch for timestamps.
//! Converting from whatever the feed delivers is the implementor's job.
//!
//! [`ContactTracker::on_telemetry_update`]: crate::ais::ContactTracker::on_telemetry_update

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix timestamp (ms) of the observation, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude,
            longitude,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A contact as delivered by the AIS feed, before tracking
///
/// Every field is optional; the tracker decides what it can do with
/// whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Course over ground in degrees true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_over_ground: Option<f64>,
    /// Speed over ground in m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_over_ground: Option<f64>,
    /// Unix timestamp (ms) of the last observation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl RawContact {
    /// Latitude and longitude, if both are known
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Source of own-ship state and AIS contacts
pub trait TelemetryService {
    /// Own position, or `None` before the first fix
    fn own_position(&self) -> Option<Position>;

    /// Own course over ground in degrees true
    fn own_course_over_ground(&self) -> Option<f64>;

    /// Own speed over ground in m/s
    fn own_speed_over_ground(&self) -> Option<f64>;

    /// Snapshot of all live contacts keyed by identifier
    fn live_contacts(&self) -> HashMap<String, RawContact>;
}

/// Plain in-memory telemetry, filled in by the host
///
/// Useful when the host already has the values at hand and just needs to
/// hand them to the tracker.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub own_position: Option<Position>,
    pub own_course: Option<f64>,
    pub own_speed: Option<f64>,
    pub contacts: HashMap<String, RawContact>,
}

impl TelemetryService for TelemetrySnapshot {
    fn own_position(&self) -> Option<Position> {
        self.own_position
    }

    fn own_course_over_ground(&self) -> Option<f64> {
        self.own_course
    }

    fn own_speed_over_ground(&self) -> Option<f64> {
        self.own_speed
    }

    fn live_contacts(&self) -> HashMap<String, RawContact> {
        self.contacts.clone()
    }
}

impl<T: TelemetryService + ?Sized> TelemetryService for &T {
    fn own_position(&self) -> Option<Position> {
        (**self).own_position()
    }

    fn own_course_over_ground(&self) -> Option<f64> {
        (**self).own_course_over_ground()
    }

    fn own_speed_over_ground(&self) -> Option<f64> {
        (**self).own_speed_over_ground()
    }

    fn live_contacts(&self) -> HashMap<String, RawContact> {
        (**self).live_contacts()
    }
}
