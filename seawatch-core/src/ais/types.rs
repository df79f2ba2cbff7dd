//! AIS Tracking Type Definitions
//!
//! Types produced by the contact tracker for the presentation layer, and the
//! settings that drive it.

use serde::{Deserialize, Serialize};

/// Data recency of a tracked contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Observed within the live window (3 minutes by default)
    Live,
    /// Observed within the stale window (10 minutes by default)
    Stale,
    /// Older than the stale window but not yet pruned
    Old,
}

impl Freshness {
    /// Classify an age in milliseconds
    pub fn classify(age_ms: u64, settings: &TrackerSettings) -> Self {
        if age_ms < settings.live_max_age_ms {
            Freshness::Live
        } else if age_ms < settings.stale_max_age_ms {
            Freshness::Stale
        } else {
            Freshness::Old
        }
    }
}

impl std::fmt::Display for Freshness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Freshness::Live => write!(f, "live"),
            Freshness::Stale => write!(f, "stale"),
            Freshness::Old => write!(f, "old"),
        }
    }
}

/// SignalK notification alert states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Normal,
    Alert,
    Warn,
    Alarm,
    Emergency,
}

impl AlertState {
    /// Collision alert level for a CPA/TCPA pair
    ///
    /// Only approaching contacts (finite, positive TCPA within the TCPA
    /// threshold) can raise an alert; the level then depends on how deep the
    /// CPA falls inside the CPA threshold.
    pub fn classify(cpa: Option<f64>, tcpa: Option<f64>, settings: &TrackerSettings) -> Self {
        let (Some(cpa), Some(tcpa)) = (cpa, tcpa) else {
            return AlertState::Normal;
        };

        if !tcpa.is_finite() || tcpa <= 0.0 || tcpa > settings.tcpa_threshold {
            return AlertState::Normal;
        }

        let threshold = settings.cpa_threshold;
        if cpa < threshold * 0.25 {
            AlertState::Emergency
        } else if cpa < threshold * 0.5 {
            AlertState::Alarm
        } else if cpa < threshold * 0.75 {
            AlertState::Warn
        } else if cpa < threshold {
            AlertState::Alert
        } else {
            AlertState::Normal
        }
    }

    /// Convert to SignalK notification state string
    pub fn as_signalk_state(&self) -> &'static str {
        match self {
            AlertState::Normal => "normal",
            AlertState::Alert => "alert",
            AlertState::Warn => "warn",
            AlertState::Alarm => "alarm",
            AlertState::Emergency => "emergency",
        }
    }
}

/// A contact annotated with geometry, freshness and collision risk
///
/// Rebuilt every tracking cycle. Only the CPA/TCPA pair survives between
/// cycles, through the tracker's cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedContact {
    /// Identifier as delivered by the feed (usually a URN)
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmsi: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Course over ground in degrees true
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_over_ground: Option<f64>,
    /// Speed over ground in m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_over_ground: Option<f64>,
    /// Unix timestamp (ms) of the last observation
    pub last_seen: u64,
    /// Bearing from own ship in degrees (0-360, true north)
    pub bearing: f64,
    /// Distance from own ship in meters
    pub distance: f64,
    pub freshness: Freshness,
    /// Closest point of approach in meters
    pub cpa: Option<f64>,
    /// Time to closest point of approach in seconds.
    /// Infinite when the contact never converges (written as `null` in JSON).
    pub tcpa: Option<f64>,
    pub age_minutes: f64,
    /// Classified on this cycle's CPA/TCPA, not the cached pair reported above
    pub alert: AlertState,
}

impl TrackedContact {
    /// Check if the contact is approaching and inside the alert thresholds
    pub fn is_dangerous(&self) -> bool {
        self.alert != AlertState::Normal
    }
}

/// Contact tracker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerSettings {
    /// Minimum time between two tracking cycles in milliseconds
    pub update_interval_ms: u64,
    /// Contacts younger than this are live
    pub live_max_age_ms: u64,
    /// Contacts younger than this (but not live) are stale
    pub stale_max_age_ms: u64,
    /// Contacts older than this are dropped
    pub prune_age_ms: u64,
    /// A new CPA must differ from the cached one by at least this many meters...
    pub cpa_min_change_meters: f64,
    /// ...and by at least this fraction of the cached value
    pub cpa_min_change_ratio: f64,
    /// CPA threshold in meters for collision alerts
    pub cpa_threshold: f64,
    /// TCPA threshold in seconds for collision alerts
    pub tcpa_threshold: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        TrackerSettings {
            update_interval_ms: 500,
            live_max_age_ms: 3 * 60 * 1000,
            stale_max_age_ms: 10 * 60 * 1000,
            prune_age_ms: 15 * 60 * 1000,
            cpa_min_change_meters: 50.0,
            cpa_min_change_ratio: 0.10,
            cpa_threshold: 500.0,  // 500 meters
            tcpa_threshold: 600.0, // 10 minutes
        }
    }
}

/// Outcome of one tracking cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    /// Contacts in the output list
    pub tracked: usize,
    /// Contacts dropped for exceeding the prune threshold
    pub expired: usize,
    /// Contacts skipped for lack of a position
    pub missing_position: usize,
    /// Contacts whose CPA could not be determined this cycle
    pub undetermined: usize,
    /// Cache entries removed by the sweep
    pub swept: usize,
    /// True when the cycle ran without an own position
    pub own_position_missing: bool,
    /// Distance own ship moved since the previous cycle, in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_displacement: Option<f64>,
}

/// Extract the MMSI from an AIS contact identifier
///
/// Accepts `urn:mrn:imo:mmsi:230099999`, with or without a `vessels.`
/// prefix. Anything that does not end in a 9-digit MMSI yields `None`.
pub fn mmsi_from_identifier(id: &str) -> Option<u32> {
    let (_, tail) = id.rsplit_once("mmsi:")?;
    if tail.len() != 9 || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}
