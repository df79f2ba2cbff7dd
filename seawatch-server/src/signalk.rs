//! In-memory SignalK store.
//!
//! Keeps the latest navigation values per vessel context from SignalK delta
//! messages, and serves them to the contact tracker through
//! [`TelemetryService`].
//!
//! Only the paths the tracker needs are kept:
//!
//! | Path | Unit in SignalK | Stored as |
//! |------|-----------------|-----------|
//! | `navigation.position` | degrees | degrees |
//! | `navigation.courseOverGroundTrue` | radians | degrees |
//! | `navigation.speedOverGround` | m/s | m/s |
//! | `name` (or `""` with `{"name": ...}`) | - | string |

use chrono::DateTime;
use log::{debug, info, trace};
use serde::Deserialize;
use serde_json::Value;
use seawatch_core::geodesy::normalize_bearing;
use seawatch_core::telemetry::{Position, RawContact, TelemetryService};
use std::collections::HashMap;
use thiserror::Error;

/// Context SignalK servers use for own ship when nothing else is known
pub const DEFAULT_SELF_CONTEXT: &str = "vessels.self";

const VESSELS_PREFIX: &str = "vessels.";

/// SignalK context roots that do not hold vessels
const NON_VESSEL_ROOTS: [&str; 4] = ["atons.", "aircraft.", "sar.", "shore."];

#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("Invalid SignalK message: {0}")]
    Json(#[from] serde_json::Error),
}

/// A SignalK delta (or hello) message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub updates: Vec<Update>,
    /// Only present in the hello message sent on connect
    #[serde(default, rename = "self")]
    pub self_context: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub values: Vec<PathValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathValue {
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

/// Latest known values for one vessel
#[derive(Debug, Clone, Default, PartialEq)]
struct VesselRecord {
    name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Degrees true
    course_over_ground: Option<f64>,
    /// m/s
    speed_over_ground: Option<f64>,
    /// Unix timestamp (ms) of the newest update
    timestamp: Option<u64>,
}

impl VesselRecord {
    /// Apply one path/value pair, returns false for paths we do not keep
    fn apply(&mut self, path: &str, value: &Value) -> bool {
        match path {
            "navigation.position" => {
                let lat = value.get("latitude").and_then(Value::as_f64);
                let lon = value.get("longitude").and_then(Value::as_f64);
                if let (Some(lat), Some(lon)) = (lat, lon) {
                    self.latitude = Some(lat);
                    self.longitude = Some(lon);
                    true
                } else {
                    false
                }
            }
            "navigation.courseOverGroundTrue" => {
                self.course_over_ground = value
                    .as_f64()
                    .map(|rad| normalize_bearing(rad.to_degrees()));
                true
            }
            "navigation.speedOverGround" => {
                self.speed_over_ground = value.as_f64();
                true
            }
            "name" => match value.as_str() {
                Some(name) => {
                    self.name = Some(name.to_string());
                    true
                }
                None => false,
            },
            "" => match value.get("name").and_then(Value::as_str) {
                Some(name) => {
                    self.name = Some(name.to_string());
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn touch(&mut self, timestamp: Option<u64>) {
        if let Some(ts) = timestamp {
            self.timestamp = Some(self.timestamp.map_or(ts, |old| old.max(ts)));
        }
    }

    fn to_raw_contact(&self) -> RawContact {
        RawContact {
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            course_over_ground: self.course_over_ground,
            speed_over_ground: self.speed_over_ground,
            timestamp: self.timestamp,
        }
    }
}

/// Parse an RFC 3339 SignalK timestamp into Unix milliseconds
pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok())
}

/// False for aids to navigation, aircraft, SAR beacons and shore stations
fn is_vessel_context(context: &str) -> bool {
    !NON_VESSEL_ROOTS.iter().any(|root| context.starts_with(root))
}

/// Make sure a vessel context carries the `vessels.` prefix
fn normalize_context(context: &str) -> String {
    if context.starts_with(VESSELS_PREFIX) {
        context.to_string()
    } else {
        format!("{}{}", VESSELS_PREFIX, context)
    }
}

/// Latest SignalK values for own ship and all other vessels
#[derive(Debug, Clone)]
pub struct SignalKStore {
    self_context: String,
    own: VesselRecord,
    /// Other vessels keyed by identifier (context without `vessels.`)
    vessels: HashMap<String, VesselRecord>,
    /// Newest timestamp seen in any update
    latest_timestamp: Option<u64>,
}

impl Default for SignalKStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SignalKStore {
    pub fn new(self_context: Option<&str>) -> Self {
        SignalKStore {
            self_context: normalize_context(self_context.unwrap_or(DEFAULT_SELF_CONTEXT)),
            own: VesselRecord::default(),
            vessels: HashMap::new(),
            latest_timestamp: None,
        }
    }

    pub fn self_context(&self) -> &str {
        &self.self_context
    }

    /// Change which context is own ship
    ///
    /// Values already stored for that context move over to own ship.
    pub fn set_self_context(&mut self, context: &str) {
        let context = normalize_context(context);
        if context == self.self_context {
            return;
        }
        info!("Own ship is {}", context);
        if let Some(record) = self.vessels.remove(&context[VESSELS_PREFIX.len()..]) {
            self.own = record;
        } else {
            self.own = VesselRecord::default();
        }
        self.self_context = context;
    }

    /// Newest update timestamp seen so far (ms)
    pub fn latest_timestamp(&self) -> Option<u64> {
        self.latest_timestamp
    }

    /// Number of other vessels in the store
    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }

    /// Parse and apply one line of JSON
    ///
    /// # Returns
    ///
    /// Number of values stored
    pub fn apply_line(&mut self, line: &str) -> Result<usize, DeltaError> {
        let delta: Delta = serde_json::from_str(line)?;
        Ok(self.apply_delta(&delta))
    }

    /// Apply a delta message
    ///
    /// # Returns
    ///
    /// Number of values stored
    pub fn apply_delta(&mut self, delta: &Delta) -> usize {
        if let Some(context) = &delta.self_context {
            self.set_self_context(context);
        }

        if let Some(context) = delta.context.as_deref() {
            if !is_vessel_context(context) {
                trace!("Ignoring non-vessel context {}", context);
                return 0;
            }
        }

        let context = delta
            .context
            .as_deref()
            .map(normalize_context)
            .unwrap_or_else(|| self.self_context.clone());
        let is_self = context == self.self_context || context == DEFAULT_SELF_CONTEXT;

        let mut applied = 0;
        for update in &delta.updates {
            let timestamp = update.timestamp.as_deref().and_then(|ts| {
                let parsed = parse_timestamp(ts);
                if parsed.is_none() {
                    debug!("Ignoring unparseable timestamp '{}'", ts);
                }
                parsed
            });
            if let Some(ts) = timestamp {
                self.latest_timestamp =
                    Some(self.latest_timestamp.map_or(ts, |old| old.max(ts)));
            }

            let record = if is_self {
                &mut self.own
            } else {
                self.vessels
                    .entry(context[VESSELS_PREFIX.len()..].to_string())
                    .or_default()
            };

            let mut touched = false;
            for pv in &update.values {
                if record.apply(&pv.path, &pv.value) {
                    touched = true;
                    applied += 1;
                } else {
                    trace!("{}: ignoring path '{}'", context, pv.path);
                }
            }
            if touched {
                record.touch(timestamp);
            }
        }

        applied
    }
}

impl TelemetryService for SignalKStore {
    fn own_position(&self) -> Option<Position> {
        Some(Position {
            latitude: self.own.latitude?,
            longitude: self.own.longitude?,
            timestamp: self.own.timestamp,
        })
    }

    fn own_course_over_ground(&self) -> Option<f64> {
        self.own.course_over_ground
    }

    fn own_speed_over_ground(&self) -> Option<f64> {
        self.own.speed_over_ground
    }

    fn live_contacts(&self) -> HashMap<String, RawContact> {
        self.vessels
            .iter()
            .map(|(id, record)| (id.clone(), record.to_raw_contact()))
            .collect()
    }
}
