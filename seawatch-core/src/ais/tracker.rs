//! AIS Contact Tracker
//!
//! Turns the raw contact snapshot of a [`TelemetryService`] into the list of
//! tracked, risk-annotated contacts shown on the polar chart.

use log::{debug, trace};
use std::collections::{HashMap, HashSet};

use super::cache::CpaCache;
use super::cpa::{calculate_cpa_tcpa, CpaInput, Kinematics};
use super::types::*;
use crate::error::SkipReason;
use crate::geodesy;
use crate::telemetry::{Position, RawContact, TelemetryService};

/// Everything one tracking cycle reads from telemetry
#[derive(Debug, Clone, Default)]
pub struct CycleInput {
    pub own_position: Option<Position>,
    pub own: Kinematics,
    pub contacts: HashMap<String, RawContact>,
}

impl CycleInput {
    /// Pull the current state out of a telemetry service
    pub fn from_service<T: TelemetryService + ?Sized>(service: &T) -> Self {
        CycleInput {
            own_position: service.own_position(),
            own: Kinematics::new(
                service.own_course_over_ground(),
                service.own_speed_over_ground(),
            ),
            contacts: service.live_contacts(),
        }
    }
}

/// Age of a contact's last report in ms
///
/// A contact without timestamp cannot prove it is recent and gets the
/// largest possible age.
fn contact_age(raw: &RawContact, now: u64) -> u64 {
    match raw.timestamp {
        Some(timestamp) => now.saturating_sub(timestamp),
        None => u64::MAX,
    }
}

/// Run one tracking cycle
///
/// Every contact is handled on its own: a contact without position or with
/// an expired timestamp is left out, nothing else is affected. After all
/// contacts are processed the cache is swept of identifiers not seen in this
/// cycle.
///
/// # Arguments
///
/// * `input` - Own-ship state and raw contact snapshot
/// * `cache` - CPA cache carried over from the previous cycle
/// * `settings` - Thresholds for freshness, pruning and hysteresis
/// * `now` - Current time in milliseconds since the Unix epoch
pub fn track_contacts(
    input: &CycleInput,
    cache: &mut CpaCache,
    settings: &TrackerSettings,
    now: u64,
) -> (Vec<TrackedContact>, CycleSummary) {
    let mut summary = CycleSummary::default();

    let Some(own) = input.own_position else {
        debug!("{}, no contacts this cycle", SkipReason::MissingOwnPosition);
        summary.own_position_missing = true;
        // Keep the hysteresis state of contacts that would still be tracked
        let present: HashSet<&str> = input
            .contacts
            .iter()
            .filter(|(_, raw)| raw.position().is_some())
            .filter(|(_, raw)| contact_age(raw, now) <= settings.prune_age_ms)
            .map(|(id, _)| id.as_str())
            .collect();
        summary.swept = cache.sweep(&present);
        return (Vec::new(), summary);
    };

    let mut tracked = Vec::with_capacity(input.contacts.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(input.contacts.len());

    for (id, raw) in &input.contacts {
        let Some((latitude, longitude)) = raw.position() else {
            trace!("Skipping {}: {}", id, SkipReason::MissingContactPosition);
            summary.missing_position += 1;
            continue;
        };

        let age_ms = contact_age(raw, now);
        if age_ms > settings.prune_age_ms {
            trace!("Skipping {}: {}", id, SkipReason::ExpiredContact);
            summary.expired += 1;
            continue;
        }

        let bearing = geodesy::bearing(own.latitude, own.longitude, latitude, longitude);
        let distance = geodesy::distance(own.latitude, own.longitude, latitude, longitude);

        let computed = calculate_cpa_tcpa(&CpaInput {
            bearing,
            distance,
            own: input.own,
            target: Kinematics::new(raw.course_over_ground, raw.speed_over_ground),
        });
        if let Err(e) = &computed {
            trace!("{}: {}", id, e);
            summary.undetermined += 1;
        }
        let fresh = computed.as_ref().ok().copied();
        let resolved = cache.resolve(id, computed, settings);
        seen.insert(id.as_str());

        let cpa = resolved.map(|r| r.cpa);
        let tcpa = resolved.map(|r| r.tcpa);
        // The reported pair is damped, the alert follows the current geometry
        let risk = fresh.or(resolved);

        tracked.push(TrackedContact {
            id: id.clone(),
            mmsi: mmsi_from_identifier(id),
            name: raw.name.clone(),
            latitude,
            longitude,
            course_over_ground: raw.course_over_ground,
            speed_over_ground: raw.speed_over_ground,
            last_seen: raw.timestamp.unwrap_or(now),
            bearing,
            distance,
            freshness: Freshness::classify(age_ms, settings),
            cpa,
            tcpa,
            age_minutes: age_ms as f64 / 60_000.0,
            alert: AlertState::classify(risk.map(|r| r.cpa), risk.map(|r| r.tcpa), settings),
        });
    }

    summary.swept = cache.sweep(&seen);
    summary.tracked = tracked.len();

    (tracked, summary)
}

/// Contact tracker bound to a telemetry service
///
/// Owns the CPA cache and the throttle. The host calls
/// [`on_telemetry_update`](Self::on_telemetry_update) whenever new telemetry
/// arrived and reads [`tracked_contacts`](Self::tracked_contacts) afterwards.
#[derive(Debug)]
pub struct ContactTracker<T> {
    service: T,
    settings: TrackerSettings,
    cache: CpaCache,
    /// Own position of the previous cycle, for displacement
    previous_own_position: Option<Position>,
    /// Time (ms) of the last cycle that ran
    last_update: Option<u64>,
    tracked: Vec<TrackedContact>,
}

impl<T: TelemetryService> ContactTracker<T> {
    /// Create a new tracker reading from `service`
    pub fn new(service: T, settings: TrackerSettings) -> Self {
        ContactTracker {
            service,
            settings,
            cache: CpaCache::new(),
            previous_own_position: None,
            last_update: None,
            tracked: Vec::new(),
        }
    }

    pub fn service(&self) -> &T {
        &self.service
    }

    /// Mutable access for hosts that feed the service in place
    pub fn service_mut(&mut self) -> &mut T {
        &mut self.service
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Update settings, effective from the next cycle
    pub fn update_settings(&mut self, settings: TrackerSettings) {
        self.settings = settings;
    }

    pub fn cache(&self) -> &CpaCache {
        &self.cache
    }

    /// Run a tracking cycle unless the previous one was too recent
    ///
    /// # Arguments
    ///
    /// * `now` - Current time in milliseconds since the Unix epoch
    ///
    /// # Returns
    ///
    /// `None` when the update was throttled, otherwise a summary of the cycle
    pub fn on_telemetry_update(&mut self, now: u64) -> Option<CycleSummary> {
        if let Some(last) = self.last_update {
            // A clock that jumped backwards is taken as a restart, not throttled
            if now >= last && now - last < self.settings.update_interval_ms {
                return None;
            }
        }
        self.last_update = Some(now);

        let input = CycleInput::from_service(&self.service);
        let (tracked, mut summary) = track_contacts(&input, &mut self.cache, &self.settings, now);

        if let Some(own) = input.own_position {
            if let Some(previous) = self.previous_own_position {
                let moved = geodesy::distance(
                    previous.latitude,
                    previous.longitude,
                    own.latitude,
                    own.longitude,
                );
                trace!("Own ship moved {:.1} m since last cycle", moved);
                summary.own_displacement = Some(moved);
            }
            self.previous_own_position = Some(own);
        }

        debug!(
            "Tracking cycle: {} tracked, {} expired, {} without position, {} undetermined, {} swept",
            summary.tracked,
            summary.expired,
            summary.missing_position,
            summary.undetermined,
            summary.swept
        );

        self.tracked = tracked;
        Some(summary)
    }

    /// Contacts of the last cycle, in no particular order
    pub fn tracked_contacts(&self) -> &[TrackedContact] {
        &self.tracked
    }

    /// Contacts of the last cycle, nearest first
    pub fn tracked_by_distance(&self) -> Vec<TrackedContact> {
        let mut contacts = self.tracked.clone();
        contacts.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        contacts
    }

    /// Get a specific contact by identifier
    pub fn get_contact(&self, id: &str) -> Option<&TrackedContact> {
        self.tracked.iter().find(|c| c.id == id)
    }

    /// Get number of tracked contacts
    pub fn contact_count(&self) -> usize {
        self.tracked.len()
    }

    /// Forget all cached CPA/TCPA values
    ///
    /// Used when own-ship identity changes, e.g. after a reconnect. The next
    /// update runs immediately regardless of the throttle.
    pub fn reset_cache(&mut self) {
        self.cache.clear();
        self.previous_own_position = None;
        self.last_update = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::EARTH_RADIUS_M;
    use crate::telemetry::TelemetrySnapshot;
    use std::f64::consts::PI;

    const MINUTE: u64 = 60 * 1000;
    const SECOND: u64 = 1000;
    const T0: u64 = 1_700_000_000_000;

    /// Degrees for a north or east offset in meters near the equator
    fn deg(meters: f64) -> f64 {
        meters / (EARTH_RADIUS_M * PI / 180.0)
    }

    fn contact(north: f64, east: f64, timestamp: Option<u64>) -> RawContact {
        RawContact {
            latitude: Some(deg(north)),
            longitude: Some(deg(east)),
            timestamp,
            ..Default::default()
        }
    }

    fn moving(north: f64, east: f64, course: f64, speed: f64, timestamp: u64) -> RawContact {
        RawContact {
            course_over_ground: Some(course),
            speed_over_ground: Some(speed),
            ..contact(north, east, Some(timestamp))
        }
    }

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            own_position: Some(Position::new(0.0, 0.0)),
            ..Default::default()
        }
    }

    fn tracker(telemetry: TelemetrySnapshot) -> ContactTracker<TelemetrySnapshot> {
        ContactTracker::new(telemetry, TrackerSettings::default())
    }

    #[test]
    fn test_no_own_position() {
        let mut telemetry = snapshot();
        telemetry.own_position = None;
        telemetry
            .contacts
            .insert("a".into(), contact(1000.0, 0.0, Some(T0)));

        let mut tracker = tracker(telemetry);
        let summary = tracker.on_telemetry_update(T0).unwrap();

        assert!(summary.own_position_missing);
        assert!(tracker.tracked_contacts().is_empty());
    }

    #[test]
    fn test_bearing_and_distance() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("north".into(), contact(1000.0, 0.0, Some(T0)));
        telemetry
            .contacts
            .insert("west".into(), contact(0.0, -2000.0, Some(T0)));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();

        let north = tracker.get_contact("north").unwrap();
        assert!(north.bearing.abs() < 1e-6);
        assert!((north.distance - 1000.0).abs() < 0.01);

        let west = tracker.get_contact("west").unwrap();
        assert!((west.bearing - 270.0).abs() < 1e-6);
        assert!((west.distance - 2000.0).abs() < 0.01);

        for c in tracker.tracked_contacts() {
            assert!((0.0..360.0).contains(&c.bearing));
            assert!(c.distance >= 0.0);
        }

        let sorted = tracker.tracked_by_distance();
        assert_eq!(sorted[0].id, "north");
        assert_eq!(sorted[1].id, "west");
    }

    #[test]
    fn test_contact_without_position_is_skipped() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("good".into(), contact(500.0, 500.0, Some(T0)));
        telemetry.contacts.insert(
            "nolon".into(),
            RawContact {
                latitude: Some(0.01),
                timestamp: Some(T0),
                ..Default::default()
            },
        );

        let mut tracker = tracker(telemetry);
        let summary = tracker.on_telemetry_update(T0).unwrap();

        assert_eq!(summary.missing_position, 1);
        assert_eq!(summary.tracked, 1);
        assert!(tracker.get_contact("good").is_some());
        assert!(tracker.get_contact("nolon").is_none());
    }

    #[test]
    fn test_freshness_and_pruning() {
        let now = T0 + 20 * MINUTE;
        let mut telemetry = snapshot();
        let ages = [
            ("live", 2 * MINUTE + 59 * SECOND),
            ("stale3", 3 * MINUTE),
            ("stale9", 9 * MINUTE + 59 * SECOND),
            ("old10", 10 * MINUTE),
            ("old15", 15 * MINUTE),
            ("gone", 15 * MINUTE + SECOND),
        ];
        for (id, age) in ages {
            telemetry
                .contacts
                .insert(id.into(), contact(100.0, 0.0, Some(now - age)));
        }
        telemetry
            .contacts
            .insert("notime".into(), contact(100.0, 0.0, None));

        let mut tracker = tracker(telemetry);
        let summary = tracker.on_telemetry_update(now).unwrap();

        let freshness = |id: &str| tracker.get_contact(id).map(|c| c.freshness);
        assert_eq!(freshness("live"), Some(Freshness::Live));
        assert_eq!(freshness("stale3"), Some(Freshness::Stale));
        assert_eq!(freshness("stale9"), Some(Freshness::Stale));
        assert_eq!(freshness("old10"), Some(Freshness::Old));
        assert_eq!(freshness("old15"), Some(Freshness::Old));
        assert_eq!(freshness("gone"), None);
        assert_eq!(freshness("notime"), None);
        assert_eq!(summary.expired, 2);

        let old = tracker.get_contact("old15").unwrap();
        assert!((old.age_minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_future_timestamp_is_live() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("ahead".into(), contact(100.0, 0.0, Some(T0 + 5 * SECOND)));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();

        let c = tracker.get_contact("ahead").unwrap();
        assert_eq!(c.freshness, Freshness::Live);
        assert_eq!(c.age_minutes, 0.0);
    }

    #[test]
    fn test_pruned_contact_loses_cache_entry() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 0.0, 0.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        assert!(tracker.cache().contains("a"));

        // No new report for 20 minutes
        let summary = tracker.on_telemetry_update(T0 + 20 * MINUTE).unwrap();
        assert_eq!(summary.expired, 1);
        assert!(tracker.get_contact("a").is_none());
        assert!(!tracker.cache().contains("a"));
    }

    #[test]
    fn test_cache_sweep_on_disappearance() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 100.0, 0.0, 5.0, T0));
        telemetry
            .contacts
            .insert("b".into(), moving(1000.0, -100.0, 180.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        assert_eq!(tracker.cache().len(), 2);

        tracker.service_mut().contacts.remove("b");
        let summary = tracker.on_telemetry_update(T0 + SECOND).unwrap();

        assert_eq!(summary.swept, 1);
        assert!(tracker.cache().contains("a"));
        assert!(!tracker.cache().contains("b"));
    }

    #[test]
    fn test_missing_own_position_keeps_present_cache() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 100.0, 0.0, 5.0, T0));
        telemetry
            .contacts
            .insert("b".into(), moving(1000.0, -100.0, 180.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();

        tracker.service_mut().own_position = None;
        tracker.service_mut().contacts.remove("b");
        let summary = tracker.on_telemetry_update(T0 + SECOND).unwrap();

        assert!(summary.own_position_missing);
        assert!(tracker.tracked_contacts().is_empty());
        assert!(tracker.cache().contains("a"));
        assert!(!tracker.cache().contains("b"));
    }

    #[test]
    fn test_expired_contact_dropped_without_own_position() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 100.0, 0.0, 5.0, T0));
        telemetry
            .contacts
            .insert("b".into(), moving(1000.0, -100.0, 180.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        assert_eq!(tracker.cache().len(), 2);

        // GPS lost; "a" goes silent, "b" keeps reporting but loses its position
        let now = T0 + 20 * MINUTE;
        tracker.service_mut().own_position = None;
        tracker.service_mut().contacts.insert(
            "b".into(),
            RawContact {
                timestamp: Some(now),
                ..Default::default()
            },
        );
        let summary = tracker.on_telemetry_update(now).unwrap();

        assert!(summary.own_position_missing);
        assert_eq!(summary.swept, 2);
        assert!(tracker.cache().is_empty());
    }

    #[test]
    fn test_alert_follows_closing_contact() {
        // Head-on, 8000 m out and closing at 10 m/s: TCPA 800 s
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(8000.0, 0.0, 180.0, 10.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        let first = tracker.get_contact("a").unwrap().clone();
        assert!((first.tcpa.unwrap() - 800.0).abs() < 0.5);
        assert_eq!(first.alert, AlertState::Normal);

        // 700 s later at 1000 m: the CPA has not moved, so the pair is damped
        let now = T0 + 700 * SECOND;
        tracker
            .service_mut()
            .contacts
            .insert("a".into(), moving(1000.0, 0.0, 180.0, 10.0, now));
        tracker.on_telemetry_update(now).unwrap();

        let second = tracker.get_contact("a").unwrap();
        assert_eq!(second.tcpa, first.tcpa);
        assert_eq!(second.alert, AlertState::Emergency);
        assert!(second.is_dangerous());
    }

    #[test]
    fn test_hysteresis_through_cycles() {
        // Own ship stopped; contact 1000 m south, heading north, passing east of us
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 500.0, 0.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        let first = tracker.get_contact("a").unwrap().clone();
        assert!((first.cpa.unwrap() - 500.0).abs() < 0.5);
        assert!((first.tcpa.unwrap() - 200.0).abs() < 0.5);

        // 20 m further out: within the noise band, cached value is kept
        tracker
            .service_mut()
            .contacts
            .insert("a".into(), moving(-1000.0, 520.0, 0.0, 5.0, T0 + SECOND));
        tracker.on_telemetry_update(T0 + SECOND).unwrap();
        let second = tracker.get_contact("a").unwrap();
        assert_eq!(second.cpa, first.cpa);
        assert_eq!(second.tcpa, first.tcpa);
        assert_eq!(tracker.cache().get("a").unwrap().cpa, first.cpa.unwrap());

        // 200 m closer: accepted
        tracker
            .service_mut()
            .contacts
            .insert("a".into(), moving(-1000.0, 300.0, 0.0, 5.0, T0 + 2 * SECOND));
        tracker.on_telemetry_update(T0 + 2 * SECOND).unwrap();
        let third = tracker.get_contact("a").unwrap();
        assert!((third.cpa.unwrap() - 300.0).abs() < 0.5);
        assert!((tracker.cache().get("a").unwrap().cpa - 300.0).abs() < 0.5);
        assert_eq!(third.alert, AlertState::Warn);
    }

    #[test]
    fn test_undetermined_cpa() {
        let mut telemetry = snapshot();
        telemetry.own_speed = Some(10.0);
        telemetry
            .contacts
            .insert("a".into(), moving(1000.0, 0.0, 180.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        let summary = tracker.on_telemetry_update(T0).unwrap();

        assert_eq!(summary.undetermined, 1);
        let c = tracker.get_contact("a").unwrap();
        assert_eq!(c.cpa, None);
        assert_eq!(c.tcpa, None);
        assert_eq!(c.alert, AlertState::Normal);
        assert!(!tracker.cache().contains("a"));
    }

    #[test]
    fn test_undetermined_reuses_cached_pair() {
        let mut telemetry = snapshot();
        telemetry.own_course = Some(0.0);
        telemetry.own_speed = Some(5.0);
        telemetry
            .contacts
            .insert("a".into(), moving(1000.0, 0.0, 180.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        let first = tracker.get_contact("a").unwrap().clone();
        assert!((first.tcpa.unwrap() - 100.0).abs() < 0.1);
        assert!(first.cpa.unwrap() < 0.5);
        assert_eq!(first.alert, AlertState::Emergency);
        assert!(first.is_dangerous());

        // Lose own course while still moving
        tracker.service_mut().own_course = None;
        let summary = tracker.on_telemetry_update(T0 + SECOND).unwrap();

        assert_eq!(summary.undetermined, 1);
        let second = tracker.get_contact("a").unwrap();
        assert_eq!(second.cpa, first.cpa);
        assert_eq!(second.tcpa, first.tcpa);
    }

    #[test]
    fn test_throttle() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), contact(100.0, 0.0, Some(T0)));

        let mut tracker = tracker(telemetry);
        assert!(tracker.on_telemetry_update(T0).is_some());
        assert!(tracker.on_telemetry_update(T0 + 200).is_none());
        assert!(tracker.on_telemetry_update(T0 + 499).is_none());
        assert!(tracker.on_telemetry_update(T0 + 500).is_some());

        // Clock stepped back
        assert!(tracker.on_telemetry_update(T0).is_some());
    }

    #[test]
    fn test_reset_cache() {
        let mut telemetry = snapshot();
        telemetry
            .contacts
            .insert("a".into(), moving(-1000.0, 0.0, 0.0, 5.0, T0));

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();
        assert_eq!(tracker.cache().len(), 1);

        tracker.reset_cache();
        assert!(tracker.cache().is_empty());

        // Runs despite being inside the throttle interval
        let summary = tracker.on_telemetry_update(T0 + 100).unwrap();
        assert_eq!(summary.own_displacement, None);
        assert_eq!(tracker.cache().len(), 1);
    }

    #[test]
    fn test_own_displacement() {
        let mut tracker = tracker(snapshot());
        let summary = tracker.on_telemetry_update(T0).unwrap();
        assert_eq!(summary.own_displacement, None);

        tracker.service_mut().own_position = Some(Position::new(deg(250.0), 0.0));
        let summary = tracker.on_telemetry_update(T0 + SECOND).unwrap();
        assert!((summary.own_displacement.unwrap() - 250.0).abs() < 0.01);
    }

    #[test]
    fn test_mmsi_and_name() {
        let mut telemetry = snapshot();
        telemetry.contacts.insert(
            "urn:mrn:imo:mmsi:230099999".into(),
            RawContact {
                name: Some("Aurora".into()),
                ..contact(300.0, 300.0, Some(T0))
            },
        );

        let mut tracker = tracker(telemetry);
        tracker.on_telemetry_update(T0).unwrap();

        let c = tracker.get_contact("urn:mrn:imo:mmsi:230099999").unwrap();
        assert_eq!(c.mmsi, Some(230099999));
        assert_eq!(c.name.as_deref(), Some("Aurora"));
        // Both stationary
        assert!(c.tcpa.unwrap().is_infinite());
        assert!((c.cpa.unwrap() - c.distance).abs() < 1e-9);
    }
}
