//! CPA cache with hysteresis
//!
//! Small positional noise in AIS reports makes the computed CPA wobble from
//! one cycle to the next. The cache keeps the last accepted CPA/TCPA per
//! contact and only lets a new value through when it moved significantly.

use std::collections::{HashMap, HashSet};

use super::cpa::CpaResult;
use super::types::TrackerSettings;
use crate::error::CpaError;

/// Check whether a freshly computed CPA differs enough from the cached one
///
/// Both conditions must hold: the absolute change reaches `min_meters` and
/// the change relative to the cached value reaches `min_ratio`. A cached CPA
/// of 0 satisfies the relative test for any non-zero change.
pub fn is_significant_change(cached: f64, fresh: f64, min_meters: f64, min_ratio: f64) -> bool {
    let diff = (fresh - cached).abs();
    if diff < min_meters {
        return false;
    }
    if cached > 0.0 {
        diff / cached >= min_ratio
    } else {
        diff > 0.0
    }
}

/// Last accepted CPA/TCPA per contact identifier
#[derive(Debug, Clone, Default)]
pub struct CpaCache {
    entries: HashMap<String, CpaResult>,
}

impl CpaCache {
    pub fn new() -> Self {
        CpaCache {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&CpaResult> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the CPA/TCPA to report for a contact
    ///
    /// - fresh value, nothing cached: stored and returned
    /// - fresh value, cached: stored and returned only if the change is
    ///   significant, otherwise the cached pair is returned
    /// - undetermined: the cached pair, if any, is returned unchanged
    pub fn resolve(
        &mut self,
        id: &str,
        computed: Result<CpaResult, CpaError>,
        settings: &TrackerSettings,
    ) -> Option<CpaResult> {
        let Ok(fresh) = computed else {
            return self.entries.get(id).copied();
        };

        match self.entries.get_mut(id) {
            Some(cached) => {
                if is_significant_change(
                    cached.cpa,
                    fresh.cpa,
                    settings.cpa_min_change_meters,
                    settings.cpa_min_change_ratio,
                ) {
                    *cached = fresh;
                }
                Some(*cached)
            }
            None => {
                self.entries.insert(id.to_string(), fresh);
                Some(fresh)
            }
        }
    }

    /// Remove every entry whose identifier is not in `seen`
    ///
    /// # Returns
    ///
    /// Number of entries removed
    pub fn sweep(&mut self, seen: &HashSet<&str>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| seen.contains(id.as_str()));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
