//! Section visibility tracking.
//!
//! Per registered section:
//! - Idle → Entered on the first intersecting callback (records entry time)
//! - Entered → Idle on a non-intersecting callback; a visit is reported only
//!   if the section stayed visible for more than `MIN_DWELL_MS`
//!
//! Entry state is reset on every exit, so one continuous visible stretch
//! yields at most one visit.

use std::collections::HashMap;

/// Visits at or below this dwell are glances and never reported.
pub const MIN_DWELL_MS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SectionObservation {
    pub section_id: String,
    pub section_name: String,
    pub entry_timestamp: Option<f64>,
    pub has_entered: bool,
}

/// A completed visible stretch of one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionVisit {
    pub section_id: String,
    pub section_name: String,
    pub dwell_ms: f64,
}

#[derive(Debug, Default)]
pub struct SectionTracker {
    observations: HashMap<String, SectionObservation>,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a section. Returns false if it was already observed.
    pub fn observe(&mut self, section_id: &str, section_name: &str) -> bool {
        if self.observations.contains_key(section_id) {
            return false;
        }
        self.observations.insert(
            section_id.to_string(),
            SectionObservation {
                section_id: section_id.to_string(),
                section_name: section_name.to_string(),
                entry_timestamp: None,
                has_entered: false,
            },
        );
        true
    }

    pub fn unobserve(&mut self, section_id: &str) -> Option<SectionObservation> {
        self.observations.remove(section_id)
    }

    pub fn observation(&self, section_id: &str) -> Option<&SectionObservation> {
        self.observations.get(section_id)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Feed one intersection callback. Returns the finished visit when an
    /// exit closes a stretch longer than `MIN_DWELL_MS`.
    pub fn on_intersection(
        &mut self,
        section_id: &str,
        is_intersecting: bool,
        now_ms: f64,
    ) -> Option<SectionVisit> {
        let obs = self.observations.get_mut(section_id)?;

        if is_intersecting {
            if !obs.has_entered {
                obs.has_entered = true;
                obs.entry_timestamp = Some(now_ms);
            }
            return None;
        }

        if !obs.has_entered {
            return None;
        }
        let entered_at = obs.entry_timestamp.take();
        obs.has_entered = false;

        let dwell_ms = now_ms - entered_at?;
        if dwell_ms > MIN_DWELL_MS {
            Some(SectionVisit {
                section_id: obs.section_id.clone(),
                section_name: obs.section_name.clone(),
                dwell_ms,
            })
        } else {
            None
        }
    }
}
