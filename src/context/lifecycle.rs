//! Host-driven wiring.
//!
//! The host forwards browser signals here: scroll events, viewport
//! intersections, reconnects. Timed work (time-on-page poll, coalesced
//! scroll sampling) is scheduled back onto the host and holds only a weak
//! handle, so a dropped context stops it.

use super::AnalyticsContext;
use crate::engagement::milestones::{TimeMilestones, TIME_POLL_INTERVAL};
use crate::engagement::scroll_depth_percent;
use crate::queue::{self, FlushReport};

use super::tracking::EngagementKind;

impl AnalyticsContext {
    /// Start page-lifetime samplers. Idempotent.
    pub fn mount(&self) {
        if self.is_disposed() || !self.inner.env.engagement_tracking {
            return;
        }
        {
            let mut time = self.inner.time.borrow_mut();
            if time.is_some() {
                return;
            }
            *time = Some(TimeMilestones::new(self.inner.host.now_ms()));
        }
        self.schedule_time_poll();
    }

    fn schedule_time_poll(&self) {
        let weak = self.downgrade();
        self.inner.host.schedule(
            TIME_POLL_INTERVAL,
            Box::new(move || {
                let Some(ctx) = AnalyticsContext::upgrade(&weak) else {
                    return;
                };
                ctx.poll_time_on_page();
                let running = ctx
                    .inner
                    .time
                    .borrow()
                    .as_ref()
                    .map_or(false, |t| !t.is_complete());
                if running && !ctx.is_disposed() {
                    ctx.schedule_time_poll();
                }
            }),
        );
    }

    /// Emit every time-on-page milestone that became due. Returns them in
    /// seconds. Nothing is reported while the page is hidden; the first poll
    /// after it becomes visible catches up.
    pub fn poll_time_on_page(&self) -> Vec<u64> {
        if self.inner.host.is_hidden() {
            return Vec::new();
        }
        let now = self.inner.host.now_ms();
        let due = match self.inner.time.borrow_mut().as_mut() {
            Some(time) => time.poll(now),
            None => return Vec::new(),
        };
        for secs in &due {
            self.track_engagement(EngagementKind::TimeOnPage, *secs as f64);
        }
        due
    }

    /// Scroll event. Samples at most once per animation frame.
    pub fn on_scroll(&self) {
        if self.is_disposed() || !self.inner.env.engagement_tracking {
            return;
        }
        if self.inner.frame_pending.replace(true) {
            return;
        }
        let weak = self.downgrade();
        self.inner.host.request_animation_frame(Box::new(move || {
            if let Some(ctx) = AnalyticsContext::upgrade(&weak) {
                ctx.inner.frame_pending.set(false);
                ctx.sample_scroll();
            }
        }));
    }

    /// Sample scroll depth now. Returns the milestone emitted, if any.
    pub fn sample_scroll(&self) -> Option<u8> {
        if self.is_disposed() {
            return None;
        }
        let depth = scroll_depth_percent(self.inner.host.scroll_metrics());
        let milestone = self.inner.scroll.borrow_mut().record(depth)?;
        self.track_engagement(EngagementKind::ScrollDepth, milestone as f64);
        Some(milestone)
    }

    /// Register a section element for dwell tracking.
    pub fn observe_section(&self, section_id: &str, section_name: &str) -> bool {
        if self.is_disposed() || !self.inner.env.section_tracking {
            return false;
        }
        self.inner
            .sections
            .borrow_mut()
            .observe(section_id, section_name)
    }

    pub fn unobserve_section(&self, section_id: &str) {
        self.inner.sections.borrow_mut().unobserve(section_id);
    }

    /// Intersection callback for an observed section.
    pub fn on_section_intersection(&self, section_id: &str, is_intersecting: bool) {
        let now = self.inner.host.now_ms();
        let visit = self
            .inner
            .sections
            .borrow_mut()
            .on_intersection(section_id, is_intersecting, now);
        if let Some(visit) = visit {
            if self.debug_enabled() {
                log::debug!(
                    "Section {} visible for {:.0}ms",
                    visit.section_id,
                    visit.dwell_ms
                );
            }
            self.track_section_view_now(&visit.section_name, visit.dwell_ms);
        }
    }

    /// Connectivity restored: replay the offline queue in order.
    pub fn on_online(&self) -> FlushReport {
        let entries = self.inner.queue.borrow_mut().drain();
        if entries.is_empty() {
            return FlushReport::default();
        }
        let backend = self.inner.host.backend();
        let report = queue::replay(entries, backend.as_deref());
        log::info!(
            "Replayed offline events: {} delivered, {} dropped",
            report.delivered,
            report.dropped
        );
        report
    }
}
