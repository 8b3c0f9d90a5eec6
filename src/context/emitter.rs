//! Event emitter.
//!
//! Every tracking call ends up in `try_track_event`:
//! offline → park in the offline queue if the client itself is eligible;
//! ineligible → no-op; otherwise → sanitized dispatch.
//! A completion callback, when given, always runs ~100ms later.

use std::time::Duration;

use super::AnalyticsContext;
use crate::eligibility;
use crate::error::AnalyticsError;
use crate::event::TrackingEvent;
use crate::host::CommandKind;

pub const CALLBACK_DELAY: Duration = Duration::from_millis(100);

/// Caller continuation run after an event was handled.
pub type Completion = Box<dyn FnOnce()>;

/// What happened to one tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Dispatched,
    /// Client offline; parked for replay.
    Queued,
    /// Tracking not enabled for this client.
    Skipped,
    /// The backend threw; the event is lost.
    Failed,
}

impl AnalyticsContext {
    /// Fire-and-forget tracking. Errors are logged, never surfaced.
    pub fn track_event(&self, event: TrackingEvent) {
        self.track_event_with(event, None);
    }

    pub fn track_event_with(&self, event: TrackingEvent, on_complete: Option<Completion>) {
        if let Err(e) = self.try_track_event(&event, on_complete) {
            log::warn!("Rejected tracking event {:?}: {}", event.name(), e);
        }
    }

    pub fn try_track_event(
        &self,
        event: &TrackingEvent,
        on_complete: Option<Completion>,
    ) -> Result<Delivery, AnalyticsError> {
        let outcome = self.emit(event);
        if let Some(done) = on_complete {
            self.inner.host.schedule(CALLBACK_DELAY, done);
        }
        outcome
    }

    fn emit(&self, event: &TrackingEvent) -> Result<Delivery, AnalyticsError> {
        if self.is_disposed() {
            return Ok(Delivery::Skipped);
        }
        let host = &self.inner.host;

        if !host.is_online() {
            if !eligibility::is_client_eligible(&self.inner.env, host.as_ref()) {
                return Ok(Delivery::Skipped);
            }
            let payload = event.to_payload()?;
            self.inner.queue.borrow_mut().enqueue(event.name(), payload);
            if self.debug_enabled() {
                log::debug!(
                    "Offline, queued {} ({} pending)",
                    event.name(),
                    self.inner.queue.borrow().len()
                );
            }
            return Ok(Delivery::Queued);
        }

        if !self.is_tracking_enabled() {
            return Ok(Delivery::Skipped);
        }
        let payload = event.to_payload()?;
        let Some(backend) = host.backend() else {
            return Ok(Delivery::Skipped);
        };

        match backend.dispatch(CommandKind::Event, event.name(), &payload) {
            Ok(()) => {
                if self.debug_enabled() {
                    log::debug!(
                        "event {} {}",
                        event.name(),
                        serde_json::Value::Object(payload)
                    );
                }
                Ok(Delivery::Dispatched)
            }
            Err(e) => {
                log::warn!("Event {} not delivered: {}", event.name(), e);
                Ok(Delivery::Failed)
            }
        }
    }

    pub fn queued_events(&self) -> usize {
        self.inner.queue.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::context::test_support::*;
    use crate::env::{Environment, RuntimeMode};
    use crate::event::params::ParamObject;
    use crate::event::Transport;
    use crate::host::memory::MemoryHost;

    #[test]
    fn test_dispatch_sanitized_event() {
        let (ctx, _host, backend) = ready_context();
        let delivery = ctx
            .try_track_event(
                &TrackingEvent::new("cta_click")
                    .category("hero")
                    .label("Hire me")
                    .transport(Transport::Xhr),
                None,
            )
            .unwrap();
        assert_eq!(delivery, Delivery::Dispatched);

        let events = backend.events_named("cta_click");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["event_category"], "hero");
        assert_eq!(events[0].payload["transport_type"], "xhr");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let (ctx, _host, backend) = ready_context();
        assert_eq!(
            ctx.try_track_event(&TrackingEvent::new(""), None),
            Err(AnalyticsError::InvalidEventName)
        );
        // The public entry point swallows it
        ctx.track_event(TrackingEvent::new(""));
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_bot_traffic_never_dispatches() {
        let (ctx, host, backend) = ready_context();
        host.set_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)");
        let delivery = ctx
            .try_track_event(&TrackingEvent::new("page_view"), None)
            .unwrap();
        assert_eq!(delivery, Delivery::Skipped);
        ctx.track_section_view("About", 40.0, 2500.0);
        ctx.track_download("cv.pdf", "pdf", Some(120_000));
        assert!(backend.dispatched().is_empty());
    }

    #[test]
    fn test_offline_events_queue_then_flush_in_order() {
        let (ctx, host, backend) = ready_context();
        host.set_online(false);
        for name in ["one", "two", "three"] {
            assert_eq!(
                ctx.try_track_event(&TrackingEvent::new(name), None),
                Ok(Delivery::Queued)
            );
        }
        assert!(backend.events().is_empty());
        assert_eq!(ctx.queued_events(), 3);

        host.set_online(true);
        let report = ctx.on_online();
        assert_eq!(report.delivered, 3);
        let names: Vec<_> = backend.events().into_iter().map(|d| d.target).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
        assert_eq!(ctx.queued_events(), 0);

        // A second reconnect has nothing left to replay
        assert_eq!(ctx.on_online().delivered, 0);
        assert_eq!(backend.events().len(), 3);
    }

    #[test]
    fn test_offline_bot_and_test_traffic_never_queued() {
        let (ctx, host, backend) = ready_context();
        host.set_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)");
        host.set_online(false);
        assert_eq!(
            ctx.try_track_event(&TrackingEvent::new("page_view"), None),
            Ok(Delivery::Skipped)
        );
        assert_eq!(ctx.queued_events(), 0);
        host.set_online(true);
        assert_eq!(ctx.on_online().delivered, 0);
        assert!(backend.dispatched().is_empty());

        let host = Rc::new(MemoryHost::new().with_backend());
        let ctx = AnalyticsContext::new(
            Environment {
                mode: RuntimeMode::Test,
                ..production_env()
            },
            host.clone(),
        );
        host.set_online(false);
        ctx.track_event(TrackingEvent::new("page_view"));
        assert_eq!(ctx.queued_events(), 0);
        host.set_online(true);
        ctx.on_online();
        assert!(host.recorder().map_or(true, |b| b.dispatched().is_empty()));
    }

    #[test]
    fn test_circular_custom_parameters_still_emit() {
        let (ctx, _host, backend) = ready_context();
        let custom = ParamObject::new().with("a", "b");
        custom.insert("loop", custom.clone());
        ctx.track_event(TrackingEvent::new("loopy").custom(custom));

        let events = backend.events_named("loopy");
        assert_eq!(events.len(), 1);
        assert!(!events[0].payload.contains_key("a"));
        assert!(!events[0].payload.contains_key("loop"));
        assert_eq!(events[0].payload["event_category"], "general");
    }

    #[test]
    fn test_callback_runs_after_delay_even_on_failure() {
        let (ctx, host, backend) = ready_context();
        backend.set_failing(true);
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        ctx.track_event_with(
            TrackingEvent::new("outbound"),
            Some(Box::new(move || flag.set(true))),
        );
        assert!(!ran.get());
        host.advance(99);
        assert!(!ran.get());
        host.advance(1);
        assert!(ran.get());
    }

    #[test]
    fn test_callback_runs_when_tracking_disabled() {
        let host = Rc::new(MemoryHost::new());
        let ctx = AnalyticsContext::new(production_env(), host.clone());
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        ctx.track_event_with(TrackingEvent::new("x"), Some(Box::new(move || flag.set(true))));
        host.advance(100);
        assert!(ran.get());
    }
}
