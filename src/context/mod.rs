//! `AnalyticsContext`: the page-lifetime analytics state.
//!
//! This module declares the context and its lifecycle. Methods are split
//! across the sibling sub-modules:
//!
//! - `bootstrap` single-flight backend loading and configuration
//! - `emitter`   the sanitizing `track_event` façade and offline queueing
//! - `tracking`  semantic tracking calls (sections, forms, vitals, ...)
//! - `lifecycle` host-driven wiring: scroll, time poller, sections, online
//!
//! The context is a cheap `Rc` handle; clones share state. Create one per
//! page, `dispose` it at teardown.

pub mod bootstrap;
pub mod emitter;
pub mod lifecycle;
pub mod tracking;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::consent::{emit_consent, ConsentMode, ConsentState};
use crate::eligibility;
use crate::engagement::milestones::{ScrollMilestones, TimeMilestones};
use crate::engagement::section::SectionTracker;
use crate::env::Environment;
use crate::host::{Host, Payload};
use crate::queue::OfflineQueue;

pub use bootstrap::{InitFuture, InitPhase, INIT_TIMEOUT};
pub use emitter::{Completion, Delivery, CALLBACK_DELAY};
pub use tracking::{ContactFormAction, EngagementKind, ProjectAction};

#[derive(Clone)]
pub struct AnalyticsContext {
    inner: Rc<Inner>,
}

struct Inner {
    env: Environment,
    host: Rc<dyn Host>,
    init: RefCell<bootstrap::InitState>,
    consent: Cell<Option<ConsentState>>,
    queue: RefCell<OfflineQueue>,
    sections: RefCell<SectionTracker>,
    scroll: RefCell<ScrollMilestones>,
    frame_pending: Cell<bool>,
    time: RefCell<Option<TimeMilestones>>,
    disposed: Cell<bool>,
}

impl AnalyticsContext {
    pub fn new(env: Environment, host: Rc<dyn Host>) -> Self {
        Self {
            inner: Rc::new(Inner {
                env,
                host,
                init: RefCell::new(bootstrap::InitState::Uninitialized),
                consent: Cell::new(None),
                queue: RefCell::new(OfflineQueue::new()),
                sections: RefCell::new(SectionTracker::new()),
                scroll: RefCell::new(ScrollMilestones::new()),
                frame_pending: Cell::new(false),
                time: RefCell::new(None),
                disposed: Cell::new(false),
            }),
        }
    }

    fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn env(&self) -> &Environment {
        &self.inner.env
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.inner.host
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    fn debug_enabled(&self) -> bool {
        self.inner.env.debug
    }

    // ── Eligibility ──

    pub fn is_tracking_enabled(&self) -> bool {
        !self.is_disposed() && eligibility::is_tracking_enabled(&self.inner.env, self.inner.host.as_ref())
    }

    pub fn should_initialize_analytics(&self) -> bool {
        eligibility::should_initialize_analytics(&self.inner.env, self.inner.host.as_ref())
    }

    // ── Consent ──

    /// Last consent state delivered to the backend.
    pub fn consent_state(&self) -> Option<ConsentState> {
        self.inner.consent.get()
    }

    /// Send the default consent. No-op until the backend handle exists.
    pub fn set_consent_settings(&self, analytics: bool, marketing: bool) {
        self.send_consent(ConsentMode::Default, analytics, marketing);
    }

    /// Send a consent update. No-op until the backend handle exists.
    pub fn update_consent_settings(&self, analytics: bool, marketing: bool) {
        self.send_consent(ConsentMode::Update, analytics, marketing);
    }

    fn send_consent(&self, mode: ConsentMode, analytics: bool, marketing: bool) {
        let Some(backend) = self.inner.host.backend() else {
            if self.debug_enabled() {
                log::debug!("Consent {} skipped: backend not present", mode.as_str());
            }
            return;
        };
        let state = ConsentState::new(analytics, marketing);
        if let Some(sent) = emit_consent(backend.as_ref(), mode, state) {
            self.inner.consent.set(Some(sent));
        }
    }

    // ── Teardown ──

    /// Stop the time poller and drop all page-lifetime state. Tracking calls
    /// after this are no-ops.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.sections.borrow_mut().clear();
        self.inner.time.borrow_mut().take();
        let dropped = self.inner.queue.borrow().len();
        self.inner.queue.borrow_mut().clear();
        if dropped > 0 {
            log::warn!("Disposed analytics context with {} queued events", dropped);
        }
    }
}

/// Unwrap a `json!` object literal into a payload.
pub(crate) fn into_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// Character-safe truncation.
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use super::AnalyticsContext;
    use crate::env::{Environment, RuntimeMode};
    use crate::host::memory::{MemoryHost, RecordingBackend};

    pub fn production_env() -> Environment {
        Environment {
            mode: RuntimeMode::Production,
            measurement_id: "G-PORTFOLIO1".into(),
            debug: true,
            ..Environment::default()
        }
    }

    /// Context over a host whose backend is already installed.
    pub fn ready_context() -> (AnalyticsContext, Rc<MemoryHost>, Rc<RecordingBackend>) {
        let host = Rc::new(MemoryHost::new().with_backend());
        let ctx = AnalyticsContext::new(production_env(), host.clone());
        let backend = host.recorder().expect("backend installed");
        (ctx, host, backend)
    }
}
