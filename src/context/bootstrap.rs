//! Backend bootstrap.
//!
//! Loads the vendor script exactly once per page. The first caller creates
//! the pending future; concurrent callers get a clone of the same `Shared`
//! future and observe the same outcome. A failed or timed-out attempt resets
//! the state so a later call can retry.

use std::time::Duration;

use futures::future::{self, Either, FutureExt, LocalBoxFuture, Shared};
use serde_json::json;
use url::Url;

use super::{into_payload, AnalyticsContext};
use crate::error::AnalyticsError;
use crate::host::{CommandKind, InsertionPoint, ScriptTag};

pub const INIT_TIMEOUT: Duration = Duration::from_secs(10);

const SCRIPT_BASE: &str = "https://www.googletagmanager.com/gtag/js";

/// Two years, in seconds.
const COOKIE_EXPIRES_SECS: u64 = 63_072_000;

const CSP_NONCE_META: &str = "csp-nonce";

pub type InitFuture = Shared<LocalBoxFuture<'static, Result<(), AnalyticsError>>>;

pub(crate) enum InitState {
    Uninitialized,
    Initializing(InitFuture),
    Ready,
}

/// Observable view of the init state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    Uninitialized,
    Initializing,
    Ready,
}

fn settled(outcome: Result<(), AnalyticsError>) -> InitFuture {
    future::ready(outcome).boxed_local().shared()
}

/// Vendor loader URL for a measurement id.
pub fn script_url(measurement_id: &str) -> Result<Url, AnalyticsError> {
    Url::parse_with_params(SCRIPT_BASE, &[("id", measurement_id)])
        .map_err(|e| AnalyticsError::ScriptLoadFailed(e.to_string()))
}

/// Coarse device class from the screen width.
pub fn device_class(screen_width: u32) -> &'static str {
    match screen_width {
        0..=767 => "mobile",
        768..=1023 => "tablet",
        _ => "desktop",
    }
}

impl AnalyticsContext {
    pub fn init_phase(&self) -> InitPhase {
        match &*self.inner.init.borrow() {
            InitState::Uninitialized => InitPhase::Uninitialized,
            InitState::Initializing(_) => InitPhase::Initializing,
            InitState::Ready => InitPhase::Ready,
        }
    }

    /// Load and configure the backend. Idempotent; the returned future must
    /// be driven for initialization to make progress.
    pub fn init_analytics(&self) -> InitFuture {
        let mut state = self.inner.init.borrow_mut();
        match &*state {
            InitState::Ready => return settled(Ok(())),
            InitState::Initializing(pending) => return pending.clone(),
            InitState::Uninitialized => {}
        }

        let env = &self.inner.env;
        if !env.has_measurement_id() {
            if env.is_production() {
                log::error!("GA_MEASUREMENT_ID is not set; analytics disabled");
                return settled(Err(AnalyticsError::MissingConfiguration));
            }
            if self.debug_enabled() {
                log::debug!("No measurement id outside production, skipping analytics");
            }
            return settled(Ok(()));
        }
        if env.is_test() {
            return settled(Ok(()));
        }

        let ctx = self.clone();
        let pending = async move { ctx.bootstrap().await }.boxed_local().shared();
        *state = InitState::Initializing(pending.clone());
        pending
    }

    /// `init_analytics`, but only where `should_initialize_analytics` allows.
    pub fn init_if_eligible(&self) -> Option<InitFuture> {
        if self.should_initialize_analytics() {
            Some(self.init_analytics())
        } else {
            if self.debug_enabled() {
                log::debug!("Analytics not initialized on this host");
            }
            None
        }
    }

    fn set_init_state(&self, state: InitState) {
        *self.inner.init.borrow_mut() = state;
    }

    async fn bootstrap(self) -> Result<(), AnalyticsError> {
        let id = self.inner.env.measurement_id.clone();

        if self.inner.host.has_script_with_src(&id) {
            log::debug!("Analytics script for {} already present", id);
            self.set_init_state(InitState::Ready);
            return Ok(());
        }

        match self.load_backend(&id).await {
            Ok(()) => {
                self.configure_backend(&id);
                self.set_init_state(InitState::Ready);
                log::info!("Analytics initialized for {}", id);
                Ok(())
            }
            Err(e) => {
                self.set_init_state(InitState::Uninitialized);
                log::warn!("Analytics initialization failed: {}", e);
                Err(e)
            }
        }
    }

    async fn load_backend(&self, id: &str) -> Result<(), AnalyticsError> {
        let host = &self.inner.host;

        // Command queue + shim first, then default consent, then the script.
        let backend = host.install_backend();
        self.set_consent_settings(true, false);

        let at = [
            InsertionPoint::Head,
            InsertionPoint::Body,
            InsertionPoint::DocumentRoot,
        ]
        .into_iter()
        .find(|p| host.has_insertion_point(*p))
        .ok_or(AnalyticsError::DomInsertionFailed)?;

        let tag = ScriptTag {
            src: script_url(id)?.to_string(),
            is_async: true,
            nonce: host
                .meta_content(CSP_NONCE_META)
                .filter(|n| !n.trim().is_empty()),
        };
        if self.debug_enabled() {
            log::debug!("Injecting {} into {:?}", tag.src, at);
        }

        let load = host.inject_script(tag, at);
        let deadline = host.sleep(INIT_TIMEOUT);

        // The losing branch is dropped, which cancels the timer on success.
        match future::select(load, deadline).await {
            Either::Left((Ok(()), _)) => Ok(()),
            Either::Left((Err(reason), _)) => Err(AnalyticsError::ScriptLoadFailed(reason)),
            Either::Right(((), _)) if backend.is_loaded() => Ok(()),
            Either::Right(((), _)) => Err(AnalyticsError::InitTimeout(INIT_TIMEOUT)),
        }
    }

    fn configure_backend(&self, id: &str) {
        let Some(backend) = self.inner.host.backend() else {
            return;
        };
        let host = &self.inner.host;

        let config = into_payload(json!({
            "anonymize_ip": true,
            "allow_google_signals": false,
            "allow_ad_personalization_signals": false,
            "cookie_flags": "SameSite=Strict;Secure",
            "cookie_expires": COOKIE_EXPIRES_SECS,
            "send_page_view": false,
            "transport_type": "beacon",
        }));
        if let Err(e) = backend.dispatch(CommandKind::Config, id, &config) {
            log::warn!("Backend config rejected: {}", e);
        }

        let (screen_width, _) = host.screen_size();
        let properties = into_payload(json!({
            "environment": self.inner.env.mode.as_str(),
            "app_version": self.inner.env.app_version,
            "device_type": device_class(screen_width),
            "language": host.language(),
        }));
        if let Err(e) = backend.dispatch(CommandKind::Set, "user_properties", &properties) {
            log::warn!("User properties rejected: {}", e);
        }
    }
}
