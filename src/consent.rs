//! Privacy consent state.
//!
//! Ad-related signals (`ad_user_data`, `ad_personalization`) are always
//! `denied`; only analytics and ad storage follow the user's choice.

use serde::Serialize;
use serde_json::Value;

use crate::host::{Backend, CommandKind, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Granted,
    Denied,
}

impl ConsentStatus {
    pub fn from_flag(granted: bool) -> Self {
        if granted {
            ConsentStatus::Granted
        } else {
            ConsentStatus::Denied
        }
    }
}

/// Consent flags in the backend's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsentState {
    pub analytics_storage: ConsentStatus,
    pub ad_storage: ConsentStatus,
    pub ad_user_data: ConsentStatus,
    pub ad_personalization: ConsentStatus,
}

impl ConsentState {
    pub fn new(analytics: bool, marketing: bool) -> Self {
        Self {
            analytics_storage: ConsentStatus::from_flag(analytics),
            ad_storage: ConsentStatus::from_flag(marketing),
            ad_user_data: ConsentStatus::Denied,
            ad_personalization: ConsentStatus::Denied,
        }
    }

    pub fn to_payload(&self) -> Payload {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Payload::new(),
        }
    }
}

impl Default for ConsentState {
    fn default() -> Self {
        Self::new(true, false)
    }
}

/// `consent` sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentMode {
    Default,
    Update,
}

impl ConsentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsentMode::Default => "default",
            ConsentMode::Update => "update",
        }
    }
}

/// Emit consent to the backend. Returns the state that was sent, or `None`
/// if the dispatch failed.
pub(crate) fn emit_consent(
    backend: &dyn Backend,
    mode: ConsentMode,
    state: ConsentState,
) -> Option<ConsentState> {
    match backend.dispatch(CommandKind::Consent, mode.as_str(), &state.to_payload()) {
        Ok(()) => Some(state),
        Err(e) => {
            log::warn!("Consent {} not delivered: {}", mode.as_str(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::RecordingBackend;

    #[test]
    fn test_ad_signals_always_denied() {
        let state = ConsentState::new(true, true);
        assert_eq!(state.ad_storage, ConsentStatus::Granted);
        assert_eq!(state.ad_user_data, ConsentStatus::Denied);
        assert_eq!(state.ad_personalization, ConsentStatus::Denied);
    }

    #[test]
    fn test_payload_schema() {
        let payload = ConsentState::new(false, false).to_payload();
        assert_eq!(payload["analytics_storage"], "denied");
        assert_eq!(payload["ad_storage"], "denied");
        assert_eq!(payload["ad_user_data"], "denied");
        assert_eq!(payload["ad_personalization"], "denied");
        assert_eq!(payload.len(), 4);
    }

    #[test]
    fn test_emit_consent() {
        let backend = RecordingBackend::new();
        let sent = emit_consent(&backend, ConsentMode::Update, ConsentState::new(true, true));
        assert!(sent.is_some());
        let records = backend.of_kind(CommandKind::Consent);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target, "update");
        assert_eq!(records[0].payload["analytics_storage"], "granted");

        backend.set_failing(true);
        assert!(emit_consent(&backend, ConsentMode::Update, ConsentState::default()).is_none());
    }
}
