//! Tracking events and payload sanitization.
//!
//! A `TrackingEvent` is built once, then turned into the backend payload:
//! - standard fields: `event_category` (default `general`), `event_label`,
//!   `value` (finite numbers only), `non_interaction`, `transport_type`
//! - custom parameters, deep-copied; a circular or over-deep custom object
//!   drops the whole custom set, never the event
//! - absent values are stripped rather than sent as null

pub mod params;
pub mod vitals;

use serde_json::{Number, Value};

use crate::error::AnalyticsError;
use crate::host::Payload;
use params::ParamObject;

pub const DEFAULT_CATEGORY: &str = "general";

/// Keys owned by the standard field set; custom parameters cannot override them.
const STANDARD_KEYS: &[&str] = &[
    "event_category",
    "event_label",
    "value",
    "non_interaction",
    "transport_type",
];

/// Delivery mechanism the backend should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// `navigator.sendBeacon`; survives page unload.
    #[default]
    Beacon,
    Xhr,
    Image,
}

impl Transport {
    pub fn as_str(self) -> &'static str {
        match self {
            Transport::Beacon => "beacon",
            Transport::Xhr => "xhr",
            Transport::Image => "image",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackingEvent {
    name: String,
    category: String,
    label: Option<String>,
    value: Option<f64>,
    custom: Option<ParamObject>,
    non_interaction: bool,
    transport: Transport,
}

impl TrackingEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            label: None,
            value: None,
            custom: None,
            non_interaction: false,
            transport: Transport::default(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn custom(mut self, params: ParamObject) -> Self {
        self.custom = Some(params);
        self
    }

    pub fn non_interaction(mut self, non_interaction: bool) -> Self {
        self.non_interaction = non_interaction;
        self
    }

    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_non_interaction(&self) -> bool {
        self.non_interaction
    }

    pub fn transport_kind(&self) -> Transport {
        self.transport
    }

    /// Build the sanitized backend payload.
    pub fn to_payload(&self) -> Result<Payload, AnalyticsError> {
        if self.name.trim().is_empty() {
            return Err(AnalyticsError::InvalidEventName);
        }

        let mut payload = Payload::new();
        if let Some(n) = self.value.and_then(Number::from_f64) {
            payload.insert("value".into(), Value::Number(n));
        }
        let category = if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            self.category.as_str()
        };
        payload.insert("event_category".into(), Value::from(category));
        if let Some(label) = &self.label {
            payload.insert("event_label".into(), Value::from(label.as_str()));
        }
        payload.insert("non_interaction".into(), Value::Bool(self.non_interaction));
        payload.insert("transport_type".into(), Value::from(self.transport.as_str()));

        if let Some(custom) = &self.custom {
            match custom.to_payload() {
                Ok(extra) => {
                    for (key, value) in extra {
                        if !STANDARD_KEYS.contains(&key.as_str()) {
                            payload.insert(key, value);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Dropping custom parameters of {}: {}", self.name, e);
                }
            }
        }

        payload.retain(|_, v| !v.is_null());
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_fields() {
        let payload = TrackingEvent::new("cta_click")
            .label("hero")
            .value(4.0)
            .to_payload()
            .unwrap();
        assert_eq!(payload["event_category"], "general");
        assert_eq!(payload["event_label"], "hero");
        assert_eq!(payload["value"], 4.0);
        assert_eq!(payload["non_interaction"], false);
        assert_eq!(payload["transport_type"], "beacon");
    }

    #[test]
    fn test_absent_fields_are_stripped() {
        let payload = TrackingEvent::new("ping")
            .value(f64::INFINITY)
            .to_payload()
            .unwrap();
        assert!(!payload.contains_key("event_label"));
        assert!(!payload.contains_key("value"));
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            TrackingEvent::new("").to_payload(),
            Err(AnalyticsError::InvalidEventName)
        );
        assert_eq!(
            TrackingEvent::new("   ").to_payload(),
            Err(AnalyticsError::InvalidEventName)
        );
    }

    #[test]
    fn test_custom_parameters_merge_without_override() {
        let custom = ParamObject::new()
            .with("section", "projects")
            .with("event_category", "hijack");
        let payload = TrackingEvent::new("view")
            .category("projects")
            .custom(custom)
            .to_payload()
            .unwrap();
        assert_eq!(payload["section"], "projects");
        assert_eq!(payload["event_category"], "projects");
    }

    #[test]
    fn test_circular_custom_parameters_keep_standard_fields() {
        let custom = ParamObject::new().with("a", 1u32);
        custom.insert("self", custom.clone());
        let payload = TrackingEvent::new("loop")
            .label("x")
            .custom(custom)
            .to_payload()
            .unwrap();
        let mut keys: Vec<_> = payload.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["event_category", "event_label", "non_interaction", "transport_type"]
        );
    }
}
