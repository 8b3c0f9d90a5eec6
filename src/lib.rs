pub mod env;
pub mod error;
pub mod host;

// Gates & policy
pub mod consent;
pub mod eligibility;

// Events
pub mod event;
pub mod queue;

// Viewport & engagement sampling
pub mod engagement;

pub mod context;

pub use context::{
    AnalyticsContext, ContactFormAction, Delivery, EngagementKind, InitFuture, InitPhase,
    ProjectAction,
};
pub use env::{Environment, RuntimeMode};
pub use error::{AnalyticsError, DispatchError};
pub use event::params::{ParamObject, ParamValue};
pub use event::vitals::{Rating, WebVital};
pub use event::{TrackingEvent, Transport};
