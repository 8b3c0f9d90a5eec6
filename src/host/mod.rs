//! Host platform boundary.
//!
//! Everything the analytics layer needs from the browser goes through these
//! two traits:
//! - `Host`: page location, navigator, viewport, timers and the DOM bits the
//!   bootstrapper touches (meta tags, script tags, insertion points)
//! - `Backend`: the analytics vendor's global dispatch primitive
//!
//! Both are single-threaded (`Rc`, no `Send`), matching the page event loop.

pub mod memory;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use serde_json::{Map, Value};

use crate::error::DispatchError;

/// JSON object handed to the backend.
pub type Payload = Map<String, Value>;

/// Command verbs understood by the backend dispatch primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Event,
    Config,
    Consent,
    Set,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Event => "event",
            CommandKind::Config => "config",
            CommandKind::Consent => "consent",
            CommandKind::Set => "set",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The vendor's global handle (`gtag` and its command queue).
pub trait Backend {
    /// `dispatch(kind, targetOrName, payload)`.
    fn dispatch(&self, kind: CommandKind, target: &str, payload: &Payload)
        -> Result<(), DispatchError>;

    /// Whether the remote script has executed and drained its queue.
    fn is_loaded(&self) -> bool;
}

/// Where a `<script>` element may be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPoint {
    Head,
    Body,
    DocumentRoot,
}

/// Loader element for the backend script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub src: String,
    pub is_async: bool,
    pub nonce: Option<String>,
}

/// Outcome of a script element's load/error events.
pub type ScriptLoad = LocalBoxFuture<'static, Result<(), String>>;

/// Scroll position of the document, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

pub trait Host {
    /// Full URL of the current page.
    fn page_url(&self) -> String;
    fn user_agent(&self) -> String;
    fn language(&self) -> String;
    fn is_online(&self) -> bool;
    fn is_hidden(&self) -> bool;
    fn screen_size(&self) -> (u32, u32);
    fn viewport_size(&self) -> (u32, u32);
    fn scroll_metrics(&self) -> ScrollMetrics;
    /// Wall clock, epoch milliseconds.
    fn now_ms(&self) -> f64;

    /// Content of `<meta name=..>`, if present.
    fn meta_content(&self, name: &str) -> Option<String>;
    /// Whether any `<script>` element's `src` contains `needle`.
    fn has_script_with_src(&self, needle: &str) -> bool;
    fn has_insertion_point(&self, at: InsertionPoint) -> bool;
    /// Append the loader element; the returned future settles on load/error.
    fn inject_script(&self, tag: ScriptTag, at: InsertionPoint) -> ScriptLoad;

    /// The backend handle, once created.
    fn backend(&self) -> Option<Rc<dyn Backend>>;
    /// Create the backend's command queue and dispatch shim, or return the
    /// existing one.
    fn install_backend(&self) -> Rc<dyn Backend>;

    /// One-shot timer. Dropping the future cancels it.
    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()>;
    /// Run `task` after `delay` on the event loop.
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);

    fn request_animation_frame(&self, task: Box<dyn FnOnce()>) {
        self.schedule(Duration::from_millis(16), task);
    }
}
