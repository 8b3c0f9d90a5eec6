//! In-memory host: a headless page with a manual clock.
//!
//! Used by the test-suite and the demo binary. Timers never fire on their own;
//! `advance` moves the clock and runs whatever became due, in order. `sleep`
//! futures ride on the same task queue, so a script set to `Hang` only times
//! out once the clock is advanced past the deadline.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{self, FutureExt, LocalBoxFuture};

use super::{Backend, CommandKind, Host, InsertionPoint, Payload, ScriptLoad, ScriptTag, ScrollMetrics};
use crate::error::DispatchError;

/// How the injected backend script behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptBehavior {
    Load,
    Fail(String),
    /// Never settles.
    Hang,
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub kind: CommandKind,
    pub target: String,
    pub payload: Payload,
}

/// Backend handle that records every dispatch.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    records: RefCell<Vec<Dispatched>>,
    failing: Cell<bool>,
    loaded: Cell<bool>,
    echo: Cell<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following dispatch fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.set(loaded);
    }

    /// Log every dispatch at info level.
    pub fn set_echo(&self, echo: bool) {
        self.echo.set(echo);
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.records.borrow().clone()
    }

    pub fn of_kind(&self, kind: CommandKind) -> Vec<Dispatched> {
        self.records
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .cloned()
            .collect()
    }

    /// Recorded events, in dispatch order.
    pub fn events(&self) -> Vec<Dispatched> {
        self.of_kind(CommandKind::Event)
    }

    pub fn events_named(&self, name: &str) -> Vec<Dispatched> {
        self.events().into_iter().filter(|d| d.target == name).collect()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl Backend for RecordingBackend {
    fn dispatch(
        &self,
        kind: CommandKind,
        target: &str,
        payload: &Payload,
    ) -> Result<(), DispatchError> {
        if self.failing.get() {
            return Err(DispatchError(format!("{} {} rejected", kind, target)));
        }
        if self.echo.get() {
            log::info!(
                "gtag({}, {}, {})",
                kind,
                target,
                serde_json::Value::Object(payload.clone())
            );
        }
        self.records.borrow_mut().push(Dispatched {
            kind,
            target: target.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.get()
    }
}

struct ScheduledTask {
    due_ms: f64,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

/// Headless page state.
pub struct MemoryHost {
    page_url: RefCell<String>,
    user_agent: RefCell<String>,
    language: RefCell<String>,
    online: Cell<bool>,
    hidden: Cell<bool>,
    screen: Cell<(u32, u32)>,
    viewport: Cell<(u32, u32)>,
    scroll: Cell<ScrollMetrics>,
    clock_ms: Cell<f64>,
    meta: RefCell<HashMap<String, String>>,
    existing_scripts: RefCell<Vec<String>>,
    injected: RefCell<Vec<(ScriptTag, InsertionPoint)>>,
    insertion_points: RefCell<Vec<InsertionPoint>>,
    script_behavior: RefCell<ScriptBehavior>,
    backend: RefCell<Option<Rc<RecordingBackend>>>,
    tasks: RefCell<Vec<ScheduledTask>>,
    next_seq: Cell<u64>,
    echo: Cell<bool>,
}

/// 2023-11-14T22:13:20Z
const EPOCH_START_MS: f64 = 1_700_000_000_000.0;

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            page_url: RefCell::new("https://portfolio.example.com/".to_string()),
            user_agent: RefCell::new(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/605.1.15 \
                 (KHTML, like Gecko) Version/17.0 Safari/605.1.15"
                    .to_string(),
            ),
            language: RefCell::new("en-US".to_string()),
            online: Cell::new(true),
            hidden: Cell::new(false),
            screen: Cell::new((1920, 1080)),
            viewport: Cell::new((1280, 800)),
            scroll: Cell::new(ScrollMetrics {
                scroll_y: 0.0,
                scroll_height: 4800.0,
                viewport_height: 800.0,
            }),
            clock_ms: Cell::new(EPOCH_START_MS),
            meta: RefCell::new(HashMap::new()),
            existing_scripts: RefCell::new(Vec::new()),
            injected: RefCell::new(Vec::new()),
            insertion_points: RefCell::new(vec![
                InsertionPoint::Head,
                InsertionPoint::Body,
                InsertionPoint::DocumentRoot,
            ]),
            script_behavior: RefCell::new(ScriptBehavior::Load),
            backend: RefCell::new(None),
            tasks: RefCell::new(Vec::new()),
            next_seq: Cell::new(0),
            echo: Cell::new(false),
        }
    }

    // ── Page state ──

    pub fn set_page_url(&self, url: &str) {
        *self.page_url.borrow_mut() = url.to_string();
    }

    pub fn set_user_agent(&self, ua: &str) {
        *self.user_agent.borrow_mut() = ua.to_string();
    }

    pub fn set_online(&self, online: bool) {
        self.online.set(online);
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.hidden.set(hidden);
    }

    pub fn set_screen_size(&self, width: u32, height: u32) {
        self.screen.set((width, height));
    }

    pub fn set_viewport_size(&self, width: u32, height: u32) {
        self.viewport.set((width, height));
        let mut scroll = self.scroll.get();
        scroll.viewport_height = height as f64;
        self.scroll.set(scroll);
    }

    pub fn set_scroll(&self, metrics: ScrollMetrics) {
        self.scroll.set(metrics);
    }

    pub fn set_scroll_y(&self, y: f64) {
        let mut scroll = self.scroll.get();
        scroll.scroll_y = y;
        self.scroll.set(scroll);
    }

    pub fn set_meta(&self, name: &str, content: &str) {
        self.meta
            .borrow_mut()
            .insert(name.to_string(), content.to_string());
    }

    /// Pretend a `<script src=..>` is already in the document.
    pub fn add_existing_script(&self, src: &str) {
        self.existing_scripts.borrow_mut().push(src.to_string());
    }

    pub fn set_insertion_points(&self, points: &[InsertionPoint]) {
        *self.insertion_points.borrow_mut() = points.to_vec();
    }

    pub fn set_script_behavior(&self, behavior: ScriptBehavior) {
        *self.script_behavior.borrow_mut() = behavior;
    }

    /// Log backend dispatches at info level.
    pub fn set_echo(&self, echo: bool) {
        self.echo.set(echo);
        if let Some(backend) = self.backend.borrow().as_ref() {
            backend.set_echo(echo);
        }
    }

    pub fn injected_scripts(&self) -> Vec<(ScriptTag, InsertionPoint)> {
        self.injected.borrow().clone()
    }

    /// The recording backend, once installed.
    pub fn recorder(&self) -> Option<Rc<RecordingBackend>> {
        self.backend.borrow().clone()
    }

    /// Install the backend up front, as if the vendor script were inlined.
    pub fn with_backend(self) -> Self {
        self.install_recorder();
        self
    }

    fn install_recorder(&self) -> Rc<RecordingBackend> {
        let mut slot = self.backend.borrow_mut();
        if let Some(existing) = slot.as_ref() {
            return Rc::clone(existing);
        }
        let backend = Rc::new(RecordingBackend::new());
        backend.set_echo(self.echo.get());
        *slot = Some(Rc::clone(&backend));
        backend
    }

    // ── Clock ──

    pub fn pending_tasks(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Move the clock forward, running every task that falls due on the way.
    pub fn advance(&self, ms: u64) {
        let target = self.clock_ms.get() + ms as f64;
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                let due = tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due_ms <= target)
                    .min_by(|(_, a), (_, b)| {
                        a.due_ms
                            .total_cmp(&b.due_ms)
                            .then_with(|| a.seq.cmp(&b.seq))
                    })
                    .map(|(i, _)| i);
                due.map(|i| tasks.remove(i))
            };
            match next {
                Some(task) => {
                    if task.due_ms > self.clock_ms.get() {
                        self.clock_ms.set(task.due_ms);
                    }
                    (task.task)();
                }
                None => break,
            }
        }
        self.clock_ms.set(target);
    }

    /// Run tasks that are already due without moving the clock.
    pub fn run_pending(&self) {
        self.advance(0);
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn page_url(&self) -> String {
        self.page_url.borrow().clone()
    }

    fn user_agent(&self) -> String {
        self.user_agent.borrow().clone()
    }

    fn language(&self) -> String {
        self.language.borrow().clone()
    }

    fn is_online(&self) -> bool {
        self.online.get()
    }

    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen.get()
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.viewport.get()
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.scroll.get()
    }

    fn now_ms(&self) -> f64 {
        self.clock_ms.get()
    }

    fn meta_content(&self, name: &str) -> Option<String> {
        self.meta.borrow().get(name).cloned()
    }

    fn has_script_with_src(&self, needle: &str) -> bool {
        self.existing_scripts
            .borrow()
            .iter()
            .any(|src| src.contains(needle))
    }

    fn has_insertion_point(&self, at: InsertionPoint) -> bool {
        self.insertion_points.borrow().contains(&at)
    }

    fn inject_script(&self, tag: ScriptTag, at: InsertionPoint) -> ScriptLoad {
        let src = tag.src.clone();
        self.injected.borrow_mut().push((tag, at));
        match self.script_behavior.borrow().clone() {
            ScriptBehavior::Load => {
                // A loaded element stays in the document; failed ones are discarded.
                self.existing_scripts.borrow_mut().push(src);
                let backend = self.backend.borrow().clone();
                async move {
                    if let Some(backend) = backend {
                        backend.set_loaded(true);
                    }
                    Ok::<(), String>(())
                }
                .boxed_local()
            }
            ScriptBehavior::Fail(reason) => future::ready(Err(reason)).boxed_local(),
            ScriptBehavior::Hang => future::pending().boxed_local(),
        }
    }

    fn backend(&self) -> Option<Rc<dyn Backend>> {
        self.backend
            .borrow()
            .clone()
            .map(|b| b as Rc<dyn Backend>)
    }

    fn install_backend(&self) -> Rc<dyn Backend> {
        self.install_recorder()
    }

    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        self.schedule(
            delay,
            Box::new(move || {
                // Receiver gone means the sleep was dropped; nothing to wake.
                let _ = tx.send(());
            }),
        );
        rx.map(|_| ()).boxed_local()
    }

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.tasks.borrow_mut().push(ScheduledTask {
            due_ms: self.clock_ms.get() + delay.as_millis() as f64,
            seq,
            task,
        });
    }
}
