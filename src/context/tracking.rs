//! Semantic tracking calls.
//!
//! Each call fixes the category and shape of one concern and goes through
//! the emitter, so eligibility, offline queueing and sanitization apply.

use url::Url;

use super::{truncate_str, AnalyticsContext};
use crate::engagement::scroll_depth_percent;
use crate::event::params::ParamObject;
use crate::event::vitals::WebVital;
use crate::event::{TrackingEvent, Transport};

const MAX_ERROR_TEXT: usize = 150;
const MAX_ERROR_STACK: usize = 500;

/// Contact form funnel step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFormAction {
    Start,
    Submit,
    Error,
    Success,
    Abandon,
}

impl ContactFormAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ContactFormAction::Start => "start",
            ContactFormAction::Submit => "submit",
            ContactFormAction::Error => "error",
            ContactFormAction::Success => "success",
            ContactFormAction::Abandon => "abandon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    View,
    ClickDemo,
    ClickCode,
    Hover,
    Share,
}

impl ProjectAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectAction::View => "view",
            ProjectAction::ClickDemo => "click_demo",
            ProjectAction::ClickCode => "click_code",
            ProjectAction::Hover => "hover",
            ProjectAction::Share => "share",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    ScrollDepth,
    TimeOnPage,
    ClickDepth,
}

impl EngagementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementKind::ScrollDepth => "scroll_depth",
            EngagementKind::TimeOnPage => "time_on_page",
            EngagementKind::ClickDepth => "click_depth",
        }
    }
}

/// Hostname of a link target, or `"unknown"` when it does not parse.
pub fn link_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

impl AnalyticsContext {
    pub fn track_page_view(&self, path: &str, title: &str) {
        let params = ParamObject::new()
            .with("page_path", path)
            .with("page_title", title)
            .with("page_location", self.inner.host.page_url());
        self.track_event(
            TrackingEvent::new("page_view")
                .category("navigation")
                .label(path)
                .custom(params),
        );
    }

    pub fn track_section_view(&self, section_name: &str, scroll_depth: f64, dwell_ms: f64) {
        let (width, height) = self.inner.host.viewport_size();
        let params = ParamObject::new()
            .with("section_name", section_name)
            .with("scroll_depth", scroll_depth.round())
            .with("time_spent_ms", dwell_ms.round())
            .with("viewport_size", format!("{}x{}", width, height));
        self.track_event(
            TrackingEvent::new("section_view")
                .category("section_engagement")
                .label(section_name)
                .value(scroll_depth.round())
                .custom(params),
        );
    }

    /// Section view using the current scroll position.
    pub fn track_section_view_now(&self, section_name: &str, dwell_ms: f64) {
        let depth = scroll_depth_percent(self.inner.host.scroll_metrics());
        self.track_section_view(section_name, depth, dwell_ms);
    }

    pub fn track_contact_form(&self, action: ContactFormAction, detail: Option<&str>) {
        let params = ParamObject::new()
            .with("form_action", action.as_str())
            .with("form_detail", detail.map(|d| truncate_str(d, MAX_ERROR_TEXT)));
        self.track_event(
            TrackingEvent::new(format!("contact_form_{}", action.as_str()))
                .category("contact")
                .label(action.as_str())
                .custom(params),
        );
    }

    pub fn track_project_interaction(
        &self,
        project_name: &str,
        action: ProjectAction,
        technologies: &[&str],
    ) {
        let params = ParamObject::new()
            .with("project_name", project_name)
            .with("interaction_type", action.as_str());
        if !technologies.is_empty() {
            params.insert("technologies", technologies);
        }
        self.track_event(
            TrackingEvent::new("project_interaction")
                .category("projects")
                .label(project_name)
                .custom(params),
        );
    }

    /// Outbound link click. Sent as a beacon so it survives the navigation.
    pub fn track_external_link(&self, url: &str, link_text: &str) {
        let params = ParamObject::new()
            .with("link_url", url)
            .with("link_domain", link_domain(url))
            .with("link_text", link_text);
        self.track_event(
            TrackingEvent::new("external_link_click")
                .category("outbound")
                .label(url)
                .transport(Transport::Beacon)
                .custom(params),
        );
    }

    pub fn track_download(&self, file_name: &str, file_type: &str, size_bytes: Option<u64>) {
        let size_kb = size_bytes.map(|b| (b as f64 / 1024.0).round());
        let params = ParamObject::new()
            .with("file_name", file_name)
            .with("file_type", file_type)
            .with("file_size_kb", size_kb);
        let mut event = TrackingEvent::new("file_download")
            .category("downloads")
            .label(file_name)
            .custom(params);
        if let Some(kb) = size_kb {
            event = event.value(kb);
        }
        self.track_event(event);
    }

    /// Web-vitals sample. Rated with the metric's own thresholds, then
    /// reported under its backend slot (INP as FID).
    pub fn track_web_vitals(&self, metric: WebVital, value: f64, id: &str) {
        let rating = metric.rate(value);
        let slot = metric.reported_as();
        // CLS is unitless; scale so the integer value keeps precision.
        let scaled = if metric == WebVital::Cls { value * 1000.0 } else { value };
        let params = ParamObject::new()
            .with("metric_name", slot.as_str())
            .with("metric_value", value)
            .with("metric_rating", rating.as_str())
            .with("metric_id", id)
            .with("metric_source", metric.as_str());
        self.track_event(
            TrackingEvent::new("web_vitals")
                .category("web_vitals")
                .label(slot.as_str())
                .value(scaled.round())
                .non_interaction(true)
                .custom(params),
        );
    }

    pub fn track_engagement(&self, kind: EngagementKind, value: f64) {
        let params = ParamObject::new().with("engagement_type", kind.as_str());
        self.track_event(
            TrackingEvent::new(kind.as_str())
                .category("engagement")
                .label(kind.as_str())
                .value(value.round())
                .non_interaction(true)
                .custom(params),
        );
    }

    pub fn track_error(&self, error_type: &str, message: &str, stack: Option<&str>) {
        let error_type = truncate_str(error_type, MAX_ERROR_TEXT);
        let params = ParamObject::new()
            .with("error_type", error_type.as_str())
            .with("error_message", truncate_str(message, MAX_ERROR_TEXT))
            .with("error_stack", stack.map(|s| truncate_str(s, MAX_ERROR_STACK)))
            .with("fatal", false);
        self.track_event(
            TrackingEvent::new("exception")
                .category("error")
                .label(error_type)
                .non_interaction(true)
                .custom(params),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::*;
    use crate::host::ScrollMetrics;

    #[test]
    fn test_section_view_shape() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_section_view("Experience", 62.4, 4200.7);
        let e = &backend.events_named("section_view")[0];
        assert_eq!(e.payload["event_label"], "Experience");
        assert_eq!(e.payload["value"], 62.0);
        assert_eq!(e.payload["scroll_depth"], 62.0);
        assert_eq!(e.payload["time_spent_ms"], 4201.0);
        assert_eq!(e.payload["viewport_size"], "1280x800");
    }

    #[test]
    fn test_section_view_now_reads_scroll() {
        let (ctx, host, backend) = ready_context();
        host.set_scroll(ScrollMetrics {
            scroll_y: 0.0,
            scroll_height: 500.0,
            viewport_height: 800.0,
        });
        ctx.track_section_view_now("Hero", 1500.0);
        assert_eq!(backend.events_named("section_view")[0].payload["value"], 100.0);
    }

    #[test]
    fn test_contact_form_funnel() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_contact_form(ContactFormAction::Start, None);
        ctx.track_contact_form(ContactFormAction::Error, Some("email invalid"));
        assert_eq!(backend.events_named("contact_form_start").len(), 1);
        let err = &backend.events_named("contact_form_error")[0];
        assert_eq!(err.payload["form_detail"], "email invalid");
        assert_eq!(err.payload["event_category"], "contact");
        assert!(!backend.events_named("contact_form_start")[0]
            .payload
            .contains_key("form_detail"));
    }

    #[test]
    fn test_project_interaction() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_project_interaction("ray-tracer", ProjectAction::ClickCode, &["rust", "wgpu"]);
        let e = &backend.events_named("project_interaction")[0];
        assert_eq!(e.payload["interaction_type"], "click_code");
        assert_eq!(e.payload["technologies"], serde_json::json!(["rust", "wgpu"]));
    }

    #[test]
    fn test_external_link_domain_and_transport() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_external_link("https://github.com/someone/repo", "GitHub");
        ctx.track_external_link("not a url", "Broken");
        let events = backend.events_named("external_link_click");
        assert_eq!(events[0].payload["link_domain"], "github.com");
        assert_eq!(events[0].payload["transport_type"], "beacon");
        assert_eq!(events[1].payload["link_domain"], "unknown");
    }

    #[test]
    fn test_download_size_in_kb() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_download("resume.pdf", "pdf", Some(153_600));
        ctx.track_download("notes.txt", "txt", None);
        let events = backend.events_named("file_download");
        assert_eq!(events[0].payload["file_size_kb"], 150.0);
        assert_eq!(events[0].payload["value"], 150.0);
        assert!(!events[1].payload.contains_key("file_size_kb"));
        assert!(!events[1].payload.contains_key("value"));
    }

    #[test]
    fn test_web_vitals_ratings() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_web_vitals(WebVital::Lcp, 2000.0, "v1");
        ctx.track_web_vitals(WebVital::Lcp, 3000.0, "v2");
        ctx.track_web_vitals(WebVital::Lcp, 5000.0, "v3");
        ctx.track_web_vitals(WebVital::Cls, 0.05, "v4");
        let ratings: Vec<_> = backend
            .events_named("web_vitals")
            .iter()
            .map(|e| e.payload["metric_rating"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(ratings, vec!["good", "needs-improvement", "poor", "good"]);

        let cls = &backend.events_named("web_vitals")[3];
        assert_eq!(cls.payload["value"], 50.0);
        assert_eq!(cls.payload["non_interaction"], true);
    }

    #[test]
    fn test_inp_reported_as_fid() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_web_vitals(WebVital::Inp, 150.0, "v5");
        let e = &backend.events_named("web_vitals")[0];
        assert_eq!(e.payload["metric_name"], "FID");
        assert_eq!(e.payload["event_label"], "FID");
        assert_eq!(e.payload["metric_rating"], "good");
        assert_eq!(e.payload["metric_source"], "INP");
    }

    #[test]
    fn test_engagement_is_non_interaction() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_engagement(EngagementKind::ClickDepth, 3.0);
        let e = &backend.events_named("click_depth")[0];
        assert_eq!(e.payload["non_interaction"], true);
        assert_eq!(e.payload["value"], 3.0);
    }

    #[test]
    fn test_error_truncation() {
        let (ctx, _host, backend) = ready_context();
        let message = "m".repeat(400);
        let stack = "s".repeat(900);
        ctx.track_error("TypeError", &message, Some(&stack));
        let e = &backend.events_named("exception")[0];
        assert_eq!(e.payload["error_message"].as_str().map(str::len), Some(150));
        assert_eq!(e.payload["error_stack"].as_str().map(str::len), Some(500));
        assert_eq!(e.payload["non_interaction"], true);
        assert_eq!(e.payload["fatal"], false);
    }

    #[test]
    fn test_page_view() {
        let (ctx, _host, backend) = ready_context();
        ctx.track_page_view("/projects", "Projects");
        let e = &backend.events_named("page_view")[0];
        assert_eq!(e.payload["page_path"], "/projects");
        assert_eq!(e.payload["page_location"], "https://portfolio.example.com/");
    }

    #[test]
    fn test_link_domain() {
        assert_eq!(link_domain("https://www.linkedin.com/in/x"), "www.linkedin.com");
        assert_eq!(link_domain("mailto:me@example.com"), "unknown");
        assert_eq!(link_domain("/relative"), "unknown");
    }
}
