//! Headless page session against the in-memory host.
//!
//! Walks one visit through the analytics layer (bootstrap, consent, page
//! view, scrolling, section dwell, an offline stretch, web vitals) and logs
//! every backend command. Configure with the usual environment variables;
//! without `GA_MEASUREMENT_ID` a demo id is used.

use std::rc::Rc;

use folio_analytics::host::memory::MemoryHost;
use folio_analytics::host::Host;
use folio_analytics::{
    AnalyticsContext, ContactFormAction, Environment, ProjectAction, RuntimeMode, WebVital,
};

const SECTIONS: &[(&str, &str)] = &[
    ("hero", "Hero"),
    ("about", "About"),
    ("experience", "Experience"),
    ("projects", "Projects"),
    ("contact", "Contact"),
];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut env = Environment::from_env();
    if !env.has_measurement_id() {
        log::info!("GA_MEASUREMENT_ID not set, using a demo id");
        env.measurement_id = "G-DEMO000000".to_string();
        env.mode = RuntimeMode::Production;
    }

    let host = Rc::new(MemoryHost::new());
    host.set_echo(true);
    let ctx = AnalyticsContext::new(env, host.clone());

    match ctx.init_if_eligible() {
        Some(init) => {
            if let Err(e) = pollster::block_on(init) {
                log::error!("Analytics bootstrap failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            log::warn!("Host not eligible for analytics, nothing to do");
            return;
        }
    }

    ctx.update_consent_settings(true, false);
    ctx.mount();
    ctx.track_page_view("/", "Portfolio");

    for (id, name) in SECTIONS {
        ctx.observe_section(id, name);
    }

    // Read down the page, one section at a time.
    let travel = host.scroll_metrics().scroll_height - host.scroll_metrics().viewport_height;
    for (i, (id, _)) in SECTIONS.iter().enumerate() {
        ctx.on_section_intersection(id, true);
        for step in 0..4 {
            let progress = (i * 4 + step + 1) as f64 / (SECTIONS.len() * 4) as f64;
            host.set_scroll_y(travel * progress);
            ctx.on_scroll();
            host.advance(1_500);
        }
        ctx.on_section_intersection(id, false);
    }

    ctx.track_project_interaction("ray-tracer", ProjectAction::ClickDemo, &["rust", "wgpu"]);
    ctx.track_external_link("https://github.com/", "GitHub");

    // Connection drops while the visitor fills in the form.
    host.set_online(false);
    ctx.track_contact_form(ContactFormAction::Start, None);
    ctx.track_contact_form(ContactFormAction::Submit, None);
    host.set_online(true);
    let report = ctx.on_online();
    log::info!("Offline replay: {:?}", report);

    ctx.track_web_vitals(WebVital::Lcp, 2140.0, "v3-1700000000000-1");
    ctx.track_web_vitals(WebVital::Inp, 180.0, "v3-1700000000000-2");

    host.advance(120_000);

    let dispatched = host.recorder().map_or(0, |b| b.dispatched().len());
    log::info!("Session finished: {} backend commands", dispatched);
    ctx.dispose();
}
