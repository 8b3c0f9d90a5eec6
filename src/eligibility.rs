//! Tracking eligibility.
//!
//! Two gates with different strictness:
//! - `is_tracking_enabled`: per-event, re-evaluated on every call (no cached
//!   bot/offline state)
//! - `should_initialize_analytics`: whether the backend should be loaded at
//!   all; refuses dev/test builds and anything that looks like a local server

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::{Host as UrlHost, Url};

use crate::env::Environment;
use crate::host::Host;

/// Case-insensitive, unanchored user-agent fragments of crawlers, scrapers,
/// audit tools and social preview fetchers.
const BOT_PATTERNS: &[&str] = &[
    "bot",
    "spider",
    "crawler",
    "scraper",
    "lighthouse",
    // Search engines
    "googlebot",
    "bingbot",
    "slurp",
    "duckduckbot",
    "baiduspider",
    "yandexbot",
    "sogou",
    "exabot",
    "applebot",
    // Social preview fetchers
    "facebookexternalhit",
    "facebot",
    "twitterbot",
    "linkedinbot",
    "pinterestbot",
    "slackbot",
    "discordbot",
    "telegrambot",
    "whatsapp",
    "embedly",
    "redditbot",
];

/// Hostnames that only ever point at a developer machine.
const LOCAL_HOSTNAMES: &[&str] = &["localhost", "0.0.0.0"];

const LOCAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".test"];

/// Whether the user agent belongs to an automated client.
pub fn is_bot_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    BOT_PATTERNS.iter().any(|p| ua.contains(p))
}

/// Per-event gate. Cheap; consulted on every tracking call.
pub fn is_tracking_enabled(env: &Environment, host: &dyn Host) -> bool {
    if !is_client_eligible(env, host) {
        return false;
    }
    if host.backend().is_none() {
        return false;
    }
    host.is_online()
}

/// The checks that do not depend on connectivity or on the backend being
/// installed yet: configured id, not a test build, not a bot. Events are
/// only parked for offline replay when this holds, since replay does not
/// look again.
pub fn is_client_eligible(env: &Environment, host: &dyn Host) -> bool {
    env.has_measurement_id() && !env.is_test() && !is_bot_user_agent(&host.user_agent())
}

/// Whether the bootstrapper should attempt to load the backend at all.
pub fn should_initialize_analytics(env: &Environment, host: &dyn Host) -> bool {
    if env.is_development() || env.is_test() {
        return false;
    }
    match Url::parse(&host.page_url()) {
        // `Url::port` is `None` for the scheme's default port.
        Ok(url) => url.port().is_none() && !is_local_host(url.host()),
        Err(e) => {
            log::debug!("Unparseable page URL, skipping analytics: {}", e);
            false
        }
    }
}

fn is_local_host(host: Option<UrlHost<&str>>) -> bool {
    match host {
        None => true,
        Some(UrlHost::Ipv4(ip)) => is_local_ip(IpAddr::V4(ip)),
        Some(UrlHost::Ipv6(ip)) => is_local_ip(IpAddr::V6(ip)),
        Some(UrlHost::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            LOCAL_HOSTNAMES.contains(&domain.as_str())
                || LOCAL_SUFFIXES.iter().any(|s| domain.ends_with(s))
        }
    }
}

fn is_local_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4 == Ipv4Addr::BROADCAST
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6 == Ipv6Addr::LOCALHOST
        }
    }
}
