//! Engagement measurement primitives.
//!
//! - `section`: per-section dwell tracking driven by viewport intersection
//! - `milestones`: page-lifetime scroll-depth and time-on-page milestones

pub mod milestones;
pub mod section;

use crate::host::ScrollMetrics;

/// Viewport observer configuration the host should register sections with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverOptions {
    /// Fraction of the section that must be visible to count as intersecting.
    pub threshold: f64,
    pub root_margin: &'static str,
}

pub const SECTION_OBSERVER: ObserverOptions = ObserverOptions {
    threshold: 0.3,
    root_margin: "0px 0px -10% 0px",
};

/// Rounded scroll position as a percentage of the scrollable distance.
/// A page that cannot scroll counts as fully read.
pub fn scroll_depth_percent(metrics: ScrollMetrics) -> f64 {
    let max_scroll = metrics.scroll_height - metrics.viewport_height;
    if max_scroll <= 0.0 {
        return 100.0;
    }
    (metrics.scroll_y / max_scroll * 100.0).round().clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_y: f64, scroll_height: f64, viewport_height: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_y,
            scroll_height,
            viewport_height,
        }
    }

    #[test]
    fn test_scroll_depth() {
        assert_eq!(scroll_depth_percent(metrics(0.0, 2000.0, 1000.0)), 0.0);
        assert_eq!(scroll_depth_percent(metrics(500.0, 2000.0, 1000.0)), 50.0);
        assert_eq!(scroll_depth_percent(metrics(333.0, 2000.0, 1000.0)), 33.0);
        assert_eq!(scroll_depth_percent(metrics(1000.0, 2000.0, 1000.0)), 100.0);
    }

    #[test]
    fn test_unscrollable_page_is_fully_read() {
        assert_eq!(scroll_depth_percent(metrics(0.0, 600.0, 800.0)), 100.0);
    }

    #[test]
    fn test_overscroll_is_clamped() {
        assert_eq!(scroll_depth_percent(metrics(1200.0, 2000.0, 1000.0)), 100.0);
        assert_eq!(scroll_depth_percent(metrics(-40.0, 2000.0, 1000.0)), 0.0);
    }

    #[test]
    fn test_section_observer_options() {
        assert_eq!(SECTION_OBSERVER.threshold, 0.3);
        // Bottom tenth of the viewport does not count
        let margins: Vec<_> = SECTION_OBSERVER.root_margin.split_whitespace().collect();
        assert_eq!(margins, vec!["0px", "0px", "-10%", "0px"]);
    }
}
