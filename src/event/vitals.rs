//! Web-vitals ratings.
//!
//! | metric | good ≤ | poor > |
//! |--------|--------|--------|
//! | FCP    | 1800ms | 3000ms |
//! | LCP    | 2500ms | 4000ms |
//! | FID    | 100ms  | 300ms  |
//! | CLS    | 0.1    | 0.25   |
//! | TTFB   | 800ms  | 1800ms |
//! | INP    | 200ms  | 500ms  |

use std::fmt;
use std::str::FromStr;

use crate::error::AnalyticsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebVital {
    Fcp,
    Lcp,
    Fid,
    Cls,
    Ttfb,
    Inp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs-improvement",
            Rating::Poor => "poor",
        }
    }
}

impl WebVital {
    pub fn as_str(self) -> &'static str {
        match self {
            WebVital::Fcp => "FCP",
            WebVital::Lcp => "LCP",
            WebVital::Fid => "FID",
            WebVital::Cls => "CLS",
            WebVital::Ttfb => "TTFB",
            WebVital::Inp => "INP",
        }
    }

    /// `(good bound, poor bound)`, inclusive.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            WebVital::Fcp => (1800.0, 3000.0),
            WebVital::Lcp => (2500.0, 4000.0),
            WebVital::Fid => (100.0, 300.0),
            WebVital::Cls => (0.1, 0.25),
            WebVital::Ttfb => (800.0, 1800.0),
            WebVital::Inp => (200.0, 500.0),
        }
    }

    pub fn rate(self, value: f64) -> Rating {
        let (good, poor) = self.thresholds();
        if value <= good {
            Rating::Good
        } else if value <= poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }

    /// Metric slot used in the backend schema. INP has no slot of its own
    /// and is reported as FID.
    pub fn reported_as(self) -> WebVital {
        match self {
            WebVital::Inp => WebVital::Fid,
            other => other,
        }
    }
}

impl fmt::Display for WebVital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebVital {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FCP" => Ok(WebVital::Fcp),
            "LCP" => Ok(WebVital::Lcp),
            "FID" => Ok(WebVital::Fid),
            "CLS" => Ok(WebVital::Cls),
            "TTFB" => Ok(WebVital::Ttfb),
            "INP" => Ok(WebVital::Inp),
            _ => Err(AnalyticsError::UnknownMetric(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcp_ratings() {
        assert_eq!(WebVital::Lcp.rate(2000.0), Rating::Good);
        assert_eq!(WebVital::Lcp.rate(3000.0), Rating::NeedsImprovement);
        assert_eq!(WebVital::Lcp.rate(5000.0), Rating::Poor);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(WebVital::Fid.rate(100.0), Rating::Good);
        assert_eq!(WebVital::Fid.rate(300.0), Rating::NeedsImprovement);
        assert_eq!(WebVital::Fid.rate(300.1), Rating::Poor);
        assert_eq!(WebVital::Cls.rate(0.05), Rating::Good);
        assert_eq!(WebVital::Cls.rate(0.25), Rating::NeedsImprovement);
        assert_eq!(WebVital::Ttfb.rate(1801.0), Rating::Poor);
    }

    #[test]
    fn test_inp_uses_own_thresholds_but_fid_slot() {
        assert_eq!(WebVital::Inp.rate(150.0), Rating::Good);
        assert_eq!(WebVital::Fid.rate(150.0), Rating::NeedsImprovement);
        assert_eq!(WebVital::Inp.reported_as(), WebVital::Fid);
        assert_eq!(WebVital::Lcp.reported_as(), WebVital::Lcp);
    }

    #[test]
    fn test_parse() {
        assert_eq!("lcp".parse::<WebVital>().unwrap(), WebVital::Lcp);
        assert_eq!(" INP ".parse::<WebVital>().unwrap(), WebVital::Inp);
        assert!("TTI".parse::<WebVital>().is_err());
    }
}
