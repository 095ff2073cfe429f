use std::fmt;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Response from `GET /api/data`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataInfo {
    #[serde(default)]
    pub clan: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A game turn, identified by year and month (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Turn {
    year: u32,
    month: u32,
}

impl Turn {
    /// Create a turn. Returns `None` for a zero year or a month outside 1-12.
    pub fn new(year: u32, month: u32) -> Option<Self> {
        if year >= 1 && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The turn for the current calendar month
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year().max(1) as u32,
            month: now.month(),
        }
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The previous turn. Year 1, month 1 has no predecessor and is returned as is.
    pub fn prev(&self) -> Self {
        match (self.year, self.month) {
            (1, 1) => *self,
            (y, 1) => Self { year: y - 1, month: 12 },
            (y, m) => Self { year: y, month: m - 1 },
        }
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The turn echoed back by `GET /api/data/turn`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRef {
    pub year: u32,
    pub month: u32,
}

/// Response from `GET /api/data/turn`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TurnData {
    #[serde(default)]
    pub turn: TurnRef,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub path: Option<String>,
}

/// Response from `POST /api/admin/debug/log-all-routes`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouteLogging {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub logging: String,
}

impl RouteLogging {
    pub fn is_enabled(&self) -> bool {
        self.logging == "enabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_new_validates() {
        assert!(Turn::new(2024, 1).is_some());
        assert!(Turn::new(2024, 12).is_some());
        assert!(Turn::new(2024, 0).is_none());
        assert!(Turn::new(2024, 13).is_none());
        assert!(Turn::new(0, 5).is_none());
    }

    #[test]
    fn test_turn_next_wraps_year() {
        let dec = Turn::new(1901, 12).unwrap();
        assert_eq!(dec.next(), Turn::new(1902, 1).unwrap());
        assert_eq!(Turn::new(1901, 5).unwrap().next(), Turn::new(1901, 6).unwrap());
    }

    #[test]
    fn test_turn_prev_wraps_year() {
        let jan = Turn::new(1902, 1).unwrap();
        assert_eq!(jan.prev(), Turn::new(1901, 12).unwrap());
        assert_eq!(jan.prev().next(), jan);
        // No turn before year 1
        let first = Turn::new(1, 1).unwrap();
        assert_eq!(first.prev(), first);
    }

    #[test]
    fn test_turn_display() {
        assert_eq!(Turn::new(899, 3).unwrap().to_string(), "0899-03");
    }

    #[test]
    fn test_turn_current_is_valid() {
        let now = Turn::current();
        assert!(Turn::new(now.year(), now.month()).is_some());
    }

    #[test]
    fn test_parse_turn_data() {
        let missing: TurnData = serde_json::from_str(r#"{"turn":{"year":1901,"month":4},"exists":false}"#)
            .expect("turn data should parse");
        assert!(!missing.exists);
        assert_eq!(missing.turn, TurnRef { year: 1901, month: 4 });
        assert_eq!(missing.path, None);

        let found: TurnData = serde_json::from_str(
            r#"{"turn":{"year":1901,"month":4},"exists":true,"path":"/data/0138/data/output/1901/4"}"#,
        )
        .expect("turn data should parse");
        assert!(found.exists);
        assert_eq!(found.path.as_deref(), Some("/data/0138/data/output/1901/4"));
    }

    #[test]
    fn test_route_logging_status() {
        let on: RouteLogging = serde_json::from_str(r#"{"success":true,"logging":"enabled"}"#).unwrap();
        assert!(on.is_enabled());
        let off: RouteLogging = serde_json::from_str(r#"{"success":true,"logging":"disabled"}"#).unwrap();
        assert!(!off.is_enabled());
    }
}
