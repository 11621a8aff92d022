pub mod audit;
pub mod diary;
pub mod habit;
pub mod progress;
pub mod user;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Backend ids are numeric; locally created diary entries use UUID strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::parse(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::parse(&s)
    }
}

impl EntityId {
    /// Command-line and path input: digits become numeric ids.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => EntityId::Number(n),
            Err(_) => EntityId::Text(raw.trim().to_string()),
        }
    }
}

/// Parse the calendar day at the start of `raw`: `2025-11-12` and
/// `2025-11-12T08:30:00Z` both give the 12th.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(crate) fn deserialize_day<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_day(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

pub(crate) fn deserialize_opt_day<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.as_deref().and_then(parse_day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_json_shapes() {
        let n: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(n, EntityId::Number(42));
        let s: EntityId = serde_json::from_str(r#""a1b2""#).unwrap();
        assert_eq!(s, EntityId::Text("a1b2".into()));
        assert_eq!(serde_json::to_string(&n).unwrap(), "42");
    }

    #[test]
    fn test_parse_day() {
        let expected = NaiveDate::from_ymd_opt(2025, 11, 12);
        assert_eq!(parse_day("2025-11-12"), expected);
        assert_eq!(parse_day("2025-11-12T08:30:00Z"), expected);
        assert_eq!(parse_day("yesterday"), None);
    }

    #[test]
    fn test_entity_id_parse() {
        assert_eq!(EntityId::parse(" 7 "), EntityId::Number(7));
        assert_eq!(EntityId::parse("abc").to_string(), "abc");
    }
}
