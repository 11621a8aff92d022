use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{deserialize_day, EntityId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    /// Kept verbatim so a newer backend value survives a round trip.
    Other(String),
}

impl Frequency {
    pub fn as_str(&self) -> &str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Other(raw) => raw,
        }
    }
}

impl From<&str> for Frequency {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            _ => Frequency::Other(raw.to_string()),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Frequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Frequency::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitLog {
    #[serde(alias = "log_date", deserialize_with = "deserialize_day")]
    pub date: NaiveDate,
    /// A log row without the flag is a completion.
    #[serde(default = "completed_by_default")]
    pub is_completed: bool,
}

fn completed_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HabitOwner {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default = "active_by_default", deserialize_with = "deserialize_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "deserialize_logs")]
    pub logs: Vec<HabitLog>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<HabitOwner>,
    #[serde(default, alias = "user_name")]
    pub username: Option<String>,
}

fn active_by_default() -> bool {
    true
}

/// Only an explicit `false` pauses a habit; `null` reads as active.
fn deserialize_active<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn deserialize_logs<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<HabitLog>, D::Error> {
    Ok(Option::<Vec<HabitLog>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Habit {
    pub fn author(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .or(self.username.as_deref())
    }
}
