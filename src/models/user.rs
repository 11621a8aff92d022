use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::EntityId;
use crate::error::ClientResult;

/// Role as reported by the backend. The client never derives it; anything
/// other than `admin` is treated as a regular user.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some(role) if role.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// The backend has sent the user's city as a record, a bare name and a
/// bare id depending on the endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CityRef {
    Record(City),
    Id(i64),
    Name(String),
}

impl CityRef {
    pub fn display_name(&self) -> String {
        match self {
            CityRef::Record(city) => city.name.clone(),
            CityRef::Id(id) => format!("#{}", id),
            CityRef::Name(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: EntityId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<CityRef>,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Fields this client does not model, kept so a merge never drops them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Shallow merge: every key in `patch` replaces the same key here,
    /// everything else is kept.
    pub fn merged(&self, patch: &Map<String, Value>) -> ClientResult<UserProfile> {
        let mut base = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge_into(&mut base, patch);
        Ok(serde_json::from_value(Value::Object(base))?)
    }

    pub fn from_patch(patch: &Map<String, Value>) -> ClientResult<UserProfile> {
        let mut base = Map::new();
        merge_into(&mut base, patch);
        Ok(serde_json::from_value(Value::Object(base))?)
    }

    pub fn city_name(&self) -> Option<String> {
        self.city
            .as_ref()
            .map(CityRef::display_name)
            .or_else(|| self.city_id.map(|id| format!("#{}", id)))
    }
}

fn merge_into(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        // `avatar` is an alias of `picture`; keeping both would be a
        // duplicate field on the way back in.
        let key = if key == "avatar" { "picture" } else { key.as_str() };
        base.insert(key.to_string(), value.clone());
    }
}

/// One row of the admin users table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminUserRow {
    pub id: EntityId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, alias = "City")]
    pub city: Option<CityRef>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AdminUserRow {
    pub fn city_label(&self) -> String {
        self.city
            .as_ref()
            .map(CityRef::display_name)
            .or_else(|| self.city_name.clone())
            .unwrap_or_else(|| "—".to_string())
    }
}

impl From<&UserProfile> for AdminUserRow {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            city: user.city.clone(),
            city_name: None,
            created_at: user.created_at.clone(),
        }
    }
}

/// `/api/cities` answers with either a bare list or `{"cities": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CityList {
    Wrapped { cities: Vec<City> },
    Bare(Vec<City>),
}

impl From<CityList> for Vec<City> {
    fn from(list: CityList) -> Self {
        match list {
            CityList::Wrapped { cities } => cities,
            CityList::Bare(cities) => cities,
        }
    }
}
