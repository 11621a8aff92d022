use serde::Serialize;
use serde_json::Value;

use super::EntityId;

/// One audit log row, normalized from whichever shape the backend used.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: Option<EntityId>,
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    /// The raw record as received.
    pub details: Value,
}

impl AuditLogEntry {
    pub fn from_raw(raw: Value) -> Self {
        let text = |pointer: &str| {
            raw.pointer(pointer)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let id = raw
            .get("id")
            .cloned()
            .and_then(|v| serde_json::from_value::<EntityId>(v).ok());

        let timestamp = text("/created_at")
            .or_else(|| text("/timestamp"))
            .unwrap_or_default();

        let actor = text("/user/username")
            .or_else(|| text("/actor"))
            .or_else(|| match raw.get("user_id") {
                Some(Value::Null) | None => None,
                Some(Value::String(s)) => Some(format!("user#{}", s)),
                Some(other) => Some(format!("user#{}", other)),
            })
            .unwrap_or_else(|| "—".to_string());

        let action = text("/action")
            .or_else(|| text("/change_type"))
            .unwrap_or_else(|| "UPDATE".to_string());

        Self {
            id,
            timestamp,
            actor,
            action,
            details: raw,
        }
    }

    pub fn details_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.details).unwrap_or_else(|_| self.details.to_string())
    }
}
