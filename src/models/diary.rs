use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{deserialize_opt_day, parse_day, EntityId};
use crate::error::ClientResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiaryAuthor {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiaryEntry {
    pub id: EntityId,
    #[serde(default, deserialize_with = "deserialize_opt_day")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "text", alias = "body", alias = "content")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<DiaryAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl DiaryEntry {
    /// Entry day, falling back to the creation timestamp.
    pub fn day(&self) -> Option<NaiveDate> {
        self.date
            .or_else(|| self.created_at.as_deref().and_then(parse_day))
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled"
        } else {
            &self.title
        }
    }

    /// First `max_chars` characters of the body, with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.body.is_empty() {
            return "Empty".to_string();
        }
        let mut excerpt: String = self.body.chars().take(max_chars).collect();
        if self.body.chars().count() > max_chars {
            excerpt.push('…');
        }
        excerpt
    }

    pub fn author_label(&self) -> String {
        self.author
            .as_ref()
            .and_then(|a| a.username.clone())
            .or_else(|| self.author_name.clone())
            .unwrap_or_else(|| "—".to_string())
    }

    pub fn author_id(&self) -> Option<&EntityId> {
        self.author
            .as_ref()
            .and_then(|a| a.id.as_ref())
            .or(self.user_id.as_ref())
    }
}

/// A diary entry about to be written. Title and body may each be empty,
/// but not both.
#[derive(Debug, Clone, Serialize, Validate, PartialEq)]
#[validate(schema(function = "validate_has_content", skip_on_field_errors = false))]
pub struct NewDiaryEntry {
    pub date: NaiveDate,
    #[validate(length(max = 200, message = "Title must be under 200 characters"))]
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
}

impl NewDiaryEntry {
    pub fn new(date: NaiveDate, title: &str, body: &str) -> Self {
        Self {
            date,
            title: title.trim().to_string(),
            body: body.to_string(),
        }
    }
}

fn validate_has_content(entry: &NewDiaryEntry) -> Result<(), ValidationError> {
    if entry.title.trim().is_empty() && entry.body.trim().is_empty() {
        let mut err = ValidationError::new("empty_entry");
        err.message = Some("Write a title or some text first".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DiaryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "content", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl DiaryPatch {
    pub fn apply(&self, entry: &mut DiaryEntry) {
        if let Some(title) = &self.title {
            entry.title = title.trim().to_string();
        }
        if let Some(body) = &self.body {
            entry.body = body.clone();
        }
    }

    /// Apply the patch only if the result still has a title or some text.
    /// `entry` is left as it was when the check fails.
    pub fn apply_checked(&self, entry: &mut DiaryEntry) -> ClientResult<()> {
        let mut patched = entry.clone();
        self.apply(&mut patched);
        NewDiaryEntry {
            date: patched.day().unwrap_or(NaiveDate::MIN),
            title: patched.title.clone(),
            body: patched.body.clone(),
        }
        .validate()?;
        *entry = patched;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiaryQuery {
    pub date: Option<NaiveDate>,
}

impl DiaryQuery {
    pub fn on(date: NaiveDate) -> Self {
        Self { date: Some(date) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 12).unwrap()
    }

    #[test]
    fn test_empty_entry_is_rejected() {
        assert!(NewDiaryEntry::new(day(), "  ", "").validate().is_err());
        assert!(NewDiaryEntry::new(day(), "Morning", "").validate().is_ok());
        assert!(NewDiaryEntry::new(day(), "", "Slept well").validate().is_ok());
    }

    #[test]
    fn test_patch_cannot_blank_entry() {
        let mut entry: DiaryEntry =
            serde_json::from_value(json!({"id": "a", "date": "2025-11-12", "title": "T", "text": "B"})).unwrap();

        let blank = DiaryPatch {
            title: Some("  ".into()),
            body: Some(String::new()),
        };
        assert!(matches!(
            blank.apply_checked(&mut entry),
            Err(crate::error::ClientError::Validation(_))
        ));
        assert_eq!((entry.title.as_str(), entry.body.as_str()), ("T", "B"));

        let keep_body = DiaryPatch {
            title: Some("".into()),
            body: None,
        };
        keep_body.apply_checked(&mut entry).unwrap();
        assert_eq!((entry.title.as_str(), entry.body.as_str()), ("", "B"));
    }

    #[test]
    fn test_body_aliases() {
        let stored: DiaryEntry =
            serde_json::from_value(json!({"id": "a", "date": "2025-11-12", "title": "t", "text": "x"})).unwrap();
        assert_eq!(stored.body, "x");
        let remote: DiaryEntry =
            serde_json::from_value(json!({"id": 4, "title": "t", "content": "y", "created_at": "2025-11-12T10:00:00Z"}))
                .unwrap();
        assert_eq!(remote.body, "y");
        assert_eq!(remote.day(), Some(day()));
    }

    #[test]
    fn test_excerpt_cuts_on_characters() {
        let entry = DiaryEntry {
            id: EntityId::Number(1),
            date: Some(day()),
            title: String::new(),
            body: "привет мир".into(),
            author: None,
            author_name: None,
            user_id: None,
            created_at: None,
        };
        assert_eq!(entry.excerpt(6), "привет…");
        assert_eq!(entry.display_title(), "Untitled");
    }
}
