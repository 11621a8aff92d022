use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Could not reach server: {0}")]
    Network(String),

    #[error("Authentication required: {0}")]
    Unauthorized(String),

    #[error("Request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build the error for a non-success response, preferring whatever
    /// message the server put in the body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = server_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized(_) => Some(401),
            ClientError::NotFound(_) => Some(404),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown inline next to the form or list that failed.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => "Could not reach server".to_string(),
            ClientError::Unauthorized(_) => "Your session has expired, please log in again".to_string(),
            ClientError::Api { message, .. }
            | ClientError::Validation(message)
            | ClientError::NotFound(message) => message.clone(),
            ClientError::Decode(_) => "Unexpected response from server".to_string(),
            ClientError::Storage(_) => "Local storage is unavailable".to_string(),
            ClientError::Config(message) => message.clone(),
        }
    }
}

/// Pull the human readable message out of an error body. Backends have used
/// `{"error": "..."}`, `{"error": {"message": "..."}}`, `{"details": "..."}`
/// and `{"message": "..."}`.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    let candidates = [
        value.get("error").and_then(Value::as_str),
        value.pointer("/error/message").and_then(Value::as_str),
        value.get("details").and_then(Value::as_str),
        value.get("message").and_then(Value::as_str),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string);
    message
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else if e.is_builder() {
            ClientError::Config(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        let message = fields
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .next()
            .unwrap_or_else(|| "Invalid input".to_string());

        ClientError::Validation(message)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
