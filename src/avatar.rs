//! Avatar files picked by the user, and the short-lived preview references
//! shown before they are uploaded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::multipart::Part;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

pub const MAX_AVATAR_BYTES: usize = 3 * 1024 * 1024;
pub const ALLOWED_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// A validated image waiting to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarFile {
    file_name: String,
    mime: String,
    bytes: Arc<Vec<u8>>,
}

impl AvatarFile {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> ClientResult<Self> {
        let mime = mime.into();
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            return Err(ClientError::Validation("Only JPG, PNG or WEBP images are allowed".into()));
        }
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(ClientError::Validation("File is too large (max 3 MB)".into()));
        }

        Ok(Self {
            file_name: file_name.into(),
            mime,
            bytes: Arc::new(bytes),
        })
    }

    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "avatar".to_string());
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;

        Self::new(file_name, mime, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_part(&self) -> ClientResult<Part> {
        Part::bytes(self.bytes.as_ref().clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)
            .map_err(|e| ClientError::Validation(format!("Invalid image type: {}", e)))
    }
}

/// Registry of in-memory object references, the counterpart of the
/// browser's `blob:` URLs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrls {
    objects: Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `file` and return a handle that revokes it when dropped.
    pub fn create(&self, file: &AvatarFile) -> ObjectUrl {
        let url = format!("blob:{}", Uuid::new_v4());
        self.objects.lock().insert(url.clone(), file.bytes.clone());
        tracing::trace!(url = %url, "Object URL created");
        ObjectUrl {
            url,
            registry: self.clone(),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        self.objects.lock().get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.objects.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.objects.lock().remove(url).is_some() {
            tracing::trace!(url = %url, "Object URL revoked");
        }
    }
}

#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: ObjectUrls,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

/// What the avatar slot currently shows.
#[derive(Debug, Default)]
pub enum AvatarPreview {
    #[default]
    Placeholder,
    /// Path or URL stored on the backend.
    Remote(String),
    /// A local selection not uploaded yet.
    Local(ObjectUrl),
}

impl AvatarPreview {
    pub fn from_stored(picture: Option<&str>) -> Self {
        match picture.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => AvatarPreview::Remote(path.to_string()),
            None => AvatarPreview::Placeholder,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AvatarPreview::Local(_))
    }
}
