use std::sync::Arc;
use std::time::Instant;

use reqwest::multipart::Form;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::join_url;
use crate::auth::csrf::{self, CsrfCache, CSRF_HEADER};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::routes::{Navigator, Route};
use crate::session::SessionStore;

pub enum Body {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    Multipart(Form),
}

/// Every backend call goes through [`ApiClient::send`]: it attaches the
/// bearer and CSRF headers, and turns a 401 into a session eviction plus
/// one redirect to the login view.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<Config>,
    session: Arc<SessionStore>,
    csrf: CsrfCache,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: Arc<Config>,
        session: Arc<SessionStore>,
        csrf: CsrfCache,
        navigator: Arc<dyn Navigator>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("dreamyfocus-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            session,
            csrf,
            navigator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn csrf(&self) -> &CsrfCache {
        &self.csrf
    }

    pub fn url(&self, path: &str) -> ClientResult<Url> {
        let full = join_url(&self.config.api_base, path);
        Url::parse(&full).map_err(|e| ClientError::Config(format!("invalid URL {}: {}", full, e)))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(Method::GET, path, Body::Empty).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, path, Body::Json(serde_json::to_value(body)?)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::PUT, path, Body::Json(serde_json::to_value(body)?)).await
    }

    /// DELETE, ignoring whatever body the backend answers with.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.execute(Method::DELETE, path, Body::Empty).await.map(|_| ())
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(String, String)>,
    ) -> ClientResult<T> {
        self.send(Method::POST, path, Body::Form(fields)).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> ClientResult<T> {
        self.send(Method::POST, path, Body::Multipart(form)).await
    }

    /// Send a request and decode the answer. An empty body decodes as JSON
    /// `null`, so `()`, `Option<_>` and `Value` all accept it.
    pub async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Body) -> ClientResult<T> {
        let text = self.execute(method, path, body).await?;
        decode(&text)
    }

    async fn execute(&self, method: Method, path: &str, body: Body) -> ClientResult<String> {
        let url = self.url(path)?;
        let token = self.session.token();

        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }

        if self.config.csrf_enabled && is_state_changing(&method) {
            if let Some(csrf_token) = self.csrf_token(token.as_deref()).await {
                request = request.header(CSRF_HEADER, csrf_token);
            }
        }

        request = match body {
            Body::Empty => request,
            Body::Json(value) => request.json(&value),
            Body::Form(fields) => request.form(&fields),
            Body::Multipart(form) => request.multipart(form),
        };

        tracing::debug!(method = %method, path = path, "Sending API request");
        let started = Instant::now();

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path = path, error = %e, "API request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        tracing::debug!(
            method = %method,
            path = path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received API response"
        );

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(token.as_deref());
        }

        if !status.is_success() {
            return Err(ClientError::from_response(status, &text));
        }

        Ok(text)
    }

    /// A 401 ends the session that sent the request. When several requests
    /// with the same token fail together, only the first one tears down and
    /// redirects.
    fn handle_unauthorized(&self, sent_token: Option<&str>) {
        let Some(token) = sent_token else {
            return;
        };

        if self.session.evict_if_current(token) {
            self.csrf.clear();
            self.navigator.navigate(Route::Login);
        }
    }

    /// Cached CSRF token, or a freshly fetched one. Failures are logged and
    /// the request goes out without the header.
    async fn csrf_token(&self, bearer: Option<&str>) -> Option<String> {
        if let Some(cached) = self.csrf.get() {
            return Some(cached);
        }

        match self.fetch_csrf(bearer).await {
            Ok(token) => {
                self.csrf.store(&token);
                Some(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "CSRF token fetch failed, sending request without it");
                None
            }
        }
    }

    /// Drop the cached CSRF token and fetch a new one.
    pub async fn refresh_csrf(&self) -> ClientResult<String> {
        self.csrf.clear();
        let token = self.fetch_csrf(self.session.token().as_deref()).await?;
        self.csrf.store(&token);
        Ok(token)
    }

    async fn fetch_csrf(&self, bearer: Option<&str>) -> ClientResult<String> {
        let mut request = self.http.get(self.url(&self.config.endpoints.csrf)?);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = response.status();
        let header = response
            .headers()
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ClientError::from_response(status, &text));
        }

        csrf::extract_token(&text, header.as_deref())
            .ok_or_else(|| ClientError::Decode("CSRF token missing from response".into()))
    }
}

fn is_state_changing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE)
}

fn decode<T: DeserializeOwned>(text: &str) -> ClientResult<T> {
    if text.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(text)?)
}
