use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// How credentials are encoded on the login request. Backend revisions
/// disagree, so this is deployment configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginEncoding {
    #[default]
    Json,
    Form,
}

impl LoginEncoding {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "form" | "form-urlencoded" | "urlencoded" => Self::Form,
            _ => Self::Json,
        }
    }
}

/// Backend paths. Treated as configuration: every one of them has moved at
/// least once between backend revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub cities: String,
    pub habits: String,
    pub habit: String,
    pub habit_log: String,
    pub users: String,
    pub admin_habits: String,
    pub fallback_habits: String,
    pub admin_diaries: String,
    pub audit_logs: String,
    pub profile: String,
    pub csrf: String,
    /// Diary endpoint. Unset means diary entries live in local storage.
    pub diary: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            register: "/register".into(),
            cities: "/api/cities".into(),
            habits: "/habits".into(),
            habit: "/habit".into(),
            habit_log: "/habit/log".into(),
            users: "/api/users".into(),
            admin_habits: "/api/admin/habits".into(),
            fallback_habits: "/api/habits".into(),
            admin_diaries: "/api/admin/diaries".into(),
            audit_logs: "/api/logs".into(),
            profile: "/update-profile".into(),
            csrf: "/api/csrf".into(),
            diary: None,
        }
    }
}

impl Endpoints {
    fn from_env() -> Self {
        let defaults = Self::default();
        let path = |key: &str, default: String| env::var(key).ok().filter(|s| !s.is_empty()).unwrap_or(default);

        Self {
            login: path("ENDPOINT_LOGIN", defaults.login),
            register: path("ENDPOINT_REGISTER", defaults.register),
            cities: path("ENDPOINT_CITIES", defaults.cities),
            habits: path("ENDPOINT_HABITS", defaults.habits),
            habit: path("ENDPOINT_HABIT", defaults.habit),
            habit_log: path("ENDPOINT_HABIT_LOG", defaults.habit_log),
            users: path("ENDPOINT_USERS", defaults.users),
            admin_habits: path("ENDPOINT_ADMIN_HABITS", defaults.admin_habits),
            fallback_habits: path("ENDPOINT_FALLBACK_HABITS", defaults.fallback_habits),
            admin_diaries: path("ENDPOINT_ADMIN_DIARIES", defaults.admin_diaries),
            audit_logs: path("ENDPOINT_AUDIT_LOGS", defaults.audit_logs),
            profile: path("ENDPOINT_PROFILE", defaults.profile),
            csrf: path("ENDPOINT_CSRF", defaults.csrf),
            diary: env::var("ENDPOINT_DIARY").ok().filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub timeout_secs: u64,

    pub csrf_enabled: bool,
    pub login_encoding: LoginEncoding,

    pub storage_path: PathBuf,
    pub json_logs: bool,

    pub endpoints: Endpoints,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: env::var("API_BASE").unwrap_or_else(|_| "http://localhost:8080".into()),
            timeout_secs: env::var("API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .unwrap_or(20),

            csrf_enabled: env::var("CSRF_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            login_encoding: LoginEncoding::parse(
                &env::var("LOGIN_ENCODING").unwrap_or_else(|_| "json".into()),
            ),

            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| ".dreamyfocus/storage.json".into())
                .into(),
            json_logs: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            endpoints: Endpoints::from_env(),
        }
    }

    /// Defaults pointed at `api_base`, without reading the environment.
    pub fn for_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            timeout_secs: 20,
            csrf_enabled: true,
            login_encoding: LoginEncoding::Json,
            storage_path: ".dreamyfocus/storage.json".into(),
            json_logs: false,
            endpoints: Endpoints::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_encoding_parse() {
        assert_eq!(LoginEncoding::parse("form"), LoginEncoding::Form);
        assert_eq!(LoginEncoding::parse(" URLENCODED "), LoginEncoding::Form);
        assert_eq!(LoginEncoding::parse("json"), LoginEncoding::Json);
        assert_eq!(LoginEncoding::parse("garbage"), LoginEncoding::Json);
    }

    #[test]
    fn test_for_base_defaults() {
        let config = Config::for_base("http://api.test");
        assert_eq!(config.api_base, "http://api.test");
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert!(config.csrf_enabled);
        assert_eq!(config.endpoints.login, "/login");
        assert!(config.endpoints.diary.is_none());
    }
}
