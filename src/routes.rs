use std::fmt;

use parking_lot::Mutex;

/// Navigation targets of the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    Home,
    Habits,
    Diary,
    Profile,
    Admin,
    Unknown(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let normalized = trimmed.trim_end_matches('/');
        match normalized {
            "" => Route::Home,
            "/landing" => Route::Landing,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/habits" => Route::Habits,
            "/diary" => Route::Diary,
            "/profile" => Route::Profile,
            "/admin" => Route::Admin,
            _ => Route::Unknown(trimmed.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Landing => "/landing",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Home => "/",
            Route::Habits => "/habits",
            Route::Diary => "/diary",
            Route::Profile => "/profile",
            Route::Admin => "/admin",
            Route::Unknown(path) => path,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Landing | Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where forced navigation (session eviction) is sent.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Records every forced navigation so the front-end can act on it after the
/// request that triggered it has returned.
#[derive(Debug, Default)]
pub struct NavigationLog {
    history: Mutex<Vec<Route>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Route> {
        self.history.lock().clone()
    }

    /// Pending redirects, oldest first. Clears the log.
    pub fn drain(&self) -> Vec<Route> {
        std::mem::take(&mut *self.history.lock())
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, route: Route) {
        tracing::info!(route = %route, "Navigating");
        self.history.lock().push(route);
    }
}
