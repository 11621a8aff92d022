use crate::routes::Route;
use crate::session::Session;

/// Who is navigating, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    User,
    Admin,
}

impl Access {
    pub fn of(session: &Session) -> Self {
        match session.user() {
            Some(user) if session.is_authenticated() && user.is_admin() => Access::Admin,
            Some(_) if session.is_authenticated() => Access::User,
            _ => Access::Anonymous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

/// Decide whether `route` may be shown. Runs on every navigation and keeps
/// no state of its own.
pub fn authorize(access: Access, route: &Route) -> Decision {
    use Access::*;

    match (route, access) {
        (Route::Unknown(_), _) => Decision::Redirect(Route::Home),

        (Route::Landing | Route::Login | Route::Register, Anonymous) => Decision::Allow,
        (Route::Landing | Route::Login | Route::Register, User | Admin) => {
            Decision::Redirect(Route::Home)
        }

        (Route::Home | Route::Habits | Route::Diary | Route::Profile, Anonymous) => {
            Decision::Redirect(Route::Login)
        }
        (Route::Home | Route::Habits | Route::Diary | Route::Profile, User | Admin) => {
            Decision::Allow
        }

        (Route::Admin, Anonymous) => Decision::Redirect(Route::Login),
        (Route::Admin, User) => Decision::Redirect(Route::Home),
        (Route::Admin, Admin) => Decision::Allow,
    }
}

pub fn authorize_session(session: &Session, route: &Route) -> Decision {
    let decision = authorize(Access::of(session), route);
    if let Decision::Redirect(target) = &decision {
        tracing::debug!(from = %route, to = %target, "Route guard redirect");
    }
    decision
}
