//! Role-gated routing.
//!
//! The [`Router`] decides which page a path renders for the current auth
//! state. It starts in [`GateState::Loading`], moves to one of the resolved
//! states once session and role are known, and drops back to `Loading` on
//! every auth-state change until the new state has settled.
//!
//! | state           | routes                                                  |
//! |-----------------|---------------------------------------------------------|
//! | Loading         | everything renders the loading view                     |
//! | Unauthenticated | `/login`, `/signup`, `/` (signup)                       |
//! | User            | `/dashboard`, `/library`, `/playlists`, `/profile`      |
//! | Admin           | `/admin-dashboard`, `/admin`, `/profile`                |
//!
//! Unmatched paths render [`Route::NotFound`].

use std::future::Future;

use tokio::task::{AbortHandle, JoinHandle};

use crate::{session::AuthState, types::Role, utils::normalize_path};

pub const LOGIN_PATH: &str = "/login";
pub const SIGNUP_PATH: &str = "/signup";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_DASHBOARD_PATH: &str = "/admin-dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    Dashboard,
    Library,
    Playlists,
    Profile,
    AdminDashboard,
    Admin,
    NotFound,
}

impl Route {
    const KNOWN: [Route; 8] = [
        Route::Login,
        Route::Signup,
        Route::Dashboard,
        Route::Library,
        Route::Playlists,
        Route::Profile,
        Route::AdminDashboard,
        Route::Admin,
    ];

    pub fn path(self) -> Option<&'static str> {
        match self {
            Route::Login => Some(LOGIN_PATH),
            Route::Signup => Some(SIGNUP_PATH),
            Route::Dashboard => Some(DASHBOARD_PATH),
            Route::Library => Some("/library"),
            Route::Playlists => Some("/playlists"),
            Route::Profile => Some("/profile"),
            Route::AdminDashboard => Some(ADMIN_DASHBOARD_PATH),
            Route::Admin => Some("/admin"),
            Route::NotFound => None,
        }
    }

    /// Looks up a normalized path among the known pages.
    pub fn from_path(path: &str) -> Option<Route> {
        Route::KNOWN
            .into_iter()
            .find(|route| route.path() == Some(path))
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Signup => "Sign up",
            Route::Dashboard => "Dashboard",
            Route::Library => "Library",
            Route::Playlists => "Playlists",
            Route::Profile => "Profile",
            Route::AdminDashboard => "Admin dashboard",
            Route::Admin => "Admin",
            Route::NotFound => "Not found",
        }
    }
}

/// What a path renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Page(Route),
    Redirect(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Loading,
    Unauthenticated,
    User,
    Admin,
}

impl From<&AuthState> for GateState {
    fn from(state: &AuthState) -> Self {
        match state {
            AuthState::Loading => GateState::Loading,
            AuthState::SignedOut => GateState::Unauthenticated,
            AuthState::SignedIn {
                role: Role::User, ..
            } => GateState::User,
            AuthState::SignedIn {
                role: Role::Admin, ..
            } => GateState::Admin,
        }
    }
}

/// Where a user lands after login or signup.
pub fn landing_path(role: Role) -> &'static str {
    match role {
        Role::User => DASHBOARD_PATH,
        Role::Admin => ADMIN_DASHBOARD_PATH,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

/// Navigation entries for a role, limited to the pages that role can open.
pub fn nav_items(role: Role) -> Vec<NavItem> {
    let mut items = vec![
        NavItem {
            label: "Home",
            path: "/",
        },
        NavItem {
            label: "Library",
            path: "/library",
        },
        NavItem {
            label: "Playlists",
            path: "/playlists",
        },
        NavItem {
            label: "Profile",
            path: "/profile",
        },
    ];
    if role == Role::Admin {
        items.push(NavItem {
            label: "Admin",
            path: "/admin",
        });
    }

    let gate = match role {
        Role::User => GateState::User,
        Role::Admin => GateState::Admin,
    };
    items.retain(|item| resolve_for(gate, item.path) != View::Page(Route::NotFound));
    items
}

#[derive(Debug, Clone)]
pub struct Router {
    state: GateState,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            state: GateState::Loading,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Any auth-state change: wait for the new state to settle.
    pub fn on_auth_event(&mut self) -> GateState {
        self.state = GateState::Loading;
        self.state
    }

    pub fn apply(&mut self, auth: &AuthState) -> GateState {
        let next = GateState::from(auth);
        if next != self.state {
            tracing::debug!(from = ?self.state, to = ?next, "route gate changed");
        }
        self.state = next;
        self.state
    }

    pub fn resolve(&self, path: &str) -> View {
        resolve_for(self.state, path)
    }

    /// Landing path of the signed-in role, if any.
    pub fn landing(&self) -> Option<&'static str> {
        match self.state {
            GateState::User => Some(landing_path(Role::User)),
            GateState::Admin => Some(landing_path(Role::Admin)),
            GateState::Loading | GateState::Unauthenticated => None,
        }
    }
}

fn resolve_for(state: GateState, path: &str) -> View {
    let path = normalize_path(path);
    let route = Route::from_path(&path);

    match state {
        GateState::Loading => View::Loading,
        GateState::Unauthenticated => match route {
            Some(Route::Login) => View::Page(Route::Login),
            Some(Route::Signup) => View::Page(Route::Signup),
            _ if path == "/" => View::Page(Route::Signup),
            Some(_) => View::Redirect(LOGIN_PATH),
            None => View::Page(Route::NotFound),
        },
        GateState::User => match route {
            _ if path == "/" => View::Redirect(DASHBOARD_PATH),
            Some(Route::Login | Route::Signup) => View::Redirect(DASHBOARD_PATH),
            Some(r @ (Route::Dashboard | Route::Library | Route::Playlists | Route::Profile)) => {
                View::Page(r)
            }
            _ => View::Page(Route::NotFound),
        },
        GateState::Admin => match route {
            _ if path == "/" => View::Redirect(ADMIN_DASHBOARD_PATH),
            Some(Route::Login | Route::Signup) => View::Redirect(ADMIN_DASHBOARD_PATH),
            Some(r @ (Route::AdminDashboard | Route::Admin | Route::Profile)) => View::Page(r),
            _ => View::Page(Route::NotFound),
        },
    }
}

/// Ties background requests to the view that started them: whatever is
/// still running when the scope is dropped gets aborted.
#[derive(Debug, Default)]
pub struct ViewScope {
    tasks: Vec<AbortHandle>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(future);
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(handle.abort_handle());
        handle
    }

    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
