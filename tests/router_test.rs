use std::time::Duration;

use vibestream::{
    router::{GateState, Route, Router, View, ViewScope, landing_path},
    session::AuthState,
    types::{Role, Session},
};

fn signed_in(role: Role) -> AuthState {
    AuthState::SignedIn {
        session: Session {
            user_id: "u-1".into(),
            email: "listener@vibestream.app".into(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: i64::MAX,
        },
        role,
    }
}

fn router_for(state: &AuthState) -> Router {
    let mut router = Router::new();
    router.apply(state);
    router
}

#[test]
fn test_loading_renders_loading_everywhere() {
    let router = Router::new();
    assert_eq!(router.state(), GateState::Loading);
    for path in ["/", "/login", "/dashboard", "/admin", "/nope"] {
        assert_eq!(router.resolve(path), View::Loading);
    }
    assert_eq!(router.landing(), None);
}

#[test]
fn test_unauthenticated_routes() {
    let router = router_for(&AuthState::SignedOut);
    assert_eq!(router.state(), GateState::Unauthenticated);

    assert_eq!(router.resolve("/login"), View::Page(Route::Login));
    assert_eq!(router.resolve("/signup"), View::Page(Route::Signup));
    assert_eq!(router.resolve("/"), View::Page(Route::Signup));
    assert_eq!(router.resolve("/unknown"), View::Page(Route::NotFound));
}

#[test]
fn test_unauthenticated_redirected_from_protected_pages() {
    let router = router_for(&AuthState::SignedOut);
    for path in [
        "/dashboard",
        "/library",
        "/playlists",
        "/profile",
        "/admin",
        "/admin-dashboard/",
    ] {
        assert_eq!(router.resolve(path), View::Redirect("/login"), "{path}");
    }
}

#[test]
fn test_user_routes() {
    let router = router_for(&signed_in(Role::User));
    assert_eq!(router.state(), GateState::User);

    assert_eq!(router.resolve("/"), View::Redirect("/dashboard"));
    assert_eq!(router.resolve("/dashboard"), View::Page(Route::Dashboard));
    assert_eq!(router.resolve("/library"), View::Page(Route::Library));
    assert_eq!(router.resolve("/playlists?sort=name"), View::Page(Route::Playlists));
    assert_eq!(router.resolve("/profile"), View::Page(Route::Profile));
    assert_eq!(router.resolve("/login"), View::Redirect("/dashboard"));

    // admin pages are not part of the user route set
    assert_eq!(router.resolve("/admin"), View::Page(Route::NotFound));
    assert_eq!(router.resolve("/admin-dashboard"), View::Page(Route::NotFound));
}

#[test]
fn test_admin_routes() {
    let router = router_for(&signed_in(Role::Admin));
    assert_eq!(router.state(), GateState::Admin);

    assert_eq!(router.resolve("/"), View::Redirect("/admin-dashboard"));
    assert_eq!(
        router.resolve("/admin-dashboard"),
        View::Page(Route::AdminDashboard)
    );
    assert_eq!(router.resolve("/admin"), View::Page(Route::Admin));
    assert_eq!(router.resolve("/profile"), View::Page(Route::Profile));
    assert_eq!(router.resolve("/signup"), View::Redirect("/admin-dashboard"));
    assert_eq!(router.resolve("/library"), View::Page(Route::NotFound));
    assert_eq!(router.resolve("/dashboard"), View::Page(Route::NotFound));
}

#[test]
fn test_landing_depends_on_role() {
    assert_eq!(landing_path(Role::User), "/dashboard");
    assert_eq!(landing_path(Role::Admin), "/admin-dashboard");
    assert_eq!(
        router_for(&signed_in(Role::Admin)).landing(),
        Some("/admin-dashboard")
    );
}

#[test]
fn test_auth_event_reenters_loading() {
    let mut router = router_for(&signed_in(Role::User));
    assert_eq!(router.on_auth_event(), GateState::Loading);
    assert_eq!(router.resolve("/dashboard"), View::Loading);

    assert_eq!(router.apply(&AuthState::SignedOut), GateState::Unauthenticated);
    assert_eq!(router.resolve("/dashboard"), View::Redirect("/login"));
}

#[tokio::test]
async fn test_dropping_view_scope_aborts_tasks() {
    let mut scope = ViewScope::new();
    let pending = scope.spawn(async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        "finished"
    });
    assert_eq!(scope.active(), 1);

    drop(scope);
    let err = pending.await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_view_scope_lets_finished_tasks_complete() {
    let mut scope = ViewScope::new();
    let quick = scope.spawn(async { 7 });
    assert_eq!(quick.await.unwrap(), 7);
    assert_eq!(scope.active(), 0);
}
