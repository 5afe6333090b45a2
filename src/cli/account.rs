use crate::{
    Result,
    app::App,
    info,
    router::{landing_path, nav_items},
    session::AuthState,
    success,
    types::{Role, SignUp},
    warning,
};

pub async fn signup(
    app: &App,
    email: String,
    password: String,
    username: String,
    role: Role,
) -> Result<()> {
    let request = SignUp {
        email,
        password,
        username,
        role,
    };

    let pb = super::spinner("Creating account...");
    let result = app.session.sign_up(&request).await;
    pb.finish_and_clear();

    let state = result?;
    app.persist_session().await?;
    announce(&state);
    Ok(())
}

pub async fn login(app: &App, email: &str, password: &str) -> Result<()> {
    let pb = super::spinner("Signing in...");
    let result = app.session.sign_in(email, password).await;
    pb.finish_and_clear();

    let state = result?;
    app.persist_session().await?;
    app.likes.load().await?;
    announce(&state);
    Ok(())
}

pub async fn logout(app: &App) -> Result<()> {
    if app.session.session().is_none() {
        warning!("Not signed in.");
        return Ok(());
    }

    app.session.sign_out().await;
    app.persist_session().await?;
    success!("Signed out.");
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    let AuthState::SignedIn { session, role } = app.session.current() else {
        info!("Not signed in. Run `vibestream login` or `vibestream signup`.");
        return Ok(());
    };

    let username = app
        .backend()
        .profile(&session)
        .await?
        .map(|p| p.username)
        .unwrap_or_else(|| session.email.clone());

    info!("{} <{}> ({})", username, session.email, role);
    let nav = nav_items(role)
        .into_iter()
        .map(|item| format!("{} {}", item.label, item.path))
        .collect::<Vec<_>>()
        .join(" | ");
    info!("Navigation: {}", nav);
    Ok(())
}

fn announce(state: &AuthState) {
    if let AuthState::SignedIn { session, role } = state {
        success!("Signed in as {} ({})", session.email, role);
        info!("Landing page: {}", landing_path(*role));
    }
}
