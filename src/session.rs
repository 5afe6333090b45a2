//! Session store.
//!
//! [`SessionStore`] is the one place that knows who is signed in and with
//! which role. It is a cheap cloneable handle: pass it to whatever needs the
//! current identity and [`subscribe`](SessionStore::subscribe) to be told about
//! auth-state changes. Every change goes through [`AuthState::Loading`] first,
//! then settles once both the session and the role are known.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    Error, Result,
    backend::Backend,
    types::{Role, Session, SignUp},
};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Session or role still being resolved.
    Loading,
    SignedOut,
    SignedIn { session: Session, role: Role },
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedIn { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            AuthState::SignedIn { role, .. } => Some(*role),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    state: Arc<watch::Sender<AuthState>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (tx, _rx) = watch::channel(AuthState::Loading);
        Self {
            backend,
            state: Arc::new(tx),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    /// The signed-in session, or [`Error::NotSignedIn`].
    pub fn require_session(&self) -> Result<Session> {
        self.session().ok_or(Error::NotSignedIn)
    }

    pub fn role(&self) -> Option<Role> {
        self.state.borrow().role()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.user_id.clone())
    }

    /// Resumes a cached session. An expired one is refreshed through the
    /// backend; a rejected refresh leaves the store signed out.
    ///
    /// # Errors
    ///
    /// Any other refresh failure (network, upstream outage) is returned and
    /// the store stays signed out for now; the cached session is still good
    /// and should be kept for the next attempt.
    pub async fn restore(&self, cached: Option<Session>) -> Result<AuthState> {
        self.set(AuthState::Loading);

        let Some(session) = cached else {
            self.set(AuthState::SignedOut);
            return Ok(self.current());
        };

        let session = if session.is_expired() {
            match self.backend.refresh_session(&session.refresh_token).await {
                Ok(fresh) => fresh,
                Err(Error::AuthExpired) => {
                    tracing::warn!(user_id = %session.user_id, "cached session rejected, signing out");
                    self.set(AuthState::SignedOut);
                    return Ok(self.current());
                }
                Err(e) => {
                    tracing::warn!(user_id = %session.user_id, "could not resume session: {}", e);
                    self.set(AuthState::SignedOut);
                    return Err(e);
                }
            }
        } else {
            session
        };

        Ok(self.settle(session).await)
    }

    pub async fn sign_up(&self, request: &SignUp) -> Result<AuthState> {
        self.set(AuthState::Loading);
        match self.backend.sign_up(request).await {
            Ok(session) => Ok(self.settle(session).await),
            Err(e) => {
                self.set(AuthState::SignedOut);
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState> {
        self.set(AuthState::Loading);
        match self.backend.sign_in(email, password).await {
            Ok(session) => Ok(self.settle(session).await),
            Err(e) => {
                self.set(AuthState::SignedOut);
                Err(e)
            }
        }
    }

    /// Signs out remotely (best effort) and locally.
    pub async fn sign_out(&self) {
        if let Some(session) = self.session() {
            if let Err(e) = self.backend.sign_out(&session).await {
                tracing::warn!("remote sign-out failed: {}", e);
            }
        }
        self.set(AuthState::Loading);
        self.set(AuthState::SignedOut);
    }

    /// Drops the local session without calling the backend, used when a
    /// credential was rejected upstream.
    pub fn expire(&self) {
        if self.session().is_some() {
            tracing::info!("session expired, signing out");
        }
        self.set(AuthState::Loading);
        self.set(AuthState::SignedOut);
    }

    /// Looks up the role for a fresh session and publishes the signed-in state.
    async fn settle(&self, session: Session) -> AuthState {
        let role = self.resolve_role(&session).await;
        self.set(AuthState::SignedIn { session, role });
        self.current()
    }

    async fn resolve_role(&self, session: &Session) -> Role {
        match self.backend.fetch_role(session).await {
            Ok(role) => role.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, "role lookup failed, assuming user: {}", e);
                Role::User
            }
        }
    }

    fn set(&self, state: AuthState) {
        self.state.send_replace(state);
    }
}
