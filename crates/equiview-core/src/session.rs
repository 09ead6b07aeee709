//! Session context shared by every collaborator call
//!
//! The session token is the only globally shared mutable resource in the
//! workspace. All reads go through [`SessionContext::token`] and all writes
//! through [`SessionContext::set_session`] / [`SessionContext::clear_session`],
//! so there is no ambient storage access anywhere else. Any component that
//! sees an authentication rejection calls [`SessionContext::expire`], which
//! clears the session and routes the host back to the login view.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

use crate::error::Result;
use crate::models::Session;
use crate::ports::{Navigator, Route, TokenStore};

/// Authentication state broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn { user: String },
}

struct SessionInner {
    current: RwLock<Option<Session>>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: watch::Sender<AuthState>,
}

/// Cheaply cloneable handle to the current session
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// Create a signed-out context backed by the given store and navigator
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            inner: Arc::new(SessionInner {
                current: RwLock::new(None),
                store,
                navigator,
                state,
            }),
        }
    }

    /// Load a persisted session, returning whether one was found
    pub fn restore(&self) -> Result<bool> {
        match self.inner.store.load()? {
            Some(session) => {
                tracing::info!(user = %session.user, "Restored persisted session");
                self.replace(Some(session));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Install a freshly issued session and persist it
    pub fn set_session(&self, session: Session) -> Result<()> {
        self.inner.store.save(&session)?;
        self.replace(Some(session));
        Ok(())
    }

    /// Drop the session locally and from persistent storage
    ///
    /// The in-memory session is cleared even when the store fails.
    pub fn clear_session(&self) -> Result<()> {
        self.replace(None);
        self.inner.store.clear()
    }

    /// Clear the session and send the host to the login view
    pub fn expire(&self) {
        tracing::warn!("Authentication rejected, clearing session");
        if let Err(e) = self.clear_session() {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
        self.inner.navigator.navigate(Route::Login);
    }

    /// Pass a collaborator result through, expiring the session on a 401
    pub fn guard<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_auth_expired() {
                self.expire();
            }
        }
        result
    }

    pub fn navigate(&self, route: Route) {
        self.inner.navigator.navigate(route);
    }

    /// Bearer token for outgoing requests
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Watch authentication state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, session: Option<Session>) {
        let state = match &session {
            Some(s) => AuthState::SignedIn { user: s.user.clone() },
            None => AuthState::SignedOut,
        };
        *self.inner.current.write().unwrap_or_else(PoisonError::into_inner) = session;
        self.inner.state.send_replace(state);
    }
}

/// In-memory token store, for hosts without persistent storage and for tests
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    session: RwLock<Option<Session>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Navigator that records every route change, for headless hosts and tests
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: RwLock<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(?route, "Navigating");
        self.routes.write().unwrap_or_else(PoisonError::into_inner).push(route);
    }
}
