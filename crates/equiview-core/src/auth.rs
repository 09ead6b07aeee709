//! Sign-in flow

use std::sync::Arc;

use crate::error::{Result, WorkspaceError};
use crate::models::{Credentials, Session};
use crate::ports::{Backend, Route};
use crate::session::SessionContext;

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Please enter both username and password";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";

/// Exchanges credentials for a session and routes into the workspace
pub struct Authenticator {
    backend: Arc<dyn Backend>,
    session: SessionContext,
}

impl Authenticator {
    pub fn new(backend: Arc<dyn Backend>, session: SessionContext) -> Self {
        Self { backend, session }
    }

    /// Sign in and persist the issued token
    ///
    /// Empty fields are rejected without a request.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(WorkspaceError::Validation(MISSING_CREDENTIALS_MESSAGE.to_string()));
        }

        let response = self.backend.login(credentials).await?;
        tracing::info!(user = %response.user, "Signed in");
        self.session.set_session(Session::from(response))?;
        self.session.navigate(Route::Workspace);
        Ok(())
    }

    /// Resume a persisted session, routing to whichever view applies
    pub fn restore(&self) -> Result<bool> {
        let restored = self.session.restore()?;
        self.session.navigate(if restored { Route::Workspace } else { Route::Login });
        Ok(restored)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

/// Text to show for a failed sign-in
pub fn login_failure_text(error: &WorkspaceError) -> String {
    match error {
        WorkspaceError::Validation(message) => message.clone(),
        other => other.server_message().unwrap_or(LOGIN_FAILED_MESSAGE).to_string(),
    }
}
