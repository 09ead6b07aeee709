use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::Session;

/// Top-level views the host application can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Workspace,
}

/// Port for switching between the login view and the workspace
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Port for persisted session storage
pub trait TokenStore: Send + Sync {
    /// Load a previously saved session, if any
    fn load(&self) -> Result<Option<Session>>;

    /// Persist the session, replacing whatever was stored
    fn save(&self, session: &Session) -> Result<()>;

    /// Remove the stored session
    fn clear(&self) -> Result<()>;
}

/// Where a saved report ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub filename: String,
    pub location: Option<PathBuf>,
    pub size: usize,
}

/// Port for the client-side "save as" of a downloaded report
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save(&self, filename: &str, contents: &[u8]) -> Result<SavedReport>;
}
