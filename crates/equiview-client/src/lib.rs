//! Equiview Client - HTTP, filesystem and wiring adapters
//!
//! Implements the core ports over real I/O and assembles a ready-to-use
//! [`Workspace`] from a [`WorkspaceConfig`].

pub mod http;
pub mod report_sink;
pub mod token_store;

pub use http::HttpBackend;
pub use report_sink::DirectoryReportSink;
pub use token_store::FileTokenStore;

use std::sync::Arc;

use equiview_core::config::WorkspaceConfig;
use equiview_core::error::Result;
use equiview_core::ports::{Backend, Navigator};
use equiview_core::workspace::{AutoRefresh, AUTO_REFRESH_PERIOD};
use equiview_core::{Authenticator, SessionContext, UploadOrchestrator, WorkspaceCoordinator};

/// All workspace components sharing one backend and one session
pub struct Workspace {
    pub session: SessionContext,
    pub auth: Authenticator,
    pub coordinator: WorkspaceCoordinator,
    pub uploads: UploadOrchestrator,
}

impl Workspace {
    /// Assemble components over an arbitrary backend
    pub fn assemble(
        backend: Arc<dyn Backend>,
        session: SessionContext,
        config: &WorkspaceConfig,
    ) -> Self {
        let reports = Arc::new(DirectoryReportSink::new(config.download_dir.value.clone()));
        let coordinator = WorkspaceCoordinator::new(backend.clone(), session.clone(), reports);
        let uploads = UploadOrchestrator::new(backend.clone(), session.clone(), coordinator.clone());
        let auth = Authenticator::new(backend, session.clone());

        Self {
            session,
            auth,
            coordinator,
            uploads,
        }
    }

    /// Resume a saved session and load the workspace if there is one
    ///
    /// Returns whether the user is signed in.
    pub async fn start(&self) -> Result<bool> {
        if !self.auth.restore()? {
            return Ok(false);
        }
        self.coordinator.initialize().await?;
        Ok(self.session.is_authenticated())
    }

    /// Keep the workspace fresh while the returned handle is alive
    pub fn auto_refresh(&self) -> AutoRefresh {
        self.coordinator.spawn_auto_refresh(AUTO_REFRESH_PERIOD)
    }
}

/// Build a workspace talking to the configured API
pub fn connect(config: &WorkspaceConfig, navigator: Arc<dyn Navigator>) -> Result<Workspace> {
    let backend = Arc::new(HttpBackend::from_config(config)?);
    let store = Arc::new(FileTokenStore::new(config.token_path.value.clone()));
    let session = SessionContext::new(store, navigator);

    tracing::info!(
        api = %config.api_base_url.value,
        downloads = %config.download_dir.value.display(),
        "Workspace client configured"
    );
    Ok(Workspace::assemble(backend, session, config))
}
