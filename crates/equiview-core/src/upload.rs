//! CSV upload lifecycle
//!
//! One [`UploadSession`] describes the current attempt: the selected file,
//! its outcome, and the message shown next to the upload form. A successful
//! upload hands its dataset id to the [`WorkspaceCoordinator`] exactly the
//! way a history row click does.

pub mod file;
pub mod progress;

pub use file::{format_file_size, validate_file, UploadFile, INVALID_FILE_MESSAGE, MAX_UPLOAD_BYTES};
pub use progress::{AnimationPhase, ProgressAnimation, ProgressState, FAILURE_RESET_DELAY};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::error::{Result, WorkspaceError};
use crate::models::DatasetId;
use crate::notice::Notice;
use crate::ports::Backend;
use crate::session::SessionContext;
use crate::workspace::WorkspaceCoordinator;

pub const NO_FILE_MESSAGE: &str = "Please select a file first.";
pub const UPLOAD_IN_PROGRESS_MESSAGE: &str = "An upload is already in progress.";
pub const UPLOAD_SUCCEEDED_MESSAGE: &str = "Upload successful! Processing data...";

/// Outcome of the current upload attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadStatus {
    #[default]
    Idle,
    InProgress,
    Succeeded(DatasetId),
    Failed(String),
}

/// Snapshot of the current upload attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSession {
    pub file: Option<Arc<UploadFile>>,
    pub status: UploadStatus,
    pub message: Option<Notice>,
}

impl UploadSession {
    pub fn is_in_progress(&self) -> bool {
        self.status == UploadStatus::InProgress
    }

    /// Label for the submit button
    pub fn submit_label(&self) -> &'static str {
        if self.is_in_progress() {
            "Uploading..."
        } else {
            "Upload & Analyze"
        }
    }
}

/// Discards an attempt whose future was dropped before the transfer ended
struct AttemptGuard<'a> {
    orchestrator: &'a UploadOrchestrator,
    armed: bool,
}

impl AttemptGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::debug!("Upload abandoned before completing");
        *self.orchestrator.lock() = UploadSession::default();
        self.orchestrator.animation.cancel();
    }
}

/// Drives file selection, submission and the post-upload animation
pub struct UploadOrchestrator {
    backend: Arc<dyn Backend>,
    session: SessionContext,
    coordinator: WorkspaceCoordinator,
    state: Mutex<UploadSession>,
    animation: ProgressAnimation,
}

impl UploadOrchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: SessionContext,
        coordinator: WorkspaceCoordinator,
    ) -> Self {
        Self {
            backend,
            session,
            coordinator,
            state: Mutex::new(UploadSession::default()),
            animation: ProgressAnimation::new(),
        }
    }

    /// Replace the progress animation, e.g. with a seeded one
    pub fn with_animation(mut self, animation: ProgressAnimation) -> Self {
        self.animation = animation;
        self
    }

    /// Offer a file picked by the user
    ///
    /// Rejected while an upload is running, leaving the session untouched.
    /// An invalid file clears the previous selection; a valid one starts a
    /// fresh session.
    pub fn select_file(&self, candidate: UploadFile) -> Result<()> {
        let mut session = self.lock();
        if session.is_in_progress() {
            return Err(WorkspaceError::Precondition(UPLOAD_IN_PROGRESS_MESSAGE.to_string()));
        }

        match validate_file(&candidate) {
            Ok(()) => {
                tracing::debug!(file = candidate.name(), size = candidate.size(), "File selected");
                *session = UploadSession {
                    file: Some(Arc::new(candidate)),
                    ..UploadSession::default()
                };
                drop(session);
                self.animation.cancel();
                Ok(())
            }
            Err(e) => {
                tracing::debug!(file = candidate.name(), "File rejected");
                *session = UploadSession {
                    message: Some(Notice::error(INVALID_FILE_MESSAGE)),
                    ..UploadSession::default()
                };
                Err(e)
            }
        }
    }

    /// Files dropped onto the upload area; only the first one is considered
    pub fn drop_files(&self, files: Vec<UploadFile>) -> Result<()> {
        match files.into_iter().next() {
            Some(file) => self.select_file(file),
            None => Ok(()),
        }
    }

    /// Send the selected file and switch the workspace to the new dataset
    ///
    /// Dropping the future before the transfer ends discards the attempt.
    pub async fn submit(&self) -> Result<DatasetId> {
        let file = {
            let mut session = self.lock();
            if session.is_in_progress() {
                return Err(WorkspaceError::Precondition(UPLOAD_IN_PROGRESS_MESSAGE.to_string()));
            }
            let Some(file) = session.file.clone() else {
                session.message = Some(Notice::error(NO_FILE_MESSAGE));
                return Err(WorkspaceError::Precondition(NO_FILE_MESSAGE.to_string()));
            };
            session.status = UploadStatus::InProgress;
            session.message = None;
            file
        };
        let attempt = AttemptGuard {
            orchestrator: self,
            armed: true,
        };
        self.animation.cancel();

        tracing::info!(file = file.name(), size = file.size(), "Uploading dataset");
        let result = self.backend.upload_csv(&self.session, &file).await;
        attempt.disarm();
        let result = self.session.guard(result);

        match result {
            Ok(receipt) => {
                let dataset = receipt.dataset_id;
                tracing::info!(dataset = %dataset, "Upload accepted");
                {
                    let mut session = self.lock();
                    session.file = None;
                    session.status = UploadStatus::Succeeded(dataset.clone());
                    session.message = Some(Notice::success(UPLOAD_SUCCEEDED_MESSAGE));
                }

                let refresh = self.coordinator.select_dataset(dataset.clone());
                self.animation.start();
                if let Err(e) = refresh.await {
                    tracing::warn!(dataset = %dataset, "Refresh after upload failed: {}", e);
                }
                Ok(dataset)
            }
            Err(e) if e.is_auth_expired() => {
                *self.lock() = UploadSession::default();
                self.animation.cancel();
                Err(e)
            }
            Err(e) => {
                let text = format!("Upload failed: {}", e.server_message().unwrap_or("Unknown error"));
                tracing::warn!(file = file.name(), "Upload failed: {}", e);
                {
                    let mut session = self.lock();
                    session.status = UploadStatus::Failed(text.clone());
                    session.message = Some(Notice::error(text));
                }
                self.animation.reset_after(FAILURE_RESET_DELAY);
                Err(e)
            }
        }
    }

    pub fn dismiss_message(&self) {
        self.lock().message = None;
    }

    pub fn snapshot(&self) -> UploadSession {
        self.lock().clone()
    }

    pub fn progress(&self) -> ProgressState {
        self.animation.current()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressState> {
        self.animation.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, UploadSession> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Credentials, EquipmentRecord, HistoryEntry, LoginResponse, SummaryStatistics,
        UploadReceipt,
    };
    use crate::ports::{ReportSink, SavedReport};
    use crate::session::{MemoryTokenStore, RecordingNavigator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend whose upload answers with a fixed result
    struct UploadOnly {
        reply: Mutex<Option<Result<UploadReceipt>>>,
        uploads: AtomicUsize,
    }

    impl UploadOnly {
        fn replying(reply: Result<UploadReceipt>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                uploads: AtomicUsize::new(0),
            })
        }

        /// Upload that never answers
        fn stalling() -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(None),
                uploads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Backend for UploadOnly {
        async fn login(&self, _: &Credentials) -> Result<LoginResponse> {
            unimplemented!()
        }

        async fn logout(&self, _: &SessionContext) -> Result<()> {
            Ok(())
        }

        async fn upload_csv(&self, _: &SessionContext, _: &UploadFile) -> Result<UploadReceipt> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            let reply = self.reply.lock().unwrap().take();
            match reply {
                Some(reply) => reply,
                None => std::future::pending().await,
            }
        }

        async fn equipment(
            &self,
            _: &SessionContext,
            _: Option<&DatasetId>,
        ) -> Result<Vec<EquipmentRecord>> {
            Ok(Vec::new())
        }

        async fn summary(
            &self,
            _: &SessionContext,
            _: Option<&DatasetId>,
        ) -> Result<SummaryStatistics> {
            Ok(SummaryStatistics::empty())
        }

        async fn history(&self, _: &SessionContext) -> Result<Vec<HistoryEntry>> {
            Ok(Vec::new())
        }

        async fn report_pdf(&self, _: &SessionContext, _: Option<&DatasetId>) -> Result<Vec<u8>> {
            unimplemented!()
        }
    }

    struct NoReports;

    #[async_trait]
    impl ReportSink for NoReports {
        async fn save(&self, _: &str, _: &[u8]) -> Result<SavedReport> {
            unimplemented!()
        }
    }

    fn orchestrator(backend: Arc<UploadOnly>) -> (UploadOrchestrator, WorkspaceCoordinator) {
        let session = SessionContext::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingNavigator::new()),
        );
        let coordinator = WorkspaceCoordinator::new(backend.clone(), session.clone(), Arc::new(NoReports));
        let uploads = UploadOrchestrator::new(backend, session, coordinator.clone())
            .with_animation(ProgressAnimation::with_seed(5));
        (uploads, coordinator)
    }

    fn receipt(id: u64) -> UploadReceipt {
        UploadReceipt {
            dataset_id: DatasetId::from(id),
            message: None,
        }
    }

    fn csv() -> UploadFile {
        UploadFile::from_bytes("equipment.csv", b"Equipment Name,Type\nP-1,Pump\n".to_vec())
    }

    #[test]
    fn test_invalid_file_clears_selection() {
        let (uploads, _) = orchestrator(UploadOnly::replying(Ok(receipt(1))));
        uploads.select_file(csv()).unwrap();

        let err = uploads.select_file(UploadFile::from_bytes("notes.txt", vec![1])).unwrap_err();

        assert!(matches!(err, WorkspaceError::Validation(_)));
        let session = uploads.snapshot();
        assert!(session.file.is_none());
        assert_eq!(session.message, Some(Notice::error(INVALID_FILE_MESSAGE)));
    }

    #[test]
    fn test_valid_file_clears_message() {
        let (uploads, _) = orchestrator(UploadOnly::replying(Ok(receipt(1))));
        let _ = uploads.select_file(UploadFile::from_bytes("notes.txt", vec![1]));

        uploads.drop_files(vec![csv(), UploadFile::from_bytes("second.txt", vec![])]).unwrap();

        let session = uploads.snapshot();
        assert_eq!(session.file.as_deref().map(UploadFile::name), Some("equipment.csv"));
        assert!(session.message.is_none());
    }

    #[tokio::test]
    async fn test_submit_without_file_is_local() {
        let backend = UploadOnly::replying(Ok(receipt(1)));
        let (uploads, _) = orchestrator(backend.clone());

        let err = uploads.submit().await.unwrap_err();

        assert!(matches!(err, WorkspaceError::Precondition(_)));
        assert_eq!(uploads.snapshot().message, Some(Notice::error(NO_FILE_MESSAGE)));
        assert_eq!(backend.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_selects_dataset_and_animates() {
        let backend = UploadOnly::replying(Ok(receipt(42)));
        let (uploads, coordinator) = orchestrator(backend);
        uploads.select_file(csv()).unwrap();

        let dataset = uploads.submit().await.unwrap();

        assert_eq!(dataset.as_str(), "42");
        assert_eq!(coordinator.snapshot().active_dataset, Some(DatasetId::from(42)));
        let session = uploads.snapshot();
        assert_eq!(session.status, UploadStatus::Succeeded(DatasetId::from(42)));
        assert_eq!(session.message, Some(Notice::success(UPLOAD_SUCCEEDED_MESSAGE)));
        assert!(session.file.is_none());
        assert_eq!(uploads.progress().phase, AnimationPhase::Animating);

        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        assert_eq!(uploads.progress().phase, AnimationPhase::Settled);
        assert_eq!(uploads.progress().percent, 90.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_uses_server_text_and_resets() {
        let backend = UploadOnly::replying(Err(WorkspaceError::Server {
            endpoint: "/upload/".into(),
            status: 400,
            message: Some("Missing required columns".into()),
        }));
        let (uploads, _) = orchestrator(backend);
        uploads.select_file(csv()).unwrap();

        assert!(uploads.submit().await.is_err());

        let session = uploads.snapshot();
        assert_eq!(
            session.message,
            Some(Notice::error("Upload failed: Missing required columns"))
        );
        // The file stays selected so the user can retry
        assert!(session.file.is_some());

        tokio::time::sleep(FAILURE_RESET_DELAY + std::time::Duration::from_millis(10)).await;
        assert_eq!(uploads.progress().percent, 0.0);
        assert_eq!(uploads.progress().phase, AnimationPhase::Idle);
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_unknown_error() {
        let backend = UploadOnly::replying(Err(WorkspaceError::Network {
            endpoint: "/upload/".into(),
            reason: "connection refused".into(),
        }));
        let (uploads, _) = orchestrator(backend);
        uploads.select_file(csv()).unwrap();

        assert!(uploads.submit().await.is_err());
        assert_eq!(uploads.snapshot().message, Some(Notice::error("Upload failed: Unknown error")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_discards_attempt() {
        let backend = UploadOnly::stalling();
        let (uploads, _) = orchestrator(backend.clone());
        uploads.select_file(csv()).unwrap();

        let attempt = tokio::time::timeout(std::time::Duration::from_millis(50), uploads.submit()).await;
        assert!(attempt.is_err());

        let session = uploads.snapshot();
        assert_eq!(session.status, UploadStatus::Idle);
        assert!(session.file.is_none());
        assert_eq!(uploads.progress().phase, AnimationPhase::Idle);

        // A new attempt is accepted
        uploads.select_file(csv()).unwrap();
        assert_eq!(uploads.snapshot().submit_label(), "Upload & Analyze");
        assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_submit_label() {
        let mut session = UploadSession::default();
        assert_eq!(session.submit_label(), "Upload & Analyze");
        session.status = UploadStatus::InProgress;
        assert_eq!(session.submit_label(), "Uploading...");
    }
}
