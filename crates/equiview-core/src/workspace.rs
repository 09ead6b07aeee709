//! Dataset selection coordinator
//!
//! Owns "which dataset is active" and the data shown for it. Every load
//! fetches summary, equipment and history together and commits them in one
//! state transition, so the table and the charts always describe the same
//! dataset.
//!
//! Loads are tagged with a ticket taken when the load is requested. Only the
//! newest unsettled load may commit; anything older is discarded when it
//! resolves. A load whose future is dropped before it settles withdraws its
//! ticket, handing the workspace back to the load it replaced.

mod refresh;

pub use refresh::{AutoRefresh, AUTO_REFRESH_PERIOD};

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, WorkspaceError};
use crate::history::HistoryRegistry;
use crate::models::{DatasetId, EquipmentRecord, HistoryEntry, SummaryStatistics};
use crate::notice::Notice;
use crate::ports::{Backend, ReportSink, Route, SavedReport};
use crate::projection::{project, SummaryProjection};
use crate::session::SessionContext;
use crate::table::EquipmentStore;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data. Please try again.";
pub const REFRESH_FAILED_MESSAGE: &str = "Failed to refresh data after upload.";
pub const NO_REPORT_DATA_MESSAGE: &str = "No data available to generate report.";
pub const REPORT_SAVED_MESSAGE: &str = "PDF report downloaded successfully!";
pub const REPORT_FAILED_MESSAGE: &str = "Failed to download PDF report.";
pub const LOGOUT_FAILED_MESSAGE: &str = "Failed to logout. Please try again.";

/// Everything the workspace view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    /// Dataset the displayed data belongs to; `None` means the server's latest
    pub active_dataset: Option<DatasetId>,
    /// Dataset of the load currently in flight, if it targets one
    pub pending_dataset: Option<DatasetId>,
    pub summary: Option<SummaryStatistics>,
    pub equipment: EquipmentStore,
    pub history: HistoryRegistry,
    pub loading: bool,
    pub notice: Option<Notice>,
}

impl WorkspaceState {
    pub fn status_line(&self) -> String {
        if self.loading {
            "Processing data...".to_string()
        } else {
            format!("Ready • {} items loaded", self.equipment.len())
        }
    }

    pub fn dataset_label(&self) -> String {
        match &self.active_dataset {
            Some(id) => format!("Dataset {} selected", id),
            None => "Latest dataset".to_string(),
        }
    }

    pub fn projection(&self) -> Option<SummaryProjection> {
        project(self.summary.as_ref())
    }

    /// A report needs a loaded, non-empty summary
    pub fn can_request_report(&self) -> bool {
        self.summary.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// How a load ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched data is now displayed
    Committed,
    /// A newer load or a logout took over; the result was dropped
    Superseded,
}

/// File name used for a downloaded report
pub fn report_filename(dataset: Option<&DatasetId>) -> String {
    match dataset {
        Some(id) => format!("equipment_report_{}.pdf", id),
        None => "equipment_report_latest.pdf".to_string(),
    }
}

struct Tracked {
    next_ticket: u64,
    /// Registered loads that have not settled, oldest first
    live: Vec<(u64, Option<DatasetId>)>,
    view: WorkspaceState,
}

impl Tracked {
    fn is_newest(&self, ticket: u64) -> bool {
        self.live.last().is_some_and(|(t, _)| *t == ticket)
    }

    /// Returns whether `ticket` was still registered
    fn withdraw(&mut self, ticket: u64) -> bool {
        let before = self.live.len();
        self.live.retain(|(t, _)| *t != ticket);
        before != self.live.len()
    }

    /// `loading` and `pending_dataset` always describe the newest live load
    fn sync_loading(&mut self) {
        self.view.loading = !self.live.is_empty();
        self.view.pending_dataset = self.live.last().and_then(|(_, target)| target.clone());
    }

    fn settle_all(&mut self) {
        self.live.clear();
        self.sync_loading();
    }
}

/// Registration of one load, owned by the future that performs it
///
/// Dropped unsettled, it withdraws its ticket so an abandoned future never
/// leaves the workspace loading.
struct PendingLoad {
    coordinator: WorkspaceCoordinator,
    ticket: u64,
    target: Option<DatasetId>,
    settled: bool,
}

impl PendingLoad {
    fn settle(&mut self) -> (u64, Option<DatasetId>) {
        self.settled = true;
        (self.ticket, self.target.take())
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut tracked = self.coordinator.write();
        if tracked.withdraw(self.ticket) {
            tracing::debug!(ticket = self.ticket, "Workspace load abandoned");
            tracked.sync_loading();
        }
    }
}

struct Fetched {
    summary: SummaryStatistics,
    equipment: Vec<EquipmentRecord>,
    history: Vec<HistoryEntry>,
}

struct CoordinatorInner {
    backend: Arc<dyn Backend>,
    session: SessionContext,
    reports: Arc<dyn ReportSink>,
    state: RwLock<Tracked>,
}

/// Single mutation point for the active dataset
#[derive(Clone)]
pub struct WorkspaceCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl WorkspaceCoordinator {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: SessionContext,
        reports: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                backend,
                session,
                reports,
                state: RwLock::new(Tracked {
                    next_ticket: 0,
                    live: Vec::new(),
                    view: WorkspaceState::default(),
                }),
            }),
        }
    }

    /// Load the server's latest dataset together with the upload history
    pub async fn initialize(&self) -> Result<LoadOutcome> {
        let pending = self.begin_load(|_| None);
        tracing::info!("Loading workspace");
        self.load(pending, LOAD_FAILED_MESSAGE).await
    }

    /// Make `id` the active dataset
    ///
    /// The load is registered immediately, before the returned future is
    /// polled, so of several selections the last one called wins.
    pub fn select_dataset(
        &self,
        id: DatasetId,
    ) -> impl Future<Output = Result<LoadOutcome>> + Send + 'static {
        tracing::info!(dataset = %id, "Selecting dataset");
        let pending = self.begin_load(|_| Some(id));
        self.load(pending, REFRESH_FAILED_MESSAGE)
    }

    /// Re-fetch what the user last asked for
    ///
    /// That is the dataset of the newest load in flight if there is one,
    /// otherwise the active dataset (`None` meaning the server's latest).
    /// Registered immediately, like [`WorkspaceCoordinator::select_dataset`].
    pub fn refresh(&self) -> impl Future<Output = Result<LoadOutcome>> + Send + 'static {
        let pending = self.begin_load(|view| {
            if view.loading {
                view.pending_dataset.clone()
            } else {
                view.active_dataset.clone()
            }
        });
        tracing::info!(
            dataset = pending.target.as_ref().map(DatasetId::as_str).unwrap_or("latest"),
            "Refreshing workspace"
        );
        self.load(pending, REFRESH_FAILED_MESSAGE)
    }

    /// Refresh in the background every `period` until the handle is dropped
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_auto_refresh(&self, period: std::time::Duration) -> AutoRefresh {
        AutoRefresh::spawn(self.clone(), period)
    }

    /// End the session
    ///
    /// Local state is always cleared; a failed remote logout only leaves a
    /// message behind.
    pub async fn logout(&self) -> Result<()> {
        let remote = self.inner.backend.logout(&self.inner.session).await;

        {
            let mut tracked = self.write();
            tracked.live.clear();
            tracked.view = WorkspaceState::default();
            if matches!(&remote, Err(e) if !e.is_auth_expired()) {
                tracked.view.notice = Some(Notice::error(LOGOUT_FAILED_MESSAGE));
            }
        }

        if let Err(e) = self.inner.session.clear_session() {
            tracing::warn!("Failed to clear persisted session: {}", e);
        }
        self.inner.session.navigate(Route::Login);

        match remote {
            Err(e) if !e.is_auth_expired() => {
                tracing::warn!("Remote logout failed: {}", e);
                Err(e)
            }
            _ => {
                tracing::info!("Logged out");
                Ok(())
            }
        }
    }

    /// Download the PDF report for the active dataset and save it locally
    pub async fn request_report(&self) -> Result<SavedReport> {
        let dataset = {
            let mut tracked = self.write();
            if !tracked.view.can_request_report() {
                tracked.view.notice = Some(Notice::error(NO_REPORT_DATA_MESSAGE));
                return Err(WorkspaceError::Precondition(NO_REPORT_DATA_MESSAGE.to_string()));
            }
            tracked.view.active_dataset.clone()
        };

        let filename = report_filename(dataset.as_ref());
        tracing::info!(%filename, "Downloading report");
        let result = self.download_report(dataset.as_ref(), &filename).await;

        match self.inner.session.guard(result) {
            Ok(saved) => {
                self.write().view.notice = Some(Notice::success(REPORT_SAVED_MESSAGE));
                Ok(saved)
            }
            Err(e) if e.is_auth_expired() => {
                self.reset();
                Err(e)
            }
            Err(e) => {
                tracing::warn!(%filename, "Report download failed: {}", e);
                self.write().view.notice = Some(Notice::error(REPORT_FAILED_MESSAGE));
                Err(e)
            }
        }
    }

    pub fn dismiss_notice(&self) {
        self.write().view.notice = None;
    }

    pub fn snapshot(&self) -> WorkspaceState {
        self.read().view.clone()
    }

    pub fn active_dataset(&self) -> Option<DatasetId> {
        self.read().view.active_dataset.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().view.loading
    }

    async fn download_report(
        &self,
        dataset: Option<&DatasetId>,
        filename: &str,
    ) -> Result<SavedReport> {
        let bytes = self.inner.backend.report_pdf(&self.inner.session, dataset).await?;
        self.inner.reports.save(filename, &bytes).await
    }

    async fn fetch(&self, dataset: Option<&DatasetId>) -> Result<Fetched> {
        let backend = &self.inner.backend;
        let session = &self.inner.session;

        let (summary, equipment, history) = tokio::try_join!(
            backend.summary(session, dataset),
            backend.equipment(session, dataset),
            backend.history(session),
        )?;

        summary.validate().map_err(|reason| malformed("summary", reason))?;
        if let Some(record) = equipment.iter().find(|r| !r.has_finite_measurements()) {
            return Err(malformed(
                "equipment",
                format!("record {} has a non-finite measurement", record.id),
            ));
        }
        if let Some(entry) = history.iter().find(|e| !e.has_finite_measurements()) {
            return Err(malformed(
                "history",
                format!("entry {} has a non-finite mean", entry.id),
            ));
        }

        Ok(Fetched {
            summary,
            equipment,
            history,
        })
    }

    /// Register a load; `choose` picks its target under the same lock
    fn begin_load(
        &self,
        choose: impl FnOnce(&WorkspaceState) -> Option<DatasetId>,
    ) -> PendingLoad {
        let mut tracked = self.write();
        let target = choose(&tracked.view);
        tracked.next_ticket += 1;
        let ticket = tracked.next_ticket;
        tracked.live.push((ticket, target.clone()));
        tracked.sync_loading();
        tracked.view.notice = None;

        PendingLoad {
            coordinator: self.clone(),
            ticket,
            target,
            settled: false,
        }
    }

    fn load(
        &self,
        pending: PendingLoad,
        failure_message: &'static str,
    ) -> impl Future<Output = Result<LoadOutcome>> + Send + 'static {
        let this = self.clone();
        async move {
            let result = this.fetch(pending.target.as_ref()).await;
            this.finish_load(pending, result, failure_message)
        }
    }

    fn finish_load(
        &self,
        mut pending: PendingLoad,
        result: Result<Fetched>,
        failure_message: &str,
    ) -> Result<LoadOutcome> {
        let (ticket, target) = pending.settle();

        // A rejected token ends the session whichever load noticed it
        let fetched = match self.inner.session.guard(result) {
            Ok(fetched) => fetched,
            Err(e) if e.is_auth_expired() => {
                self.reset();
                return Err(e);
            }
            Err(e) => return self.fail_load(ticket, e, failure_message),
        };

        let mut tracked = self.write();
        if !tracked.is_newest(ticket) {
            tracked.withdraw(ticket);
            tracing::debug!(ticket, "Discarding stale workspace load");
            return Ok(LoadOutcome::Superseded);
        }

        tracing::info!(
            dataset = target.as_ref().map(DatasetId::as_str).unwrap_or("latest"),
            items = fetched.equipment.len(),
            "Workspace data committed"
        );
        let view = &mut tracked.view;
        view.active_dataset = target;
        view.summary = Some(fetched.summary);
        view.equipment = EquipmentStore::new(fetched.equipment);
        view.history = HistoryRegistry::new(fetched.history);
        tracked.settle_all();
        Ok(LoadOutcome::Committed)
    }

    fn fail_load(
        &self,
        ticket: u64,
        error: WorkspaceError,
        failure_message: &str,
    ) -> Result<LoadOutcome> {
        let mut tracked = self.write();
        if !tracked.is_newest(ticket) {
            tracked.withdraw(ticket);
            tracing::debug!(ticket, "Discarding stale workspace failure: {}", error);
            return Ok(LoadOutcome::Superseded);
        }

        tracing::warn!("Workspace load failed: {}", error);
        tracked.settle_all();
        tracked.view.notice = Some(Notice::error(failure_message));
        Err(error)
    }

    /// Drop all data and invalidate in-flight loads
    fn reset(&self) {
        let mut tracked = self.write();
        tracked.live.clear();
        tracked.view = WorkspaceState::default();
    }

    fn read(&self) -> RwLockReadGuard<'_, Tracked> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tracked> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn malformed(endpoint: &str, reason: String) -> WorkspaceError {
    WorkspaceError::MalformedPayload {
        endpoint: endpoint.to_string(),
        reason,
    }
}
