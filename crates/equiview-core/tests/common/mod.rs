//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use equiview_core::error::{Result, WorkspaceError};
use equiview_core::models::{
    Credentials, DatasetId, EquipmentRecord, HistoryEntry, LoginResponse, Session,
    SummaryStatistics, TypeCount, UploadReceipt,
};
use equiview_core::ports::{Backend, ReportSink, SavedReport};
use equiview_core::session::{MemoryTokenStore, RecordingNavigator};
use equiview_core::upload::UploadFile;
use equiview_core::{SessionContext, UploadOrchestrator, WorkspaceCoordinator};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const LATEST: &str = "latest";

/// How a scripted endpoint fails
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unauthorized,
    ServerError,
}

impl Failure {
    fn to_error(self, endpoint: &str) -> WorkspaceError {
        match self {
            Failure::Unauthorized => WorkspaceError::AuthExpired,
            Failure::ServerError => WorkspaceError::Server {
                endpoint: endpoint.to_string(),
                status: 500,
                message: Some("Internal server error".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedDataset {
    pub summary: SummaryStatistics,
    pub equipment: Vec<EquipmentRecord>,
}

/// Equipment names are prefixed with the dataset key and the mean flowrate
/// encodes it too, so any mix of two datasets is detectable.
pub fn dataset(key: &str, flowrate: f64, items: u64) -> ScriptedDataset {
    let equipment: Vec<EquipmentRecord> = (0..items)
        .map(|i| EquipmentRecord {
            id: i + 1,
            name: format!("{key}-P{i}"),
            kind: "Pump".to_string(),
            flowrate,
            pressure: 5.0,
            temperature: 90.0,
        })
        .collect();

    let type_distribution = if items == 0 {
        Vec::new()
    } else {
        vec![TypeCount {
            label: "Pump".to_string(),
            count: items,
        }]
    };

    ScriptedDataset {
        summary: SummaryStatistics {
            total_count: items,
            avg_flowrate: if items == 0 { 0.0 } else { flowrate },
            avg_pressure: if items == 0 { 0.0 } else { 5.0 },
            avg_temperature: if items == 0 { 0.0 } else { 90.0 },
            type_distribution,
        },
        equipment,
    }
}

pub fn history_entry(id: &str, filename: &str, summary: &SummaryStatistics) -> HistoryEntry {
    HistoryEntry {
        id: DatasetId::new(id),
        filename: filename.to_string(),
        upload_timestamp: Utc::now(),
        total_count: summary.total_count,
        avg_flowrate: summary.avg_flowrate,
        avg_pressure: summary.avg_pressure,
        avg_temperature: summary.avg_temperature,
        type_distribution: summary.type_distribution.clone(),
    }
}

/// In-memory backend with per-dataset gates and per-endpoint failures
#[derive(Default)]
pub struct ScriptedBackend {
    datasets: Mutex<HashMap<String, ScriptedDataset>>,
    history: Mutex<Vec<HistoryEntry>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<&'static str, Failure>>,
    calls: Mutex<Vec<String>>,
    next_upload_id: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_dataset(&self, key: &str, data: ScriptedDataset) {
        self.datasets.lock().unwrap().insert(key.to_string(), data);
    }

    pub fn with_history(&self, entries: Vec<HistoryEntry>) {
        *self.history.lock().unwrap() = entries;
    }

    /// Hold summary requests for `key` until [`ScriptedBackend::release`]
    pub fn gate(&self, key: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(key.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(key) {
            gate.notify_one();
        }
    }

    pub fn fail(&self, endpoint: &'static str, failure: Failure) {
        self.failures.lock().unwrap().insert(endpoint, failure);
    }

    pub fn heal(&self, endpoint: &'static str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    pub fn next_upload_id(&self, id: &str) {
        *self.next_upload_id.lock().unwrap() = Some(id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, endpoint: &'static str, dataset: Option<&DatasetId>) -> Result<()> {
        let call = match dataset {
            Some(id) => format!("{endpoint}:{id}"),
            None => endpoint.to_string(),
        };
        self.calls.lock().unwrap().push(call);

        match self.failures.lock().unwrap().get(endpoint) {
            Some(failure) => Err(failure.to_error(endpoint)),
            None => Ok(()),
        }
    }

    fn lookup(&self, dataset: Option<&DatasetId>) -> Result<ScriptedDataset> {
        let key = dataset.map(DatasetId::as_str).unwrap_or(LATEST);
        self.datasets
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| WorkspaceError::Server {
                endpoint: "dataset".to_string(),
                status: 404,
                message: Some("Dataset not found".to_string()),
            })
    }

    async fn wait_gate(&self, dataset: Option<&DatasetId>) {
        let key = dataset.map(DatasetId::as_str).unwrap_or(LATEST);
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        self.record("login", None)?;
        Ok(LoginResponse {
            token: "scripted-token".to_string(),
            user: credentials.username.clone(),
        })
    }

    async fn logout(&self, _session: &SessionContext) -> Result<()> {
        self.record("logout", None)
    }

    async fn upload_csv(&self, _session: &SessionContext, file: &UploadFile) -> Result<UploadReceipt> {
        self.record("upload", None)?;
        let id = self
            .next_upload_id
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| "1".to_string());

        let data = dataset(&id, 150.0, 3);
        let entry = history_entry(&id, file.name(), &data.summary);
        self.with_dataset(&id, data.clone());
        self.with_dataset(LATEST, data);

        let mut history = self.history.lock().unwrap();
        history.insert(0, entry);
        history.truncate(5);

        Ok(UploadReceipt {
            dataset_id: DatasetId::new(id),
            message: Some("File uploaded successfully".to_string()),
        })
    }

    async fn equipment(
        &self,
        _session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<EquipmentRecord>> {
        self.record("equipment", dataset)?;
        Ok(self.lookup(dataset)?.equipment)
    }

    async fn summary(
        &self,
        _session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<SummaryStatistics> {
        self.record("summary", dataset)?;
        self.wait_gate(dataset).await;
        Ok(self.lookup(dataset)?.summary)
    }

    async fn history(&self, _session: &SessionContext) -> Result<Vec<HistoryEntry>> {
        self.record("history", None)?;
        Ok(self.history.lock().unwrap().clone())
    }

    async fn report_pdf(
        &self,
        _session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<u8>> {
        self.record("report", dataset)?;
        Ok(b"%PDF-1.4\n%scripted\n".to_vec())
    }
}

/// Report sink that keeps saved files in memory
#[derive(Default)]
pub struct MemoryReportSink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryReportSink {
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn save(&self, filename: &str, contents: &[u8]) -> Result<SavedReport> {
        self.saved
            .lock()
            .unwrap()
            .push((filename.to_string(), contents.to_vec()));
        Ok(SavedReport {
            filename: filename.to_string(),
            location: None,
            size: contents.len(),
        })
    }
}

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub reports: Arc<MemoryReportSink>,
    pub session: SessionContext,
    pub coordinator: WorkspaceCoordinator,
}

impl Harness {
    /// Signed-in workspace over a backend with datasets "A", "B" and a latest one
    pub fn new() -> Self {
        let backend = ScriptedBackend::new();
        backend.with_dataset(LATEST, dataset("B", 200.0, 4));
        backend.with_dataset("A", dataset("A", 100.0, 2));
        backend.with_dataset("B", dataset("B", 200.0, 4));
        backend.with_history(vec![
            history_entry("B", "b.csv", &dataset("B", 200.0, 4).summary),
            history_entry("A", "a.csv", &dataset("A", 100.0, 2).summary),
        ]);

        let store = Arc::new(MemoryTokenStore::with_session(Session {
            token: "scripted-token".to_string(),
            user: "operator".to_string(),
        }));
        let navigator = Arc::new(RecordingNavigator::new());
        let session = SessionContext::new(store.clone(), navigator.clone());
        session.restore().unwrap();

        let reports = Arc::new(MemoryReportSink::default());
        let coordinator =
            WorkspaceCoordinator::new(backend.clone(), session.clone(), reports.clone());

        Self {
            backend,
            store,
            navigator,
            reports,
            session,
            coordinator,
        }
    }

    pub fn uploads(&self) -> UploadOrchestrator {
        UploadOrchestrator::new(
            self.backend.clone(),
            self.session.clone(),
            self.coordinator.clone(),
        )
    }
}
