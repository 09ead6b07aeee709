use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Credentials, DatasetId, EquipmentRecord, HistoryEntry, LoginResponse, SummaryStatistics,
    UploadReceipt,
};
use crate::session::SessionContext;
use crate::upload::UploadFile;

/// Port for the backend REST collaborator
///
/// Every authenticated call receives the session explicitly; adapters read
/// the token from it for the `Authorization` header. A 401 must surface as
/// `WorkspaceError::AuthExpired` and an unparseable body as
/// `WorkspaceError::MalformedPayload`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange credentials for a session token
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    /// Invalidate the current token on the server
    async fn logout(&self, session: &SessionContext) -> Result<()>;

    /// Upload a CSV as a single multipart body
    async fn upload_csv(&self, session: &SessionContext, file: &UploadFile)
        -> Result<UploadReceipt>;

    /// Equipment rows for a dataset, or for the latest one when `dataset` is `None`
    async fn equipment(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<EquipmentRecord>>;

    /// Summary statistics for a dataset, or for the latest one
    async fn summary(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<SummaryStatistics>;

    /// Retained uploads, newest first
    async fn history(&self, session: &SessionContext) -> Result<Vec<HistoryEntry>>;

    /// Rendered PDF report for a dataset, or for the latest one
    async fn report_pdf(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<u8>>;
}
