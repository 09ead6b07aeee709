use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use equiview_core::config::WorkspaceConfig;
use equiview_core::error::{Result, WorkspaceError};
use equiview_core::models::{
    Credentials, DatasetId, EquipmentRecord, HistoryEntry, LoginResponse, SummaryStatistics,
    UploadReceipt,
};
use equiview_core::ports::Backend;
use equiview_core::upload::UploadFile;
use equiview_core::SessionContext;

const LOGIN: &str = "/auth/login/";
const LOGOUT: &str = "/auth/logout/";
const UPLOAD: &str = "/upload/";
const EQUIPMENT: &str = "/equipment/";
const SUMMARY: &str = "/summary/";
const HISTORY: &str = "/history/";
const REPORT_PDF: &str = "/report/pdf/";

/// REST backend over HTTP
///
/// Authenticated requests carry `Authorization: Token <key>` taken from the
/// session passed in.
pub struct HttpBackend {
    /// Base URL of the API, without a trailing slash (e.g. "http://localhost:8000/api")
    base_url: String,

    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkspaceError::ConfigInvalid {
                key: "request_timeout_secs".to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &WorkspaceConfig) -> Result<Self> {
        Self::new(config.api_base_url.value.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, dataset: Option<&DatasetId>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path)).map_err(|e| {
            WorkspaceError::ConfigInvalid {
                key: "api_base_url".to_string(),
                reason: format!("Cannot build URL for {}: {}", path, e),
            }
        })?;

        if let Some(id) = dataset {
            url.query_pairs_mut().append_pair("dataset_id", id.as_str());
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder, session: &SessionContext) -> RequestBuilder {
        match session.token() {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {}", token)),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into errors
    ///
    /// A 401 means the session is gone, except on the login endpoint where
    /// it only means the credentials were wrong.
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(endpoint, "Sending request");
        let response = request.send().await.map_err(|e| WorkspaceError::Network {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && endpoint != LOGIN {
            return Err(WorkspaceError::AuthExpired);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error);

        Err(WorkspaceError::Server {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<T> {
        let request = self.authorize(self.client.get(self.url(endpoint, dataset)?), session);
        let response = self.send(endpoint, request).await?;
        read_json(endpoint, response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let request = self.client.post(self.url(LOGIN, None)?).json(credentials);
        let response = self.send(LOGIN, request).await?;
        read_json(LOGIN, response).await
    }

    async fn logout(&self, session: &SessionContext) -> Result<()> {
        let request = self.authorize(self.client.post(self.url(LOGOUT, None)?), session);
        self.send(LOGOUT, request).await?;
        Ok(())
    }

    async fn upload_csv(
        &self,
        session: &SessionContext,
        file: &UploadFile,
    ) -> Result<UploadReceipt> {
        let part = Part::bytes(file.contents().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type().unwrap_or("text/csv"))
            .map_err(|e| {
                WorkspaceError::Validation(format!("Invalid content type for {}: {}", file.name(), e))
            })?;
        let form = Form::new().part("file", part);

        let request = self.authorize(self.client.post(self.url(UPLOAD, None)?), session).multipart(form);
        let response = self.send(UPLOAD, request).await?;
        read_json(UPLOAD, response).await
    }

    async fn equipment(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<EquipmentRecord>> {
        self.get_json(EQUIPMENT, session, dataset).await
    }

    async fn summary(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<SummaryStatistics> {
        self.get_json(SUMMARY, session, dataset).await
    }

    async fn history(&self, session: &SessionContext) -> Result<Vec<HistoryEntry>> {
        self.get_json(HISTORY, session, None).await
    }

    async fn report_pdf(
        &self,
        session: &SessionContext,
        dataset: Option<&DatasetId>,
    ) -> Result<Vec<u8>> {
        let request = self.authorize(self.client.get(self.url(REPORT_PDF, dataset)?), session);
        let response = self.send(REPORT_PDF, request).await?;
        let bytes = response.bytes().await.map_err(|e| WorkspaceError::Network {
            endpoint: REPORT_PDF.to_string(),
            reason: format!("Failed to read report body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Error body the backend attaches to rejections
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

async fn read_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(|e| WorkspaceError::Network {
        endpoint: endpoint.to_string(),
        reason: format!("Failed to read response: {}", e),
    })?;

    serde_json::from_slice(&body).map_err(|e| WorkspaceError::MalformedPayload {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}
