use serde::{Deserialize, Serialize};

use super::DatasetId;

/// Username and password submitted to the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Successful login payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: String,
}

/// An authenticated session as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: String,
}

impl From<LoginResponse> for Session {
    fn from(response: LoginResponse) -> Self {
        Self {
            token: response.token,
            user: response.user,
        }
    }
}

/// Successful upload payload
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub dataset_id: DatasetId,

    #[serde(default)]
    pub message: Option<String>,
}
