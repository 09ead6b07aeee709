use std::path::Path;

use crate::error::{Result, WorkspaceError};

/// Largest accepted upload, inclusive (10 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const INVALID_FILE_MESSAGE: &str = "Please select a valid CSV file (max 10MB).";

const CSV_CONTENT_TYPE: &str = "text/csv";

/// A candidate file for upload, from a picker, a drop, or a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    size: u64,
    content_type: Option<String>,
    contents: Vec<u8>,
}

impl UploadFile {
    /// File whose contents are already in memory
    pub fn from_bytes(name: impl Into<String>, contents: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name).map(str::to_string);
        Self {
            size: contents.len() as u64,
            name,
            content_type,
            contents,
        }
    }

    /// File as described by a browser-style file handle
    ///
    /// `size` is the declared size, which is what validation checks.
    pub fn from_handle(
        name: impl Into<String>,
        size: u64,
        content_type: Option<String>,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            content_type,
            contents,
        }
    }

    /// Load a file from disk
    ///
    /// Contents are only read when the file is within the upload limit, so
    /// oversized files can still be offered to validation and rejected.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                WorkspaceError::Validation(format!("Not a file path: {}", path.display()))
            })?
            .to_string();

        let size = tokio::fs::metadata(path).await?.len();
        let contents = if size <= MAX_UPLOAD_BYTES {
            tokio::fs::read(path).await?
        } else {
            Vec::new()
        };

        Ok(Self {
            content_type: content_type_for(&name).map(str::to_string),
            name,
            size,
            contents,
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn has_csv_extension(&self) -> bool {
        self.name.to_lowercase().ends_with(".csv")
    }

    pub fn declares_csv(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE))
            .unwrap_or(false)
    }

    /// Size for display, e.g. "512 Bytes", "2.00 KB", "1.50 MB"
    pub fn size_text(&self) -> String {
        format_file_size(self.size)
    }
}

/// Check type and size; content is the server's concern
pub fn validate_file(file: &UploadFile) -> Result<()> {
    let csv = file.has_csv_extension() || file.declares_csv();
    let within_limit = file.size() <= MAX_UPLOAD_BYTES;

    if csv && within_limit {
        Ok(())
    } else {
        Err(WorkspaceError::Validation(INVALID_FILE_MESSAGE.to_string()))
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} Bytes", bytes);
    }

    let kb = bytes as f64 / 1024.0;
    if kb < 1024.0 {
        return format!("{:.2} KB", kb);
    }

    format!("{:.2} MB", kb / 1024.0)
}

fn content_type_for(name: &str) -> Option<&'static str> {
    if name.to_lowercase().ends_with(".csv") {
        Some(CSV_CONTENT_TYPE)
    } else {
        None
    }
}
