use async_trait::async_trait;
use std::path::{Path, PathBuf};

use equiview_core::error::{Result, WorkspaceError};
use equiview_core::ports::{ReportSink, SavedReport};

/// Saves downloaded reports into a directory, creating it on first use
pub struct DirectoryReportSink {
    dir: PathBuf,
}

impl DirectoryReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportSink for DirectoryReportSink {
    async fn save(&self, filename: &str, contents: &[u8]) -> Result<SavedReport> {
        // Only the final component is used so a name cannot escape the directory
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| WorkspaceError::Validation(format!("Invalid report name: {}", filename)))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(name);
        tokio::fs::write(&path, contents).await?;

        tracing::info!(path = %path.display(), size = contents.len(), "Report saved");
        Ok(SavedReport {
            filename: filename.to_string(),
            location: Some(path),
            size: contents.len(),
        })
    }
}
