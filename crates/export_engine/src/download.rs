use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use export_logging::{export_debug, export_info};

use crate::host::{HostPage, TempNodeKind};
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("could not save download: {0}")]
    Persist(#[from] PersistError),
    #[error("object url {0} was revoked before the download started")]
    Revoked(String),
    #[error("download rejected: {0}")]
    Rejected(String),
}

/// Receives the bytes of a clicked download link.
#[async_trait::async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, file_name: &str, mime_type: &str, bytes: Bytes)
        -> Result<(), DownloadError>;
}

/// Saves downloads into a directory, replacing files of the same name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    writer: AtomicFileWriter,
}

impl DirectorySink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

#[async_trait::async_trait]
impl DownloadSink for DirectorySink {
    async fn save(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Bytes,
    ) -> Result<(), DownloadError> {
        let path = self.writer.write(file_name, &bytes)?;
        export_info!(
            "saved {} ({mime_type}, {} bytes)",
            path.display(),
            bytes.len()
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// Keeps downloads in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<DownloadedFile>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn files(&self) -> Vec<DownloadedFile> {
        self.files
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DownloadSink for MemorySink {
    async fn save(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Bytes,
    ) -> Result<(), DownloadError> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| DownloadError::Rejected("memory sink poisoned".into()))?;
        files.push(DownloadedFile {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        });
        Ok(())
    }
}

/// Hands `bytes` to the sink through a transient object URL and a synthetic
/// anchor, releasing both whatever the sink returns.
pub(crate) async fn trigger_download(
    host: &Arc<HostPage>,
    sink: &dyn DownloadSink,
    file_name: &str,
    mime_type: &str,
    bytes: Bytes,
) -> Result<(), DownloadError> {
    let url = host.create_object_url(bytes, mime_type);
    let anchor = host.attach(TempNodeKind::DownloadAnchor);
    export_debug!("clicking download anchor for {file_name} -> {url}");

    let result = match host.fetch_object_url(&url) {
        Some((mime_type, payload)) => sink.save(file_name, &mime_type, payload).await,
        None => Err(DownloadError::Revoked(url.to_string())),
    };

    drop(anchor);
    drop(url);
    result
}
