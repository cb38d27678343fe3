use async_trait::async_trait;
use paygate_core::AuditEntry;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::AuditError;
use crate::traits::AuditLog;

/// Append-only audit log, one JSON object per line.
///
/// The file is opened lazily on first write and kept open. Every entry is
/// flushed before `append` returns.
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditLog for JsonlAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| AuditError(format!("failed to serialize audit entry: {}", e)))?;
        line.push('\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| AuditError(format!("failed to create audit dir: {}", e)))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| AuditError(format!("failed to open audit log: {}", e)))?;
            *guard = Some(file);
        }

        if let Some(ref mut file) = *guard {
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| AuditError(format!("failed to write audit entry: {}", e)))?;
            file.flush()
                .await
                .map_err(|e| AuditError(format!("failed to flush audit log: {}", e)))?;
        }
        Ok(())
    }
}
