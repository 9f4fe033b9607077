//! Append-only JSON Lines audit log.

use crate::{ChainState, ChainVerification, SealedAuditRecord, newest_first, verify_chain};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use warden_core::AuditRecord;
use warden_error::{JsonError, StorageError, StorageErrorKind, WardenError, WardenResult};
use warden_interface::AuditSink;

/// File-backed audit sink.
///
/// One sealed record per line. Appends are serialized through a mutex that
/// guards the chain tail, and each line is flushed and synced before the
/// tail advances, so a record reported as written is on disk.
///
/// # Example Layout
///
/// ```text
/// {"sequence":0,"prev_hash":"0000…","hash":"9f2c…","record":{…}}
/// {"sequence":1,"prev_hash":"9f2c…","hash":"41aa…","record":{…}}
/// ```
pub struct JsonlAuditSink {
    path: PathBuf,
    chain: Mutex<ChainState>,
}

impl JsonlAuditSink {
    /// Open (or create) a log file, resuming the chain after its last line.
    ///
    /// # Errors
    ///
    /// Returns error if the parent directory cannot be created or an
    /// existing line cannot be decoded.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> WardenResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let chain = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;
            match Self::parse(&contents)?.last() {
                Some(last) => ChainState::after(last),
                None => ChainState::genesis(),
            }
        } else {
            ChainState::genesis()
        };

        tracing::info!(next_sequence = chain.next_sequence(), "Opened audit log");
        Ok(Self {
            path,
            chain: Mutex::new(chain),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every sealed record from the file, in file order.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line cannot be decoded.
    pub async fn read_all(&self) -> WardenResult<Vec<SealedAuditRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
                .into());
            }
        };
        Self::parse(&contents)
    }

    /// Verify the hash chain of the whole file.
    pub async fn verify(&self) -> WardenResult<ChainVerification> {
        Ok(verify_chain(&self.read_all().await?))
    }

    fn parse(contents: &str) -> WardenResult<Vec<SealedAuditRecord>> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str::<SealedAuditRecord>(line).map_err(|e| {
                    WardenError::from(StorageError::new(StorageErrorKind::Corrupted {
                        line: index + 1,
                        reason: e.to_string(),
                    }))
                })
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    #[tracing::instrument(skip(self, record), fields(record_id = %record.id(), path = %self.path.display()))]
    async fn append(&self, record: &AuditRecord) -> WardenResult<()> {
        let mut chain = self.chain.lock().await;
        let sealed = chain.seal(record.clone())?;

        let mut line = serde_json::to_vec(&sealed).map_err(JsonError::from)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileOpen(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            })?;

        file.write_all(&line).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                self.path.display(),
                e
            )))
        })?;
        file.sync_data().await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "sync {}: {}",
                self.path.display(),
                e
            )))
        })?;

        chain.advance(&sealed);
        tracing::debug!(sequence = sealed.sequence(), "Appended audit record");
        Ok(())
    }

    async fn list_by_principal(&self, principal_id: &str) -> WardenResult<Vec<AuditRecord>> {
        let entries = self.read_all().await?;
        Ok(newest_first(
            entries
                .iter()
                .filter(|s| s.record().principal_id() == principal_id)
                .collect(),
        ))
    }
}
