use crate::config::UploadNaming;
use async_trait::async_trait;
use axum::body::Bytes;
use metrics::counter;
use service_core::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where an upload ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub storage_name: String,
    pub path: PathBuf,
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Write `data` under a name derived from `original_name`, creating the
    /// upload directory if it is missing.
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<StoredUpload, AppError>;

    async fn read(&self, upload: &StoredUpload) -> Result<Bytes, AppError>;

    /// Delete regular files last modified at least `max_age` ago.
    async fn sweep_expired(&self, max_age: Duration) -> Result<usize, AppError>;

    async fn is_writable(&self) -> bool;
}

/// Reduce a client-supplied file name to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

pub struct LocalUploadStore {
    base_path: PathBuf,
    naming: UploadNaming,
}

impl LocalUploadStore {
    pub fn new(base_path: impl Into<PathBuf>, naming: UploadNaming) -> Self {
        Self {
            base_path: base_path.into(),
            naming,
        }
    }

    fn storage_name(&self, original_name: &str) -> String {
        let safe = sanitize_file_name(original_name);
        match self.naming {
            UploadNaming::Unique => format!("{}-{}", Uuid::new_v4(), safe),
            UploadNaming::Original => safe,
        }
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<StoredUpload, AppError> {
        // create_dir_all tolerates a concurrent creator.
        fs::create_dir_all(&self.base_path).await?;

        let storage_name = self.storage_name(original_name);
        let path = self.base_path.join(&storage_name);
        fs::write(&path, data).await?;

        counter!("uploads_saved_total").increment(1);
        tracing::info!(
            original_name = %original_name,
            storage_name = %storage_name,
            size = data.len(),
            "Upload saved"
        );

        Ok(StoredUpload { storage_name, path })
    }

    async fn read(&self, upload: &StoredUpload) -> Result<Bytes, AppError> {
        let data = fs::read(&upload.path).await?;
        Ok(Bytes::from(data))
    }

    async fn sweep_expired(&self, max_age: Duration) -> Result<usize, AppError> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age >= max_age {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    // Already gone: another sweep or a manual cleanup won the race.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        Ok(removed)
    }

    async fn is_writable(&self) -> bool {
        if fs::create_dir_all(&self.base_path).await.is_err() {
            return false;
        }
        fs::metadata(&self.base_path)
            .await
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }
}

/// Background task that enforces upload retention.
pub struct UploadSweeper {
    store: Arc<dyn UploadStore>,
    retention: Duration,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl UploadSweeper {
    pub fn new(
        store: Arc<dyn UploadStore>,
        retention: Duration,
        interval: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            retention,
            interval,
            shutdown_token,
        }
    }

    pub async fn start(self) {
        if self.retention.is_zero() {
            tracing::info!("Upload retention disabled by configuration");
            return;
        }

        tracing::info!(
            retention_secs = self.retention.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Starting upload sweeper"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Upload sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.store.sweep_expired(self.retention).await {
                        Ok(0) => {}
                        Ok(removed) => {
                            counter!("uploads_swept_total").increment(removed as u64);
                            tracing::info!(removed, "Swept expired uploads");
                        }
                        Err(e) => tracing::warn!("Upload sweep failed: {}", e),
                    }
                }
            }
        }
    }
}
