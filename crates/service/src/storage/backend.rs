use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};
use uuid::Uuid;

use crate::errors::StoreError;

/// Raw byte access to the resource that holds the document.
/// Implementations can be file-backed, in-memory, or remote.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Current contents, or `None` when the resource does not exist yet.
    async fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;
    /// Replace the whole resource with `bytes`.
    async fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;
    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    file_path: PathBuf,
}

impl FileBackend {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { file_path: path.into() }
    }

    /// Fresh sibling path per write, so concurrent writers never share a staging file.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.file_path.clone().into_os_string();
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        PathBuf::from(name)
    }
}

#[async_trait]
impl DocumentBackend for FileBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.file_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        // write beside the target then rename, so readers never see a half-written file
        let staging = self.staging_path();
        let written = match fs::write(&staging, bytes).await {
            Ok(()) => fs::rename(&staging, &self.file_path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = fs::remove_file(&staging).await;
        }
        Ok(written?)
    }

    fn describe(&self) -> String {
        self.file_path.display().to_string()
    }
}

/// In-process document, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: RwLock<Option<Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing raw contents (which need not be valid JSON).
    pub fn with_contents<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self { contents: RwLock::new(Some(bytes.into())), fail_writes: AtomicBool::new(false) }
    }

    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.contents.read().await.clone()
    }

    /// Make every subsequent write fail, to exercise persistence errors.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.contents.read().await.clone())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "memory backend is read-only",
            )));
        }
        *self.contents.write().await = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn file_backend_reports_missing_file_as_none() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("shop_backend_{}.json", Uuid::new_v4()));
        let backend = FileBackend::new(&tmp);
        assert!(backend.read().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn file_backend_overwrites_whole_file() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("shop_backend_{}", Uuid::new_v4()));
        let tmp = dir.join("dados.json");
        let backend = FileBackend::new(&tmp);

        backend.write(b"{\"a\":1,\"padding\":\"xxxxxxxxxxxx\"}").await?;
        backend.write(b"{}").await?;
        assert_eq!(backend.read().await?.as_deref(), Some(&b"{}"[..]));
        assert_eq!(staged_leftovers(&dir).await?, 0);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    async fn staged_leftovers(dir: &std::path::Path) -> Result<usize, anyhow::Error> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().ends_with(".tmp") {
                count += 1;
            }
        }
        Ok(count)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn file_backend_survives_concurrent_writes() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("shop_backend_{}", Uuid::new_v4()));
        let backend = std::sync::Arc::new(FileBackend::new(dir.join("dados.json")));

        let mut tasks = Vec::new();
        for n in 0..32 {
            let backend = backend.clone();
            tasks.push(tokio::spawn(async move {
                backend.write(format!("{{\"n\":{n}}}").as_bytes()).await
            }));
        }
        for task in tasks {
            task.await??;
        }

        let contents = backend.read().await?.unwrap_or_default();
        let value: serde_json::Value = serde_json::from_slice(&contents)?;
        assert!(value["n"].is_u64());
        assert_eq!(staged_leftovers(&dir).await?, 0);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn memory_backend_can_refuse_writes() -> Result<(), anyhow::Error> {
        let backend = MemoryBackend::with_contents("old");
        backend.set_fail_writes(true);
        assert!(backend.write(b"new").await.is_err());
        assert_eq!(backend.contents().await.as_deref(), Some(&b"old"[..]));

        backend.set_fail_writes(false);
        backend.write(b"new").await?;
        assert_eq!(backend.contents().await.as_deref(), Some(&b"new"[..]));
        Ok(())
    }
}
