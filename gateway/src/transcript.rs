//! Conversation transcript store.
//!
//! The transcript is a plain-text log of `User: ...` / `AI: ...` lines. It is
//! read in full before every standard-mode prompt and appended to after each
//! model reply.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Append-only transcript storage.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Read every completed entry.
    async fn read_all(&self) -> Result<String>;

    /// Append one entry. A trailing newline is added.
    async fn append(&self, entry: &str) -> Result<()>;
}

/// Transcript persisted to a UTF-8 text file.
///
/// Reads and appends are serialized through one lock, so a reader never
/// observes a half-written entry.
pub struct FileTranscript {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptStore for FileTranscript {
    async fn read_all(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Transcript(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }

    async fn append(&self, entry: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::Transcript(format!("Failed to open {}: {}", self.path.display(), e))
            })?;

        let line = format!("{}\n", entry);
        file.write_all(line.as_bytes()).await.map_err(|e| {
            Error::Transcript(format!("Failed to append to {}: {}", self.path.display(), e))
        })?;
        file.flush()
            .await
            .map_err(|e| Error::Transcript(e.to_string()))?;

        tracing::debug!("Appended to transcript: {}", entry);
        Ok(())
    }
}

/// In-memory transcript, used by tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryTranscript {
    content: Mutex<String>,
    fail_reads: bool,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &str) -> Self {
        Self {
            content: Mutex::new(content.to_string()),
            fail_reads: false,
        }
    }

    /// A transcript whose reads always fail, as if the file were unreadable.
    pub fn unreadable() -> Self {
        Self {
            content: Mutex::new(String::new()),
            fail_reads: true,
        }
    }

    /// Current content, regardless of `fail_reads`.
    pub async fn snapshot(&self) -> String {
        self.content.lock().await.clone()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscript {
    async fn read_all(&self) -> Result<String> {
        if self.fail_reads {
            return Err(Error::Transcript("transcript is unreadable".to_string()));
        }
        Ok(self.content.lock().await.clone())
    }

    async fn append(&self, entry: &str) -> Result<()> {
        let mut content = self.content.lock().await;
        content.push_str(entry);
        content.push('\n');
        Ok(())
    }
}
