//! File-backed critical-section sink.
//!
//! Every peer on the host opens the same file in append mode, so records from
//! different processes interleave only at line boundaries. Each append is
//! flushed and synced before the token moves on.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokenring_core::{CriticalSectionSink, PeerId, SinkEntry, SinkError};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    sync::Mutex,
};

/// Appends one `"<peer> <payload>"` line per entry.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl FileSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self { path, file: Arc::new(Mutex::new(file)) })
    }

    /// Empty `path`, creating it if needed.
    ///
    /// Run once by the initial holder before the ring starts.
    pub async fn truncate(path: impl AsRef<Path>) -> io::Result<()> {
        OpenOptions::new().create(true).write(true).truncate(true).open(path).await?;
        Ok(())
    }

    /// File this sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CriticalSectionSink for FileSink {
    async fn append(&self, peer: PeerId, payload: &str) -> Result<(), SinkError> {
        let line = SinkEntry::new(peer, payload).to_line();

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}
