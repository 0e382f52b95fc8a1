//! One JSON file per record.
//!
//! A record directory holds `<id>.json` for every live record and a small
//! `next_id.json` for the id allocator. Every file is written to a temporary
//! file in the same directory and renamed over the previous version, so a
//! crash leaves either the old or the new content of that one record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{StoreError, StoreResult};

const ALLOCATOR_FILE: &str = "next_id.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocatorState {
    next_id: u64,
}

/// Directory of per-record JSON files.
///
/// Writers of different records never wait on each other. Only the
/// allocator file has a lock of its own, and it is touched once per insert.
#[derive(Clone)]
pub(crate) struct RecordDir {
    dir: PathBuf,
    /// Highest `next_id` written to the allocator file so far.
    allocator: Arc<Mutex<u64>>,
}

impl RecordDir {
    /// Opens `dir`, creating it when missing.
    pub(crate) async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::Unavailable(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self {
            dir,
            allocator: Arc::new(Mutex::new(0)),
        })
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Reads every record file and the allocator.
    ///
    /// Returns the records and the next id to hand out, which is past both
    /// the recorded allocator value and the largest stored id.
    pub(crate) async fn load<T: DeserializeOwned>(
        &self,
        id_of: impl Fn(&T) -> u64,
    ) -> StoreResult<(Vec<T>, u64)> {
        let mut next_id = match fs::read(self.dir.join(ALLOCATOR_FILE)).await {
            Ok(contents) => {
                let state: AllocatorState = parse(&self.dir.join(ALLOCATOR_FILE), &contents)?;
                state.next_id
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 1,
            Err(e) => return Err(unavailable("read allocator", &self.dir, e)),
        };

        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| unavailable("list", &self.dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable("list", &self.dir, e))?
        {
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| stem.parse::<u64>().is_ok());
            if !is_record {
                continue;
            }
            let contents = fs::read(&path)
                .await
                .map_err(|e| unavailable("read", &path, e))?;
            let record: T = parse(&path, &contents)?;
            next_id = next_id.max(id_of(&record).saturating_add(1));
            records.push(record);
        }

        *self.allocator.lock().await = next_id;
        info!(
            dir = %self.dir.display(),
            records = records.len(),
            next_id,
            "Loaded record directory"
        );
        Ok((records, next_id.max(1)))
    }

    pub(crate) async fn write<T: Serialize>(&self, id: u64, record: &T) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Unavailable(format!("Failed to encode record {}: {}", id, e)))?;
        write_atomically(&self.dir, &self.record_path(id), &data).await?;
        debug!(id, dir = %self.dir.display(), "Persisted record");
        Ok(())
    }

    /// Removes the file of `id`. A file that is already gone is not an error.
    pub(crate) async fn remove(&self, id: u64) -> StoreResult<()> {
        let path = self.record_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable("remove", &path, e)),
        }
    }

    /// Records that ids below `next_id` have been handed out.
    ///
    /// The file only ever moves forward, so concurrent inserts may call this
    /// in any order.
    pub(crate) async fn advance_allocator(&self, next_id: u64) -> StoreResult<()> {
        let mut written = self.allocator.lock().await;
        if next_id <= *written {
            return Ok(());
        }
        let data = serde_json::to_vec(&AllocatorState { next_id })
            .map_err(|e| StoreError::Unavailable(format!("Failed to encode allocator: {}", e)))?;
        write_atomically(&self.dir, &self.dir.join(ALLOCATOR_FILE), &data).await?;
        *written = next_id;
        Ok(())
    }

    pub(crate) async fn is_available(&self) -> bool {
        fs::metadata(&self.dir)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }
}

/// Runs a store mutation as its own task.
///
/// A caller that stops waiting (for example on timeout) then cannot leave
/// memory and disk out of step halfway through a write.
pub(crate) async fn detached<T, E, F>(task: F) -> Result<T, E>
where
    T: Send + 'static,
    E: From<StoreError> + Send + 'static,
    F: Future<Output = Result<T, E>> + Send + 'static,
{
    tokio::spawn(task).await.map_err(|e| {
        E::from(StoreError::Unavailable(format!(
            "Store task failed: {}",
            e
        )))
    })?
}

fn parse<T: DeserializeOwned>(path: &Path, contents: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(contents).map_err(|e| {
        StoreError::Unavailable(format!("Failed to parse {}: {}", path.display(), e))
    })
}

fn unavailable(action: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("Failed to {} {}: {}", action, path.display(), e))
}

async fn write_atomically(dir: &Path, path: &Path, data: &[u8]) -> StoreResult<()> {
    let temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        StoreError::Unavailable(format!("Failed to create temporary file: {}", e))
    })?;
    let temp_path = temp_file.path().to_path_buf();

    let mut file = fs::File::create(&temp_path)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to create file: {}", e)))?;
    file.write_all(data)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to write to file: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to sync file: {}", e)))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to rename file: {}", e)))?;

    Ok(())
}
