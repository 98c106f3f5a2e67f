use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::models::{ScanSnapshot, SnapshotMap};
use crate::utils::error::AppError;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    stores: SnapshotMap,
}

/// Change detector state on disk, so a restart does not re-report every
/// product as new.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved snapshots. A missing file is an empty map; anything
    /// unreadable or from another format version is `SnapshotFormat`.
    pub fn load(&self) -> Result<SnapshotMap, AppError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SnapshotMap::new()),
            Err(e) => {
                return Err(AppError::SnapshotFormat {
                    message: format!("cannot read {}: {}", self.path.display(), e),
                });
            }
        };

        let file: SnapshotFile = serde_json::from_str(&content).map_err(|e| AppError::SnapshotFormat {
            message: format!("{} is not a snapshot file: {}", self.path.display(), e),
        })?;

        if file.version != SNAPSHOT_FORMAT_VERSION {
            return Err(AppError::SnapshotFormat {
                message: format!(
                    "{} has version {}, expected {}",
                    self.path.display(),
                    file.version,
                    SNAPSHOT_FORMAT_VERSION
                ),
            });
        }

        // Keys are recomputed so files written with an older identity rule
        // still line up with fresh records.
        Ok(file
            .stores
            .into_iter()
            .map(|(store, snapshot)| (store, snapshot.rekeyed()))
            .collect())
    }

    /// Like [`load`](Self::load), but a bad file only costs the history.
    pub fn load_or_empty(&self) -> SnapshotMap {
        match self.load() {
            Ok(snapshots) => {
                tracing::info!(
                    path = %self.path.display(),
                    stores = snapshots.len(),
                    records = snapshots.values().map(ScanSnapshot::len).sum::<usize>(),
                    "loaded snapshots"
                );
                snapshots
            }
            Err(e) => {
                tracing::warn!("Discarding saved snapshots: {}", e);
                SnapshotMap::new()
            }
        }
    }

    /// Write through a temporary file and rename, so an interrupted save
    /// leaves the previous file intact.
    pub fn save(&self, snapshots: &SnapshotMap) -> Result<(), AppError> {
        let file = SnapshotFile {
            version: SNAPSHOT_FORMAT_VERSION,
            stores: snapshots.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), stores = snapshots.len(), "saved snapshots");
        Ok(())
    }
}
