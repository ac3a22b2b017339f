//! Durable state collaborator
//!
//! The ledger is an in-memory state machine; a [`StateStore`] loads its
//! [`LedgerState`] at startup and saves it after every committed mutation.
//!
//! # Snapshot format
//!
//! [`SnapshotStore`] writes a single bincode envelope:
//!
//! - `version` - format version, currently `1`
//! - `checksum` - blake3 hash of the encoded state
//! - `state` - bincode-encoded [`LedgerState`]
//!
//! Writes go to `<path>.tmp` and are renamed over the live file, so a crash
//! mid-write leaves the previous snapshot intact.

use crate::{
    error::{Error, Result},
    types::LedgerState,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Snapshot format version
const SNAPSHOT_VERSION: u32 = 1;

/// Load/save of the complete ledger state
pub trait StateStore: Send + Sync {
    /// Last saved state, `None` when nothing was ever saved
    fn load(&self) -> Result<Option<LedgerState>>;

    /// Persist `state`, replacing any previous save
    fn save(&self, state: &LedgerState) -> Result<()>;
}

/// Volatile store, for tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Option<LedgerState>>,
}

impl MemoryStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<LedgerState>> {
        Ok(self.state.read().clone())
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        *self.state.write() = Some(state.clone());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotEnvelope {
    version: u32,
    checksum: [u8; 32],
    state: Vec<u8>,
}

/// Checksummed single-file snapshot
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    // Serializes writers sharing this store
    write_lock: RwLock<()>,
}

impl SnapshotStore {
    /// Store backed by the file at `path`; parent directories are created
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "Opened snapshot store");
        Ok(Self {
            path,
            write_lock: RwLock::new(()),
        })
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateStore for SnapshotStore {
    fn load(&self) -> Result<Option<LedgerState>> {
        let _guard = self.write_lock.read();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: SnapshotEnvelope = bincode::deserialize(&bytes)
            .map_err(|e| Error::Corrupted(format!("Unreadable envelope: {}", e)))?;

        if envelope.version != SNAPSHOT_VERSION {
            return Err(Error::Corrupted(format!(
                "Unsupported snapshot version {}",
                envelope.version
            )));
        }

        if *blake3::hash(&envelope.state).as_bytes() != envelope.checksum {
            return Err(Error::Corrupted("Checksum mismatch".to_string()));
        }

        let state: LedgerState = bincode::deserialize(&envelope.state)?;

        tracing::debug!(
            path = %self.path.display(),
            sequence = state.sequence,
            "Snapshot loaded"
        );
        Ok(Some(state))
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        let _guard = self.write_lock.write();

        let encoded = bincode::serialize(state)?;
        let envelope = SnapshotEnvelope {
            version: SNAPSHOT_VERSION,
            checksum: *blake3::hash(&encoded).as_bytes(),
            state: encoded,
        };
        let bytes = bincode::serialize(&envelope)?;

        let tmp = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Storage(format!("Failed to replace snapshot: {}", e)))?;

        tracing::debug!(
            path = %self.path.display(),
            sequence = state.sequence,
            bytes = bytes.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}
