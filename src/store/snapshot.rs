//! Snapshot persistence
//!
//! The whole store is written as one JSON document preceded by a checksum
//! line:
//!
//! ```text
//! crc32:1a2b3c4d
//! {"format":1,"collections":[...],"associations":[...]}
//! ```
//!
//! Each collection carries its schema, so collections defined at runtime
//! survive a restart even when the configuration does not declare them.
//!
//! Writes go to a temporary file in the same directory, are synced, and are
//! then renamed over the target so a crash never leaves a torn snapshot.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{AssociationDef, CollectionSchema};

use super::errors::{StoreError, StoreResult};
use super::record::Record;

/// Current snapshot layout version
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Serialized state of one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionData {
    pub name: String,
    /// Schema in force when the snapshot was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<CollectionSchema>,
    /// Next id to hand out; ids of destroyed records are never reused
    pub next_id: u64,
    pub records: Vec<Record>,
}

/// Serialized state of the whole store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub format: u32,
    pub collections: Vec<CollectionData>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

impl SnapshotData {
    pub fn new(collections: Vec<CollectionData>, associations: Vec<AssociationDef>) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            collections,
            associations,
        }
    }
}

/// A snapshot file on disk
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the snapshot atomically.
    pub fn save(&self, data: &SnapshotData) -> StoreResult<()> {
        let body = serde_json::to_vec(data)
            .map_err(|e| StoreError::Storage(format!("failed to serialize snapshot: {}", e)))?;

        let mut contents = format_checksum(compute_checksum(&body)).into_bytes();
        contents.push(b'\n');
        contents.extend_from_slice(&body);

        atomic_write(&self.path, &contents)?;
        debug!(path = %self.path.display(), bytes = contents.len(), "snapshot written");
        Ok(())
    }

    /// Reads the snapshot, or `None` when no file exists yet.
    pub fn load(&self) -> StoreResult<Option<SnapshotData>> {
        if !self.exists() {
            return Ok(None);
        }

        let contents = fs::read(&self.path).map_err(|e| self.io_error(e))?;

        let newline = contents
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| self.corrupt("missing checksum line"))?;
        let (header, body) = (&contents[..newline], &contents[newline + 1..]);

        let header = std::str::from_utf8(header).map_err(|_| self.corrupt("checksum line is not UTF-8"))?;
        let expected = parse_checksum(header)
            .ok_or_else(|| self.corrupt(format!("malformed checksum '{}'", header)))?;
        let actual = compute_checksum(body);
        if expected != actual {
            return Err(self.corrupt(format!(
                "checksum mismatch: expected {}, computed {}",
                format_checksum(expected),
                format_checksum(actual)
            )));
        }

        let data: SnapshotData = serde_json::from_slice(body)
            .map_err(|e| self.corrupt(format!("invalid JSON: {}", e)))?;
        if data.format != SNAPSHOT_FORMAT {
            return Err(self.corrupt(format!("unsupported format {}", data.format)));
        }

        Ok(Some(data))
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::SnapshotIo {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, details: impl Into<String>) -> StoreError {
        StoreError::CorruptSnapshot {
            path: self.path.clone(),
            details: details.into(),
        }
    }
}

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Format: `crc32:XXXXXXXX` (lowercase hex, zero-padded)
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

/// Parses a `crc32:XXXXXXXX` string.
pub fn parse_checksum(s: &str) -> Option<u32> {
    let hex = s.trim().strip_prefix("crc32:")?;
    if hex.len() != 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Write to a temp file in the target directory, sync, then rename.
fn atomic_write(path: &Path, data: &[u8]) -> StoreResult<()> {
    let io_error = |source| StoreError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = File::create(&temp_path).map_err(io_error)?;
    file.write_all(data).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(io_error)?;
    Ok(())
}
