//! On-disk snapshots of a [`Store`].
//!
//! A snapshot is two co-located files:
//! - `vectors-<snapshot id>.bin`: binary header followed by contiguous
//!   little-endian f32 rows
//! - `metadata.json`: the record list plus the snapshot header, naming the
//!   vector file it belongs to
//!
//! # Vector file format
//!
//! | bytes  | field                          |
//! |--------|--------------------------------|
//! | 0..4   | magic `MVEC`                   |
//! | 4..8   | format version (u32 LE)        |
//! | 8..12  | dimension (u32 LE)             |
//! | 12..20 | vector count (u64 LE)          |
//! | 20..36 | snapshot id (UUID bytes)       |
//! | 36..   | `count * dimension` f32 LE     |
//!
//! Every save gets a fresh snapshot id. The vector file is written under a
//! name no committed snapshot uses, then `metadata.json` is replaced by a
//! single rename. That rename is the commit point: until it happens, load
//! still follows the old metadata to the old vector file. Superseded vector
//! files are pruned only after the commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::records::RecordStore;
use crate::store::Store;
use crate::types::VectorMetadata;
use crate::vector_index::FlatIndex;
use minutes_core::{AppError, AppResult};

pub const METADATA_FILE: &str = "metadata.json";

const VECTORS_PREFIX: &str = "vectors-";
const VECTORS_SUFFIX: &str = ".bin";

/// Current snapshot format version.
const FORMAT_VERSION: u32 = 1;

const MAGIC_BYTES: &[u8; 4] = b"MVEC";

const HEADER_SIZE: usize = 36;

const BYTES_PER_F32: usize = 4;

/// Header fields shared by both files of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub snapshot_id: Uuid,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile<'a> {
    version: u32,
    snapshot_id: Uuid,
    dimension: usize,
    saved_at: DateTime<Utc>,
    records: Cow<'a, [VectorMetadata]>,
}

/// Location of a store's snapshot files.
#[derive(Debug, Clone)]
pub struct StoreFiles {
    dir: PathBuf,
}

impl StoreFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Vector file of the snapshot with the given id.
    pub fn vectors_path(&self, snapshot_id: Uuid) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", VECTORS_PREFIX, snapshot_id, VECTORS_SUFFIX))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Whether a committed snapshot is present.
    pub fn exists(&self) -> bool {
        self.metadata_path().exists()
    }

    /// Every vector file in the directory, committed or not, including
    /// leftover temp files.
    pub fn vector_files(&self) -> AppResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_vector_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| {
                    name.starts_with(VECTORS_PREFIX) && name.contains(VECTORS_SUFFIX)
                });
            if is_vector_file {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Persist the store, replacing the previous snapshot.
    ///
    /// An empty store has nothing to persist: the snapshot is removed so a
    /// later load starts from scratch.
    pub fn save(&self, store: &Store) -> AppResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to create store directory {:?}: {}", self.dir, e),
            )
        })?;

        let Some(dimension) = store.dimension().filter(|_| !store.is_empty()) else {
            self.remove()?;
            tracing::debug!("Store is empty, removed snapshot at {:?}", self.dir);
            return Ok(());
        };

        let header = SnapshotHeader {
            snapshot_id: Uuid::new_v4(),
            dimension,
            count: store.len(),
        };

        let vectors = encode_vectors(&header, store.index())?;
        let metadata = serde_json::to_vec_pretty(&MetadataFile {
            version: FORMAT_VERSION,
            snapshot_id: header.snapshot_id,
            dimension,
            saved_at: Utc::now(),
            records: Cow::Borrowed(store.records().as_slice()),
        })?;

        let vectors_path = self.vectors_path(header.snapshot_id);
        write_atomic(&vectors_path, &vectors)?;

        if let Err(e) = write_atomic(&self.metadata_path(), &metadata) {
            let _ = fs::remove_file(&vectors_path);
            return Err(e);
        }

        if let Err(e) = self.prune_vector_files(Some(&vectors_path)) {
            tracing::warn!(
                "Snapshot {} saved, but superseded vector files remain in {:?}: {}",
                header.snapshot_id,
                self.dir,
                e
            );
        }

        tracing::info!(
            "Saved {} vectors (dimension {}) to {:?} [snapshot {}]",
            header.count,
            header.dimension,
            self.dir,
            header.snapshot_id
        );
        Ok(())
    }

    /// Load the committed snapshot, if one exists.
    ///
    /// `expected_dimension` is the dimension of the embeddings in use; a
    /// snapshot built with a different one fails with `DimensionMismatch`.
    pub fn load(&self, expected_dimension: Option<usize>) -> AppResult<Option<Store>> {
        let metadata_path = self.metadata_path();
        if !metadata_path.exists() {
            tracing::debug!("No snapshot found at {:?}", self.dir);
            return Ok(None);
        }

        let metadata_bytes = fs::read(&metadata_path)?;
        let metadata: MetadataFile<'static> = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| AppError::CorruptStore(format!("Unreadable {}: {}", METADATA_FILE, e)))?;

        if metadata.version > FORMAT_VERSION {
            return Err(AppError::CorruptStore(format!(
                "Snapshot version {} is newer than supported version {}",
                metadata.version, FORMAT_VERSION
            )));
        }

        let vectors_path = self.vectors_path(metadata.snapshot_id);
        let vector_bytes = match fs::read(&vectors_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::CorruptStore(format!(
                    "Snapshot {} is missing its vector file {:?}",
                    metadata.snapshot_id, vectors_path
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let (header, index) = decode_vectors(&vector_bytes)?;

        if header.snapshot_id != metadata.snapshot_id {
            return Err(AppError::CorruptStore(format!(
                "Snapshot id mismatch: vectors {} vs metadata {}",
                header.snapshot_id, metadata.snapshot_id
            )));
        }

        if header.dimension != metadata.dimension {
            return Err(AppError::CorruptStore(format!(
                "Dimension disagreement: vectors {} vs metadata {}",
                header.dimension, metadata.dimension
            )));
        }

        if let Some(expected) = expected_dimension {
            if expected != header.dimension {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: header.dimension,
                });
            }
        }

        let records = RecordStore::from_records(metadata.records.into_owned());
        let store = Store::from_parts(index, records)?;

        tracing::info!(
            "Loaded {} vectors (dimension {}) from {:?}",
            store.len(),
            header.dimension,
            self.dir
        );
        Ok(Some(store))
    }

    /// Delete the snapshot. The metadata file goes first, so an interrupted
    /// removal leaves no committed snapshot behind.
    pub fn remove(&self) -> AppResult<()> {
        match fs::remove_file(self.metadata_path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.prune_vector_files(None)
    }

    /// Delete every vector file except `keep`.
    fn prune_vector_files(&self, keep: Option<&Path>) -> AppResult<()> {
        for path in self.vector_files()? {
            if keep == Some(path.as_path()) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed vector file {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Write bytes to `<path>.tmp`, flush them to disk, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let write = || -> io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::Io(io::Error::new(
            e.kind(),
            format!("Failed to write {:?}: {}", path, e),
        ))
    })
}

fn encode_vectors(header: &SnapshotHeader, index: &FlatIndex) -> AppResult<Vec<u8>> {
    let dimension = u32::try_from(header.dimension).map_err(|_| {
        AppError::InvalidRequest(format!("Dimension {} does not fit the format", header.dimension))
    })?;

    let values = index.as_slice();
    let mut out = Vec::with_capacity(HEADER_SIZE + values.len() * BYTES_PER_F32);
    out.extend_from_slice(MAGIC_BYTES);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&dimension.to_le_bytes());
    out.extend_from_slice(&(header.count as u64).to_le_bytes());
    out.extend_from_slice(header.snapshot_id.as_bytes());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

fn decode_vectors(bytes: &[u8]) -> AppResult<(SnapshotHeader, FlatIndex)> {
    if bytes.len() < HEADER_SIZE {
        return Err(AppError::CorruptStore(format!(
            "Vector file is truncated ({} bytes)",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC_BYTES {
        return Err(AppError::CorruptStore(
            "Vector file has an unknown format".to_string(),
        ));
    }

    let version = read_u32(&bytes[4..8]);
    if version != FORMAT_VERSION {
        return Err(AppError::CorruptStore(format!(
            "Vector file version {} is not supported (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let dimension = read_u32(&bytes[8..12]) as usize;
    let count = read_u64(&bytes[12..20]) as usize;
    let snapshot_id = Uuid::from_slice(&bytes[20..36])
        .map_err(|e| AppError::CorruptStore(format!("Bad snapshot id: {}", e)))?;

    let expected_len = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(BYTES_PER_F32))
        .and_then(|n| n.checked_add(HEADER_SIZE));
    if dimension == 0 || expected_len != Some(bytes.len()) {
        return Err(AppError::CorruptStore(format!(
            "Vector file holds {} bytes, header describes {} vectors of dimension {}",
            bytes.len(),
            count,
            dimension
        )));
    }

    let mut index = FlatIndex::with_dimension(dimension);
    let mut row = Vec::with_capacity(dimension);
    for chunk in bytes[HEADER_SIZE..].chunks_exact(BYTES_PER_F32 * dimension) {
        row.clear();
        row.extend(
            chunk
                .chunks_exact(BYTES_PER_F32)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
        index.add(&row)?;
    }

    Ok((
        SnapshotHeader {
            snapshot_id,
            dimension,
            count,
        },
        index,
    ))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
