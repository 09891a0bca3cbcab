//! Checkpoint persistence collaborators.
//!
//! Metric state is persisted as named scalars. Every scalar is stored as
//! its 8-byte little-endian representation so that `f64` values round-trip
//! bit-exactly, including negative zero and NaN payloads.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::error::{MetricError, MetricResult};

/// Named scalar storage used by checkpoint save and restore.
pub trait Persist {
    fn write_f64(&mut self, name: &str, value: f64) -> MetricResult<()>;
    fn write_u64(&mut self, name: &str, value: u64) -> MetricResult<()>;
    fn read_f64(&mut self, name: &str) -> MetricResult<f64>;
    fn read_u64(&mut self, name: &str) -> MetricResult<u64>;
}

fn decode_word(name: &str, bytes: &[u8]) -> MetricResult<[u8; 8]> {
    bytes
        .try_into()
        .map_err(|_| MetricError::CheckpointCorrupt {
            name: name.to_string(),
            reason: format!("expected 8 bytes, found {}", bytes.len()),
        })
}

/// In-memory persistence, mainly for tests and for staging checkpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPersist {
    records: BTreeMap<String, [u8; 8]>,
}

impl MemoryPersist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes stored under `name`.
    pub fn get(&self, name: &str) -> Option<&[u8; 8]> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    fn read(&self, name: &str) -> MetricResult<[u8; 8]> {
        self.records
            .get(name)
            .copied()
            .ok_or_else(|| MetricError::CheckpointMissing {
                name: name.to_string(),
            })
    }
}

impl Persist for MemoryPersist {
    fn write_f64(&mut self, name: &str, value: f64) -> MetricResult<()> {
        self.records.insert(name.to_string(), value.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, name: &str, value: u64) -> MetricResult<()> {
        self.records.insert(name.to_string(), value.to_le_bytes());
        Ok(())
    }

    fn read_f64(&mut self, name: &str) -> MetricResult<f64> {
        self.read(name).map(f64::from_le_bytes)
    }

    fn read_u64(&mut self, name: &str) -> MetricResult<u64> {
        self.read(name).map(u64::from_le_bytes)
    }
}

/// Directory-backed persistence: one 8-byte file per record.
#[derive(Debug, Clone)]
pub struct FilePersist {
    dir: PathBuf,
}

impl FilePersist {
    /// Uses `dir` as-is; records fail to write if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates `dir` (and its parents) before using it.
    pub fn create(dir: impl Into<PathBuf>) -> MetricResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| MetricError::CheckpointIo {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bin"))
    }

    fn write(&self, name: &str, bytes: [u8; 8]) -> MetricResult<()> {
        let path = self.record_path(name);
        fs::write(&path, bytes).map_err(|source| MetricError::CheckpointIo { path, source })
    }

    fn read(&self, name: &str) -> MetricResult<[u8; 8]> {
        let path = self.record_path(name);
        match fs::read(&path) {
            Ok(bytes) => decode_word(name, &bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(MetricError::CheckpointMissing {
                name: name.to_string(),
            }),
            Err(source) => Err(MetricError::CheckpointIo { path, source }),
        }
    }
}

impl Persist for FilePersist {
    fn write_f64(&mut self, name: &str, value: f64) -> MetricResult<()> {
        self.write(name, value.to_le_bytes())
    }

    fn write_u64(&mut self, name: &str, value: u64) -> MetricResult<()> {
        self.write(name, value.to_le_bytes())
    }

    fn read_f64(&mut self, name: &str) -> MetricResult<f64> {
        self.read(name).map(f64::from_le_bytes)
    }

    fn read_u64(&mut self, name: &str) -> MetricResult<u64> {
        self.read(name).map(u64::from_le_bytes)
    }
}
