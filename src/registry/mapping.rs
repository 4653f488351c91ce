//! Mapping snapshots: the association tokens of each syntax.
//!
//! Snapshots are loaded straight from syntax files without building the full
//! definition, which keeps index rebuilds cheap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use super::codec;
use crate::model::filesystem::FileSystem;

/// The three kinds of detection tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Extension,
    Filename,
    Interpreter,
}

impl MappingKind {
    pub const ALL: [MappingKind; 3] = [
        MappingKind::Extension,
        MappingKind::Filename,
        MappingKind::Interpreter,
    ];
}

/// Filenames, extensions and interpreters declared by one syntax.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingSnapshot {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub interpreters: Vec<String>,
}

impl MappingSnapshot {
    /// Tokens of one kind.
    pub fn tokens(&self, kind: MappingKind) -> &[String] {
        match kind {
            MappingKind::Extension => &self.extensions,
            MappingKind::Filename => &self.filenames,
            MappingKind::Interpreter => &self.interpreters,
        }
    }
}

/// Result of loading snapshots from a batch of files.
#[derive(Debug, Default)]
pub struct SnapshotBatch {
    /// Successfully loaded snapshots keyed by syntax name
    pub snapshots: HashMap<String, MappingSnapshot>,
    /// Files that could not be read or parsed
    pub skipped: Vec<PathBuf>,
}

/// Load snapshots for `(name, path)` pairs.
///
/// Unreadable or malformed files are skipped rather than failing the batch;
/// their paths are collected in `skipped` for callers that want to report them.
pub fn load_snapshots(fs: &dyn FileSystem, files: &[(String, PathBuf)]) -> SnapshotBatch {
    let mut batch = SnapshotBatch::default();

    for (name, path) in files {
        let snapshot = fs
            .read_file(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| codec::parse_mapping(&bytes).map_err(|e| e.to_string()));

        match snapshot {
            Ok(snapshot) => {
                batch.snapshots.insert(name.clone(), snapshot);
            }
            Err(e) => {
                tracing::warn!("Skipping syntax file {:?}: {}", path, e);
                batch.skipped.push(path.clone());
            }
        }
    }

    batch
}
