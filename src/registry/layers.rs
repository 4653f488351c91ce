//! The two layers syntaxes are resolved from.
//!
//! - `BundledLayer`: read-only syntaxes shipped with the editor, described by a
//!   `SyntaxMap.json` manifest. Either embedded in the binary, read from a
//!   directory, or supplied in memory by the host.
//! - `UserLayer`: one YAML file per user-defined or user-overridden syntax in
//!   the user syntaxes directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::codec;
use super::error::SyntaxError;
use super::mapping::MappingSnapshot;
use crate::model::definition::{caseless_cmp, Definition};
use crate::model::filesystem::FileSystem;

/// Name of the bundled manifest file
pub const MANIFEST_FILENAME: &str = "SyntaxMap.json";

/// Embedded manifest
pub const EMBEDDED_MANIFEST: &str = include_str!("../../syntaxes/SyntaxMap.json");

/// Embedded syntax files, keyed by syntax name
pub const EMBEDDED_SYNTAXES: &[(&str, &str)] = &[
    ("JSON", include_str!("../../syntaxes/JSON.yml")),
    ("Makefile", include_str!("../../syntaxes/Makefile.yml")),
    ("Markdown", include_str!("../../syntaxes/Markdown.yml")),
    ("Python", include_str!("../../syntaxes/Python.yml")),
    ("Shell Script", include_str!("../../syntaxes/Shell Script.yml")),
    ("XML", include_str!("../../syntaxes/XML.yml")),
];

enum BundleSource {
    Embedded,
    Directory(PathBuf),
    Memory(HashMap<String, Definition>),
}

/// Read-only syntaxes shipped with the application.
pub struct BundledLayer {
    manifest: HashMap<String, MappingSnapshot>,
    source: BundleSource,
}

impl BundledLayer {
    /// Bundle compiled into the binary.
    pub fn embedded() -> Result<Self, SyntaxError> {
        let manifest = codec::parse_manifest(EMBEDDED_MANIFEST.as_bytes())?;
        tracing::debug!("Loaded embedded syntax manifest with {} entries", manifest.len());
        Ok(Self {
            manifest,
            source: BundleSource::Embedded,
        })
    }

    /// Bundle stored in `dir` as `SyntaxMap.json` plus `<name>.yml` files.
    pub fn from_dir(fs: &dyn FileSystem, dir: &Path) -> Result<Self, SyntaxError> {
        let manifest_path = dir.join(MANIFEST_FILENAME);
        let bytes = fs
            .read_file(&manifest_path)
            .map_err(|e| SyntaxError::io(&manifest_path, e))?;
        let manifest = codec::parse_manifest(&bytes)?;
        tracing::info!(
            "Loaded syntax manifest from {} ({} syntaxes)",
            manifest_path.display(),
            manifest.len()
        );
        Ok(Self {
            manifest,
            source: BundleSource::Directory(dir.to_path_buf()),
        })
    }

    /// Bundle built from in-memory definitions. The manifest is derived from
    /// each definition's associations.
    pub fn from_definitions(definitions: impl IntoIterator<Item = (String, Definition)>) -> Self {
        let definitions: HashMap<String, Definition> = definitions.into_iter().collect();
        let manifest = definitions
            .iter()
            .map(|(name, definition)| (name.clone(), definition.mapping()))
            .collect();
        Self {
            manifest,
            source: BundleSource::Memory(definitions),
        }
    }

    /// Whether `name` is a bundled syntax.
    pub fn contains(&self, name: &str) -> bool {
        self.manifest.contains_key(name)
    }

    /// Bundled names, sorted case-insensitively.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.manifest.keys().cloned().collect();
        names.sort_by(|a, b| caseless_cmp(a, b));
        names
    }

    /// The manifest snapshots.
    pub fn snapshots(&self) -> &HashMap<String, MappingSnapshot> {
        &self.manifest
    }

    /// Load the bundled definition of `name`.
    pub fn load(&self, fs: &dyn FileSystem, name: &str) -> Result<Definition, SyntaxError> {
        if !self.contains(name) {
            return Err(SyntaxError::NotFound(name.to_string()));
        }

        let parsed = match &self.source {
            BundleSource::Embedded => {
                let (_, text) = EMBEDDED_SYNTAXES
                    .iter()
                    .find(|(embedded, _)| *embedded == name)
                    .ok_or_else(|| SyntaxError::NotFound(name.to_string()))?;
                codec::parse_definition(text.as_bytes())
            }
            BundleSource::Directory(dir) => {
                let path = dir.join(format!("{}.{}", name, UserLayer::EXTENSION));
                let bytes = fs.read_file(&path).map_err(|e| SyntaxError::io(&path, e))?;
                codec::parse_definition(&bytes)
            }
            BundleSource::Memory(definitions) => {
                return definitions
                    .get(name)
                    .cloned()
                    .ok_or_else(|| SyntaxError::NotFound(name.to_string()));
            }
        };

        parsed.map_err(|source| SyntaxError::LoadFailed {
            name: name.to_string(),
            source,
        })
    }
}

/// Turn a syntax name into a safe file stem.
///
/// Path separators become `_` and leading dots are stripped so a name can
/// never escape the syntaxes directory or produce a hidden file.
pub fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    stem.trim_start_matches('.').to_string()
}

/// User-writable syntaxes directory.
#[derive(Debug, Clone)]
pub struct UserLayer {
    dir: PathBuf,
}

impl UserLayer {
    /// Canonical extension of syntax files
    pub const EXTENSION: &'static str = "yml";
    /// Older extension, renamed to the canonical one on startup
    pub const LEGACY_EXTENSION: &'static str = "yaml";

    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `name` in this layer.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem_for(name), Self::EXTENSION))
    }

    /// List `(name, path)` for every syntax file in the directory.
    ///
    /// A missing directory is an empty layer.
    pub fn scan(&self, fs: &dyn FileSystem) -> Vec<(String, PathBuf)> {
        let entries = match fs.read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read syntaxes directory {:?}: {}", self.dir, e);
                return Vec::new();
            }
        };

        let mut files: Vec<(String, PathBuf)> = entries
            .into_iter()
            .filter(|entry| entry.is_file() && entry.extension() == Some(Self::EXTENSION))
            .filter_map(|entry| {
                let stem = entry.stem()?;
                if stem.is_empty() || stem.starts_with('.') {
                    return None;
                }
                Some((stem.to_string(), entry.path))
            })
            .collect();
        files.sort_by(|a, b| caseless_cmp(&a.0, &b.0));
        files
    }

    /// Rename `*.yaml` files to `*.yml`, best-effort.
    ///
    /// Files whose canonical counterpart already exists are left alone, and
    /// individual failures are logged and skipped. Returns the number of files
    /// migrated.
    pub fn migrate_legacy(&self, fs: &dyn FileSystem) -> usize {
        let Ok(entries) = fs.read_dir(&self.dir) else {
            return 0;
        };

        let mut migrated = 0;
        for entry in entries {
            if !entry.is_file() || entry.extension() != Some(Self::LEGACY_EXTENSION) {
                continue;
            }
            let target = entry.path.with_extension(Self::EXTENSION);
            if fs.exists(&target) {
                tracing::warn!(
                    "Not migrating {:?}: {:?} already exists",
                    entry.path,
                    target
                );
                continue;
            }
            match fs.rename(&entry.path, &target) {
                Ok(()) => {
                    tracing::info!("Migrated syntax file {:?} -> {:?}", entry.path, target);
                    migrated += 1;
                }
                Err(e) => tracing::warn!("Failed to migrate {:?}: {}", entry.path, e),
            }
        }
        migrated
    }
}
