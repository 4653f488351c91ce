// Registry fixtures backed by a temporary directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use fresh_syntaxes::config::RegistryConfig;
use fresh_syntaxes::model::definition::Definition;
use fresh_syntaxes::model::filesystem::StdFileSystem;
use fresh_syntaxes::registry::{BundledLayer, SyntaxRegistry};

/// A registry over the built-in bundle and a fresh user directory
pub struct RegistryFixture {
    temp_dir: TempDir,
    pub registry: Arc<SyntaxRegistry>,
}

impl RegistryFixture {
    /// Registry with an empty (missing) user directory
    pub fn new() -> std::io::Result<Self> {
        Self::with_user_files(&[])
    }

    /// Registry whose user directory holds `(file name, content)` files
    pub fn with_user_files(files: &[(&str, &str)]) -> std::io::Result<Self> {
        super::tracing::init_tracing_from_env();

        let temp_dir = tempfile::tempdir()?;
        let user_dir = temp_dir.path().join("syntaxes");
        if !files.is_empty() {
            fs::create_dir_all(&user_dir)?;
        }
        for (name, content) in files {
            fs::write(user_dir.join(name), content)?;
        }

        let bundled = BundledLayer::embedded()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let registry = SyntaxRegistry::new(
            Arc::new(StdFileSystem),
            bundled,
            user_dir,
            &RegistryConfig::default(),
        );

        Ok(Self {
            temp_dir,
            registry: Arc::new(registry),
        })
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the user file for `stem`
    pub fn user_file(&self, stem: &str) -> PathBuf {
        self.registry.user_dir().join(format!("{stem}.yml"))
    }

    /// Names of the files currently in the user directory, sorted
    pub fn user_dir_listing(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.registry.user_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Small user-defined syntax
pub fn definition_with(extensions: &[&str], filenames: &[&str], interpreters: &[&str]) -> Definition {
    Definition {
        extensions: extensions.iter().map(|s| s.to_string()).collect(),
        filenames: filenames.iter().map(|s| s.to_string()).collect(),
        interpreters: interpreters.iter().map(|s| s.to_string()).collect(),
        ..Definition::default()
    }
}
