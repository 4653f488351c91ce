//! Runtime directory detection.
//!
//! Only the top-level binary should call `DirectoryContext::from_system`; all
//! other code receives the context by construction so tests can point every
//! path at a temp directory.

use std::path::PathBuf;

use crate::config::RegistryConfig;

/// Directory paths for syntax settings and logs
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    /// Data directory for logs and other persistent state
    /// e.g., ~/.local/share/fresh on Linux, ~/Library/Application Support/fresh on macOS
    pub data_dir: PathBuf,

    /// Config directory for user configuration
    /// e.g., ~/.config/fresh on Linux, ~/Library/Application Support/fresh on macOS
    pub config_dir: PathBuf,
}

impl DirectoryContext {
    /// Create a DirectoryContext from the system directories
    /// This should ONLY be called from main()
    pub fn from_system() -> std::io::Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine data directory",
                )
            })?
            .join("fresh");

        #[allow(unused_mut)] // mut needed on macOS only
        let mut config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine config directory",
                )
            })?
            .join("fresh");

        // macOS: Prioritize ~/.config/fresh if it exists
        #[cfg(target_os = "macos")]
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("fresh");
            if xdg_config.exists() {
                config_dir = xdg_config;
            }
        }

        Ok(Self {
            data_dir,
            config_dir,
        })
    }

    /// Create a DirectoryContext for testing with a temp directory
    pub fn for_testing(temp_dir: &std::path::Path) -> Self {
        Self {
            data_dir: temp_dir.join("data"),
            config_dir: temp_dir.join("config"),
        }
    }

    /// User syntaxes directory
    pub fn syntaxes_dir(&self) -> PathBuf {
        self.config_dir.join("syntaxes")
    }

    /// Registry config file path
    pub fn registry_config_path(&self) -> PathBuf {
        self.config_dir.join(RegistryConfig::FILENAME)
    }

    /// Default log file path
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("syntaxes.log")
    }
}
