//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\savora-cook\
//!   macOS:   ~/Library/Application Support/savora-cook/
//!   Linux:   ~/.config/savora-cook/
//!
//! Data dir (recipes):
//!   Windows: %LOCALAPPDATA%\savora-cook\
//!   macOS:   ~/Library/Application Support/savora-cook/
//!   Linux:   ~/.local/share/savora-cook/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory searched for recipe files given by bare name on the CLI.
    pub recipes_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "savora-cook";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            recipes_dir: data_dir.join("recipes"),
        }
    }

    /// Resolve a recipe argument.
    ///
    /// Paths that exist as given are returned unchanged; anything else is
    /// looked up inside [`recipes_dir`](Self::recipes_dir).
    pub fn resolve_recipe(&self, name: &Path) -> PathBuf {
        if name.exists() || name.is_absolute() {
            return name.to_path_buf();
        }
        self.recipes_dir.join(name)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
