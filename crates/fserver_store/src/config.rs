//! Server configuration.
//!
//! Resolved once by the binary at startup and handed to every component.
//! Nothing below this module reads the environment.

use crate::error::{Result, StoreError};
use crate::ingest::{BINARY_UPLOAD_DIR, RUN_UPLOAD_DIR, TEST_UPLOAD_DIR};
use crate::requests::DEFAULT_REQUEST_TIMEOUT_HOURS;
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the server home directory.
pub const HOME_ENV: &str = "FSERVER_HOME";
/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "FSERVER_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the server home directory.
///
/// Priority:
/// 1) FSERVER_HOME
/// 2) HOME (via `dirs`)/.fserver
/// 3) ./.fserver
pub fn fserver_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .map(|home| home.join(".fserver"))
        .unwrap_or_else(|| PathBuf::from(".").join(".fserver"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root of the record collections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root of uploaded bundles and run artifact trees
    #[serde(default = "default_files_dir")]
    pub files_dir: PathBuf,

    /// URL of the action endpoint, used for links in `show` pages
    #[serde(default = "default_url_base")]
    pub url_base: String,

    /// URL under which `files_dir` is served
    #[serde(default = "default_files_url_base")]
    pub files_url_base: String,

    /// Running requests older than this are forced to error
    #[serde(default = "default_request_timeout_hours")]
    pub request_timeout_hours: i64,
}

fn default_data_dir() -> PathBuf {
    fserver_home().join("data")
}

fn default_files_dir() -> PathBuf {
    fserver_home().join("files")
}

fn default_url_base() -> String {
    "/cgi-bin/fserver".to_string()
}

fn default_files_url_base() -> String {
    "/fserver-files".to_string()
}

fn default_request_timeout_hours() -> i64 {
    DEFAULT_REQUEST_TIMEOUT_HOURS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::rooted_at(&fserver_home())
    }
}

impl ServerConfig {
    /// Default configuration with both trees under `home`.
    pub fn rooted_at(home: &Path) -> Self {
        Self {
            data_dir: home.join("data"),
            files_dir: home.join("files"),
            url_base: default_url_base(),
            files_url_base: default_files_url_base(),
            request_timeout_hours: default_request_timeout_hours(),
        }
    }

    /// Load configuration from a TOML file. Relative directories are taken
    /// relative to the file's own directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: ServerConfig = toml::from_str(&content)
            .map_err(|e| StoreError::Config(format!("Invalid {}: {}", path.display(), e)))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        if config.data_dir.is_relative() {
            config.data_dir = base.join(&config.data_dir);
        }
        if config.files_dir.is_relative() {
            config.files_dir = base.join(&config.files_dir);
        }
        if config.request_timeout_hours <= 0 {
            return Err(StoreError::Config(format!(
                "request_timeout_hours must be positive, got {}",
                config.request_timeout_hours
            )));
        }
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the configuration for this invocation.
    ///
    /// Priority:
    /// 1) `explicit` (the `--config` flag)
    /// 2) FSERVER_CONFIG
    /// 3) `<fserver_home>/config.toml`, if present
    /// 4) defaults rooted at `fserver_home()`
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            debug!("Using config {}", path.display());
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            debug!("Using config from {}: {}", CONFIG_ENV, path);
            return Self::load(Path::new(&path));
        }
        let home = fserver_home();
        let candidate = home.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!("Using config {}", candidate.display());
            return Self::load(&candidate);
        }
        Ok(Self::rooted_at(&home))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn request_timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(self.request_timeout_hours)
    }

    /// Create the data collections and the upload directories.
    pub fn ensure_layout(&self) -> Result<RecordStore> {
        let store = RecordStore::open(&self.data_dir)?;
        for sub_dir in [TEST_UPLOAD_DIR, RUN_UPLOAD_DIR, BINARY_UPLOAD_DIR] {
            fs::create_dir_all(self.files_dir.join(sub_dir))?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Collection;
    use tempfile::TempDir;

    #[test]
    fn test_rooted_defaults() {
        let config = ServerConfig::rooted_at(Path::new("/srv/fuego"));
        assert_eq!(config.data_dir, PathBuf::from("/srv/fuego/data"));
        assert_eq!(config.files_dir, PathBuf::from("/srv/fuego/files"));
        assert_eq!(config.request_timeout_hours, 12);
        assert_eq!(config.request_timeout(), chrono::Duration::hours(12));
    }

    #[test]
    fn test_load_resolves_relative_dirs() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"d\"\nfiles_dir = \"/abs/files\"\nrequest_timeout_hours = 6\n",
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, temp.path().join("d"));
        assert_eq!(config.files_dir, PathBuf::from("/abs/files"));
        assert_eq!(config.request_timeout_hours, 6);
        assert_eq!(config.url_base, "/cgi-bin/fserver");
    }

    #[test]
    fn test_load_rejects_bad_timeout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "request_timeout_hours = 0\n").unwrap();
        assert!(matches!(
            ServerConfig::load(&path),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::rooted_at(temp.path());
        let path = temp.path().join("etc").join("config.toml");
        config.save(&path).unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_explicit_config_wins() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(&path, "url_base = \"/x\"\n").unwrap();
        let config = ServerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.url_base, "/x");
    }

    #[test]
    fn test_ensure_layout() {
        let temp = TempDir::new().unwrap();
        let config = ServerConfig::rooted_at(temp.path());
        let store = config.ensure_layout().unwrap();
        for c in Collection::ALL {
            assert!(store.collection_dir(c).is_dir());
        }
        for sub in ["tests", "runs", "binary-packages"] {
            assert!(temp.path().join("files").join(sub).is_dir());
        }
    }
}
