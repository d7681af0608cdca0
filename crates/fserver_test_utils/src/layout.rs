//! Throwaway server trees.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary server home with `data/` and `files/` inside. Removed on
/// drop.
pub struct TestLayout {
    temp: TempDir,
}

impl TestLayout {
    pub fn new() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("fserver-test-")
            .tempdir()
            .context("Failed to create temporary server home")?;
        Ok(Self { temp })
    }

    pub fn home(&self) -> &Path {
        self.temp.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.home().join("data")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.home().join("files")
    }

    /// Write `<home>/config.toml` pointing at this layout, with `extra`
    /// TOML lines appended.
    pub fn write_config(&self, extra: &str) -> Result<PathBuf> {
        let path = self.home().join("config.toml");
        let content = format!(
            "data_dir = {:?}\nfiles_dir = {:?}\n{}",
            self.data_dir().display().to_string(),
            self.files_dir().display().to_string(),
            extra
        );
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Write an arbitrary bundle file into the home, for CLI uploads.
    pub fn write_bundle(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dir = self.home().join("outgoing");
        fs::create_dir_all(&dir)?;
        let path = dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
