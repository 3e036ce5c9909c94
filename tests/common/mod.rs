//! Common test utilities for kconfig-header integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read the
//! user's `~/.config/kconfig-header/config.kdl` or inherit Kconfig
//! environment variables.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated working tree.
///
/// - `work_dir`: holds the schema, values and generated header
/// - `config_dir`: stands in for the user config directory (via `XDG_CONFIG_HOME`)
pub struct TestEnv {
    pub work_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the kconfig-header binary.
    ///
    /// Runs in the work directory with a private config directory and the
    /// settings variables cleared.
    pub fn kh(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kconfig-header"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_dir.path());
        cmd.env("HOME", self.config_dir.path());
        cmd.env_remove("CONFIG_");
        cmd.env_remove("srctree");
        cmd.env_remove("KCONFIG_HEADER_COMMENT");
        cmd.env_remove("KCONFIG_HEADER_LOG");
        cmd
    }

    /// Write `content` to `name` under the work directory, creating parents.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.work_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Read a file under the work directory.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.work_dir.path().join(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.work_dir.path().join(name).exists()
    }

    /// Write the default settings file under the private config directory.
    pub fn write_user_settings(&self, content: &str) -> PathBuf {
        let dir = self.config_dir.path().join("kconfig-header");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.kdl");
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
