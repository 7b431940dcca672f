//! Handle fixtures and package seeding helpers.
//!
//! Provides a temporary filesystem root plus db path pair and convenience
//! functions for seeding fixture packages into a handle's local database.

use palpm_core::Handle;
use std::path::Path;
use tempfile::TempDir;

/// A temporary root/dbpath pair with automatic cleanup.
pub struct FixtureRoot {
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl FixtureRoot {
    /// Creates the directory layout a handle expects: a root with a
    /// `var/lib/pacman/` database path inside it.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(temp_dir.path().join("var/lib/pacman"))
            .expect("Failed to create db path");
        Self { temp_dir }
    }

    /// The filesystem root to initialize the handle with.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The database path inside the root.
    pub fn dbpath(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("var/lib/pacman")
    }

    /// Opens a handle on this fixture.
    pub fn open_handle(&self) -> Handle {
        let root = self.root().to_str().expect("utf-8 root");
        let dbpath = self.dbpath();
        let dbpath = dbpath.to_str().expect("utf-8 dbpath");
        Handle::open(root, dbpath).expect("Failed to open handle")
    }
}

impl Default for FixtureRoot {
    fn default() -> Self {
        Self::new()
    }
}

/// Seeds a fixture package into the handle's local database.
pub fn seed_local(handle: &Handle, name: &str, version: &str, deps: &[&str]) {
    crate::native::register_local_pkg(handle.as_raw(), name, version, deps);
}

/// Whether a committed transaction marked the package installed.
pub fn is_installed(handle: &Handle, name: &str) -> bool {
    crate::native::installed(handle.as_raw(), name)
}
