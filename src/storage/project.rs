//! Project management
//!
//! Handles project initialization and opens the ledger database.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

use super::{Config, Database};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a herd project. Run 'herd init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# herd configuration

# Tenant used when --owner / HERD_OWNER is not given
# owner = "estancia"

# Productive cycle recorded at intake
default_cycle = "calf"

[occupancy]
# Animals per hectare
low_below = 0.8
high_above = 2.0
recommended_density = 2.0

[storage]
busy_timeout_ms = 5000
"#;

const GITIGNORE: &str = r#"# SQLite side files
herd.db-wal
herd.db-shm
"#;

/// A herd project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let herd_dir = root.join(".herd");

        if !herd_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    ///
    /// Existing config and database files are left alone, so running it twice
    /// is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let herd_dir = root.join(".herd");

        fs::create_dir_all(&herd_dir).with_context(|| {
            format!("Failed to create .herd directory: {}", herd_dir.display())
        })?;

        let config_path = herd_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = herd_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;

        // Creates the schema on first run
        project.database()?;
        debug!(root = %project.root.display(), "initialized project");

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .herd directory path
    pub fn herd_dir(&self) -> PathBuf {
        self.root.join(".herd")
    }

    /// Returns the database file path
    pub fn database_path(&self) -> PathBuf {
        self.herd_dir().join("herd.db")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Opens the ledger database with the configured busy timeout
    pub fn database(&self) -> Result<Database> {
        let db = Database::open(&self.database_path())?;
        db.set_busy_timeout(self.config.project.storage.busy_timeout())?;
        Ok(db)
    }
}
