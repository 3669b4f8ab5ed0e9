//! Configuration handling for herd
//!
//! Configuration is stored in `.herd/config.toml` (project) and
//! `~/.config/herd/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{OccupancyThresholds, OwnerId, ProductiveCycle};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Stocking density settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyConfig {
    /// Densities below this (animals/ha) are "low"
    pub low_below: f64,

    /// Densities above this (animals/ha) are "high"
    pub high_above: f64,

    /// Reference density the dashboard reports percentages against
    pub recommended_density: f64,
}

impl Default for OccupancyConfig {
    fn default() -> Self {
        let thresholds = OccupancyThresholds::default();
        Self {
            low_below: thresholds.low_below,
            high_above: thresholds.high_above,
            recommended_density: 2.0,
        }
    }
}

impl OccupancyConfig {
    pub fn thresholds(&self) -> OccupancyThresholds {
        OccupancyThresholds {
            low_below: self.low_below,
            high_above: self.high_above,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.low_below >= 0.0 && self.low_below <= self.high_above) {
            return Err(ConfigError::Invalid(format!(
                "occupancy.low_below ({}) must be between 0 and occupancy.high_above ({})",
                self.low_below, self.high_above
            )));
        }
        if !(self.recommended_density > 0.0) {
            return Err(ConfigError::Invalid(
                "occupancy.recommended_density must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Milliseconds a writer waits for a concurrent writer to finish
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
        }
    }
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Tenant used when no `--owner` is given
    pub owner: Option<String>,

    /// Productive cycle stamped on animals at intake
    pub default_cycle: ProductiveCycle,

    /// Occupancy classification settings
    pub occupancy: OccupancyConfig,

    /// Database settings
    pub storage: StorageConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,

    /// Tenant used when neither the flag nor the project sets one
    pub owner: Option<String>,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let (project, project_root) = Self::load_project()?;

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "herd", "herd").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Finds and loads project configuration
    fn load_project() -> Result<(ProjectConfig, Option<PathBuf>)> {
        let project_root = Self::find_project_root();

        match project_root {
            Some(root) => {
                let config = Self::load_project_config(&root)?;
                Ok((config, Some(root)))
            }
            None => Ok((ProjectConfig::default(), None)),
        }
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(".herd").join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config.occupancy.validate()?;

        Ok(config)
    }

    /// Finds the project root by looking for `.herd/` directory
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let herd_dir = current.join(".herd");
            if herd_dir.is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolves the tenant: explicit value, project, global, `$USER`, "default"
    pub fn effective_owner(&self, explicit: Option<&str>) -> Result<OwnerId> {
        let name = explicit
            .map(str::to_string)
            .or_else(|| self.project.owner.clone())
            .or_else(|| self.global.owner.clone())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "default".to_string());

        OwnerId::new(name).context("Invalid owner")
    }

    /// Returns true if we're in a herd project
    pub fn is_in_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a herd project. Run 'herd init' first."))
    }

    /// Saves the project configuration
    pub fn save_project(&self) -> Result<()> {
        let root = self.require_project_root()?;
        let config_path = root.join(".herd").join("config.toml");

        let content =
            toml::to_string_pretty(&self.project).context("Failed to serialize project config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write project config: {}", config_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(project: ProjectConfig) -> Config {
        Config {
            project,
            global: GlobalConfig::default(),
            project_root: None,
        }
    }

    #[test]
    fn default_config() {
        let config = config(ProjectConfig::default());

        assert_eq!(config.project.default_cycle, ProductiveCycle::Calf);
        assert_eq!(config.project.occupancy.low_below, 0.8);
        assert_eq!(config.project.occupancy.high_above, 2.0);
        assert_eq!(config.global.default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
owner = "estancia-la-pampa"
default_cycle = "heifer-calf"

[occupancy]
low_below = 1.0
high_above = 3.0
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.owner.as_deref(), Some("estancia-la-pampa"));
        assert_eq!(config.default_cycle, ProductiveCycle::HeiferCalf);
        assert_eq!(config.occupancy.high_above, 3.0);
        assert_eq!(config.occupancy.recommended_density, 2.0);
        assert_eq!(config.storage.busy_timeout_ms, 5000);
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
default_format = "json"
owner = "me"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.owner, Some("me".to_string()));
    }

    #[test]
    fn inverted_thresholds_are_invalid() {
        let occupancy = OccupancyConfig {
            low_below: 3.0,
            high_above: 2.0,
            recommended_density: 2.0,
        };
        assert!(occupancy.validate().is_err());
        assert!(OccupancyConfig::default().validate().is_ok());
    }

    #[test]
    fn owner_resolution_order() {
        let mut project = ProjectConfig::default();
        project.owner = Some("from-project".to_string());
        let config = config(project);

        assert_eq!(config.effective_owner(Some("flag")).unwrap().as_str(), "flag");
        assert_eq!(config.effective_owner(None).unwrap().as_str(), "from-project");
        assert!(config.effective_owner(Some("  ")).is_err());
    }

    #[test]
    fn find_project_root() {
        let dir = TempDir::new().unwrap();
        let herd_dir = dir.path().join(".herd");
        fs::create_dir_all(&herd_dir).unwrap();

        // Change to a subdirectory
        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();
        std::env::set_current_dir(&sub_dir).unwrap();

        let root = Config::find_project_root();
        // Canonicalize both paths to handle macOS /var -> /private/var symlinks
        let expected = dir.path().canonicalize().ok();
        let actual = root.and_then(|p| p.canonicalize().ok());
        assert_eq!(actual, expected);

        // Reset current dir to avoid affecting other tests
        std::env::set_current_dir(dir.path()).unwrap();
    }

    #[test]
    fn config_not_in_project() {
        let config = config(ProjectConfig::default());

        assert!(!config.is_in_project());
        assert!(config.require_project_root().is_err());
    }
}
