//! Application configuration management.
//!
//! Settings are layered, later sources winning:
//! defaults < `config.toml` < `DUPEMARK_*` environment < command-line flags.
//! The last layer is applied by the caller after [`Config::load`].
//!
//! ```toml
//! use_trash = true
//! direct_only = false
//! verify_mtime = true
//! power_marker = false
//!
//! [[reprioritize]]
//! kind = "modified"
//! prefer = "highest"
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::{DeleteOptions, LocalFileOps};
use crate::results::{Criterion, IgnoreList, PowerMarker};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "DUPEMARK_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delete to the system trash instead of permanently.
    pub use_trash: bool,
    /// Skip files inside excluded directories when deleting.
    pub direct_only: bool,
    /// Refuse to act on files changed since the scan.
    pub verify_mtime: bool,
    /// Turn the power marker on for every session opened.
    pub power_marker: bool,
    /// Criteria applied by `mark --default-criteria`.
    pub reprioritize: Vec<Criterion>,
    /// Override for the ignore list location.
    pub ignore_list_path: Option<PathBuf>,
    /// Directory states file consulted by `direct_only` and reference-dir
    /// criteria.
    pub directories_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_trash: true,
            direct_only: false,
            verify_mtime: true,
            power_marker: false,
            reprioritize: Vec::new(),
            ignore_list_path: None,
            directories_path: None,
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or the default platform location.
    ///
    /// A missing default file is fine; a missing explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!("Config file not found: {}", p.display());
                }
                Some(p.to_path_buf())
            }
            None => Self::default_path().ok(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Reading config from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupemark", "dupemark")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Deletion policy for file actions.
    #[must_use]
    pub fn delete_options(&self) -> DeleteOptions {
        DeleteOptions {
            use_trash: self.use_trash,
            direct_only: self.direct_only,
        }
    }

    /// File operation provider honoring `verify_mtime`.
    #[must_use]
    pub fn file_operations(&self) -> LocalFileOps {
        LocalFileOps::new().with_verify_mtime(self.verify_mtime)
    }

    #[must_use]
    pub fn power_marker(&self) -> PowerMarker {
        PowerMarker::from(self.power_marker)
    }

    /// Where the ignore list lives.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the platform data directory
    /// cannot be determined.
    pub fn ignore_list_path(&self) -> Result<PathBuf> {
        match &self.ignore_list_path {
            Some(path) => Ok(path.clone()),
            None => IgnoreList::default_path(),
        }
    }
}
