//! Configuration file loader with multi-source merging

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use workbench_application::config::{ConfigValidationError, WorkspaceParams};

use super::file_config::FileWorkbenchConfig;

/// Failure while loading or validating the limits config.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration")]
    Read(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigValidationError),
}

/// Configuration loader that handles file discovery and merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load validated workspace parameters for `workspace_root`.
    ///
    /// Priority (highest to lowest):
    /// 1. Explicit config path (if provided)
    /// 2. Workspace root: `workbench.toml` or `.workbench.toml`
    /// 3. Built-in defaults
    pub fn load(
        workspace_root: &Path,
        config_path: Option<&PathBuf>,
    ) -> Result<WorkspaceParams, ConfigError> {
        let mut figment =
            Figment::new().merge(Serialized::defaults(FileWorkbenchConfig::default()));

        if let Some(project_path) = Self::project_config_path(workspace_root) {
            debug!(path = %project_path.display(), "merging workspace config");
            figment = figment.merge(Toml::file(&project_path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        let config: FileWorkbenchConfig = figment.extract().map_err(Box::new)?;
        let params = config.into_params();
        params.validate()?;
        Ok(params)
    }

    /// Load only default configuration (for `--no-config`).
    pub fn load_defaults() -> WorkspaceParams {
        WorkspaceParams::default()
    }

    /// The workspace-level config file path, if one exists.
    pub fn project_config_path(workspace_root: &Path) -> Option<PathBuf> {
        for filename in &["workbench.toml", ".workbench.toml"] {
            let path = workspace_root.join(filename);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }
}
