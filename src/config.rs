//! Engine configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DragError, Result};

/// Settings supplied when constructing a [`DragSource`](crate::source::DragSource)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragSourceConfig {
    /// X display to connect to; `None` uses `$DISPLAY`
    #[serde(default)]
    pub display: Option<String>,

    /// Title of the host application's window, located once at startup
    #[serde(default)]
    pub window_title: Option<String>,

    /// Directory where file-based transfers are materialized
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Trace every XDND message and state decision
    #[serde(default)]
    pub verbose: bool,
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

impl Default for DragSourceConfig {
    fn default() -> Self {
        Self {
            display: None,
            window_title: None,
            temp_dir: default_temp_dir(),
            verbose: false,
        }
    }
}

impl DragSourceConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DragError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| DragError::Config(e.to_string()))
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = Some(title.into());
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
