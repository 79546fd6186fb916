//=====================================================
// File: config.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime configuration
// Objective: Load interpreter limits, module roots and event loop switches
//            from TOML with defaults for anything left out
//=====================================================

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched in the working directory and the user config dir.
pub const CONFIG_FILE: &str = "fsk.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading configuration from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Interpreter settings. Every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Nested user function calls allowed before a stack overflow failure.
    pub max_call_depth: usize,
    /// Capacity of each worker message queue.
    pub worker_queue_capacity: usize,
    /// Extra roots searched by `import`, `Worker.init` and `Task.run`.
    pub module_paths: Vec<PathBuf>,
    /// Script evaluated into the globals when an interpreter is built.
    pub prelude: Option<PathBuf>,
    pub run_event_loop: bool,
    pub worker_event_loop: bool,
    /// Fallback tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            worker_queue_capacity: 1024,
            module_paths: Vec::new(),
            prelude: None,
            run_event_loop: true,
            worker_event_loop: false,
            log_level: "warn".to_string(),
        }
    }
}

impl RuntimeOptions {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Explicit path, else `./fsk.toml`, else `<config dir>/fsk/fsk.toml`,
    /// else defaults. Returns the file actually used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }
        for candidate in default_locations() {
            if candidate.is_file() {
                let options = Self::from_file(&candidate)?;
                return Ok((options, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("fsk").join(CONFIG_FILE));
    }
    locations
}


//=====================================================
// End of file
//=====================================================
