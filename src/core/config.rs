// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer configuration
//!
//! Settings are stored as TOML and can be overridden from the environment
//! (`ECHO_GS_LANES`), which the binary fills from a `.env` file when present.
//!
//! # Example
//!
//! ```
//! use echo_gs::core::config::RendererConfig;
//!
//! let config: RendererConfig = toml::from_str("lanes = 4").unwrap();
//! assert_eq!(config.lanes, 4);
//! assert!(!config.log_routine_stats);
//! ```

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the lane count
pub const LANES_ENV: &str = "ECHO_GS_LANES";

/// Upper bound for the default lane count
const MAX_DEFAULT_LANES: usize = 8;

/// Renderer configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of scanline worker lanes
    pub lanes: usize,

    /// Dump routine cache statistics at debug level after each frame
    pub log_routine_stats: bool,

    /// Default output path for freeze blobs
    pub freeze_path: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let lanes = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_LANES);

        Self {
            lanes,
            log_routine_stats: false,
            freeze_path: None,
        }
    }
}

impl RendererConfig {
    /// Load configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(LANES_ENV) {
            match value.trim().parse::<usize>() {
                Ok(lanes) if lanes > 0 => self.lanes = lanes,
                _ => log::warn!("Ignoring invalid {}={:?}", LANES_ENV, value),
            }
        }
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lanes == 0 {
            return Err(ConfigError::InvalidLanes(self.lanes));
        }
        Ok(())
    }
}
