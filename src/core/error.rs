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

/// GS error types
use thiserror::Error;

/// Result type for GS operations
pub type Result<T> = std::result::Result<T, GsError>;

/// Main error type for the GS core
///
/// The pixel pipeline itself never fails: coordinates wrap and unknown
/// configurations still get a routine. Errors only surface at the edges of
/// the core (register intake, transfers, freeze blobs and configuration).
#[derive(Error, Debug)]
pub enum GsError {
    #[error("Unknown GS register: 0x{address:02X}")]
    UnknownRegister { address: u8 },

    #[error("Image transfer data written while no host transfer is active")]
    NoActiveTransfer,

    #[error("Failed to build lane pool: {0}")]
    LanePool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Freeze error: {0}")]
    Freeze(#[from] FreezeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Freeze/defrost (save state) error types
#[derive(Error, Debug)]
pub enum FreezeError {
    #[error("Unsupported freeze version: {found} (newest supported is {current})")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("Invalid video memory size: {got} bytes (expected {expected})")]
    InvalidMemorySize { expected: usize, got: usize },

    #[error("Failed to encode freeze blob: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Failed to decode freeze blob: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renderer configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid lane count: {0} (must be at least 1)")]
    InvalidLanes(usize),
}
