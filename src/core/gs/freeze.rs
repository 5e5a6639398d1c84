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

//! Freeze blobs (save states)
//!
//! A freeze blob captures everything needed to resume drawing: the status
//! word, every configuration register and the whole of local memory.
//!
//! # Format
//!
//! Blobs are encoded with bincode using fixed-width little-endian integers,
//! so the layout is:
//!
//! | offset | field |
//! |---|---|
//! | 0 | version (`u32`) |
//! | 4 | status (`u64`) |
//! | 12 | registers (`[u64; 46]`) |
//! | 380 | local memory length (`u64`, always 4 MiB) |
//! | 388 | local memory bytes |
//!
//! # Version Compatibility
//!
//! Blobs written by an older version are accepted; blobs from a newer
//! version are rejected before anything is decoded.
//!
//! # Defrost
//!
//! Registers are restored verbatim: no transfer starts, no palette loads
//! and no vertex is kicked. The vertex queue and any in-flight transfer are
//! discarded, the CLUT is marked stale and the routine cache is kept.

use super::registers::{address, StatusFlags};
use super::Gs;
use crate::core::error::FreezeError;
use crate::core::memory::VideoMemory;
use bincode::{config, Decode, Encode};
use std::path::Path;

/// Current freeze format version
pub const FREEZE_VERSION: u32 = 6;

/// Environment registers, in blob order
pub const ENVIRONMENT_REGISTERS: [u8; 15] = [
    address::PRIM,
    address::PRMODE,
    address::PRMODECONT,
    address::TEXCLUT,
    address::SCANMSK,
    address::TEXA,
    address::FOGCOL,
    address::DIMX,
    address::DTHE,
    address::COLCLAMP,
    address::PABE,
    address::BITBLTBUF,
    address::TRXDIR,
    address::TRXPOS,
    address::TRXREG,
];

/// Per-context registers (context 1 addresses), in blob order
pub const CONTEXT_REGISTERS: [u8; 13] = [
    address::XYOFFSET_1,
    address::TEX0_1,
    address::TEX1_1,
    address::TEX2_1,
    address::CLAMP_1,
    address::MIPTBP1_1,
    address::MIPTBP2_1,
    address::SCISSOR_1,
    address::ALPHA_1,
    address::TEST_1,
    address::FBA_1,
    address::FRAME_1,
    address::ZBUF_1,
];

/// Current vertex registers, in blob order
pub const VERTEX_REGISTERS: [u8; 5] = [
    address::RGBAQ,
    address::ST,
    address::UV,
    address::XYZ2,
    address::FOG,
];

/// Number of registers stored in a blob
pub const REGISTER_COUNT: usize =
    ENVIRONMENT_REGISTERS.len() + 2 * CONTEXT_REGISTERS.len() + VERTEX_REGISTERS.len();

/// Fixed-width little-endian bincode configuration
fn blob_config() -> impl config::Config {
    config::standard()
        .with_fixed_int_encoding()
        .with_little_endian()
}

/// Serialized device state
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FreezeBlob {
    /// Format version
    pub version: u32,

    /// Host-visible status word
    pub status: u64,

    /// Register values in [`ENVIRONMENT_REGISTERS`], context 1, context 2,
    /// [`VERTEX_REGISTERS`] order
    pub registers: [u64; REGISTER_COUNT],

    /// Local memory contents
    pub vm: Vec<u8>,
}

impl FreezeBlob {
    /// Encode the blob
    pub fn encode(&self) -> Result<Vec<u8>, FreezeError> {
        Ok(bincode::encode_to_vec(self, blob_config())?)
    }

    /// Decode and validate a blob
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The blob was written by a newer version
    /// - The data is truncated or malformed
    /// - The memory image is not exactly [`VideoMemory::SIZE`] bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, FreezeError> {
        let (version, _): (u32, usize) = bincode::decode_from_slice(bytes, blob_config())?;
        if version > FREEZE_VERSION {
            log::warn!(
                "Rejecting freeze blob version {} (newest supported is {})",
                version,
                FREEZE_VERSION
            );
            return Err(FreezeError::UnsupportedVersion {
                found: version,
                current: FREEZE_VERSION,
            });
        }

        let (blob, _): (FreezeBlob, usize) = bincode::decode_from_slice(bytes, blob_config())?;
        if blob.vm.len() != VideoMemory::SIZE {
            return Err(FreezeError::InvalidMemorySize {
                expected: VideoMemory::SIZE,
                got: blob.vm.len(),
            });
        }

        Ok(blob)
    }

    /// Encode the blob into a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FreezeError> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }

    /// Read and decode a blob from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FreezeError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }
}

/// Register addresses in blob order
fn blob_addresses() -> impl Iterator<Item = u8> {
    ENVIRONMENT_REGISTERS
        .into_iter()
        .chain(CONTEXT_REGISTERS)
        .chain(CONTEXT_REGISTERS.map(|first| first + 1))
        .chain(VERTEX_REGISTERS)
}

impl Gs {
    /// Capture the device state as a freeze blob
    pub fn freeze(&self) -> Result<Vec<u8>, FreezeError> {
        let mut registers = [0u64; REGISTER_COUNT];
        for (slot, addr) in registers.iter_mut().zip(blob_addresses()) {
            *slot = self.register_bits(addr);
        }

        let blob = FreezeBlob {
            version: FREEZE_VERSION,
            status: self.status.bits(),
            registers,
            vm: self.vm.to_bytes(),
        };
        let bytes = blob.encode()?;

        log::debug!("Froze GS state: {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Restore the device state from a freeze blob
    ///
    /// # Errors
    ///
    /// Returns error if the blob is malformed or from a newer version. The
    /// device is left untouched in that case.
    pub fn defrost(&mut self, bytes: &[u8]) -> Result<(), FreezeError> {
        let blob = FreezeBlob::decode(bytes)?;

        for (addr, bits) in blob_addresses().zip(blob.registers) {
            self.restore_register(addr, bits);
        }
        self.status = StatusFlags::from_bits_truncate(blob.status);
        self.vm.load_bytes(&blob.vm);

        self.queue.clear();
        self.transfer = None;
        self.clut.invalidate();

        log::info!("Defrosted GS state (freeze version {})", blob.version);
        Ok(())
    }

    /// Write a freeze blob to a file
    pub fn freeze_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FreezeError> {
        std::fs::write(path, self.freeze()?)?;
        Ok(())
    }

    /// Restore the device state from a freeze file
    pub fn defrost_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), FreezeError> {
        let bytes = std::fs::read(path)?;
        self.defrost(&bytes)
    }
}
