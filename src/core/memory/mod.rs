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

//! GS local memory (video memory)
//!
//! The Graphics Synthesizer owns 4 MiB of local memory shared by frame
//! buffers, depth buffers, textures and palettes. Nothing about the memory
//! is linear: every buffer is described by a base pointer, a width and a
//! pixel storage mode, and pixels are scattered inside 8 KiB pages by the
//! swizzle tables in [`swizzle`].
//!
//! # Storage
//!
//! The arena is held as 1M 32-bit words. Scanline lanes write disjoint rows
//! of the same buffer concurrently, and two rows can share one word (for
//! example 4-bit and 8-bit formats pack several pixels into a word). Words
//! are therefore atomics accessed with relaxed ordering, and narrow writes
//! go through a compare-and-swap so neighbouring pixels are never lost.
//! Batches are ordered by the lane barrier, not by these atomics.
//!
//! # Byte order
//!
//! Byte `n` of the arena is byte `n & 3` (little-endian) of word `n >> 2`,
//! and 4-bit pixel `n` is the low nibble of byte `n >> 1` when `n` is even.
//!
//! # Example
//!
//! ```
//! use echo_gs::core::memory::{PixelFormat, VideoMemory};
//!
//! let vm = VideoMemory::new();
//!
//! // Write a 32-bit pixel at (3, 5) of a buffer based at block 0, 64 pixels wide
//! vm.write_pixel_xy(PixelFormat::Ct32, 3, 5, 0, 1, 0xAABBCCDD);
//! assert_eq!(vm.read_pixel_xy(PixelFormat::Ct32, 3, 5, 0, 1), 0xAABBCCDD);
//!
//! // The alpha byte of the same slot is visible as a T8H pixel
//! assert_eq!(vm.read_pixel_xy(PixelFormat::T8H, 3, 5, 0, 1), 0xAA);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

pub mod psm;
pub mod swizzle;
mod transfer;

#[cfg(test)]
mod tests;

pub use psm::{FormatInfo, PixelFormat, Shape};
pub use swizzle::Layout;
pub use transfer::{BufferDesc, ImageTransfer, Rect, TransferDirection};

/// GS local memory arena
pub struct VideoMemory {
    /// 1M words, addressed by word index
    words: Box<[AtomicU32]>,
}

impl VideoMemory {
    /// Arena size in bytes (4 MiB)
    pub const SIZE: usize = 4 * 1024 * 1024;

    /// Arena size in 32-bit words
    pub const WORDS: usize = Self::SIZE / 4;

    /// Mask applied to word indices
    const WORD_MASK: u32 = (Self::WORDS - 1) as u32;

    /// Allocate a zero-filled arena
    pub fn new() -> Self {
        let words = (0..Self::WORDS).map(|_| AtomicU32::new(0)).collect();
        Self { words }
    }

    /// Zero the whole arena
    pub fn clear(&mut self) {
        for word in self.words.iter_mut() {
            *word.get_mut() = 0;
        }
    }

    /// Read a 32-bit word
    #[inline]
    pub fn read32(&self, word: u32) -> u32 {
        self.words[(word & Self::WORD_MASK) as usize].load(Ordering::Relaxed)
    }

    /// Write a 32-bit word
    #[inline]
    pub fn write32(&self, word: u32, value: u32) {
        self.words[(word & Self::WORD_MASK) as usize].store(value, Ordering::Relaxed);
    }

    /// Replace the bits selected by `mask` in a word, preserving the rest
    #[inline]
    pub fn write32_masked(&self, word: u32, value: u32, mask: u32) {
        if mask == 0xffff_ffff {
            self.write32(word, value);
            return;
        }

        let slot = &self.words[(word & Self::WORD_MASK) as usize];
        let _ = slot.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |old| {
            Some((old & !mask) | (value & mask))
        });
    }

    /// Read a 16-bit halfword
    #[inline]
    pub fn read16(&self, halfword: u32) -> u16 {
        let shift = (halfword & 1) * 16;
        (self.read32(halfword >> 1) >> shift) as u16
    }

    /// Write a 16-bit halfword
    #[inline]
    pub fn write16(&self, halfword: u32, value: u16) {
        let shift = (halfword & 1) * 16;
        self.write32_masked(halfword >> 1, (value as u32) << shift, 0xffff << shift);
    }

    /// Read a byte
    #[inline]
    pub fn read8(&self, byte: u32) -> u8 {
        let shift = (byte & 3) * 8;
        (self.read32(byte >> 2) >> shift) as u8
    }

    /// Write a byte
    #[inline]
    pub fn write8(&self, byte: u32, value: u8) {
        let shift = (byte & 3) * 8;
        self.write32_masked(byte >> 2, (value as u32) << shift, 0xff << shift);
    }

    /// Read a 4-bit nibble
    #[inline]
    pub fn read4(&self, nibble: u32) -> u8 {
        let shift = (nibble & 7) * 4;
        ((self.read32(nibble >> 3) >> shift) & 0xf) as u8
    }

    /// Write a 4-bit nibble
    #[inline]
    pub fn write4(&self, nibble: u32, value: u8) {
        let shift = (nibble & 7) * 4;
        self.write32_masked(nibble >> 3, ((value & 0xf) as u32) << shift, 0xf << shift);
    }

    /// Read the pixel stored at a format offset
    ///
    /// # Arguments
    ///
    /// * `psm` - Pixel storage mode
    /// * `addr` - Offset produced by [`PixelFormat::address`]
    ///
    /// # Returns
    ///
    /// The pixel value, right aligned and limited to the format's width
    #[inline]
    pub fn read_pixel(&self, psm: PixelFormat, addr: u32) -> u32 {
        match psm {
            PixelFormat::Ct32 | PixelFormat::Z32 => self.read32(addr),
            PixelFormat::Ct24 | PixelFormat::Z24 => self.read32(addr) & 0x00ff_ffff,
            PixelFormat::Ct16 | PixelFormat::Ct16S | PixelFormat::Z16 | PixelFormat::Z16S => {
                self.read16(addr) as u32
            }
            PixelFormat::T8 => self.read8(addr) as u32,
            PixelFormat::T4 => self.read4(addr) as u32,
            PixelFormat::T8H => self.read32(addr) >> 24,
            PixelFormat::T4HL => (self.read32(addr) >> 24) & 0xf,
            PixelFormat::T4HH => self.read32(addr) >> 28,
        }
    }

    /// Write a pixel at a format offset
    ///
    /// Only the bits belonging to the format are touched. A CT24 write keeps
    /// the top byte of the slot, and the high-alpha indexed formats keep the
    /// low 24 bits (and the other nibble for T4HL/T4HH).
    #[inline]
    pub fn write_pixel(&self, psm: PixelFormat, addr: u32, value: u32) {
        match psm {
            PixelFormat::Ct32 | PixelFormat::Z32 => self.write32(addr, value),
            PixelFormat::Ct24 | PixelFormat::Z24 => {
                self.write32_masked(addr, value, 0x00ff_ffff)
            }
            PixelFormat::Ct16 | PixelFormat::Ct16S | PixelFormat::Z16 | PixelFormat::Z16S => {
                self.write16(addr, value as u16)
            }
            PixelFormat::T8 => self.write8(addr, value as u8),
            PixelFormat::T4 => self.write4(addr, value as u8),
            PixelFormat::T8H => self.write32_masked(addr, value << 24, 0xff00_0000),
            PixelFormat::T4HL => self.write32_masked(addr, value << 24, 0x0f00_0000),
            PixelFormat::T4HH => self.write32_masked(addr, value << 28, 0xf000_0000),
        }
    }

    /// Read the pixel at a buffer coordinate
    #[inline]
    pub fn read_pixel_xy(&self, psm: PixelFormat, x: u32, y: u32, bp: u32, bw: u32) -> u32 {
        self.read_pixel(psm, psm.address(x, y, bp, bw))
    }

    /// Write a pixel at a buffer coordinate
    #[inline]
    pub fn write_pixel_xy(&self, psm: PixelFormat, x: u32, y: u32, bp: u32, bw: u32, value: u32) {
        self.write_pixel(psm, psm.address(x, y, bp, bw), value);
    }

    /// Snapshot the arena as bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        for word in self.words.iter() {
            bytes.extend_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
        }
        bytes
    }

    /// Overwrite the arena from a byte snapshot
    ///
    /// A short slice only overwrites the leading part of the arena.
    pub fn load_bytes(&mut self, bytes: &[u8]) {
        for (word, chunk) in self.words.iter_mut().zip(bytes.chunks(4)) {
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            *word.get_mut() = u32::from_le_bytes(buf);
        }
    }
}

impl Default for VideoMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoMemory")
            .field("size", &Self::SIZE)
            .finish_non_exhaustive()
    }
}
