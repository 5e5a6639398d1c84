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

//! Pixel storage formats (PSM)
//!
//! Every buffer in local memory (frame, depth, texture, palette) is tagged
//! with a pixel storage mode. The mode decides the page arrangement, how many
//! bits a pixel occupies and whether the value indexes a palette.
//!
//! # Formats
//!
//! | Format | Code | Bits | Storage   | Palette |
//! |--------|------|------|-----------|---------|
//! | CT32   | 0x00 | 32   | 32-bit    | -       |
//! | CT24   | 0x01 | 24   | 32-bit    | -       |
//! | CT16   | 0x02 | 16   | 16-bit    | -       |
//! | CT16S  | 0x0A | 16   | 16-bit    | -       |
//! | T8     | 0x13 | 8    | 8-bit     | 256     |
//! | T4     | 0x14 | 4    | 4-bit     | 16      |
//! | T8H    | 0x1B | 8    | bits 24-31 of a 32-bit slot | 256 |
//! | T4HL   | 0x24 | 4    | bits 24-27 of a 32-bit slot | 16  |
//! | T4HH   | 0x2C | 4    | bits 28-31 of a 32-bit slot | 16  |
//! | Z32    | 0x30 | 32   | 32-bit    | -       |
//! | Z24    | 0x31 | 24   | 32-bit    | -       |
//! | Z16    | 0x32 | 16   | 16-bit    | -       |
//! | Z16S   | 0x3A | 16   | 16-bit    | -       |

use super::swizzle::{self, Layout};
use serde::{Deserialize, Serialize};

/// Width and height of a block or page in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
}

/// Immutable metadata describing one pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Significant bits per pixel (32, 24, 16, 8 or 4)
    pub bits_per_pixel: u8,

    /// Width of the storage slot the pixel lives in
    pub storage_bits_per_pixel: u8,

    /// Number of palette entries (0 for direct color formats)
    pub palette_size: u16,

    /// Block shape in pixels
    pub block: Shape,

    /// Page shape in pixels
    pub page: Shape,
}

/// Pixel storage mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Ct32,
    Ct24,
    Ct16,
    Ct16S,
    T8,
    T4,
    T8H,
    T4HL,
    T4HH,
    Z32,
    Z24,
    Z16,
    Z16S,
}

impl PixelFormat {
    /// All formats, in hardware code order
    pub const ALL: [PixelFormat; 13] = [
        PixelFormat::Ct32,
        PixelFormat::Ct24,
        PixelFormat::Ct16,
        PixelFormat::Ct16S,
        PixelFormat::T8,
        PixelFormat::T4,
        PixelFormat::T8H,
        PixelFormat::T4HL,
        PixelFormat::T4HH,
        PixelFormat::Z32,
        PixelFormat::Z24,
        PixelFormat::Z16,
        PixelFormat::Z16S,
    ];

    /// Decode a PSM register field
    ///
    /// Codes the hardware does not define fall back to CT32, which is what
    /// the addressing logic does with them.
    pub fn from_code(code: u32) -> Self {
        match code & 0x3f {
            0x00 => PixelFormat::Ct32,
            0x01 => PixelFormat::Ct24,
            0x02 => PixelFormat::Ct16,
            0x0a => PixelFormat::Ct16S,
            0x13 => PixelFormat::T8,
            0x14 => PixelFormat::T4,
            0x1b => PixelFormat::T8H,
            0x24 => PixelFormat::T4HL,
            0x2c => PixelFormat::T4HH,
            0x30 => PixelFormat::Z32,
            0x31 => PixelFormat::Z24,
            0x32 => PixelFormat::Z16,
            0x3a => PixelFormat::Z16S,
            other => {
                log::trace!("Undefined PSM code 0x{:02X}, treating as CT32", other);
                PixelFormat::Ct32
            }
        }
    }

    /// Hardware PSM code
    pub const fn code(self) -> u32 {
        match self {
            PixelFormat::Ct32 => 0x00,
            PixelFormat::Ct24 => 0x01,
            PixelFormat::Ct16 => 0x02,
            PixelFormat::Ct16S => 0x0a,
            PixelFormat::T8 => 0x13,
            PixelFormat::T4 => 0x14,
            PixelFormat::T8H => 0x1b,
            PixelFormat::T4HL => 0x24,
            PixelFormat::T4HH => 0x2c,
            PixelFormat::Z32 => 0x30,
            PixelFormat::Z24 => 0x31,
            PixelFormat::Z16 => 0x32,
            PixelFormat::Z16S => 0x3a,
        }
    }

    /// Page arrangement used by this format
    pub const fn layout(self) -> Layout {
        match self {
            PixelFormat::Ct32
            | PixelFormat::Ct24
            | PixelFormat::T8H
            | PixelFormat::T4HL
            | PixelFormat::T4HH => Layout::Psm32,
            PixelFormat::Z32 | PixelFormat::Z24 => Layout::Psm32Z,
            PixelFormat::Ct16 => Layout::Psm16,
            PixelFormat::Ct16S => Layout::Psm16S,
            PixelFormat::Z16 => Layout::Psm16Z,
            PixelFormat::Z16S => Layout::Psm16SZ,
            PixelFormat::T8 => Layout::Psm8,
            PixelFormat::T4 => Layout::Psm4,
        }
    }

    /// Format metadata
    pub const fn info(self) -> FormatInfo {
        let layout = self.layout();
        let (bw, bh) = layout.block_shape();
        let (pw, ph) = layout.page_shape();

        let (bits_per_pixel, storage_bits_per_pixel, palette_size) = match self {
            PixelFormat::Ct32 | PixelFormat::Z32 => (32, 32, 0),
            PixelFormat::Ct24 | PixelFormat::Z24 => (24, 32, 0),
            PixelFormat::Ct16 | PixelFormat::Ct16S | PixelFormat::Z16 | PixelFormat::Z16S => {
                (16, 16, 0)
            }
            PixelFormat::T8 => (8, 8, 256),
            PixelFormat::T4 => (4, 4, 16),
            PixelFormat::T8H => (8, 32, 256),
            PixelFormat::T4HL | PixelFormat::T4HH => (4, 32, 16),
        };

        FormatInfo {
            bits_per_pixel,
            storage_bits_per_pixel,
            palette_size,
            block: Shape {
                width: bw,
                height: bh,
            },
            page: Shape {
                width: pw,
                height: ph,
            },
        }
    }

    /// Significant bits per pixel
    #[inline]
    pub const fn bits_per_pixel(self) -> u32 {
        self.info().bits_per_pixel as u32
    }

    /// Mask covering the significant bits of a pixel value
    #[inline]
    pub const fn value_mask(self) -> u32 {
        match self.bits_per_pixel() {
            32 => 0xffff_ffff,
            bits => (1 << bits) - 1,
        }
    }

    /// Whether this is a depth buffer format
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            PixelFormat::Z32 | PixelFormat::Z24 | PixelFormat::Z16 | PixelFormat::Z16S
        )
    }

    /// Whether pixel values are palette indices
    pub const fn is_indexed(self) -> bool {
        self.info().palette_size != 0
    }

    /// Whether pixels are 16 bits wide
    pub const fn is_16bit(self) -> bool {
        self.bits_per_pixel() == 16
    }

    /// Translate a pixel coordinate into a storage offset
    ///
    /// See [`swizzle::address`] for the meaning of the arguments.
    #[inline]
    pub fn address(self, x: u32, y: u32, bp: u32, bw: u32) -> u32 {
        swizzle::address(self.layout(), x, y, bp, bw)
    }
}
