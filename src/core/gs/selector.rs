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

//! Pipeline selector
//!
//! A [`Selector`] packs every configuration axis that changes which pixel
//! routine has to run into one 64-bit key. Two draws with equal selectors
//! run the same routine; everything that only changes *values* (colours,
//! reference alpha, base pointers) lives in the scanline constants instead.

use serde::Serialize;
use std::fmt;

/// Frame buffer format classes
pub mod fpsm {
    pub const CT32: u32 = 0;
    pub const CT24: u32 = 1;
    pub const CT16: u32 = 2;
    pub const CT16S: u32 = 3;
}

/// Depth buffer format classes
pub mod zpsm {
    pub const Z32: u32 = 0;
    pub const Z24: u32 = 1;
    pub const Z16: u32 = 2;
    pub const Z16S: u32 = 3;
}

/// Depth test modes
pub mod ztst {
    /// No depth test and no depth access
    pub const OFF: u32 = 0;
    pub const ALWAYS: u32 = 1;
    pub const GEQUAL: u32 = 2;
    pub const GREATER: u32 = 3;
}

/// Alpha test operators
pub mod atst {
    pub const NEVER: u32 = 0;
    pub const ALWAYS: u32 = 1;
    pub const LESS: u32 = 2;
    pub const LEQUAL: u32 = 3;
    pub const EQUAL: u32 = 4;
    pub const GEQUAL: u32 = 5;
    pub const GREATER: u32 = 6;
    pub const NOTEQUAL: u32 = 7;
}

/// Alpha test fail actions
pub mod afail {
    /// Write nothing
    pub const KEEP: u32 = 0;
    /// Write colour only
    pub const FB_ONLY: u32 = 1;
    /// Write depth only
    pub const ZB_ONLY: u32 = 2;
    /// Write colour without alpha, no depth
    pub const RGB_ONLY: u32 = 3;
}

/// Texture functions
pub mod tfx {
    pub const MODULATE: u32 = 0;
    pub const DECAL: u32 = 1;
    pub const HIGHLIGHT: u32 = 2;
    pub const HIGHLIGHT2: u32 = 3;
    /// Untextured
    pub const NONE: u32 = 4;
}

/// Texel format classes
pub mod tpsm {
    pub const CT32: u32 = 0;
    pub const CT24: u32 = 1;
    pub const CT16: u32 = 2;
    /// 8-bit palette index (T8, T8H)
    pub const T8: u32 = 3;
    /// 4-bit palette index (T4, T4HL, T4HH)
    pub const T4: u32 = 4;
}

/// Blend operand selectors (`aba`, `abb`, `abd`)
pub mod blend_color {
    pub const SOURCE: u32 = 0;
    pub const DEST: u32 = 1;
    pub const ZERO: u32 = 2;
}

/// Blend coefficient selectors (`abc`)
pub mod blend_alpha {
    pub const SOURCE: u32 = 0;
    pub const DEST: u32 = 1;
    pub const FIX: u32 = 2;
}

/// Texture wrap modes
pub mod wrap {
    pub const REPEAT: u32 = 0;
    pub const CLAMP: u32 = 1;
    pub const REGION_CLAMP: u32 = 2;
    pub const REGION_REPEAT: u32 = 3;
}

/// Primitive shape classes
pub mod prim {
    pub const POINT: u32 = 0;
    pub const LINE: u32 = 1;
    pub const TRIANGLE: u32 = 2;
    pub const SPRITE: u32 = 3;
}

/// Routine configuration key
///
/// Equality and hashing are bitwise over the packed value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Selector(u64);

macro_rules! selector_fields {
    ($($(#[$meta:meta])* $get:ident, $set:ident: $shift:literal, $width:literal;)*) => {
        impl Selector {
            $(
                $(#[$meta])*
                #[inline]
                pub const fn $get(self) -> u32 {
                    ((self.0 >> $shift) & ((1u64 << $width) - 1)) as u32
                }

                #[inline]
                pub fn $set(&mut self, value: u32) {
                    let mask = ((1u64 << $width) - 1) << $shift;
                    self.0 = (self.0 & !mask) | (((value as u64) << $shift) & mask);
                }
            )*
        }
    };
}

macro_rules! selector_flags {
    ($($(#[$meta:meta])* $get:ident, $set:ident: $shift:literal;)*) => {
        impl Selector {
            $(
                $(#[$meta])*
                #[inline]
                pub const fn $get(self) -> bool {
                    (self.0 >> $shift) & 1 != 0
                }

                #[inline]
                pub fn $set(&mut self, value: bool) {
                    self.0 = (self.0 & !(1u64 << $shift)) | ((value as u64) << $shift);
                }
            )*
        }
    };
}

selector_fields! {
    /// Frame buffer format class ([`fpsm`])
    fpsm, set_fpsm: 0, 2;
    /// Depth buffer format class ([`zpsm`])
    zpsm, set_zpsm: 2, 2;
    /// Depth test mode ([`ztst`])
    ztst, set_ztst: 4, 2;
    /// Alpha test operator ([`atst`])
    atst, set_atst: 6, 3;
    /// Alpha test fail action ([`afail`])
    afail, set_afail: 9, 2;
    /// Texture function ([`tfx`])
    tfx, set_tfx: 12, 3;
    /// Blend operand A ([`blend_color`])
    aba, set_aba: 23, 2;
    /// Blend operand B ([`blend_color`])
    abb, set_abb: 25, 2;
    /// Blend coefficient C ([`blend_alpha`])
    abc, set_abc: 27, 2;
    /// Blend operand D ([`blend_color`])
    abd, set_abd: 29, 2;
    /// Horizontal wrap mode ([`wrap`])
    wms, set_wms: 34, 2;
    /// Vertical wrap mode ([`wrap`])
    wmt, set_wmt: 36, 2;
    /// Primitive shape class ([`prim`])
    prim, set_prim: 38, 2;
    /// Texel format class ([`tpsm`])
    tpsm, set_tpsm: 44, 3;
}

selector_flags! {
    /// Gouraud shading
    iip, set_iip: 11;
    /// Texture alpha is used
    tcc, set_tcc: 15;
    /// Texture coordinates are fixed-point UV
    fst, set_fst: 16;
    /// Bilinear filtering
    ltf, set_ltf: 17;
    /// Texels are palette indices
    tlu, set_tlu: 18;
    /// Fogging
    fge, set_fge: 19;
    /// Destination alpha test
    date, set_date: 20;
    /// Destination alpha test mode
    datm, set_datm: 21;
    /// Alpha blending
    abe, set_abe: 22;
    /// Per-pixel blend enable
    pabe, set_pabe: 31;
    /// Force alpha MSB
    fba, set_fba: 32;
    /// Dithering
    dthe, set_dthe: 33;
    /// Frame writes are not fully masked
    fwrite, set_fwrite: 40;
    /// The frame buffer has to be read
    rfb, set_rfb: 41;
    /// Depth writes enabled
    zwrite, set_zwrite: 42;
    /// Depth values are tested
    ztest, set_ztest: 43;
}

impl Selector {
    /// Wrap a packed key
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Packed key
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether the frame buffer holds 16-bit pixels
    pub const fn is_16bit_frame(self) -> bool {
        self.fpsm() >= fpsm::CT16
    }

    /// Whether the frame buffer has no alpha channel
    pub const fn is_24bit_frame(self) -> bool {
        self.fpsm() == fpsm::CT24
    }

    /// Whether the draw samples a texture
    pub const fn is_textured(self) -> bool {
        self.tfx() != tfx::NONE
    }

    /// Whether the draw can be done with a plain memory fill
    ///
    /// That is an untextured, flat, opaque sprite with no tests, fog or
    /// blending, and no dithering into a 16-bit frame.
    pub const fn is_solid_rect(self) -> bool {
        self.prim() == prim::SPRITE
            && !self.iip()
            && self.tfx() == tfx::NONE
            && !self.abe()
            && self.ztst() <= ztst::ALWAYS
            && self.atst() == atst::ALWAYS
            && !self.date()
            && !self.fge()
            && !(self.dthe() && self.is_16bit_frame())
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({:013X})", self.0)
    }
}
