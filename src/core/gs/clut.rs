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

//! CLUT (colour lookup table) cache
//!
//! The GS keeps a 1 KiB palette buffer next to the texture unit. Palettes are
//! loaded from local memory when TEX0/TEX2 is written with a CLD mode that
//! asks for it, and expanded into 32-bit colours when a draw samples an
//! indexed texture.
//!
//! Raw palette entries are kept as 16-bit halves: CT32 palettes store the
//! low halves at `[0, 256)` and the high halves at `[256, 512)`, while
//! CT16/CT16S palettes use the whole 512-entry range (CSA selects one of 32
//! 16-entry banks).
//!
//! # Example
//!
//! ```
//! use echo_gs::core::gs::clut::Clut;
//! use echo_gs::core::gs::registers::{Tex0, TexClut};
//!
//! let mut clut = Clut::new();
//! let tex0 = Tex0 { psm: 0x13, cld: 1, ..Default::default() };
//!
//! // First load is always needed; the identical configuration is not
//! assert!(clut.write_test(&tex0, &TexClut::default()));
//! ```

use super::registers::{Tex0, TexClut, Texa};
use crate::core::memory::{PixelFormat, VideoMemory};

/// Blocks covered by a CSM1 palette (16x16 CT32 pixels)
const PALETTE_BLOCKS: u32 = 4;

/// CPSM codes after normalisation
const CPSM_CT32: u8 = 0x00;
const CPSM_CT24: u8 = 0x01;

/// Expand a 16-bit texel to 32 bits using TEXA
#[inline]
pub fn expand_16(c: u32, texa: &Texa) -> u32 {
    let r = (c & 0x1f) << 3;
    let g = ((c >> 5) & 0x1f) << 3;
    let b = ((c >> 10) & 0x1f) << 3;

    let a = if c & 0x8000 != 0 {
        texa.ta1
    } else if texa.aem && c & 0x7fff == 0 {
        0
    } else {
        texa.ta0
    };

    r | (g << 8) | (b << 16) | ((a as u32) << 24)
}

/// Expand a 24-bit texel to 32 bits using TEXA
#[inline]
pub fn expand_24(c: u32, texa: &Texa) -> u32 {
    let rgb = c & 0x00ff_ffff;
    let a = if texa.aem && rgb == 0 { 0 } else { texa.ta0 };
    rgb | ((a as u32) << 24)
}

/// Load-side state: the configuration of the last palette load
#[derive(Debug, Clone, Copy)]
struct WriteState {
    tex0: Tex0,
    texclut: TexClut,
    dirty: bool,
}

impl WriteState {
    fn is_dirty(&self, tex0: &Tex0, texclut: &TexClut) -> bool {
        self.dirty
            || self.tex0.cbp != tex0.cbp
            || self.tex0.cpsm != tex0.cpsm
            || self.tex0.csm != tex0.csm
            || self.tex0.csa != tex0.csa
            || self.texclut != *texclut
    }
}

/// Expansion-side state: what `buff32` currently holds
#[derive(Debug, Clone, Copy)]
struct ReadState {
    tex0: Tex0,
    texa: Texa,
    dirty: bool,
    adirty: bool,
    amin: u8,
    amax: u8,
}

impl ReadState {
    fn is_dirty(&self, tex0: &Tex0, texa: &Texa) -> bool {
        self.dirty
            || self.tex0.cpsm != tex0.cpsm
            || self.tex0.psm != tex0.psm
            || self.tex0.csa != tex0.csa
            || self.texa != *texa
    }
}

/// Palette cache
#[derive(Clone)]
pub struct Clut {
    /// Raw palette halves
    clut: Box<[u16; 512]>,

    /// Expanded palette
    buff32: Box<[u32; 256]>,

    /// Expanded 4-bit index pairs: `[hi * 16 + lo] = buff32[hi] << 32 | buff32[lo]`
    buff64: Box<[u64; 256]>,

    write: WriteState,
    read: ReadState,

    /// CBP0 / CBP1 registers used by CLD 2..5
    cbp: [u16; 2],

    /// Number of palette loads performed
    reload_count: u64,
}

impl Clut {
    pub fn new() -> Self {
        Self {
            clut: Box::new([0; 512]),
            buff32: Box::new([0; 256]),
            buff64: Box::new([0; 256]),
            write: WriteState {
                tex0: Tex0::default(),
                texclut: TexClut::default(),
                dirty: true,
            },
            read: ReadState {
                tex0: Tex0::default(),
                texa: Texa::default(),
                dirty: true,
                adirty: true,
                amin: 0,
                amax: 0,
            },
            cbp: [0; 2],
            reload_count: 0,
        }
    }

    /// Decide whether a TEX0/TEX2 write has to reload the palette
    ///
    /// The CLD field selects the trigger:
    ///
    /// - 0: never
    /// - 1: always (if the palette source changed)
    /// - 2 / 3: always, and latch CBP into CBP0 / CBP1
    /// - 4 / 5: only if CBP differs from CBP0 / CBP1, then latch it
    /// - 6 / 7: reserved, never
    ///
    /// # Returns
    ///
    /// `true` if [`Clut::write`] must be called with the same configuration
    pub fn write_test(&mut self, tex0: &Tex0, texclut: &TexClut) -> bool {
        match tex0.cld {
            0 => return false,
            1 => {}
            2 => self.cbp[0] = tex0.cbp,
            3 => self.cbp[1] = tex0.cbp,
            4 | 5 => {
                let slot = (tex0.cld - 4) as usize;
                if self.cbp[slot] == tex0.cbp {
                    return false;
                }
                self.cbp[slot] = tex0.cbp;
            }
            other => {
                log::warn!("Reserved CLUT load mode CLD={}", other);
                return false;
            }
        }

        self.write.is_dirty(tex0, texclut)
    }

    /// Load the palette from local memory
    ///
    /// # Arguments
    ///
    /// * `vm` - Local memory holding the palette
    /// * `tex0` - Texture setup (PSM selects 16 or 256 entries, CBP/CPSM/CSM/CSA the source)
    /// * `texclut` - Source position for CSM2
    pub fn write(&mut self, vm: &VideoMemory, tex0: &Tex0, texclut: &TexClut) {
        self.write = WriteState {
            tex0: *tex0,
            texclut: *texclut,
            dirty: false,
        };
        self.read.dirty = true;
        self.reload_count += 1;

        let entries = palette_entries(tex0.psm);
        log::debug!(
            "CLUT load #{}: cbp=0x{:04X} cpsm=0x{:X} csm={} csa={} entries={}",
            self.reload_count,
            tex0.cbp,
            tex0.cpsm,
            tex0.csm as u8 + 1,
            tex0.csa,
            entries
        );

        if entries == 0 {
            return;
        }

        let cbp = tex0.cbp as u32;
        let wide = is_32bit_palette(tex0.cpsm);
        let psm = if wide {
            PixelFormat::Ct32
        } else {
            PixelFormat::from_code(tex0.cpsm as u32)
        };

        for i in 0..entries {
            let value = if tex0.csm {
                let x = texclut.cou as u32 * 16 + i;
                vm.read_pixel_xy(psm, x, texclut.cov as u32, cbp, texclut.cbw as u32)
            } else {
                let (x, y) = csm1_position(i, entries);
                vm.read_pixel_xy(psm, x, y, cbp, 1)
            };

            if wide {
                let slot = ((tex0.csa as u32 & 15) * 16 + i) as usize & 0xff;
                self.clut[slot] = value as u16;
                self.clut[slot + 256] = (value >> 16) as u16;
            } else {
                let slot = (tex0.csa as u32 * 16 + i) as usize & 0x1ff;
                self.clut[slot] = value as u16;
            }
        }
    }

    /// Expanded 32-bit palette for a draw
    ///
    /// The raw palette is only re-expanded when it was reloaded or when the
    /// texture format, CPSM, CSA or TEXA changed since the last call.
    pub fn read32(&mut self, tex0: &Tex0, texa: &Texa) -> &[u32; 256] {
        if self.read.is_dirty(tex0, texa) {
            self.expand(tex0, texa);
        }
        &self.buff32
    }

    fn expand(&mut self, tex0: &Tex0, texa: &Texa) {
        self.read.tex0 = *tex0;
        self.read.texa = *texa;
        self.read.dirty = false;
        self.read.adirty = true;

        let entries = match palette_entries(tex0.psm) {
            0 => 256,
            n => n,
        };

        for i in 0..entries {
            self.buff32[i as usize] = if is_32bit_palette(tex0.cpsm) {
                let slot = ((tex0.csa as u32 & 15) * 16 + i) as usize & 0xff;
                let value = self.clut[slot] as u32 | (self.clut[slot + 256] as u32) << 16;
                if tex0.cpsm == CPSM_CT24 {
                    expand_24(value, texa)
                } else {
                    value
                }
            } else {
                let slot = (tex0.csa as u32 * 16 + i) as usize & 0x1ff;
                expand_16(self.clut[slot] as u32, texa)
            };
        }

        if entries == 16 {
            for hi in 0..16 {
                for lo in 0..16 {
                    self.buff64[hi * 16 + lo] =
                        (self.buff32[hi] as u64) << 32 | self.buff32[lo] as u64;
                }
            }
        }

        log::trace!("CLUT expanded: {} entries", entries);
    }

    /// Expanded 4-bit index pairs (valid after [`Clut::read32`] for 4-bit textures)
    pub fn read64(&self) -> &[u64; 256] {
        &self.buff64
    }

    /// Alpha range of the expanded palette
    ///
    /// Only meaningful after [`Clut::read32`]. A CT24 palette without
    /// alpha expansion has a single alpha value, TA0.
    pub fn alpha_min_max(&mut self) -> (u8, u8) {
        if self.read.adirty {
            self.read.adirty = false;

            let tex0 = self.read.tex0;
            let texa = self.read.texa;

            if tex0.cpsm == CPSM_CT24 && !texa.aem {
                self.read.amin = texa.ta0;
                self.read.amax = texa.ta0;
            } else {
                let entries = match palette_entries(tex0.psm) {
                    16 => 16,
                    _ => 256,
                };
                let (amin, amax) = self.buff32[..entries]
                    .iter()
                    .map(|c| (c >> 24) as u8)
                    .fold((u8::MAX, u8::MIN), |(lo, hi), a| (lo.min(a), hi.max(a)));
                self.read.amin = amin;
                self.read.amax = amax;
            }
        }

        (self.read.amin, self.read.amax)
    }

    /// Mark the palette stale unconditionally
    pub fn invalidate(&mut self) {
        self.write.dirty = true;
    }

    /// Mark the palette stale if local memory blocks `[start, end)` overlap its source
    pub fn invalidate_blocks(&mut self, start: u32, end: u32) {
        let tex0 = &self.write.tex0;
        if tex0.csm {
            // CSM2 palettes can live anywhere in a buffer
            self.write.dirty = true;
            return;
        }

        let cbp = tex0.cbp as u32;
        if start < cbp + PALETTE_BLOCKS && cbp < end {
            log::trace!("CLUT source 0x{:04X} overwritten", cbp);
            self.write.dirty = true;
        }
    }

    /// Whether the next [`Clut::write_test`] will see the palette as stale
    pub fn is_dirty(&self) -> bool {
        self.write.dirty
    }

    /// Number of palette loads since construction
    pub fn reload_count(&self) -> u64 {
        self.reload_count
    }

    /// Latched CBP0 / CBP1 values
    pub fn cbp(&self) -> [u16; 2] {
        self.cbp
    }
}

impl Default for Clut {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Clut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clut")
            .field("cbp", &self.cbp)
            .field("write_dirty", &self.write.dirty)
            .field("read_dirty", &self.read.dirty)
            .field("reload_count", &self.reload_count)
            .finish_non_exhaustive()
    }
}

/// Palette size of a texture PSM code (0 for direct colour)
fn palette_entries(psm: u8) -> u32 {
    PixelFormat::from_code(psm as u32).info().palette_size as u32
}

/// Whether a CPSM code stores 32-bit entries (CT32, or CT24 before normalisation)
fn is_32bit_palette(cpsm: u8) -> bool {
    cpsm == CPSM_CT32 || cpsm == CPSM_CT24
}

/// Position of palette entry `i` inside a CSM1 palette
///
/// 256-entry palettes are 16x16 pixels with bits 3 and 4 of the index
/// swapped; 16-entry palettes are 8x2 pixels.
fn csm1_position(i: u32, entries: u32) -> (u32, u32) {
    if entries == 16 {
        (i & 7, i >> 3)
    } else {
        let j = (i & 0xe7) | ((i & 0x08) << 1) | ((i & 0x10) >> 1);
        (j & 15, j >> 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PSM_T8: u8 = 0x13;
    const PSM_T4: u8 = 0x14;
    const CPSM_CT16: u8 = 0x02;

    fn tex0(psm: u8, cpsm: u8, cbp: u16, cld: u8) -> Tex0 {
        Tex0 {
            psm,
            cpsm,
            cbp,
            cld,
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_configuration_needs_no_reload() {
        let vm = VideoMemory::new();
        let mut clut = Clut::new();
        let t = tex0(PSM_T8, CPSM_CT32, 0x100, 1);
        let texclut = TexClut::default();

        assert!(clut.write_test(&t, &texclut));
        clut.write(&vm, &t, &texclut);
        assert_eq!(clut.reload_count(), 1);

        assert!(!clut.write_test(&t, &texclut));
        assert!(!clut.write_test(&t, &texclut));
        assert_eq!(clut.reload_count(), 1);

        // A different source reloads again
        let moved = tex0(PSM_T8, CPSM_CT32, 0x104, 1);
        assert!(clut.write_test(&moved, &texclut));
    }

    #[test]
    fn test_cld_modes() {
        let mut clut = Clut::new();
        let texclut = TexClut::default();

        assert!(!clut.write_test(&tex0(PSM_T8, 0, 0x40, 0), &texclut));

        assert!(clut.write_test(&tex0(PSM_T8, 0, 0x40, 2), &texclut));
        assert_eq!(clut.cbp(), [0x40, 0]);

        assert!(clut.write_test(&tex0(PSM_T8, 0, 0x80, 3), &texclut));
        assert_eq!(clut.cbp(), [0x40, 0x80]);

        // CBP0 already holds 0x40
        assert!(!clut.write_test(&tex0(PSM_T8, 0, 0x40, 4), &texclut));
        assert!(clut.write_test(&tex0(PSM_T8, 0, 0x44, 4), &texclut));
        assert_eq!(clut.cbp(), [0x44, 0x80]);

        assert!(!clut.write_test(&tex0(PSM_T8, 0, 0x80, 5), &texclut));

        assert!(!clut.write_test(&tex0(PSM_T8, 0, 0x40, 6), &texclut));
        assert!(!clut.write_test(&tex0(PSM_T8, 0, 0x40, 7), &texclut));
    }

    #[test]
    fn test_t8_csm1_swaps_index_bits() {
        let vm = VideoMemory::new();
        let cbp = 0x200;

        // Row 0, columns 8..15 hold entries 16..23; row 1 starts with entry 8
        vm.write_pixel_xy(PixelFormat::Ct32, 0, 0, cbp, 1, 0x8000_0011);
        vm.write_pixel_xy(PixelFormat::Ct32, 8, 0, cbp, 1, 0x8000_00AA);
        vm.write_pixel_xy(PixelFormat::Ct32, 0, 1, cbp, 1, 0x8000_00BB);
        vm.write_pixel_xy(PixelFormat::Ct32, 15, 15, cbp, 1, 0x7F12_3456);

        let mut clut = Clut::new();
        let t = tex0(PSM_T8, CPSM_CT32, cbp as u16, 1);
        clut.write(&vm, &t, &TexClut::default());

        let palette = clut.read32(&t, &Texa::default());
        assert_eq!(palette[0], 0x8000_0011);
        assert_eq!(palette[16], 0x8000_00AA);
        assert_eq!(palette[8], 0x8000_00BB);
        assert_eq!(palette[255], 0x7F12_3456);
    }

    #[test]
    fn test_t4_ct16_palette_with_csa() {
        let vm = VideoMemory::new();
        let cbp = 0x300;
        for i in 0..16 {
            // 5-bit red = i, alpha bit on odd entries
            let value = i | if i & 1 != 0 { 0x8000 } else { 0 };
            vm.write_pixel_xy(PixelFormat::Ct16, i & 7, i >> 3, cbp, 1, value);
        }

        let mut t = tex0(PSM_T4, CPSM_CT16, cbp as u16, 1);
        t.csa = 3;

        let mut clut = Clut::new();
        clut.write(&vm, &t, &TexClut::default());

        let texa = Texa {
            ta0: 0x10,
            aem: false,
            ta1: 0x90,
        };
        let palette = *clut.read32(&t, &texa);
        assert_eq!(palette[0], 0x1000_0000);
        assert_eq!(palette[1], 0x9000_0008);
        assert_eq!(palette[2], 0x1000_0010);

        let pairs = clut.read64();
        assert_eq!(pairs[0x12], (palette[1] as u64) << 32 | palette[2] as u64);
    }

    #[test]
    fn test_csm2_reads_a_row() {
        let vm = VideoMemory::new();
        let cbp = 0x400;
        let texclut = TexClut {
            cbw: 2,
            cou: 1,
            cov: 5,
        };
        for i in 0..16 {
            vm.write_pixel_xy(PixelFormat::Ct16, 16 + i, 5, cbp, 2, 0x8000 | (i << 10));
        }

        let mut t = tex0(PSM_T4, CPSM_CT16, cbp as u16, 1);
        t.csm = true;

        let mut clut = Clut::new();
        clut.write(&vm, &t, &texclut);
        let palette = clut.read32(&t, &Texa::default());
        assert_eq!(palette[3] & 0x00ff_ffff, 3 << 19);
    }

    #[test]
    fn test_texa_change_reexpands() {
        let vm = VideoMemory::new();
        let t = tex0(PSM_T4, CPSM_CT16, 0, 1);
        let mut clut = Clut::new();
        clut.write(&vm, &t, &TexClut::default());

        let texa = Texa {
            ta0: 0x20,
            ..Default::default()
        };
        assert_eq!(clut.read32(&t, &texa)[0], 0x2000_0000);

        let texa = Texa {
            ta0: 0x20,
            aem: true,
            ..Default::default()
        };
        assert_eq!(clut.read32(&t, &texa)[0], 0);
    }

    #[test]
    fn test_alpha_min_max() {
        let vm = VideoMemory::new();
        let cbp = 0x500;
        vm.write_pixel_xy(PixelFormat::Ct32, 1, 0, cbp, 1, 0x2000_0000);
        vm.write_pixel_xy(PixelFormat::Ct32, 2, 0, cbp, 1, 0xF000_0000);

        let mut clut = Clut::new();
        let t = tex0(PSM_T4, CPSM_CT32, cbp as u16, 1);
        clut.write(&vm, &t, &TexClut::default());
        clut.read32(&t, &Texa::default());
        assert_eq!(clut.alpha_min_max(), (0x00, 0xF0));

        // CT24 without alpha expansion has a fixed alpha
        let t24 = tex0(PSM_T4, CPSM_CT24, cbp as u16, 1);
        let texa = Texa {
            ta0: 0x44,
            ..Default::default()
        };
        clut.read32(&t24, &texa);
        assert_eq!(clut.alpha_min_max(), (0x44, 0x44));
    }

    #[test]
    fn test_invalidate_blocks_overlap() {
        let vm = VideoMemory::new();
        let t = tex0(PSM_T8, CPSM_CT32, 0x100, 1);
        let texclut = TexClut::default();
        let mut clut = Clut::new();
        clut.write(&vm, &t, &texclut);
        assert!(!clut.is_dirty());

        clut.invalidate_blocks(0x0, 0x100);
        assert!(!clut.is_dirty());

        clut.invalidate_blocks(0x103, 0x200);
        assert!(clut.is_dirty());
        assert!(clut.write_test(&t, &texclut));
    }

    #[test]
    fn test_expand_16_and_24() {
        let texa = Texa {
            ta0: 0x11,
            aem: true,
            ta1: 0x99,
        };
        assert_eq!(expand_16(0x801f, &texa), 0x9900_00f8);
        assert_eq!(expand_16(0x0000, &texa), 0);
        assert_eq!(expand_16(0x7c00, &texa), 0x11f8_0000);
        assert_eq!(expand_24(0xff00_0000, &texa), 0);
        assert_eq!(expand_24(0x0000_0001, &texa), 0x1100_0001);
    }
}
