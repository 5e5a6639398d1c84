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

//! Drawing context resolution
//!
//! A [`DrawingContext`] is the register snapshot a draw is issued with. Before
//! rasterization it is resolved once into a [`Selector`] (which routine runs)
//! and a [`ScanlineGlobals`] constant buffer (the values that routine reads).

use super::clut::Clut;
use super::registers::{
    Alpha, Clamp, ColClamp, Dimx, Dthe, Fba, FogCol, Frame, MipTbp1, MipTbp2, Pabe, PrimFlags,
    ScanMsk, Scissor, Test, Tex0, Tex1, Tex2, TexClut, Texa, XyOffset, Zbuf,
};
use super::render::pipeline::pack16;
use super::render::PrimitiveClass;
use super::selector::{self, Selector};
use crate::core::memory::{BufferDesc, PixelFormat};

/// Registers owned by one of the two drawing contexts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextRegisters {
    pub xyoffset: XyOffset,
    pub tex0: Tex0,
    pub tex1: Tex1,
    pub tex2: Tex2,
    pub clamp: Clamp,
    pub miptbp1: MipTbp1,
    pub miptbp2: MipTbp2,
    pub scissor: Scissor,
    pub alpha: Alpha,
    pub test: Test,
    pub fba: Fba,
    pub frame: Frame,
    pub zbuf: Zbuf,
}

/// Register snapshot a draw is issued with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawingContext {
    /// Drawing attributes (from PRIM or PRMODE, depending on PRMODECONT)
    pub flags: PrimFlags,
    /// Registers of the selected context
    pub regs: ContextRegisters,
    pub texa: Texa,
    pub texclut: TexClut,
    pub fogcol: FogCol,
    pub dimx: Dimx,
    pub dthe: Dthe,
    pub colclamp: ColClamp,
    pub pabe: Pabe,
    pub scanmsk: ScanMsk,
}

/// Per-axis texture wrap constants
///
/// REPEAT keeps the mask in `min`; CLAMP and REGION_CLAMP clamp to
/// `[min, max]`; REGION_REPEAT computes `(uv & min) | max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TexWrap {
    pub min: i32,
    pub max: i32,
}

impl TexWrap {
    fn new(mode: u32, size: i32, min: u16, max: u16) -> Self {
        match mode {
            selector::wrap::REPEAT => Self {
                min: size - 1,
                max: 0,
            },
            selector::wrap::CLAMP => Self {
                min: 0,
                max: size - 1,
            },
            _ => Self {
                min: min as i32,
                max: max as i32,
            },
        }
    }

    /// Apply the wrap mode to an integer texel coordinate
    #[inline]
    pub fn apply(&self, mode: u32, uv: i32) -> i32 {
        match mode {
            selector::wrap::REPEAT => uv & self.min,
            selector::wrap::REGION_REPEAT => (uv & self.min) | self.max,
            _ => uv.clamp(self.min, self.max.max(self.min)),
        }
    }
}

/// Constants read by the pixel routine during one draw
#[derive(Debug, Clone)]
pub struct ScanlineGlobals {
    /// Frame buffer
    pub frame: BufferDesc,
    /// Depth buffer (shares the frame buffer width)
    pub zbuf: BufferDesc,
    /// Protected frame bits, in the frame's storage format
    pub fm: u32,
    /// Largest depth value the depth format can hold
    pub zmax: u32,
    /// Texture buffer
    pub tex: BufferDesc,
    /// Texture width and height in texels
    pub tex_size: [f32; 2],
    /// Wrap constants for u and v
    pub wrap: [TexWrap; 2],
    /// Alpha test reference
    pub aref: i32,
    /// Fixed blend coefficient
    pub fix: i32,
    pub fog_color: [i32; 3],
    pub dimx: [[i8; 4]; 4],
    pub texa: Texa,
    /// Expanded palette (all zero for direct-colour textures)
    pub palette: Box<[u32; 256]>,
}

impl Default for ScanlineGlobals {
    fn default() -> Self {
        Self {
            frame: BufferDesc::new(0, 1, PixelFormat::Ct32),
            zbuf: BufferDesc::new(0, 1, PixelFormat::Z32),
            fm: 0,
            zmax: u32::MAX,
            tex: BufferDesc::new(0, 1, PixelFormat::Ct32),
            tex_size: [1.0, 1.0],
            wrap: [TexWrap::default(); 2],
            aref: 0,
            fix: 0x80,
            fog_color: [0; 3],
            dimx: [[0; 4]; 4],
            texa: Texa::default(),
            palette: Box::new([0; 256]),
        }
    }
}

/// Frame format class of a PSM
fn frame_class(psm: PixelFormat) -> u32 {
    match psm {
        PixelFormat::Ct24 | PixelFormat::Z24 => selector::fpsm::CT24,
        PixelFormat::Ct16 | PixelFormat::Z16 => selector::fpsm::CT16,
        PixelFormat::Ct16S | PixelFormat::Z16S => selector::fpsm::CT16S,
        _ => selector::fpsm::CT32,
    }
}

/// Depth format class of a PSM
fn depth_class(psm: PixelFormat) -> u32 {
    match psm {
        PixelFormat::Z24 | PixelFormat::Ct24 => selector::zpsm::Z24,
        PixelFormat::Z16 | PixelFormat::Ct16 => selector::zpsm::Z16,
        PixelFormat::Z16S | PixelFormat::Ct16S => selector::zpsm::Z16S,
        _ => selector::zpsm::Z32,
    }
}

/// Texel format class of a PSM
fn texel_class(psm: PixelFormat) -> u32 {
    match psm {
        PixelFormat::Ct24 | PixelFormat::Z24 => selector::tpsm::CT24,
        PixelFormat::Ct16 | PixelFormat::Ct16S | PixelFormat::Z16 | PixelFormat::Z16S => {
            selector::tpsm::CT16
        }
        PixelFormat::T8 | PixelFormat::T8H => selector::tpsm::T8,
        PixelFormat::T4 | PixelFormat::T4HL | PixelFormat::T4HH => selector::tpsm::T4,
        _ => selector::tpsm::CT32,
    }
}

/// Whether a blend equation always yields the source colour
fn alpha_is_opaque(alpha: &Alpha) -> bool {
    use selector::{blend_alpha, blend_color};

    let (a, b, c, d) = (alpha.a as u32, alpha.b as u32, alpha.c as u32, alpha.d as u32);
    let zero_term = a == b || (c == blend_alpha::FIX && alpha.fix == 0);
    let source_only = a == blend_color::SOURCE
        && b == blend_color::ZERO
        && c == blend_alpha::FIX
        && d == blend_color::ZERO
        && alpha.fix == 0x80;

    (zero_term && d == blend_color::SOURCE) || source_only
}

impl DrawingContext {
    /// Resolve the snapshot into a selector and scanline constants
    ///
    /// # Arguments
    ///
    /// * `class` - Shape of the primitive being drawn
    /// * `clut` - Palette cache, read for indexed textures
    ///
    /// # Returns
    ///
    /// `None` if the draw can have no visible effect (depth test NEVER,
    /// alpha test NEVER with KEEP, or frame and depth both masked)
    pub fn resolve(
        &self,
        class: PrimitiveClass,
        clut: &mut Clut,
    ) -> Option<(Selector, ScanlineGlobals)> {
        let regs = &self.regs;
        let mut sel = Selector::default();
        let mut globals = ScanlineGlobals::default();

        sel.set_prim(class.selector_class());

        // Frame
        let fpsm = PixelFormat::from_code(regs.frame.psm as u32);
        let fclass = frame_class(fpsm);
        sel.set_fpsm(fclass);
        globals.frame = BufferDesc::new(regs.frame.block(), regs.frame.fbw as u32, fpsm);

        let (fm, fm_full) = match fclass {
            selector::fpsm::CT16 | selector::fpsm::CT16S => (pack16(regs.frame.fbmsk), 0xffff),
            selector::fpsm::CT24 => (regs.frame.fbmsk & 0x00ff_ffff, 0x00ff_ffff),
            _ => (regs.frame.fbmsk, 0xffff_ffff),
        };
        globals.fm = fm;
        sel.set_fwrite(fm != fm_full);

        // Depth
        let test = &regs.test;
        let ztst = if test.zte {
            test.ztst as u32
        } else {
            selector::ztst::ALWAYS
        };
        if ztst == 0 {
            log::trace!("Draw dropped: depth test NEVER");
            return None;
        }

        let zpsm = PixelFormat::from_code(regs.zbuf.psm_code());
        sel.set_zpsm(depth_class(zpsm));
        globals.zbuf = BufferDesc::new(regs.zbuf.block(), regs.frame.fbw as u32, zpsm);
        globals.zmax = zpsm.value_mask();

        let zwrite = !regs.zbuf.zmsk;
        let ztest = ztst >= selector::ztst::GEQUAL;
        sel.set_zwrite(zwrite);
        sel.set_ztest(ztest);
        sel.set_ztst(if zwrite || ztest {
            ztst
        } else {
            selector::ztst::OFF
        });

        // Alpha test
        let atst = if test.ate {
            test.atst as u32
        } else {
            selector::atst::ALWAYS
        };
        let mut afail = test.afail as u32;
        if afail == selector::afail::RGB_ONLY && fclass == selector::fpsm::CT24 {
            afail = selector::afail::FB_ONLY;
        }
        if atst == selector::atst::NEVER && afail == selector::afail::KEEP {
            log::trace!("Draw dropped: alpha test NEVER with KEEP");
            return None;
        }
        sel.set_atst(atst);
        sel.set_afail(afail);
        globals.aref = test.aref as i32;

        if !sel.fwrite() && !zwrite {
            log::trace!("Draw dropped: frame and depth writes masked");
            return None;
        }

        // Shading
        let flags = self.flags;
        let shaded = matches!(class, PrimitiveClass::Line | PrimitiveClass::Triangle);
        sel.set_iip(shaded && flags.contains(PrimFlags::IIP));
        sel.set_fge(flags.contains(PrimFlags::FGE));
        globals.fog_color = [
            self.fogcol.fcr as i32,
            self.fogcol.fcg as i32,
            self.fogcol.fcb as i32,
        ];

        // Texture
        if flags.contains(PrimFlags::TME) {
            let tex0 = &regs.tex0;
            let tpsm = PixelFormat::from_code(tex0.psm as u32);
            let tclass = texel_class(tpsm);

            sel.set_tfx(tex0.tfx as u32);
            sel.set_tcc(tex0.tcc);
            sel.set_fst(flags.contains(PrimFlags::FST));
            sel.set_ltf(regs.tex1.is_linear());
            sel.set_tpsm(tclass);
            sel.set_tlu(tpsm.is_indexed());
            sel.set_wms(regs.clamp.wms as u32);
            sel.set_wmt(regs.clamp.wmt as u32);

            let tw = 1i32 << tex0.tw.min(10);
            let th = 1i32 << tex0.th.min(10);
            globals.tex = BufferDesc::new(tex0.tbp0 as u32, tex0.tbw as u32, tpsm);
            globals.tex_size = [tw as f32, th as f32];
            globals.wrap = [
                TexWrap::new(sel.wms(), tw, regs.clamp.minu, regs.clamp.maxu),
                TexWrap::new(sel.wmt(), th, regs.clamp.minv, regs.clamp.maxv),
            ];
            globals.texa = self.texa;

            if tpsm.is_indexed() {
                globals.palette = Box::new(*clut.read32(tex0, &self.texa));
            }
        } else {
            sel.set_tfx(selector::tfx::NONE);
        }

        // Blending
        let alpha = &regs.alpha;
        if flags.contains(PrimFlags::ABE) && !alpha_is_opaque(alpha) {
            sel.set_abe(true);
            sel.set_aba(alpha.a as u32);
            sel.set_abb(alpha.b as u32);
            sel.set_abc(alpha.c as u32);
            sel.set_abd(alpha.d as u32);
            sel.set_pabe(self.pabe.pabe);
            globals.fix = alpha.fix as i32;
        }

        // Destination alpha test needs an alpha bit to test
        if test.date && fclass != selector::fpsm::CT24 {
            sel.set_date(true);
            sel.set_datm(test.datm);
        }

        sel.set_fba(regs.fba.fba && fclass != selector::fpsm::CT24);

        if self.dthe.dthe && sel.is_16bit_frame() {
            sel.set_dthe(true);
            globals.dimx = self.dimx.matrix();
        }

        let blend_reads_dest = sel.abe()
            && (sel.aba() == selector::blend_color::DEST
                || sel.abb() == selector::blend_color::DEST
                || sel.abd() == selector::blend_color::DEST
                || sel.abc() == selector::blend_alpha::DEST);
        sel.set_rfb(sel.date() || blend_reads_dest || (sel.fwrite() && fm != 0));

        Some((sel, globals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_context() -> DrawingContext {
        let mut ctx = DrawingContext::default();
        ctx.regs.frame = Frame::from_bits(1 << 16);
        ctx.regs.zbuf = Zbuf::from_bits(1 << 32);
        ctx
    }

    #[test]
    fn test_plain_sprite_is_solid() {
        let mut clut = Clut::new();
        let (sel, globals) = opaque_context()
            .resolve(PrimitiveClass::Sprite, &mut clut)
            .unwrap();

        assert!(sel.is_solid_rect());
        assert_eq!(sel.ztst(), selector::ztst::OFF);
        assert!(!sel.rfb());
        assert_eq!(globals.frame.bw, 1);
    }

    #[test]
    fn test_fully_masked_draw_is_dropped() {
        let mut ctx = opaque_context();
        ctx.regs.frame.fbmsk = 0xffff_ffff;

        let mut clut = Clut::new();
        assert!(ctx.resolve(PrimitiveClass::Triangle, &mut clut).is_none());

        // With depth writes the draw still has an effect
        ctx.regs.zbuf.zmsk = false;
        assert!(ctx.resolve(PrimitiveClass::Triangle, &mut clut).is_some());
    }

    #[test]
    fn test_depth_never_is_dropped() {
        let mut ctx = opaque_context();
        ctx.regs.test.zte = true;
        ctx.regs.test.ztst = 0;

        let mut clut = Clut::new();
        assert!(ctx.resolve(PrimitiveClass::Triangle, &mut clut).is_none());
    }

    #[test]
    fn test_16bit_frame_mask_is_packed() {
        let mut ctx = opaque_context();
        ctx.regs.frame.psm = 0x02;
        ctx.regs.frame.fbmsk = 0x0000_00f8;

        let mut clut = Clut::new();
        let (sel, globals) = ctx.resolve(PrimitiveClass::Sprite, &mut clut).unwrap();
        assert_eq!(sel.fpsm(), selector::fpsm::CT16);
        assert_eq!(globals.fm, 0x001f);
        assert!(sel.rfb());
    }

    #[test]
    fn test_opaque_blend_is_disabled() {
        let mut ctx = opaque_context();
        ctx.flags = PrimFlags::ABE;

        // (Cs - Cs) * As + Cs
        ctx.regs.alpha = Alpha::default();
        let mut clut = Clut::new();
        let (sel, _) = ctx.resolve(PrimitiveClass::Triangle, &mut clut).unwrap();
        assert!(!sel.abe());

        // (Cs - Cd) * As + Cd
        ctx.regs.alpha = Alpha {
            a: 0,
            b: 1,
            c: 0,
            d: 1,
            fix: 0,
        };
        let (sel, _) = ctx.resolve(PrimitiveClass::Triangle, &mut clut).unwrap();
        assert!(sel.abe());
        assert!(sel.rfb());
        assert!(!sel.is_solid_rect());
    }

    #[test]
    fn test_texture_constants() {
        let mut ctx = opaque_context();
        ctx.flags = PrimFlags::TME | PrimFlags::FST;
        ctx.regs.tex0 = Tex0 {
            tbp0: 0x100,
            tbw: 2,
            psm: 0x00,
            tw: 6,
            th: 5,
            ..Default::default()
        };
        ctx.regs.clamp = Clamp {
            wms: selector::wrap::CLAMP as u8,
            wmt: selector::wrap::REGION_REPEAT as u8,
            minv: 0x0f,
            maxv: 0x30,
            ..Default::default()
        };

        let mut clut = Clut::new();
        let (sel, globals) = ctx.resolve(PrimitiveClass::Triangle, &mut clut).unwrap();
        assert_eq!(sel.tfx(), selector::tfx::MODULATE);
        assert!(sel.fst());
        assert_eq!(globals.tex_size, [64.0, 32.0]);
        assert_eq!(globals.wrap[0].apply(sel.wms(), 70), 63);
        assert_eq!(globals.wrap[0].apply(sel.wms(), -3), 0);
        assert_eq!(globals.wrap[1].apply(sel.wmt(), 0x45), 0x35);
    }

    #[test]
    fn test_wrap_repeat_handles_negative_coordinates() {
        let wrap = TexWrap::new(selector::wrap::REPEAT, 16, 0, 0);
        assert_eq!(wrap.apply(selector::wrap::REPEAT, -1), 15);
        assert_eq!(wrap.apply(selector::wrap::REPEAT, 17), 1);
    }
}
