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

//! Per-pixel algorithm
//!
//! This is the body every specialized routine runs for each pixel of a span:
//!
//! 1. Depth test against the depth buffer
//! 2. Texture sample (wrap, bilinear filter, palette lookup)
//! 3. Texture function (combine texel and vertex colour)
//! 4. Alpha test, with the AFAIL action deciding what still gets written
//! 5. Fog
//! 6. Destination alpha test
//! 7. Depth write
//! 8. Alpha blend, dither, clamp and FBA
//! 9. Pack into the frame format and write under FBMSK
//!
//! Routines are specialized at compile time: [`select_kernel`] picks a
//! monomorphized [`span_kernel`] for the texture/blend/depth-test axes, the
//! remaining axes are read from the [`Selector`] per pixel.
//!
//! # References
//!
//! - [GS User's Manual, section 3.4: Pixel operations](https://psi-rockin.github.io/ps2tek/#gs)

use super::super::clut::{expand_16, expand_24};
use super::super::context::ScanlineGlobals;
use super::super::selector::{self, Selector};
use super::{Attributes, Span};
use crate::core::memory::VideoMemory;

/// Transfer coordinates wrap at 2048 pixels
const COORD_MASK: u32 = 0x7ff;

/// Everything a routine reads while shading a span
pub struct SpanContext<'a> {
    pub sel: Selector,
    pub globals: &'a ScanlineGlobals,
    pub vm: &'a VideoMemory,
}

/// Shade one span, returning the number of pixels written
pub type SpanKernel = fn(&SpanContext<'_>, &Span) -> u32;

/// Pack a 32-bit colour into the 16-bit frame format
#[inline]
pub fn pack16(c: u32) -> u32 {
    ((c >> 16) & 0x8000) | ((c >> 9) & 0x7c00) | ((c >> 6) & 0x03e0) | ((c >> 3) & 0x001f)
}

/// Unpack a 16-bit frame pixel into a 32-bit colour (alpha bit becomes 0x80)
#[inline]
pub fn unpack16(c: u32) -> u32 {
    ((c & 0x8000) << 16) | ((c & 0x7c00) << 9) | ((c & 0x03e0) << 6) | ((c & 0x001f) << 3)
}

#[inline]
fn to_rgba(c: u32) -> [i32; 4] {
    [
        (c & 0xff) as i32,
        ((c >> 8) & 0xff) as i32,
        ((c >> 16) & 0xff) as i32,
        (c >> 24) as i32,
    ]
}

/// Frame bits that exist in the frame format
#[inline]
fn frame_bits(sel: Selector) -> u32 {
    if sel.is_16bit_frame() {
        0xffff
    } else if sel.is_24bit_frame() {
        0x00ff_ffff
    } else {
        u32::MAX
    }
}

/// One blend equation: `((A - B) * C >> 7) + D` per colour channel
///
/// A, B and D select from source colour, destination colour or zero
/// ([`selector::blend_color`]); C selects from source alpha, destination
/// alpha or the fixed coefficient ([`selector::blend_alpha`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendEquation {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub fix: i32,
}

impl BlendEquation {
    /// `(Cs + Cd) / 2`
    pub const fn average() -> Self {
        Self::fixed(selector::blend_color::SOURCE, selector::blend_color::DEST, 0x40)
    }

    /// `Cs + Cd`
    pub const fn additive() -> Self {
        Self::fixed(selector::blend_color::SOURCE, selector::blend_color::ZERO, 0x80)
    }

    /// `Cd - Cs`
    pub const fn subtractive() -> Self {
        Self::fixed(selector::blend_color::ZERO, selector::blend_color::SOURCE, 0x80)
    }

    /// `Cs / 2 + Cd`
    pub const fn add_half_source() -> Self {
        Self::fixed(selector::blend_color::SOURCE, selector::blend_color::ZERO, 0x40)
    }

    const fn fixed(a: u32, b: u32, fix: i32) -> Self {
        Self {
            a,
            b,
            c: selector::blend_alpha::FIX,
            d: selector::blend_color::DEST,
            fix,
        }
    }

    /// Equation configured by a selector
    pub fn from_selector(sel: Selector, fix: i32) -> Self {
        Self {
            a: sel.aba(),
            b: sel.abb(),
            c: sel.abc(),
            d: sel.abd(),
            fix,
        }
    }

    #[inline]
    fn operand(corner: u32, cs: i32, cd: i32) -> i32 {
        match corner {
            selector::blend_color::SOURCE => cs,
            selector::blend_color::DEST => cd,
            _ => 0,
        }
    }

    /// Blend without saturation (dithering is added before the clamp)
    #[inline]
    pub fn raw(&self, cs: [i32; 4], cd: [i32; 4]) -> [i32; 3] {
        let c = match self.c {
            selector::blend_alpha::SOURCE => cs[3],
            selector::blend_alpha::DEST => cd[3],
            _ => self.fix,
        };

        std::array::from_fn(|i| {
            let a = Self::operand(self.a, cs[i], cd[i]);
            let b = Self::operand(self.b, cs[i], cd[i]);
            let d = Self::operand(self.d, cs[i], cd[i]);
            (((a - b) * c) >> 7) + d
        })
    }

    /// Blend and saturate each channel to `0..=255`
    pub fn blend(&self, cs: [i32; 4], cd: [i32; 4]) -> [i32; 3] {
        self.raw(cs, cd).map(|v| v.clamp(0, 255))
    }
}

/// Combine a texel with the vertex colour
///
/// # Arguments
///
/// * `tfx` - Texture function ([`selector::tfx`])
/// * `tcc` - Take alpha from the texture
/// * `t` - Texel as RGBA
/// * `c` - Vertex colour as RGBA
pub fn texture_function(tfx: u32, tcc: bool, t: [i32; 4], c: [i32; 4]) -> [i32; 4] {
    let modulate = |i: usize| ((t[i] * c[i]) >> 7).min(255);

    match tfx {
        selector::tfx::MODULATE => [
            modulate(0),
            modulate(1),
            modulate(2),
            if tcc { modulate(3) } else { c[3] },
        ],
        selector::tfx::DECAL => [t[0], t[1], t[2], if tcc { t[3] } else { c[3] }],
        selector::tfx::HIGHLIGHT | selector::tfx::HIGHLIGHT2 => {
            let alpha = match (tcc, tfx) {
                (false, _) => c[3],
                (true, selector::tfx::HIGHLIGHT) => (t[3] + c[3]).min(255),
                (true, _) => t[3],
            };
            [
                (modulate(0) + c[3]).min(255),
                (modulate(1) + c[3]).min(255),
                (modulate(2) + c[3]).min(255),
                alpha,
            ]
        }
        _ => c,
    }
}

/// Evaluate the alpha test operator ([`selector::atst`])
#[inline]
pub fn alpha_test(atst: u32, a: i32, aref: i32) -> bool {
    match atst {
        selector::atst::NEVER => false,
        selector::atst::ALWAYS => true,
        selector::atst::LESS => a < aref,
        selector::atst::LEQUAL => a <= aref,
        selector::atst::EQUAL => a == aref,
        selector::atst::GEQUAL => a >= aref,
        selector::atst::GREATER => a > aref,
        _ => a != aref,
    }
}

/// Fetch one texel, wrapped and expanded to 32 bits
#[inline]
fn fetch_texel(ctx: &SpanContext<'_>, u: i32, v: i32) -> u32 {
    let g = ctx.globals;
    let u = g.wrap[0].apply(ctx.sel.wms(), u) as u32 & COORD_MASK;
    let v = g.wrap[1].apply(ctx.sel.wmt(), v) as u32 & COORD_MASK;
    let raw = ctx.vm.read_pixel(g.tex.psm, g.tex.address(u, v));

    match ctx.sel.tpsm() {
        selector::tpsm::CT24 => expand_24(raw, &g.texa),
        selector::tpsm::CT16 => expand_16(raw, &g.texa),
        selector::tpsm::T8 | selector::tpsm::T4 => g.palette[(raw & 0xff) as usize],
        _ => raw,
    }
}

/// Per-byte `a + (b - a) * f / 16`
#[inline]
fn lerp_texel(a: u32, b: u32, f: i32) -> u32 {
    let a = to_rgba(a);
    let b = to_rgba(b);
    (0..4).fold(0, |acc, i| {
        let v = a[i] + (((b[i] - a[i]) * f) >> 4);
        acc | ((v as u32 & 0xff) << (i * 8))
    })
}

/// Sample the texture at the pixel's coordinates
///
/// Returns `None` when the sampled colour is all zero: such pixels are
/// treated as blank and dropped.
#[inline]
fn sample_texture(ctx: &SpanContext<'_>, attr: &Attributes) -> Option<u32> {
    let g = ctx.globals;
    let (u, v) = if ctx.sel.fst() {
        (attr.u, attr.v)
    } else {
        (
            attr.s / attr.q * g.tex_size[0],
            attr.t / attr.q * g.tex_size[1],
        )
    };

    let texel = if ctx.sel.ltf() {
        let (u, v) = (u - 0.5, v - 0.5);
        let (u0, v0) = (u.floor(), v.floor());
        let fu = ((u - u0) * 16.0) as i32;
        let fv = ((v - v0) * 16.0) as i32;
        let (iu, iv) = (u0 as i32, v0 as i32);

        let top = lerp_texel(
            fetch_texel(ctx, iu, iv),
            fetch_texel(ctx, iu.wrapping_add(1), iv),
            fu,
        );
        let bottom = lerp_texel(
            fetch_texel(ctx, iu, iv.wrapping_add(1)),
            fetch_texel(ctx, iu.wrapping_add(1), iv.wrapping_add(1)),
            fu,
        );
        lerp_texel(top, bottom, fv)
    } else {
        fetch_texel(ctx, u.floor() as i32, v.floor() as i32)
    };

    (texel != 0).then_some(texel)
}

/// Destination colour as RGBA, alpha expanded per frame format
#[inline]
fn dest_color(sel: Selector, fd: u32) -> [i32; 4] {
    if sel.is_16bit_frame() {
        to_rgba(unpack16(fd))
    } else if sel.is_24bit_frame() {
        to_rgba((fd & 0x00ff_ffff) | 0x8000_0000)
    } else {
        to_rgba(fd)
    }
}

/// Run the pixel pipeline for one pixel
///
/// # Returns
///
/// `true` if the frame or depth buffer was written
#[inline(always)]
fn shade_pixel<const TEX: bool, const BLEND: bool, const ZTEST: bool>(
    ctx: &SpanContext<'_>,
    x: i32,
    y: i32,
    attr: &Attributes,
) -> bool {
    let sel = ctx.sel;
    let g = ctx.globals;
    let vm = ctx.vm;
    let (px, py) = (x as u32 & COORD_MASK, y as u32 & COORD_MASK);

    let zs = (attr.z as u64).min(g.zmax as u64) as u32;
    let za = g.zbuf.address(px, py);
    if ZTEST {
        let zd = vm.read_pixel(g.zbuf.psm, za) & g.zmax;
        let pass = match sel.ztst() {
            selector::ztst::GEQUAL => zs >= zd,
            selector::ztst::GREATER => zs > zd,
            _ => true,
        };
        if !pass {
            return false;
        }
    }

    let mut c = attr.color.map(|v| (v as i32).clamp(0, 255));
    if TEX {
        let Some(texel) = sample_texture(ctx, attr) else {
            return false;
        };
        c = texture_function(sel.tfx(), sel.tcc(), to_rgba(texel), c);
    }

    let full = frame_bits(sel);
    let mut fm = g.fm;
    let mut zwrite = sel.zwrite();
    if !alpha_test(sel.atst(), c[3], g.aref) {
        match sel.afail() {
            selector::afail::KEEP => return false,
            selector::afail::FB_ONLY => zwrite = false,
            selector::afail::ZB_ONLY => fm = full,
            _ => {
                zwrite = false;
                fm |= if sel.is_16bit_frame() { 0x8000 } else { 0xff00_0000 };
            }
        }
    }

    if sel.fge() {
        let f = (attr.fog as i32).clamp(0, 255);
        for (ch, fc) in c.iter_mut().zip(g.fog_color) {
            *ch = fc + (((*ch - fc) * f) >> 8);
        }
    }

    let fa = g.frame.address(px, py);
    let fd = if sel.rfb() || fm != 0 {
        vm.read_pixel(g.frame.psm, fa)
    } else {
        0
    };

    if sel.date() {
        let msb = if sel.is_16bit_frame() {
            fd & 0x8000 != 0
        } else {
            fd & 0x8000_0000 != 0
        };
        if msb != sel.datm() {
            return false;
        }
    }

    if zwrite {
        vm.write_pixel(g.zbuf.psm, za, zs);
    }

    if fm & full == full {
        return zwrite;
    }

    let mut rgb = [c[0], c[1], c[2]];
    if BLEND && (!sel.pabe() || c[3] & 0x80 != 0) {
        rgb = BlendEquation::from_selector(sel, g.fix).raw(c, dest_color(sel, fd));
    }

    if sel.dthe() {
        let d = g.dimx[(y & 3) as usize][(x & 3) as usize] as i32;
        for ch in rgb.iter_mut() {
            *ch += d;
        }
    }

    let [r, gr, b] = rgb.map(|v| v.clamp(0, 255) as u32);
    let mut out = r | gr << 8 | b << 16 | (c[3] as u32 & 0xff) << 24;
    if sel.fba() {
        out |= 0x8000_0000;
    }
    if sel.is_16bit_frame() {
        out = pack16(out);
    }

    let value = if fm != 0 { (fd & fm) | (out & !fm) } else { out };
    vm.write_pixel(g.frame.psm, fa, value);
    true
}

/// Shade every pixel of a span
pub fn span_kernel<const TEX: bool, const BLEND: bool, const ZTEST: bool>(
    ctx: &SpanContext<'_>,
    span: &Span,
) -> u32 {
    let mut attr = span.start;
    let mut written = 0;

    for x in span.x0..span.x1 {
        if shade_pixel::<TEX, BLEND, ZTEST>(ctx, x, span.y, &attr) {
            written += 1;
        }
        attr.step(&span.step);
    }

    written
}

/// Pick the kernel specialized for a selector's texture, blend and depth-test axes
pub fn select_kernel(sel: Selector) -> SpanKernel {
    match (sel.is_textured(), sel.abe(), sel.ztest()) {
        (false, false, false) => span_kernel::<false, false, false>,
        (false, false, true) => span_kernel::<false, false, true>,
        (false, true, false) => span_kernel::<false, true, false>,
        (false, true, true) => span_kernel::<false, true, true>,
        (true, false, false) => span_kernel::<true, false, false>,
        (true, false, true) => span_kernel::<true, false, true>,
        (true, true, false) => span_kernel::<true, true, false>,
        (true, true, true) => span_kernel::<true, true, true>,
    }
}

/// Frame and depth values written by the solid fill path
///
/// # Returns
///
/// `(colour in the frame format, clamped depth)`
pub fn solid_values(sel: Selector, globals: &ScanlineGlobals, rgba: [u8; 4], z: u32) -> (u32, u32) {
    let mut color = u32::from_le_bytes(rgba);
    if sel.fba() {
        color |= 0x8000_0000;
    }
    if sel.is_16bit_frame() {
        color = pack16(color);
    }
    (color, z.min(globals.zmax))
}

/// Fill `x0..x1` of row `y` with precomputed frame and depth values
///
/// Used for selectors where [`Selector::is_solid_rect`] holds: no test or
/// blend stage can change the outcome, so the pipeline reduces to a store.
pub fn fill_span(ctx: &SpanContext<'_>, y: i32, x0: i32, x1: i32, color: u32, z: u32) -> u32 {
    let sel = ctx.sel;
    let g = ctx.globals;
    let fm = g.fm;
    let py = y as u32 & COORD_MASK;

    for x in x0..x1 {
        let px = x as u32 & COORD_MASK;
        if sel.fwrite() {
            let fa = g.frame.address(px, py);
            let value = if fm != 0 {
                (ctx.vm.read_pixel(g.frame.psm, fa) & fm) | (color & !fm)
            } else {
                color
            };
            ctx.vm.write_pixel(g.frame.psm, fa, value);
        }
        if sel.zwrite() {
            ctx.vm.write_pixel(g.zbuf.psm, g.zbuf.address(px, py), z);
        }
    }

    (x1 - x0).max(0) as u32
}
