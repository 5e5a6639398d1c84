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

//! GS register type definitions
//!
//! Every general-purpose GS register is a 64-bit value written through the
//! A+D path. This module provides typed views of those values: each view
//! decodes its fields with `from_bits` and re-encodes them with `to_bits`,
//! so a view round-trips every bit it defines.
//!
//! # References
//!
//! - [PS2 GS User's Manual, section 7: Registers](https://psi-rockin.github.io/ps2tek/#gsregisters)

use bitflags::bitflags;

/// A+D register addresses
pub mod address {
    pub const PRIM: u8 = 0x00;
    pub const RGBAQ: u8 = 0x01;
    pub const ST: u8 = 0x02;
    pub const UV: u8 = 0x03;
    pub const XYZF2: u8 = 0x04;
    pub const XYZ2: u8 = 0x05;
    pub const TEX0_1: u8 = 0x06;
    pub const TEX0_2: u8 = 0x07;
    pub const CLAMP_1: u8 = 0x08;
    pub const CLAMP_2: u8 = 0x09;
    pub const FOG: u8 = 0x0a;
    pub const XYZF3: u8 = 0x0c;
    pub const XYZ3: u8 = 0x0d;
    pub const TEX1_1: u8 = 0x14;
    pub const TEX1_2: u8 = 0x15;
    pub const TEX2_1: u8 = 0x16;
    pub const TEX2_2: u8 = 0x17;
    pub const XYOFFSET_1: u8 = 0x18;
    pub const XYOFFSET_2: u8 = 0x19;
    pub const PRMODECONT: u8 = 0x1a;
    pub const PRMODE: u8 = 0x1b;
    pub const TEXCLUT: u8 = 0x1c;
    pub const SCANMSK: u8 = 0x22;
    pub const MIPTBP1_1: u8 = 0x34;
    pub const MIPTBP1_2: u8 = 0x35;
    pub const MIPTBP2_1: u8 = 0x36;
    pub const MIPTBP2_2: u8 = 0x37;
    pub const TEXA: u8 = 0x3b;
    pub const FOGCOL: u8 = 0x3d;
    pub const TEXFLUSH: u8 = 0x3f;
    pub const SCISSOR_1: u8 = 0x40;
    pub const SCISSOR_2: u8 = 0x41;
    pub const ALPHA_1: u8 = 0x42;
    pub const ALPHA_2: u8 = 0x43;
    pub const DIMX: u8 = 0x44;
    pub const DTHE: u8 = 0x45;
    pub const COLCLAMP: u8 = 0x46;
    pub const TEST_1: u8 = 0x47;
    pub const TEST_2: u8 = 0x48;
    pub const PABE: u8 = 0x49;
    pub const FBA_1: u8 = 0x4a;
    pub const FBA_2: u8 = 0x4b;
    pub const FRAME_1: u8 = 0x4c;
    pub const FRAME_2: u8 = 0x4d;
    pub const ZBUF_1: u8 = 0x4e;
    pub const ZBUF_2: u8 = 0x4f;
    pub const BITBLTBUF: u8 = 0x50;
    pub const TRXPOS: u8 = 0x51;
    pub const TRXREG: u8 = 0x52;
    pub const TRXDIR: u8 = 0x53;
    pub const HWREG: u8 = 0x54;
    pub const SIGNAL: u8 = 0x60;
    pub const FINISH: u8 = 0x61;
    pub const LABEL: u8 = 0x62;
}

/// A register field type that can be extracted from / inserted into a 64-bit value
pub trait Field: Copy {
    fn extract(bits: u64, shift: u32, width: u32) -> Self;
    fn insert(self, shift: u32, width: u32) -> u64;
}

#[inline]
const fn field_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

macro_rules! impl_field {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                #[inline]
                fn extract(bits: u64, shift: u32, width: u32) -> Self {
                    ((bits >> shift) & field_mask(width)) as $ty
                }

                #[inline]
                fn insert(self, shift: u32, width: u32) -> u64 {
                    ((self as u64) & field_mask(width)) << shift
                }
            }
        )*
    };
}

impl_field!(u8, u16, u32);

impl Field for bool {
    #[inline]
    fn extract(bits: u64, shift: u32, _width: u32) -> Self {
        (bits >> shift) & 1 != 0
    }

    #[inline]
    fn insert(self, shift: u32, _width: u32) -> u64 {
        (self as u64) << shift
    }
}

/// Declare a register view: `field: type = shift, width;`
macro_rules! register {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $ty:ty = $shift:literal, $width:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
        }

        impl $name {
            /// Decode the register from its raw 64-bit value
            #[inline]
            pub fn from_bits(bits: u64) -> Self {
                Self {
                    $($field: <$ty as Field>::extract(bits, $shift, $width),)*
                }
            }

            /// Encode the register back into its raw 64-bit value
            #[inline]
            pub fn to_bits(&self) -> u64 {
                0 $(| Field::insert(self.$field, $shift, $width))*
            }
        }
    };
}

bitflags! {
    /// Drawing attribute bits shared by PRIM and PRMODE
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PrimFlags: u64 {
        /// Gouraud shading
        const IIP = 1 << 3;
        /// Texture mapping
        const TME = 1 << 4;
        /// Fogging
        const FGE = 1 << 5;
        /// Alpha blending
        const ABE = 1 << 6;
        /// Antialiasing
        const AA1 = 1 << 7;
        /// UV (fixed point) texture coordinates instead of STQ
        const FST = 1 << 8;
        /// Use drawing context 2
        const CTXT = 1 << 9;
        /// Fragment value control
        const FIX = 1 << 10;
    }
}

bitflags! {
    /// Host-visible status bits (subset of CSR)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StatusFlags: u64 {
        /// A SIGNAL register write was received
        const SIGNAL = 1 << 0;
        /// A FINISH register write was received
        const FINISH = 1 << 1;
    }
}

/// Primitive type field of PRIM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimType {
    #[default]
    Point,
    Line,
    LineStrip,
    Triangle,
    TriangleStrip,
    TriangleFan,
    Sprite,
    Reserved,
}

impl PrimType {
    pub fn from_bits(bits: u64) -> Self {
        match bits & 7 {
            0 => PrimType::Point,
            1 => PrimType::Line,
            2 => PrimType::LineStrip,
            3 => PrimType::Triangle,
            4 => PrimType::TriangleStrip,
            5 => PrimType::TriangleFan,
            6 => PrimType::Sprite,
            _ => PrimType::Reserved,
        }
    }

    pub fn to_bits(self) -> u64 {
        self as u64
    }

    /// Vertices needed before the first primitive of this type is drawn
    pub fn vertex_count(self) -> usize {
        match self {
            PrimType::Point => 1,
            PrimType::Line | PrimType::LineStrip | PrimType::Sprite => 2,
            PrimType::Triangle | PrimType::TriangleStrip | PrimType::TriangleFan => 3,
            PrimType::Reserved => usize::MAX,
        }
    }
}

/// PRIM: primitive type and drawing attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prim {
    pub kind: PrimType,
    pub flags: PrimFlags,
}

impl Prim {
    pub fn from_bits(bits: u64) -> Self {
        Self {
            kind: PrimType::from_bits(bits),
            flags: PrimFlags::from_bits_truncate(bits),
        }
    }

    pub fn to_bits(&self) -> u64 {
        self.kind.to_bits() | self.flags.bits()
    }
}

register! {
    /// RGBAQ: vertex colour and the Q of STQ texture coordinates
    Rgbaq {
        r: u8 = 0, 8;
        g: u8 = 8, 8;
        b: u8 = 16, 8;
        a: u8 = 24, 8;
        /// IEEE-754 bit pattern of Q
        q: u32 = 32, 32;
    }
}

impl Rgbaq {
    pub fn q_f32(&self) -> f32 {
        f32::from_bits(self.q)
    }
}

register! {
    /// ST: perspective texture coordinates (IEEE-754 bit patterns)
    St {
        s: u32 = 0, 32;
        t: u32 = 32, 32;
    }
}

register! {
    /// UV: texel coordinates in 10.4 fixed point
    Uv {
        u: u16 = 0, 14;
        v: u16 = 16, 14;
    }
}

register! {
    /// XYZ2 / XYZ3: vertex position in 12.4 fixed point with 32-bit depth
    Xyz {
        x: u16 = 0, 16;
        y: u16 = 16, 16;
        z: u32 = 32, 32;
    }
}

register! {
    /// XYZF2 / XYZF3: vertex position with 24-bit depth and a fog coefficient
    Xyzf {
        x: u16 = 0, 16;
        y: u16 = 16, 16;
        z: u32 = 32, 24;
        f: u8 = 56, 8;
    }
}

register! {
    /// FOG: vertex fog coefficient
    Fog {
        f: u8 = 56, 8;
    }
}

register! {
    /// TEX0: texture buffer and CLUT setup
    Tex0 {
        /// Texture base pointer (256-byte blocks)
        tbp0: u16 = 0, 14;
        /// Texture buffer width (64-pixel units)
        tbw: u8 = 14, 6;
        psm: u8 = 20, 6;
        /// log2 of texture width
        tw: u8 = 26, 4;
        /// log2 of texture height
        th: u8 = 30, 4;
        /// Use texture alpha
        tcc: bool = 34, 1;
        tfx: u8 = 35, 2;
        /// CLUT base pointer
        cbp: u16 = 37, 14;
        cpsm: u8 = 51, 4;
        /// CLUT storage mode (false = CSM1, true = CSM2)
        csm: bool = 55, 1;
        /// CLUT entry offset (16-entry units)
        csa: u8 = 56, 5;
        /// CLUT load control
        cld: u8 = 61, 3;
    }
}

register! {
    /// TEX1: LOD and filtering
    Tex1 {
        lcm: bool = 0, 1;
        mxl: u8 = 2, 3;
        /// Magnification filter (true = bilinear)
        mmag: bool = 5, 1;
        mmin: u8 = 6, 3;
        mtba: bool = 9, 1;
        l: u8 = 19, 2;
        k: u16 = 32, 12;
    }
}

impl Tex1 {
    /// Whether the magnification filter is bilinear
    pub fn is_linear(&self) -> bool {
        self.mmag
    }
}

register! {
    /// TEX2: CLUT-only subset of TEX0
    Tex2 {
        psm: u8 = 20, 6;
        cbp: u16 = 37, 14;
        cpsm: u8 = 51, 4;
        csm: bool = 55, 1;
        csa: u8 = 56, 5;
        cld: u8 = 61, 3;
    }
}

impl Tex2 {
    /// Fold the CLUT fields into a TEX0 value
    pub fn apply_to(&self, tex0: &mut Tex0) {
        tex0.psm = self.psm;
        tex0.cbp = self.cbp;
        tex0.cpsm = self.cpsm;
        tex0.csm = self.csm;
        tex0.csa = self.csa;
        tex0.cld = self.cld;
    }
}

register! {
    /// CLAMP: texture wrap modes
    Clamp {
        wms: u8 = 0, 2;
        wmt: u8 = 2, 2;
        minu: u16 = 4, 10;
        maxu: u16 = 14, 10;
        minv: u16 = 24, 10;
        maxv: u16 = 34, 10;
    }
}

register! {
    /// TEXCLUT: CLUT position for CSM2
    TexClut {
        /// Buffer width (64-pixel units)
        cbw: u8 = 0, 6;
        /// X offset (16-pixel units)
        cou: u8 = 6, 6;
        cov: u16 = 12, 10;
    }
}

register! {
    /// TEXA: alpha expansion of 16/24-bit texels
    Texa {
        ta0: u8 = 0, 8;
        /// Transparent black: rgb == 0 expands to alpha 0
        aem: bool = 15, 1;
        ta1: u8 = 32, 8;
    }
}

register! {
    /// FOGCOL: distant fog colour
    FogCol {
        fcr: u8 = 0, 8;
        fcg: u8 = 8, 8;
        fcb: u8 = 16, 8;
    }
}

register! {
    /// SCISSOR: inclusive drawing window
    Scissor {
        scax0: u16 = 0, 11;
        scax1: u16 = 16, 11;
        scay0: u16 = 32, 11;
        scay1: u16 = 48, 11;
    }
}

register! {
    /// ALPHA: blend equation `((A - B) * C >> 7) + D`
    Alpha {
        a: u8 = 0, 2;
        b: u8 = 2, 2;
        c: u8 = 4, 2;
        d: u8 = 6, 2;
        fix: u8 = 32, 8;
    }
}

register! {
    /// TEST: pixel tests
    Test {
        /// Alpha test enable
        ate: bool = 0, 1;
        atst: u8 = 1, 3;
        aref: u8 = 4, 8;
        afail: u8 = 12, 2;
        /// Destination alpha test enable
        date: bool = 14, 1;
        datm: bool = 15, 1;
        /// Depth test enable
        zte: bool = 16, 1;
        ztst: u8 = 17, 2;
    }
}

register! {
    /// FRAME: frame buffer setup
    Frame {
        /// Frame base pointer (2048-word pages)
        fbp: u16 = 0, 9;
        fbw: u8 = 16, 6;
        psm: u8 = 24, 6;
        /// Bits set here are not written
        fbmsk: u32 = 32, 32;
    }
}

impl Frame {
    /// Base pointer in 256-byte blocks
    pub fn block(&self) -> u32 {
        (self.fbp as u32) << 5
    }
}

register! {
    /// ZBUF: depth buffer setup
    Zbuf {
        zbp: u16 = 0, 9;
        /// Low four bits of the depth PSM (the upper bits are always 0x30)
        psm: u8 = 24, 4;
        /// Depth writes disabled
        zmsk: bool = 32, 1;
    }
}

impl Zbuf {
    /// Base pointer in 256-byte blocks
    pub fn block(&self) -> u32 {
        (self.zbp as u32) << 5
    }

    /// Full PSM code of the depth buffer
    pub fn psm_code(&self) -> u32 {
        0x30 | self.psm as u32
    }
}

register! {
    /// XYOFFSET: primitive to window coordinate offset (12.4 fixed point)
    XyOffset {
        ofx: u16 = 0, 16;
        ofy: u16 = 32, 16;
    }
}

register! {
    /// PRMODECONT: attribute source (true = PRIM, false = PRMODE)
    PrModeCont {
        ac: bool = 0, 1;
    }
}

register! {
    /// SCANMSK: raster row masking
    ScanMsk {
        msk: u8 = 0, 2;
    }
}

register! {
    /// DTHE: dithering enable
    Dthe {
        dthe: bool = 0, 1;
    }
}

register! {
    /// COLCLAMP: colour clamp control
    ColClamp {
        clamp: bool = 0, 1;
    }
}

register! {
    /// PABE: per-pixel alpha blending enable
    Pabe {
        pabe: bool = 0, 1;
    }
}

register! {
    /// FBA: force the alpha MSB of written pixels
    Fba {
        fba: bool = 0, 1;
    }
}

register! {
    /// MIPTBP1: base pointers of mipmap levels 1-3
    MipTbp1 {
        tbp1: u16 = 0, 14;
        tbw1: u8 = 14, 6;
        tbp2: u16 = 20, 14;
        tbw2: u8 = 34, 6;
        tbp3: u16 = 40, 14;
        tbw3: u8 = 54, 6;
    }
}

register! {
    /// MIPTBP2: base pointers of mipmap levels 4-6
    MipTbp2 {
        tbp4: u16 = 0, 14;
        tbw4: u8 = 14, 6;
        tbp5: u16 = 20, 14;
        tbw5: u8 = 34, 6;
        tbp6: u16 = 40, 14;
        tbw6: u8 = 54, 6;
    }
}

register! {
    /// BITBLTBUF: transfer source and destination buffers
    BitBltBuf {
        sbp: u16 = 0, 14;
        sbw: u8 = 16, 6;
        spsm: u8 = 24, 6;
        dbp: u16 = 32, 14;
        dbw: u8 = 48, 6;
        dpsm: u8 = 56, 6;
    }
}

register! {
    /// TRXPOS: transfer rectangle origins and local move direction
    TrxPos {
        ssax: u16 = 0, 11;
        ssay: u16 = 16, 11;
        dsax: u16 = 32, 11;
        dsay: u16 = 48, 11;
        /// Walk rows bottom to top
        diry: bool = 59, 1;
        /// Walk columns right to left
        dirx: bool = 60, 1;
    }
}

register! {
    /// TRXREG: transfer rectangle size
    TrxReg {
        rrw: u16 = 0, 12;
        rrh: u16 = 32, 12;
    }
}

register! {
    /// TRXDIR: transfer activation
    TrxDir {
        xdir: u8 = 0, 2;
    }
}

register! {
    /// SIGNAL / LABEL: ID value and update mask
    SignalLabel {
        id: u32 = 0, 32;
        idmsk: u32 = 32, 32;
    }
}

/// DIMX: 4x4 ordered dither matrix of signed 3-bit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimx {
    bits: u64,
}

impl Dimx {
    pub fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    pub fn to_bits(&self) -> u64 {
        self.bits
    }

    /// Entry at row `y`, column `x` (both 0..4), in -4..=3
    pub fn entry(&self, y: usize, x: usize) -> i8 {
        let raw = ((self.bits >> (16 * (y & 3) + 4 * (x & 3))) & 7) as i8;
        (raw << 5) >> 5
    }

    /// The whole matrix, indexed `[y][x]`
    pub fn matrix(&self) -> [[i8; 4]; 4] {
        std::array::from_fn(|y| std::array::from_fn(|x| self.entry(y, x)))
    }
}
