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

//! Register intake
//!
//! Handles writes arriving through the A+D path. Most registers are stored
//! as written; a few are normalized on the way in, the same way the
//! hardware treats their reserved encodings:
//! - TEX0 clamps TW/TH to 10, masks CPSM and rounds an odd TBW down for
//!   T8/T4, then gives the CLUT a chance to load
//! - ZBUF forces the depth mask while its address word is zero and maps an
//!   invalid PSM to Z32
//! - ALPHA maps selector value 3 to 2 in all four blend inputs
//! - BITBLTBUF rounds odd T8/T4 buffer widths down
//!
//! XYZ2/XYZF2 add a vertex and draw once enough vertices are queued;
//! XYZ3/XYZF3 add a vertex without drawing.

use super::freeze::CONTEXT_REGISTERS;
use super::registers::{
    address, Alpha, BitBltBuf, Clamp, ColClamp, Dimx, Dthe, Fba, Fog, FogCol, Frame, MipTbp1,
    MipTbp2, Pabe, PrModeCont, Prim, PrimFlags, PrimType, Rgbaq, ScanMsk, Scissor, SignalLabel,
    St, StatusFlags, Test, Tex0, Tex1, Tex2, TexClut, Texa, TrxDir, TrxPos, TrxReg, Uv,
    XyOffset, Xyz, Xyzf, Zbuf,
};
use super::render::{DrawBatch, PrimitiveClass, Vertex};
use super::{ContextRegisters, Gs};
use crate::core::error::{GsError, Result};
use crate::core::memory::PixelFormat;

/// Valid depth buffer PSM codes
const DEPTH_FORMATS: [u32; 4] = [0x30, 0x31, 0x32, 0x3a];

/// Shape class a PRIM type draws, `None` for the reserved type
fn primitive_class(kind: PrimType) -> Option<PrimitiveClass> {
    match kind {
        PrimType::Point => Some(PrimitiveClass::Point),
        PrimType::Line | PrimType::LineStrip => Some(PrimitiveClass::Line),
        PrimType::Triangle | PrimType::TriangleStrip | PrimType::TriangleFan => {
            Some(PrimitiveClass::Triangle)
        }
        PrimType::Sprite => Some(PrimitiveClass::Sprite),
        PrimType::Reserved => None,
    }
}

/// Whether a PSM code is one whose buffer width must be even
fn needs_even_width(psm: u8) -> bool {
    psm as u32 == PixelFormat::T8.code() || psm as u32 == PixelFormat::T4.code()
}

/// Map the reserved blend input 3 to 2 in every ALPHA selector
fn normalize_alpha(mut alpha: Alpha) -> Alpha {
    for field in [&mut alpha.a, &mut alpha.b, &mut alpha.c, &mut alpha.d] {
        if *field == 3 {
            *field = 2;
        }
    }
    alpha
}

/// Context index and context-1 address of a per-context register
pub(super) fn context_slot(addr: u8) -> Option<(usize, u8)> {
    CONTEXT_REGISTERS
        .iter()
        .find_map(|&first| match addr.checked_sub(first) {
            Some(i @ 0..=1) => Some((i as usize, first)),
            _ => None,
        })
}

/// Raw value of a per-context register, addressed by its context-1 address
fn context_bits(regs: &ContextRegisters, first: u8) -> u64 {
    match first {
        address::XYOFFSET_1 => regs.xyoffset.to_bits(),
        address::TEX0_1 => regs.tex0.to_bits(),
        address::TEX1_1 => regs.tex1.to_bits(),
        address::TEX2_1 => regs.tex2.to_bits(),
        address::CLAMP_1 => regs.clamp.to_bits(),
        address::MIPTBP1_1 => regs.miptbp1.to_bits(),
        address::MIPTBP2_1 => regs.miptbp2.to_bits(),
        address::SCISSOR_1 => regs.scissor.to_bits(),
        address::ALPHA_1 => regs.alpha.to_bits(),
        address::TEST_1 => regs.test.to_bits(),
        address::FBA_1 => regs.fba.to_bits(),
        address::FRAME_1 => regs.frame.to_bits(),
        address::ZBUF_1 => regs.zbuf.to_bits(),
        _ => unreachable!("0x{:02X} is not a context register", first),
    }
}

/// Store a per-context register verbatim
fn set_context_bits(regs: &mut ContextRegisters, first: u8, bits: u64) {
    match first {
        address::XYOFFSET_1 => regs.xyoffset = XyOffset::from_bits(bits),
        address::TEX0_1 => regs.tex0 = Tex0::from_bits(bits),
        address::TEX1_1 => regs.tex1 = Tex1::from_bits(bits),
        address::TEX2_1 => regs.tex2 = Tex2::from_bits(bits),
        address::CLAMP_1 => regs.clamp = Clamp::from_bits(bits),
        address::MIPTBP1_1 => regs.miptbp1 = MipTbp1::from_bits(bits),
        address::MIPTBP2_1 => regs.miptbp2 = MipTbp2::from_bits(bits),
        address::SCISSOR_1 => regs.scissor = Scissor::from_bits(bits),
        address::ALPHA_1 => regs.alpha = Alpha::from_bits(bits),
        address::TEST_1 => regs.test = Test::from_bits(bits),
        address::FBA_1 => regs.fba = Fba::from_bits(bits),
        address::FRAME_1 => regs.frame = Frame::from_bits(bits),
        address::ZBUF_1 => regs.zbuf = Zbuf::from_bits(bits),
        _ => unreachable!("0x{:02X} is not a context register", first),
    }
}

impl Gs {
    /// Write a GS register through the A+D path
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (see [`address`])
    /// * `value` - Raw 64-bit register value
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is not a GS register (the write is ignored)
    /// - HWREG is written while no host-to-local transfer is active
    pub fn write_register(&mut self, addr: u8, value: u64) -> Result<()> {
        log::trace!("GS register 0x{:02X} = 0x{:016X}", addr, value);

        match addr {
            address::PRIM => self.write_prim(Prim::from_bits(value)),
            address::RGBAQ => self.vertex.rgbaq = Rgbaq::from_bits(value),
            address::ST => self.vertex.st = St::from_bits(value),
            address::UV => self.vertex.uv = Uv::from_bits(value),
            address::XYZF2 | address::XYZF3 => {
                let xyzf = Xyzf::from_bits(value);
                self.vertex.fog = Fog { f: xyzf.f };
                let xyz = Xyz {
                    x: xyzf.x,
                    y: xyzf.y,
                    z: xyzf.z,
                };
                self.push_vertex(xyz, addr == address::XYZF2);
            }
            address::XYZ2 | address::XYZ3 => {
                self.push_vertex(Xyz::from_bits(value), addr == address::XYZ2)
            }
            address::FOG => self.vertex.fog = Fog::from_bits(value),

            address::TEX0_1 | address::TEX0_2 => {
                let i = (addr - address::TEX0_1) as usize;
                let mut tex0 = Tex0::from_bits(value);
                tex0.tw = tex0.tw.min(10);
                tex0.th = tex0.th.min(10);
                self.apply_tex0(i, tex0);
                self.update_mip_levels(i);
            }
            address::TEX2_1 | address::TEX2_2 => {
                let i = (addr - address::TEX2_1) as usize;
                let tex2 = Tex2::from_bits(value);
                let mut tex0 = self.env.ctxt[i].tex0;
                tex2.apply_to(&mut tex0);
                self.env.ctxt[i].tex2 = tex2;
                self.apply_tex0(i, tex0);
            }
            address::ALPHA_1 | address::ALPHA_2 => {
                let i = (addr - address::ALPHA_1) as usize;
                self.env.ctxt[i].alpha = normalize_alpha(Alpha::from_bits(value));
            }
            address::ZBUF_1 | address::ZBUF_2 => {
                let i = (addr - address::ZBUF_1) as usize;
                let mut zbuf = Zbuf::from_bits(value);
                if value as u32 == 0 {
                    // Registers are cleared to zero at startup; keep depth masked until set up
                    zbuf.zmsk = true;
                }
                if !DEPTH_FORMATS.contains(&zbuf.psm_code()) {
                    zbuf.psm = 0;
                }
                self.env.ctxt[i].zbuf = zbuf;
            }
            address::PRMODECONT => self.env.prmodecont = PrModeCont::from_bits(value),
            address::PRMODE => self.env.prmode = PrimFlags::from_bits_truncate(value),
            address::TEXCLUT => self.env.texclut = TexClut::from_bits(value),
            address::SCANMSK => self.env.scanmsk = ScanMsk::from_bits(value),
            address::TEXA => self.env.texa = Texa::from_bits(value),
            address::FOGCOL => self.env.fogcol = FogCol::from_bits(value),
            address::TEXFLUSH => log::trace!("TEXFLUSH"),
            address::DIMX => self.env.dimx = Dimx::from_bits(value),
            address::DTHE => self.env.dthe = Dthe::from_bits(value),
            address::COLCLAMP => self.env.colclamp = ColClamp::from_bits(value),
            address::PABE => self.env.pabe = Pabe::from_bits(value),

            address::BITBLTBUF => {
                let mut buf = BitBltBuf::from_bits(value);
                if buf.sbw & 1 != 0 && needs_even_width(buf.spsm) {
                    buf.sbw &= !1;
                }
                if buf.dbw & 1 != 0 && needs_even_width(buf.dpsm) {
                    buf.dbw &= !1;
                }
                self.env.bitbltbuf = buf;
            }
            address::TRXPOS => self.env.trxpos = TrxPos::from_bits(value),
            address::TRXREG => self.env.trxreg = TrxReg::from_bits(value),
            address::TRXDIR => self.write_trxdir(TrxDir::from_bits(value)),
            address::HWREG => {
                self.write_image(&value.to_le_bytes())?;
            }

            address::SIGNAL => {
                let signal = SignalLabel::from_bits(value);
                self.sigid = (self.sigid & !signal.idmsk) | (signal.id & signal.idmsk);
                self.status.insert(StatusFlags::SIGNAL);
                log::debug!("SIGNAL: id=0x{:08X}", self.sigid);
            }
            address::FINISH => {
                self.status.insert(StatusFlags::FINISH);
                log::debug!("FINISH");
            }
            address::LABEL => {
                let label = SignalLabel::from_bits(value);
                self.lblid = (self.lblid & !label.idmsk) | (label.id & label.idmsk);
            }

            _ => match context_slot(addr) {
                Some((i, first)) => set_context_bits(&mut self.env.ctxt[i], first, value),
                None => {
                    log::warn!(
                        "Ignoring write to unknown GS register 0x{:02X} (value 0x{:016X})",
                        addr,
                        value
                    );
                    return Err(GsError::UnknownRegister { address: addr });
                }
            },
        }

        Ok(())
    }

    /// PRIM write: new primitive type, vertex queue restarts
    fn write_prim(&mut self, prim: Prim) {
        if prim.kind == PrimType::Reserved {
            log::warn!("PRIM set to the reserved primitive type; vertices will be dropped");
        }
        self.env.prim = prim;
        self.queue.clear();
    }

    /// Store a normalized TEX0 and load the CLUT if it asks for it
    fn apply_tex0(&mut self, i: usize, mut tex0: Tex0) {
        tex0.cpsm &= 0xa;
        if tex0.tbw & 1 != 0 && needs_even_width(tex0.psm) {
            tex0.tbw &= !1;
        }

        self.env.ctxt[i].tex0 = tex0;

        if self.clut.write_test(&tex0, &self.env.texclut) {
            self.clut.write(&self.vm, &tex0, &self.env.texclut);
        }
    }

    /// Derive MIPTBP1 from TEX0 when TEX1.MTBA asks for automatic mipmap addresses
    fn update_mip_levels(&mut self, i: usize) {
        let ctxt = &mut self.env.ctxt[i];
        if !ctxt.tex1.mtba || ctxt.tex0.th < 3 {
            return;
        }

        let bpp = PixelFormat::from_code(ctxt.tex0.psm as u32)
            .info()
            .storage_bits_per_pixel as u32;
        let mut tbp = ctxt.tex0.tbp0 as u32;
        let mut tbw = ctxt.tex0.tbw as u32;
        let mut th = ctxt.tex0.th as u32;

        let mut levels = [(0u16, 0u8); 3];
        for level in levels.iter_mut() {
            tbp += ((((tbw << 6) * (1 << th) * bpp) >> 3) + 255) >> 8;
            tbw = (tbw >> 1).max(1);
            th -= 1;
            *level = (tbp as u16, tbw as u8);
        }

        let [(tbp1, tbw1), (tbp2, tbw2), (tbp3, tbw3)] = levels;
        ctxt.miptbp1 = MipTbp1 {
            tbp1,
            tbw1,
            tbp2,
            tbw2,
            tbp3,
            tbw3,
        };
    }

    /// Assemble a vertex from the current attribute registers and queue it
    ///
    /// With `kick` set, a primitive is drawn as soon as the queue holds
    /// enough vertices for one.
    fn push_vertex(&mut self, xyz: Xyz, kick: bool) {
        self.vertex.xyz = xyz;

        let kind = self.env.prim.kind;
        let Some(class) = primitive_class(kind) else {
            log::trace!("Vertex dropped: reserved primitive type");
            self.queue.clear();
            return;
        };

        let flags = self.attributes();
        let offset = self.env.ctxt[flags.contains(PrimFlags::CTXT) as usize].xyoffset;
        let regs = &self.vertex;

        self.queue.push(Vertex {
            x: (xyz.x as i32 - offset.ofx as i32) as f32 / 16.0,
            y: (xyz.y as i32 - offset.ofy as i32) as f32 / 16.0,
            z: xyz.z,
            rgba: [regs.rgbaq.r, regs.rgbaq.g, regs.rgbaq.b, regs.rgbaq.a],
            s: f32::from_bits(regs.st.s),
            t: f32::from_bits(regs.st.t),
            q: regs.rgbaq.q_f32(),
            u: regs.uv.u as f32 / 16.0,
            v: regs.uv.v as f32 / 16.0,
            fog: regs.fog.f,
        });

        // Fans keep their first vertex, everything else drops the oldest
        let needed = kind.vertex_count();
        while self.queue.len() > needed {
            let oldest = if kind == PrimType::TriangleFan { 1 } else { 0 };
            self.queue.remove(oldest);
        }

        if !kick || self.queue.len() < needed {
            return;
        }

        let batch = DrawBatch::new(class, self.queue.clone(), self.drawing_context());
        match kind {
            PrimType::LineStrip | PrimType::TriangleStrip => {
                self.queue.remove(0);
            }
            PrimType::TriangleFan => {
                self.queue.remove(1);
            }
            _ => self.queue.clear(),
        }

        self.submit(batch);
    }

    /// Raw value of a stored register, for freezing
    pub(super) fn register_bits(&self, addr: u8) -> u64 {
        if let Some((i, first)) = context_slot(addr) {
            return context_bits(&self.env.ctxt[i], first);
        }

        let env = &self.env;
        match addr {
            address::PRIM => env.prim.to_bits(),
            address::PRMODE => env.prmode.bits(),
            address::PRMODECONT => env.prmodecont.to_bits(),
            address::TEXCLUT => env.texclut.to_bits(),
            address::SCANMSK => env.scanmsk.to_bits(),
            address::TEXA => env.texa.to_bits(),
            address::FOGCOL => env.fogcol.to_bits(),
            address::DIMX => env.dimx.to_bits(),
            address::DTHE => env.dthe.to_bits(),
            address::COLCLAMP => env.colclamp.to_bits(),
            address::PABE => env.pabe.to_bits(),
            address::BITBLTBUF => env.bitbltbuf.to_bits(),
            address::TRXDIR => env.trxdir.to_bits(),
            address::TRXPOS => env.trxpos.to_bits(),
            address::TRXREG => env.trxreg.to_bits(),
            address::RGBAQ => self.vertex.rgbaq.to_bits(),
            address::ST => self.vertex.st.to_bits(),
            address::UV => self.vertex.uv.to_bits(),
            address::XYZ2 => self.vertex.xyz.to_bits(),
            address::FOG => self.vertex.fog.to_bits(),
            _ => unreachable!("0x{:02X} is not a stored register", addr),
        }
    }

    /// Store a register value verbatim, without any intake side effects
    pub(super) fn restore_register(&mut self, addr: u8, bits: u64) {
        if let Some((i, first)) = context_slot(addr) {
            set_context_bits(&mut self.env.ctxt[i], first, bits);
            return;
        }

        let env = &mut self.env;
        match addr {
            address::PRIM => env.prim = Prim::from_bits(bits),
            address::PRMODE => env.prmode = PrimFlags::from_bits_truncate(bits),
            address::PRMODECONT => env.prmodecont = PrModeCont::from_bits(bits),
            address::TEXCLUT => env.texclut = TexClut::from_bits(bits),
            address::SCANMSK => env.scanmsk = ScanMsk::from_bits(bits),
            address::TEXA => env.texa = Texa::from_bits(bits),
            address::FOGCOL => env.fogcol = FogCol::from_bits(bits),
            address::DIMX => env.dimx = Dimx::from_bits(bits),
            address::DTHE => env.dthe = Dthe::from_bits(bits),
            address::COLCLAMP => env.colclamp = ColClamp::from_bits(bits),
            address::PABE => env.pabe = Pabe::from_bits(bits),
            address::BITBLTBUF => env.bitbltbuf = BitBltBuf::from_bits(bits),
            address::TRXDIR => env.trxdir = TrxDir::from_bits(bits),
            address::TRXPOS => env.trxpos = TrxPos::from_bits(bits),
            address::TRXREG => env.trxreg = TrxReg::from_bits(bits),
            address::RGBAQ => self.vertex.rgbaq = Rgbaq::from_bits(bits),
            address::ST => self.vertex.st = St::from_bits(bits),
            address::UV => self.vertex.uv = Uv::from_bits(bits),
            address::XYZ2 => self.vertex.xyz = Xyz::from_bits(bits),
            address::FOG => self.vertex.fog = Fog::from_bits(bits),
            _ => unreachable!("0x{:02X} is not a stored register", addr),
        }
    }
}
