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

//! GS (Graphics Synthesizer) device
//!
//! This module ties the software pixel pipeline together behind the
//! register interface the rest of the console talks to:
//! - Register intake (the A+D path): environment, drawing contexts and
//!   vertex kicks
//! - Draw submission: resolve the drawing context, fetch the specialized
//!   routine and rasterize across the lane pool
//! - Image transfers between the host and local memory
//! - SIGNAL / FINISH / LABEL events
//! - Freeze and defrost of the whole device state
//!
//! # Drawing
//!
//! Every complete primitive is drawn as soon as its last vertex is kicked.
//! The register snapshot it is drawn with is taken at that moment, so a
//! later register write never affects a primitive that has already been
//! kicked.
//!
//! # Example
//!
//! ```
//! use echo_gs::core::gs::{registers::address, Gs};
//! use echo_gs::core::memory::PixelFormat;
//!
//! let mut gs = Gs::with_lanes(1).unwrap();
//! gs.write_register(address::FRAME_1, 1 << 16).unwrap(); // CT32, 64 pixels wide
//! gs.write_register(address::ZBUF_1, 1 << 32).unwrap(); // depth writes off
//! gs.write_register(address::SCISSOR_1, 63 << 16 | 63 << 48).unwrap();
//! gs.write_register(address::PRIM, 0).unwrap(); // points
//! gs.write_register(address::RGBAQ, 0x80ff_0000).unwrap();
//! gs.write_register(address::XYZ2, (5 << 4) << 16 | (3 << 4)).unwrap();
//!
//! assert_eq!(gs.vm().read_pixel_xy(PixelFormat::Ct32, 3, 5, 0, 1), 0x80ff_0000);
//! ```
//!
//! # References
//!
//! - [PS2 GS User's Manual](https://psi-rockin.github.io/ps2tek/#gs)

pub mod clut;
pub mod context;
pub mod freeze;
mod intake;
pub mod registers;
pub mod render;
pub mod selector;
mod transfer;

#[cfg(test)]
mod tests;

pub use clut::Clut;
pub use context::{ContextRegisters, DrawingContext, ScanlineGlobals};
pub use freeze::{FreezeBlob, FREEZE_VERSION};
pub use render::{DrawBatch, PrimitiveClass, Rasterizer, RoutineCache, ScissorRect, Vertex};
pub use selector::Selector;

use crate::core::config::RendererConfig;
use crate::core::error::Result;
use crate::core::memory::{BufferDesc, ImageTransfer, PixelFormat, Rect, TransferDirection, VideoMemory};
use registers::{
    BitBltBuf, ColClamp, Dimx, Dthe, Fog, FogCol, Pabe, PrModeCont, Prim, PrimFlags, Rgbaq,
    ScanMsk, St, StatusFlags, TexClut, Texa, TrxDir, TrxPos, TrxReg, Uv, Xyz,
};
use render::pipeline::SpanContext;

/// Environment registers shared by both drawing contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Environment {
    prim: Prim,
    /// Attribute bits of PRMODE (its type field is never used)
    prmode: PrimFlags,
    prmodecont: PrModeCont,
    texclut: TexClut,
    scanmsk: ScanMsk,
    texa: Texa,
    fogcol: FogCol,
    dimx: Dimx,
    dthe: Dthe,
    colclamp: ColClamp,
    pabe: Pabe,
    bitbltbuf: BitBltBuf,
    trxpos: TrxPos,
    trxreg: TrxReg,
    trxdir: TrxDir,
    ctxt: [ContextRegisters; 2],
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            prim: Prim::default(),
            prmode: PrimFlags::empty(),
            // Attributes come from PRIM after reset
            prmodecont: PrModeCont { ac: true },
            texclut: TexClut::default(),
            scanmsk: ScanMsk::default(),
            texa: Texa::default(),
            fogcol: FogCol::default(),
            dimx: Dimx::default(),
            dthe: Dthe::default(),
            colclamp: ColClamp::default(),
            pabe: Pabe::default(),
            bitbltbuf: BitBltBuf::default(),
            trxpos: TrxPos::default(),
            trxreg: TrxReg::default(),
            trxdir: TrxDir { xdir: 3 },
            ctxt: [ContextRegisters::default(); 2],
        }
    }
}

/// Current vertex attribute registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VertexRegisters {
    rgbaq: Rgbaq,
    st: St,
    uv: Uv,
    xyz: Xyz,
    fog: Fog,
}

impl Default for VertexRegisters {
    fn default() -> Self {
        Self {
            rgbaq: Rgbaq {
                q: 1.0f32.to_bits(),
                ..Rgbaq::default()
            },
            st: St::default(),
            uv: Uv::default(),
            xyz: Xyz::default(),
            fog: Fog::default(),
        }
    }
}

/// Host transfer in progress
#[derive(Debug)]
struct ActiveTransfer {
    direction: TransferDirection,
    image: ImageTransfer,
}

/// Graphics Synthesizer device
///
/// Owns local memory, the CLUT cache, the routine cache and the lane pool.
/// Register writes arrive through [`Gs::write_register`]; draws can also be
/// submitted directly with [`Gs::submit`].
pub struct Gs {
    vm: VideoMemory,
    clut: Clut,
    routines: RoutineCache,
    rasterizer: Rasterizer,

    env: Environment,
    vertex: VertexRegisters,

    /// Vertices kicked since the last primitive was completed
    queue: Vec<Vertex>,

    transfer: Option<ActiveTransfer>,

    status: StatusFlags,
    sigid: u32,
    lblid: u32,

    /// Number of draws that reached the rasterizer
    draw_count: u64,

    log_routine_stats: bool,
}

impl Gs {
    /// Create a device from a renderer configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the lane pool cannot
    /// be created
    pub fn new(config: &RendererConfig) -> Result<Self> {
        config.validate()?;

        let mut gs = Self::with_lanes(config.lanes)?;
        gs.log_routine_stats = config.log_routine_stats;
        Ok(gs)
    }

    /// Create a device with an explicit number of scanline lanes
    pub fn with_lanes(lanes: usize) -> Result<Self> {
        let rasterizer = Rasterizer::new(lanes)?;

        log::info!(
            "GS initialized: {} MiB local memory, {} lanes",
            VideoMemory::SIZE >> 20,
            rasterizer.lanes()
        );

        Ok(Self {
            vm: VideoMemory::new(),
            clut: Clut::new(),
            routines: RoutineCache::new(),
            rasterizer,
            env: Environment::default(),
            vertex: VertexRegisters::default(),
            queue: Vec::with_capacity(4),
            transfer: None,
            status: StatusFlags::empty(),
            sigid: 0,
            lblid: 0,
            draw_count: 0,
            log_routine_stats: false,
        })
    }

    /// Reset registers, status and local memory
    ///
    /// The routine cache survives a reset.
    pub fn reset(&mut self) {
        self.vm.clear();
        self.clut = Clut::new();
        self.env = Environment::default();
        self.vertex = VertexRegisters::default();
        self.queue.clear();
        self.transfer = None;
        self.status = StatusFlags::empty();
        self.sigid = 0;
        self.lblid = 0;
        self.draw_count = 0;

        log::info!("GS reset");
    }

    /// Local memory
    pub fn vm(&self) -> &VideoMemory {
        &self.vm
    }

    /// CLUT cache
    pub fn clut(&self) -> &Clut {
        &self.clut
    }

    /// Routine cache
    pub fn routines(&self) -> &RoutineCache {
        &self.routines
    }

    /// Number of scanline lanes
    pub fn lanes(&self) -> usize {
        self.rasterizer.lanes()
    }

    /// Number of draws that reached the rasterizer
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Host-visible status bits
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Overwrite the status bits (the host acknowledging events)
    pub fn set_status(&mut self, status: StatusFlags) {
        self.status = status;
    }

    /// ID accumulated by SIGNAL writes
    pub fn signal_id(&self) -> u32 {
        self.sigid
    }

    /// ID accumulated by LABEL writes
    pub fn label_id(&self) -> u32 {
        self.lblid
    }

    /// Attribute bits currently in effect (PRIM or PRMODE, per PRMODECONT)
    pub fn attributes(&self) -> PrimFlags {
        if self.env.prmodecont.ac {
            self.env.prim.flags
        } else {
            self.env.prmode
        }
    }

    /// Snapshot of the registers a primitive kicked now would be drawn with
    pub fn drawing_context(&self) -> DrawingContext {
        let flags = self.attributes();
        let ctxt = flags.contains(PrimFlags::CTXT) as usize;

        DrawingContext {
            flags,
            regs: self.env.ctxt[ctxt],
            texa: self.env.texa,
            texclut: self.env.texclut,
            fogcol: self.env.fogcol,
            dimx: self.env.dimx,
            dthe: self.env.dthe,
            colclamp: self.env.colclamp,
            pabe: self.env.pabe,
            scanmsk: self.env.scanmsk,
        }
    }

    /// Draw a batch of primitives
    ///
    /// Resolves the batch's context into a selector, fetches (or builds) the
    /// matching routine and rasterizes the batch across every lane. Returns
    /// once all lanes have finished.
    ///
    /// # Returns
    ///
    /// Number of pixels written (0 if the draw was dropped)
    pub fn submit(&mut self, batch: DrawBatch) -> u64 {
        let Some((sel, globals)) = batch.context.resolve(batch.class, &mut self.clut) else {
            return 0;
        };

        let routine = self.routines.get(sel);
        let ctx = SpanContext {
            sel,
            globals: &globals,
            vm: &self.vm,
        };
        let written = self.rasterizer.draw(&batch, &ctx, &routine);
        self.draw_count += 1;

        if self.log_routine_stats {
            log::debug!(
                "Draw {}: {} pixels, routine {:?} ({} invocations, {} pixels total)",
                self.draw_count,
                written,
                sel,
                routine.invocations(),
                routine.pixels()
            );
        }

        written
    }

    /// Texture / CLUT invalidation signal
    ///
    /// Called whenever a rectangle of a buffer in local memory is rewritten
    /// by something other than the pixel pipeline. Marks the palette stale if
    /// the rewritten blocks may overlap its source.
    pub fn invalidate(&mut self, bp: u32, bw: u32, psm: PixelFormat, rect: Rect) {
        if rect.is_empty() {
            return;
        }

        let (start, end) = block_range(BufferDesc::new(bp, bw, psm), rect);
        log::trace!(
            "Invalidate {:?} rect {:?}: blocks 0x{:04X}..0x{:04X}",
            psm,
            rect,
            start,
            end
        );
        self.clut.invalidate_blocks(start, end);
    }
}

impl std::fmt::Debug for Gs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gs")
            .field("lanes", &self.rasterizer.lanes())
            .field("status", &self.status)
            .field("queued_vertices", &self.queue.len())
            .field("routines", &self.routines.len())
            .field("draw_count", &self.draw_count)
            .finish()
    }
}

/// Blocks `[start, end)` that a rectangle of a buffer can touch
///
/// The range covers every whole page row the rectangle crosses, which is a
/// superset of the blocks actually written.
fn block_range(buffer: BufferDesc, rect: Rect) -> (u32, u32) {
    const BLOCKS_PER_PAGE: u32 = 32;

    let page = buffer.psm.info().page;
    let pages_per_row = ((buffer.bw * 64) / page.width).max(1);
    let first_row = rect.top / page.height;
    let last_row = (rect.bottom.max(rect.top + 1) - 1) / page.height;

    let start = buffer.bp + first_row * pages_per_row * BLOCKS_PER_PAGE;
    let end = buffer.bp + (last_row + 1) * pages_per_row * BLOCKS_PER_PAGE;
    (start, end)
}
