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

//! Bulk local memory operations
//!
//! Rectangle fills, local-to-local moves, raw block copies and the host
//! image transfer stream. Every operation is expressed through the same
//! per-pixel primitives the pixel pipeline uses, so a bulk operation is
//! observably identical to looping [`VideoMemory::write_pixel`].
//!
//! Host transfers pack pixels densely: 4 bytes per CT32 pixel, 3 per CT24,
//! 2 per 16-bit pixel, 1 per 8-bit pixel and 2 pixels per byte (low nibble
//! first) for 4-bit formats.

use super::{PixelFormat, VideoMemory};

/// Transfer coordinates wrap at 2048 pixels in both directions
const COORD_MASK: u32 = 0x7ff;

/// Axis-aligned rectangle in buffer pixels
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    /// Create a rectangle from its edges (right/bottom exclusive)
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Create a rectangle from an origin and a size
    pub const fn with_size(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub const fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub const fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A buffer in local memory: base pointer, width and storage mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferDesc {
    /// Base pointer in 256-byte blocks
    pub bp: u32,

    /// Width in units of 64 pixels
    pub bw: u32,

    /// Pixel storage mode
    pub psm: PixelFormat,
}

impl BufferDesc {
    pub const fn new(bp: u32, bw: u32, psm: PixelFormat) -> Self {
        Self { bp, bw, psm }
    }

    /// Storage offset of a pixel of this buffer
    #[inline]
    pub fn address(&self, x: u32, y: u32) -> u32 {
        self.psm.address(x, y, self.bp, self.bw)
    }
}

/// Direction selected by the TRXDIR register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Host to local memory upload
    HostToLocal,
    /// Local memory to host readback
    LocalToHost,
    /// Local memory to local memory move
    LocalToLocal,
    /// Transmission deactivated
    Off,
}

impl TransferDirection {
    /// Decode the XDIR field
    pub fn from_bits(xdir: u64) -> Self {
        match xdir & 3 {
            0 => TransferDirection::HostToLocal,
            1 => TransferDirection::LocalToHost,
            2 => TransferDirection::LocalToLocal,
            _ => TransferDirection::Off,
        }
    }
}

/// An in-flight host image transfer
///
/// The transfer walks its rectangle row by row. Data may arrive in chunks
/// of any size; bytes that do not yet form a whole pixel are kept until the
/// next chunk.
#[derive(Debug, Clone)]
pub struct ImageTransfer {
    buffer: BufferDesc,
    rect: Rect,
    /// Offset of the next pixel inside the rectangle
    column: u32,
    row: u32,
    /// Bytes of an incomplete pixel carried between chunks
    pending: Vec<u8>,
}

impl ImageTransfer {
    /// Start a transfer covering `rect` of `buffer`
    pub fn new(buffer: BufferDesc, rect: Rect) -> Self {
        log::debug!(
            "Image transfer: bp=0x{:04X} bw={} psm={:?} rect={}x{} at ({}, {})",
            buffer.bp,
            buffer.bw,
            buffer.psm,
            rect.width(),
            rect.height(),
            rect.left,
            rect.top
        );

        Self {
            buffer,
            rect,
            column: 0,
            row: 0,
            pending: Vec::new(),
        }
    }

    /// Destination (or source) buffer
    pub fn buffer(&self) -> BufferDesc {
        self.buffer
    }

    /// Rectangle covered by the transfer
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Whether every pixel of the rectangle has been transferred
    pub fn is_complete(&self) -> bool {
        self.rect.is_empty() || self.row >= self.rect.height()
    }

    /// Pixels left before the transfer completes
    pub fn remaining_pixels(&self) -> u32 {
        if self.is_complete() {
            return 0;
        }
        (self.rect.height() - self.row) * self.rect.width() - self.column
    }

    /// Coordinates of the next pixel, wrapped to the 2048x2048 space
    fn position(&self) -> (u32, u32) {
        (
            (self.rect.left + self.column) & COORD_MASK,
            (self.rect.top + self.row) & COORD_MASK,
        )
    }

    fn advance(&mut self) {
        self.column += 1;
        if self.column >= self.rect.width() {
            self.column = 0;
            self.row += 1;
        }
    }

    /// Upload packed host data into local memory
    ///
    /// # Returns
    ///
    /// Number of pixels written. Data past the end of the rectangle is
    /// ignored.
    pub fn write(&mut self, vm: &VideoMemory, data: &[u8]) -> usize {
        let psm = self.buffer.psm;
        let bits = psm.bits_per_pixel();
        let mut written = 0;

        if bits == 4 {
            for &byte in data {
                for value in [byte & 0xf, byte >> 4] {
                    if self.is_complete() {
                        return written;
                    }
                    let (x, y) = self.position();
                    vm.write_pixel(psm, self.buffer.address(x, y), value as u32);
                    self.advance();
                    written += 1;
                }
            }
            return written;
        }

        let bytes_per_pixel = (bits / 8) as usize;
        self.pending.extend_from_slice(data);

        let mut consumed = 0;
        while !self.is_complete() && self.pending.len() - consumed >= bytes_per_pixel {
            let mut raw = [0u8; 4];
            raw[..bytes_per_pixel]
                .copy_from_slice(&self.pending[consumed..consumed + bytes_per_pixel]);
            consumed += bytes_per_pixel;

            let (x, y) = self.position();
            vm.write_pixel(psm, self.buffer.address(x, y), u32::from_le_bytes(raw));
            self.advance();
            written += 1;
        }

        if self.is_complete() {
            self.pending.clear();
        } else {
            self.pending.drain(..consumed);
        }

        written
    }

    /// Read local memory back into a packed host buffer
    ///
    /// Only whole pixels are produced (whole bytes for 4-bit formats; an odd
    /// trailing pixel leaves the high nibble zero).
    ///
    /// # Returns
    ///
    /// Number of bytes filled in `out`
    pub fn read(&mut self, vm: &VideoMemory, out: &mut [u8]) -> usize {
        let psm = self.buffer.psm;
        let bits = psm.bits_per_pixel();
        let mut filled = 0;

        if bits == 4 {
            for byte in out.iter_mut() {
                if self.is_complete() {
                    break;
                }
                let mut packed = 0u8;
                for shift in [0, 4] {
                    if self.is_complete() {
                        break;
                    }
                    let (x, y) = self.position();
                    let value = vm.read_pixel(psm, self.buffer.address(x, y)) as u8;
                    packed |= (value & 0xf) << shift;
                    self.advance();
                }
                *byte = packed;
                filled += 1;
            }
            return filled;
        }

        let bytes_per_pixel = (bits / 8) as usize;
        for chunk in out.chunks_exact_mut(bytes_per_pixel) {
            if self.is_complete() {
                break;
            }
            let (x, y) = self.position();
            let value = vm.read_pixel(psm, self.buffer.address(x, y));
            chunk.copy_from_slice(&value.to_le_bytes()[..bytes_per_pixel]);
            self.advance();
            filled += bytes_per_pixel;
        }

        filled
    }
}

impl VideoMemory {
    /// Fill a rectangle of a buffer with one raw pixel value
    pub fn fill_rect(&self, buffer: BufferDesc, rect: Rect, value: u32) {
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                self.write_pixel(buffer.psm, buffer.address(x, y), value);
            }
        }
    }

    /// Copy a rectangle between two buffers
    ///
    /// Source pixels are read in the source format and written in the
    /// destination format. `reverse_x` / `reverse_y` select the walk order
    /// (the TRXPOS DIR bits), which matters when the rectangles overlap.
    ///
    /// # Arguments
    ///
    /// * `src` - Source buffer
    /// * `src_origin` - Top-left pixel of the source rectangle
    /// * `dst` - Destination buffer
    /// * `dst_origin` - Top-left pixel of the destination rectangle
    /// * `size` - Rectangle width and height
    /// * `reverse_x` - Walk columns right to left
    /// * `reverse_y` - Walk rows bottom to top
    #[allow(clippy::too_many_arguments)]
    pub fn move_rect(
        &self,
        src: BufferDesc,
        src_origin: (u32, u32),
        dst: BufferDesc,
        dst_origin: (u32, u32),
        size: (u32, u32),
        reverse_x: bool,
        reverse_y: bool,
    ) {
        let (w, h) = size;
        let (sx, sy) = src_origin;
        let (dx, dy) = dst_origin;

        log::debug!(
            "Local move: {}x{} from ({}, {}) {:?} to ({}, {}) {:?}",
            w,
            h,
            sx,
            sy,
            src.psm,
            dx,
            dy,
            dst.psm
        );

        for j in 0..h {
            let row = if reverse_y { h - 1 - j } else { j };
            for i in 0..w {
                let col = if reverse_x { w - 1 - i } else { i };

                let s = src.address((sx + col) & COORD_MASK, (sy + row) & COORD_MASK);
                let d = dst.address((dx + col) & COORD_MASK, (dy + row) & COORD_MASK);
                let value = self.read_pixel(src.psm, s);
                self.write_pixel(dst.psm, d, value);
            }
        }
    }

    /// Read the 64 words of a 256-byte block
    pub fn read_block(&self, bp: u32) -> [u32; 64] {
        let base = bp << 6;
        std::array::from_fn(|i| self.read32(base + i as u32))
    }

    /// Overwrite the 64 words of a 256-byte block
    pub fn write_block(&self, bp: u32, block: &[u32; 64]) {
        let base = bp << 6;
        for (i, &word) in block.iter().enumerate() {
            self.write32(base + i as u32, word);
        }
    }

    /// Copy one raw 256-byte block to another block
    pub fn copy_block(&self, src_bp: u32, dst_bp: u32) {
        let block = self.read_block(src_bp);
        self.write_block(dst_bp, &block);
    }
}
