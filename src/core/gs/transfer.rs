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

//! Image transfers driven by BITBLTBUF / TRXPOS / TRXREG / TRXDIR
//!
//! Writing TRXDIR starts a transfer in the direction it names:
//! - 0: host to local, payload arrives through [`Gs::write_image`] or HWREG
//! - 1: local to host, payload is drained with [`Gs::read_image`]
//! - 2: local to local, performed immediately
//! - 3: deactivated
//!
//! A completed upload (and a local move) sends the rewritten rectangle to
//! the invalidation signal so a stale palette is reloaded.

use super::registers::TrxDir;
use super::{ActiveTransfer, Gs};
use crate::core::error::{GsError, Result};
use crate::core::memory::{BufferDesc, ImageTransfer, PixelFormat, Rect, TransferDirection};

impl Gs {
    /// Source buffer of BITBLTBUF
    fn source_buffer(&self) -> BufferDesc {
        let buf = &self.env.bitbltbuf;
        BufferDesc::new(
            buf.sbp as u32,
            buf.sbw as u32,
            PixelFormat::from_code(buf.spsm as u32),
        )
    }

    /// Destination buffer of BITBLTBUF
    fn destination_buffer(&self) -> BufferDesc {
        let buf = &self.env.bitbltbuf;
        BufferDesc::new(
            buf.dbp as u32,
            buf.dbw as u32,
            PixelFormat::from_code(buf.dpsm as u32),
        )
    }

    /// TRXDIR write: activate a transfer
    pub(super) fn write_trxdir(&mut self, trxdir: TrxDir) {
        self.env.trxdir = trxdir;

        if let Some(active) = self.transfer.take() {
            log::debug!(
                "{:?} transfer abandoned with {} pixels left",
                active.direction,
                active.image.remaining_pixels()
            );
        }

        let pos = self.env.trxpos;
        let size = (self.env.trxreg.rrw as u32, self.env.trxreg.rrh as u32);

        let direction = TransferDirection::from_bits(trxdir.xdir as u64);
        match direction {
            TransferDirection::HostToLocal => {
                let rect = Rect::with_size(pos.dsax as u32, pos.dsay as u32, size.0, size.1);
                let image = ImageTransfer::new(self.destination_buffer(), rect);
                self.transfer = Some(ActiveTransfer { direction, image });
            }
            TransferDirection::LocalToHost => {
                let rect = Rect::with_size(pos.ssax as u32, pos.ssay as u32, size.0, size.1);
                let image = ImageTransfer::new(self.source_buffer(), rect);
                self.transfer = Some(ActiveTransfer { direction, image });
            }
            TransferDirection::LocalToLocal => {
                let dst = self.destination_buffer();
                let dst_origin = (pos.dsax as u32, pos.dsay as u32);

                self.vm.move_rect(
                    self.source_buffer(),
                    (pos.ssax as u32, pos.ssay as u32),
                    dst,
                    dst_origin,
                    size,
                    pos.dirx,
                    pos.diry,
                );

                let rect = Rect::with_size(dst_origin.0, dst_origin.1, size.0, size.1);
                self.invalidate(dst.bp, dst.bw, dst.psm, rect);
            }
            TransferDirection::Off => log::trace!("Image transfer deactivated"),
        }
    }

    /// Feed host data into the active host-to-local transfer
    ///
    /// Data may arrive in chunks of any size. Data past the end of the
    /// transfer rectangle is ignored.
    ///
    /// # Returns
    ///
    /// Number of pixels written to local memory
    ///
    /// # Errors
    ///
    /// Returns [`GsError::NoActiveTransfer`] if no host-to-local transfer is
    /// in progress
    pub fn write_image(&mut self, data: &[u8]) -> Result<usize> {
        let active = match self.transfer.as_mut() {
            Some(active) if active.direction == TransferDirection::HostToLocal => active,
            _ => return Err(GsError::NoActiveTransfer),
        };

        let written = active.image.write(&self.vm, data);
        if !active.image.is_complete() {
            return Ok(written);
        }

        let buffer = active.image.buffer();
        let rect = active.image.rect();
        self.transfer = None;

        log::debug!(
            "Host to local transfer complete: {}x{} {:?} at 0x{:04X}",
            rect.width(),
            rect.height(),
            buffer.psm,
            buffer.bp
        );
        self.invalidate(buffer.bp, buffer.bw, buffer.psm, rect);

        Ok(written)
    }

    /// Drain the active local-to-host transfer into `out`
    ///
    /// # Returns
    ///
    /// Number of bytes filled
    ///
    /// # Errors
    ///
    /// Returns [`GsError::NoActiveTransfer`] if no local-to-host transfer is
    /// in progress
    pub fn read_image(&mut self, out: &mut [u8]) -> Result<usize> {
        let active = match self.transfer.as_mut() {
            Some(active) if active.direction == TransferDirection::LocalToHost => active,
            _ => return Err(GsError::NoActiveTransfer),
        };

        let filled = active.image.read(&self.vm, out);
        if active.image.is_complete() {
            log::debug!("Local to host transfer complete");
            self.transfer = None;
        }

        Ok(filled)
    }

    /// Whether a host transfer is waiting for (or holding) data
    pub fn transfer_active(&self) -> bool {
        self.transfer.is_some()
    }
}
