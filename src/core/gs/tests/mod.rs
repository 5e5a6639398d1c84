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

//! GS device tests
//!
//! Tests are organized into the following modules:
//! - `intake`: register normalization, attribute sources, SIGNAL/FINISH/LABEL
//! - `drawing`: vertex kicks, primitive assembly and draw submission
//! - `transfer`: host/local image transfers and invalidation
//! - `freeze`: device freeze and defrost

mod drawing;
mod transfer;

use super::registers::address;
use super::Gs;
use crate::core::memory::PixelFormat;

/// One-lane device drawing into a 64-pixel-wide CT32 frame at block 0
///
/// Depth writes are masked and the scissor covers 64x64 pixels.
fn setup() -> Gs {
    let mut gs = Gs::with_lanes(1).unwrap();
    gs.write_register(address::FRAME_1, 1 << 16).unwrap();
    gs.write_register(address::ZBUF_1, 1 << 32).unwrap();
    gs.write_register(address::SCISSOR_1, 63 << 16 | 63 << 48)
        .unwrap();
    gs
}

/// XYZ2 value for a whole-pixel position
fn xyz(x: u16, y: u16, z: u32) -> u64 {
    (z as u64) << 32 | ((y as u64) << 4) << 16 | (x as u64) << 4
}

/// RGBAQ value with Q = 1.0
fn rgbaq(r: u8, g: u8, b: u8, a: u8) -> u64 {
    (1.0f32.to_bits() as u64) << 32
        | (a as u64) << 24
        | (b as u64) << 16
        | (g as u64) << 8
        | r as u64
}

/// Frame pixel of the [`setup`] frame
fn pixel(gs: &Gs, x: u32, y: u32) -> u32 {
    gs.vm().read_pixel_xy(PixelFormat::Ct32, x, y, 0, 1)
}

/// Draw a flat sprite covering `[x0, x1) x [y0, y1)`
fn sprite(gs: &mut Gs, (x0, y0): (u16, u16), (x1, y1): (u16, u16), color: u64) {
    gs.write_register(address::PRIM, 6).unwrap();
    gs.write_register(address::RGBAQ, color).unwrap();
    gs.write_register(address::XYZ2, xyz(x0, y0, 0)).unwrap();
    gs.write_register(address::XYZ2, xyz(x1, y1, 0)).unwrap();
}
