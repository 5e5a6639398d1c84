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

//! Test fixtures for common drawing scenarios

use echo_gs::core::gs::registers::{
    address, BitBltBuf, Frame, PrimFlags, Scissor, Tex0, TrxPos, TrxReg, Zbuf,
};
use echo_gs::core::gs::Gs;

/// Frame buffer width in pixels
#[allow(dead_code)]
pub const WIDTH: u16 = 256;

/// Frame buffer height in pixels
#[allow(dead_code)]
pub const HEIGHT: u16 = 128;

/// Depth buffer base page (right after the frame)
#[allow(dead_code)]
pub const ZBP: u16 = 16;

/// Create a device drawing into a CT32 frame at block 0
///
/// The depth buffer is a Z32 buffer after the frame; depth testing is off.
#[allow(dead_code)]
pub fn create_device(lanes: usize) -> Gs {
    let mut gs = Gs::with_lanes(lanes).expect("Failed to create device");
    let frame = Frame {
        fbw: (WIDTH / 64) as u8,
        ..Default::default()
    };
    let zbuf = Zbuf {
        zbp: ZBP,
        ..Default::default()
    };
    let scissor = Scissor {
        scax0: 0,
        scax1: WIDTH - 1,
        scay0: 0,
        scay1: HEIGHT - 1,
    };
    write(&mut gs, address::FRAME_1, frame.to_bits());
    write(&mut gs, address::ZBUF_1, zbuf.to_bits());
    write(&mut gs, address::SCISSOR_1, scissor.to_bits());
    gs
}

/// Write a register, failing the test on error
#[allow(dead_code)]
pub fn write(gs: &mut Gs, addr: u8, value: u64) {
    gs.write_register(addr, value)
        .unwrap_or_else(|e| panic!("Register 0x{:02X} write failed: {}", addr, e));
}

/// XYZ2 value for a whole-pixel position
#[allow(dead_code)]
pub fn xyz(x: u16, y: u16, z: u32) -> u64 {
    (z as u64) << 32 | ((y as u64) << 4) << 16 | (x as u64) << 4
}

/// RGBAQ value with Q = 1.0
#[allow(dead_code)]
pub fn rgbaq(color: u32) -> u64 {
    (1.0f32.to_bits() as u64) << 32 | color as u64
}

/// UV value for a whole-texel position
#[allow(dead_code)]
pub fn uv(u: u16, v: u16) -> u64 {
    ((v as u64) << 4) << 16 | (u as u64) << 4
}

/// Draw a flat sprite covering `[x0, x1) x [y0, y1)`
#[allow(dead_code)]
pub fn sprite(gs: &mut Gs, (x0, y0): (u16, u16), (x1, y1): (u16, u16), color: u32) {
    write(gs, address::PRIM, 6);
    write(gs, address::RGBAQ, rgbaq(color));
    write(gs, address::XYZ2, xyz(x0, y0, 0));
    write(gs, address::XYZ2, xyz(x1, y1, 0));
}

/// Draw a Gouraud-shaded triangle
#[allow(dead_code)]
pub fn gouraud_triangle(gs: &mut Gs, corners: [((u16, u16), u32); 3]) {
    write(gs, address::PRIM, 3 | PrimFlags::IIP.bits());
    for ((x, y), color) in corners {
        write(gs, address::RGBAQ, rgbaq(color));
        write(gs, address::XYZ2, xyz(x, y, 0));
    }
}

/// Upload packed pixel data to `(0, 0)` of a buffer
#[allow(dead_code)]
pub fn upload(gs: &mut Gs, dbp: u16, dbw: u8, dpsm: u8, size: (u16, u16), data: &[u8]) {
    let buf = BitBltBuf {
        dbp,
        dbw,
        dpsm,
        ..Default::default()
    };
    let reg = TrxReg {
        rrw: size.0,
        rrh: size.1,
    };
    write(gs, address::BITBLTBUF, buf.to_bits());
    write(gs, address::TRXPOS, TrxPos::default().to_bits());
    write(gs, address::TRXREG, reg.to_bits());
    write(gs, address::TRXDIR, 0);
    gs.write_image(data).expect("Image upload failed");
}

/// Upload a 16-entry CT32 palette and a 16x16 T4 texture of one index
///
/// Returns the TEX0 value that loads the palette and selects the texture
/// with the decal function.
#[allow(dead_code)]
pub fn indexed_texture(gs: &mut Gs, tbp: u16, cbp: u16, palette: &[u32; 16], index: u8) -> u64 {
    let colors: Vec<u8> = palette.iter().flat_map(|c| c.to_le_bytes()).collect();
    upload(gs, cbp, 1, 0x00, (8, 2), &colors);

    let texels = vec![index | index << 4; 16 * 16 / 2];
    upload(gs, tbp, 2, 0x14, (16, 16), &texels);

    Tex0 {
        tbp0: tbp,
        tbw: 2,
        psm: 0x14,
        tw: 4,
        th: 4,
        tcc: true,
        tfx: 1,
        cbp,
        cld: 1,
        ..Default::default()
    }
    .to_bits()
}
