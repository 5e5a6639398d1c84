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

//! Image transfer tests
//! Tests for host-to-local uploads, readback, local moves and invalidation

use super::super::registers::{address, BitBltBuf, Tex0, TrxPos, TrxReg};
use super::super::*;
use super::setup;
use crate::core::error::GsError;
use crate::core::memory::PixelFormat;

const XDIR_HOST_TO_LOCAL: u64 = 0;
const XDIR_LOCAL_TO_HOST: u64 = 1;
const XDIR_LOCAL_TO_LOCAL: u64 = 2;

/// Program BITBLTBUF / TRXPOS / TRXREG and start a transfer
fn start(gs: &mut Gs, buf: BitBltBuf, pos: TrxPos, size: (u16, u16), xdir: u64) {
    gs.write_register(address::BITBLTBUF, buf.to_bits()).unwrap();
    gs.write_register(address::TRXPOS, pos.to_bits()).unwrap();
    let reg = TrxReg {
        rrw: size.0,
        rrh: size.1,
    };
    gs.write_register(address::TRXREG, reg.to_bits()).unwrap();
    gs.write_register(address::TRXDIR, xdir).unwrap();
}

fn upload_target(dbp: u16, dpsm: u8) -> BitBltBuf {
    BitBltBuf {
        dbp,
        dbw: 1,
        dpsm,
        ..Default::default()
    }
}

#[test]
fn test_upload_writes_rectangle() {
    let mut gs = setup();
    let pos = TrxPos {
        dsax: 2,
        dsay: 3,
        ..Default::default()
    };
    start(&mut gs, upload_target(0x200, 0x00), pos, (2, 2), XDIR_HOST_TO_LOCAL);
    assert!(gs.transfer_active());

    let pixels: [u32; 4] = [0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444];
    let bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
    assert_eq!(gs.write_image(&bytes).unwrap(), 4);
    assert!(!gs.transfer_active());

    let read = |x, y| gs.vm().read_pixel_xy(PixelFormat::Ct32, x, y, 0x200, 1);
    assert_eq!(read(2, 3), 0x1111_1111);
    assert_eq!(read(3, 3), 0x2222_2222);
    assert_eq!(read(2, 4), 0x3333_3333);
    assert_eq!(read(3, 4), 0x4444_4444);
    assert_eq!(read(4, 3), 0);
}

#[test]
fn test_upload_accepts_arbitrary_chunks() {
    let mut gs = setup();
    start(
        &mut gs,
        upload_target(0x200, 0x01),
        TrxPos::default(),
        (4, 1),
        XDIR_HOST_TO_LOCAL,
    );

    // Four CT24 pixels, 3 bytes each, fed 5 bytes at a time
    let bytes: Vec<u8> = (1..=12).collect();
    let written: usize = bytes
        .chunks(5)
        .map(|chunk| gs.write_image(chunk).unwrap())
        .sum();
    assert_eq!(written, 4);

    let read = |x| gs.vm().read_pixel_xy(PixelFormat::Ct24, x, 0, 0x200, 1);
    assert_eq!(read(0), 0x03_0201);
    assert_eq!(read(1), 0x06_0504);
    assert_eq!(read(3), 0x0c_0b0a);
}

#[test]
fn test_hwreg_feeds_upload() {
    let mut gs = setup();
    start(
        &mut gs,
        upload_target(0x200, 0x00),
        TrxPos::default(),
        (2, 1),
        XDIR_HOST_TO_LOCAL,
    );

    gs.write_register(address::HWREG, 0xcafe_f00d_dead_beef)
        .unwrap();

    let read = |x| gs.vm().read_pixel_xy(PixelFormat::Ct32, x, 0, 0x200, 1);
    assert_eq!(read(0), 0xdead_beef);
    assert_eq!(read(1), 0xcafe_f00d);
}

#[test]
fn test_payload_without_transfer_is_rejected() {
    let mut gs = setup();

    assert!(matches!(
        gs.write_register(address::HWREG, 0),
        Err(GsError::NoActiveTransfer)
    ));
    assert!(matches!(
        gs.write_image(&[0; 4]),
        Err(GsError::NoActiveTransfer)
    ));

    let mut out = [0u8; 4];
    assert!(matches!(
        gs.read_image(&mut out),
        Err(GsError::NoActiveTransfer)
    ));

    // Uploads do not accept reads and vice versa
    start(
        &mut gs,
        upload_target(0x200, 0x00),
        TrxPos::default(),
        (1, 1),
        XDIR_HOST_TO_LOCAL,
    );
    assert!(matches!(
        gs.read_image(&mut out),
        Err(GsError::NoActiveTransfer)
    ));
}

#[test]
fn test_readback() {
    let mut gs = setup();
    for x in 0..4 {
        gs.vm()
            .write_pixel_xy(PixelFormat::Ct16, 8 + x, 1, 0x300, 1, 0x1000 + x);
    }

    let buf = BitBltBuf {
        sbp: 0x300,
        sbw: 1,
        spsm: 0x02,
        ..Default::default()
    };
    let pos = TrxPos {
        ssax: 8,
        ssay: 1,
        ..Default::default()
    };
    start(&mut gs, buf, pos, (4, 1), XDIR_LOCAL_TO_HOST);

    let mut out = [0u8; 8];
    assert_eq!(gs.read_image(&mut out[..4]).unwrap(), 4);
    assert!(gs.transfer_active());
    assert_eq!(gs.read_image(&mut out[4..]).unwrap(), 4);
    assert!(!gs.transfer_active());

    assert_eq!(out, [0x00, 0x10, 0x01, 0x10, 0x02, 0x10, 0x03, 0x10]);
}

#[test]
fn test_local_move_honours_direction() {
    let mut gs = setup();
    for x in 0..4 {
        gs.vm()
            .write_pixel_xy(PixelFormat::Ct32, x, 0, 0x200, 1, x + 1);
    }

    let buf = BitBltBuf {
        sbp: 0x200,
        sbw: 1,
        spsm: 0x00,
        dbp: 0x200,
        dbw: 1,
        dpsm: 0x00,
    };

    // Overlapping move one pixel right, walked right to left
    let pos = TrxPos {
        ssax: 0,
        dsax: 1,
        dirx: true,
        ..Default::default()
    };
    start(&mut gs, buf, pos, (4, 1), XDIR_LOCAL_TO_LOCAL);
    assert!(!gs.transfer_active());

    let row: Vec<u32> = (0..5)
        .map(|x| gs.vm().read_pixel_xy(PixelFormat::Ct32, x, 0, 0x200, 1))
        .collect();
    assert_eq!(row, [1, 1, 2, 3, 4]);
}

#[test]
fn test_upload_over_palette_marks_clut_stale() {
    let mut gs = setup();
    let tex0 = Tex0 {
        psm: 0x13,
        cbp: 0x300,
        cld: 1,
        ..Default::default()
    };
    gs.write_register(address::TEX0_1, tex0.to_bits()).unwrap();
    assert!(!gs.clut().is_dirty());

    start(
        &mut gs,
        upload_target(0x300, 0x00),
        TrxPos::default(),
        (1, 1),
        XDIR_HOST_TO_LOCAL,
    );

    // Not complete yet
    gs.write_image(&[0xff, 0xff]).unwrap();
    assert!(!gs.clut().is_dirty());

    gs.write_image(&[0xff, 0xff]).unwrap();
    assert!(gs.clut().is_dirty());

    // The next TEX0 reloads the palette
    gs.write_register(address::TEX0_1, tex0.to_bits()).unwrap();
    assert_eq!(gs.clut().reload_count(), 2);
}

#[test]
fn test_trxdir_abandons_previous_transfer() {
    let mut gs = setup();
    start(
        &mut gs,
        upload_target(0x200, 0x00),
        TrxPos::default(),
        (4, 4),
        XDIR_HOST_TO_LOCAL,
    );
    gs.write_image(&[1, 2, 3, 4]).unwrap();

    gs.write_register(address::TRXDIR, 3).unwrap();
    assert!(!gs.transfer_active());
    assert!(gs.write_image(&[0; 4]).is_err());
}
