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

//! Drawing tests
//! Tests for vertex kicks, primitive assembly and draw submission

use super::super::registers::{address, PrimFlags};
use super::super::*;
use super::{pixel, rgbaq, setup, sprite, xyz};
use crate::core::memory::{PixelFormat, Rect};

const PRIM_POINT: u64 = 0;
const PRIM_LINE_STRIP: u64 = 2;
const PRIM_TRIANGLE: u64 = 3;
const PRIM_TRIANGLE_STRIP: u64 = 4;
const PRIM_TRIANGLE_FAN: u64 = 5;

#[test]
fn test_point_lands_on_its_pixel() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_POINT).unwrap();
    gs.write_register(address::RGBAQ, rgbaq(0xdd, 0xcc, 0xbb, 0xaa))
        .unwrap();
    gs.write_register(address::XYZ2, xyz(3, 5, 0)).unwrap();

    assert_eq!(pixel(&gs, 3, 5), 0xaabb_ccdd);
    assert_eq!(pixel(&gs, 4, 5), 0);
    assert_eq!(pixel(&gs, 3, 4), 0);
    assert_eq!(gs.draw_count(), 1);
}

#[test]
fn test_xyoffset_is_subtracted() {
    let mut gs = setup();
    gs.write_register(address::XYOFFSET_1, (100 << 4) | (200 << 4) << 32)
        .unwrap();
    gs.write_register(address::PRIM, PRIM_POINT).unwrap();
    gs.write_register(address::RGBAQ, rgbaq(0xff, 0, 0, 0x80))
        .unwrap();
    gs.write_register(address::XYZ2, xyz(103, 205, 0)).unwrap();

    assert_eq!(pixel(&gs, 3, 5), 0x8000_00ff);
}

#[test]
fn test_xyz3_queues_without_drawing() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_POINT).unwrap();
    gs.write_register(address::RGBAQ, rgbaq(1, 2, 3, 4)).unwrap();

    gs.write_register(address::XYZ3, xyz(1, 1, 0)).unwrap();
    assert_eq!(gs.draw_count(), 0);
    assert_eq!(pixel(&gs, 1, 1), 0);

    gs.write_register(address::XYZ2, xyz(2, 2, 0)).unwrap();
    assert_eq!(gs.draw_count(), 1);
    assert_eq!(pixel(&gs, 1, 1), 0);
    assert_ne!(pixel(&gs, 2, 2), 0);
}

#[test]
fn test_triangle_list_draws_every_third_vertex() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE).unwrap();

    let points = [(0, 0), (8, 0), (0, 8), (16, 16), (24, 16), (16, 24)];
    for (i, &(x, y)) in points.iter().enumerate() {
        gs.write_register(address::XYZ2, xyz(x, y, 0)).unwrap();
        assert_eq!(gs.draw_count(), (i as u64 + 1) / 3);
    }
    assert!(gs.queue.is_empty());
}

#[test]
fn test_triangle_strip_reuses_last_two_vertices() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE_STRIP)
        .unwrap();

    for (x, y) in [(0, 0), (0, 8), (8, 0), (8, 8), (16, 0)] {
        gs.write_register(address::XYZ2, xyz(x, y, 0)).unwrap();
    }

    assert_eq!(gs.draw_count(), 3);
    assert_eq!(gs.queue.len(), 2);
    assert_eq!(gs.queue[0].x, 8.0);
    assert_eq!(gs.queue[1].x, 16.0);
}

#[test]
fn test_triangle_fan_keeps_first_vertex() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE_FAN).unwrap();

    for (x, y) in [(10, 10), (20, 10), (20, 20), (10, 20), (0, 20)] {
        gs.write_register(address::XYZ2, xyz(x, y, 0)).unwrap();
    }

    assert_eq!(gs.draw_count(), 3);
    assert_eq!(gs.queue.len(), 2);
    assert_eq!((gs.queue[0].x, gs.queue[0].y), (10.0, 10.0));
    assert_eq!((gs.queue[1].x, gs.queue[1].y), (0.0, 20.0));
    assert_ne!(pixel(&gs, 12, 11), 0);
}

#[test]
fn test_line_strip() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_LINE_STRIP).unwrap();

    for (x, y) in [(0, 0), (8, 0), (8, 8), (0, 8)] {
        gs.write_register(address::XYZ2, xyz(x, y, 0)).unwrap();
    }

    assert_eq!(gs.draw_count(), 3);
    assert_eq!(gs.queue.len(), 1);
    assert_ne!(pixel(&gs, 4, 0), 0);
}

#[test]
fn test_over_full_strip_queue_drops_oldest() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE_STRIP)
        .unwrap();

    for x in 0..5 {
        gs.write_register(address::XYZ3, xyz(x, 0, 0)).unwrap();
    }

    assert_eq!(gs.draw_count(), 0);
    assert_eq!(gs.queue.len(), 3);
    assert_eq!(gs.queue[0].x, 2.0);
}

#[test]
fn test_prim_write_restarts_assembly() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE).unwrap();
    gs.write_register(address::XYZ2, xyz(0, 0, 0)).unwrap();
    gs.write_register(address::XYZ2, xyz(8, 0, 0)).unwrap();

    gs.write_register(address::PRIM, PRIM_TRIANGLE).unwrap();
    assert!(gs.queue.is_empty());

    gs.write_register(address::XYZ2, xyz(0, 8, 0)).unwrap();
    assert_eq!(gs.draw_count(), 0);
}

#[test]
fn test_reserved_prim_draws_nothing() {
    let mut gs = setup();
    gs.write_register(address::PRIM, 7).unwrap();

    for (x, y) in [(0, 0), (8, 0), (0, 8)] {
        gs.write_register(address::XYZ2, xyz(x, y, 0)).unwrap();
    }

    assert_eq!(gs.draw_count(), 0);
    assert!(gs.queue.is_empty());
}

#[test]
fn test_sprite_fills_rectangle() {
    let mut gs = setup();
    sprite(&mut gs, (0, 0), (64, 64), rgbaq(0x10, 0x20, 0x30, 0x40));

    for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63), (31, 17)] {
        assert_eq!(pixel(&gs, x, y), 0x4030_2010);
    }

    let stats = gs.routines().stats();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].solid_rect);
    assert_eq!(stats[0].fill_pixels, 64 * 64);
}

#[test]
fn test_same_configuration_reuses_routine() {
    let mut gs = setup();
    sprite(&mut gs, (0, 0), (8, 8), rgbaq(0xff, 0, 0, 0x80));
    sprite(&mut gs, (8, 8), (16, 16), rgbaq(0, 0xff, 0, 0x80));

    assert_eq!(gs.routines().builds(), 1);
    assert_eq!(gs.draw_count(), 2);

    // Blending is a different routine
    gs.write_register(address::ALPHA_1, 0x44).unwrap();
    gs.write_register(address::PRIM, 6 | PrimFlags::ABE.bits())
        .unwrap();
    gs.write_register(address::XYZ2, xyz(0, 0, 0)).unwrap();
    gs.write_register(address::XYZ2, xyz(4, 4, 0)).unwrap();
    assert_eq!(gs.routines().builds(), 2);
}

#[test]
fn test_gouraud_triangle_interpolates() {
    let mut gs = setup();
    gs.write_register(address::PRIM, PRIM_TRIANGLE | PrimFlags::IIP.bits())
        .unwrap();
    gs.write_register(address::RGBAQ, rgbaq(0xff, 0, 0, 0x80))
        .unwrap();
    gs.write_register(address::XYZ2, xyz(0, 0, 0)).unwrap();
    gs.write_register(address::RGBAQ, rgbaq(0, 0xff, 0, 0x80))
        .unwrap();
    gs.write_register(address::XYZ2, xyz(32, 0, 0)).unwrap();
    gs.write_register(address::RGBAQ, rgbaq(0, 0, 0xff, 0x80))
        .unwrap();
    gs.write_register(address::XYZ2, xyz(0, 32, 0)).unwrap();

    let near_red = pixel(&gs, 0, 0);
    let middle = pixel(&gs, 8, 8);
    assert_eq!(near_red & 0xff, 0xff);
    assert!(middle & 0xff > 0 && middle & 0xff < 0xff);
    assert!((middle >> 8) & 0xff > 0);
    assert!((middle >> 16) & 0xff > 0);
}

#[test]
fn test_direct_submit() {
    let mut gs = setup();
    let batch = DrawBatch::new(
        PrimitiveClass::Sprite,
        vec![
            Vertex::at(4.0, 4.0, [1, 2, 3, 4]),
            Vertex::at(8.0, 8.0, [1, 2, 3, 4]),
        ],
        gs.drawing_context(),
    );

    assert_eq!(gs.submit(batch), 16);
    assert_eq!(pixel(&gs, 4, 4), 0x0403_0201);
    assert_eq!(pixel(&gs, 8, 8), 0);
}

#[test]
fn test_dropped_draw_writes_nothing() {
    let mut gs = setup();
    // Frame fully masked and depth writes off
    gs.write_register(address::FRAME_1, 0xffff_ffff << 32 | 1 << 16)
        .unwrap();

    sprite(&mut gs, (0, 0), (8, 8), rgbaq(0xff, 0xff, 0xff, 0x80));
    assert_eq!(gs.draw_count(), 0);
    assert!(gs.routines().is_empty());
}

#[test]
fn test_invalidate_marks_overlapping_clut_stale() {
    let mut gs = setup();
    let tex0 = registers::Tex0 {
        psm: 0x14,
        cbp: 0x100,
        cld: 1,
        ..Default::default()
    };
    gs.write_register(address::TEX0_1, tex0.to_bits()).unwrap();
    assert!(!gs.clut().is_dirty());

    // Elsewhere in memory
    gs.invalidate(0x800, 1, PixelFormat::Ct32, Rect::with_size(0, 0, 16, 16));
    assert!(!gs.clut().is_dirty());

    gs.invalidate(0x100, 1, PixelFormat::Ct32, Rect::with_size(0, 0, 8, 2));
    assert!(gs.clut().is_dirty());
}
