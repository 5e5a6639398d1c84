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

//! Custom assertions for frame buffer testing

use echo_gs::core::gs::Gs;
use echo_gs::core::memory::PixelFormat;

use super::fixtures::WIDTH;

/// Read a pixel of the fixture frame
#[allow(dead_code)]
pub fn frame_pixel(gs: &Gs, x: u32, y: u32) -> u32 {
    gs.vm()
        .read_pixel_xy(PixelFormat::Ct32, x, y, 0, WIDTH as u32 / 64)
}

/// Assert a frame pixel has the expected colour
#[allow(dead_code)]
pub fn assert_frame_pixel(gs: &Gs, x: u32, y: u32, expected: u32) {
    let actual = frame_pixel(gs, x, y);
    assert_eq!(
        actual, expected,
        "Frame at ({}, {}) mismatch: expected 0x{:08X}, got 0x{:08X}",
        x, y, expected, actual
    );
}

/// Assert two devices hold identical local memory
#[allow(dead_code)]
pub fn assert_same_memory(a: &Gs, b: &Gs) {
    let (a, b) = (a.vm().to_bytes(), b.vm().to_bytes());
    if let Some(offset) = a.iter().zip(&b).position(|(x, y)| x != y) {
        panic!(
            "Local memory differs at byte 0x{:06X}: 0x{:02X} vs 0x{:02X}",
            offset, a[offset], b[offset]
        );
    }
}
