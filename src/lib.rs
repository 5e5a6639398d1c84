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

//! PlayStation 2 Graphics Synthesizer software pixel pipeline
//!
//! This library provides the GS local memory model (swizzled addressing and
//! pixel I/O), the CLUT cache, the per-pixel pipeline specialized per
//! configuration, a multi-lane scanline rasterizer and device freeze/defrost.
//!
//! # Example
//!
//! ```
//! use echo_gs::core::gs::{registers::address, Gs};
//! use echo_gs::core::memory::PixelFormat;
//!
//! let mut gs = Gs::with_lanes(2).unwrap();
//! gs.write_register(address::FRAME_1, 1 << 16).unwrap();
//! gs.write_register(address::ZBUF_1, 1 << 32).unwrap();
//! gs.write_register(address::SCISSOR_1, 63 << 16 | 63 << 48).unwrap();
//!
//! // Sprite from (0, 0) to (8, 8)
//! gs.write_register(address::PRIM, 6).unwrap();
//! gs.write_register(address::RGBAQ, 0x8000_ff00).unwrap();
//! gs.write_register(address::XYZ2, 0).unwrap();
//! gs.write_register(address::XYZ2, (8 << 4) << 16 | (8 << 4)).unwrap();
//!
//! assert_eq!(gs.vm().read_pixel_xy(PixelFormat::Ct32, 7, 7, 0, 1), 0x8000_ff00);
//! ```

pub mod core;
