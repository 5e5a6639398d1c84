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

//! Scanline renderer
//!
//! Draw batches come in here after register intake has assembled the
//! vertices and snapshotted the drawing context. The renderer sets up the
//! primitive, splits it into horizontal spans and hands the spans to a
//! specialized pixel routine, one worker lane per group of rows.
//!
//! # Structure
//!
//! - [`pipeline`]: the per-pixel algorithm (texture, tests, blend, write)
//! - [`routine`]: routines specialized per [`Selector`](super::selector::Selector) and their cache
//! - [`rasterizer`]: primitive setup, span generation and the lane pool

pub mod pipeline;
pub mod rasterizer;
pub mod routine;

pub use rasterizer::Rasterizer;
pub use routine::{RoutineCache, RoutineReport, SpecializedRoutine};

use super::context::DrawingContext;
use super::registers::Scissor;
use super::selector;

/// Shape class of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveClass {
    Point,
    Line,
    Triangle,
    Sprite,
}

impl PrimitiveClass {
    /// Number of vertices one primitive of this class consumes
    pub const fn vertex_count(self) -> usize {
        match self {
            PrimitiveClass::Point => 1,
            PrimitiveClass::Line | PrimitiveClass::Sprite => 2,
            PrimitiveClass::Triangle => 3,
        }
    }

    /// Selector encoding ([`selector::prim`])
    pub const fn selector_class(self) -> u32 {
        match self {
            PrimitiveClass::Point => selector::prim::POINT,
            PrimitiveClass::Line => selector::prim::LINE,
            PrimitiveClass::Triangle => selector::prim::TRIANGLE,
            PrimitiveClass::Sprite => selector::prim::SPRITE,
        }
    }
}

/// A fully assembled vertex in window coordinates
///
/// `x`/`y` are pixels (the XYOFFSET is already removed, fractions kept).
/// `s`/`t`/`q` carry STQ coordinates, `u`/`v` carry texel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: u32,
    pub rgba: [u8; 4],
    pub s: f32,
    pub t: f32,
    pub q: f32,
    pub u: f32,
    pub v: f32,
    pub fog: u8,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0,
            rgba: [0x80, 0x80, 0x80, 0x80],
            s: 0.0,
            t: 0.0,
            q: 1.0,
            u: 0.0,
            v: 0.0,
            fog: 0,
        }
    }
}

impl Vertex {
    /// Vertex at a pixel position with a colour
    pub fn at(x: f32, y: f32, rgba: [u8; 4]) -> Self {
        Self {
            x,
            y,
            rgba,
            ..Self::default()
        }
    }

    /// Interpolatable attributes of this vertex
    pub(in crate::core::gs) fn attributes(&self) -> Attributes {
        Attributes {
            z: self.z as f64,
            color: self.rgba.map(|c| c as f32),
            s: self.s,
            t: self.t,
            q: self.q,
            u: self.u,
            v: self.v,
            fog: self.fog as f32,
        }
    }
}

/// Inclusive scissor rectangle in window pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ScissorRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

impl From<Scissor> for ScissorRect {
    fn from(s: Scissor) -> Self {
        Self::new(s.scax0 as i32, s.scay0 as i32, s.scax1 as i32, s.scay1 as i32)
    }
}

impl Default for ScissorRect {
    fn default() -> Self {
        Self::new(0, 0, 2047, 2047)
    }
}

/// One unit of draw work
///
/// `vertices` holds whole primitives: a multiple of
/// [`PrimitiveClass::vertex_count`]. Trailing vertices of an incomplete
/// primitive are ignored.
#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub class: PrimitiveClass,
    pub vertices: Vec<Vertex>,
    pub scissor: ScissorRect,
    pub context: DrawingContext,
}

impl DrawBatch {
    /// Batch using the context's scissor rectangle
    pub fn new(class: PrimitiveClass, vertices: Vec<Vertex>, context: DrawingContext) -> Self {
        Self {
            class,
            vertices,
            scissor: context.regs.scissor.into(),
            context,
        }
    }

    /// Number of complete primitives in the batch
    pub fn primitive_count(&self) -> usize {
        self.vertices.len() / self.class.vertex_count()
    }
}

/// Values interpolated across a primitive
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attributes {
    pub z: f64,
    pub color: [f32; 4],
    pub s: f32,
    pub t: f32,
    pub q: f32,
    pub u: f32,
    pub v: f32,
    pub fog: f32,
}

impl Attributes {
    /// Component-wise `self + d * k`
    #[inline]
    pub fn offset(&self, d: &Attributes, k: f32) -> Attributes {
        Attributes {
            z: self.z + d.z * k as f64,
            color: [
                self.color[0] + d.color[0] * k,
                self.color[1] + d.color[1] * k,
                self.color[2] + d.color[2] * k,
                self.color[3] + d.color[3] * k,
            ],
            s: self.s + d.s * k,
            t: self.t + d.t * k,
            q: self.q + d.q * k,
            u: self.u + d.u * k,
            v: self.v + d.v * k,
            fog: self.fog + d.fog * k,
        }
    }

    /// Component-wise difference `self - o`
    #[inline]
    pub fn sub(&self, o: &Attributes) -> Attributes {
        self.offset(o, -1.0)
    }

    /// Component-wise scale
    #[inline]
    pub fn scale(&self, k: f32) -> Attributes {
        Attributes::default().offset(self, k)
    }

    /// Advance by one step
    #[inline]
    pub fn step(&mut self, d: &Attributes) {
        self.z += d.z;
        for i in 0..4 {
            self.color[i] += d.color[i];
        }
        self.s += d.s;
        self.t += d.t;
        self.q += d.q;
        self.u += d.u;
        self.v += d.v;
        self.fog += d.fog;
    }
}

/// A horizontal run of pixels on one row
///
/// Covers `x0..x1` (end exclusive). `start` holds the attributes at `x0`,
/// `step` the change per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
    pub start: Attributes,
    pub step: Attributes,
}

impl Span {
    pub fn len(&self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0
    }
}
