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

//! Scanline rasterizer
//!
//! Turns a [`DrawBatch`] into spans and runs them through a routine on a
//! fixed pool of worker lanes.
//!
//! # Algorithm
//!
//! Each batch goes through four steps:
//!
//! 1. Setup: every primitive becomes a [`Coverage`] (row range, edge
//!    geometry, attribute plane), clipped to the scissor rectangle
//! 2. Span generation: rows are walked top to bottom, one span per row
//! 3. Dispatch: lane `n` handles the rows where `y % lanes == n`, in
//!    primitive order, so no two lanes ever write the same row
//! 4. Join: `broadcast` returns once every lane is done
//!
//! A pixel at integer coordinates `(x, y)` is covered by a triangle when
//! `ceil(ymin) <= y < ceil(ymax)` and `ceil(xl) <= x < ceil(xr)` on that row.
//!
//! # References
//!
//! - [Triangle Rasterization Tutorial](https://www.sunshine2k.de/coding/java/TriangleRasterization/TriangleRasterization.html)

use super::pipeline::{self, SpanContext};
use super::routine::SpecializedRoutine;
use super::{Attributes, DrawBatch, PrimitiveClass, ScissorRect, Span, Vertex};
use crate::core::error::{GsError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;

/// Value of `dA/dx` and `dA/dy` anchored at one point
#[derive(Debug, Clone, Copy, PartialEq)]
struct Plane {
    anchor: (f32, f32),
    origin: Attributes,
    dx: Attributes,
    dy: Attributes,
}

impl Plane {
    /// Constant attributes
    fn flat(origin: Attributes) -> Self {
        Self {
            anchor: (0.0, 0.0),
            origin,
            dx: Attributes::default(),
            dy: Attributes::default(),
        }
    }

    /// Attributes at pixel `(x, y)`
    fn at(&self, x: i32, y: i32) -> Attributes {
        self.origin
            .offset(&self.dx, x as f32 - self.anchor.0)
            .offset(&self.dy, y as f32 - self.anchor.1)
    }
}

/// Screen area of one primitive after setup
#[derive(Debug, Clone, PartialEq)]
enum Coverage {
    /// Triangle with vertices sorted by y
    Triangle {
        v: [(f32, f32); 3],
        rows: (i32, i32),
        plane: Plane,
    },
    /// Axis-aligned rectangle
    Rect {
        columns: (i32, i32),
        rows: (i32, i32),
        plane: Plane,
        /// Frame and depth values for the solid fill path
        solid: (u32, u32),
    },
    /// Pre-split single-pixel spans (lines and points)
    Spans(Vec<Span>),
}

impl Coverage {
    fn rows(&self) -> (i32, i32) {
        match self {
            Coverage::Triangle { rows, .. } | Coverage::Rect { rows, .. } => *rows,
            Coverage::Spans(_) => (0, 0),
        }
    }

    /// Span covering row `y`, clipped horizontally to the scissor
    fn row(&self, y: i32, scissor: &ScissorRect) -> Option<Span> {
        let (x0, x1, plane) = match self {
            Coverage::Triangle { v, plane, .. } => {
                let (xl, xr) = triangle_row(v, y as f32);
                (xl.ceil() as i32, xr.ceil() as i32, plane)
            }
            Coverage::Rect { columns, plane, .. } => (columns.0, columns.1, plane),
            Coverage::Spans(_) => return None,
        };

        let x0 = x0.max(scissor.left);
        let x1 = x1.min(scissor.right + 1);
        if x0 >= x1 {
            return None;
        }

        Some(Span {
            y,
            x0,
            x1,
            start: plane.at(x0, y),
            step: plane.dx,
        })
    }
}

/// Left and right edge of a y-sorted triangle at height `y`
fn triangle_row(v: &[(f32, f32); 3], y: f32) -> (f32, f32) {
    let edge = |a: (f32, f32), b: (f32, f32)| {
        if b.1 == a.1 {
            a.0
        } else {
            a.0 + (y - a.1) * (b.0 - a.0) / (b.1 - a.1)
        }
    };

    let long = edge(v[0], v[2]);
    let short = if y < v[1].1 {
        edge(v[0], v[1])
    } else {
        edge(v[1], v[2])
    };

    (long.min(short), long.max(short))
}

/// Sort three vertices by y coordinate
fn sort_vertices_by_y(mut v: [Vertex; 3]) -> [Vertex; 3] {
    v.sort_by(|a, b| a.y.total_cmp(&b.y));
    v
}

/// Whether row `y` is skipped by SCANMSK
fn row_masked(scanmsk: u8, y: i32) -> bool {
    match scanmsk {
        2 => y & 1 == 0,
        3 => y & 1 == 1,
        _ => false,
    }
}

/// Clip a row range to the scissor
fn clip_rows(y0: f32, y1: f32, scissor: &ScissorRect) -> (i32, i32) {
    (
        (y0.ceil() as i32).max(scissor.top),
        (y1.ceil() as i32).min(scissor.bottom + 1),
    )
}

/// Triangle setup with attribute gradients
///
/// Returns `None` for triangles with no area.
fn setup_triangle(v: [Vertex; 3], shaded: bool, scissor: &ScissorRect) -> Option<Coverage> {
    let mut a = v.map(|v| v.attributes());
    if !shaded {
        let color = a[2].color;
        for attr in a.iter_mut() {
            attr.color = color;
        }
    }

    let (x0, y0) = (v[0].x, v[0].y);
    let (x1, y1) = (v[1].x, v[1].y);
    let (x2, y2) = (v[2].x, v[2].y);
    let det = (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0);
    if det.abs() < f32::EPSILON {
        return None;
    }

    let d10 = a[1].sub(&a[0]);
    let d20 = a[2].sub(&a[0]);
    let dx = d10
        .scale((y2 - y0) / det)
        .offset(&d20, -(y1 - y0) / det);
    let dy = d20
        .scale((x1 - x0) / det)
        .offset(&d10, -(x2 - x0) / det);

    let sorted = sort_vertices_by_y(v);
    let rows = clip_rows(sorted[0].y, sorted[2].y, scissor);
    if rows.0 >= rows.1 {
        return None;
    }

    Some(Coverage::Triangle {
        v: sorted.map(|v| (v.x, v.y)),
        rows,
        plane: Plane {
            anchor: (x0, y0),
            origin: a[0],
            dx,
            dy,
        },
    })
}

/// Sprite setup: a rectangle spanned by two corners
///
/// Colour, depth, fog and Q come from the second vertex; texture
/// coordinates are interpolated between the corners.
fn setup_sprite(
    v0: &Vertex,
    v1: &Vertex,
    scissor: &ScissorRect,
    solid: impl Fn(&Vertex) -> (u32, u32),
) -> Option<Coverage> {
    let (left, right) = (v0.x.min(v1.x), v0.x.max(v1.x));
    let (top, bottom) = (v0.y.min(v1.y), v0.y.max(v1.y));

    let columns = (
        (left.ceil() as i32).max(scissor.left),
        (right.ceil() as i32).min(scissor.right + 1),
    );
    let rows = clip_rows(top, bottom, scissor);
    if columns.0 >= columns.1 || rows.0 >= rows.1 {
        return None;
    }

    let w = v1.x - v0.x;
    let h = v1.y - v0.y;
    let per = |d: f32, len: f32| if len == 0.0 { 0.0 } else { d / len };

    let origin = Attributes {
        s: v0.s,
        t: v0.t,
        u: v0.u,
        v: v0.v,
        ..v1.attributes()
    };
    let dx = Attributes {
        s: per(v1.s - v0.s, w),
        u: per(v1.u - v0.u, w),
        ..Attributes::default()
    };
    let dy = Attributes {
        t: per(v1.t - v0.t, h),
        v: per(v1.v - v0.v, h),
        ..Attributes::default()
    };

    Some(Coverage::Rect {
        columns,
        rows,
        plane: Plane {
            anchor: (v0.x, v0.y),
            origin,
            dx,
            dy,
        },
        solid: solid(v1),
    })
}

/// Line setup: a DDA walk producing one single-pixel span per step
fn setup_line(v0: &Vertex, v1: &Vertex, shaded: bool, scissor: &ScissorRect) -> Coverage {
    let (dx, dy) = (v1.x - v0.x, v1.y - v0.y);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;

    let mut a0 = v0.attributes();
    let a1 = v1.attributes();
    if !shaded {
        a0.color = a1.color;
    }
    let delta = a1.sub(&a0).scale(1.0 / steps as f32);

    let spans = (0..steps)
        .filter_map(|i| {
            let k = i as f32 / steps as f32;
            let x = (v0.x + dx * k).floor() as i32;
            let y = (v0.y + dy * k).floor() as i32;
            point_span(x, y, a0.offset(&delta, i as f32), scissor)
        })
        .collect();

    Coverage::Spans(spans)
}

/// A single-pixel span if the pixel is inside the scissor
fn point_span(x: i32, y: i32, start: Attributes, scissor: &ScissorRect) -> Option<Span> {
    let inside = (scissor.left..=scissor.right).contains(&x)
        && (scissor.top..=scissor.bottom).contains(&y);
    inside.then_some(Span {
        y,
        x0: x,
        x1: x + 1,
        start,
        step: Attributes::default(),
    })
}

/// Scanline rasterizer with a fixed pool of lanes
pub struct Rasterizer {
    pool: ThreadPool,
    lanes: usize,
}

impl Rasterizer {
    /// Create a rasterizer with `lanes` worker threads (at least one)
    pub fn new(lanes: usize) -> Result<Self> {
        let lanes = lanes.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(lanes)
            .thread_name(|i| format!("gs-lane-{}", i))
            .build()
            .map_err(|e| GsError::LanePool(e.to_string()))?;

        log::info!("Scanline lane pool ready: {} lanes", lanes);

        Ok(Self { pool, lanes })
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Setup every complete primitive of a batch
    fn setup(&self, batch: &DrawBatch, ctx: &SpanContext<'_>) -> Vec<Coverage> {
        let scissor = &batch.scissor;
        let shaded = ctx.sel.iip();
        let solid = |v: &Vertex| pipeline::solid_values(ctx.sel, ctx.globals, v.rgba, v.z);

        batch
            .vertices
            .chunks_exact(batch.class.vertex_count())
            .filter_map(|prim| match batch.class {
                PrimitiveClass::Point => {
                    let v = &prim[0];
                    let span = point_span(
                        v.x.floor() as i32,
                        v.y.floor() as i32,
                        v.attributes(),
                        scissor,
                    );
                    Some(Coverage::Spans(span.into_iter().collect()))
                }
                PrimitiveClass::Line => Some(setup_line(&prim[0], &prim[1], shaded, scissor)),
                PrimitiveClass::Triangle => {
                    setup_triangle([prim[0], prim[1], prim[2]], shaded, scissor)
                }
                PrimitiveClass::Sprite => setup_sprite(&prim[0], &prim[1], scissor, &solid),
            })
            .collect()
    }

    /// Rasterize a batch and wait for every lane to finish
    ///
    /// # Arguments
    ///
    /// * `batch` - Primitives to draw
    /// * `ctx` - Selector, scanline constants and memory the routine uses
    /// * `routine` - Routine built for `ctx.sel`
    ///
    /// # Returns
    ///
    /// Number of pixels written
    pub fn draw(
        &self,
        batch: &DrawBatch,
        ctx: &SpanContext<'_>,
        routine: &SpecializedRoutine,
    ) -> u64 {
        let started = Instant::now();
        let coverages = self.setup(batch, ctx);

        log::trace!(
            "Draw batch: {:?} x{} ({} after setup), selector {:?}",
            batch.class,
            batch.primitive_count(),
            coverages.len(),
            ctx.sel
        );

        if coverages.is_empty() {
            return 0;
        }

        let lanes = self.lanes;
        let scanmsk = batch.context.scanmsk.msk;
        let fill = routine.is_solid_rect();
        let scissor = &batch.scissor;

        let written: u64 = self
            .pool
            .broadcast(|lane_ctx| {
                let lane = lane_ctx.index();
                let owns = |y: i32| {
                    y.rem_euclid(lanes as i32) as usize == lane && !row_masked(scanmsk, y)
                };
                let mut written = 0u64;

                for coverage in &coverages {
                    if let Coverage::Spans(spans) = coverage {
                        for span in spans.iter().filter(|s| owns(s.y)) {
                            written += routine.draw_span(ctx, span) as u64;
                        }
                        continue;
                    }

                    let (y0, y1) = coverage.rows();
                    for y in (y0..y1).filter(|&y| owns(y)) {
                        let Some(span) = coverage.row(y, scissor) else {
                            continue;
                        };
                        let n = match coverage {
                            Coverage::Rect {
                                solid: (color, z), ..
                            } if fill => routine.fill_span(ctx, y, span.x0, span.x1, *color, *z),
                            _ => routine.draw_span(ctx, &span),
                        };
                        written += n as u64;
                    }
                }

                written
            })
            .into_iter()
            .sum();

        routine.record_elapsed(started.elapsed());
        written
    }
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("lanes", &self.lanes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gs::clut::Clut;
    use crate::core::gs::context::DrawingContext;
    use crate::core::gs::registers::{Frame, PrimFlags, Scissor, Zbuf};
    use crate::core::memory::{PixelFormat, VideoMemory};

    const WHITE: [u8; 4] = [0xff, 0xff, 0xff, 0x80];

    fn context(flags: PrimFlags) -> DrawingContext {
        let mut ctx = DrawingContext::default();
        ctx.flags = flags;
        ctx.regs.frame = Frame::from_bits(1 << 16);
        ctx.regs.zbuf = Zbuf::from_bits(1 << 32);
        ctx.regs.scissor = Scissor {
            scax0: 0,
            scax1: 63,
            scay0: 0,
            scay1: 63,
        };
        ctx
    }

    /// Draw a batch, returning (pixels written, routine fill pixels)
    fn draw(raster: &Rasterizer, vm: &VideoMemory, batch: &DrawBatch) -> (u64, u64) {
        let mut clut = Clut::new();
        let (sel, globals) = batch.context.resolve(batch.class, &mut clut).unwrap();
        let routine = SpecializedRoutine::build(sel);
        let ctx = SpanContext {
            sel,
            globals: &globals,
            vm,
        };
        let written = raster.draw(batch, &ctx, &routine);
        (written, routine.fill_pixels())
    }

    fn pixel(vm: &VideoMemory, x: u32, y: u32) -> u32 {
        vm.read_pixel_xy(PixelFormat::Ct32, x, y, 0, 1)
    }

    fn count_set(vm: &VideoMemory) -> usize {
        (0..64)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(vm, x, y) != 0)
            .count()
    }

    fn triangle(points: [(f32, f32); 3]) -> DrawBatch {
        DrawBatch::new(
            PrimitiveClass::Triangle,
            points.iter().map(|&(x, y)| Vertex::at(x, y, WHITE)).collect(),
            context(PrimFlags::empty()),
        )
    }

    #[test]
    fn test_sort_vertices_by_y() {
        let sorted = sort_vertices_by_y([
            Vertex::at(0.0, 30.0, WHITE),
            Vertex::at(1.0, 10.0, WHITE),
            Vertex::at(2.0, 20.0, WHITE),
        ]);
        assert_eq!(sorted.map(|v| v.y), [10.0, 20.0, 30.0]);
        assert_eq!(sorted.map(|v| v.x), [1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_basic_triangle_coverage() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let (written, _) = draw(&raster, &vm, &triangle([(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]));

        // Rows 0..4 cover 4, 3, 2 and 1 pixels
        assert_eq!(written, 10);
        assert_eq!(count_set(&vm), 10);
        assert_eq!(pixel(&vm, 0, 0), 0x80ff_ffff);
        assert_eq!(pixel(&vm, 3, 0), 0x80ff_ffff);
        assert_eq!(pixel(&vm, 0, 3), 0x80ff_ffff);
        assert_eq!(pixel(&vm, 1, 3), 0);
        assert_eq!(pixel(&vm, 4, 0), 0);
    }

    #[test]
    fn test_shared_edge_is_drawn_once() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let mut batch = triangle([(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)]);
        batch.vertices.extend([
            Vertex::at(8.0, 0.0, WHITE),
            Vertex::at(8.0, 8.0, WHITE),
            Vertex::at(0.0, 8.0, WHITE),
        ]);

        let (written, _) = draw(&raster, &vm, &batch);
        assert_eq!(written, 64);
        assert_eq!(count_set(&vm), 64);
    }

    #[test]
    fn test_triangle_clipping() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let mut batch = triangle([(-10.0, -10.0), (100.0, -10.0), (-10.0, 100.0)]);
        batch.scissor = ScissorRect::new(2, 3, 5, 6);

        let (written, _) = draw(&raster, &vm, &batch);
        assert_eq!(written, 16);
        assert_eq!(pixel(&vm, 2, 3), 0x80ff_ffff);
        assert_eq!(pixel(&vm, 5, 6), 0x80ff_ffff);
        assert_eq!(pixel(&vm, 1, 3), 0);
        assert_eq!(pixel(&vm, 6, 6), 0);
        assert_eq!(pixel(&vm, 2, 7), 0);
    }

    #[test]
    fn test_degenerate_triangle() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let (written, _) = draw(&raster, &vm, &triangle([(0.0, 0.0), (5.0, 5.0), (10.0, 10.0)]));
        assert_eq!(written, 0);

        let (written, _) = draw(&raster, &vm, &triangle([(0.0, 5.0), (5.0, 5.0), (10.0, 5.0)]));
        assert_eq!(written, 0);
        assert_eq!(count_set(&vm), 0);
    }

    #[test]
    fn test_flat_top_and_bottom() {
        let raster = Rasterizer::new(1).unwrap();

        // Flat top
        let vm = VideoMemory::new();
        let (written, _) = draw(&raster, &vm, &triangle([(0.0, 0.0), (6.0, 0.0), (3.0, 6.0)]));
        assert!(written > 0);
        assert_ne!(pixel(&vm, 3, 0), 0);
        assert_eq!(pixel(&vm, 3, 6), 0);

        // Flat bottom
        let vm = VideoMemory::new();
        let (written, _) = draw(&raster, &vm, &triangle([(3.0, 0.0), (0.0, 6.0), (6.0, 6.0)]));
        assert!(written > 0);
        assert_ne!(pixel(&vm, 3, 1), 0);
        assert_ne!(pixel(&vm, 1, 5), 0);
        assert_eq!(pixel(&vm, 1, 6), 0);
    }

    #[test]
    fn test_gouraud_interpolation() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let batch = DrawBatch::new(
            PrimitiveClass::Triangle,
            vec![
                Vertex::at(0.0, 0.0, [0, 0, 0, 0x80]),
                Vertex::at(32.0, 0.0, [0xff, 0, 0, 0x80]),
                Vertex::at(0.0, 32.0, [0, 0xff, 0, 0x80]),
            ],
            context(PrimFlags::IIP),
        );
        draw(&raster, &vm, &batch);

        assert_eq!(pixel(&vm, 0, 0), 0x8000_0000);
        let mid = pixel(&vm, 16, 0);
        let red = mid & 0xff;
        assert!((126..=128).contains(&red), "red = {}", red);
        assert_eq!((mid >> 8) & 0xff, 0);
    }

    #[test]
    fn test_flat_shading_uses_last_vertex() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let batch = DrawBatch::new(
            PrimitiveClass::Triangle,
            vec![
                Vertex::at(0.0, 0.0, [0x10, 0, 0, 0x80]),
                Vertex::at(8.0, 0.0, [0x20, 0, 0, 0x80]),
                Vertex::at(0.0, 8.0, [0x30, 0, 0, 0x80]),
            ],
            context(PrimFlags::empty()),
        );
        draw(&raster, &vm, &batch);

        assert_eq!(pixel(&vm, 0, 0), 0x8000_0030);
        assert_eq!(pixel(&vm, 5, 1), 0x8000_0030);
    }

    #[test]
    fn test_sprite_uses_solid_fill() {
        let raster = Rasterizer::new(2).unwrap();
        let vm = VideoMemory::new();

        let batch = DrawBatch::new(
            PrimitiveClass::Sprite,
            vec![
                Vertex::at(0.0, 0.0, [0, 0, 0, 0]),
                Vertex::at(16.0, 8.0, [1, 2, 3, 4]),
            ],
            context(PrimFlags::empty()),
        );
        let (written, filled) = draw(&raster, &vm, &batch);

        assert_eq!(written, 128);
        assert_eq!(filled, 128);
        assert_eq!(pixel(&vm, 15, 7), 0x0403_0201);
        assert_eq!(pixel(&vm, 16, 7), 0);
        assert_eq!(pixel(&vm, 15, 8), 0);
    }

    #[test]
    fn test_scanmsk_skips_rows() {
        let raster = Rasterizer::new(1).unwrap();
        let vm = VideoMemory::new();

        let mut ctx = context(PrimFlags::empty());
        ctx.scanmsk.msk = 2;
        let batch = DrawBatch::new(
            PrimitiveClass::Sprite,
            vec![Vertex::at(0.0, 0.0, WHITE), Vertex::at(4.0, 4.0, WHITE)],
            ctx,
        );
        let (written, _) = draw(&raster, &vm, &batch);

        assert_eq!(written, 8);
        assert_eq!(pixel(&vm, 0, 0), 0);
        assert_ne!(pixel(&vm, 0, 1), 0);
        assert_eq!(pixel(&vm, 0, 2), 0);
        assert_ne!(pixel(&vm, 0, 3), 0);
    }

    #[test]
    fn test_line_and_point() {
        let raster = Rasterizer::new(1).unwrap();

        let vm = VideoMemory::new();
        let line = DrawBatch::new(
            PrimitiveClass::Line,
            vec![Vertex::at(2.0, 1.0, WHITE), Vertex::at(6.0, 1.0, WHITE)],
            context(PrimFlags::empty()),
        );
        let (written, _) = draw(&raster, &vm, &line);
        assert_eq!(written, 4);
        assert_ne!(pixel(&vm, 2, 1), 0);
        assert_ne!(pixel(&vm, 5, 1), 0);
        assert_eq!(pixel(&vm, 6, 1), 0);

        let vm = VideoMemory::new();
        let point = DrawBatch::new(
            PrimitiveClass::Point,
            vec![Vertex::at(9.5, 7.25, WHITE)],
            context(PrimFlags::empty()),
        );
        let (written, _) = draw(&raster, &vm, &point);
        assert_eq!(written, 1);
        assert_ne!(pixel(&vm, 9, 7), 0);
    }

    #[test]
    fn test_lane_count_does_not_change_output() {
        let batch = DrawBatch::new(
            PrimitiveClass::Triangle,
            vec![
                Vertex::at(1.5, 0.25, [0xff, 0, 0, 0x80]),
                Vertex::at(60.0, 20.0, [0, 0xff, 0, 0x40]),
                Vertex::at(10.0, 63.0, [0, 0, 0xff, 0x20]),
            ],
            context(PrimFlags::IIP),
        );

        let one = VideoMemory::new();
        let four = VideoMemory::new();
        draw(&Rasterizer::new(1).unwrap(), &one, &batch);
        draw(&Rasterizer::new(4).unwrap(), &four, &batch);

        assert_eq!(one.to_bytes(), four.to_bytes());
    }
}
