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

//! Specialized pixel routines and their cache
//!
//! A [`SpecializedRoutine`] is built once per distinct [`Selector`] and then
//! reused for every draw with that configuration. The [`RoutineCache`] is a
//! get-or-create map that never evicts: the set of configurations a game
//! uses is large in theory but small in practice.

use super::pipeline::{self, SpanContext, SpanKernel};
use super::Span;
use crate::core::gs::selector::Selector;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Usage counters of one routine
#[derive(Debug, Default)]
struct RoutineStats {
    invocations: AtomicU64,
    pixels: AtomicU64,
    fill_pixels: AtomicU64,
    elapsed_ns: AtomicU64,
}

/// Pixel routine specialized for one selector
pub struct SpecializedRoutine {
    selector: Selector,
    kernel: SpanKernel,
    stats: RoutineStats,
}

impl SpecializedRoutine {
    /// Build the routine for a selector
    pub fn build(selector: Selector) -> Self {
        Self {
            selector,
            kernel: pipeline::select_kernel(selector),
            stats: RoutineStats::default(),
        }
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Whether draws with this routine take the solid fill path
    pub fn is_solid_rect(&self) -> bool {
        self.selector.is_solid_rect()
    }

    /// Run the pipeline over one span
    ///
    /// # Returns
    ///
    /// Number of pixels written
    pub fn draw_span(&self, ctx: &SpanContext<'_>, span: &Span) -> u32 {
        let written = (self.kernel)(ctx, span);
        self.stats
            .pixels
            .fetch_add(written as u64, Ordering::Relaxed);
        written
    }

    /// Store precomputed values over `x0..x1` of row `y`
    pub fn fill_span(
        &self,
        ctx: &SpanContext<'_>,
        y: i32,
        x0: i32,
        x1: i32,
        color: u32,
        z: u32,
    ) -> u32 {
        let written = pipeline::fill_span(ctx, y, x0, x1, color, z);
        self.stats
            .fill_pixels
            .fetch_add(written as u64, Ordering::Relaxed);
        written
    }

    fn record_invocation(&self) {
        self.stats.invocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the wall time of one batch
    pub fn record_elapsed(&self, elapsed: Duration) {
        self.stats
            .elapsed_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Number of cache lookups that returned this routine
    pub fn invocations(&self) -> u64 {
        self.stats.invocations.load(Ordering::Relaxed)
    }

    /// Pixels written through the full pipeline
    pub fn pixels(&self) -> u64 {
        self.stats.pixels.load(Ordering::Relaxed)
    }

    /// Pixels written through the solid fill path
    pub fn fill_pixels(&self) -> u64 {
        self.stats.fill_pixels.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters
    pub fn report(&self) -> RoutineReport {
        RoutineReport {
            selector: format!("{:013X}", self.selector.bits()),
            solid_rect: self.is_solid_rect(),
            invocations: self.invocations(),
            pixels: self.pixels(),
            fill_pixels: self.fill_pixels(),
            elapsed_ns: self.stats.elapsed_ns.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SpecializedRoutine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecializedRoutine")
            .field("selector", &self.selector)
            .field("invocations", &self.invocations())
            .finish()
    }
}

/// Serializable routine statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineReport {
    /// Selector bits in hexadecimal
    pub selector: String,
    pub solid_rect: bool,
    pub invocations: u64,
    pub pixels: u64,
    pub fill_pixels: u64,
    pub elapsed_ns: u64,
}

/// Get-or-create cache of routines keyed by selector
#[derive(Debug, Default)]
pub struct RoutineCache {
    routines: RwLock<HashMap<Selector, Arc<SpecializedRoutine>>>,
    builds: AtomicU64,
}

impl RoutineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the routine for a selector, building it on first use
    ///
    /// Safe to call from several threads; each selector is built once.
    pub fn get(&self, selector: Selector) -> Arc<SpecializedRoutine> {
        if let Some(routine) = self.routines.read().get(&selector) {
            routine.record_invocation();
            return Arc::clone(routine);
        }

        let mut routines = self.routines.write();
        let routine = routines.entry(selector).or_insert_with(|| {
            let builds = self.builds.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!(
                "Built routine {:?} (solid rect: {}, {} total)",
                selector,
                selector.is_solid_rect(),
                builds
            );
            Arc::new(SpecializedRoutine::build(selector))
        });
        routine.record_invocation();
        Arc::clone(routine)
    }

    /// Number of routines built so far
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.routines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.read().is_empty()
    }

    /// Counters of every cached routine, most used first
    pub fn stats(&self) -> Vec<RoutineReport> {
        let mut reports: Vec<RoutineReport> =
            self.routines.read().values().map(|r| r.report()).collect();
        reports.sort_by(|a, b| {
            b.invocations
                .cmp(&a.invocations)
                .then_with(|| a.selector.cmp(&b.selector))
        });
        reports
    }
}
