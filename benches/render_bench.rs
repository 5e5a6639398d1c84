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

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use echo_gs::core::gs::registers::{address, PrimFlags};
use echo_gs::core::gs::Gs;
use echo_gs::core::memory::{PixelFormat, VideoMemory};
use std::hint::black_box;

fn xyz(x: u16, y: u16) -> u64 {
    ((y as u64) << 4) << 16 | (x as u64) << 4
}

fn rgbaq(color: u32) -> u64 {
    (1.0f32.to_bits() as u64) << 32 | color as u64
}

/// Device drawing into a 640x448 CT32 frame with depth writes masked
fn device(lanes: usize) -> Gs {
    let mut gs = Gs::with_lanes(lanes).unwrap();
    gs.write_register(address::FRAME_1, 10 << 16).unwrap();
    gs.write_register(address::ZBUF_1, 1 << 32).unwrap();
    gs.write_register(address::SCISSOR_1, 639 << 16 | 447 << 48)
        .unwrap();
    gs
}

fn address_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("address_translation");

    for psm in [
        PixelFormat::Ct32,
        PixelFormat::Ct16,
        PixelFormat::T8,
        PixelFormat::T4,
        PixelFormat::Z32,
    ] {
        group.bench_with_input(BenchmarkId::new("row", format!("{:?}", psm)), &psm, |b, &psm| {
            b.iter(|| {
                for x in 0..640 {
                    black_box(psm.address(black_box(x), 17, 0, 10));
                }
            });
        });
    }

    group.bench_function("write_read_pixel", |b| {
        let vm = VideoMemory::new();
        b.iter(|| {
            for x in 0..64 {
                vm.write_pixel_xy(PixelFormat::Ct16, x, 3, 0, 1, black_box(x));
                black_box(vm.read_pixel_xy(PixelFormat::Ct16, x, 3, 0, 1));
            }
        });
    });

    group.finish();
}

fn fill_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("solid_fill");

    for lanes in [1, 4] {
        group.bench_with_input(BenchmarkId::new("sprite_640x448", lanes), &lanes, |b, &lanes| {
            let mut gs = device(lanes);
            b.iter(|| {
                gs.write_register(address::PRIM, 6).unwrap();
                gs.write_register(address::RGBAQ, rgbaq(black_box(0x80204060)))
                    .unwrap();
                gs.write_register(address::XYZ2, xyz(0, 0)).unwrap();
                gs.write_register(address::XYZ2, xyz(640, 448)).unwrap();
            });
        });
    }

    group.finish();
}

fn triangle_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangle");

    for lanes in [1, 4] {
        group.bench_with_input(BenchmarkId::new("gouraud", lanes), &lanes, |b, &lanes| {
            let mut gs = device(lanes);
            b.iter(|| {
                gs.write_register(address::PRIM, 3 | PrimFlags::IIP.bits())
                    .unwrap();
                for (x, y, color) in [
                    (320, 20, 0x800000ff),
                    (620, 430, 0x8000ff00),
                    (20, 400, 0x80ff0000),
                ] {
                    gs.write_register(address::RGBAQ, rgbaq(color)).unwrap();
                    gs.write_register(address::XYZ2, xyz(x, y)).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    address_benchmark,
    fill_benchmark,
    triangle_benchmark
);
criterion_main!(benches);
