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

use clap::Parser;
use echo_gs::core::error::Result;
use echo_gs::core::gs::registers::{
    address, Alpha, BitBltBuf, Frame, PrimFlags, Scissor, Test, Tex0, TrxPos, TrxReg, Zbuf,
};
use echo_gs::core::gs::Gs;
use echo_gs::core::RendererConfig;
use log::{error, info};
use std::path::PathBuf;

/// Frame buffer size of the demo scene
const WIDTH: u16 = 640;
const HEIGHT: u16 = 448;

/// Buffer layout (frame and depth in pages, texture and palette in blocks)
const FBP: u16 = 0;
const ZBP: u16 = 140;
const TBP: u16 = 280 * 32;
const CBP: u16 = TBP + 64;

const PRIM_TRIANGLE: u64 = 3;
const PRIM_SPRITE: u64 = 6;

/// PlayStation 2 GS software renderer demo
#[derive(Parser)]
#[command(name = "echo-gs")]
#[command(about = "Draws a demo scene with the GS software pixel pipeline", long_about = None)]
struct Args {
    /// Renderer configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of scanline lanes (overrides the configuration)
    #[arg(short = 'l', long)]
    lanes: Option<usize>,

    /// Write a freeze blob of the final device state to this file
    #[arg(short = 'f', long)]
    freeze: Option<PathBuf>,

    /// Print routine cache statistics as JSON
    #[arg(short = 's', long)]
    stats: bool,
}

/// XYZ2 value for a whole-pixel position
fn xyz(x: u16, y: u16, z: u32) -> u64 {
    (z as u64) << 32 | ((y as u64) << 4) << 16 | (x as u64) << 4
}

/// RGBAQ value with Q = 1.0
fn rgbaq(r: u8, g: u8, b: u8, a: u8) -> u64 {
    (1.0f32.to_bits() as u64) << 32 | u32::from_le_bytes([r, g, b, a]) as u64
}

/// UV value for a whole-texel position
fn uv(u: u16, v: u16) -> u64 {
    ((v as u64) << 4) << 16 | (u as u64) << 4
}

/// Upload packed pixel data into a rectangle of local memory
fn upload(gs: &mut Gs, dbp: u16, dbw: u8, dpsm: u8, size: (u16, u16), data: &[u8]) -> Result<()> {
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
    gs.write_register(address::BITBLTBUF, buf.to_bits())?;
    gs.write_register(address::TRXPOS, TrxPos::default().to_bits())?;
    gs.write_register(address::TRXREG, reg.to_bits())?;
    gs.write_register(address::TRXDIR, 0)?;
    gs.write_image(data)?;
    Ok(())
}

/// Frame, depth, scissor and depth test setup of context 1
fn setup_context(gs: &mut Gs) -> Result<()> {
    let frame = Frame {
        fbp: FBP,
        fbw: (WIDTH / 64) as u8,
        psm: 0x00,
        fbmsk: 0,
    };
    let zbuf = Zbuf {
        zbp: ZBP,
        psm: 0x1,
        zmsk: false,
    };
    let scissor = Scissor {
        scax0: 0,
        scax1: WIDTH - 1,
        scay0: 0,
        scay1: HEIGHT - 1,
    };
    let test = Test {
        zte: true,
        ztst: 2,
        ..Default::default()
    };

    gs.write_register(address::FRAME_1, frame.to_bits())?;
    gs.write_register(address::ZBUF_1, zbuf.to_bits())?;
    gs.write_register(address::SCISSOR_1, scissor.to_bits())?;
    gs.write_register(address::TEST_1, test.to_bits())?;
    gs.write_register(address::XYOFFSET_1, 0)?;
    Ok(())
}

/// Solid sprite covering the whole frame (the fast fill path)
fn clear(gs: &mut Gs) -> Result<()> {
    gs.write_register(address::PRIM, PRIM_SPRITE)?;
    gs.write_register(address::RGBAQ, rgbaq(0x10, 0x18, 0x30, 0x80))?;
    gs.write_register(address::XYZ2, xyz(0, 0, 0))?;
    gs.write_register(address::XYZ2, xyz(WIDTH, HEIGHT, 0))?;
    Ok(())
}

/// Gouraud-shaded triangle, depth tested against the cleared buffer
fn gouraud_triangle(gs: &mut Gs) -> Result<()> {
    gs.write_register(address::PRIM, PRIM_TRIANGLE | PrimFlags::IIP.bits())?;

    let corners = [
        ((320, 40), (0xff, 0x00, 0x00)),
        ((560, 400), (0x00, 0xff, 0x00)),
        ((80, 400), (0x00, 0x00, 0xff)),
    ];
    for ((x, y), (r, g, b)) in corners {
        gs.write_register(address::RGBAQ, rgbaq(r, g, b, 0x80))?;
        gs.write_register(address::XYZ2, xyz(x, y, 0x1000))?;
    }
    Ok(())
}

/// Sprite textured with a 16x16 T4 checkerboard through a 16-entry palette
fn textured_sprite(gs: &mut Gs) -> Result<()> {
    // CSM1 palette of 16 entries is 8x2 CT32 pixels
    let palette: Vec<u8> = (0..16u32)
        .map(|i| 0x8000_0000 | (i * 0x11) << 16 | (0xff - i * 0x11) << 8 | 0x40)
        .flat_map(|c| c.to_le_bytes())
        .collect();
    upload(gs, CBP, 1, 0x00, (8, 2), &palette)?;

    // Two texels per byte, low nibble first
    let texels: Vec<u8> = (0..16u8)
        .flat_map(|y| {
            (0..8u8).map(move |pair| {
                let index = |x: u8| if ((x / 4) + (y / 4)) % 2 == 0 { 3 } else { 12 };
                index(pair * 2) | index(pair * 2 + 1) << 4
            })
        })
        .collect();
    upload(gs, TBP, 2, 0x14, (16, 16), &texels)?;

    let tex0 = Tex0 {
        tbp0: TBP,
        tbw: 2,
        psm: 0x14,
        tw: 4,
        th: 4,
        tcc: true,
        tfx: 1,
        cbp: CBP,
        cpsm: 0x00,
        csm: false,
        csa: 0,
        cld: 1,
    };
    gs.write_register(address::TEX0_1, tex0.to_bits())?;

    let flags = PrimFlags::TME | PrimFlags::FST;
    gs.write_register(address::PRIM, PRIM_SPRITE | flags.bits())?;
    gs.write_register(address::RGBAQ, rgbaq(0x80, 0x80, 0x80, 0x80))?;
    gs.write_register(address::UV, uv(0, 0))?;
    gs.write_register(address::XYZ2, xyz(32, 32, 0x2000))?;
    gs.write_register(address::UV, uv(64, 64))?;
    gs.write_register(address::XYZ2, xyz(160, 160, 0x2000))?;
    Ok(())
}

/// Half-transparent sprite blended over the triangle
fn blended_sprite(gs: &mut Gs) -> Result<()> {
    // (Cs - Cd) * As + Cd
    let alpha = Alpha {
        a: 0,
        b: 1,
        c: 0,
        d: 1,
        fix: 0,
    };
    gs.write_register(address::ALPHA_1, alpha.to_bits())?;
    gs.write_register(address::PRIM, PRIM_SPRITE | PrimFlags::ABE.bits())?;
    gs.write_register(address::RGBAQ, rgbaq(0xff, 0xff, 0x00, 0x40))?;
    gs.write_register(address::XYZ2, xyz(240, 200, 0x3000))?;
    gs.write_register(address::XYZ2, xyz(480, 320, 0x3000))?;
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize logger with default level INFO
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("echo-gs v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            RendererConfig::load(path)?
        }
        None => RendererConfig::default(),
    };
    config.apply_env();
    if let Some(lanes) = args.lanes {
        config.lanes = lanes;
    }

    let mut gs = Gs::new(&config)?;

    let scene: [(&str, fn(&mut Gs) -> Result<()>); 5] = [
        ("setup", setup_context),
        ("clear", clear),
        ("gouraud triangle", gouraud_triangle),
        ("textured sprite", textured_sprite),
        ("blended sprite", blended_sprite),
    ];
    for (name, step) in scene {
        if let Err(e) = step(&mut gs) {
            error!("Demo step '{}' failed: {}", name, e);
            return Err(e.into());
        }
    }

    info!(
        "Scene drawn: {} draws, {} routines built, {} palette loads",
        gs.draw_count(),
        gs.routines().builds(),
        gs.clut().reload_count()
    );

    if let Some(path) = args.freeze.or(config.freeze_path) {
        gs.freeze_to_file(&path)?;
        info!("Freeze blob written to: {}", path.display());
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&gs.routines().stats())?);
    }

    Ok(())
}
