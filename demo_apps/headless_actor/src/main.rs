//! Headless Actor
//!
//! Loads the reference actor from the built-in figure set, plays a few
//! frames, changes outfit and character mid-run, then prints the resulting
//! recipe.
//!
//! Usage: `headless_actor [settings.json] [frames]`
//!
//! Set `RUST_LOG=debug` to follow every swap and readback.

use std::sync::Arc;

use anyhow::Context;

use figura::assets::primitives;
use figura::prelude::*;
use figura::{HeadlessDevice, MemoryShaderCache};

const FRAME_RATE: f64 = 60.0;
const DEFAULT_FRAMES: u64 = 120;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => ActorSettings::load(&path).with_context(|| format!("reading {path}"))?,
        None => ActorSettings::default().with_hair(primitives::HAIR_FIGURE),
    };
    let frames = match args.next() {
        Some(count) => count.parse().context("frame count")?,
        None => DEFAULT_FRAMES,
    };

    let library = Arc::new(AssetLibrary::new(primitives::demo_source()));
    let shaders = Arc::new(MemoryShaderCache::with_variants(["skin", "hair", "cloth"]));
    let mut device = HeadlessDevice::new();

    let mut actor = Actor::load(&mut device, LoadContext::new(library, shaders), &settings)?;
    let changes = actor.subscribe();
    let ibl = IblEnvironment::default();

    for frame in 1..=frames {
        match frame {
            f if f == frames / 3 => {
                actor.apply_outfit(&mut device, "Casual")?;
            }
            f if f == frames / 2 => {
                let report = actor.apply_character("Rune")?;
                for mismatch in report.mismatches() {
                    log::warn!("Character skipped {mismatch}");
                }
            }
            f if f == 2 * frames / 3 => {
                if let Err(mismatch) = actor.set_animation("wave") {
                    log::warn!("{mismatch}");
                }
            }
            _ => {}
        }

        let params = FrameUpdateParameters::new(frame, frame as f64 / FRAME_RATE, (1.0 / FRAME_RATE) as f32);
        actor.update(&mut device, &params, &ibl)?;
        let draws = actor.render(&mut device)?;
        actor.do_postwork(&mut device)?;
        device.take_draws();

        log::debug!(
            "Frame {frame}: {draws} draw(s), belly {:.3}",
            actor.main().frame_outputs().get("belly")
        );
    }

    for event in changes.drain() {
        log::info!("Observed {event:?}");
    }

    println!("{}", actor.recipize().to_json()?);

    actor.dispose(&mut device)?;
    log::info!(
        "Buffers created {}, released {}",
        device.created_buffers(),
        device.released_buffers()
    );
    Ok(())
}
