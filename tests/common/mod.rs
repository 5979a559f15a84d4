//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use figura::assets::primitives::{self, MAIN_FIGURE};
use figura::prelude::*;
use figura::{
    ControlVertexInfo, FigureAnimator, FigureGroup, FigureLoader, HeadlessDevice,
    MemoryShaderCache,
};

pub const EPSILON: f64 = 1e-6;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn shaders() -> MemoryShaderCache {
    MemoryShaderCache::with_variants(["skin", "hair", "cloth"])
}

pub fn library() -> Arc<AssetLibrary> {
    Arc::new(AssetLibrary::new(primitives::demo_source()))
}

pub fn loader() -> FigureLoader {
    FigureLoader::new(library(), Arc::new(shaders()))
}

pub fn context() -> LoadContext {
    LoadContext::new(library(), Arc::new(shaders()))
}

pub fn load_actor(device: &mut HeadlessDevice, settings: &ActorSettings) -> Actor {
    init_logging();
    Actor::load(device, context(), settings).expect("actor loads")
}

pub fn frame(number: u64) -> FrameUpdateParameters {
    FrameUpdateParameters::new(number, number as f64 / 60.0, 1.0 / 60.0)
}

/// One full frame: update, every pass, postwork. Returns the draw count.
pub fn run_frame(actor: &mut Actor, device: &mut HeadlessDevice, number: u64) -> usize {
    let ibl = IblEnvironment::default();
    actor.update(device, &frame(number), &ibl).expect("update");
    let draws = actor.render(device).expect("render");
    actor.do_postwork(device).expect("postwork");
    draws
}

/// What one animator call observed.
#[derive(Debug, Clone)]
pub struct Observation {
    pub frame: u64,
    pub previous: Vec<ControlVertexInfo>,
}

pub type Observations = Arc<Mutex<Vec<Observation>>>;

/// Animator that records its feedback and raises the arms by a
/// frame-dependent amount, so every frame deforms differently.
pub struct RecordingAnimator {
    pub seen: Observations,
}

impl RecordingAnimator {
    pub fn new() -> (Self, Observations) {
        let seen = Observations::default();
        (
            Self {
                seen: Arc::clone(&seen),
            },
            seen,
        )
    }
}

impl FigureAnimator for RecordingAnimator {
    fn frame_inputs(
        &mut self,
        shape_inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        self.seen.lock().push(Observation {
            frame: params.frame,
            previous: previous.to_vec(),
        });
        let raise = (params.frame % 4) as f64 * 0.25;
        shape_inputs.clone().with("arm-raise", raise)
    }
}

/// A group of the main figure plus `children`, with a recording animator on the root.
pub fn recording_group(
    device: &mut HeadlessDevice,
    children: &[&str],
) -> (FigureGroup, Observations) {
    init_logging();
    let loader = loader();
    let mut main = loader.load(device, MAIN_FIGURE, None).expect("main loads");
    let (animator, seen) = RecordingAnimator::new();
    main.set_animator(Box::new(animator));
    let parent = Arc::clone(main.definition());

    let mut group = FigureGroup::new(main);
    let keys = children
        .iter()
        .map(|name| {
            let facade = loader.load(device, name, Some(&parent)).expect("child loads");
            group.insert(facade)
        })
        .collect();
    group.set_child_figures(keys).expect("children attach");
    (group, seen)
}
