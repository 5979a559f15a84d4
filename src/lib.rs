//! Figura: channel-driven deformation and multi-figure composition for
//! skinned 3D characters.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: channels, feedback, frame parameters, events, errors
//! - [`animation`]: tracks, controllers, behaviors and figure animators
//! - [`assets`]: figure definitions, asset sources, recipes and catalogs
//! - [`render`]: device and shader-cache seams, passes, per-figure GPU resources
//! - [`scene`]: figure facades, loading and groups
//! - [`actor`]: actors, actor recipes and settings

pub use figura_actor as actor;
pub use figura_animation as animation;
pub use figura_assets as assets;
pub use figura_core as core;
pub use figura_render as render;
pub use figura_scene as scene;

pub use glam;

pub use figura_actor::{
    Actor, ActorEvent, ActorRecipe, ActorSettings, HairRecipe, LoadContext, MergeReport,
};
pub use figura_animation::{
    ActorBehavior, ActorModel, AnimationTrack, BehaviorAnimator, ControllerManager,
    FigureAnimator, PassThroughAnimator, PoseController,
};
pub use figura_assets::{
    AssetLibrary, AssetSource, DirectoryAssetSource, FigureDefinition, FigureRecipe,
    ImportSettings, MemoryAssetSource,
};
pub use figura_core::{
    ChannelInputs, ChannelSchema, ControlVertex, ControlVertexInfo, FiguraError,
    FrameUpdateParameters, RecipeMismatch, Result,
};
pub use figura_render::{
    HeadlessDevice, IblEnvironment, MemoryShaderCache, RenderDevice, RenderingPass, ShaderCache,
};
pub use figura_scene::{FigureFacade, FigureGroup, FigureKey, FigureLoader};

/// The types a frame driver needs.
pub mod prelude {
    pub use crate::{
        Actor, ActorEvent, ActorRecipe, ActorSettings, AssetLibrary, ChannelInputs, FiguraError,
        FigureRecipe, FrameUpdateParameters, IblEnvironment, LoadContext, RenderDevice,
        RenderingPass, Result, ShaderCache,
    };
}
