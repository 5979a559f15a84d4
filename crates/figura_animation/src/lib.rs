//! Per-frame channel production for Figura figures.
//!
//! Data flows bottom-up: [`KeyframeTrack`]s sampled by an [`AnimationModel`],
//! [`PoseController`]s layered on top by an [`ActorBehavior`], and finally a
//! [`FigureAnimator`] that hands one figure its channel inputs for the frame.

mod values;
pub mod actor_model;
pub mod animator;
pub mod behavior;
pub mod clip;
pub mod controller;
pub mod model;
pub mod playback;
pub mod tracks;

pub use actor_model::ActorModel;
pub use animator::{BehaviorAnimator, FigureAnimator, PassThroughAnimator};
pub use behavior::{ActorBehavior, BehaviorModel, BehaviorRecipe, PoseRecipe, SharedBehavior};
pub use clip::{AnimationTrack, ChannelCurve};
pub use controller::{
    BreathingController, ControllerFactory, ControllerManager, MotionFollowController,
    PoseController,
};
pub use model::AnimationModel;
pub use playback::{LoopMode, TrackPlayback};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;
