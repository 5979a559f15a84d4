//! Actors for Figura: a main figure, optional hair and a replaceable
//! clothing set, composed into one [`FigureGroup`](figura_scene::FigureGroup)
//! and driven by one behavior.
//!
//! - [`actor`]: the [`Actor`] aggregate and its [`LoadContext`]
//! - [`recipe`]: [`ActorRecipe`] snapshots and [`MergeReport`]s
//! - [`settings`]: [`ActorSettings`] configuration
//! - [`events`]: [`ActorEvent`] change notifications

pub mod actor;
pub mod events;
pub mod recipe;
pub mod settings;

pub use actor::{Actor, LoadContext};
pub use events::ActorEvent;
pub use recipe::{ActorRecipe, HairRecipe, MergeReport};
pub use settings::ActorSettings;
