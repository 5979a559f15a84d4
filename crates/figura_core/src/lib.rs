//! Foundational types shared by every Figura crate.
//!
//! - [`channel`]: channel schemas and layered [`ChannelInputs`]
//! - [`feedback`]: per-figure deformed vertex output fed back into the next frame
//! - [`frame`]: per-frame update parameters
//! - [`events`]: publish/subscribe notification bus
//! - [`errors`]: the [`FiguraError`] taxonomy
//! - [`interner`]: global channel-name interner

pub mod channel;
pub mod errors;
pub mod events;
pub mod feedback;
pub mod frame;
pub mod interner;

pub use channel::{ChannelDef, ChannelInputs, ChannelSchema};
pub use errors::{FiguraError, MismatchKind, RecipeMismatch, Result};
pub use events::{EventBus, Subscription, SubscriptionId};
pub use feedback::{ControlVertex, ControlVertexInfo, FeedbackBuffer, TopologyId};
pub use frame::FrameUpdateParameters;
pub use interner::Symbol;
