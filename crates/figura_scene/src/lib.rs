//! Live figures for Figura.
//!
//! A [`FigureLoader`] resolves definitions and allocates GPU resources into
//! [`FigureFacade`]s; a [`FigureGroup`] composes a root figure with attached
//! children into one update, render and postwork cycle.

pub mod deformer;
pub mod facade;
pub mod group;
pub mod loader;

pub use deformer::{ParentLink, deform};
pub use facade::FigureFacade;
pub use group::{FigureGroup, FigureKey};
pub use loader::FigureLoader;
