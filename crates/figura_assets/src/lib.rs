//! Figure assets for Figura.
//!
//! - [`definition`]: validated, shared [`FigureDefinition`]s
//! - [`source`]: the [`AssetSource`] collaborator with in-memory and directory implementations
//! - [`library`]: name-keyed cache handing out one `Arc` per asset
//! - [`import`]: [`ImportSettings`] selecting which shapes and material sets are exposed
//! - [`recipe`], [`catalog`]: figure recipes, characters and outfits
//! - [`primitives`]: procedural content for tests and demos

pub mod catalog;
pub mod definition;
pub mod import;
pub mod library;
pub mod primitives;
pub mod recipe;
pub mod source;
pub mod storage;

pub use catalog::{Character, Outfit};
pub use definition::{
    DEFAULT_SHAPE, FigureDefinition, FigureDesc, FollowBinding, MaterialSet, MorphDelta,
    MorphTarget, Surface, SurfaceProperties, compute_vertex_normals,
};
pub use import::{FigureImportSettings, ImportSettings, Selection};
pub use library::AssetLibrary;
pub use recipe::FigureRecipe;
pub use source::{AssetSource, DirectoryAssetSource, MemoryAssetSource};
pub use storage::{AssetStorage, asset_uuid};
