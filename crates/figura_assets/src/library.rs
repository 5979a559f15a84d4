use std::sync::Arc;

use figura_animation::AnimationTrack;
use figura_core::Result;

use crate::catalog::{Character, Outfit};
use crate::definition::FigureDefinition;
use crate::source::AssetSource;
use crate::storage::{AssetStorage, asset_uuid};

/// Resolves assets through an [`AssetSource`] and keeps one shared instance
/// per name.
///
/// Every facade of the same figure receives the same `Arc<FigureDefinition>`.
pub struct AssetLibrary {
    source: Arc<dyn AssetSource>,
    definitions: AssetStorage<FigureDefinition>,
    animations: AssetStorage<AnimationTrack>,
}

impl std::fmt::Debug for AssetLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLibrary")
            .field("definitions", &self.definitions.len())
            .field("animations", &self.animations.len())
            .finish_non_exhaustive()
    }
}

impl AssetLibrary {
    pub fn new(source: impl AssetSource + 'static) -> Self {
        Self::from_shared(Arc::new(source))
    }

    #[must_use]
    pub fn from_shared(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            definitions: AssetStorage::new(),
            animations: AssetStorage::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn AssetSource> {
        &self.source
    }

    /// The validated definition of figure `name`, loaded on first request.
    pub fn figure_definition(&self, name: &str) -> Result<Arc<FigureDefinition>> {
        self.definitions
            .get_or_try_insert(asset_uuid("figure", name), || {
                log::info!("Loading figure definition '{name}'");
                FigureDefinition::new(self.source.figure_desc(name)?)
            })
    }

    pub fn animation_track(&self, name: &str) -> Result<Arc<AnimationTrack>> {
        self.animations
            .get_or_try_insert(asset_uuid("animation", name), || {
                log::debug!("Loading animation track '{name}'");
                self.source.animation_track(name)
            })
    }

    pub fn animation_names(&self) -> Result<Vec<String>> {
        self.source.animation_names()
    }

    pub fn characters(&self) -> Result<Vec<Character>> {
        self.source.characters()
    }

    pub fn outfits(&self) -> Result<Vec<Outfit>> {
        self.source.outfits()
    }

    /// Number of distinct figure definitions currently cached.
    #[must_use]
    pub fn cached_definitions(&self) -> usize {
        self.definitions.len()
    }

    /// Forgets the cached definition of `name`; live facades keep theirs.
    pub fn evict_definition(&self, name: &str) -> bool {
        self.definitions
            .remove(&asset_uuid("figure", name))
            .is_some()
    }
}
