use std::sync::Arc;

use figura_assets::{AssetLibrary, FigureDefinition, FigureRecipe};
use figura_core::{RecipeMismatch, Result};
use figura_render::{FigureRenderer, RenderDevice, ShaderCache};

use crate::facade::FigureFacade;

/// Turns figure names and recipes into live [`FigureFacade`]s.
///
/// Definitions come from the shared [`AssetLibrary`], so every facade of the
/// same figure holds the same `Arc<FigureDefinition>`.
#[derive(Clone)]
pub struct FigureLoader {
    library: Arc<AssetLibrary>,
    shaders: Arc<dyn ShaderCache>,
}

impl std::fmt::Debug for FigureLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FigureLoader")
            .field("library", &self.library)
            .finish_non_exhaustive()
    }
}

impl FigureLoader {
    pub fn new(library: Arc<AssetLibrary>, shaders: Arc<dyn ShaderCache>) -> Self {
        Self { library, shaders }
    }

    #[must_use]
    pub fn library(&self) -> &Arc<AssetLibrary> {
        &self.library
    }

    #[must_use]
    pub fn shaders(&self) -> &Arc<dyn ShaderCache> {
        &self.shaders
    }

    /// Loads `name`, attached to `parent` when given.
    ///
    /// Fails with `AssetNotFound`, `IncompatibleRig`, `ShaderUnavailable` or
    /// `Gpu`; nothing stays allocated on failure.
    pub fn load(
        &self,
        device: &mut dyn RenderDevice,
        name: &str,
        parent: Option<&Arc<FigureDefinition>>,
    ) -> Result<FigureFacade> {
        let definition = self.library.figure_definition(name)?;
        definition.check_attachment(parent.map(AsRef::as_ref))?;

        let material_set = definition.default_material_set().map(str::to_string);
        let renderer = FigureRenderer::new(
            device,
            self.shaders.as_ref(),
            &definition,
            material_set.as_deref(),
        )?;

        log::info!(
            "Loaded figure '{name}'{}",
            parent.map_or_else(String::new, |p| format!(" onto '{}'", p.name()))
        );
        Ok(FigureFacade::new(
            definition,
            parent.cloned(),
            renderer,
            material_set,
        ))
    }

    /// Loads the recipe's figure and applies its shape and material set.
    ///
    /// Mismatches do not fail the load; they are returned alongside the facade.
    pub fn load_recipe(
        &self,
        device: &mut dyn RenderDevice,
        recipe: &FigureRecipe,
        parent: Option<&Arc<FigureDefinition>>,
    ) -> Result<(FigureFacade, Vec<RecipeMismatch>)> {
        let mut facade = self.load(device, &recipe.name, parent)?;
        let mismatches = facade.merge_recipe(recipe);
        Ok((facade, mismatches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_assets::primitives::{self, HAIR_FIGURE, MAIN_FIGURE};
    use figura_core::FiguraError;
    use figura_render::{HeadlessDevice, MemoryShaderCache};

    fn loader(shaders: MemoryShaderCache) -> FigureLoader {
        FigureLoader::new(
            Arc::new(AssetLibrary::new(primitives::demo_source())),
            Arc::new(shaders),
        )
    }

    fn all_shaders() -> MemoryShaderCache {
        MemoryShaderCache::with_variants(["skin", "hair", "cloth"])
    }

    #[test]
    fn facades_share_one_definition() {
        let loader = loader(all_shaders());
        let mut device = HeadlessDevice::new();
        let a = loader.load(&mut device, MAIN_FIGURE, None).unwrap();
        let b = loader.load(&mut device, MAIN_FIGURE, None).unwrap();
        assert!(Arc::ptr_eq(a.definition(), b.definition()));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn attachable_figure_requires_a_parent() {
        let loader = loader(all_shaders());
        let mut device = HeadlessDevice::new();
        let err = loader.load(&mut device, HAIR_FIGURE, None).unwrap_err();
        assert!(matches!(err, FiguraError::IncompatibleRig { .. }));
        assert_eq!(device.created_buffers(), 0);
    }

    #[test]
    fn missing_attachment_bone_is_incompatible() {
        let loader = loader(all_shaders());
        let mut device = HeadlessDevice::new();
        let main = loader.load(&mut device, MAIN_FIGURE, None).unwrap();
        let err = loader
            .load(&mut device, "tail", Some(main.definition()))
            .unwrap_err();
        assert!(matches!(err, FiguraError::IncompatibleRig { .. }));
    }

    #[test]
    fn missing_shader_allocates_nothing() {
        let loader = loader(MemoryShaderCache::with_variants(["skin"]));
        let mut device = HeadlessDevice::new();
        let err = loader.load(&mut device, MAIN_FIGURE, None).unwrap_err();
        assert!(matches!(err, FiguraError::ShaderUnavailable(_)));
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn recipe_mismatches_are_returned() {
        let loader = loader(all_shaders());
        let mut device = HeadlessDevice::new();
        let main = loader.load(&mut device, MAIN_FIGURE, None).unwrap();
        let recipe = FigureRecipe::named(HAIR_FIGURE)
            .with_shape("Curly")
            .with_material_set("Green");
        let (hair, mismatches) = loader
            .load_recipe(&mut device, &recipe, Some(main.definition()))
            .unwrap();
        assert_eq!(hair.shape(), "Curly");
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].name, "Green");
    }

    #[test]
    fn unknown_figure_is_not_found() {
        let loader = loader(all_shaders());
        let mut device = HeadlessDevice::new();
        assert!(matches!(
            loader.load(&mut device, "nobody", None),
            Err(FiguraError::AssetNotFound(_))
        ));
    }
}
