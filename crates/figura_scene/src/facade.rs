use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use figura_animation::{FigureAnimator, PassThroughAnimator};
use figura_assets::{DEFAULT_SHAPE, FigureDefinition, FigureRecipe};
use figura_core::{
    ChannelInputs, ControlVertex, ControlVertexInfo, FeedbackBuffer, FiguraError,
    FrameUpdateParameters, MismatchKind, RecipeMismatch, Result,
};
use figura_render::{FigureRenderer, IblEnvironment, RenderDevice, RenderingPass};

use crate::deformer::{ParentLink, deform};

/// One loaded figure: its definition, GPU resources, animator and feedback.
///
/// Frame protocol: `update` → `render_pass` (once per pass) → `do_postwork`.
/// Every frame call after [`dispose`](Self::dispose) fails with
/// [`FiguraError::FacadeDisposed`].
pub struct FigureFacade {
    id: Uuid,
    definition: Arc<FigureDefinition>,
    parent: Option<Arc<FigureDefinition>>,

    shape: String,
    shape_inputs: ChannelInputs,
    material_set: Option<String>,

    animator: Box<dyn FigureAnimator>,
    renderer: Option<FigureRenderer>,

    feedback: FeedbackBuffer,
    pending_readback: Option<u64>,
    frame_outputs: ChannelInputs,
    deformed: Arc<[ControlVertex]>,
}

impl fmt::Debug for FigureFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigureFacade")
            .field("id", &self.id)
            .field("figure", &self.definition.name())
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("shape", &self.shape)
            .field("material_set", &self.material_set)
            .field("disposed", &self.renderer.is_none())
            .field("pending_readback", &self.pending_readback)
            .finish_non_exhaustive()
    }
}

impl FigureFacade {
    /// Wraps already allocated resources. The figure starts in its `Base`
    /// shape with the given material set and a [`PassThroughAnimator`].
    pub(crate) fn new(
        definition: Arc<FigureDefinition>,
        parent: Option<Arc<FigureDefinition>>,
        renderer: FigureRenderer,
        material_set: Option<String>,
    ) -> Self {
        let figure: Arc<str> = Arc::from(definition.name());
        let shape_inputs = definition
            .shape_inputs(DEFAULT_SHAPE)
            .unwrap_or_else(|| ChannelInputs::new(Arc::clone(definition.schema())));
        let feedback = FeedbackBuffer::new(figure, definition.topology());
        let deformed: Arc<[ControlVertex]> = Arc::from(definition.rest_vertices());

        Self {
            id: Uuid::new_v4(),
            frame_outputs: shape_inputs.clone(),
            parent,
            shape: DEFAULT_SHAPE.to_string(),
            shape_inputs,
            material_set,
            animator: Box::new(PassThroughAnimator),
            renderer: Some(renderer),
            feedback,
            pending_readback: None,
            deformed,
            definition,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Instance id, unique per load.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    #[inline]
    #[must_use]
    pub fn definition(&self) -> &Arc<FigureDefinition> {
        &self.definition
    }

    #[must_use]
    pub fn parent_definition(&self) -> Option<&Arc<FigureDefinition>> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Channel values of the current shape; the animator's base layer.
    #[must_use]
    pub fn shape_inputs(&self) -> &ChannelInputs {
        &self.shape_inputs
    }

    #[must_use]
    pub fn material_set(&self) -> Option<&str> {
        self.material_set.as_deref()
    }

    /// Feedback of the last completed frame.
    #[must_use]
    pub fn feedback(&self) -> &ControlVertexInfo {
        self.feedback.latest()
    }

    /// Channel inputs the figure was deformed with in its latest update.
    #[must_use]
    pub fn frame_outputs(&self) -> &ChannelInputs {
        &self.frame_outputs
    }

    /// CPU copy of the latest deformation.
    #[must_use]
    pub fn deformed(&self) -> &Arc<[ControlVertex]> {
        &self.deformed
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&FigureRenderer> {
        self.renderer.as_ref()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.renderer.is_none()
    }

    /// Frame whose deformation awaits [`do_postwork`](Self::do_postwork).
    #[must_use]
    pub fn pending_readback(&self) -> Option<u64> {
        self.pending_readback
    }

    pub fn set_animator(&mut self, animator: Box<dyn FigureAnimator>) {
        self.animator = animator;
    }

    // ========================================================================
    // Shape / material set / recipe
    // ========================================================================

    /// Selects a shape; its channel values become the animator's base layer.
    pub fn set_shape(&mut self, shape: &str) -> std::result::Result<(), RecipeMismatch> {
        let inputs = self
            .definition
            .shape_inputs(shape)
            .ok_or_else(|| RecipeMismatch::new(MismatchKind::Shape, shape))?;
        self.shape = shape.to_string();
        self.shape_inputs = inputs;
        Ok(())
    }

    /// Selects a material set and re-assigns surfaces to passes for its opacities.
    pub fn set_material_set(
        &mut self,
        material_set: &str,
    ) -> std::result::Result<(), RecipeMismatch> {
        if !self.definition.has_material_set(material_set) {
            return Err(RecipeMismatch::new(MismatchKind::MaterialSet, material_set));
        }
        self.material_set = Some(material_set.to_string());
        if let Some(renderer) = &mut self.renderer {
            renderer.assign_material_set(&self.definition, Some(material_set));
        }
        Ok(())
    }

    #[must_use]
    pub fn recipize(&self) -> FigureRecipe {
        FigureRecipe {
            name: self.name().to_string(),
            shape: Some(self.shape.clone()),
            material_set: self.material_set.clone(),
        }
    }

    /// Applies the recipe's shape and material set, collecting what could not be applied.
    pub fn merge_recipe(&mut self, recipe: &FigureRecipe) -> Vec<RecipeMismatch> {
        let mut mismatches = Vec::new();
        if recipe.name != self.name() {
            log::warn!(
                "Recipe for '{}' merged onto figure '{}'",
                recipe.name,
                self.name()
            );
            mismatches.push(RecipeMismatch::new(MismatchKind::Figure, &recipe.name));
        }
        if let Some(shape) = &recipe.shape
            && let Err(mismatch) = self.set_shape(shape)
        {
            log::warn!("Figure '{}' has no shape '{shape}'", self.name());
            mismatches.push(mismatch);
        }
        if let Some(material_set) = &recipe.material_set
            && let Err(mismatch) = self.set_material_set(material_set)
        {
            log::warn!(
                "Figure '{}' has no material set '{material_set}'",
                self.name()
            );
            mismatches.push(mismatch);
        }
        mismatches
    }

    // ========================================================================
    // Frame
    // ========================================================================

    fn live_renderer(&self) -> Result<&FigureRenderer> {
        self.renderer
            .as_ref()
            .ok_or_else(|| FiguraError::FacadeDisposed(self.name().to_string()))
    }

    /// Animates, deforms and uploads this figure for `params.frame`.
    ///
    /// `parent` is the root's same-frame state for attached figures. Channels
    /// the figure shares with the root take the root's values.
    pub fn update(
        &mut self,
        device: &mut dyn RenderDevice,
        params: &FrameUpdateParameters,
        ibl: &IblEnvironment,
        parent: Option<&ParentLink>,
        previous: &[ControlVertexInfo],
    ) -> Result<()> {
        self.live_renderer()?;

        if let Some(pending) = self.pending_readback.take() {
            log::warn!(
                "'{}' updated for frame {} before postwork of frame {pending}; readback dropped",
                self.name(),
                params.frame
            );
        }

        let mut inputs = self
            .animator
            .frame_inputs(&self.shape_inputs, params, previous);
        if let Some(parent) = parent {
            let driven = parent.outputs.restricted_to(self.definition.schema());
            inputs = inputs.merge(&driven, true);
        }

        let vertices = deform(&self.definition, &inputs, parent)?;

        let renderer = self.live_renderer()?;
        renderer.upload_vertices(device, &vertices)?;
        renderer.upload_constants(device, params, ibl)?;

        self.frame_outputs = inputs;
        self.deformed = Arc::from(vertices);
        self.pending_readback = Some(params.frame);
        Ok(())
    }

    /// Issues this figure's draws for one pass.
    pub fn render_pass(&self, device: &mut dyn RenderDevice, pass: RenderingPass) -> Result<usize> {
        self.live_renderer()?.render_pass(device, pass)
    }

    /// Reads the frame's deformation back and publishes it as feedback.
    pub fn do_postwork(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        let renderer = self.live_renderer()?;
        let Some(frame) = self.pending_readback else {
            log::trace!("'{}' has no pending readback", self.name());
            return Ok(());
        };

        let vertices = renderer.read_vertices(device)?;
        self.pending_readback = None;
        let info = ControlVertexInfo::new(
            Arc::from(self.name()),
            self.definition.topology(),
            frame,
            Arc::from(vertices),
        );
        self.feedback.publish(info)
    }

    /// Releases the figure's GPU resources.
    pub fn dispose(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        let renderer = self
            .renderer
            .take()
            .ok_or_else(|| FiguraError::FacadeDisposed(self.name().to_string()))?;
        self.pending_readback = None;
        log::debug!("Disposing '{}' ({})", self.name(), self.id);
        renderer.release(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_animation::FigureAnimator;
    use figura_assets::primitives::{self, MAIN_FIGURE};
    use figura_render::{HeadlessDevice, MemoryShaderCache};

    fn body_facade(device: &mut HeadlessDevice) -> FigureFacade {
        let definition =
            Arc::new(FigureDefinition::new(primitives::body_desc(MAIN_FIGURE)).unwrap());
        let shaders = MemoryShaderCache::with_variants(["skin", "hair", "cloth"]);
        let material_set = definition.default_material_set().map(str::to_string);
        let renderer =
            FigureRenderer::new(device, &shaders, &definition, material_set.as_deref()).unwrap();
        FigureFacade::new(definition, None, renderer, material_set)
    }

    struct Constant(&'static str, f64);

    impl FigureAnimator for Constant {
        fn frame_inputs(
            &mut self,
            shape_inputs: &ChannelInputs,
            _params: &FrameUpdateParameters,
            _previous: &[ControlVertexInfo],
        ) -> ChannelInputs {
            shape_inputs.clone().with(self.0, self.1)
        }
    }

    #[test]
    fn feedback_is_published_by_postwork_only() {
        let mut device = HeadlessDevice::new();
        let mut facade = body_facade(&mut device);
        let params = FrameUpdateParameters::new(1, 0.0, 1.0 / 60.0);

        facade
            .update(&mut device, &params, &IblEnvironment::default(), None, &[])
            .unwrap();
        assert_eq!(facade.feedback().frame(), None);
        assert_eq!(facade.pending_readback(), Some(1));

        facade.do_postwork(&mut device).unwrap();
        assert_eq!(facade.feedback().frame(), Some(1));
        assert_eq!(facade.feedback().vertices(), &**facade.deformed());
        assert_eq!(facade.pending_readback(), None);
    }

    #[test]
    fn animator_output_reaches_the_vertex_buffer() {
        let mut device = HeadlessDevice::new();
        let mut facade = body_facade(&mut device);
        facade.set_animator(Box::new(Constant("arm-raise", 1.0)));
        facade
            .update(
                &mut device,
                &FrameUpdateParameters::default(),
                &IblEnvironment::default(),
                None,
                &[],
            )
            .unwrap();
        assert!((facade.frame_outputs().get("arm-raise") - 1.0).abs() < f64::EPSILON);

        let buffer = facade.renderer().unwrap().vertex_buffer();
        let uploaded: Vec<ControlVertex> =
            bytemuck::pod_collect_to_vec(device.buffer_data(buffer).unwrap());
        assert_eq!(uploaded.as_slice(), &**facade.deformed());
        assert_ne!(uploaded.as_slice(), facade.definition().rest_vertices());
    }

    #[test]
    fn unknown_shape_is_reported_and_rest_applied() {
        let mut device = HeadlessDevice::new();
        let mut facade = body_facade(&mut device);
        let recipe = FigureRecipe::named(MAIN_FIGURE)
            .with_shape("Nobody")
            .with_material_set("Rune");
        let mismatches = facade.merge_recipe(&recipe);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].kind, MismatchKind::Shape);
        assert_eq!(facade.shape(), DEFAULT_SHAPE);
        assert_eq!(facade.material_set(), Some("Rune"));
    }

    #[test]
    fn shape_becomes_the_base_layer() {
        let mut device = HeadlessDevice::new();
        let mut facade = body_facade(&mut device);
        facade.set_shape("Rune").unwrap();
        assert!((facade.shape_inputs().get("belly") - 0.6).abs() < 1e-9);
        assert_eq!(facade.recipize().shape.as_deref(), Some("Rune"));
    }

    #[test]
    fn disposed_facade_rejects_frame_calls() {
        let mut device = HeadlessDevice::new();
        let mut facade = body_facade(&mut device);
        facade.dispose(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 0);

        let params = FrameUpdateParameters::default();
        let ibl = IblEnvironment::default();
        assert!(matches!(
            facade.update(&mut device, &params, &ibl, None, &[]),
            Err(FiguraError::FacadeDisposed(_))
        ));
        assert!(matches!(
            facade.render_pass(&mut device, RenderingPass::Opaque),
            Err(FiguraError::FacadeDisposed(_))
        ));
        assert!(matches!(
            facade.do_postwork(&mut device),
            Err(FiguraError::FacadeDisposed(_))
        ));
        assert!(matches!(
            facade.dispose(&mut device),
            Err(FiguraError::FacadeDisposed(_))
        ));
    }
}
