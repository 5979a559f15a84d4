use std::sync::Arc;

use figura_animation::{
    ActorBehavior, ActorModel, AnimationModel, BehaviorAnimator, BehaviorModel, ControllerManager,
    SharedBehavior,
};
use figura_assets::{AssetLibrary, Character, FigureRecipe, Outfit};
use figura_core::{
    EventBus, FiguraError, FrameUpdateParameters, RecipeMismatch, Result, Subscription,
    SubscriptionId,
};
use figura_render::{IblEnvironment, RenderDevice, RenderingPass, ShaderCache};
use figura_scene::{FigureFacade, FigureGroup, FigureKey, FigureLoader};

use crate::events::ActorEvent;
use crate::recipe::{ActorRecipe, HairRecipe, MergeReport};
use crate::settings::ActorSettings;

/// Collaborators an actor is loaded with.
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub loader: FigureLoader,
    pub controllers: Arc<ControllerManager>,
}

impl LoadContext {
    /// Context with the built-in pose controllers.
    pub fn new(library: Arc<AssetLibrary>, shaders: Arc<dyn ShaderCache>) -> Self {
        Self {
            loader: FigureLoader::new(library, shaders),
            controllers: Arc::new(ControllerManager::with_builtins()),
        }
    }

    #[must_use]
    pub fn with_controllers(mut self, controllers: ControllerManager) -> Self {
        self.controllers = Arc::new(controllers);
        self
    }
}

/// A main figure with optional hair and any number of clothing items,
/// animated by one behavior and drawn as one [`FigureGroup`].
///
/// The group's root is the main figure. Its children are the hair (if any)
/// followed by the clothing items. Slot changes replace the whole child list
/// inside one `&mut self` call, so frames only ever see a complete
/// composition.
#[derive(Debug)]
pub struct Actor {
    loader: FigureLoader,
    characters: Vec<Character>,
    outfits: Vec<Outfit>,
    behavior: SharedBehavior,
    group: FigureGroup,
    hair: Option<FigureKey>,
    clothing: Vec<FigureKey>,
    events: EventBus<ActorEvent>,
}

impl Actor {
    /// Loads the main figure, its behavior, hair and initial clothing.
    ///
    /// Catalogs and animation tracks are resolved before anything is
    /// allocated. If a later step fails, everything already loaded is released.
    pub fn load(
        device: &mut dyn RenderDevice,
        context: LoadContext,
        settings: &ActorSettings,
    ) -> Result<Self> {
        let LoadContext {
            loader,
            controllers,
        } = context;
        let library = Arc::clone(loader.library());
        let characters = library.characters()?;
        let outfits = library.outfits()?;
        let tracks = library
            .animation_names()?
            .iter()
            .map(|name| library.animation_track(name))
            .collect::<Result<Vec<_>>>()?;

        let mut main = loader.load(device, &settings.main, None)?;

        let mut animation = AnimationModel::new(tracks);
        if let Some(name) = &settings.animation
            && let Err(mismatch) = animation.set_active_name(name)
        {
            log::warn!("Actor starts without animation: {mismatch}");
        }
        let mut behavior_model = BehaviorModel::new(settings.controllers.iter().map(String::as_str));
        behavior_model.set_animation_speed(settings.animation_speed);
        let model = ActorModel::new(
            Arc::clone(main.definition().schema()),
            animation,
            behavior_model,
        );
        let behavior = ActorBehavior::load(&controllers, model).into_shared();
        main.set_animator(Box::new(BehaviorAnimator::new(Arc::clone(&behavior))));

        let mut actor = Self {
            loader,
            characters,
            outfits,
            behavior,
            group: FigureGroup::new(main),
            hair: None,
            clothing: Vec::new(),
            events: EventBus::new(),
        };

        if let Err(err) = actor.attach_initial(device, settings) {
            if let Err(cleanup) = actor.dispose(device) {
                log::error!("Cleanup after failed actor load: {cleanup}");
            }
            return Err(err);
        }

        log::info!(
            "Actor loaded: '{}' with {} child figure(s)",
            settings.main,
            actor.group.children().len()
        );
        Ok(actor)
    }

    fn attach_initial(&mut self, device: &mut dyn RenderDevice, settings: &ActorSettings) -> Result<()> {
        let mut report = MergeReport::default();
        if let Some(hair) = &settings.hair {
            report.absorb(self.set_hair(device, Some(&FigureRecipe::named(hair)))?);
        }
        report.absorb(self.set_clothing(device, &settings.clothing)?);
        for mismatch in report.mismatches() {
            log::warn!("Initial figure settings skipped {mismatch}");
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn main(&self) -> &FigureFacade {
        self.group.root()
    }

    pub fn main_mut(&mut self) -> &mut FigureFacade {
        self.group.root_mut()
    }

    #[must_use]
    pub fn hair(&self) -> Option<&FigureFacade> {
        self.hair.and_then(|key| self.group.get(key))
    }

    pub fn hair_mut(&mut self) -> Option<&mut FigureFacade> {
        self.hair.and_then(|key| self.group.get_mut(key))
    }

    /// Clothing items in group order.
    pub fn clothing(&self) -> impl Iterator<Item = &FigureFacade> {
        self.clothing.iter().filter_map(|&key| self.group.get(key))
    }

    #[must_use]
    pub fn clothing_names(&self) -> Vec<String> {
        self.clothing()
            .map(|facade| facade.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn behavior(&self) -> &SharedBehavior {
        &self.behavior
    }

    #[must_use]
    pub fn group(&self) -> &FigureGroup {
        &self.group
    }

    #[must_use]
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    #[must_use]
    pub fn outfits(&self) -> &[Outfit] {
        &self.outfits
    }

    #[must_use]
    pub fn loader(&self) -> &FigureLoader {
        &self.loader
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn subscribe(&mut self) -> Subscription<ActorEvent> {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Replaces the clothing set.
    ///
    /// The new items are all loaded before anything changes. If one fails,
    /// the items loaded so far are released and the actor keeps its current
    /// clothing. On success the old items are released and
    /// [`ActorEvent::ClothingChanged`] is published.
    pub fn set_clothing(
        &mut self,
        device: &mut dyn RenderDevice,
        recipes: &[FigureRecipe],
    ) -> Result<MergeReport> {
        let parent = Arc::clone(self.main().definition());
        let mut report = MergeReport::default();
        let mut loaded = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            match self.loader.load_recipe(device, recipe, Some(&parent)) {
                Ok((facade, mismatches)) => {
                    report.extend(mismatches);
                    loaded.push(facade);
                }
                Err(err) => {
                    log::warn!(
                        "Clothing '{}' failed to load; keeping current clothing",
                        recipe.name
                    );
                    discard(device, loaded);
                    return Err(err);
                }
            }
        }

        let keys: Vec<FigureKey> = loaded
            .into_iter()
            .map(|facade| self.group.insert(facade))
            .collect();
        self.commit_children(device, self.hair, &keys)?;
        let previous = std::mem::replace(&mut self.clothing, keys);
        self.dispose_detached(device, previous);

        let figures = self.clothing_names();
        log::info!("Clothing changed to [{}]", figures.join(", "));
        self.events.publish(&ActorEvent::ClothingChanged { figures });
        Ok(report)
    }

    /// Replaces or removes the hair figure, with the same protocol as
    /// [`set_clothing`](Self::set_clothing). Publishes [`ActorEvent::HairChanged`].
    pub fn set_hair(
        &mut self,
        device: &mut dyn RenderDevice,
        recipe: Option<&FigureRecipe>,
    ) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        let hair = match recipe {
            Some(recipe) => {
                let parent = Arc::clone(self.main().definition());
                let (facade, mismatches) = self.loader.load_recipe(device, recipe, Some(&parent))?;
                report.extend(mismatches);
                Some(self.group.insert(facade))
            }
            None => None,
        };

        let clothing = self.clothing.clone();
        self.commit_children(device, hair, &clothing)?;
        let previous = std::mem::replace(&mut self.hair, hair);
        self.dispose_detached(device, previous);

        let figure = self.hair().map(|facade| facade.name().to_string());
        log::info!("Hair changed to {figure:?}");
        self.events.publish(&ActorEvent::HairChanged { figure });
        Ok(report)
    }

    /// Applies a catalog character's shape and material set to the main figure.
    pub fn apply_character(&mut self, name: &str) -> Result<MergeReport> {
        let character = self
            .characters
            .iter()
            .find(|character| character.name == name)
            .ok_or_else(|| FiguraError::AssetNotFound(format!("character '{name}'")))?;
        let recipe = character.to_recipe(self.main().name());
        Ok(self.main_mut().merge_recipe(&recipe).into())
    }

    /// Replaces the clothing with a catalog outfit.
    pub fn apply_outfit(&mut self, device: &mut dyn RenderDevice, name: &str) -> Result<MergeReport> {
        let outfit = self
            .outfits
            .iter()
            .find(|outfit| outfit.name == name)
            .cloned()
            .ok_or_else(|| FiguraError::AssetNotFound(format!("outfit '{name}'")))?;
        self.set_clothing(device, &outfit.items)
    }

    pub fn set_animation(&mut self, name: &str) -> std::result::Result<(), RecipeMismatch> {
        self.behavior
            .lock()
            .model_mut()
            .animation_mut()
            .set_active_name(name)
    }

    /// Pins a main-figure channel to `value` on top of animation and pose.
    pub fn set_channel_value(&mut self, name: &str, value: f64) -> std::result::Result<(), RecipeMismatch> {
        self.behavior.lock().model_mut().set_user_value(name, value)
    }

    fn commit_children(
        &mut self,
        device: &mut dyn RenderDevice,
        hair: Option<FigureKey>,
        clothing: &[FigureKey],
    ) -> Result<()> {
        let children: Vec<FigureKey> = hair.into_iter().chain(clothing.iter().copied()).collect();
        if let Err(err) = self.group.set_child_figures(children) {
            let fresh: Vec<FigureKey> = hair
                .into_iter()
                .chain(clothing.iter().copied())
                .filter(|key| !self.group.children().contains(key))
                .collect();
            self.dispose_detached(device, fresh);
            return Err(err);
        }
        Ok(())
    }

    fn dispose_detached(
        &mut self,
        device: &mut dyn RenderDevice,
        keys: impl IntoIterator<Item = FigureKey>,
    ) {
        let facades = keys
            .into_iter()
            .filter_map(|key| match self.group.take(key) {
                Ok(facade) => Some(facade),
                Err(err) => {
                    log::error!("Detached figure missing from group: {err}");
                    None
                }
            })
            .collect();
        discard(device, facades);
    }

    // ========================================================================
    // Recipes
    // ========================================================================

    #[must_use]
    pub fn recipize(&self) -> ActorRecipe {
        let behavior = self.behavior.lock();
        let model = behavior.model();
        ActorRecipe {
            main: Some(self.main().recipize()),
            hair: Some(self.hair().map(FigureFacade::recipize).into()),
            clothing: Some(self.clothing().map(FigureFacade::recipize).collect()),
            animation: model.animation().active_name().map(str::to_string),
            behaviour: Some(model.behavior().recipize()),
            channel_values: Some(model.user_values().clone()),
            pose: Some(behavior.recipize_pose()),
        }
    }

    /// Applies every present field of `recipe`.
    ///
    /// Fields are applied in the order main, hair, animation, behaviour,
    /// channel values, clothing, pose. References to figures, shapes,
    /// material sets, animations, controllers or channels the actor lacks
    /// are skipped and listed in the report. Figure loads can still fail;
    /// fields before the failing one stay applied.
    pub fn merge(&mut self, device: &mut dyn RenderDevice, recipe: &ActorRecipe) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        if let Some(main) = &recipe.main {
            report.extend(self.main_mut().merge_recipe(main));
        }

        match &recipe.hair {
            None => {}
            Some(HairRecipe::Removed) => {
                if self.hair.is_some() {
                    report.absorb(self.set_hair(device, None)?);
                }
            }
            Some(HairRecipe::Figure(hair)) => {
                let same_figure = self.hair().is_some_and(|current| current.name() == hair.name);
                if !same_figure {
                    report.absorb(self.set_hair(device, Some(hair))?);
                } else if let Some(current) = self.hair_mut() {
                    report.extend(current.merge_recipe(hair));
                }
            }
        }

        {
            let mut behavior = self.behavior.lock();
            if let Some(animation) = &recipe.animation
                && let Err(mismatch) = behavior.model_mut().animation_mut().set_active_name(animation)
            {
                report.push(mismatch);
            }
            if let Some(behaviour) = &recipe.behaviour {
                report.extend(behavior.model_mut().behavior_mut().merge(behaviour));
            }
            if let Some(values) = &recipe.channel_values {
                report.extend(behavior.model_mut().set_user_values(values));
            }
        }

        if let Some(clothing) = &recipe.clothing {
            report.absorb(self.set_clothing(device, clothing)?);
        }

        if let Some(pose) = &recipe.pose {
            report.extend(self.behavior.lock().merge_pose(pose));
        }

        for mismatch in report.mismatches() {
            log::warn!("Recipe merge skipped {mismatch}");
        }
        Ok(report)
    }

    // ========================================================================
    // Frame
    // ========================================================================

    pub fn update(
        &mut self,
        device: &mut dyn RenderDevice,
        params: &FrameUpdateParameters,
        ibl: &IblEnvironment,
    ) -> Result<()> {
        self.group.update(device, params, ibl)
    }

    pub fn render_pass(&self, device: &mut dyn RenderDevice, pass: RenderingPass) -> Result<usize> {
        self.group.render_pass(device, pass)
    }

    /// Issues every pass in [`RenderingPass::ALL`] order.
    pub fn render(&self, device: &mut dyn RenderDevice) -> Result<usize> {
        let mut issued = 0;
        for pass in RenderingPass::ALL {
            issued += self.render_pass(device, pass)?;
        }
        Ok(issued)
    }

    pub fn do_postwork(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        self.group.do_postwork(device)
    }

    /// Releases every figure the actor owns.
    pub fn dispose(self, device: &mut dyn RenderDevice) -> Result<()> {
        log::info!("Disposing actor '{}'", self.main().name());
        self.group.dispose(device)
    }
}

fn discard(device: &mut dyn RenderDevice, facades: Vec<FigureFacade>) {
    for mut facade in facades {
        if let Err(err) = facade.dispose(device) {
            log::error!("Failed to dispose '{}': {err}", facade.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_assets::primitives::{self, HAIR_FIGURE, MAIN_FIGURE};
    use figura_render::{HeadlessDevice, MemoryShaderCache};

    fn context() -> LoadContext {
        LoadContext::new(
            Arc::new(AssetLibrary::new(primitives::demo_source())),
            Arc::new(MemoryShaderCache::with_variants(["skin", "hair", "cloth"])),
        )
    }

    fn actor(device: &mut HeadlessDevice, settings: &ActorSettings) -> Actor {
        Actor::load(device, context(), settings).unwrap()
    }

    #[test]
    fn default_settings_load_a_bare_main_figure() {
        let mut device = HeadlessDevice::new();
        let actor = actor(&mut device, &ActorSettings::default());
        assert_eq!(actor.main().name(), MAIN_FIGURE);
        assert!(actor.hair().is_none());
        assert!(actor.group().children().is_empty());
        assert_eq!(actor.characters().len(), 3);
        assert_eq!(
            actor.behavior().lock().model().animation().active_name(),
            Some("idle")
        );
    }

    #[test]
    fn hair_comes_before_clothing() {
        let mut device = HeadlessDevice::new();
        let settings = ActorSettings::default()
            .with_hair(HAIR_FIGURE)
            .with_clothing(vec![FigureRecipe::named("shirt")]);
        let actor = actor(&mut device, &settings);
        let names: Vec<&str> = actor
            .group()
            .children()
            .iter()
            .map(|&key| actor.group().get(key).unwrap().name())
            .collect();
        assert_eq!(names, vec![HAIR_FIGURE, "shirt"]);
    }

    #[test]
    fn failed_load_releases_everything() {
        let mut device = HeadlessDevice::new();
        let settings = ActorSettings::default()
            .with_hair(HAIR_FIGURE)
            .with_clothing(vec![FigureRecipe::named("shirt"), FigureRecipe::named("tail")]);
        let err = Actor::load(&mut device, context(), &settings).unwrap_err();
        assert!(matches!(err, FiguraError::IncompatibleRig { .. }));
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn hair_swap_publishes_an_event() {
        let mut device = HeadlessDevice::new();
        let mut actor = actor(&mut device, &ActorSettings::default().with_hair(HAIR_FIGURE));
        let events = actor.subscribe();

        actor.set_hair(&mut device, None).unwrap();
        assert!(actor.hair().is_none());
        assert_eq!(
            events.try_next(),
            Some(ActorEvent::HairChanged { figure: None })
        );
        assert_eq!(device.live_buffers(), 3);
    }

    #[test]
    fn outfit_and_character_shortcuts() {
        let mut device = HeadlessDevice::new();
        let mut actor = actor(&mut device, &ActorSettings::default());

        actor.apply_outfit(&mut device, "Casual").unwrap();
        assert_eq!(actor.clothing_names(), vec!["shirt", "skirt"]);

        let report = actor.apply_character("Rune").unwrap();
        assert!(report.is_clean());
        assert_eq!(actor.main().shape(), "Rune");
        assert_eq!(actor.main().material_set(), Some("Rune"));

        assert!(matches!(
            actor.apply_outfit(&mut device, "Ballgown"),
            Err(FiguraError::AssetNotFound(_))
        ));
        assert_eq!(actor.clothing_names(), vec!["shirt", "skirt"]);
    }

    #[test]
    fn dispose_releases_all_figures() {
        let mut device = HeadlessDevice::new();
        let settings = ActorSettings::default()
            .with_hair(HAIR_FIGURE)
            .with_clothing(vec![FigureRecipe::named("skirt")]);
        let actor = actor(&mut device, &settings);
        actor.dispose(&mut device).unwrap();
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(device.released_buffers(), device.created_buffers());
    }
}
