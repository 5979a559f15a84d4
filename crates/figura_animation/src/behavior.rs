//! Actor behavior: the layered channel pipeline that animates the main figure.
//!
//! Each frame the layers are merged in a fixed order, later layers winning:
//!
//! 1. the figure's shape inputs
//! 2. the active animation track
//! 3. every enabled pose controller, in registration order
//! 4. the manual pose
//! 5. the user's pinned channel values

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use figura_core::{
    ChannelInputs, ControlVertexInfo, FrameUpdateParameters, MismatchKind, RecipeMismatch,
};

use crate::actor_model::ActorModel;
use crate::controller::{ControllerManager, PoseController};

/// Behavior shared between the actor and the main figure's animator.
pub type SharedBehavior = Arc<Mutex<ActorBehavior>>;

// ============================================================================
// Behavior Model
// ============================================================================

/// Persistent behavior settings: which controllers run and how fast the
/// animation plays.
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorModel {
    controllers: BTreeMap<String, bool>,
    animation_speed: f32,
}

impl Default for BehaviorModel {
    fn default() -> Self {
        Self {
            controllers: BTreeMap::new(),
            animation_speed: 1.0,
        }
    }
}

impl BehaviorModel {
    /// Model with every listed controller enabled.
    pub fn new<I, S>(controllers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            controllers: controllers.into_iter().map(|name| (name.into(), true)).collect(),
            animation_speed: 1.0,
        }
    }

    pub fn controller_names(&self) -> impl Iterator<Item = &str> {
        self.controllers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_enabled(&self, controller: &str) -> bool {
        self.controllers.get(controller).copied().unwrap_or(false)
    }

    /// Enables or disables a known controller.
    pub fn set_enabled(&mut self, controller: &str, enabled: bool) -> Result<(), RecipeMismatch> {
        match self.controllers.get_mut(controller) {
            Some(flag) => {
                *flag = enabled;
                Ok(())
            }
            None => Err(RecipeMismatch::new(MismatchKind::Controller, controller)),
        }
    }

    #[must_use]
    pub fn animation_speed(&self) -> f32 {
        self.animation_speed
    }

    pub fn set_animation_speed(&mut self, speed: f32) {
        self.animation_speed = speed.max(0.0);
    }

    #[must_use]
    pub fn recipize(&self) -> BehaviorRecipe {
        BehaviorRecipe {
            controllers: Some(self.controllers.clone()),
            animation_speed: Some(self.animation_speed),
        }
    }

    /// Applies the fields the recipe carries; unknown controllers are skipped.
    pub fn merge(&mut self, recipe: &BehaviorRecipe) -> Vec<RecipeMismatch> {
        let mut mismatches = Vec::new();
        if let Some(controllers) = &recipe.controllers {
            for (name, &enabled) in controllers {
                if let Err(mismatch) = self.set_enabled(name, enabled) {
                    mismatches.push(mismatch);
                }
            }
        }
        if let Some(speed) = recipe.animation_speed {
            self.set_animation_speed(speed);
        }
        mismatches
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controllers: Option<BTreeMap<String, bool>>,
    #[serde(
        rename = "animation-speed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub animation_speed: Option<f32>,
}

/// Manual pose: channel values held until replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseRecipe {
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
}

// ============================================================================
// Actor Behavior
// ============================================================================

pub struct ActorBehavior {
    model: ActorModel,
    controllers: SmallVec<[Box<dyn PoseController>; 4]>,
    pose: ChannelInputs,
}

impl std::fmt::Debug for ActorBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorBehavior")
            .field("model", &self.model)
            .field(
                "controllers",
                &self.controllers.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("pose", &self.pose)
            .finish()
    }
}

impl ActorBehavior {
    /// Instantiates every controller the behavior model lists.
    ///
    /// Names the manager cannot build are logged and dropped from the model.
    #[must_use]
    pub fn load(manager: &ControllerManager, mut model: ActorModel) -> Self {
        let schema = Arc::clone(model.schema());
        let mut controllers: SmallVec<[Box<dyn PoseController>; 4]> = SmallVec::new();
        let mut missing = Vec::new();

        for name in model.behavior().controller_names() {
            match manager.instantiate(name, &schema) {
                Some(controller) => controllers.push(controller),
                None => {
                    log::warn!("No controller named '{name}' is registered");
                    missing.push(name.to_string());
                }
            }
        }
        for name in missing {
            model.behavior_mut().controllers.remove(&name);
        }

        log::debug!("Actor behavior loaded with {} controller(s)", controllers.len());
        Self {
            pose: ChannelInputs::new(schema),
            model,
            controllers,
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedBehavior {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn model(&self) -> &ActorModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ActorModel {
        &mut self.model
    }

    /// Produces the main figure's inputs for this frame.
    pub fn update(
        &mut self,
        shape_inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        let animation_dt = params.delta * self.model.behavior().animation_speed();
        self.model.animation_mut().tick(animation_dt);

        let mut inputs = shape_inputs.clone();
        if let Some(animated) = self.model.animation_mut().sample(shape_inputs.schema()) {
            inputs = inputs.merge(&animated, true);
        }

        for controller in &mut self.controllers {
            if !self.model.behavior().is_enabled(controller.name()) {
                continue;
            }
            let overlay = controller.update(&inputs, params, previous);
            inputs = inputs.merge(&overlay, true);
        }

        inputs
            .merge(&self.pose, true)
            .merge(&self.model.user_inputs(), true)
    }

    #[must_use]
    pub fn recipize_pose(&self) -> PoseRecipe {
        PoseRecipe {
            values: self.pose.to_value_map(),
        }
    }

    /// Replaces the manual pose; channels the main figure lacks are skipped.
    pub fn merge_pose(&mut self, recipe: &PoseRecipe) -> Vec<RecipeMismatch> {
        let schema = Arc::clone(self.model.schema());
        let mut mismatches = Vec::new();
        let mut pose = ChannelInputs::new(Arc::clone(&schema));

        for (name, &value) in &recipe.values {
            if schema.contains(name) {
                pose.set(name, value);
            } else {
                mismatches.push(RecipeMismatch::new(MismatchKind::Channel, name.as_str()));
            }
        }
        self.pose = pose;
        mismatches
    }

    pub fn set_pose_value(&mut self, name: &str, value: f64) -> Result<(), RecipeMismatch> {
        if !self.model.schema().contains(name) {
            return Err(RecipeMismatch::new(MismatchKind::Channel, name));
        }
        self.pose.set(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{AnimationTrack, ChannelCurve};
    use crate::model::AnimationModel;
    use crate::tracks::{InterpolationMode, KeyframeTrack};
    use figura_core::{ChannelDef, ChannelSchema};

    fn schema() -> Arc<ChannelSchema> {
        Arc::new(ChannelSchema::new(vec![
            ChannelDef::new("arm", 0.0),
            ChannelDef::new("breathe", 0.0),
            ChannelDef::new("smile", 0.0),
        ]))
    }

    fn behavior() -> ActorBehavior {
        let schema = schema();
        let track = AnimationTrack::new(
            "wave",
            vec![ChannelCurve {
                channel: "arm".into(),
                track: KeyframeTrack::new(vec![0.0, 1.0], vec![0.0, 1.0], InterpolationMode::Linear),
            }],
        );
        let mut animation = AnimationModel::new(vec![Arc::new(track)]);
        animation.set_active_name("wave").unwrap();
        let model = ActorModel::new(schema, animation, BehaviorModel::new(["breathing", "juggling"]));
        ActorBehavior::load(&ControllerManager::with_builtins(), model)
    }

    #[test]
    fn unknown_controllers_are_dropped_from_model() {
        let behavior = behavior();
        let names: Vec<_> = behavior.model().behavior().controller_names().collect();
        assert_eq!(names, vec!["breathing"]);
    }

    #[test]
    fn layers_merge_in_order() {
        let mut behavior = behavior();
        let shape = ChannelInputs::new(schema()).with("smile", 0.2).with("arm", 0.9);

        let params = FrameUpdateParameters::new(1, 2.0, 0.5);
        let out = behavior.update(&shape, &params, &[]);
        // animation overrides shape
        assert!((out.get("arm") - 0.5).abs() < 1e-9);
        assert!((out.get("smile") - 0.2).abs() < 1e-9);
        assert!(out.defines("breathe"));

        behavior.set_pose_value("smile", 0.6).unwrap();
        behavior
            .model_mut()
            .set_user_value("arm", 0.1)
            .unwrap();
        let out = behavior.update(&shape, &params.next(0.0), &[]);
        assert!((out.get("smile") - 0.6).abs() < 1e-9);
        assert!((out.get("arm") - 0.1).abs() < 1e-9);
    }

    #[test]
    fn disabled_controller_does_not_run() {
        let mut behavior = behavior();
        behavior.model_mut().behavior_mut().set_enabled("breathing", false).unwrap();
        let shape = ChannelInputs::new(schema());
        let out = behavior.update(&shape, &FrameUpdateParameters::new(1, 2.0, 0.0), &[]);
        assert!(!out.defines("breathe"));
    }

    #[test]
    fn pose_merge_skips_unknown_channels() {
        let mut behavior = behavior();
        let recipe = PoseRecipe {
            values: BTreeMap::from([("smile".to_string(), 1.0), ("tail".to_string(), 1.0)]),
        };
        let mismatches = behavior.merge_pose(&recipe);
        assert_eq!(mismatches, vec![RecipeMismatch::new(MismatchKind::Channel, "tail")]);
        assert_eq!(behavior.recipize_pose().values.len(), 1);
    }

    #[test]
    fn behavior_recipe_merge_is_partial() {
        let mut model = BehaviorModel::new(["breathing"]);
        model.set_animation_speed(2.0);

        let mismatches = model.merge(&BehaviorRecipe::default());
        assert!(mismatches.is_empty());
        assert!((model.animation_speed() - 2.0).abs() < 1e-6);

        let recipe = BehaviorRecipe {
            controllers: Some(BTreeMap::from([("breathing".to_string(), false)])),
            animation_speed: None,
        };
        model.merge(&recipe);
        assert!(!model.is_enabled("breathing"));
        assert!((model.animation_speed() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn behavior_recipe_serializes_with_kebab_keys() {
        let recipe = BehaviorRecipe {
            controllers: None,
            animation_speed: Some(1.5),
        };
        let json = serde_json::to_string(&recipe).unwrap();
        assert_eq!(json, r#"{"animation-speed":1.5}"#);
    }
}
