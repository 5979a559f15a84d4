use std::collections::BTreeMap;
use std::sync::Arc;

use figura_core::{ChannelInputs, ChannelSchema, MismatchKind, RecipeMismatch};

use crate::behavior::BehaviorModel;
use crate::model::AnimationModel;

/// Actor-level state that does not belong to any single figure.
#[derive(Debug, Clone)]
pub struct ActorModel {
    schema: Arc<ChannelSchema>,
    animation: AnimationModel,
    behavior: BehaviorModel,
    user_values: BTreeMap<String, f64>,
}

impl ActorModel {
    /// `schema` is the main figure's channel schema; user values are validated
    /// against it.
    #[must_use]
    pub fn new(schema: Arc<ChannelSchema>, animation: AnimationModel, behavior: BehaviorModel) -> Self {
        Self {
            schema,
            animation,
            behavior,
            user_values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<ChannelSchema> {
        &self.schema
    }

    #[must_use]
    pub fn animation(&self) -> &AnimationModel {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut AnimationModel {
        &mut self.animation
    }

    #[must_use]
    pub fn behavior(&self) -> &BehaviorModel {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut BehaviorModel {
        &mut self.behavior
    }

    /// Channel values the user pinned, applied over everything else each frame.
    #[must_use]
    pub fn user_values(&self) -> &BTreeMap<String, f64> {
        &self.user_values
    }

    /// Replaces all user values. Names the main figure does not have are
    /// skipped and returned as mismatches.
    pub fn set_user_values(&mut self, values: &BTreeMap<String, f64>) -> Vec<RecipeMismatch> {
        let mut mismatches = Vec::new();
        self.user_values = values
            .iter()
            .filter(|(name, _)| {
                let known = self.schema.contains(name);
                if !known {
                    mismatches.push(RecipeMismatch::new(MismatchKind::Channel, name.as_str()));
                }
                known
            })
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        mismatches
    }

    pub fn set_user_value(&mut self, name: &str, value: f64) -> Result<(), RecipeMismatch> {
        if !self.schema.contains(name) {
            return Err(RecipeMismatch::new(MismatchKind::Channel, name));
        }
        self.user_values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn clear_user_value(&mut self, name: &str) -> Option<f64> {
        self.user_values.remove(name)
    }

    #[must_use]
    pub fn user_inputs(&self) -> ChannelInputs {
        ChannelInputs::from_values(
            Arc::clone(&self.schema),
            self.user_values.iter().map(|(name, value)| (name, *value)),
        )
    }
}
