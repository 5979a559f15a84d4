use figura_core::{ChannelInputs, ControlVertexInfo, FrameUpdateParameters};

use crate::behavior::SharedBehavior;

/// Produces one figure's channel inputs for a frame.
///
/// Called exactly once per figure per frame, root figure first. `previous`
/// holds the feedback of the last completed frame: the whole group (root at
/// index 0) for the root's animator, only the figure's own entry otherwise.
pub trait FigureAnimator: Send {
    fn frame_inputs(
        &mut self,
        shape_inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs;
}

/// Animator installed on every freshly loaded figure: the shape inputs unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughAnimator;

impl FigureAnimator for PassThroughAnimator {
    fn frame_inputs(
        &mut self,
        shape_inputs: &ChannelInputs,
        _params: &FrameUpdateParameters,
        _previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        shape_inputs.clone()
    }
}

/// The main figure's animator: delegates to the actor's behavior.
#[derive(Debug, Clone)]
pub struct BehaviorAnimator {
    behavior: SharedBehavior,
}

impl BehaviorAnimator {
    #[must_use]
    pub fn new(behavior: SharedBehavior) -> Self {
        Self { behavior }
    }

    #[must_use]
    pub fn behavior(&self) -> &SharedBehavior {
        &self.behavior
    }
}

impl FigureAnimator for BehaviorAnimator {
    fn frame_inputs(
        &mut self,
        shape_inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        self.behavior.lock().update(shape_inputs, params, previous)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::actor_model::ActorModel;
    use crate::behavior::{ActorBehavior, BehaviorModel};
    use crate::controller::ControllerManager;
    use crate::model::AnimationModel;
    use figura_core::{ChannelDef, ChannelSchema};

    #[test]
    fn pass_through_returns_shape_inputs() {
        let schema = Arc::new(ChannelSchema::new(vec![ChannelDef::new("smile", 0.0)]));
        let shape = ChannelInputs::new(schema).with("smile", 0.4);
        let out = PassThroughAnimator.frame_inputs(&shape, &FrameUpdateParameters::default(), &[]);
        assert_eq!(out, shape);
    }

    #[test]
    fn behavior_animator_sees_shared_state() {
        let schema = Arc::new(ChannelSchema::new(vec![ChannelDef::new("smile", 0.0)]));
        let model = ActorModel::new(
            Arc::clone(&schema),
            AnimationModel::default(),
            BehaviorModel::default(),
        );
        let shared = ActorBehavior::load(&ControllerManager::new(), model).into_shared();
        let mut animator = BehaviorAnimator::new(Arc::clone(&shared));

        shared.lock().model_mut().set_user_value("smile", 0.9).unwrap();
        let out = animator.frame_inputs(
            &ChannelInputs::new(schema),
            &FrameUpdateParameters::default(),
            &[],
        );
        assert!((out.get("smile") - 0.9).abs() < 1e-9);
    }
}
