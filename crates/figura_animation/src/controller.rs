//! Procedural pose controllers and the manager that instantiates them.
//!
//! A controller turns the channel state built so far in a frame (plus the
//! previous frame's feedback) into an overlay of channel values. Controllers
//! are created by name from factories registered on a [`ControllerManager`].

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use figura_core::{
    ChannelInputs, ChannelSchema, ControlVertexInfo, FrameUpdateParameters, TopologyId,
};

pub trait PoseController: Send {
    fn name(&self) -> &str;

    /// Channel overlay for this frame. `previous` is the group's feedback with
    /// the root figure first.
    fn update(
        &mut self,
        inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs;
}

pub type ControllerFactory =
    Box<dyn Fn(&Arc<ChannelSchema>) -> Box<dyn PoseController> + Send + Sync>;

/// Registry of named controller factories.
#[derive(Default)]
pub struct ControllerManager {
    factories: BTreeMap<String, ControllerFactory>,
}

impl fmt::Debug for ControllerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerManager")
            .field("controllers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ControllerManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager pre-populated with [`BreathingController`] and [`MotionFollowController`].
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut manager = Self::new();
        manager.register(BreathingController::NAME, |schema| {
            Box::new(BreathingController::new(Arc::clone(schema)))
        });
        manager.register(MotionFollowController::NAME, |schema| {
            Box::new(MotionFollowController::new(Arc::clone(schema)))
        });
        manager
    }

    /// Registers (or replaces) the factory for `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Arc<ChannelSchema>) -> Box<dyn PoseController> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(name.to_string(), Box::new(factory))
            .is_some()
        {
            log::debug!("Controller factory '{name}' replaced");
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn instantiate(
        &self,
        name: &str,
        schema: &Arc<ChannelSchema>,
    ) -> Option<Box<dyn PoseController>> {
        self.factories.get(name).map(|factory| factory(schema))
    }
}

// ============================================================================
// Breathing
// ============================================================================

/// Drives a chest channel with a slow raised-cosine cycle.
pub struct BreathingController {
    schema: Arc<ChannelSchema>,
    pub channel: String,
    pub rate_hz: f64,
    pub amplitude: f64,
}

impl BreathingController {
    pub const NAME: &'static str = "breathing";
    pub const CHANNEL: &'static str = "breathe";

    #[must_use]
    pub fn new(schema: Arc<ChannelSchema>) -> Self {
        Self {
            schema,
            channel: Self::CHANNEL.to_string(),
            rate_hz: 0.25,
            amplitude: 1.0,
        }
    }

    /// Cycle value in `[0, amplitude]` at `time` seconds.
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        self.amplitude * 0.5 * (1.0 - (TAU * self.rate_hz * time).cos())
    }
}

impl PoseController for BreathingController {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(
        &mut self,
        _inputs: &ChannelInputs,
        params: &FrameUpdateParameters,
        _previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        let mut overlay = ChannelInputs::new(Arc::clone(&self.schema));
        if self.schema.contains(&self.channel) {
            overlay.set(&self.channel, self.value_at(params.time));
        }
        overlay
    }
}

// ============================================================================
// Motion Follow
// ============================================================================

struct FollowSample {
    topology: TopologyId,
    frame: u64,
    position: Vec3,
}

/// Secondary motion driven by the root figure's own deformation.
///
/// Tracks one control vertex of the root across frames and eases a channel
/// towards `gain * speed`. History is discarded when the observed topology
/// changes, so indices from another figure layout are never compared.
pub struct MotionFollowController {
    schema: Arc<ChannelSchema>,
    pub channel: String,
    pub vertex: usize,
    pub gain: f64,
    /// Fraction of the previous value kept each frame, in `[0, 1)`.
    pub damping: f64,
    last: Option<FollowSample>,
    value: f64,
}

impl MotionFollowController {
    pub const NAME: &'static str = "motion-follow";
    pub const CHANNEL: &'static str = "follow-sway";

    #[must_use]
    pub fn new(schema: Arc<ChannelSchema>) -> Self {
        Self {
            schema,
            channel: Self::CHANNEL.to_string(),
            vertex: 0,
            gain: 0.5,
            damping: 0.8,
            last: None,
            value: 0.0,
        }
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    fn observe(&mut self, root: &ControlVertexInfo) -> Option<f64> {
        let frame = root.frame()?;
        let position = root.position(self.vertex)?;

        let speed = match &self.last {
            Some(last) if last.topology != root.topology() => {
                log::debug!("Motion follow history reset: root topology changed");
                None
            }
            // Same feedback seen twice (postwork skipped): no new motion information
            Some(last) if last.frame == frame => return None,
            Some(last) => {
                let elapsed = frame.saturating_sub(last.frame).max(1) as f64;
                Some(f64::from(position.distance(last.position)) / elapsed)
            }
            None => None,
        };

        self.last = Some(FollowSample {
            topology: root.topology(),
            frame,
            position,
        });
        speed
    }
}

impl PoseController for MotionFollowController {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(
        &mut self,
        _inputs: &ChannelInputs,
        _params: &FrameUpdateParameters,
        previous: &[ControlVertexInfo],
    ) -> ChannelInputs {
        let target = previous
            .first()
            .and_then(|root| self.observe(root))
            .map(|speed| (self.gain * speed).clamp(0.0, 1.0));

        if let Some(target) = target {
            self.value = self.value * self.damping + target * (1.0 - self.damping);
        }

        let mut overlay = ChannelInputs::new(Arc::clone(&self.schema));
        if self.schema.contains(&self.channel) {
            overlay.set(&self.channel, self.value);
        }
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_core::{ChannelDef, ControlVertex};

    fn schema() -> Arc<ChannelSchema> {
        Arc::new(ChannelSchema::new(vec![
            ChannelDef::new(BreathingController::CHANNEL, 0.0),
            ChannelDef::new(MotionFollowController::CHANNEL, 0.0),
        ]))
    }

    fn root_at(topology: TopologyId, frame: u64, x: f32) -> ControlVertexInfo {
        let vertices = vec![ControlVertex::new(Vec3::new(x, 0.0, 0.0), Vec3::Y)];
        ControlVertexInfo::new(Arc::from("body"), topology, frame, Arc::from(vertices))
    }

    #[test]
    fn builtins_are_registered() {
        let manager = ControllerManager::with_builtins();
        let names: Vec<_> = manager.names().collect();
        assert_eq!(names, vec!["breathing", "motion-follow"]);
        assert!(manager.instantiate("breathing", &schema()).is_some());
        assert!(manager.instantiate("juggling", &schema()).is_none());
    }

    #[test]
    fn breathing_cycles_between_zero_and_amplitude() {
        let controller = BreathingController::new(schema());
        assert!(controller.value_at(0.0).abs() < 1e-9);
        assert!((controller.value_at(2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn breathing_skips_figures_without_the_channel() {
        let mut controller = BreathingController::new(ChannelSchema::empty());
        let inputs = ChannelInputs::new(ChannelSchema::empty());
        let overlay = controller.update(&inputs, &FrameUpdateParameters::new(0, 2.0, 0.0), &[]);
        assert!(overlay.is_empty());
    }

    #[test]
    fn motion_follow_reacts_to_root_movement() {
        let schema = schema();
        let mut controller = MotionFollowController::new(Arc::clone(&schema));
        let inputs = ChannelInputs::new(schema);
        let params = FrameUpdateParameters::default();
        let topology = TopologyId(7);

        controller.update(&inputs, &params, &[root_at(topology, 1, 0.0)]);
        assert!(controller.value().abs() < 1e-9);

        let overlay = controller.update(&inputs, &params, &[root_at(topology, 2, 1.0)]);
        assert!(controller.value() > 0.0);
        assert!((overlay.get(MotionFollowController::CHANNEL) - controller.value()).abs() < 1e-12);
    }

    #[test]
    fn motion_follow_ignores_repeated_feedback() {
        let schema = schema();
        let mut controller = MotionFollowController::new(Arc::clone(&schema));
        let inputs = ChannelInputs::new(schema);
        let params = FrameUpdateParameters::default();
        let topology = TopologyId(7);

        controller.update(&inputs, &params, &[root_at(topology, 1, 0.0)]);
        controller.update(&inputs, &params, &[root_at(topology, 2, 1.0)]);
        let after_move = controller.value();
        controller.update(&inputs, &params, &[root_at(topology, 2, 1.0)]);
        assert!((controller.value() - after_move).abs() < 1e-12);
    }

    #[test]
    fn motion_follow_resets_on_topology_change() {
        let schema = schema();
        let mut controller = MotionFollowController::new(Arc::clone(&schema));
        let inputs = ChannelInputs::new(schema);
        let params = FrameUpdateParameters::default();

        controller.update(&inputs, &params, &[root_at(TopologyId(1), 1, 0.0)]);
        // A far-away vertex from another topology must not register as motion
        controller.update(&inputs, &params, &[root_at(TopologyId(2), 2, 100.0)]);
        assert!(controller.value().abs() < 1e-9);
    }
}
