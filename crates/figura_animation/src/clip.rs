use serde::{Deserialize, Serialize};

use figura_core::ChannelInputs;

use crate::tracks::{KeyframeCursor, KeyframeTrack};

/// Keyframes driving one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCurve {
    pub channel: String,
    #[serde(flatten)]
    pub track: KeyframeTrack<f64>,
}

/// A named animation: a set of channel curves played on one timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    pub name: String,
    #[serde(default)]
    pub curves: Vec<ChannelCurve>,
}

impl AnimationTrack {
    #[must_use]
    pub fn new(name: impl Into<String>, curves: Vec<ChannelCurve>) -> Self {
        Self {
            name: name.into(),
            curves,
        }
    }

    /// Length of the track: the latest keyframe over all curves.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.curves
            .iter()
            .map(|curve| curve.track.end_time())
            .fold(0.0_f32, f32::max)
    }

    /// Writes every curve's value at `time` into `out`.
    ///
    /// `cursors` must hold one entry per curve; curves without a cursor are
    /// sampled statelessly.
    pub fn sample_into(&self, time: f32, cursors: &mut [KeyframeCursor], out: &mut ChannelInputs) {
        for (index, curve) in self.curves.iter().enumerate() {
            let value = match cursors.get_mut(index) {
                Some(cursor) => curve.track.sample_with_cursor(time, cursor),
                None => curve.track.sample(time),
            };
            match value {
                Some(value) => out.set(&curve.channel, value),
                None => log::warn!(
                    "Animation '{}' has an invalid curve for channel '{}'",
                    self.name,
                    curve.channel
                ),
            }
        }
    }
}
