use serde::{Deserialize, Serialize};

use crate::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
    /// Values are stored as `[in_tangent, value, out_tangent]` triples.
    CubicSpline,
}

/// How many keyframes a cursor scans around its last hit before falling back
/// to a binary search.
const MAX_SCAN_OFFSET: usize = 3;

/// Remembers the last keyframe segment a track was sampled at.
///
/// Playback advances monotonically most of the time, so the next sample is
/// almost always in the same or a neighbouring segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeTrack<T> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    #[serde(default)]
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Time of the last keyframe, `0.0` for an empty track.
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// A track is usable when it has keys and enough values for its mode.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let per_key = match self.interpolation {
            InterpolationMode::CubicSpline => 3,
            InterpolationMode::Linear | InterpolationMode::Step => 1,
        };
        !self.times.is_empty() && self.values.len() >= self.times.len() * per_key
    }

    /// Stateless sample; prefer [`sample_with_cursor`](Self::sample_with_cursor) in playback.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        let mut cursor = KeyframeCursor::default();
        self.sample_with_cursor(time, &mut cursor)
    }

    /// Samples at `time`, clamping outside the keyed range. Returns `None`
    /// for an invalid track.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        if !self.is_valid() {
            return None;
        }
        if self.times.len() == 1 {
            return Some(self.key_value(0));
        }

        let index = self.scan_from(cursor.last_index, time).unwrap_or_else(|| {
            self.times
                .partition_point(|&t| t <= time)
                .saturating_sub(1)
        });
        cursor.last_index = index;

        Some(self.sample_segment(index, time))
    }

    /// Local search around `hint` for the segment containing `time`.
    fn scan_from(&self, hint: usize, time: f32) -> Option<usize> {
        let last = self.times.len() - 1;
        let hint = hint.min(last);

        if time >= self.times[hint] {
            (hint..=(hint + MAX_SCAN_OFFSET).min(last))
                .find(|&idx| idx == last || time < self.times[idx + 1])
        } else {
            (hint.saturating_sub(MAX_SCAN_OFFSET)..hint)
                .rev()
                .find(|&idx| time >= self.times[idx])
        }
    }

    fn key_value(&self, index: usize) -> T {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.values[index * 3 + 1],
            InterpolationMode::Linear | InterpolationMode::Step => self.values[index],
        }
    }

    fn sample_segment(&self, index: usize, time: f32) -> T {
        let last = self.times.len() - 1;
        if index >= last {
            return self.key_value(last);
        }

        let t0 = self.times[index];
        let t1 = self.times[index + 1];
        let dt = t1 - t0;
        let t = if dt > 1e-6 { ((time - t0) / dt).clamp(0.0, 1.0) } else { 0.0 };

        match self.interpolation {
            InterpolationMode::Step => self.key_value(index),
            InterpolationMode::Linear => {
                T::interpolate_linear(self.key_value(index), self.key_value(index + 1), t)
            }
            InterpolationMode::CubicSpline => {
                let base0 = index * 3;
                let base1 = (index + 1) * 3;
                T::interpolate_cubic(
                    self.values[base0 + 1],
                    self.values[base0 + 2],
                    self.values[base1],
                    self.values[base1 + 1],
                    t,
                    dt,
                )
            }
        }
    }
}
