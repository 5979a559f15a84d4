use glam::Vec3;

/// Timing and viewer state for one frame, passed unchanged to every figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdateParameters {
    /// Monotonic frame index, used to stamp published feedback.
    pub frame: u64,
    /// Seconds since the frame driver started.
    pub time: f64,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Viewer head position in world space (gaze and look-at controllers).
    pub head_position: Vec3,
}

impl FrameUpdateParameters {
    #[must_use]
    pub fn new(frame: u64, time: f64, delta: f32) -> Self {
        Self {
            frame,
            time,
            delta,
            head_position: Vec3::ZERO,
        }
    }

    /// Parameters for the frame following this one.
    #[must_use]
    pub fn next(&self, delta: f32) -> Self {
        Self {
            frame: self.frame + 1,
            time: self.time + f64::from(delta),
            delta,
            head_position: self.head_position,
        }
    }
}

impl Default for FrameUpdateParameters {
    fn default() -> Self {
        Self::new(0, 0.0, 0.0)
    }
}
