#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play to the end and pause there.
    Once,
    #[default]
    Loop,
    /// Alternate forward and backward.
    PingPong,
}

/// Playhead of the active animation track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlayback {
    pub time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,
}

impl Default for TrackPlayback {
    fn default() -> Self {
        Self {
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Loop,
            paused: false,
        }
    }
}

impl TrackPlayback {
    pub fn rewind(&mut self) {
        self.time = 0.0;
        self.paused = false;
    }

    /// Advances by `dt` seconds over a track of length `duration`.
    pub fn advance(&mut self, dt: f32, duration: f32) {
        if self.paused || duration <= 0.0 {
            return;
        }

        let step = dt * self.time_scale;
        let time = self.time + step;

        self.time = match self.loop_mode {
            LoopMode::Once => {
                if time >= duration || (time <= 0.0 && step < 0.0) {
                    self.paused = true;
                }
                time.clamp(0.0, duration)
            }
            LoopMode::Loop => time.rem_euclid(duration),
            LoopMode::PingPong => {
                let cycle = time.rem_euclid(duration * 2.0);
                if cycle > duration {
                    duration * 2.0 - cycle
                } else {
                    cycle
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn loop_wraps_forward_and_backward() {
        let mut playback = TrackPlayback::default();
        playback.advance(2.5, 2.0);
        assert!(approx(playback.time, 0.5));

        playback.time_scale = -1.0;
        playback.advance(1.0, 2.0);
        assert!(approx(playback.time, 1.5));
    }

    #[test]
    fn once_clamps_and_pauses() {
        let mut playback = TrackPlayback {
            loop_mode: LoopMode::Once,
            ..TrackPlayback::default()
        };
        playback.advance(5.0, 2.0);
        assert!(approx(playback.time, 2.0));
        assert!(playback.paused);

        playback.advance(1.0, 2.0);
        assert!(approx(playback.time, 2.0));
    }

    #[test]
    fn ping_pong_reflects_at_end() {
        let mut playback = TrackPlayback {
            loop_mode: LoopMode::PingPong,
            ..TrackPlayback::default()
        };
        playback.advance(2.5, 2.0);
        assert!(approx(playback.time, 1.5));
        playback.advance(2.0, 2.0);
        assert!(approx(playback.time, 0.5));
    }
}
