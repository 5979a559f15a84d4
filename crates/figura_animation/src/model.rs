use std::sync::Arc;

use figura_core::{ChannelInputs, ChannelSchema, MismatchKind, RecipeMismatch};

use crate::clip::AnimationTrack;
use crate::playback::TrackPlayback;
use crate::tracks::KeyframeCursor;

/// The actor's animation library and the playhead of its active track.
#[derive(Debug, Clone, Default)]
pub struct AnimationModel {
    tracks: Vec<Arc<AnimationTrack>>,
    active: Option<usize>,
    playback: TrackPlayback,
    cursors: Vec<KeyframeCursor>,
}

impl AnimationModel {
    #[must_use]
    pub fn new(tracks: Vec<Arc<AnimationTrack>>) -> Self {
        Self {
            tracks,
            ..Self::default()
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|track| track.name.as_str())
    }

    #[must_use]
    pub fn active_name(&self) -> Option<&str> {
        self.active_track().map(|track| track.name.as_str())
    }

    #[must_use]
    pub fn active_track(&self) -> Option<&Arc<AnimationTrack>> {
        self.active.and_then(|index| self.tracks.get(index))
    }

    /// Switches the active track by name and rewinds it.
    ///
    /// Re-selecting the active track keeps its playhead. An unknown name leaves
    /// the current selection untouched and is returned as a mismatch.
    pub fn set_active_name(&mut self, name: &str) -> Result<(), RecipeMismatch> {
        if self.active_name() == Some(name) {
            return Ok(());
        }
        let Some(index) = self.tracks.iter().position(|track| track.name == name) else {
            log::warn!("Animation '{name}' is not available; keeping current animation");
            return Err(RecipeMismatch::new(MismatchKind::Animation, name));
        };

        self.active = Some(index);
        self.cursors = vec![KeyframeCursor::default(); self.tracks[index].curves.len()];
        self.playback.rewind();
        log::debug!("Active animation set to '{name}'");
        Ok(())
    }

    #[must_use]
    pub fn playback(&self) -> &TrackPlayback {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut TrackPlayback {
        &mut self.playback
    }

    /// Advances the playhead of the active track.
    pub fn tick(&mut self, dt: f32) {
        if let Some(track) = self.active.and_then(|index| self.tracks.get(index)) {
            self.playback.advance(dt, track.duration());
        }
    }

    /// Channel values of the active track at the current playhead.
    pub fn sample(&mut self, schema: &Arc<ChannelSchema>) -> Option<ChannelInputs> {
        let track = self.active.and_then(|index| self.tracks.get(index))?;
        let mut out = ChannelInputs::new(Arc::clone(schema));
        track.sample_into(self.playback.time, &mut self.cursors, &mut out);
        Some(out)
    }
}
