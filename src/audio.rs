//! Audio cues
//!
//! The course only says *which* cue to play. [`AudioPlayer`] resolves cues to
//! clips (bounce clips rotate round-robin) and hands them to whatever backend
//! the host wires in; without one it keeps a short history of what would
//! have played plus a count per cue.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Clips kept in the playback history
pub const CLIP_HISTORY: usize = 32;

/// Cue types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    /// Player bounced on a safe platform
    Bounce,
    /// Player hit a hazard
    GameOver,
    /// Player reached the finish
    Finish,
    /// Player dropped through a gap
    Score,
}

impl AudioCue {
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            AudioCue::Bounce => 0,
            AudioCue::GameOver => 1,
            AudioCue::Finish => 2,
            AudioCue::Score => 3,
        }
    }
}

/// Anything that can play a cue
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// A resolved clip: the cue plus which variant of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub cue: AudioCue,
    pub variant: usize,
    pub volume_percent: u8,
}

/// Cue player with round-robin bounce clips and volume control
#[derive(Debug, Clone)]
pub struct AudioPlayer {
    bounce_clips: usize,
    bounce_index: usize,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    history: VecDeque<Clip>,
    counts: [u64; AudioCue::COUNT],
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl AudioPlayer {
    pub fn new(bounce_clips: usize) -> Self {
        Self {
            bounce_clips,
            bounce_index: 0,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            history: VecDeque::with_capacity(CLIP_HISTORY),
            counts: [0; AudioCue::COUNT],
        }
    }

    /// Player configured from the tuning's clip count and volumes
    pub fn from_tuning(tuning: &Tuning) -> Self {
        let mut player = Self::new(tuning.bounce_clips);
        player.set_master_volume(tuning.master_volume);
        player.set_sfx_volume(tuning.sfx_volume);
        player
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set sound effects volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Most recent clips, oldest first
    pub fn history(&self) -> &VecDeque<Clip> {
        &self.history
    }

    /// Clips actually played for a cue since creation
    pub fn count(&self, cue: AudioCue) -> u64 {
        self.counts[cue.index()]
    }

    /// Clips actually played for every cue
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn resolve(&mut self, cue: AudioCue) -> Option<usize> {
        match cue {
            AudioCue::Bounce => {
                if self.bounce_clips == 0 {
                    return None;
                }
                if self.bounce_index >= self.bounce_clips {
                    self.bounce_index = 0;
                }
                let variant = self.bounce_index;
                self.bounce_index += 1;
                Some(variant)
            }
            AudioCue::GameOver | AudioCue::Finish | AudioCue::Score => Some(0),
        }
    }
}

impl AudioSink for AudioPlayer {
    fn play(&mut self, cue: AudioCue) {
        let Some(variant) = self.resolve(cue) else {
            return;
        };
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        log::trace!("Cue {:?} (clip {}) at {:.2}", cue, variant, vol);
        if self.history.len() == CLIP_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(Clip {
            cue,
            variant,
            volume_percent: (vol * 100.0).round() as u8,
        });
        self.counts[cue.index()] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounce_clips_rotate() {
        let mut player = AudioPlayer::new(2);
        for _ in 0..3 {
            player.play(AudioCue::Bounce);
        }
        player.play(AudioCue::Score);
        let variants: Vec<(AudioCue, usize)> = player.history().iter().map(|c| (c.cue, c.variant)).collect();
        assert_eq!(
            variants,
            vec![
                (AudioCue::Bounce, 0),
                (AudioCue::Bounce, 1),
                (AudioCue::Bounce, 0),
                (AudioCue::Score, 0),
            ]
        );
        assert_eq!(player.history()[0].volume_percent, 80);
        assert_eq!(player.count(AudioCue::Bounce), 3);
    }

    #[test]
    fn test_no_bounce_clips_and_mute() {
        let mut player = AudioPlayer::new(0);
        player.play(AudioCue::Bounce);
        assert!(player.history().is_empty());

        player.set_muted(true);
        player.play(AudioCue::Finish);
        assert!(player.history().is_empty());
        assert_eq!(player.total(), 0);
    }

    #[test]
    fn test_history_is_capped() {
        let mut player = AudioPlayer::default();
        for _ in 0..CLIP_HISTORY * 10 {
            player.play(AudioCue::Score);
        }
        player.play(AudioCue::Finish);
        assert_eq!(player.history().len(), CLIP_HISTORY);
        assert_eq!(player.history().back().map(|c| c.cue), Some(AudioCue::Finish));
        assert_eq!(player.count(AudioCue::Score), (CLIP_HISTORY * 10) as u64);
        assert_eq!(player.total(), (CLIP_HISTORY * 10 + 1) as u64);
    }

    #[test]
    fn test_volumes_from_tuning() {
        let tuning = Tuning {
            master_volume: 0.5,
            sfx_volume: 1.5,
            bounce_clips: 1,
            ..Default::default()
        };
        let mut player = AudioPlayer::from_tuning(&tuning);
        player.play(AudioCue::Bounce);
        player.play(AudioCue::Bounce);
        let clips: Vec<(usize, u8)> = player.history().iter().map(|c| (c.variant, c.volume_percent)).collect();
        assert_eq!(clips, vec![(0, 50), (0, 50)]);

        let mut silent = AudioPlayer::from_tuning(&Tuning {
            master_volume: 0.0,
            ..Default::default()
        });
        silent.play(AudioCue::Score);
        assert_eq!(silent.total(), 0);
    }
}
