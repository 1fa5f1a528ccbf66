//! Numeric ranges and the global volume sliders.
//!
//! Out-of-range inputs are never errors: every setter clamps to these bounds.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Valid volume range.
pub const FULL_VOLUME_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Valid pitch range (playback-rate multiplier).
pub const FULL_PITCH_RANGE: RangeInclusive<f32> = 0.5..=2.0;

/// Valid stereo pan range (-1 = full left, 1 = full right).
pub const FULL_PAN_RANGE: RangeInclusive<f32> = -1.0..=1.0;

/// Default volume.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// Default pitch.
pub const DEFAULT_PITCH: f32 = 1.0;

/// Default pan (center).
pub const DEFAULT_PAN: f32 = 0.0;

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// Clamp a volume to [`FULL_VOLUME_RANGE`]. NaN maps to silence.
#[must_use]
pub fn clamp_volume(volume: f32) -> f32 {
    clamp_to(volume, &FULL_VOLUME_RANGE)
}

/// Clamp a pitch to [`FULL_PITCH_RANGE`]. NaN maps to the lowest pitch.
#[must_use]
pub fn clamp_pitch(pitch: f32) -> f32 {
    clamp_to(pitch, &FULL_PITCH_RANGE)
}

/// Clamp a pan to [`FULL_PAN_RANGE`]. NaN maps to full left.
#[must_use]
pub fn clamp_pan(pan: f32) -> f32 {
    clamp_to(pan, &FULL_PAN_RANGE)
}

/// Master, sound and music sliders plus their cached products.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SliderValues", into = "SliderValues")]
pub struct VolumeSliders {
    master: f32,
    sound: f32,
    music: f32,
    effective_sound: f32,
    effective_music: f32,
}

/// Serialized form of [`VolumeSliders`]; the cached products are derived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
struct SliderValues {
    master: f32,
    sound: f32,
    music: f32,
}

impl Default for SliderValues {
    fn default() -> Self {
        Self {
            master: DEFAULT_VOLUME,
            sound: DEFAULT_VOLUME,
            music: DEFAULT_VOLUME,
        }
    }
}

impl From<SliderValues> for VolumeSliders {
    fn from(values: SliderValues) -> Self {
        Self::new(values.master, values.sound, values.music)
    }
}

impl From<VolumeSliders> for SliderValues {
    fn from(sliders: VolumeSliders) -> Self {
        Self {
            master: sliders.master,
            sound: sliders.sound,
            music: sliders.music,
        }
    }
}

impl Default for VolumeSliders {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME, DEFAULT_VOLUME, DEFAULT_VOLUME)
    }
}

impl VolumeSliders {
    /// Create sliders from raw values (clamped).
    #[must_use]
    pub fn new(master: f32, sound: f32, music: f32) -> Self {
        let mut sliders = Self {
            master: clamp_volume(master),
            sound: clamp_volume(sound),
            music: clamp_volume(music),
            effective_sound: 0.0,
            effective_music: 0.0,
        };
        sliders.recompute();
        sliders
    }

    fn recompute(&mut self) {
        self.effective_sound = self.master * self.sound;
        self.effective_music = self.master * self.music;
    }

    /// Set the master slider.
    pub fn set_master(&mut self, volume: f32) {
        self.master = clamp_volume(volume);
        self.recompute();
    }

    /// Set the sound-effect slider.
    pub fn set_sound(&mut self, volume: f32) {
        self.sound = clamp_volume(volume);
        self.recompute();
    }

    /// Set the music slider.
    pub fn set_music(&mut self, volume: f32) {
        self.music = clamp_volume(volume);
        self.recompute();
    }

    /// Master slider.
    #[must_use]
    pub const fn master(&self) -> f32 {
        self.master
    }

    /// Sound-effect slider.
    #[must_use]
    pub const fn sound(&self) -> f32 {
        self.sound
    }

    /// Music slider.
    #[must_use]
    pub const fn music(&self) -> f32 {
        self.music
    }

    /// `master × sound`.
    #[must_use]
    pub const fn effective_sound(&self) -> f32 {
        self.effective_sound
    }

    /// `master × music`.
    #[must_use]
    pub const fn effective_music(&self) -> f32 {
        self.effective_music
    }
}
