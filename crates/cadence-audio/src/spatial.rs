//! 2D positional audio.
//!
//! Volume and pan of a positioned sound are derived from its distance to a
//! single listener point:
//!
//! - **Audibility**: beyond the hear range a sound is inaudible. The check uses
//!   squared distances so the common case needs no square root.
//! - **Attenuation**: linear, `1 - distance / hear_range`, floored at zero.
//! - **Pan**: horizontal offset divided by half the hear range, clamped to
//!   `[-1, 1]`.
//!
//! # Example
//!
//! ```
//! use cadence_audio::spatial::Hearing;
//! use glam::Vec2;
//!
//! let hearing = Hearing::new(Vec2::ZERO, 100.0);
//! let params = hearing.calculate(Vec2::new(50.0, 0.0));
//! assert!(params.audible);
//! assert!((params.volume - 0.5).abs() < 1e-6);
//! assert!((params.pan - 1.0).abs() < 1e-6);
//! ```

use glam::Vec2;

use crate::volume::clamp_pan;

/// Listener positions closer than this are considered equal.
pub const LISTENER_EPSILON: f32 = 0.000_001;

/// Calculated positional parameters for one sound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialParams {
    /// Distance from the listener.
    pub distance: f32,
    /// Positional volume factor (0.0-1.0).
    pub volume: f32,
    /// Pan position (-1.0 = full left, 0.0 = center, 1.0 = full right).
    pub pan: f32,
    /// Whether the sound is within hear range.
    pub audible: bool,
}

impl SpatialParams {
    /// Create non-audible params.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            distance: 0.0,
            volume: 0.0,
            pan: 0.0,
            audible: false,
        }
    }
}

/// Listener position plus hear range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hearing {
    listener: Vec2,
    range: f32,
}

impl Default for Hearing {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }
}

impl Hearing {
    /// Create a listener at `listener` hearing up to `range` (sign ignored).
    #[must_use]
    pub fn new(listener: Vec2, range: f32) -> Self {
        Self {
            listener,
            range: range.abs(),
        }
    }

    /// Listener position.
    #[must_use]
    pub const fn listener(&self) -> Vec2 {
        self.listener
    }

    /// Hear range, always non-negative.
    #[must_use]
    pub const fn range(&self) -> f32 {
        self.range
    }

    /// Move the listener. Returns `true` if it moved by more than
    /// [`LISTENER_EPSILON`] on either axis.
    pub fn set_listener(&mut self, position: Vec2) -> bool {
        if self.listener.abs_diff_eq(position, LISTENER_EPSILON) {
            return false;
        }
        self.listener = position;
        true
    }

    /// Change the hear range (sign ignored). Returns `true` if it changed.
    pub fn set_range(&mut self, range: f32) -> bool {
        let range = range.abs();
        if self.range.to_bits() == range.to_bits() {
            return false;
        }
        self.range = range;
        true
    }

    /// Whether `position` is within hear range.
    #[must_use]
    pub fn in_range(&self, position: Vec2) -> bool {
        self.listener.distance_squared(position) <= self.range * self.range
    }

    /// Calculate positional parameters for a sound at `position`.
    #[must_use]
    pub fn calculate(&self, position: Vec2) -> SpatialParams {
        let distance_squared = self.listener.distance_squared(position);
        if distance_squared > self.range * self.range {
            return SpatialParams {
                distance: distance_squared.sqrt(),
                ..SpatialParams::silent()
            };
        }

        let distance = distance_squared.sqrt();

        // A zero range only hears sounds exactly at the listener.
        if self.range <= 0.0 {
            return SpatialParams {
                distance,
                volume: 1.0,
                pan: 0.0,
                audible: true,
            };
        }

        SpatialParams {
            distance,
            volume: (1.0 - distance / self.range).max(0.0),
            pan: clamp_pan((position.x - self.listener.x) / (self.range / 2.0)),
            audible: true,
        }
    }
}
