//! Playback backend boundary.
//!
//! The mixer never touches an audio device directly. It talks to two traits:
//!
//! - [`SoundBackend`]: fire-and-forget sound effects. Each play call returns a
//!   [`PlaybackHandle`]; failed or suppressed playback returns
//!   [`PlaybackHandle::INVALID`].
//! - [`MusicBackend`]: the single streamed-music device. Only one track is
//!   bound to it at a time (see [`crate::music::MusicChannel`]).
//!
//! [`NullBackend`] implements both traits as inert no-ops. It backs the null
//! sound instance and stands in when no output device is available.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use cadence_common::ClipId;

/// Handle to one playback started by a [`SoundBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle {
    id: u64,
    clip: ClipId,
}

impl PlaybackHandle {
    /// Sentinel returned when playback failed or was suppressed.
    pub const INVALID: Self = Self {
        id: u64::MAX,
        clip: ClipId::NULL,
    };

    /// Create a handle for a playback of `clip`.
    #[must_use]
    pub const fn new(id: u64, clip: ClipId) -> Self {
        Self { id, clip }
    }

    /// Get the raw ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the clip this playback belongs to.
    #[must_use]
    pub const fn clip(&self) -> ClipId {
        self.clip
    }

    /// Check if this handle refers to a real playback.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.id != u64::MAX
    }
}

impl Default for PlaybackHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Playback id generator for unique handles.
#[derive(Debug, Default)]
pub struct PlaybackIdGenerator {
    next_id: AtomicU64,
}

impl PlaybackIdGenerator {
    /// Create a new generator starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    /// Generate a new unique handle for `clip`.
    pub fn next(&self, clip: ClipId) -> PlaybackHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        PlaybackHandle::new(id, clip)
    }
}

/// Device that plays sound-effect clips.
///
/// All methods take `&self`; implementations use interior mutability. Calls
/// with an invalid or stale handle must be silently ignored.
pub trait SoundBackend: Send + Sync {
    /// Start a one-shot playback.
    fn play(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle;

    /// Start a looping playback.
    fn play_looping(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle;

    /// Pause a playback.
    fn pause(&self, handle: PlaybackHandle);

    /// Resume a paused playback.
    fn resume(&self, handle: PlaybackHandle);

    /// Stop a playback for good.
    fn stop(&self, handle: PlaybackHandle);

    /// Set the output volume of a playback.
    fn set_volume(&self, handle: PlaybackHandle, volume: f32);

    /// Set the pitch (playback rate) of a playback.
    fn set_pitch(&self, handle: PlaybackHandle, pitch: f32);

    /// Set stereo pan and volume together.
    fn set_pan(&self, handle: PlaybackHandle, pan: f32, volume: f32);

    /// Toggle looping of a playback.
    fn set_looping(&self, handle: PlaybackHandle, looping: bool);
}

/// Callback fired by a [`MusicBackend`] when the bound track reaches its end.
///
/// Looping tracks fire it at every loop boundary.
pub type CompletionCallback = Box<dyn Fn() + Send + Sync>;

/// The single music-playback device.
pub trait MusicBackend: Send + Sync {
    /// Bind `clip` as the current track, paused at its start.
    ///
    /// Returns `false` if the clip cannot be played.
    fn load(&self, clip: ClipId) -> bool;

    /// Start or resume the bound track.
    fn play(&self);

    /// Pause the bound track.
    fn pause(&self);

    /// Stop the bound track.
    fn stop(&self);

    /// Set the output volume.
    fn set_volume(&self, volume: f32);

    /// Set stereo pan and volume together.
    fn set_pan(&self, pan: f32, volume: f32);

    /// Toggle looping.
    fn set_looping(&self, looping: bool);

    /// Seek to `seconds` from the start of the track.
    fn set_position(&self, seconds: f32);

    /// Current playback position in seconds.
    fn position(&self) -> f32;

    /// Register (or clear) the completion callback.
    fn set_on_completion(&self, callback: Option<CompletionCallback>);

    /// Deliver pending device events such as completion.
    ///
    /// Called once per frame by the owner of the bound track.
    fn poll(&self) {}
}

/// Inert backend: every play returns [`PlaybackHandle::INVALID`] and every
/// other call does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl SoundBackend for NullBackend {
    fn play(&self, _clip: ClipId, _volume: f32, _pitch: f32, _pan: f32) -> PlaybackHandle {
        PlaybackHandle::INVALID
    }

    fn play_looping(&self, _clip: ClipId, _volume: f32, _pitch: f32, _pan: f32) -> PlaybackHandle {
        PlaybackHandle::INVALID
    }

    fn pause(&self, _handle: PlaybackHandle) {}

    fn resume(&self, _handle: PlaybackHandle) {}

    fn stop(&self, _handle: PlaybackHandle) {}

    fn set_volume(&self, _handle: PlaybackHandle, _volume: f32) {}

    fn set_pitch(&self, _handle: PlaybackHandle, _pitch: f32) {}

    fn set_pan(&self, _handle: PlaybackHandle, _pan: f32, _volume: f32) {}

    fn set_looping(&self, _handle: PlaybackHandle, _looping: bool) {}
}

impl MusicBackend for NullBackend {
    fn load(&self, _clip: ClipId) -> bool {
        false
    }

    fn play(&self) {}

    fn pause(&self) {}

    fn stop(&self) {}

    fn set_volume(&self, _volume: f32) {}

    fn set_pan(&self, _pan: f32, _volume: f32) {}

    fn set_looping(&self, _looping: bool) {}

    fn set_position(&self, _seconds: f32) {}

    fn position(&self) -> f32 {
        0.0
    }

    fn set_on_completion(&self, _callback: Option<CompletionCallback>) {}
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "playback#{}({})", self.id, self.clip)
        } else {
            f.write_str("playback#invalid")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        assert!(!PlaybackHandle::INVALID.is_valid());
        assert_eq!(PlaybackHandle::default(), PlaybackHandle::INVALID);
        assert_eq!(PlaybackHandle::INVALID.clip(), ClipId::NULL);
    }

    #[test]
    fn test_id_generator() {
        let gen = PlaybackIdGenerator::new();
        let clip = ClipId::from_raw(3);
        let h1 = gen.next(clip);
        let h2 = gen.next(clip);
        assert_ne!(h1.id(), h2.id());
        assert!(h1.is_valid());
        assert_eq!(h2.clip(), clip);
    }

    #[test]
    fn test_null_backend_never_plays() {
        let backend = NullBackend;
        let clip = ClipId::from_raw(1);
        assert!(!SoundBackend::play(&backend, clip, 1.0, 1.0, 0.0).is_valid());
        assert!(!backend.play_looping(clip, 1.0, 1.0, 0.0).is_valid());
        assert!(!backend.load(clip));
        assert!(MusicBackend::position(&backend).abs() < f32::EPSILON);
    }

    #[test]
    fn test_handle_display() {
        let handle = PlaybackHandle::new(9, ClipId::from_raw(2));
        assert_eq!(handle.to_string(), "playback#9(clip#2)");
        assert_eq!(PlaybackHandle::INVALID.to_string(), "playback#invalid");
    }
}
