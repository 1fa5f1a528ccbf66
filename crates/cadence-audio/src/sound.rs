//! Sound-effect instances.
//!
//! One-shot sounds get no completion event from the device, so every
//! [`SoundInstance`] tracks its own progress against an injected [`Clock`]:
//!
//! ```text
//!   play ──► active ◄──► paused
//!              │            │
//!              └─► finished ◄┘   (timer ran out, stop(), or failed play)
//! ```
//!
//! While paused the instance's clock is frozen: resuming shifts the start time
//! forward by exactly the paused span. Once finished, every mutator is a no-op.

use std::fmt;
use std::sync::Arc;

use cadence_common::{ClipId, Clock};
use glam::Vec2;
use parking_lot::{Mutex, MutexGuard};

use crate::backend::{NullBackend, PlaybackHandle, SoundBackend};
use crate::backref::BackReferenced;
use crate::volume::{
    clamp_pan, clamp_pitch, clamp_volume, DEFAULT_PAN, DEFAULT_PITCH, DEFAULT_VOLUME,
};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Per-play parameters for a sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundParams {
    /// Volume relative to the sound slider (0.0-1.0).
    pub volume: f32,
    /// Playback-rate multiplier (0.5-2.0).
    pub pitch: f32,
    /// Stereo pan (-1.0-1.0). Ignored for positional sounds.
    pub pan: f32,
    /// Whether the sound loops until stopped.
    pub looping: bool,
}

impl Default for SoundParams {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundParams {
    /// Full volume, normal pitch, centered, one-shot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            pan: DEFAULT_PAN,
            looping: false,
        }
    }

    /// Set the relative volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the pitch.
    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    /// Set the pan.
    #[must_use]
    pub const fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    /// Set looping.
    #[must_use]
    pub const fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Copy with every value clamped to its valid range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            volume: clamp_volume(self.volume),
            pitch: clamp_pitch(self.pitch),
            pan: clamp_pan(self.pan),
            looping: self.looping,
        }
    }
}

/// One in-flight playback of a sound clip.
pub struct SoundInstance {
    clip: ClipId,
    handle: PlaybackHandle,
    backend: Arc<dyn SoundBackend>,
    clock: Arc<dyn Clock>,

    duration: f32,
    duration_nanos: i64,

    relative_volume: f32,
    master_volume: f32,
    positional_volume: f32,
    raw_volume: f32,
    pitch: f32,
    pan: f32,
    looping: bool,

    start_nanos: i64,
    pause_nanos: i64,
    paused: bool,
    finished: bool,

    position: Option<Vec2>,
    moved: bool,
    positional_index: Option<usize>,
}

impl fmt::Debug for SoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundInstance")
            .field("clip", &self.clip)
            .field("handle", &self.handle)
            .field("duration", &self.duration)
            .field("relative_volume", &self.relative_volume)
            .field("master_volume", &self.master_volume)
            .field("positional_volume", &self.positional_volume)
            .field("raw_volume", &self.raw_volume)
            .field("pitch", &self.pitch)
            .field("pan", &self.pan)
            .field("looping", &self.looping)
            .field("start_nanos", &self.start_nanos)
            .field("pause_nanos", &self.pause_nanos)
            .field("paused", &self.paused)
            .field("finished", &self.finished)
            .field("position", &self.position)
            .field("moved", &self.moved)
            .field("positional_index", &self.positional_index)
            .finish_non_exhaustive()
    }
}

impl SoundInstance {
    /// Wrap a playback that the backend has just started.
    ///
    /// `params` are clamped. If `handle` is invalid or `clip` is the null clip
    /// the instance is born finished.
    #[must_use]
    pub fn new(
        backend: Arc<dyn SoundBackend>,
        clock: Arc<dyn Clock>,
        clip: ClipId,
        handle: PlaybackHandle,
        params: SoundParams,
        master_volume: f32,
        duration: f32,
    ) -> Self {
        let params = params.clamped();
        let master_volume = clamp_volume(master_volume);
        let duration = duration.max(0.0);
        let start_nanos = now(clock.as_ref());

        Self {
            clip,
            handle,
            backend,
            clock,
            duration,
            duration_nanos: (f64::from(duration) * NANOS_PER_SEC) as i64,
            relative_volume: params.volume,
            master_volume,
            positional_volume: 1.0,
            raw_volume: params.volume * master_volume,
            pitch: params.pitch,
            pan: params.pan,
            looping: params.looping,
            start_nanos,
            pause_nanos: start_nanos,
            paused: false,
            finished: !handle.is_valid() || !clip.is_valid(),
            position: None,
            moved: false,
            positional_index: None,
        }
    }

    /// The inert instance returned for suppressed plays.
    #[must_use]
    pub fn null(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(NullBackend),
            clock,
            ClipId::NULL,
            PlaybackHandle::INVALID,
            SoundParams::new().with_volume(0.0),
            0.0,
            0.0,
        )
    }

    fn pitched_duration_nanos(&self) -> i64 {
        (self.duration_nanos as f64 / f64::from(self.pitch)) as i64
    }

    fn recompute_volume(&mut self) {
        self.raw_volume = self.relative_volume * self.master_volume * self.positional_volume;
    }

    /// Time the clock should be read at: frozen while paused.
    fn reference_nanos(&self) -> i64 {
        if self.paused {
            self.pause_nanos
        } else {
            now(self.clock.as_ref())
        }
    }

    /// Advance the timer. Marks a one-shot finished once its pitched duration
    /// has elapsed; a looping sound moves its start time forward one period.
    pub fn update(&mut self) {
        if self.paused || self.finished {
            return;
        }

        let pitched = self.pitched_duration_nanos();
        let elapsed = now(self.clock.as_ref()) - self.start_nanos;
        if elapsed >= pitched {
            if self.looping {
                self.start_nanos += pitched;
            } else {
                self.finished = true;
            }
        }
    }

    /// Pause playback and freeze the timer.
    pub fn pause(&mut self) {
        if self.paused || self.finished {
            return;
        }
        self.paused = true;
        self.pause_nanos = now(self.clock.as_ref());
        self.backend.pause(self.handle);
    }

    /// Resume playback, discounting the time spent paused.
    pub fn resume(&mut self) {
        if !self.paused || self.finished {
            return;
        }
        self.start_nanos += now(self.clock.as_ref()) - self.pause_nanos;
        self.paused = false;
        self.backend.resume(self.handle);
    }

    /// Stop playback for good. Idempotent.
    pub fn stop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.backend.stop(self.handle);
    }

    /// Change pitch while keeping the same fraction of the clip played.
    pub fn set_pitch(&mut self, pitch: f32) {
        if self.finished {
            return;
        }

        let reference = self.reference_nanos();
        let old_pitched = self.pitched_duration_nanos();
        let progress = if old_pitched > 0 {
            (reference - self.start_nanos) as f64 / old_pitched as f64
        } else {
            0.0
        };

        self.pitch = clamp_pitch(pitch);
        self.backend.set_pitch(self.handle, self.pitch);

        let new_pitched = self.pitched_duration_nanos();
        self.start_nanos = reference - (progress * new_pitched as f64) as i64;
    }

    /// Set the volume relative to the sound slider.
    pub fn set_relative_volume(&mut self, volume: f32) {
        if self.finished {
            return;
        }
        self.relative_volume = clamp_volume(volume);
        self.recompute_volume();
        self.backend.set_volume(self.handle, self.raw_volume);
    }

    /// Set the effective sound-slider volume.
    pub fn set_master_volume(&mut self, volume: f32) {
        if self.finished {
            return;
        }
        self.master_volume = clamp_volume(volume);
        self.recompute_volume();
        self.backend.set_volume(self.handle, self.raw_volume);
    }

    /// Set the distance attenuation factor.
    pub fn set_positional_volume(&mut self, volume: f32) {
        if self.finished {
            return;
        }
        self.positional_volume = clamp_volume(volume);
        self.recompute_volume();
        self.backend.set_volume(self.handle, self.raw_volume);
    }

    /// Set the distance attenuation factor and pan together.
    pub fn set_positional_volume_and_pan(&mut self, volume: f32, pan: f32) {
        if self.finished {
            return;
        }
        self.positional_volume = clamp_volume(volume);
        self.pan = clamp_pan(pan);
        self.recompute_volume();
        self.backend.set_pan(self.handle, self.pan, self.raw_volume);
    }

    /// Set the stereo pan.
    pub fn set_pan(&mut self, pan: f32) {
        if self.finished {
            return;
        }
        self.pan = clamp_pan(pan);
        self.backend.set_pan(self.handle, self.pan, self.raw_volume);
    }

    /// Toggle looping.
    pub fn set_looping(&mut self, looping: bool) {
        if self.finished {
            return;
        }
        self.looping = looping;
        self.backend.set_looping(self.handle, looping);
    }

    /// Move the sound in world space.
    ///
    /// The first call only records the position. Later calls flag the
    /// instance as moved when the position actually changes; the mixer
    /// re-derives volume and pan for moved instances on its next update.
    pub fn set_position(&mut self, position: Vec2) {
        if self.finished {
            return;
        }
        match self.position {
            None => self.position = Some(position),
            Some(old) => {
                if old.x.to_bits() != position.x.to_bits() || old.y.to_bits() != position.y.to_bits()
                {
                    self.position = Some(position);
                    self.moved = true;
                }
            },
        }
    }

    /// Whether the position changed since positional parameters were last
    /// derived.
    #[must_use]
    pub const fn is_moved(&self) -> bool {
        self.moved
    }

    pub(crate) fn clear_moved(&mut self) {
        self.moved = false;
    }

    /// Clip being played.
    #[must_use]
    pub const fn clip(&self) -> ClipId {
        self.clip
    }

    /// Whether this is the null instance.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        !self.clip.is_valid()
    }

    /// Clip duration in seconds at normal pitch.
    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Volume relative to the sound slider.
    #[must_use]
    pub const fn relative_volume(&self) -> f32 {
        self.relative_volume
    }

    /// Effective sound-slider volume.
    #[must_use]
    pub const fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Distance attenuation factor (1.0 for non-positional sounds).
    #[must_use]
    pub const fn positional_volume(&self) -> f32 {
        self.positional_volume
    }

    /// Volume sent to the backend.
    #[must_use]
    pub const fn raw_volume(&self) -> f32 {
        self.raw_volume
    }

    /// Playback-rate multiplier.
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Stereo pan.
    #[must_use]
    pub const fn pan(&self) -> f32 {
        self.pan
    }

    /// Whether the sound loops.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether the sound is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the sound has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// World position, for positional sounds.
    #[must_use]
    pub const fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Nanoseconds played in the current loop, excluding time spent paused.
    #[must_use]
    pub fn elapsed_nanos(&self) -> u64 {
        if self.finished {
            return self.pitched_duration_nanos().max(0) as u64;
        }
        (self.reference_nanos() - self.start_nanos).max(0) as u64
    }

    /// Fraction of the current loop played, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.finished {
            return 1.0;
        }
        let pitched = self.pitched_duration_nanos();
        if pitched <= 0 {
            return 0.0;
        }
        (self.elapsed_nanos() as f64 / pitched as f64).min(1.0) as f32
    }
}

#[allow(clippy::cast_possible_wrap)]
fn now(clock: &dyn Clock) -> i64 {
    clock.now_nanos() as i64
}

/// Shared handle to a [`SoundInstance`].
///
/// Clones refer to the same instance. Equality is identity. The index into
/// the mixer's positional list belongs to the mixer alone:
///
/// ```compile_fail
/// use cadence_audio::backref::BackReferenced;
///
/// fn reindex(sound: &mut cadence_audio::sound::SoundHandle) {
///     sound.set_back_index(Some(42));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SoundHandle {
    inner: Arc<Mutex<SoundInstance>>,
}

impl PartialEq for SoundHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for SoundHandle {}

impl From<SoundInstance> for SoundHandle {
    fn from(instance: SoundInstance) -> Self {
        Self::new(instance)
    }
}

impl SoundHandle {
    /// Share `instance`.
    #[must_use]
    pub fn new(instance: SoundInstance) -> Self {
        Self {
            inner: Arc::new(Mutex::new(instance)),
        }
    }

    /// Lock the instance for direct access.
    pub fn lock(&self) -> MutexGuard<'_, SoundInstance> {
        self.inner.lock()
    }

    /// Whether both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// See [`SoundInstance::update`].
    pub fn update(&self) {
        self.inner.lock().update();
    }

    /// See [`SoundInstance::pause`].
    pub fn pause(&self) {
        self.inner.lock().pause();
    }

    /// See [`SoundInstance::resume`].
    pub fn resume(&self) {
        self.inner.lock().resume();
    }

    /// See [`SoundInstance::stop`].
    pub fn stop(&self) {
        self.inner.lock().stop();
    }

    /// See [`SoundInstance::set_pitch`].
    pub fn set_pitch(&self, pitch: f32) {
        self.inner.lock().set_pitch(pitch);
    }

    /// See [`SoundInstance::set_relative_volume`].
    pub fn set_relative_volume(&self, volume: f32) {
        self.inner.lock().set_relative_volume(volume);
    }

    /// See [`SoundInstance::set_master_volume`].
    pub fn set_master_volume(&self, volume: f32) {
        self.inner.lock().set_master_volume(volume);
    }

    /// See [`SoundInstance::set_positional_volume`].
    pub fn set_positional_volume(&self, volume: f32) {
        self.inner.lock().set_positional_volume(volume);
    }

    /// See [`SoundInstance::set_positional_volume_and_pan`].
    pub fn set_positional_volume_and_pan(&self, volume: f32, pan: f32) {
        self.inner.lock().set_positional_volume_and_pan(volume, pan);
    }

    /// See [`SoundInstance::set_pan`].
    pub fn set_pan(&self, pan: f32) {
        self.inner.lock().set_pan(pan);
    }

    /// See [`SoundInstance::set_looping`].
    pub fn set_looping(&self, looping: bool) {
        self.inner.lock().set_looping(looping);
    }

    /// See [`SoundInstance::set_position`].
    pub fn set_position(&self, position: Vec2) {
        self.inner.lock().set_position(position);
    }

    /// Whether this is the null instance.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.inner.lock().is_null()
    }

    /// Whether the sound has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.lock().is_finished()
    }

    /// Whether the sound is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().is_paused()
    }

    /// Volume sent to the backend.
    #[must_use]
    pub fn raw_volume(&self) -> f32 {
        self.inner.lock().raw_volume()
    }

    /// Stereo pan.
    #[must_use]
    pub fn pan(&self) -> f32 {
        self.inner.lock().pan()
    }

    /// Playback-rate multiplier.
    #[must_use]
    pub fn pitch(&self) -> f32 {
        self.inner.lock().pitch()
    }

    /// World position, for positional sounds.
    #[must_use]
    pub fn position(&self) -> Option<Vec2> {
        self.inner.lock().position()
    }

    /// Fraction of the current loop played.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.inner.lock().progress()
    }
}

impl SoundHandle {
    /// Index in the mixer's positional list.
    pub(crate) fn positional_index(&self) -> Option<usize> {
        self.inner.lock().positional_index
    }
}

/// A sound stored in the mixer's positional list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PositionalSound(pub(crate) SoundHandle);

impl BackReferenced for PositionalSound {
    fn back_index(&self) -> Option<usize> {
        self.0.positional_index()
    }

    fn set_back_index(&mut self, index: Option<usize>) {
        self.0.inner.lock().positional_index = index;
    }
}
