//! Music instances and the single music channel.
//!
//! There is one music device. [`MusicChannel`] is the token that grants
//! access to it: exactly one exists per mixer, it cannot be cloned, and a
//! [`MusicInstance`] is *active* exactly while it holds the token.
//!
//! ```text
//!              activate(channel)
//!   inactive ────────────────────► active ──► finished
//!      ▲                             │        (completion, stop)
//!      └──────── deactivate() ◄──────┘
//!                returns channel
//! ```
//!
//! An inactive instance keeps its own copy of position, pan, volume and loop
//! state; activation pushes that state to the device.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadence_common::ClipId;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::backend::MusicBackend;
use crate::volume::{clamp_pan, clamp_volume};

/// Exclusive access to the music device.
pub struct MusicChannel {
    backend: Arc<dyn MusicBackend>,
}

impl fmt::Debug for MusicChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicChannel").finish_non_exhaustive()
    }
}

impl MusicChannel {
    /// Wrap the music device. The mixer creates one per device.
    #[must_use]
    pub(crate) fn new(backend: Arc<dyn MusicBackend>) -> Self {
        Self { backend }
    }

    /// The device.
    #[must_use]
    pub fn backend(&self) -> &dyn MusicBackend {
        self.backend.as_ref()
    }
}

/// State shared between an instance and its completion callback.
#[derive(Debug, Default)]
pub struct MusicSignal {
    looping: AtomicBool,
    finished: AtomicBool,
}

impl MusicSignal {
    fn new(looping: bool) -> Self {
        Self {
            looping: AtomicBool::new(looping),
            finished: AtomicBool::new(false),
        }
    }

    /// Device reached the end of the track. A looping track keeps going.
    pub fn complete(&self) {
        if !self.looping.load(Ordering::SeqCst) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    /// Whether the track has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Whether the track loops.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }
}

/// One queued or playing music track.
pub struct MusicInstance {
    clip: ClipId,
    duration: f32,

    relative_volume: f32,
    master_volume: f32,
    raw_volume: f32,
    pan: f32,

    position: f32,
    paused: bool,

    signal: Arc<MusicSignal>,
    channel: Option<MusicChannel>,
}

impl fmt::Debug for MusicInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicInstance")
            .field("clip", &self.clip)
            .field("duration", &self.duration)
            .field("relative_volume", &self.relative_volume)
            .field("master_volume", &self.master_volume)
            .field("raw_volume", &self.raw_volume)
            .field("pan", &self.pan)
            .field("looping", &self.signal.is_looping())
            .field("position", &self.position)
            .field("paused", &self.paused)
            .field("finished", &self.signal.is_finished())
            .field("active", &self.channel.is_some())
            .finish_non_exhaustive()
    }
}

impl MusicInstance {
    /// Create an inactive instance. Inputs are clamped; the null clip yields
    /// an instance that is already finished.
    #[must_use]
    pub fn new(
        clip: ClipId,
        duration: f32,
        relative_volume: f32,
        master_volume: f32,
        pan: f32,
        looping: bool,
    ) -> Self {
        let relative_volume = clamp_volume(relative_volume);
        let master_volume = clamp_volume(master_volume);
        let signal = MusicSignal::new(looping);
        if !clip.is_valid() {
            signal.finished.store(true, Ordering::SeqCst);
        }

        Self {
            clip,
            duration: duration.max(0.0),
            relative_volume,
            master_volume,
            raw_volume: relative_volume * master_volume,
            pan: clamp_pan(pan),
            position: 0.0,
            paused: false,
            signal: Arc::new(signal),
            channel: None,
        }
    }

    /// Bind the instance to the music device.
    ///
    /// Hands the channel back if the instance is already active, or if it is
    /// finished (after stopping the device) or the device refuses the clip.
    pub(crate) fn activate(&mut self, channel: MusicChannel) -> Result<(), MusicChannel> {
        if self.channel.is_some() {
            return Err(channel);
        }

        let backend = channel.backend();
        if self.is_finished() {
            backend.stop();
            return Err(channel);
        }

        if !backend.load(self.clip) {
            warn!("Music device refused {}, marking it finished", self.clip);
            self.signal.finished.store(true, Ordering::SeqCst);
            backend.stop();
            return Err(channel);
        }

        backend.set_position(self.position);
        backend.set_pan(self.pan, self.raw_volume);
        backend.set_looping(self.signal.is_looping());

        let signal = Arc::clone(&self.signal);
        backend.set_on_completion(Some(Box::new(move || signal.complete())));

        if !self.paused {
            backend.play();
        }

        debug!("Activated music {} at {:.2}s", self.clip, self.position);
        self.channel = Some(channel);
        Ok(())
    }

    /// Unbind the instance, remembering where it was.
    ///
    /// Returns the channel, or `None` if the instance was not active.
    pub(crate) fn deactivate(&mut self) -> Option<MusicChannel> {
        let channel = self.channel.take()?;
        let backend = channel.backend();
        self.position = backend.position();
        backend.pause();
        backend.set_on_completion(None);
        debug!("Deactivated music {} at {:.2}s", self.clip, self.position);
        Some(channel)
    }

    /// Deliver device events and refresh the position snapshot.
    pub fn update(&mut self) {
        let Some(channel) = &self.channel else {
            return;
        };
        channel.backend().poll();
        if !self.paused && !self.is_finished() {
            self.position = channel.backend().position();
        }
    }

    fn backend(&self) -> Option<&dyn MusicBackend> {
        self.channel.as_ref().map(MusicChannel::backend)
    }

    /// Pause the track.
    pub fn pause(&mut self) {
        if self.paused || self.is_finished() {
            return;
        }
        self.paused = true;
        if let Some(backend) = self.backend() {
            let position = backend.position();
            backend.pause();
            self.position = position;
        }
    }

    /// Resume the track.
    pub fn resume(&mut self) {
        if !self.paused || self.is_finished() {
            return;
        }
        self.paused = false;
        if let Some(backend) = self.backend() {
            backend.play();
        }
    }

    /// Stop the track for good. Idempotent.
    pub fn stop(&mut self) {
        if self.is_finished() {
            return;
        }
        self.signal.finished.store(true, Ordering::SeqCst);
        if let Some(backend) = self.backend() {
            backend.stop();
        }
    }

    fn recompute_volume(&mut self) {
        self.raw_volume = self.relative_volume * self.master_volume;
        if let Some(backend) = self.backend() {
            backend.set_volume(self.raw_volume);
        }
    }

    /// Set the volume relative to the music slider.
    pub fn set_relative_volume(&mut self, volume: f32) {
        if self.is_finished() {
            return;
        }
        self.relative_volume = clamp_volume(volume);
        self.recompute_volume();
    }

    /// Set the effective music-slider volume.
    pub fn set_master_volume(&mut self, volume: f32) {
        if self.is_finished() {
            return;
        }
        self.master_volume = clamp_volume(volume);
        self.recompute_volume();
    }

    /// Set the stereo pan.
    pub fn set_pan(&mut self, pan: f32) {
        if self.is_finished() {
            return;
        }
        self.pan = clamp_pan(pan);
        if let Some(backend) = self.backend() {
            backend.set_pan(self.pan, self.raw_volume);
        }
    }

    /// Toggle looping.
    pub fn set_looping(&mut self, looping: bool) {
        if self.is_finished() {
            return;
        }
        self.signal.looping.store(looping, Ordering::SeqCst);
        if let Some(backend) = self.backend() {
            backend.set_looping(looping);
        }
    }

    /// Seek to `seconds`, clamped to the track.
    pub fn set_position(&mut self, seconds: f32) {
        if self.is_finished() {
            return;
        }
        let seconds = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.duration)
        };
        self.position = seconds;
        if let Some(backend) = self.backend() {
            backend.set_position(seconds);
            self.position = backend.position();
        }
    }

    /// Playback position in seconds. A finished track reports its full
    /// duration.
    #[must_use]
    pub fn position(&self) -> f32 {
        if self.is_finished() {
            return self.duration;
        }
        self.backend()
            .map_or(self.position, |backend| backend.position())
    }

    /// Clip being played.
    #[must_use]
    pub const fn clip(&self) -> ClipId {
        self.clip
    }

    /// Track duration in seconds.
    #[must_use]
    pub const fn duration(&self) -> f32 {
        self.duration
    }

    /// Volume relative to the music slider.
    #[must_use]
    pub const fn relative_volume(&self) -> f32 {
        self.relative_volume
    }

    /// Effective music-slider volume.
    #[must_use]
    pub const fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Volume sent to the device.
    #[must_use]
    pub const fn raw_volume(&self) -> f32 {
        self.raw_volume
    }

    /// Stereo pan.
    #[must_use]
    pub const fn pan(&self) -> f32 {
        self.pan
    }

    /// Whether the track loops.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.signal.is_looping()
    }

    /// Whether the track is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the track has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.signal.is_finished()
    }

    /// Whether the track holds the music channel.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.channel.is_some()
    }

    /// Completion state shared with the device callback.
    #[must_use]
    pub fn signal(&self) -> &Arc<MusicSignal> {
        &self.signal
    }
}

/// Shared handle to a [`MusicInstance`].
///
/// Clones refer to the same instance. Equality is identity. Only the mixer
/// moves the music channel, so a handle cannot bind or unbind its track:
///
/// ```compile_fail
/// fn unbind(track: &cadence_audio::music::MusicHandle) {
///     let _ = track.deactivate();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MusicHandle {
    inner: Arc<Mutex<MusicInstance>>,
}

impl PartialEq for MusicHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MusicHandle {}

impl From<MusicInstance> for MusicHandle {
    fn from(instance: MusicInstance) -> Self {
        Self::new(instance)
    }
}

impl MusicHandle {
    /// Share `instance`.
    #[must_use]
    pub fn new(instance: MusicInstance) -> Self {
        Self {
            inner: Arc::new(Mutex::new(instance)),
        }
    }

    /// Lock the instance for direct access.
    pub fn lock(&self) -> MutexGuard<'_, MusicInstance> {
        self.inner.lock()
    }

    /// Whether both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// See [`MusicInstance::activate`].
    pub(crate) fn activate(&self, channel: MusicChannel) -> Result<(), MusicChannel> {
        self.inner.lock().activate(channel)
    }

    /// See [`MusicInstance::deactivate`].
    pub(crate) fn deactivate(&self) -> Option<MusicChannel> {
        self.inner.lock().deactivate()
    }

    /// See [`MusicInstance::update`].
    pub fn update(&self) {
        self.inner.lock().update();
    }

    /// See [`MusicInstance::pause`].
    pub fn pause(&self) {
        self.inner.lock().pause();
    }

    /// See [`MusicInstance::resume`].
    pub fn resume(&self) {
        self.inner.lock().resume();
    }

    /// See [`MusicInstance::stop`].
    pub fn stop(&self) {
        self.inner.lock().stop();
    }

    /// See [`MusicInstance::set_relative_volume`].
    pub fn set_relative_volume(&self, volume: f32) {
        self.inner.lock().set_relative_volume(volume);
    }

    /// See [`MusicInstance::set_master_volume`].
    pub fn set_master_volume(&self, volume: f32) {
        self.inner.lock().set_master_volume(volume);
    }

    /// See [`MusicInstance::set_pan`].
    pub fn set_pan(&self, pan: f32) {
        self.inner.lock().set_pan(pan);
    }

    /// See [`MusicInstance::set_looping`].
    pub fn set_looping(&self, looping: bool) {
        self.inner.lock().set_looping(looping);
    }

    /// See [`MusicInstance::set_position`].
    pub fn set_position(&self, seconds: f32) {
        self.inner.lock().set_position(seconds);
    }

    /// See [`MusicInstance::position`].
    #[must_use]
    pub fn position(&self) -> f32 {
        self.inner.lock().position()
    }

    /// Clip being played.
    #[must_use]
    pub fn clip(&self) -> ClipId {
        self.inner.lock().clip()
    }

    /// Volume sent to the device.
    #[must_use]
    pub fn raw_volume(&self) -> f32 {
        self.inner.lock().raw_volume()
    }

    /// Whether the track is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().is_paused()
    }

    /// Whether the track has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.lock().is_finished()
    }

    /// Whether the track holds the music channel.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock().is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMusicBackend;

    fn channel() -> (Arc<RecordingMusicBackend>, MusicChannel) {
        let backend = RecordingMusicBackend::new();
        let channel = MusicChannel::new(backend.clone());
        (backend, channel)
    }

    fn track(looping: bool) -> MusicInstance {
        MusicInstance::new(ClipId::from_raw(7), 120.0, 0.5, 0.8, -0.25, looping)
    }

    #[test]
    fn test_activate_pushes_state() {
        let (backend, channel) = channel();
        let mut music = track(true);
        music.set_position(30.0);

        assert!(music.activate(channel).is_ok());
        assert!(music.is_active());

        let state = backend.state();
        assert_eq!(state.loaded, Some(ClipId::from_raw(7)));
        assert!(state.playing);
        assert!(state.looping);
        assert!((state.position - 30.0).abs() < f32::EPSILON);
        assert!((state.pan + 0.25).abs() < f32::EPSILON);
        assert!((state.volume - 0.4).abs() < 1e-6);
        assert!(backend.has_callback());
    }

    #[test]
    fn test_double_activate_returns_channel() {
        let (backend, first) = channel();
        let mut music = track(false);
        assert!(music.activate(first).is_ok());

        let second = MusicChannel::new(backend);
        assert!(music.activate(second).is_err());
    }

    #[test]
    fn test_paused_instance_activates_silently() {
        let (backend, channel) = channel();
        let mut music = track(false);
        music.pause();
        assert!(music.activate(channel).is_ok());
        assert!(!backend.state().playing);

        music.resume();
        assert!(backend.state().playing);
    }

    #[test]
    fn test_deactivate_snapshots_position() {
        let (backend, channel) = channel();
        let mut music = track(false);
        assert!(music.activate(channel).is_ok());

        backend.set_device_position(42.0);
        let channel = music.deactivate().expect("was active");
        assert!(!music.is_active());
        assert!(!backend.state().playing);
        assert!(!backend.has_callback());
        assert!((music.position() - 42.0).abs() < f32::EPSILON);

        assert!(music.deactivate().is_none());

        assert!(music.activate(channel).is_ok());
        assert!((backend.state().position - 42.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_completion_finishes_non_looping() {
        let (backend, channel) = channel();
        let mut music = track(false);
        assert!(music.activate(channel).is_ok());

        backend.set_device_position(3.0);
        backend.complete();
        assert!(music.is_finished());
        assert!((music.position() - 120.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_completion_keeps_looping_track() {
        let (backend, channel) = channel();
        let mut music = track(true);
        assert!(music.activate(channel).is_ok());

        backend.complete();
        assert!(!music.is_finished());

        music.set_looping(false);
        backend.complete();
        assert!(music.is_finished());

        music.set_looping(true);
        assert!(music.is_finished());
    }

    #[test]
    fn test_finished_instance_refuses_activation() {
        let (backend, channel) = channel();
        let mut music = track(false);
        music.stop();

        let channel = music.activate(channel).expect_err("finished");
        assert!(!music.is_active());
        assert_eq!(backend.state().stops, 1);
        assert_eq!(backend.state().loads, 0);
        drop(channel);
    }

    #[test]
    fn test_refused_clip_is_finished() {
        let (backend, channel) = channel();
        backend.reject(ClipId::from_raw(7));
        let mut music = track(false);

        assert!(music.activate(channel).is_err());
        assert!(music.is_finished());
    }

    #[test]
    fn test_inactive_setters_store_state() {
        let mut music = track(false);
        music.set_relative_volume(1.0);
        music.set_master_volume(0.5);
        music.set_pan(4.0);
        music.set_position(500.0);

        assert!((music.raw_volume() - 0.5).abs() < f32::EPSILON);
        assert!((music.pan() - 1.0).abs() < f32::EPSILON);
        assert!((music.position() - 120.0).abs() < f32::EPSILON);
        assert!(!music.is_finished());
    }

    #[test]
    fn test_finished_setters_are_noops() {
        let mut music = track(false);
        music.stop();
        let before = format!("{music:?}");
        music.set_relative_volume(0.0);
        music.set_master_volume(0.0);
        music.set_pan(1.0);
        music.set_looping(true);
        music.set_position(1.0);
        music.pause();
        music.resume();
        music.update();
        assert_eq!(before, format!("{music:?}"));
    }

    #[test]
    fn test_null_clip_is_finished() {
        let music = MusicInstance::new(ClipId::NULL, 10.0, 1.0, 1.0, 0.0, false);
        assert!(music.is_finished());
    }

    #[test]
    fn test_handle_forwards_to_device() {
        let (backend, channel) = channel();
        let handle = MusicHandle::new(track(false));
        assert!(handle.activate(channel).is_ok());

        handle.set_master_volume(1.0);
        assert!((backend.state().volume - 0.5).abs() < 1e-6);

        handle.pause();
        assert!(handle.is_paused());
        assert!(!backend.state().playing);

        handle.stop();
        assert!(handle.is_finished());
        assert_eq!(backend.state().stops, 1);
    }
}
