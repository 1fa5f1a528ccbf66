//! Recording backends and fixtures for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cadence_common::{ClipId, ManualClock};
use parking_lot::Mutex;

use crate::backend::{
    CompletionCallback, MusicBackend, PlaybackHandle, PlaybackIdGenerator, SoundBackend,
};

/// Last known state of one recorded playback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceState {
    pub volume: f32,
    pub pitch: f32,
    pub pan: f32,
    pub looping: bool,
    pub paused: bool,
    pub stopped: bool,
}

/// Sound backend that records every playback it starts.
#[derive(Debug, Default)]
pub struct RecordingSoundBackend {
    ids: PlaybackIdGenerator,
    voices: Mutex<HashMap<PlaybackHandle, VoiceState>>,
    failing: AtomicBool,
}

impl RecordingSoundBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following play call return the invalid handle.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn voice(&self, handle: PlaybackHandle) -> Option<VoiceState> {
        self.voices.lock().get(&handle).copied()
    }

    pub fn started(&self) -> usize {
        self.voices.lock().len()
    }

    fn start(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32, looping: bool) -> PlaybackHandle {
        if self.failing.load(Ordering::SeqCst) {
            return PlaybackHandle::INVALID;
        }
        let handle = self.ids.next(clip);
        self.voices.lock().insert(
            handle,
            VoiceState {
                volume,
                pitch,
                pan,
                looping,
                paused: false,
                stopped: false,
            },
        );
        handle
    }

    fn with_voice(&self, handle: PlaybackHandle, f: impl FnOnce(&mut VoiceState)) {
        if let Some(voice) = self.voices.lock().get_mut(&handle) {
            f(voice);
        }
    }
}

impl SoundBackend for RecordingSoundBackend {
    fn play(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle {
        self.start(clip, volume, pitch, pan, false)
    }

    fn play_looping(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle {
        self.start(clip, volume, pitch, pan, true)
    }

    fn pause(&self, handle: PlaybackHandle) {
        self.with_voice(handle, |v| v.paused = true);
    }

    fn resume(&self, handle: PlaybackHandle) {
        self.with_voice(handle, |v| v.paused = false);
    }

    fn stop(&self, handle: PlaybackHandle) {
        self.with_voice(handle, |v| v.stopped = true);
    }

    fn set_volume(&self, handle: PlaybackHandle, volume: f32) {
        self.with_voice(handle, |v| v.volume = volume);
    }

    fn set_pitch(&self, handle: PlaybackHandle, pitch: f32) {
        self.with_voice(handle, |v| v.pitch = pitch);
    }

    fn set_pan(&self, handle: PlaybackHandle, pan: f32, volume: f32) {
        self.with_voice(handle, |v| {
            v.pan = pan;
            v.volume = volume;
        });
    }

    fn set_looping(&self, handle: PlaybackHandle, looping: bool) {
        self.with_voice(handle, |v| v.looping = looping);
    }
}

/// Observable state of the recording music device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MusicDeviceState {
    pub loaded: Option<ClipId>,
    pub loads: usize,
    pub playing: bool,
    pub stops: usize,
    pub volume: f32,
    pub pan: f32,
    pub looping: bool,
    pub position: f32,
}

/// Music backend that records its state and lets tests fire completion.
#[derive(Default)]
pub struct RecordingMusicBackend {
    state: Mutex<MusicDeviceState>,
    callback: Mutex<Option<CompletionCallback>>,
    rejected: Mutex<Vec<ClipId>>,
}

impl std::fmt::Debug for RecordingMusicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingMusicBackend")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl RecordingMusicBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MusicDeviceState {
        self.state.lock().clone()
    }

    pub fn has_callback(&self) -> bool {
        self.callback.lock().is_some()
    }

    /// Refuse to load `clip`.
    pub fn reject(&self, clip: ClipId) {
        self.rejected.lock().push(clip);
    }

    /// Pretend playback advanced to `seconds`.
    pub fn set_device_position(&self, seconds: f32) {
        self.state.lock().position = seconds;
    }

    /// Fire the completion callback as the device would at end of track.
    pub fn complete(&self) {
        if let Some(callback) = self.callback.lock().as_ref() {
            callback();
        }
    }
}

impl MusicBackend for RecordingMusicBackend {
    fn load(&self, clip: ClipId) -> bool {
        if self.rejected.lock().contains(&clip) {
            return false;
        }
        let mut state = self.state.lock();
        state.loaded = Some(clip);
        state.loads += 1;
        state.playing = false;
        state.position = 0.0;
        true
    }

    fn play(&self) {
        self.state.lock().playing = true;
    }

    fn pause(&self) {
        self.state.lock().playing = false;
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.stops += 1;
        state.position = 0.0;
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn set_pan(&self, pan: f32, volume: f32) {
        let mut state = self.state.lock();
        state.pan = pan;
        state.volume = volume;
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn set_position(&self, seconds: f32) {
        self.state.lock().position = seconds;
    }

    fn position(&self) -> f32 {
        self.state.lock().position
    }

    fn set_on_completion(&self, callback: Option<CompletionCallback>) {
        *self.callback.lock() = callback;
    }
}

/// Shared manual clock plus its trait-object form.
pub fn manual_clock() -> (ManualClock, Arc<dyn cadence_common::Clock>) {
    let clock = ManualClock::new();
    let shared: Arc<dyn cadence_common::Clock> = Arc::new(clock.clone());
    (clock, shared)
}

/// A 16-bit PCM WAV file holding `frames` frames of a quiet square wave.
pub fn wav_bytes(sample_rate: u32, channels: u16, frames: u32) -> Vec<u8> {
    let block_align = channels * 2;
    let data_len = frames * u32::from(block_align);

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for frame in 0..frames {
        let sample: i16 = if frame % 100 < 50 { 1_000 } else { -1_000 };
        for _ in 0..channels {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }
    bytes
}
