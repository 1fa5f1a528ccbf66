//! Rodio-backed implementations of the playback traits.
//!
//! - [`AudioDevice`]: the output stream. It must outlive every backend that
//!   plays through it and stays on the thread that opened it.
//! - [`SampleCache`]: decoded clips keyed by [`ClipId`].
//! - [`RodioSoundBackend`]: one rodio `Sink` per voice, bounded by a voice
//!   limit. Voices whose sink drained are reaped when a new voice is needed.
//! - [`RodioMusicBackend`]: a single sink holding the bound track. End of
//!   track is counted on the audio thread and delivered by
//!   [`MusicBackend::poll`].
//!
//! ```text
//!  AudioMixer ──► SoundBackend ──► RodioSoundBackend ──► Sink[0..max_voices]
//!            └──► MusicBackend ──► RodioMusicBackend ──► Sink
//!                                        │
//!                                  SampleCache ──► ControlledSource
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use cadence_common::{AudioError, AudioResult, ClipId};
use parking_lot::{Mutex, RwLock};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, info, trace, warn};

use crate::backend::{
    CompletionCallback, MusicBackend, PlaybackHandle, PlaybackIdGenerator, SoundBackend,
};
use crate::clip::{ClipDescriptor, ClipKind};
use crate::probe::probe_bytes;
use crate::source::{ControlledSource, SampleData, SourceControls};
use crate::volume::{clamp_pitch, clamp_volume, DEFAULT_PAN, DEFAULT_VOLUME};

/// Wraps rodio's output stream.
pub struct AudioDevice {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").finish_non_exhaustive()
    }
}

impl AudioDevice {
    /// Open the default output device.
    pub fn new() -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Handle for creating sinks. Sinks stay silent once the device drops.
    #[must_use]
    pub fn handle(&self) -> &OutputStreamHandle {
        &self.handle
    }
}

fn create_sink(output: &OutputStreamHandle) -> AudioResult<Sink> {
    Sink::try_new(output).map_err(|e| AudioError::SinkCreationFailed(e.to_string()))
}

/// Decoded clips shared by a backend.
#[derive(Debug, Default)]
pub struct SampleCache {
    clips: RwLock<HashMap<ClipId, SampleData>>,
}

impl SampleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the file at `path` and register it as a new clip named after
    /// the file stem.
    pub fn load_file(&self, kind: ClipKind, path: impl AsRef<Path>) -> AudioResult<ClipDescriptor> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| AudioError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());

        self.load_bytes(kind, name, &bytes)
    }

    /// Decode `bytes` and register them as a new clip.
    pub fn load_bytes(
        &self,
        kind: ClipKind,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> AudioResult<ClipDescriptor> {
        let data = SampleData::decode_bytes(bytes)?;
        let descriptor = ClipDescriptor::new(kind, name, probe_bytes(bytes));

        info!(
            "Loaded {:?} clip '{}' as {} ({:.2}s, {} ch, {} Hz)",
            kind,
            descriptor.name,
            descriptor.id,
            descriptor.duration,
            data.channels(),
            data.sample_rate()
        );

        self.clips.write().insert(descriptor.id, data);
        Ok(descriptor)
    }

    /// Register decoded samples under `id`, replacing any previous entry.
    pub fn insert(&self, id: ClipId, data: SampleData) {
        self.clips.write().insert(id, data);
    }

    /// Samples of `id`.
    #[must_use]
    pub fn get(&self, id: ClipId) -> Option<SampleData> {
        self.clips.read().get(&id).cloned()
    }

    /// Drop the samples of `id`. Voices already playing keep their copy.
    pub fn unload(&self, id: ClipId) -> bool {
        self.clips.write().remove(&id).is_some()
    }

    /// Number of cached clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.read().is_empty()
    }
}

/// One playing sound effect.
struct Voice {
    sink: Sink,
    controls: Arc<SourceControls>,
}

impl Voice {
    fn is_drained(&self) -> bool {
        self.sink.empty()
    }
}

/// Sound-effect backend playing each sound on its own sink.
pub struct RodioSoundBackend {
    output: OutputStreamHandle,
    cache: SampleCache,
    voices: Mutex<HashMap<PlaybackHandle, Voice>>,
    ids: PlaybackIdGenerator,
    max_voices: usize,
}

impl std::fmt::Debug for RodioSoundBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundBackend")
            .field("clips", &self.cache.len())
            .field("voices", &self.voices.lock().len())
            .field("max_voices", &self.max_voices)
            .finish_non_exhaustive()
    }
}

impl RodioSoundBackend {
    /// Create a backend on `device` with at most `max_voices` simultaneous
    /// voices.
    #[must_use]
    pub fn new(device: &AudioDevice, max_voices: usize) -> Self {
        debug!("Sound backend created with {} voices", max_voices.max(1));
        Self {
            output: device.handle().clone(),
            cache: SampleCache::new(),
            voices: Mutex::new(HashMap::new()),
            ids: PlaybackIdGenerator::new(),
            max_voices: max_voices.max(1),
        }
    }

    /// Load a sound effect from disk.
    pub fn load_sound(&self, path: impl AsRef<Path>) -> AudioResult<ClipDescriptor> {
        self.cache.load_file(ClipKind::Sound, path)
    }

    /// Load a sound effect from encoded bytes.
    pub fn load_sound_from_memory(
        &self,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> AudioResult<ClipDescriptor> {
        self.cache.load_bytes(ClipKind::Sound, name, bytes)
    }

    /// Decoded clips.
    #[must_use]
    pub const fn cache(&self) -> &SampleCache {
        &self.cache
    }

    /// Voice limit.
    #[must_use]
    pub const fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Number of voices still producing sound.
    #[must_use]
    pub fn active_voices(&self) -> usize {
        let mut voices = self.voices.lock();
        voices.retain(|_, voice| !voice.is_drained());
        voices.len()
    }

    /// Stop every voice.
    pub fn stop_all(&self) {
        let mut voices = self.voices.lock();
        for voice in voices.values() {
            voice.sink.stop();
        }
        voices.clear();
    }

    fn start(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32, looping: bool) -> PlaybackHandle {
        match self.try_start(clip, volume, pitch, pan, looping) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not play {}: {}", clip, e);
                PlaybackHandle::INVALID
            },
        }
    }

    fn try_start(
        &self,
        clip: ClipId,
        volume: f32,
        pitch: f32,
        pan: f32,
        looping: bool,
    ) -> AudioResult<PlaybackHandle> {
        let data = self.cache.get(clip).ok_or(AudioError::UnknownClip(clip))?;

        let mut voices = self.voices.lock();
        if voices.len() >= self.max_voices {
            voices.retain(|_, voice| !voice.is_drained());
            if voices.len() >= self.max_voices {
                return Err(AudioError::NoFreeVoices {
                    max: self.max_voices,
                });
            }
        }

        let sink = create_sink(&self.output)?;
        let controls = SourceControls::new(pan, looping);
        sink.set_volume(clamp_volume(volume));
        sink.set_speed(clamp_pitch(pitch));
        sink.append(ControlledSource::new(data, Arc::clone(&controls)));

        let handle = self.ids.next(clip);
        trace!("Voice {} started ({} active)", handle, voices.len() + 1);
        voices.insert(handle, Voice { sink, controls });
        Ok(handle)
    }

    fn with_voice(&self, handle: PlaybackHandle, f: impl FnOnce(&Voice)) {
        if let Some(voice) = self.voices.lock().get(&handle) {
            f(voice);
        }
    }
}

impl SoundBackend for RodioSoundBackend {
    fn play(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle {
        self.start(clip, volume, pitch, pan, false)
    }

    fn play_looping(&self, clip: ClipId, volume: f32, pitch: f32, pan: f32) -> PlaybackHandle {
        self.start(clip, volume, pitch, pan, true)
    }

    fn pause(&self, handle: PlaybackHandle) {
        self.with_voice(handle, |voice| voice.sink.pause());
    }

    fn resume(&self, handle: PlaybackHandle) {
        self.with_voice(handle, |voice| voice.sink.play());
    }

    fn stop(&self, handle: PlaybackHandle) {
        if let Some(voice) = self.voices.lock().remove(&handle) {
            voice.sink.stop();
        }
    }

    fn set_volume(&self, handle: PlaybackHandle, volume: f32) {
        self.with_voice(handle, |voice| voice.sink.set_volume(clamp_volume(volume)));
    }

    fn set_pitch(&self, handle: PlaybackHandle, pitch: f32) {
        self.with_voice(handle, |voice| voice.sink.set_speed(clamp_pitch(pitch)));
    }

    fn set_pan(&self, handle: PlaybackHandle, pan: f32, volume: f32) {
        self.with_voice(handle, |voice| {
            voice.controls.set_pan(pan);
            voice.sink.set_volume(clamp_volume(volume));
        });
    }

    fn set_looping(&self, handle: PlaybackHandle, looping: bool) {
        self.with_voice(handle, |voice| voice.controls.set_looping(looping));
    }
}

/// The bound music track.
struct Track {
    clip: ClipId,
    data: SampleData,
    sink: Sink,
    controls: Arc<SourceControls>,
}

impl Track {
    /// Queue a fresh source if the previous one ran out.
    fn refill(&self) {
        if self.controls.is_ended() || self.sink.empty() {
            let frame = self.controls.frame().min(self.data.frames());
            self.controls.rewind();
            if frame < self.data.frames() {
                self.controls.seek_frame(frame);
            }
            self.sink
                .append(ControlledSource::new(self.data.clone(), Arc::clone(&self.controls)));
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackSettings {
    volume: f32,
    pan: f32,
    looping: bool,
}

/// Music backend with a single sink.
pub struct RodioMusicBackend {
    output: OutputStreamHandle,
    cache: SampleCache,
    track: Mutex<Option<Track>>,
    settings: Mutex<TrackSettings>,
    callback: Mutex<Option<CompletionCallback>>,
}

impl std::fmt::Debug for RodioMusicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioMusicBackend")
            .field("clips", &self.cache.len())
            .field("track", &self.track.lock().as_ref().map(|t| t.clip))
            .field("settings", &*self.settings.lock())
            .finish_non_exhaustive()
    }
}

impl RodioMusicBackend {
    /// Create a music backend on `device`.
    #[must_use]
    pub fn new(device: &AudioDevice) -> Self {
        Self {
            output: device.handle().clone(),
            cache: SampleCache::new(),
            track: Mutex::new(None),
            settings: Mutex::new(TrackSettings {
                volume: DEFAULT_VOLUME,
                pan: DEFAULT_PAN,
                looping: false,
            }),
            callback: Mutex::new(None),
        }
    }

    /// Load a music track from disk.
    pub fn load_music(&self, path: impl AsRef<Path>) -> AudioResult<ClipDescriptor> {
        self.cache.load_file(ClipKind::Music, path)
    }

    /// Load a music track from encoded bytes.
    pub fn load_music_from_memory(
        &self,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> AudioResult<ClipDescriptor> {
        self.cache.load_bytes(ClipKind::Music, name, bytes)
    }

    /// Decoded tracks.
    #[must_use]
    pub const fn cache(&self) -> &SampleCache {
        &self.cache
    }

    fn with_track(&self, f: impl FnOnce(&Track)) {
        if let Some(track) = self.track.lock().as_ref() {
            f(track);
        }
    }

    fn try_load(&self, clip: ClipId) -> AudioResult<Track> {
        let data = self.cache.get(clip).ok_or(AudioError::UnknownClip(clip))?;
        let settings = *self.settings.lock();

        let sink = create_sink(&self.output)?;
        sink.pause();
        sink.set_volume(clamp_volume(settings.volume));
        let controls = SourceControls::new(settings.pan, settings.looping);
        sink.append(ControlledSource::new(data.clone(), Arc::clone(&controls)));

        Ok(Track {
            clip,
            data,
            sink,
            controls,
        })
    }
}

impl MusicBackend for RodioMusicBackend {
    fn load(&self, clip: ClipId) -> bool {
        let mut track = self.track.lock();
        if let Some(old) = track.take() {
            old.sink.stop();
        }

        match self.try_load(clip) {
            Ok(loaded) => {
                debug!("Music device bound to {}", clip);
                *track = Some(loaded);
                true
            },
            Err(e) => {
                warn!("Music device cannot load {}: {}", clip, e);
                false
            },
        }
    }

    fn play(&self) {
        self.with_track(|track| {
            track.refill();
            track.sink.play();
        });
    }

    fn pause(&self) {
        self.with_track(|track| track.sink.pause());
    }

    fn stop(&self) {
        self.with_track(|track| {
            track.sink.pause();
            track.controls.seek_frame(0);
        });
    }

    fn set_volume(&self, volume: f32) {
        self.settings.lock().volume = volume;
        self.with_track(|track| track.sink.set_volume(clamp_volume(volume)));
    }

    fn set_pan(&self, pan: f32, volume: f32) {
        {
            let mut settings = self.settings.lock();
            settings.pan = pan;
            settings.volume = volume;
        }
        self.with_track(|track| {
            track.controls.set_pan(pan);
            track.sink.set_volume(clamp_volume(volume));
        });
    }

    fn set_looping(&self, looping: bool) {
        self.settings.lock().looping = looping;
        self.with_track(|track| track.controls.set_looping(looping));
    }

    fn set_position(&self, seconds: f32) {
        self.with_track(|track| track.controls.seek_frame(track.data.frame_at(seconds)));
    }

    fn position(&self) -> f32 {
        self.track.lock().as_ref().map_or(0.0, |track| {
            let frame = track.controls.frame().min(track.data.frames());
            frame as f32 / track.data.sample_rate() as f32
        })
    }

    fn set_on_completion(&self, callback: Option<CompletionCallback>) {
        *self.callback.lock() = callback;
    }

    fn poll(&self) {
        let completions = self
            .track
            .lock()
            .as_ref()
            .map_or(0, |track| track.controls.take_completions());
        if completions == 0 {
            return;
        }

        trace!("Music device reached end of track {} time(s)", completions);
        if let Some(callback) = self.callback.lock().as_ref() {
            for _ in 0..completions {
                callback();
            }
        }
    }
}
