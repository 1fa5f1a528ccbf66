//! The audio mixer.
//!
//! [`AudioMixer`] owns every live sound and music instance, the global volume
//! sliders and the 2D listener. The host calls [`AudioMixer::update`] once per
//! rendered frame:
//!
//! 1. Every active sound advances its timer; finished sounds are swap-removed
//!    from the active list and, if positional, from the positional list.
//! 2. Positional sounds that moved since the last pass get fresh volume and
//!    pan.
//! 3. The current music track delivers device events; a finished track hands
//!    the music channel to the next queued track.
//!
//! Every public method is total. Out-of-range numbers are clamped and a
//! failed play yields an instance that is already finished.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use cadence_common::Clock;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::backend::{MusicBackend, PlaybackHandle, SoundBackend};
use crate::backref::BackRefList;
use crate::clip::ClipDescriptor;
use crate::music::{MusicChannel, MusicHandle, MusicInstance};
use crate::preferences::{VolumeStore, MASTER_VOLUME_KEY, MUSIC_VOLUME_KEY, SOUND_VOLUME_KEY};
use crate::sound::{PositionalSound, SoundHandle, SoundInstance, SoundParams};
use crate::spatial::Hearing;
use crate::volume::{VolumeSliders, DEFAULT_VOLUME};

/// Default hear range in world units.
pub const DEFAULT_HEAR_RANGE: f32 = 480.0;

/// Default maximum number of simultaneous sound voices.
pub const DEFAULT_MAX_VOICES: usize = 32;

/// Mixer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Maximum distance at which positional sounds are audible.
    pub hear_range: f32,
    /// Maximum simultaneous sound voices on the device.
    pub max_voices: usize,
    /// Initial slider values.
    pub volumes: VolumeSliders,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            hear_range: DEFAULT_HEAR_RANGE,
            max_voices: DEFAULT_MAX_VOICES,
            volumes: VolumeSliders::default(),
        }
    }
}

impl MixerConfig {
    /// Set the hear range.
    #[must_use]
    pub const fn with_hear_range(mut self, range: f32) -> Self {
        self.hear_range = range;
        self
    }

    /// Set the voice limit.
    #[must_use]
    pub const fn with_max_voices(mut self, max: usize) -> Self {
        self.max_voices = max;
        self
    }

    /// Set the initial sliders.
    #[must_use]
    pub const fn with_volumes(mut self, volumes: VolumeSliders) -> Self {
        self.volumes = volumes;
        self
    }
}

/// Positional audio mixer.
pub struct AudioMixer {
    sound_backend: Arc<dyn SoundBackend>,
    clock: Arc<dyn Clock>,
    config: MixerConfig,

    sliders: VolumeSliders,
    hearing: Hearing,

    sounds: Vec<SoundHandle>,
    positional: BackRefList<PositionalSound>,
    null_sound: SoundHandle,

    channel: Option<MusicChannel>,
    current_music: Option<MusicHandle>,
    music_queue: VecDeque<MusicHandle>,
}

impl fmt::Debug for AudioMixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioMixer")
            .field("sliders", &self.sliders)
            .field("hearing", &self.hearing)
            .field("active_sounds", &self.sounds.len())
            .field("positional_sounds", &self.positional.len())
            .field("current_music", &self.current_music.is_some())
            .field("queued_music", &self.music_queue.len())
            .finish_non_exhaustive()
    }
}

impl AudioMixer {
    /// Create a mixer over the given devices.
    pub fn new(
        sound_backend: Arc<dyn SoundBackend>,
        music_backend: Arc<dyn MusicBackend>,
        clock: Arc<dyn Clock>,
        config: MixerConfig,
    ) -> Self {
        let null_sound = SoundHandle::new(SoundInstance::null(Arc::clone(&clock)));
        let hearing = Hearing::new(Vec2::ZERO, config.hear_range);

        info!(
            "Audio mixer created (hear range {}, master {:.2}, sound {:.2}, music {:.2})",
            hearing.range(),
            config.volumes.master(),
            config.volumes.sound(),
            config.volumes.music()
        );

        Self {
            sound_backend,
            clock,
            sliders: config.volumes,
            hearing,
            config,
            sounds: Vec::new(),
            positional: BackRefList::new(),
            null_sound,
            channel: Some(MusicChannel::new(music_backend)),
            current_music: None,
            music_queue: VecDeque::new(),
        }
    }

    /// Configuration the mixer was created with.
    #[must_use]
    pub const fn config(&self) -> &MixerConfig {
        &self.config
    }

    // ============================================
    // Frame cycle
    // ============================================

    /// Advance timers, reap finished sounds, re-derive moved positional
    /// sounds and advance the music queue. Call once per rendered frame.
    pub fn update(&mut self) {
        for i in (0..self.sounds.len()).rev() {
            let finished = {
                let mut sound = self.sounds[i].lock();
                sound.update();
                sound.is_finished()
            };
            if finished {
                let sound = self.sounds.swap_remove(i);
                if sound.positional_index().is_some() {
                    self.positional.remove(&PositionalSound(sound.clone()));
                }
                trace!("Reaped sound {}", sound.lock().clip());
            }
        }

        for PositionalSound(sound) in &self.positional {
            if sound.lock().is_moved() {
                self.update_positional(sound);
            }
        }

        self.update_music();
    }

    // ============================================
    // Sound playback
    // ============================================

    /// Play `clip` once at full volume.
    pub fn play_sound(&mut self, clip: &ClipDescriptor) -> SoundHandle {
        self.play_sound_with(clip, SoundParams::new())
    }

    /// Play `clip` with explicit parameters.
    pub fn play_sound_with(&mut self, clip: &ClipDescriptor, params: SoundParams) -> SoundHandle {
        let params = params.clamped();
        let volume = self.sliders.effective_sound() * params.volume;
        let handle = self.start(clip, volume, params.pitch, params.pan, params.looping);

        let instance = SoundInstance::new(
            Arc::clone(&self.sound_backend),
            Arc::clone(&self.clock),
            clip.id,
            handle,
            params,
            self.sliders.effective_sound(),
            clip.duration,
        );
        let sound = SoundHandle::new(instance);
        self.sounds.push(sound.clone());
        sound
    }

    /// Play `clip` once at `position`.
    pub fn play_sound_at(&mut self, position: Vec2, clip: &ClipDescriptor) -> SoundHandle {
        self.play_sound_at_with(position, clip, SoundParams::new())
    }

    /// Play `clip` at `position` in world space.
    ///
    /// Volume and pan derive from the listener; `params.pan` is ignored. Out
    /// of hear range nothing is played and the shared null sound is returned.
    pub fn play_sound_at_with(
        &mut self,
        position: Vec2,
        clip: &ClipDescriptor,
        params: SoundParams,
    ) -> SoundHandle {
        if !self.hearing.in_range(position) {
            trace!("Suppressed {} at {:?}: out of hear range", clip.id, position);
            return self.null_sound.clone();
        }

        let spatial = self.hearing.calculate(position);
        let params = params.with_pan(spatial.pan).clamped();
        let volume = params.volume * spatial.volume * self.sliders.effective_sound();
        let handle = self.start(clip, volume, params.pitch, params.pan, params.looping);

        let mut instance = SoundInstance::new(
            Arc::clone(&self.sound_backend),
            Arc::clone(&self.clock),
            clip.id,
            handle,
            params,
            self.sliders.effective_sound(),
            clip.duration,
        );
        instance.set_positional_volume(spatial.volume);
        instance.set_position(position);

        let sound = SoundHandle::new(instance);
        self.sounds.push(sound.clone());
        self.positional.push(PositionalSound(sound.clone()));
        sound
    }

    fn start(
        &self,
        clip: &ClipDescriptor,
        volume: f32,
        pitch: f32,
        pan: f32,
        looping: bool,
    ) -> PlaybackHandle {
        let handle = if looping {
            self.sound_backend.play_looping(clip.id, volume, pitch, pan)
        } else {
            self.sound_backend.play(clip.id, volume, pitch, pan)
        };
        if handle.is_valid() {
            trace!("Started {} as {}", clip.id, handle);
        } else {
            debug!("Backend refused to play {} '{}'", clip.id, clip.name);
        }
        handle
    }

    /// Shared inert instance returned for suppressed positional plays.
    #[must_use]
    pub const fn null_sound(&self) -> &SoundHandle {
        &self.null_sound
    }

    /// Pause every active sound.
    pub fn pause_all_sounds(&self) {
        for sound in &self.sounds {
            sound.pause();
        }
    }

    /// Resume every active sound.
    pub fn resume_all_sounds(&self) {
        for sound in &self.sounds {
            sound.resume();
        }
    }

    /// Stop every active sound and forget all of them.
    pub fn stop_all_sounds(&mut self) {
        for sound in &self.sounds {
            sound.stop();
        }
        debug!("Stopped {} sounds", self.sounds.len());
        self.sounds.clear();
        self.positional.clear();
    }

    /// Active sounds, in no particular order.
    #[must_use]
    pub fn active_sounds(&self) -> &[SoundHandle] {
        &self.sounds
    }

    /// Active positional sounds, in no particular order.
    #[must_use]
    pub fn active_positional_sounds(&self) -> Vec<SoundHandle> {
        self.positional.iter().map(|slot| slot.0.clone()).collect()
    }

    // ============================================
    // Listener
    // ============================================

    /// Move the listener. Positional sounds are re-derived only if it
    /// actually moved.
    pub fn set_listener_position(&mut self, position: Vec2) {
        if self.hearing.set_listener(position) {
            self.update_all_positional();
        }
    }

    /// Set the hear range (sign ignored).
    pub fn set_hear_range(&mut self, range: f32) {
        if self.hearing.set_range(range) {
            debug!("Hear range set to {}", self.hearing.range());
            self.update_all_positional();
        }
    }

    /// Listener position.
    #[must_use]
    pub const fn listener_position(&self) -> Vec2 {
        self.hearing.listener()
    }

    /// Hear range, always non-negative.
    #[must_use]
    pub const fn hear_range(&self) -> f32 {
        self.hearing.range()
    }

    /// Re-derive volume and pan of every positional sound.
    pub fn update_all_positional(&self) {
        for PositionalSound(sound) in &self.positional {
            self.update_positional(sound);
        }
    }

    /// Re-derive volume and pan of one positional sound. Sounds outside the
    /// hear range are muted.
    pub fn update_positional(&self, sound: &SoundHandle) {
        if sound.positional_index().is_none() {
            return;
        }
        let mut instance = sound.lock();
        let Some(position) = instance.position() else {
            return;
        };

        let spatial = self.hearing.calculate(position);
        if spatial.audible {
            instance.set_positional_volume_and_pan(spatial.volume, spatial.pan);
        } else {
            instance.set_positional_volume(0.0);
        }
        instance.clear_moved();
    }

    // ============================================
    // Volume sliders
    // ============================================

    /// Set the master slider and push both effective volumes.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.sliders.set_master(volume);
        self.push_sound_volume();
        self.push_music_volume();
    }

    /// Set the sound-effect slider and push the effective sound volume.
    pub fn set_sound_volume(&mut self, volume: f32) {
        self.sliders.set_sound(volume);
        self.push_sound_volume();
    }

    /// Set the music slider and push the effective music volume.
    pub fn set_music_volume(&mut self, volume: f32) {
        self.sliders.set_music(volume);
        self.push_music_volume();
    }

    fn push_sound_volume(&self) {
        let volume = self.sliders.effective_sound();
        for sound in &self.sounds {
            sound.set_master_volume(volume);
        }
    }

    fn push_music_volume(&self) {
        let volume = self.sliders.effective_music();
        for music in self.current_music.iter().chain(&self.music_queue) {
            music.set_master_volume(volume);
        }
    }

    /// Current sliders.
    #[must_use]
    pub const fn sliders(&self) -> &VolumeSliders {
        &self.sliders
    }

    /// Master slider.
    #[must_use]
    pub const fn master_volume(&self) -> f32 {
        self.sliders.master()
    }

    /// Sound-effect slider.
    #[must_use]
    pub const fn sound_volume(&self) -> f32 {
        self.sliders.sound()
    }

    /// Music slider.
    #[must_use]
    pub const fn music_volume(&self) -> f32 {
        self.sliders.music()
    }

    /// `master × sound`.
    #[must_use]
    pub const fn effective_sound_volume(&self) -> f32 {
        self.sliders.effective_sound()
    }

    /// `master × music`.
    #[must_use]
    pub const fn effective_music_volume(&self) -> f32 {
        self.sliders.effective_music()
    }

    // ============================================
    // Music
    // ============================================

    /// Queue `clip` at full volume, centered.
    pub fn queue_music(&mut self, clip: &ClipDescriptor, looping: bool) -> MusicHandle {
        self.queue_music_with(clip, DEFAULT_VOLUME, 0.0, looping)
    }

    /// Queue `clip`. It starts right away if nothing is playing.
    pub fn queue_music_with(
        &mut self,
        clip: &ClipDescriptor,
        volume: f32,
        pan: f32,
        looping: bool,
    ) -> MusicHandle {
        let music = self.new_music(clip, volume, pan, looping);
        if self.current_music.is_none() {
            self.start_music(music.clone());
        } else {
            debug!("Queued music {} '{}'", clip.id, clip.name);
            self.music_queue.push_back(music.clone());
        }
        music
    }

    /// Replace the current track with `clip`, keeping the queue.
    pub fn play_music(&mut self, clip: &ClipDescriptor, looping: bool) -> MusicHandle {
        if let Some(current) = &self.current_music {
            current.stop();
        }
        self.release_current();

        let music = self.new_music(clip, DEFAULT_VOLUME, 0.0, looping);
        if !self.start_music(music.clone()) {
            self.advance_music();
        }
        music
    }

    /// Pause the current track.
    pub fn pause_music(&self) {
        if let Some(current) = &self.current_music {
            current.pause();
        }
    }

    /// Resume the current track.
    pub fn resume_music(&self) {
        if let Some(current) = &self.current_music {
            current.resume();
        }
    }

    /// Stop the current track and drop the queue.
    pub fn stop_music(&mut self) {
        if let Some(current) = &self.current_music {
            current.stop();
        }
        self.release_current();
        self.music_queue.clear();
    }

    /// Stop the current track and start the next queued one.
    pub fn skip_music(&mut self) {
        if let Some(current) = &self.current_music {
            current.stop();
        }
        self.release_current();
        self.advance_music();
    }

    /// Drop every queued track. The current track keeps playing.
    pub fn clear_music_queue(&mut self) {
        self.music_queue.clear();
    }

    /// Track holding the music channel.
    #[must_use]
    pub const fn current_music(&self) -> Option<&MusicHandle> {
        self.current_music.as_ref()
    }

    /// Tracks waiting for the music channel, next first.
    #[must_use]
    pub const fn queued_music(&self) -> &VecDeque<MusicHandle> {
        &self.music_queue
    }

    fn new_music(&self, clip: &ClipDescriptor, volume: f32, pan: f32, looping: bool) -> MusicHandle {
        MusicHandle::new(MusicInstance::new(
            clip.id,
            clip.duration,
            volume,
            self.sliders.effective_music(),
            pan,
            looping,
        ))
    }

    fn update_music(&mut self) {
        let Some(current) = self.current_music.clone() else {
            return;
        };
        current.update();
        if current.is_finished() {
            debug!("Music {} finished", current.clip());
            self.release_current();
            self.advance_music();
        }
    }

    fn start_music(&mut self, music: MusicHandle) -> bool {
        let Some(channel) = self.channel.take() else {
            warn!("Music channel is busy, cannot start {}", music.clip());
            return false;
        };
        match music.activate(channel) {
            Ok(()) => {
                info!("Playing music {}", music.clip());
                self.current_music = Some(music);
                true
            },
            Err(channel) => {
                self.channel = Some(channel);
                false
            },
        }
    }

    fn release_current(&mut self) {
        if let Some(current) = self.current_music.take() {
            match current.deactivate() {
                Some(channel) => self.channel = Some(channel),
                None => warn!("Current music {} did not hold the channel", current.clip()),
            }
        }
    }

    fn advance_music(&mut self) {
        while let Some(next) = self.music_queue.pop_front() {
            if self.start_music(next) {
                return;
            }
        }
    }

    // ============================================
    // Preferences
    // ============================================

    /// Apply stored sliders. Missing keys default to full volume.
    pub fn load_preferences(&mut self, store: &dyn VolumeStore) {
        let master = store.get_float(MASTER_VOLUME_KEY, DEFAULT_VOLUME);
        let sound = store.get_float(SOUND_VOLUME_KEY, DEFAULT_VOLUME);
        let music = store.get_float(MUSIC_VOLUME_KEY, DEFAULT_VOLUME);

        self.sliders.set_master(master);
        self.set_sound_volume(sound);
        self.set_music_volume(music);
        info!(
            "Loaded volume preferences (master {:.2}, sound {:.2}, music {:.2})",
            self.sliders.master(),
            self.sliders.sound(),
            self.sliders.music()
        );
    }

    /// Write the sliders and flush. Failures are logged.
    pub fn save_preferences(&self, store: &mut dyn VolumeStore) {
        store.put_float(MASTER_VOLUME_KEY, self.sliders.master());
        store.put_float(SOUND_VOLUME_KEY, self.sliders.sound());
        store.put_float(MUSIC_VOLUME_KEY, self.sliders.music());
        if let Err(e) = store.flush() {
            warn!("Failed to save volume preferences: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryStore;
    use crate::testing::{manual_clock, RecordingMusicBackend, RecordingSoundBackend};
    use cadence_common::ManualClock;
    use proptest::prelude::*;

    struct Rig {
        mixer: AudioMixer,
        sounds: Arc<RecordingSoundBackend>,
        music: Arc<RecordingMusicBackend>,
        clock: ManualClock,
    }

    fn rig(hear_range: f32) -> Rig {
        let sounds = RecordingSoundBackend::new();
        let music = RecordingMusicBackend::new();
        let (clock, shared) = manual_clock();
        let mixer = AudioMixer::new(
            sounds.clone(),
            music.clone(),
            shared,
            MixerConfig::default().with_hear_range(hear_range),
        );
        Rig {
            mixer,
            sounds,
            music,
            clock,
        }
    }

    fn clip(duration: f32) -> ClipDescriptor {
        ClipDescriptor::sound("sfx", duration)
    }

    #[test]
    fn test_play_sound_uses_effective_volume() {
        let mut rig = rig(100.0);
        rig.mixer.set_master_volume(0.5);
        let sound = rig
            .mixer
            .play_sound_with(&clip(1.0), SoundParams::new().with_volume(0.5).with_pitch(9.0));

        assert!((sound.raw_volume() - 0.25).abs() < 1e-6);
        assert!((sound.pitch() - 2.0).abs() < f32::EPSILON);
        assert_eq!(rig.mixer.active_sounds().len(), 1);
        assert_eq!(rig.sounds.started(), 1);
    }

    #[test]
    fn test_play_sound_at_halfway_right() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound_at(Vec2::new(50.0, 0.0), &clip(1.0));

        let instance = sound.lock();
        assert!((instance.positional_volume() - 0.5).abs() < 1e-6);
        assert!((instance.pan() - 1.0).abs() < 1e-6);
        assert!((instance.raw_volume() - 0.5).abs() < 1e-6);
        drop(instance);
        assert_eq!(rig.mixer.active_positional_sounds().len(), 1);
        assert_eq!(sound.positional_index(), Some(0));
    }

    #[test]
    fn test_out_of_range_returns_null_sound() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound_at(Vec2::new(150.0, 0.0), &clip(1.0));

        assert!(sound.is_null());
        assert!(sound.ptr_eq(rig.mixer.null_sound()));
        assert_eq!(rig.sounds.started(), 0);

        sound.pause();
        sound.stop();
        sound.set_relative_volume(1.0);
        assert!(rig.mixer.active_sounds().is_empty());
        assert!(rig.mixer.active_positional_sounds().is_empty());
        assert!(!sound.is_paused());
    }

    #[test]
    fn test_update_reaps_finished_sounds() {
        let mut rig = rig(100.0);
        let short = rig.mixer.play_sound(&clip(0.5));
        let long = rig.mixer.play_sound(&clip(2.0));

        rig.clock.advance_millis(600);
        rig.mixer.update();
        assert!(short.is_finished());
        assert_eq!(rig.mixer.active_sounds(), &[long]);
    }

    #[test]
    fn test_failed_play_is_reaped() {
        let mut rig = rig(100.0);
        rig.sounds.set_failing(true);
        let sound = rig.mixer.play_sound(&clip(1.0));
        assert!(sound.is_finished());

        rig.mixer.update();
        assert!(rig.mixer.active_sounds().is_empty());
    }

    #[test]
    fn test_positional_indices_stay_contiguous() {
        let mut rig = rig(1_000.0);
        let n = 8;
        let sounds: Vec<SoundHandle> = (0..n)
            .map(|i| {
                rig.mixer
                    .play_sound_at(Vec2::new(i as f32, 0.0), &clip(10.0))
            })
            .collect();

        sounds[n / 2].stop();
        rig.mixer.update();

        assert_eq!(sounds[n / 2].positional_index(), None);
        let mut indices: Vec<usize> = sounds
            .iter()
            .filter(|s| !s.is_finished())
            .filter_map(SoundHandle::positional_index)
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..n - 1).collect::<Vec<_>>());
        for (i, sound) in rig.mixer.active_positional_sounds().iter().enumerate() {
            assert_eq!(sound.positional_index(), Some(i));
        }
    }

    #[test]
    fn test_expired_positional_sound_leaves_both_lists() {
        let mut rig = rig(100.0);
        let keep = rig.mixer.play_sound_at(Vec2::new(10.0, 0.0), &clip(10.0));
        let short = rig.mixer.play_sound_at(Vec2::ZERO, &clip(0.1));
        short.set_position(Vec2::new(5.0, 0.0));
        short.set_relative_volume(0.5);

        rig.clock.advance_millis(200);
        rig.mixer.update();

        assert!(short.is_finished());
        assert_eq!(short.positional_index(), None);
        assert_eq!(rig.mixer.active_sounds(), &[keep.clone()]);
        assert_eq!(rig.mixer.active_positional_sounds(), vec![keep.clone()]);
        assert_eq!(keep.positional_index(), Some(0));
    }

    #[test]
    fn test_slider_changes_push_to_active_sounds() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound(&clip(1.0));

        rig.mixer.set_master_volume(0.5);
        rig.mixer.set_sound_volume(0.4);

        assert!((rig.mixer.effective_sound_volume() - 0.2).abs() < 1e-6);
        assert!((sound.raw_volume() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_listener_move_rederives_positional() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound_at(Vec2::new(50.0, 0.0), &clip(10.0));

        rig.mixer.set_listener_position(Vec2::new(50.0, 0.0));
        assert!((sound.raw_volume() - 1.0).abs() < 1e-6);
        assert!(sound.pan().abs() < 1e-6);

        rig.mixer.set_listener_position(Vec2::new(500.0, 0.0));
        assert!(sound.raw_volume().abs() < f32::EPSILON);
    }

    #[test]
    fn test_hear_range_change_rederives_positional() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound_at(Vec2::new(0.0, 50.0), &clip(10.0));

        rig.mixer.set_hear_range(-200.0);
        assert!((rig.mixer.hear_range() - 200.0).abs() < f32::EPSILON);
        assert!((sound.raw_volume() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_moved_sound_rederived_on_update() {
        let mut rig = rig(100.0);
        let sound = rig.mixer.play_sound_at(Vec2::ZERO, &clip(10.0));
        assert!((sound.raw_volume() - 1.0).abs() < 1e-6);

        sound.set_position(Vec2::new(-50.0, 0.0));
        assert!(sound.lock().is_moved());
        rig.mixer.update();

        assert!(!sound.lock().is_moved());
        assert!((sound.raw_volume() - 0.5).abs() < 1e-6);
        assert!((sound.pan() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pause_and_resume_all() {
        let mut rig = rig(100.0);
        let a = rig.mixer.play_sound(&clip(1.0));
        let b = rig.mixer.play_sound_at(Vec2::ZERO, &clip(1.0));

        rig.mixer.pause_all_sounds();
        assert!(a.is_paused() && b.is_paused());

        rig.clock.advance_millis(5_000);
        rig.mixer.update();
        assert_eq!(rig.mixer.active_sounds().len(), 2);

        rig.mixer.resume_all_sounds();
        assert!(!a.is_paused() && !b.is_paused());
    }

    #[test]
    fn test_stop_all_sounds() {
        let mut rig = rig(100.0);
        let a = rig.mixer.play_sound(&clip(1.0));
        let b = rig.mixer.play_sound_at(Vec2::ZERO, &clip(1.0));

        rig.mixer.stop_all_sounds();
        assert!(a.is_finished() && b.is_finished());
        assert_eq!(b.positional_index(), None);
        assert!(rig.mixer.active_sounds().is_empty());
        assert!(rig.mixer.active_positional_sounds().is_empty());
    }

    #[test]
    fn test_music_queue_advances_on_completion() {
        let mut rig = rig(100.0);
        let first = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        let second = rig.mixer.queue_music(&ClipDescriptor::music("b", 60.0), false);

        assert!(first.is_active());
        assert!(!second.is_active());
        assert_eq!(rig.mixer.queued_music().len(), 1);

        rig.music.complete();
        rig.mixer.update();

        assert!(first.is_finished());
        assert!(!first.is_active());
        assert!(second.is_active());
        assert!(rig.mixer.current_music().is_some_and(|m| m.ptr_eq(&second)));
        assert_eq!(rig.music.state().loaded, Some(second.clip()));
    }

    #[test]
    fn test_looping_music_does_not_advance() {
        let mut rig = rig(100.0);
        let theme = rig.mixer.queue_music(&ClipDescriptor::music("theme", 60.0), true);
        rig.mixer.queue_music(&ClipDescriptor::music("next", 60.0), false);

        rig.music.complete();
        rig.mixer.update();
        assert!(theme.is_active());
    }

    #[test]
    fn test_music_pause_resume() {
        let mut rig = rig(100.0);
        let theme = rig.mixer.queue_music(&ClipDescriptor::music("theme", 60.0), true);

        rig.mixer.pause_music();
        assert!(theme.is_paused());
        assert!(!rig.music.state().playing);

        rig.mixer.resume_music();
        assert!(rig.music.state().playing);
    }

    #[test]
    fn test_play_music_replaces_current() {
        let mut rig = rig(100.0);
        let first = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        rig.mixer.queue_music(&ClipDescriptor::music("b", 60.0), false);

        let urgent = rig.mixer.play_music(&ClipDescriptor::music("boss", 60.0), true);
        assert!(first.is_finished());
        assert!(urgent.is_active());
        assert_eq!(rig.mixer.queued_music().len(), 1);
    }

    #[test]
    fn test_skip_and_stop_music() {
        let mut rig = rig(100.0);
        let first = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        let second = rig.mixer.queue_music(&ClipDescriptor::music("b", 60.0), false);
        rig.mixer.queue_music(&ClipDescriptor::music("c", 60.0), false);

        rig.mixer.skip_music();
        assert!(first.is_finished());
        assert!(second.is_active());

        rig.mixer.stop_music();
        assert!(second.is_finished());
        assert!(rig.mixer.current_music().is_none());
        assert!(rig.mixer.queued_music().is_empty());

        let again = rig.mixer.queue_music(&ClipDescriptor::music("d", 60.0), false);
        assert!(again.is_active());
    }

    #[test]
    fn test_track_stopped_by_caller_returns_channel() {
        let mut rig = rig(100.0);
        let first = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        first.stop();
        rig.mixer.update();

        assert!(rig.mixer.current_music().is_none());
        assert!(!first.is_active());

        let second = rig.mixer.queue_music(&ClipDescriptor::music("b", 60.0), false);
        assert!(second.is_active());
        assert!(rig.mixer.queued_music().is_empty());
        assert_eq!(rig.music.state().loaded, Some(second.clip()));

        let third = rig.mixer.queue_music(&ClipDescriptor::music("c", 60.0), false);
        assert!(!third.is_active());
        assert_eq!(rig.mixer.queued_music().len(), 1);
    }

    #[test]
    fn test_refused_track_is_skipped() {
        let mut rig = rig(100.0);
        let bad = ClipDescriptor::music("bad", 60.0);
        rig.music.reject(bad.id);

        let first = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        let refused = rig.mixer.queue_music(&bad, false);
        let last = rig.mixer.queue_music(&ClipDescriptor::music("c", 60.0), false);

        first.stop();
        rig.mixer.update();
        assert!(refused.is_finished());
        assert!(last.is_active());
    }

    #[test]
    fn test_music_slider_pushes_to_queue() {
        let mut rig = rig(100.0);
        let current = rig.mixer.queue_music(&ClipDescriptor::music("a", 60.0), false);
        let queued = rig.mixer.queue_music(&ClipDescriptor::music("b", 60.0), false);

        rig.mixer.set_music_volume(0.5);
        rig.mixer.set_master_volume(0.5);
        assert!((current.raw_volume() - 0.25).abs() < 1e-6);
        assert!((queued.raw_volume() - 0.25).abs() < 1e-6);
        assert!((rig.music.state().volume - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_preferences_roundtrip() {
        let mut rig = rig(100.0);
        let mut store = MemoryStore::new();
        store.put_float(MASTER_VOLUME_KEY, 0.5);
        store.put_float(SOUND_VOLUME_KEY, 3.0);

        rig.mixer.load_preferences(&store);
        assert!((rig.mixer.master_volume() - 0.5).abs() < f32::EPSILON);
        assert!((rig.mixer.sound_volume() - 1.0).abs() < f32::EPSILON);
        assert!((rig.mixer.music_volume() - 1.0).abs() < f32::EPSILON);
        assert!((rig.mixer.effective_music_volume() - 0.5).abs() < f32::EPSILON);

        rig.mixer.set_music_volume(0.2);
        let mut saved = MemoryStore::new();
        rig.mixer.save_preferences(&mut saved);
        assert_eq!(saved.flush_count(), 1);
        assert!((saved.get_float(MUSIC_VOLUME_KEY, 1.0) - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mixer_config_from_toml() {
        let config: MixerConfig =
            toml::from_str("hear_range = 250.0\n[volumes]\nmaster = 0.5\n").expect("parse");
        assert!((config.hear_range - 250.0).abs() < f32::EPSILON);
        assert_eq!(config.max_voices, DEFAULT_MAX_VOICES);
        assert!((config.volumes.effective_sound() - 0.5).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn test_positional_volume_is_linear(x in -100.0f32..100.0, y in -100.0f32..100.0) {
            let mut rig = rig(100.0);
            let position = Vec2::new(x, y);
            let sound = rig.mixer.play_sound_at(position, &clip(1.0));

            let distance = position.length();
            if distance > 100.0 {
                prop_assert!(sound.is_null());
            } else {
                let expected = (1.0 - distance / 100.0).max(0.0);
                prop_assert!((sound.raw_volume() - expected).abs() < 1e-4);
                prop_assert!((sound.pan() - (x / 50.0).clamp(-1.0, 1.0)).abs() < 1e-4);
            }
        }
    }
}
