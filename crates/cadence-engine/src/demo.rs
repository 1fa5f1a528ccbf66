//! Headless demo scene.
//!
//! Loops a positional sound at the origin and moves the listener around it
//! in a circle, so the loop fades and pans as the listener orbits. Every tick
//! plays a plain one-shot. A looping music track is queued at start, and the
//! loop and music are paused and resumed together on a timer.

use std::path::{Path, PathBuf};

use cadence_audio::clip::{ClipDescriptor, ClipLibrary};
use cadence_audio::mixer::AudioMixer;
use cadence_audio::probe::probe_file;
use cadence_audio::rodio_backend::{RodioMusicBackend, RodioSoundBackend};
use cadence_audio::sound::{SoundHandle, SoundParams};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scene::{Scene, SceneContext};

/// Demo scene settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// One-shot played every tick
    pub tick_sound: PathBuf,
    /// Loop placed at the origin
    pub loop_sound: PathBuf,
    /// Music track queued at start
    pub music: PathBuf,
    /// Listener orbit radius in world units
    pub orbit_radius: f32,
    /// Listener angular speed in radians per second
    pub orbit_speed: f32,
    /// Seconds between pause toggles (<= 0 never toggles)
    pub pause_toggle_secs: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tick_sound: PathBuf::from("assets/hurt.wav"),
            loop_sound: PathBuf::from("assets/test.wav"),
            music: PathBuf::from("assets/sweden.mp3"),
            orbit_radius: 240.0,
            orbit_speed: 0.5,
            pause_toggle_secs: 4.0,
        }
    }
}

/// Clips used by the demo.
#[derive(Debug, Clone)]
pub struct DemoClips {
    /// One-shot played every tick.
    pub tick_sound: ClipDescriptor,
    /// Positional loop.
    pub loop_sound: ClipDescriptor,
    /// Music track.
    pub music: ClipDescriptor,
}

impl DemoClips {
    /// Decode the demo clips into the rodio backends and register them in
    /// `library`. Clips that fail to load are left out.
    pub fn load_into(
        config: &DemoConfig,
        sounds: &RodioSoundBackend,
        music: &RodioMusicBackend,
        library: &mut ClipLibrary,
    ) {
        let loads = [
            (&config.tick_sound, sounds.load_sound(&config.tick_sound)),
            (&config.loop_sound, sounds.load_sound(&config.loop_sound)),
            (&config.music, music.load_music(&config.music)),
        ];
        for (path, loaded) in loads {
            match loaded {
                Ok(clip) => {
                    library.register(clip);
                },
                Err(e) => warn!("Demo clip {} unavailable: {}", path.display(), e),
            }
        }
    }

    /// Register descriptors for a silent run: durations are probed from the
    /// files but nothing is decoded for playback.
    pub fn probe_into(config: &DemoConfig, library: &mut ClipLibrary) {
        for path in [&config.tick_sound, &config.loop_sound] {
            library.register(ClipDescriptor::sound(stem(path), probe_file(path)));
        }
        library.register(ClipDescriptor::music(stem(&config.music), probe_file(&config.music)));
    }

    /// Look the demo clips up by file stem. Unregistered clips resolve to
    /// the null clip.
    #[must_use]
    pub fn resolve(config: &DemoConfig, library: &ClipLibrary) -> Self {
        let find = |path: &PathBuf| {
            library
                .get_by_name(&stem(path))
                .cloned()
                .unwrap_or_else(ClipDescriptor::null)
        };
        Self {
            tick_sound: find(&config.tick_sound),
            loop_sound: find(&config.loop_sound),
            music: find(&config.music),
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

/// The demo scene.
#[derive(Debug)]
pub struct DemoScene {
    clips: DemoClips,
    config: DemoConfig,
    loop_sound: SoundHandle,
    listener: Vec2,
    angle: f32,
    paused: bool,
    toggle_timer: f32,
}

impl DemoScene {
    /// Start the loop and queue the music.
    pub fn new(mixer: &mut AudioMixer, clips: DemoClips, config: DemoConfig) -> Self {
        let loop_sound = mixer.play_sound_at_with(
            Vec2::ZERO,
            &clips.loop_sound,
            SoundParams::new().with_looping(true),
        );
        mixer.queue_music(&clips.music, true);
        info!("Demo scene started");

        let listener = Vec2::new(config.orbit_radius, 0.0);
        Self {
            clips,
            config,
            loop_sound,
            listener,
            angle: 0.0,
            paused: false,
            toggle_timer: 0.0,
        }
    }

    /// Pause or resume the loop and the music together.
    pub fn toggle_pause(&mut self, mixer: &AudioMixer) {
        self.paused = !self.paused;
        if self.paused {
            self.loop_sound.pause();
            mixer.pause_music();
        } else {
            self.loop_sound.resume();
            mixer.resume_music();
        }
        debug!("Demo paused: {}", self.paused);
    }

    /// The positional loop.
    #[must_use]
    pub const fn loop_sound(&self) -> &SoundHandle {
        &self.loop_sound
    }

    /// Current listener position.
    #[must_use]
    pub const fn listener(&self) -> Vec2 {
        self.listener
    }

    /// Whether the loop and music are paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Scene for DemoScene {
    fn tick(&mut self, ctx: &mut SceneContext<'_>) {
        ctx.mixer.play_sound(&self.clips.tick_sound);
    }

    fn render(&mut self, ctx: &mut SceneContext<'_>, _alpha: f32) {
        self.angle = (self.angle + self.config.orbit_speed * ctx.delta) % std::f32::consts::TAU;
        self.listener = Vec2::from_angle(self.angle) * self.config.orbit_radius;
        ctx.mixer.set_listener_position(self.listener);

        if self.config.pause_toggle_secs > 0.0 {
            self.toggle_timer += ctx.delta;
            if self.toggle_timer >= self.config.pause_toggle_secs {
                self.toggle_timer -= self.config.pause_toggle_secs;
                self.toggle_pause(ctx.mixer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadence_audio::backend::NullBackend;
    use cadence_audio::mixer::MixerConfig;
    use cadence_common::ManualClock;

    use crate::scene::SceneRunner;

    fn mixer() -> AudioMixer {
        AudioMixer::new(
            Arc::new(NullBackend),
            Arc::new(NullBackend),
            Arc::new(ManualClock::new()),
            MixerConfig::default().with_hear_range(500.0),
        )
    }

    fn clips() -> DemoClips {
        DemoClips {
            tick_sound: ClipDescriptor::sound("hurt", 0.5),
            loop_sound: ClipDescriptor::sound("test", 2.0),
            music: ClipDescriptor::music("sweden", 120.0),
        }
    }

    #[test]
    fn test_listener_orbits() {
        let mut mixer = mixer();
        let config = DemoConfig {
            orbit_radius: 100.0,
            orbit_speed: std::f32::consts::FRAC_PI_2,
            pause_toggle_secs: 0.0,
            ..DemoConfig::default()
        };
        let mut scene = DemoScene::new(&mut mixer, clips(), config);
        let mut runner = SceneRunner::new(0.0);

        runner.frame(&mut scene, &mut mixer, 1.0);
        assert!(scene.listener().abs_diff_eq(Vec2::new(0.0, 100.0), 1e-3));
        assert!(mixer.listener_position().abs_diff_eq(scene.listener(), 1e-6));

        runner.frame(&mut scene, &mut mixer, 1.0);
        assert!(scene.listener().abs_diff_eq(Vec2::new(-100.0, 0.0), 1e-3));
    }

    #[test]
    fn test_pause_toggles_on_timer() {
        let mut mixer = mixer();
        let config = DemoConfig {
            pause_toggle_secs: 1.0,
            ..DemoConfig::default()
        };
        let mut scene = DemoScene::new(&mut mixer, clips(), config);
        let mut runner = SceneRunner::new(0.0);

        runner.frame(&mut scene, &mut mixer, 0.6);
        assert!(!scene.is_paused());
        runner.frame(&mut scene, &mut mixer, 0.6);
        assert!(scene.is_paused());
        runner.frame(&mut scene, &mut mixer, 1.0);
        assert!(!scene.is_paused());
    }

    #[test]
    fn test_manual_toggle() {
        let mut mixer = mixer();
        let mut scene = DemoScene::new(&mut mixer, clips(), DemoConfig::default());
        scene.toggle_pause(&mixer);
        assert!(scene.is_paused());
        scene.toggle_pause(&mixer);
        assert!(!scene.is_paused());
    }

    #[test]
    fn test_silent_run_degrades() {
        let mut mixer = mixer();
        let mut scene = DemoScene::new(&mut mixer, clips(), DemoConfig::default());
        let mut runner = SceneRunner::new(0.2);

        for _ in 0..30 {
            runner.frame(&mut scene, &mut mixer, 1.0 / 60.0);
        }

        assert_eq!(runner.ticks(), 2);
        // Nothing can play on the null backend, so everything is reaped.
        assert!(scene.loop_sound().is_finished());
        assert!(mixer.active_sounds().is_empty());
        assert!(mixer.current_music().is_none());
    }

    #[test]
    fn test_probed_clips_resolve_by_stem() {
        let config = DemoConfig {
            tick_sound: PathBuf::from("/nonexistent/cadence/hurt.wav"),
            ..DemoConfig::default()
        };
        let mut library = ClipLibrary::new();
        DemoClips::probe_into(&config, &mut library);

        let clips = DemoClips::resolve(&config, &library);
        assert_eq!(clips.tick_sound.name, "hurt");
        assert!(clips.tick_sound.duration.abs() < f32::EPSILON);
        assert_eq!(library.get_by_name("hurt"), Some(&clips.tick_sound));
    }

    #[test]
    fn test_unregistered_clips_resolve_to_null() {
        let mut library = ClipLibrary::new();
        library.register(ClipDescriptor::sound("hurt", 0.5));

        let clips = DemoClips::resolve(&DemoConfig::default(), &library);
        assert!(!clips.tick_sound.is_null());
        assert!((clips.tick_sound.duration - 0.5).abs() < f32::EPSILON);
        assert!(clips.loop_sound.is_null());
        assert!(clips.music.is_null());
    }
}
