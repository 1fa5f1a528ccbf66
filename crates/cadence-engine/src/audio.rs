//! Audio backends and clip library for a run.
//!
//! [`AudioStack::open`] opens the default output device and decodes the demo
//! clips into rodio backends. Without a device, [`AudioStack::silent`] runs
//! the same loop on the null backend with probed clip descriptors.

use std::sync::Arc;

use cadence_audio::backend::{MusicBackend, NullBackend, SoundBackend};
use cadence_audio::clip::ClipLibrary;
use cadence_audio::mixer::AudioMixer;
use cadence_audio::rodio_backend::{AudioDevice, RodioMusicBackend, RodioSoundBackend};
use cadence_common::{CadenceResult, Clock};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::demo::DemoClips;

/// Playback backends and the clips registered for them.
pub struct AudioStack {
    sounds: Arc<dyn SoundBackend>,
    music: Arc<dyn MusicBackend>,
    library: ClipLibrary,
    // Dropped last so no sink outlives the stream.
    device: Option<AudioDevice>,
}

impl std::fmt::Debug for AudioStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStack")
            .field("clips", &self.library.len())
            .field("device", &self.device.is_some())
            .finish_non_exhaustive()
    }
}

impl AudioStack {
    /// Open the default output device and load the demo clips into it.
    pub fn open(config: &EngineConfig) -> CadenceResult<Self> {
        let device = AudioDevice::new()?;
        let sounds = RodioSoundBackend::new(&device, config.max_voices);
        let music = RodioMusicBackend::new(&device);

        let mut library = ClipLibrary::new();
        DemoClips::load_into(&config.demo, &sounds, &music, &mut library);
        info!("{} clips loaded", library.len());

        Ok(Self {
            sounds: Arc::new(sounds),
            music: Arc::new(music),
            library,
            device: Some(device),
        })
    }

    /// Null backends with clip durations probed from disk.
    #[must_use]
    pub fn silent(config: &EngineConfig) -> Self {
        let mut library = ClipLibrary::new();
        DemoClips::probe_into(&config.demo, &mut library);
        info!("{} clips probed for a silent run", library.len());

        Self {
            sounds: Arc::new(NullBackend),
            music: Arc::new(NullBackend),
            library,
            device: None,
        }
    }

    /// [`open`](Self::open), falling back to [`silent`](Self::silent).
    #[must_use]
    pub fn open_or_silent(config: &EngineConfig) -> Self {
        Self::open(config).unwrap_or_else(|e| {
            warn!("{}, continuing without sound", e);
            Self::silent(config)
        })
    }

    /// Build a mixer over these backends.
    #[must_use]
    pub fn mixer(&self, clock: Arc<dyn Clock>, config: &EngineConfig) -> AudioMixer {
        AudioMixer::new(
            Arc::clone(&self.sounds),
            Arc::clone(&self.music),
            clock,
            config.mixer_config(),
        )
    }

    /// Registered clips.
    #[must_use]
    pub const fn library(&self) -> &ClipLibrary {
        &self.library
    }

    /// Whether an output device is open.
    #[must_use]
    pub const fn has_device(&self) -> bool {
        self.device.is_some()
    }
}
