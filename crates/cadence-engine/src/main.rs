//! # Cadence
//!
//! Runs the demo scene against the default audio device for the configured
//! duration, then saves the volume preferences. Without an audio device the
//! loop still runs on the null backend.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use cadence_audio::preferences::TomlStore;
use cadence_common::{Clock, SystemClock};
use cadence_engine::{AudioStack, DemoClips, DemoScene, EngineConfig, SceneRunner};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("cadence=info".parse()?))
        .init();

    info!("Cadence starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load();

    // The stack keeps the device open until exit.
    let stack = AudioStack::open_or_silent(&config);
    let clips = DemoClips::resolve(&config.demo, stack.library());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let mut mixer = stack.mixer(clock, &config);

    let mut preferences = TomlStore::open_or_empty(config.preferences_path());
    mixer.load_preferences(&preferences);

    let mut scene = DemoScene::new(&mut mixer, clips, config.demo.clone());
    let mut runner = SceneRunner::new(config.tick_rate);

    let frame_budget = Duration::from_secs_f32(config.frame_budget_secs());
    let run_for = Duration::try_from_secs_f32(config.run_seconds.max(0.0)).unwrap_or(Duration::MAX);
    let start = Instant::now();
    let mut last_frame = start;

    while start.elapsed() < run_for {
        let frame_start = Instant::now();
        let delta = (frame_start - last_frame).as_secs_f32();
        last_frame = frame_start;

        runner.frame(&mut scene, &mut mixer, delta);

        if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    info!(
        "Ran {} frames and {} ticks in {:.2}s",
        runner.frames(),
        runner.ticks(),
        start.elapsed().as_secs_f32()
    );

    mixer.stop_all_sounds();
    mixer.stop_music();
    mixer.save_preferences(&mut preferences);

    drop(mixer);
    drop(stack);
    info!("Cadence shutdown complete");
    Ok(())
}
