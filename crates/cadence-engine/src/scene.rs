//! Fixed-timestep scene loop.
//!
//! A [`Scene`] ticks at a fixed rate and renders once per frame. The
//! [`SceneRunner`] owns the tick accumulator and runs the mixer's frame
//! cycle after the scene has finished with the frame, so sounds started or
//! moved this frame are seen by the same frame's update.

use cadence_audio::mixer::AudioMixer;
use tracing::trace;

/// Per-call view of the engine handed to a scene.
pub struct SceneContext<'a> {
    /// The audio mixer.
    pub mixer: &'a mut AudioMixer,
    /// Seconds since the previous frame.
    pub delta: f32,
}

/// Game logic driven by a [`SceneRunner`].
pub trait Scene {
    /// Fixed-rate update. The default does nothing.
    fn tick(&mut self, _ctx: &mut SceneContext<'_>) {}

    /// Per-frame update. `alpha` is the fraction of a tick accumulated since
    /// the last tick, for interpolation.
    fn render(&mut self, ctx: &mut SceneContext<'_>, alpha: f32);
}

/// Drives a scene at a fixed tick rate.
#[derive(Debug, Clone)]
pub struct SceneRunner {
    tick_rate: f32,
    accumulator: f32,
    alpha: f32,
    frames: u64,
    ticks: u64,
}

impl SceneRunner {
    /// Create a runner ticking every `tick_rate` seconds. A rate of zero or
    /// less never ticks.
    #[must_use]
    pub const fn new(tick_rate: f32) -> Self {
        Self {
            tick_rate,
            accumulator: 0.0,
            alpha: 0.0,
            frames: 0,
            ticks: 0,
        }
    }

    /// Run one frame: the due ticks, one render, then the mixer update.
    ///
    /// Returns how many ticks ran.
    pub fn frame(&mut self, scene: &mut dyn Scene, mixer: &mut AudioMixer, delta: f32) -> u32 {
        let delta = delta.max(0.0);
        let mut ctx = SceneContext { mixer, delta };

        let mut ticked = 0;
        if self.tick_rate > 0.0 {
            self.accumulator += delta;
            while self.accumulator >= self.tick_rate {
                scene.tick(&mut ctx);
                self.accumulator -= self.tick_rate;
                ticked += 1;
            }
            self.alpha = self.accumulator / self.tick_rate;
        }

        scene.render(&mut ctx, self.alpha);
        ctx.mixer.update();

        self.frames += 1;
        self.ticks += u64::from(ticked);
        trace!("Frame {} ran {} tick(s), alpha {:.3}", self.frames, ticked, self.alpha);
        ticked
    }

    /// Seconds between ticks.
    #[must_use]
    pub const fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    /// Interpolation factor of the last frame.
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Frames run so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}
