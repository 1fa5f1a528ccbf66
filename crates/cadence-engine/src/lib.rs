//! # Cadence Engine
//!
//! Headless host for the Cadence audio mixer.
//!
//! This crate provides:
//! - `AudioStack`: the rodio device and backends, or null backends for a
//!   silent run, with the registered clip library
//! - `EngineConfig`: TOML-backed loop, mixer and demo settings
//! - `SceneRunner`: fixed-timestep tick accumulator that runs the mixer's
//!   frame cycle once per rendered frame
//! - `DemoScene`: a positional loop orbited by the listener, a one-shot per
//!   tick and a queued music track

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod audio;
pub mod config;
pub mod demo;
pub mod scene;

pub use audio::AudioStack;
pub use config::EngineConfig;
pub use demo::{DemoClips, DemoConfig, DemoScene};
pub use scene::{Scene, SceneContext, SceneRunner};
