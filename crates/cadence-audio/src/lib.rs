//! # Cadence Audio
//!
//! Orchestration layer for game audio on top of a "play a clip, get a handle"
//! primitive.
//!
//! This crate provides:
//! - Backend traits for sound effects and the single music channel
//! - `SoundInstance`: one in-flight sound with timer-based lifecycle tracking
//! - `MusicInstance`: one queued or playing music track
//! - `AudioMixer`: volume sliders, 2D listener, hear range and the per-frame
//!   update/reap cycle
//! - Clip duration probing and volume preference persistence
//! - Rodio-backed implementations of the backend traits
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         AudioMixer                           │
//! │  ┌──────────────┐  ┌───────────────┐  ┌──────────────────┐   │
//! │  │ active sounds│  │ positional    │  │ music queue      │   │
//! │  │ Vec<Sound..> │  │ BackRefList   │  │ + MusicChannel   │   │
//! │  └──────────────┘  └───────────────┘  └──────────────────┘   │
//! │          │                 │                    │            │
//! │          ▼                 ▼                    ▼            │
//! │     SoundBackend     SpatialParams         MusicBackend      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frame Cycle
//!
//! The host calls [`AudioMixer::update`] once per rendered frame after all game
//! logic has run. Finished sounds are reaped before positional attenuation is
//! re-derived, so removed instances are never recomputed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod backref;
pub mod clip;
pub mod mixer;
pub mod music;
pub mod preferences;
pub mod probe;
pub mod rodio_backend;
pub mod sound;
pub mod source;
pub mod spatial;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::backref::*;
    pub use crate::clip::*;
    pub use crate::mixer::*;
    pub use crate::music::*;
    pub use crate::preferences::*;
    pub use crate::sound::*;
    pub use crate::spatial::*;
    pub use crate::volume::*;
}

pub use prelude::*;
