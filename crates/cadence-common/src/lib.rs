//! # Cadence Common
//!
//! Common types and shared abstractions for the Cadence audio toolkit.
//!
//! This crate provides the leaf types used across all Cadence subsystems:
//! - Clip identifiers
//! - The monotonic clock used for playback bookkeeping
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod clock;
pub mod error;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_id_generation() {
        let a = ClipId::new();
        let b = ClipId::new();
        assert_ne!(a, b);
        assert!(!ClipId::NULL.is_valid());
    }

    #[test]
    fn test_manual_clock_is_shareable() {
        let clock = ManualClock::new();
        let shared: std::sync::Arc<dyn Clock> = std::sync::Arc::new(clock.clone());
        clock.advance_millis(5);
        assert_eq!(shared.now_nanos(), 5_000_000);
    }
}
