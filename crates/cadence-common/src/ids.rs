//! ID types for audio resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for clip IDs.
static CLIP_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Identifier of a loaded sound or music clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(u32);

impl ClipId {
    /// The clip id carried by the null sound and by invalid playback handles.
    pub const NULL: Self = Self(u32::MAX);

    /// Allocates a new process-unique clip ID.
    #[must_use]
    pub fn new() -> Self {
        Self(CLIP_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a clip ID from a raw value.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if this is a real (non-null) clip.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "clip#{}", self.0)
        } else {
            f.write_str("clip#null")
        }
    }
}

/// Whether a clip is a short sound effect or a streamed music track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    /// One-shot or looping sound effect.
    #[default]
    Sound,
    /// Background music track.
    Music,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_clip_is_invalid() {
        assert!(!ClipId::NULL.is_valid());
        assert_eq!(ClipId::NULL.to_string(), "clip#null");
    }

    #[test]
    fn test_clip_display() {
        assert_eq!(ClipId::from_raw(7).to_string(), "clip#7");
    }

    #[test]
    fn test_new_ids_increase() {
        let a = ClipId::new();
        let b = ClipId::new();
        assert!(b > a);
        assert!(a.is_valid());
    }
}
