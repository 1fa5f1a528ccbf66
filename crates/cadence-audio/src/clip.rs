//! Clip descriptors and the clip library.
//!
//! A clip is a loaded sound or music asset. Its duration is probed once at
//! load time and never changes afterwards.

use std::collections::HashMap;

use cadence_common::ClipId;
pub use cadence_common::ClipKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Immutable description of a loaded clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// Clip identifier used by the backends.
    pub id: ClipId,
    /// Whether the clip is a sound effect or a music track.
    pub kind: ClipKind,
    /// Human-readable name, usually the file path.
    pub name: String,
    /// Duration in seconds.
    pub duration: f32,
}

impl ClipDescriptor {
    /// Create a descriptor with a freshly allocated id.
    #[must_use]
    pub fn new(kind: ClipKind, name: impl Into<String>, duration: f32) -> Self {
        Self::with_id(ClipId::new(), kind, name, duration)
    }

    /// Create a descriptor for an existing id.
    #[must_use]
    pub fn with_id(id: ClipId, kind: ClipKind, name: impl Into<String>, duration: f32) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            duration: duration.max(0.0),
        }
    }

    /// Descriptor for a sound effect.
    #[must_use]
    pub fn sound(name: impl Into<String>, duration: f32) -> Self {
        Self::new(ClipKind::Sound, name, duration)
    }

    /// Descriptor for a music track.
    #[must_use]
    pub fn music(name: impl Into<String>, duration: f32) -> Self {
        Self::new(ClipKind::Music, name, duration)
    }

    /// The null clip, used by the null sound instance.
    #[must_use]
    pub fn null() -> Self {
        Self {
            id: ClipId::NULL,
            kind: ClipKind::Sound,
            name: String::new(),
            duration: 0.0,
        }
    }

    /// Whether this is the null clip.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        !self.id.is_valid()
    }
}

/// Registry of loaded clips.
#[derive(Debug, Default)]
pub struct ClipLibrary {
    clips: HashMap<ClipId, ClipDescriptor>,
    by_name: HashMap<String, ClipId>,
}

impl ClipLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a clip. A clip already registered under the same name is
    /// replaced.
    pub fn register(&mut self, descriptor: ClipDescriptor) -> ClipId {
        let id = descriptor.id;
        if let Some(old) = self.by_name.insert(descriptor.name.clone(), id) {
            if old != id {
                self.clips.remove(&old);
            }
        }
        debug!(
            "Registered {:?} clip {} '{}' ({:.3}s)",
            descriptor.kind, id, descriptor.name, descriptor.duration
        );
        self.clips.insert(id, descriptor);
        id
    }

    /// Look up a clip by id.
    #[must_use]
    pub fn get(&self, id: ClipId) -> Option<&ClipDescriptor> {
        self.clips.get(&id)
    }

    /// Look up a clip by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ClipDescriptor> {
        self.by_name.get(name).and_then(|id| self.clips.get(id))
    }

    /// Duration of a clip in seconds, or 0.0 if unknown.
    #[must_use]
    pub fn duration(&self, id: ClipId) -> f32 {
        self.clips.get(&id).map_or(0.0, |clip| clip.duration)
    }

    /// Remove a clip.
    pub fn remove(&mut self, id: ClipId) -> Option<ClipDescriptor> {
        let clip = self.clips.remove(&id)?;
        self.by_name.remove(&clip.name);
        Some(clip)
    }

    /// Number of registered clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Iterate over all clips.
    pub fn iter(&self) -> impl Iterator<Item = &ClipDescriptor> {
        self.clips.values()
    }
}
