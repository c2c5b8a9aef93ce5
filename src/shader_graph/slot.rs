//! Refcounted surface slots
//!
//! A [`SurfaceSlot`] pairs a surface with a shared reference token. The pool
//! keeps one copy of every slot; each task output or dependency that aliases
//! the slot holds another. The slot is free again once the pool's copy is the
//! only one left, so "free" is derived from the token's strong count and never
//! stored separately.

use std::fmt;
use std::sync::Arc;

use crate::backend::{OutputConfig, Surface, SurfaceId};

/// Shared token whose strong count tracks live references to a slot
#[derive(Debug)]
pub struct SlotToken;

/// A pooled surface plus its reference token.
///
/// Cloning a slot aliases it: both copies share the token and the surface.
#[derive(Clone, Default)]
pub struct SurfaceSlot {
    ref_id: Option<Arc<SlotToken>>,
    surface: Option<Arc<Surface>>,
}

impl SurfaceSlot {
    pub fn new(surface: Surface) -> Self {
        Self {
            ref_id: Some(Arc::new(SlotToken)),
            surface: Some(Arc::new(surface)),
        }
    }

    pub fn surface(&self) -> Option<&Arc<Surface>> {
        self.surface.as_ref()
    }

    pub fn surface_id(&self) -> Option<SurfaceId> {
        self.surface.as_ref().map(|s| s.id())
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_none()
    }

    /// True when no copy other than this one holds the reference token.
    pub fn is_free(&self) -> bool {
        self.ref_id
            .as_ref()
            .map_or(false, |r| Arc::strong_count(r) == 1)
    }

    pub fn is_valid_output(&self) -> bool {
        self.surface.is_some() && self.is_free()
    }

    pub fn matches(&self, config: &OutputConfig) -> bool {
        self.surface.as_ref().map_or(false, |s| s.matches(config))
    }

    pub fn has_ref_id(&self) -> bool {
        self.ref_id.is_some()
    }

    /// Number of live copies sharing this slot's token, 0 if it has none.
    pub fn reference_count(&self) -> usize {
        self.ref_id.as_ref().map_or(0, Arc::strong_count)
    }

    /// Check whether both slots alias the same pooled slot.
    pub fn shares_slot(&self, other: &SurfaceSlot) -> bool {
        match (&self.ref_id, &other.ref_id) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Stop counting this copy as a reference. The surface stays reachable.
    pub fn clear_reference_id(&mut self) {
        self.ref_id = None;
    }

    /// Detach this copy onto a fresh token, independent of the pool's count.
    pub fn create_reference_id(&mut self) {
        self.ref_id = Some(Arc::new(SlotToken));
    }

    /// Drop both the token and the surface reference.
    pub fn release(&mut self) {
        self.ref_id = None;
        self.surface = None;
    }

    pub fn take(&mut self) -> SurfaceSlot {
        std::mem::take(self)
    }
}

impl fmt::Debug for SurfaceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceSlot")
            .field("surface", &self.surface_id())
            .field("references", &self.reference_count())
            .finish()
    }
}
