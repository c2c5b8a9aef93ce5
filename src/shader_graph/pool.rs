//! Surface pool with refcount-based reuse.
//!
//! The pool owns one copy of every [`SurfaceSlot`] it ever created. Acquiring
//! a config returns a clone of the oldest free slot that matches it, or
//! allocates a new surface through the backend when none does. Slots are only
//! destroyed by [`SurfacePool::clear`].
//!
//! # Example
//!
//! ```
//! use shader_graph::backend::{DummyBackend, OutputConfig};
//! use shader_graph::shader_graph::SurfacePool;
//!
//! let mut backend = DummyBackend::new();
//! let mut pool = SurfacePool::new();
//! let config = OutputConfig::default();
//!
//! let first = pool.acquire(&config, &mut backend);
//! let first_id = first.surface_id();
//! drop(first);
//!
//! // The released slot is reused instead of allocating again.
//! let second = pool.acquire(&config, &mut backend);
//! assert_eq!(second.surface_id(), first_id);
//! assert_eq!(backend.surfaces_created(), 1);
//! ```

use crate::backend::{OutputConfig, RenderBackend};

use super::slot::SurfaceSlot;

/// Counters describing pool activity since creation or the last clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of `acquire` calls
    pub acquisitions: u64,
    /// Acquisitions served by an existing free slot
    pub reused: u64,
    /// Acquisitions that allocated a new surface
    pub created: u64,
    /// Acquisitions that returned an empty slot
    pub failed: u64,
}

/// Growable set of refcounted surface slots.
#[derive(Debug, Default)]
pub struct SurfacePool {
    slots: Vec<SurfaceSlot>,
    stats: PoolStats,
}

impl SurfacePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first free slot matching `config`, in insertion order.
    pub fn find_free(&self, config: &OutputConfig) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_valid_output() && slot.matches(config))
    }

    /// Find or create a slot for `config`.
    ///
    /// Returns an empty slot when `config` is invalid or the backend fails to
    /// allocate; the failure is logged and nothing is added to the pool.
    pub fn acquire(
        &mut self,
        config: &OutputConfig,
        backend: &mut dyn RenderBackend,
    ) -> SurfaceSlot {
        self.stats.acquisitions += 1;

        if let Some(index) = self.find_free(config) {
            self.stats.reused += 1;
            log::trace!(
                "SurfacePool: reusing slot {} for {}x{} {:?}",
                index,
                config.width,
                config.height,
                config.format
            );
            return self.slots[index].clone();
        }

        if !config.is_valid() {
            self.stats.failed += 1;
            log::warn!(
                "SurfacePool: refusing to allocate invalid config {}x{}",
                config.width,
                config.height
            );
            return SurfaceSlot::default();
        }

        let label = format!("pooled_surface_{}", self.slots.len());
        match backend.create_surface(config, Some(&label)) {
            Ok(surface) => {
                log::debug!(
                    "SurfacePool: created {:?} {}x{} {:?} via {}",
                    surface.id(),
                    config.width,
                    config.height,
                    config.format,
                    backend.name()
                );
                let slot = SurfaceSlot::new(surface);
                self.slots.push(slot.clone());
                self.stats.created += 1;
                slot
            }
            Err(err) => {
                self.stats.failed += 1;
                log::warn!("SurfacePool: surface creation failed: {}", err);
                SurfaceSlot::default()
            }
        }
    }

    /// Drop every slot and release the backing surfaces.
    ///
    /// Callers must make sure no task still holds a slot from this pool.
    pub fn clear(&mut self) {
        log::debug!("SurfacePool: clearing {} slots", self.slots.len());
        self.slots.clear();
        self.stats = PoolStats::default();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_free()).count()
    }

    /// True when no task or dependency holds any slot.
    pub fn all_free(&self) -> bool {
        self.slots.iter().all(SurfaceSlot::is_free)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurfaceSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, PixelFormat};

    fn config(size: u32) -> OutputConfig {
        OutputConfig::new(size, size, PixelFormat::Rgba16Float)
    }

    #[test]
    fn test_distinct_configs_never_alias() {
        let mut backend = DummyBackend::new();
        let mut pool = SurfacePool::new();

        // `a` stays held while `b` is acquired.
        let a = pool.acquire(&config(64), &mut backend);
        let b = pool.acquire(&config(128), &mut backend);

        assert!(!a.shares_slot(&b));
        assert_ne!(a.surface_id(), b.surface_id());
        assert!(a.matches(&config(64)));

        assert_eq!(pool.len(), 2);
        assert!(b.matches(&config(128)));
        assert_eq!(backend.surfaces_created(), 2);
    }

    #[test]
    fn test_held_slot_is_not_reused() {
        let mut backend = DummyBackend::new();
        let mut pool = SurfacePool::new();

        let a = pool.acquire(&config(64), &mut backend);
        let b = pool.acquire(&config(64), &mut backend);

        assert!(!a.shares_slot(&b));
        assert_eq!(pool.free_count(), 0);
        assert_eq!(pool.stats().created, 2);
    }

    #[test]
    fn test_oldest_free_slot_wins() {
        let mut backend = DummyBackend::new();
        let mut pool = SurfacePool::new();

        let a = pool.acquire(&config(64), &mut backend);
        let b = pool.acquire(&config(64), &mut backend);
        let first_id = a.surface_id();
        drop(b);
        drop(a);

        let c = pool.acquire(&config(64), &mut backend);
        assert_eq!(c.surface_id(), first_id);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_failure_leaves_pool_untouched() {
        let mut backend = DummyBackend::new();
        backend.set_fail_surface_creation(true);
        let mut pool = SurfacePool::new();

        let slot = pool.acquire(&config(64), &mut backend);
        assert!(slot.is_empty());
        assert!(pool.is_empty());
        assert_eq!(pool.stats().failed, 1);

        let slot = pool.acquire(&OutputConfig::invalid(), &mut backend);
        assert!(slot.is_empty());
        assert_eq!(pool.stats().failed, 2);
    }

    #[test]
    fn test_clear_drops_slots() {
        let mut backend = DummyBackend::new();
        let mut pool = SurfacePool::new();
        drop(pool.acquire(&config(64), &mut backend));

        pool.clear();
        assert!(pool.is_empty());

        drop(pool.acquire(&config(64), &mut backend));
        assert_eq!(backend.surfaces_created(), 2);
    }
}
