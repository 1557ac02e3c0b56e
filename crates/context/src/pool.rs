//! Surface pool: lends surfaces out as reference-counted proxies.
//!
//! The pool keeps only non-owning (`Weak`) references to the surfaces
//! registered with it; the owning context holds the strong ones. A lent
//! surface travels inside a [`SurfaceProxy`], which returns it to the free
//! list when dropped. If the pool itself is gone by then (the context was
//! resized or destroyed), the proxy simply lets go of the surface.
//!
//! # Thread safety
//!
//! `SurfacePool` is `Send + Sync`: worker threads may acquire and release
//! proxies concurrently with each other. Replacing the pool (a context reset
//! that changes the surface set) must not race with outstanding proxies;
//! callers drain them first.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use va_common::{ChromaType, ContextError, ContextResult, Resolution, VaId};

use crate::surface::Surface;

/// Format descriptor shared by every surface in a pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceFormat {
    pub chroma: ChromaType,
    pub resolution: Resolution,
    /// Opaque, hardware-only pixel representation (never mapped by software).
    pub encoded: bool,
}

impl SurfaceFormat {
    /// Hardware-only 4:2:0 working buffers of the given size.
    pub fn encoded_yuv420(resolution: Resolution) -> Self {
        Self {
            chroma: ChromaType::Yuv420,
            resolution,
            encoded: true,
        }
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    free: VecDeque<Weak<Surface>>,
    /// Number of surfaces registered via `add_object`.
    registered: usize,
    capacity: usize,
}

pub struct SurfacePool {
    format: SurfaceFormat,
    inner: Mutex<PoolInner>,
}

impl std::fmt::Debug for SurfacePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("SurfacePool")
            .field("format", &self.format)
            .field("capacity", &inner.capacity)
            .field("registered", &inner.registered)
            .field("free", &inner.free.len())
            .finish()
    }
}

impl SurfacePool {
    /// Create an empty pool with zero capacity.
    pub fn new(format: SurfaceFormat) -> Arc<Self> {
        Arc::new(Self {
            format,
            inner: Mutex::new(PoolInner::default()),
        })
    }

    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Set the maximum number of surfaces the pool accepts.
    ///
    /// Never evicts: lowering the capacity below the registered count only
    /// blocks further registration.
    pub fn set_capacity(&self, capacity: usize) {
        self.inner.lock().capacity = capacity;
    }

    /// Register a surface and put it on the free list.
    ///
    /// # Errors
    /// Returns `ContextError::AllocationFailure` if the pool is at capacity.
    pub fn add_object(&self, surface: &Arc<Surface>) -> ContextResult<()> {
        let mut inner = self.inner.lock();
        if inner.registered >= inner.capacity {
            return Err(ContextError::allocation(format!(
                "surface pool is full ({} of {})",
                inner.registered, inner.capacity
            )));
        }
        inner.free.try_reserve(1).map_err(|e| {
            ContextError::allocation(format!("surface pool free list: {e}"))
        })?;
        inner.registered += 1;
        inner.free.push_back(Arc::downgrade(surface));
        Ok(())
    }

    /// Take one free surface, or `None` if the pool is exhausted. Never blocks.
    pub fn acquire(self: &Arc<Self>) -> Option<SurfaceProxy> {
        let mut inner = self.inner.lock();
        while let Some(weak) = inner.free.pop_front() {
            if let Some(surface) = weak.upgrade() {
                return Some(SurfaceProxy {
                    surface,
                    pool: Arc::downgrade(self),
                });
            }
            // The owning set let go of this surface; forget it.
            inner.registered = inner.registered.saturating_sub(1);
        }
        None
    }

    /// Number of surfaces currently free. A snapshot under concurrent use.
    pub fn size(&self) -> usize {
        self.inner.lock().free.len()
    }

    pub fn registered(&self) -> usize {
        self.inner.lock().registered
    }

    fn release(&self, surface: &Arc<Surface>) {
        let mut inner = self.inner.lock();
        inner.free.push_back(Arc::downgrade(surface));
    }
}

/// A surface on loan from a [`SurfacePool`].
///
/// Dropping the proxy hands the surface back to its pool.
pub struct SurfaceProxy {
    surface: Arc<Surface>,
    pool: Weak<SurfacePool>,
}

impl std::fmt::Debug for SurfaceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceProxy")
            .field("surface", &self.surface.id())
            .field("pool_alive", &(self.pool.strong_count() > 0))
            .finish()
    }
}

impl SurfaceProxy {
    pub fn id(&self) -> VaId {
        self.surface.id()
    }

    pub fn surface(&self) -> &Arc<Surface> {
        &self.surface
    }
}

impl Deref for SurfaceProxy {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        &self.surface
    }
}

impl Drop for SurfaceProxy {
    fn drop(&mut self) {
        match self.pool.upgrade() {
            Some(pool) => pool.release(&self.surface),
            None => debug!(
                surface = %self.surface.id(),
                "Surface returned after its pool was torn down"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Display;
    use crate::software::SoftwareDriver;

    fn setup(count: usize) -> (SoftwareDriver, Arc<SurfacePool>, Vec<Arc<Surface>>) {
        let driver = SoftwareDriver::new();
        let display = Arc::new(Display::new(driver.clone()));
        let pool = SurfacePool::new(SurfaceFormat::encoded_yuv420(Resolution::new(64, 64)));
        pool.set_capacity(count);
        let surfaces: Vec<_> = (0..count)
            .map(|_| Arc::new(Surface::new(&display, ChromaType::Yuv420, 64, 64).unwrap()))
            .collect();
        for surface in &surfaces {
            pool.add_object(surface).unwrap();
        }
        (driver, pool, surfaces)
    }

    // ── Construction ─────────────────────────────────────────────

    #[test]
    fn new_pool_is_empty() {
        let pool = SurfacePool::new(SurfaceFormat::encoded_yuv420(Resolution::HD));
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.capacity(), 0);
        assert!(pool.acquire().is_none());
        assert!(pool.format().encoded);
    }

    #[test]
    fn add_beyond_capacity_fails() {
        let (_driver, pool, surfaces) = setup(2);
        let err = pool.add_object(&surfaces[0]).unwrap_err();
        assert!(matches!(err, ContextError::AllocationFailure { .. }));
        assert_eq!(pool.registered(), 2);
    }

    // ── Acquire / Release ────────────────────────────────────────

    #[test]
    fn acquire_until_exhausted() {
        let (_driver, pool, _surfaces) = setup(3);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!(pool.size(), 0);
        assert!(pool.acquire().is_none());
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), c.id());
    }

    #[test]
    fn dropping_proxy_returns_surface() {
        let (_driver, pool, _surfaces) = setup(1);
        let proxy = pool.acquire().unwrap();
        let id = proxy.id();
        assert_eq!(pool.size(), 0);

        drop(proxy);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.acquire().unwrap().id(), id);
    }

    #[test]
    fn proxy_outliving_pool_keeps_surface_alive() {
        let (driver, pool, surfaces) = setup(2);
        let proxy = pool.acquire().unwrap();

        drop(pool);
        drop(surfaces);
        // One surface is still on loan.
        assert_eq!(driver.live_surfaces(), 1);
        assert!(proxy.id().is_valid());

        drop(proxy);
        assert_eq!(driver.live_surfaces(), 0);
    }

    #[test]
    fn released_set_is_skipped_by_acquire() {
        let (_driver, pool, surfaces) = setup(2);
        drop(surfaces);
        assert!(pool.acquire().is_none());
        assert_eq!(pool.registered(), 0);
    }

    #[test]
    fn debug_format() {
        let (_driver, pool, _surfaces) = setup(2);
        let dbg = format!("{pool:?}");
        assert!(dbg.contains("SurfacePool"));
        assert!(dbg.contains("capacity: 2"));
    }
}
