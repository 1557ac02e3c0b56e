//! Surface set: the context's owned surfaces and the pool built over them.
//!
//! The set is sized to the worst-case reference-frame requirement plus a
//! fixed scratch margin for in-flight work:
//!
//! ```text
//! required = ref_frames + SCRATCH_SURFACES_COUNT
//! ```
//!
//! Growth is incremental: only surfaces beyond the current count are
//! allocated. The set never shrinks; a resize tears the whole set down with
//! [`SurfaceSet::destroy`] and builds again from zero.

use std::sync::Arc;

use tracing::{debug, info};

use va_common::{ChromaType, ContextError, ContextInfo, ContextResult, VaId};

use crate::context::SessionId;
use crate::display::Display;
use crate::pool::{SurfaceFormat, SurfacePool, SurfaceProxy};
use crate::surface::Surface;

/// Surfaces allocated beyond the declared reference frames.
pub const SCRATCH_SURFACES_COUNT: u32 = 4;

/// Number of surfaces a context needs for `info`.
pub fn required_surfaces(info: &ContextInfo) -> usize {
    info.ref_frames as usize + SCRATCH_SURFACES_COUNT as usize
}

pub struct SurfaceSet {
    display: Arc<Display>,
    owner: SessionId,
    surfaces: Option<Vec<Arc<Surface>>>,
    pool: Option<Arc<SurfacePool>>,
}

impl std::fmt::Debug for SurfaceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSet")
            .field("owner", &self.owner)
            .field("surfaces", &self.len())
            .field("free", &self.free_count())
            .finish()
    }
}

impl SurfaceSet {
    pub fn new(display: Arc<Display>, owner: SessionId) -> Self {
        Self {
            display,
            owner,
            surfaces: None,
            pool: None,
        }
    }

    /// Whether a set (possibly still growing) exists.
    pub fn is_materialized(&self) -> bool {
        self.surfaces.is_some()
    }

    pub fn len(&self) -> usize {
        self.surfaces.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned surfaces, in allocation order.
    pub fn surfaces(&self) -> &[Arc<Surface>] {
        self.surfaces.as_deref().unwrap_or(&[])
    }

    pub fn pool(&self) -> Option<&Arc<SurfacePool>> {
        self.pool.as_ref()
    }

    /// Materialize or grow the set to the count `info` requires.
    ///
    /// Every new surface is tagged with the owning context and registered
    /// with the pool before it joins the set. On failure the surface being
    /// built is released; surfaces registered earlier stay in the set.
    ///
    /// # Errors
    /// Returns `ContextError::AllocationFailure` if a surface, the backing
    /// array or a pool slot cannot be allocated.
    pub fn ensure(&mut self, info: &ContextInfo) -> ContextResult<()> {
        let required = required_surfaces(info);
        let resolution = info.resolution;

        if self.surfaces.is_none() {
            let mut surfaces = Vec::new();
            surfaces.try_reserve_exact(required).map_err(|e| {
                ContextError::allocation(format!("surface array of {required}: {e}"))
            })?;
            self.surfaces = Some(surfaces);
        }
        let Some(surfaces) = self.surfaces.as_mut() else {
            return Err(ContextError::allocation("surface array"));
        };

        let pool = self.pool.get_or_insert_with(|| {
            SurfacePool::new(SurfaceFormat::encoded_yuv420(resolution))
        });
        pool.set_capacity(required);

        let existing = surfaces.len();
        for _ in existing..required {
            let surface = Arc::new(Surface::new(
                &self.display,
                ChromaType::Yuv420,
                resolution.width,
                resolution.height,
            )?);
            surface.set_parent_context(Some(self.owner));
            if let Err(e) = pool.add_object(&surface) {
                surface.set_parent_context(None);
                return Err(e);
            }
            surfaces.push(surface);
        }

        if required > existing {
            info!(
                owner = %self.owner,
                allocated = required - existing,
                total = required,
                resolution = %resolution,
                "Surface set ready"
            );
        }
        Ok(())
    }

    /// Tear down the pool and every owned surface.
    ///
    /// The pool goes first so no new loans are handed out; each surface then
    /// has its parent tag cleared before the set drops it.
    pub fn destroy(&mut self) {
        self.pool = None;

        if let Some(surfaces) = self.surfaces.take() {
            let count = surfaces.len();
            for surface in surfaces {
                surface.set_parent_context(None);
                drop(surface);
            }
            debug!(owner = %self.owner, count, "Surface set destroyed");
        }
    }

    /// Copy the surface ids into a contiguous array for context creation.
    ///
    /// # Errors
    /// Returns `ContextError::AllocationFailure` if there is no set, the set
    /// is empty, or a slot holds an invalid id.
    pub fn surface_ids(&self) -> ContextResult<Vec<VaId>> {
        let surfaces = self
            .surfaces
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ContextError::allocation("no surface set to bind"))?;

        let mut ids = Vec::new();
        ids.try_reserve_exact(surfaces.len())
            .map_err(|e| ContextError::allocation(format!("surface id array: {e}")))?;

        for (index, surface) in surfaces.iter().enumerate() {
            let id = surface.id();
            if !id.is_valid() {
                return Err(ContextError::allocation(format!(
                    "surface slot {index} is empty"
                )));
            }
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn acquire(&self) -> Option<SurfaceProxy> {
        self.pool.as_ref().and_then(SurfacePool::acquire)
    }

    /// Free surfaces left in the pool (0 when there is no pool).
    pub fn free_count(&self) -> usize {
        self.pool.as_ref().map_or(0, |p| p.size())
    }
}

impl Drop for SurfaceSet {
    fn drop(&mut self) {
        self.destroy();
    }
}
