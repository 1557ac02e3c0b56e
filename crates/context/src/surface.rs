//! Hardware frame buffers (surfaces).
//!
//! A [`Surface`] is a driver-resident buffer used as decode target, reference
//! frame or scratch space. It is destroyed through the display when the last
//! `Arc<Surface>` is dropped.
//!
//! Each surface carries a non-owning back-reference to the context that owns
//! it: an optional [`SessionId`], never a pointer. The owning context clears
//! the tag before it lets go of the surface, so a surface that outlives its
//! set (held by an outstanding proxy) never refers to a torn-down context.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use va_common::{status_name, ChromaType, ContextError, ContextResult, Resolution, VaId};

use crate::context::SessionId;
use crate::display::Display;

pub struct Surface {
    id: VaId,
    display: Arc<Display>,
    chroma: ChromaType,
    resolution: Resolution,
    parent: Mutex<Option<SessionId>>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("chroma", &self.chroma)
            .field("resolution", &self.resolution)
            .field("parent", &*self.parent.lock())
            .finish()
    }
}

impl Surface {
    /// Allocate a surface on the display.
    ///
    /// # Errors
    /// Returns `ContextError::AllocationFailure` if the driver refuses the
    /// allocation.
    pub fn new(
        display: &Arc<Display>,
        chroma: ChromaType,
        width: u32,
        height: u32,
    ) -> ContextResult<Self> {
        let id = display
            .lock()
            .create_surface(chroma, width, height)
            .map_err(|status| {
                ContextError::allocation(format!(
                    "surface {width}x{height}: {}",
                    status_name(status)
                ))
            })?;

        debug!(surface = %id, width, height, "Created surface");

        Ok(Self {
            id,
            display: Arc::clone(display),
            chroma,
            resolution: Resolution::new(width, height),
            parent: Mutex::new(None),
        })
    }

    pub fn id(&self) -> VaId {
        self.id
    }

    pub fn chroma(&self) -> ChromaType {
        self.chroma
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Tag (or untag, with `None`) the context this surface belongs to.
    pub fn set_parent_context(&self, parent: Option<SessionId>) {
        *self.parent.lock() = parent;
    }

    pub fn parent_context(&self) -> Option<SessionId> {
        *self.parent.lock()
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.get_mut().take() {
            warn!(
                surface = %self.id,
                parent = %parent,
                "Destroying surface still tagged with its parent context"
            );
        }

        let result = self.display.lock().destroy_surface(self.id);
        match result {
            Ok(()) => debug!(surface = %self.id, "Destroyed surface"),
            Err(status) => warn!(
                surface = %self.id,
                status,
                reason = status_name(status),
                "Failed to destroy surface"
            ),
        }
    }
}
