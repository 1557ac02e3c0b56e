//! Overlay / sub-picture extension point.
//!
//! Codec- or sink-specific overlay state attached to a context depends on the
//! context's surface set. The context drives it through three hooks:
//!
//! - `init` once, when the context is constructed;
//! - `reset` before the surface set is built and before it is torn down;
//! - `finalize` once, last, when the context is destroyed.

use va_common::ContextResult;

pub trait ContextOverlay: Send {
    fn init(&mut self) {}

    /// Drop any state tied to the current surface set.
    fn reset(&mut self) -> ContextResult<()> {
        Ok(())
    }

    fn finalize(&mut self) {}
}

/// Overlay that carries no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl ContextOverlay for NoOverlay {}
