//! Tagged slot for a driver object with a manual lifecycle.
//!
//! Replaces sentinel comparisons: a handle can only be destroyed while it is
//! `Active`, and destroying moves the slot to `Destroyed` whether or not the
//! driver call succeeded, so repeated teardown is a no-op.

use va_common::VaId;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ResourceSlot {
    #[default]
    Uncreated,
    Active(VaId),
    Destroyed,
}

impl ResourceSlot {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The live id, or `VaId::INVALID`.
    pub fn id(&self) -> VaId {
        match self {
            Self::Active(id) => *id,
            _ => VaId::INVALID,
        }
    }

    /// Take the live id out, leaving the slot `Destroyed`.
    ///
    /// Returns `None` (and leaves the slot untouched) unless it is `Active`.
    pub fn take(&mut self) -> Option<VaId> {
        match *self {
            Self::Active(id) => {
                *self = Self::Destroyed;
                Some(id)
            }
            _ => None,
        }
    }
}
