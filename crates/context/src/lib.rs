//! `va-context` — Hardware video decode/encode context management.
//!
//! Creates, reconfigures and destroys the hardware objects one decode or
//! encode session needs: a pool of surfaces, a configuration negotiated
//! against the driver's capabilities, and the execution context bound to
//! both.
//!
//! # Architecture
//!
//! Every driver call goes through a [`Display`], which serializes access to
//! a [`VaDriver`] implementation. Two drivers ship with the crate: the
//! in-process [`SoftwareDriver`] and, with the `libva` feature, a
//! dynamically loaded libva backend.
//!
//! ## Module Overview
//!
//! - [`context`] — `VaContext`, the session orchestrator (create/reset/destroy)
//! - [`surfaces`] — surface set sizing and population
//! - [`config`] — capability query, rate-control selection, config creation
//! - [`pool`] — lend/return surface pool and `SurfaceProxy`
//! - [`surface`] — a single hardware frame buffer
//! - [`slot`] — tagged lifecycle slot for driver handles
//! - [`overlay`] — overlay state hooks tied to the surface set
//! - [`display`] — the driver trait and serialized display handle
//! - [`software`] — in-process driver
//! - `libva` — libva driver (feature `libva`)
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use va_common::{ContextInfo, Entrypoint, Profile, Resolution};
//! use va_context::{Display, SoftwareDriver, VaContext};
//!
//! let display = Arc::new(Display::new(SoftwareDriver::new()));
//! let info = ContextInfo::new(Profile::H264High, Entrypoint::Vld, Resolution::HD)
//!     .with_ref_frames(4);
//! let mut context = VaContext::new(display, &info)?;
//!
//! if let Some(surface) = context.acquire_surface() {
//!     // Decode into `surface.id()`; dropping the proxy returns it.
//! }
//!
//! context.reset(&info.clone().with_ref_frames(8))?;
//! ```

pub mod config;
pub mod context;
pub mod display;
pub mod overlay;
pub mod pool;
pub mod slot;
pub mod software;
pub mod surface;
pub mod surfaces;

#[cfg(feature = "libva")]
pub mod libva;

pub use config::{ConfigNegotiator, HwCodes, Negotiation};
pub use context::{SessionId, VaContext};
pub use display::{Display, VaDriver, VA_PROGRESSIVE};
pub use overlay::{ContextOverlay, NoOverlay};
pub use pool::{SurfaceFormat, SurfacePool, SurfaceProxy};
pub use slot::ResourceSlot;
pub use software::{DriverCall, SoftwareDriver};
pub use surface::Surface;
pub use surfaces::{required_surfaces, SurfaceSet, SCRATCH_SURFACES_COUNT};

#[cfg(feature = "libva")]
pub use libva::{LibvaDriver, LibvaLibrary};
