//! Hardware execution context: the session that binds a configuration, an
//! execution context and a surface set together.
//!
//! `VaContext` is the top-level entry point. It owns every hardware object
//! of one decode/encode instance and keeps them consistent with the caller's
//! [`ContextInfo`].
//!
//! # Lifecycle
//!
//! ```text
//! new(info)
//!   --> validate descriptor
//!   --> surface set (ref_frames + 4)
//!   --> snapshot surface ids
//!   --> negotiate + create config
//!   --> create context over (config, width, height, PROGRESSIVE, ids)
//!
//! reset(info)
//!   --> validate, diff against what the hardware was built for
//!   --> negotiate new config first (if it changes)
//!   --> teardown: context, config (if changed), surfaces (if changed)
//!   --> rebuild:  surfaces (if changed), config (if changed), context
//!
//! destroy() / Drop
//!   --> context, config, surfaces, overlay
//! ```
//!
//! A failed `new` drops the partially built value, which releases whatever
//! had been created. Destruction never fails outward and is idempotent.
//!
//! # Reset contract
//!
//! `reset` is best-effort: the stored descriptor is replaced before any
//! rebuild, so after a failed reset [`VaContext::info`] reflects the caller's
//! intent rather than the hardware state. Rate-control and format checks run
//! before anything is torn down, so a rejected configuration leaves the
//! previous context usable.
//!
//! A reset that changes the surface set also recreates the execution
//! context over the new surface ids (keeping the configuration when it is
//! unaffected). Callers must release every [`SurfaceProxy`] before such a
//! reset.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use va_common::{
    check_status, status_name, ConfigAttribType, ContextInfo, ContextResult, VaId,
};

use crate::config::{ConfigNegotiator, HwCodes, Negotiation};
use crate::display::{Display, VA_PROGRESSIVE};
use crate::overlay::{ContextOverlay, NoOverlay};
use crate::pool::{SurfacePool, SurfaceProxy};
use crate::slot::ResourceSlot;
use crate::surface::Surface;
use crate::surfaces::SurfaceSet;

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Process-unique identity of a context, used as the surfaces' parent tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// VaContext
// ---------------------------------------------------------------------------

/// A hardware decode/encode session.
///
/// Driven from one control thread; only the surface pool is shared with
/// worker threads through [`SurfaceProxy`] loans.
pub struct VaContext {
    session: SessionId,
    display: Arc<Display>,
    /// Caller intent, replaced on every reset.
    info: ContextInfo,
    /// Driver codes of the last negotiated configuration.
    codes: HwCodes,
    config: ResourceSlot,
    context: ResourceSlot,
    surfaces: SurfaceSet,
    /// Descriptor the surface set was last fully built for.
    surfaces_for: Option<ContextInfo>,
    /// Descriptor the configuration was last created for.
    config_for: Option<ContextInfo>,
    /// `None` once finalized.
    overlay: Option<Box<dyn ContextOverlay>>,
}

impl fmt::Debug for VaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaContext")
            .field("session", &self.session)
            .field("driver", &self.display.driver_name())
            .field("info", &self.info)
            .field("config", &self.config)
            .field("context", &self.context)
            .field("surfaces", &self.surfaces)
            .finish()
    }
}

impl VaContext {
    /// Create a context without overlay state.
    ///
    /// # Errors
    /// - `InvalidDescriptor` if profile or entry point is unset or a
    ///   dimension is zero (no hardware call is made).
    /// - `AllocationFailure` if the surface set cannot be built.
    /// - `CapabilityUnsupported` if the driver lacks 4:2:0 surfaces or the
    ///   requested rate control.
    /// - `HardwareCall` if a driver call fails.
    pub fn new(display: Arc<Display>, info: &ContextInfo) -> ContextResult<Self> {
        Self::with_overlay(display, info, Box::new(NoOverlay))
    }

    /// Create a context that drives `overlay` through its lifecycle hooks.
    pub fn with_overlay(
        display: Arc<Display>,
        info: &ContextInfo,
        mut overlay: Box<dyn ContextOverlay>,
    ) -> ContextResult<Self> {
        info.validate()?;
        let codes = HwCodes::from_info(info)?;
        let session = SessionId::next();

        overlay.init();

        let mut context = Self {
            session,
            surfaces: SurfaceSet::new(Arc::clone(&display), session),
            display,
            info: info.clone(),
            codes,
            config: ResourceSlot::Uncreated,
            context: ResourceSlot::Uncreated,
            surfaces_for: None,
            config_for: None,
            overlay: Some(overlay),
        };

        // On error `context` is dropped here and tears down what was built.
        context.materialize()?;

        info!(
            session = %session,
            driver = context.display.driver_name(),
            profile = ?context.info.profile,
            entrypoint = ?context.info.entrypoint,
            resolution = %context.info.resolution,
            surfaces = context.surfaces.len(),
            context = %context.context.id(),
            "Context created"
        );
        Ok(context)
    }

    fn materialize(&mut self) -> ContextResult<()> {
        self.ensure_surfaces()?;
        let ids = self.surfaces.surface_ids()?;
        let negotiation = ConfigNegotiator::new(&self.display).negotiate(&self.info)?;
        self.install_config(&negotiation)?;
        self.bind_context(&ids)
    }

    /// Reconfigure for a new descriptor, rebuilding only what it affects.
    ///
    /// - surface set: rebuilt when resolution or reference-frame count changes;
    /// - configuration: renegotiated when profile or entry point changes, or
    ///   rate control changes for a slice encoder;
    /// - execution context: recreated whenever either of the above is, or
    ///   when a previous reset left it missing.
    ///
    /// Nothing happens if the descriptor is equivalent to the current one.
    ///
    /// # Errors
    /// Same kinds as [`VaContext::new`]. An invalid descriptor is rejected
    /// without touching the context; any later failure leaves the new
    /// descriptor stored.
    pub fn reset(&mut self, new: &ContextInfo) -> ContextResult<()> {
        new.validate()?;

        let surfaces_changed = self
            .surfaces_for
            .as_ref()
            .map_or(true, |built| built.surfaces_differ(new));
        let config_changed = self
            .config_for
            .as_ref()
            .map_or(true, |built| built.config_differs(new));

        self.info = new.clone();

        if !surfaces_changed && !config_changed && self.context.is_active() {
            debug!(session = %self.session, "Reset with unchanged descriptor");
            return Ok(());
        }

        info!(
            session = %self.session,
            surfaces_changed,
            config_changed,
            resolution = %new.resolution,
            ref_frames = new.ref_frames,
            rc_mode = %new.rc_mode,
            "Resetting context"
        );

        let negotiation = if config_changed {
            Some(ConfigNegotiator::new(&self.display).negotiate(new)?)
        } else {
            None
        };

        self.destroy_context();
        if config_changed {
            self.destroy_config();
        }
        if surfaces_changed {
            self.destroy_surfaces();
        }

        if surfaces_changed {
            self.ensure_surfaces()?;
        }
        let ids = self.surfaces.surface_ids()?;
        if let Some(negotiation) = negotiation {
            self.install_config(&negotiation)?;
        }
        self.bind_context(&ids)
    }

    /// Release every hardware object: context, config, surfaces, then the
    /// overlay. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        let was_live = self.overlay.is_some();

        self.destroy_context();
        self.destroy_config();
        self.destroy_surfaces();

        if let Some(mut overlay) = self.overlay.take() {
            overlay.finalize();
        }

        if was_live {
            info!(session = %self.session, "Context destroyed");
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn display(&self) -> &Arc<Display> {
        &self.display
    }

    /// Execution-context id, or `VaId::INVALID` when there is none.
    pub fn id(&self) -> VaId {
        self.context.id()
    }

    /// Configuration id, or `VaId::INVALID` when there is none.
    pub fn config_id(&self) -> VaId {
        self.config.id()
    }

    /// The descriptor last passed to `new` or `reset`.
    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    pub fn is_active(&self) -> bool {
        self.context.is_active()
    }

    /// Owned surfaces, in allocation order.
    pub fn surfaces(&self) -> &[Arc<Surface>] {
        self.surfaces.surfaces()
    }

    /// Ids of the owned surfaces, in the order the context is bound to.
    pub fn surface_ids(&self) -> ContextResult<Vec<VaId>> {
        self.surfaces.surface_ids()
    }

    /// The surface pool, for handing to worker threads. `None` while the
    /// surface set is torn down.
    pub fn pool(&self) -> Option<&Arc<SurfacePool>> {
        self.surfaces.pool()
    }

    /// Borrow a free surface. Returns `None` when all are on loan; never blocks.
    pub fn acquire_surface(&self) -> Option<SurfaceProxy> {
        self.surfaces.acquire()
    }

    /// Free surfaces in the pool. A snapshot under concurrent use.
    pub fn surface_count(&self) -> usize {
        self.surfaces.free_count()
    }

    /// Query one configuration attribute for the negotiated profile and
    /// entry point.
    ///
    /// # Errors
    /// `HardwareCall` if the query fails, `CapabilityUnsupported` if the
    /// driver does not know the attribute.
    pub fn get_attribute(&self, attrib_type: ConfigAttribType) -> ContextResult<u32> {
        ConfigNegotiator::new(&self.display).get_attribute(self.codes, attrib_type)
    }

    // -- Building blocks ----------------------------------------------------

    fn ensure_surfaces(&mut self) -> ContextResult<()> {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.reset()?;
        }
        self.surfaces.ensure(&self.info)?;
        self.surfaces_for = Some(self.info.clone());
        Ok(())
    }

    fn install_config(&mut self, negotiation: &Negotiation) -> ContextResult<()> {
        self.codes = negotiation.codes;
        let config = ConfigNegotiator::new(&self.display).create(negotiation)?;
        self.config = ResourceSlot::Active(config);
        self.config_for = Some(self.info.clone());
        Ok(())
    }

    fn bind_context(&mut self, render_targets: &[VaId]) -> ContextResult<()> {
        let config = self.config.id();
        let (width, height) = (self.info.width(), self.info.height());

        let result = self.display.lock().create_context(
            config,
            width,
            height,
            VA_PROGRESSIVE,
            render_targets,
        );
        let context = check_status(result, "vaCreateContext()").inspect_err(|e| {
            warn!(
                session = %self.session,
                config = %config,
                error = %e,
                "Context creation failed"
            );
        })?;

        debug!(
            session = %self.session,
            context = %context,
            config = %config,
            surfaces = render_targets.len(),
            "Created context"
        );
        self.context = ResourceSlot::Active(context);
        Ok(())
    }

    fn destroy_context(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        let result = self.display.lock().destroy_context(context);
        match result {
            Ok(()) => debug!(session = %self.session, context = %context, "Destroyed context"),
            Err(status) => warn!(
                session = %self.session,
                context = %context,
                status,
                status_name = status_name(status),
                "vaDestroyContext() failed"
            ),
        }
    }

    fn destroy_config(&mut self) {
        self.config_for = None;
        let Some(config) = self.config.take() else {
            return;
        };
        let result = self.display.lock().destroy_config(config);
        match result {
            Ok(()) => debug!(session = %self.session, config = %config, "Destroyed config"),
            Err(status) => warn!(
                session = %self.session,
                config = %config,
                status,
                status_name = status_name(status),
                "vaDestroyConfig() failed"
            ),
        }
    }

    fn destroy_surfaces(&mut self) {
        self.surfaces_for = None;
        if let Some(overlay) = self.overlay.as_mut() {
            if let Err(e) = overlay.reset() {
                warn!(session = %self.session, error = %e, "Overlay reset failed");
            }
        }
        self.surfaces.destroy();
    }
}

impl Drop for VaContext {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::{DriverCall, SoftwareDriver};
    use va_common::status::{
        VA_STATUS_ERROR_ALLOCATION_FAILED, VA_STATUS_ERROR_INVALID_CONTEXT,
        VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED,
    };
    use va_common::{ContextError, Entrypoint, Profile, RateControl, Resolution};

    fn decode_info(ref_frames: u32) -> ContextInfo {
        ContextInfo::new(Profile::H264High, Entrypoint::Vld, Resolution::new(1280, 720))
            .with_ref_frames(ref_frames)
    }

    fn encode_info(rc: RateControl) -> ContextInfo {
        ContextInfo::new(Profile::H264Main, Entrypoint::SliceEncode, Resolution::HD)
            .with_ref_frames(2)
            .with_rate_control(rc)
    }

    fn display(driver: &SoftwareDriver) -> Arc<Display> {
        Arc::new(Display::new(driver.clone()))
    }

    // ── Session ids ──────────────────────────────────────────────

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("session-"));
    }

    // ── Creation ─────────────────────────────────────────────────

    #[test]
    fn create_binds_context_to_all_surfaces() {
        let driver = SoftwareDriver::new();
        let ctx = VaContext::new(display(&driver), &decode_info(4)).unwrap();

        assert!(ctx.id().is_valid());
        assert!(ctx.config_id().is_valid());
        assert_eq!(ctx.surfaces().len(), 8);

        let record = driver.context(ctx.id()).unwrap();
        assert_eq!(record.config, ctx.config_id());
        assert_eq!(record.flags, VA_PROGRESSIVE);
        assert_eq!(record.resolution, Resolution::new(1280, 720));
        assert_eq!(record.render_targets, ctx.surface_ids().unwrap());
    }

    #[test]
    fn invalid_descriptor_makes_no_driver_calls() {
        let driver = SoftwareDriver::new();
        let err = VaContext::new(display(&driver), &ContextInfo::default()).unwrap_err();
        assert!(matches!(err, ContextError::InvalidDescriptor(_)));

        let zero = ContextInfo::new(Profile::H264High, Entrypoint::Vld, Resolution::new(0, 720));
        assert!(VaContext::new(display(&driver), &zero).is_err());
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn failed_context_creation_unwinds() {
        let driver = SoftwareDriver::new();
        driver.fail_next(DriverCall::CreateContext, VA_STATUS_ERROR_RESOLUTION_NOT_SUPPORTED);

        let err = VaContext::new(display(&driver), &decode_info(2)).unwrap_err();
        assert!(matches!(
            err,
            ContextError::HardwareCall {
                call: "vaCreateContext()",
                ..
            }
        ));
        assert_eq!(driver.live_surfaces(), 0);
        assert_eq!(driver.live_configs(), 0);
        assert_eq!(driver.live_contexts(), 0);
    }

    #[test]
    fn failed_surface_allocation_unwinds() {
        let driver = SoftwareDriver::new();
        driver.fail_after(DriverCall::CreateSurface, 2, VA_STATUS_ERROR_ALLOCATION_FAILED);

        let err = VaContext::new(display(&driver), &decode_info(2)).unwrap_err();
        assert!(matches!(err, ContextError::AllocationFailure { .. }));
        assert_eq!(driver.live_surfaces(), 0);
        assert_eq!(driver.call_count(DriverCall::CreateConfig), 0);
    }

    // ── Reset ────────────────────────────────────────────────────

    #[test]
    fn reset_with_same_descriptor_is_noop() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(2)).unwrap();
        let id = ctx.id();
        driver.clear_calls();

        ctx.reset(&decode_info(2)).unwrap();
        assert_eq!(ctx.id(), id);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn reset_rate_control_ignored_for_decode() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(2)).unwrap();
        driver.clear_calls();

        ctx.reset(&decode_info(2).with_rate_control(RateControl::Cbr)).unwrap();
        assert!(driver.calls().is_empty());
        assert_eq!(ctx.info().rc_mode, RateControl::Cbr);
    }

    #[test]
    fn reset_ref_frames_rebuilds_surfaces_and_context() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(2)).unwrap();
        let config = ctx.config_id();

        ctx.reset(&decode_info(6)).unwrap();
        assert_eq!(ctx.surfaces().len(), 10);
        assert_eq!(ctx.config_id(), config);
        assert_eq!(driver.live_surfaces(), 10);
        assert_eq!(driver.live_contexts(), 1);
        assert_eq!(
            driver.context(ctx.id()).unwrap().render_targets,
            ctx.surface_ids().unwrap()
        );
    }

    #[test]
    fn reset_recovers_missing_context() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &encode_info(RateControl::Vbr)).unwrap();

        driver.fail_next(DriverCall::CreateContext, VA_STATUS_ERROR_ALLOCATION_FAILED);
        assert!(ctx.reset(&encode_info(RateControl::Cbr)).is_err());
        assert!(!ctx.is_active());

        ctx.reset(&encode_info(RateControl::Cbr)).unwrap();
        assert!(ctx.is_active());
        assert_eq!(driver.live_contexts(), 1);
        assert_eq!(driver.live_configs(), 1);
    }

    #[test]
    fn invalid_reset_leaves_descriptor() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(2)).unwrap();
        let before = ctx.info().clone();

        let bad = ContextInfo {
            profile: None,
            ..decode_info(3)
        };
        assert!(ctx.reset(&bad).is_err());
        assert_eq!(ctx.info(), &before);
        assert!(ctx.is_active());
    }

    // ── Attributes ───────────────────────────────────────────────

    #[test]
    fn get_attribute_uses_negotiated_codes() {
        let driver = SoftwareDriver::new();
        let ctx = VaContext::new(display(&driver), &decode_info(0)).unwrap();
        let value = ctx.get_attribute(ConfigAttribType::EncMaxRefFrames).unwrap();
        assert_eq!(value, 16);
        assert!(ctx.get_attribute(ConfigAttribType::EncRoi).is_err());
    }

    // ── Teardown ─────────────────────────────────────────────────

    #[test]
    fn destroy_is_idempotent() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(1)).unwrap();

        ctx.destroy();
        assert_eq!(ctx.id(), VaId::INVALID);
        assert_eq!(ctx.config_id(), VaId::INVALID);
        assert_eq!(driver.live_surfaces(), 0);

        driver.clear_calls();
        ctx.destroy();
        drop(ctx);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn failed_destroy_is_not_retried() {
        let driver = SoftwareDriver::new();
        let mut ctx = VaContext::new(display(&driver), &decode_info(1)).unwrap();

        driver.fail_next(DriverCall::DestroyContext, VA_STATUS_ERROR_INVALID_CONTEXT);
        ctx.destroy();
        assert_eq!(ctx.id(), VaId::INVALID);
        assert_eq!(driver.live_configs(), 0);

        drop(ctx);
        assert_eq!(driver.call_count(DriverCall::DestroyContext), 1);
    }
}
