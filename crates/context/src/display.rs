//! Display handle: serialized access to the native driver.
//!
//! Every hardware call goes through [`Display::lock`], which returns a scoped
//! guard over the driver. Callers take the guard for exactly one driver call
//! and let it drop at the end of the statement, so the lock is never held
//! across a sequence of calls and is released on every exit path.

use parking_lot::{Mutex, MutexGuard};

use va_common::{ChromaType, ConfigAttrib, VaEntrypoint, VaId, VaProfile, VaStatus};

/// Context creation flag: progressive scan.
pub const VA_PROGRESSIVE: u32 = 0x1;

/// Native hardware API seam.
///
/// Implemented by the dynamically loaded libva driver and by the in-process
/// [`SoftwareDriver`](crate::software::SoftwareDriver). Methods mirror the
/// driver entry points one to one and report raw status codes; status
/// interpretation is left to the caller.
pub trait VaDriver: Send {
    /// Short backend name (for display/logging).
    fn name(&self) -> &str;

    /// Allocate one surface of the given chroma type and size.
    fn create_surface(
        &mut self,
        chroma: ChromaType,
        width: u32,
        height: u32,
    ) -> Result<VaId, VaStatus>;

    fn destroy_surface(&mut self, surface: VaId) -> Result<(), VaStatus>;

    /// Fill in the `value` of each entry for the profile/entry-point pair.
    fn get_config_attributes(
        &mut self,
        profile: VaProfile,
        entrypoint: VaEntrypoint,
        attribs: &mut [ConfigAttrib],
    ) -> Result<(), VaStatus>;

    fn create_config(
        &mut self,
        profile: VaProfile,
        entrypoint: VaEntrypoint,
        attribs: &[ConfigAttrib],
    ) -> Result<VaId, VaStatus>;

    fn destroy_config(&mut self, config: VaId) -> Result<(), VaStatus>;

    /// Create an execution context bound to `config` and the render targets.
    fn create_context(
        &mut self,
        config: VaId,
        width: u32,
        height: u32,
        flags: u32,
        render_targets: &[VaId],
    ) -> Result<VaId, VaStatus>;

    fn destroy_context(&mut self, context: VaId) -> Result<(), VaStatus>;
}

/// Shared connection to a hardware driver.
///
/// Shared between a context, its surfaces and its pool via `Arc<Display>`.
pub struct Display {
    driver: Mutex<Box<dyn VaDriver>>,
    name: String,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("driver", &self.name)
            .field("locked", &self.driver.is_locked())
            .finish()
    }
}

impl Display {
    pub fn new(driver: impl VaDriver + 'static) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    pub fn from_boxed(driver: Box<dyn VaDriver>) -> Self {
        let name = driver.name().to_string();
        Self {
            driver: Mutex::new(driver),
            name,
        }
    }

    /// Backend name captured at construction.
    pub fn driver_name(&self) -> &str {
        &self.name
    }

    /// Enter the display's critical section.
    ///
    /// Hold the guard for a single driver call only.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn VaDriver>> {
        self.driver.lock()
    }

    /// Whether some thread currently holds the critical section.
    pub fn is_locked(&self) -> bool {
        self.driver.is_locked()
    }
}
