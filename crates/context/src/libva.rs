//! libva driver, loaded dynamically at runtime via `libloading`.
//!
//! [`LibvaLibrary`] resolves the handful of entry points a context needs;
//! [`LibvaDriver`] forwards [`VaDriver`] calls to them on an already
//! initialized `VADisplay`. Opening and initializing the display connection
//! (DRM, X11, Wayland) is left to the caller.
//!
//! Reference: `va/va.h`.

use std::ffi::{c_char, c_int, c_uint, c_void, CStr};
use std::path::Path;
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, info};

use va_common::{
    ChromaType, ConfigAttrib, ContextError, ContextResult, VaEntrypoint, VaId, VaProfile,
    status_result, VaStatus,
};

use crate::display::VaDriver;

// ---------------------------------------------------------------------------
// Raw types
// ---------------------------------------------------------------------------

/// Opaque `VADisplay` handle.
pub type VaDisplayHandle = *mut c_void;

/// `VAConfigAttrib` as laid out by libva.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
struct RawConfigAttrib {
    attrib_type: c_int,
    value: u32,
}

type VaCreateSurfacesFn = unsafe extern "C" fn(
    dpy: VaDisplayHandle,
    format: c_uint,
    width: c_uint,
    height: c_uint,
    surfaces: *mut c_uint,
    num_surfaces: c_uint,
    attrib_list: *mut c_void,
    num_attribs: c_uint,
) -> VaStatus;

type VaDestroySurfacesFn =
    unsafe extern "C" fn(dpy: VaDisplayHandle, surfaces: *mut c_uint, num_surfaces: c_int) -> VaStatus;

type VaGetConfigAttributesFn = unsafe extern "C" fn(
    dpy: VaDisplayHandle,
    profile: c_int,
    entrypoint: c_int,
    attrib_list: *mut RawConfigAttrib,
    num_attribs: c_int,
) -> VaStatus;

type VaCreateConfigFn = unsafe extern "C" fn(
    dpy: VaDisplayHandle,
    profile: c_int,
    entrypoint: c_int,
    attrib_list: *mut RawConfigAttrib,
    num_attribs: c_int,
    config_id: *mut c_uint,
) -> VaStatus;

type VaDestroyConfigFn = unsafe extern "C" fn(dpy: VaDisplayHandle, config_id: c_uint) -> VaStatus;

type VaCreateContextFn = unsafe extern "C" fn(
    dpy: VaDisplayHandle,
    config_id: c_uint,
    picture_width: c_int,
    picture_height: c_int,
    flag: c_int,
    render_targets: *mut c_uint,
    num_render_targets: c_int,
    context: *mut c_uint,
) -> VaStatus;

type VaDestroyContextFn = unsafe extern "C" fn(dpy: VaDisplayHandle, context: c_uint) -> VaStatus;

type VaErrorStrFn = unsafe extern "C" fn(status: VaStatus) -> *const c_char;

// ---------------------------------------------------------------------------
// Dynamic library wrapper
// ---------------------------------------------------------------------------

/// Dynamically loaded libva with the entry points a context uses.
pub struct LibvaLibrary {
    /// Keeps the shared object mapped while the pointers below are in use.
    _lib: Library,
    create_surfaces: VaCreateSurfacesFn,
    destroy_surfaces: VaDestroySurfacesFn,
    get_config_attributes: VaGetConfigAttributesFn,
    create_config: VaCreateConfigFn,
    destroy_config: VaDestroyConfigFn,
    create_context: VaCreateContextFn,
    destroy_context: VaDestroyContextFn,
    error_str: VaErrorStrFn,
}

// SAFETY: LibvaLibrary holds the Library handle and plain function pointers
// into it. libva serializes per-display state internally and callers reach
// it through `Display`'s lock.
unsafe impl Send for LibvaLibrary {}
unsafe impl Sync for LibvaLibrary {}

impl std::fmt::Debug for LibvaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibvaLibrary")
            .field("loaded", &true)
            .finish()
    }
}

impl LibvaLibrary {
    /// Shared object name searched on the default library path.
    pub fn library_name() -> &'static str {
        "libva.so.2"
    }

    /// Load libva from the default system path.
    ///
    /// # Errors
    /// `ContextError::DriverLoad` if the library or a symbol is missing.
    pub fn load() -> ContextResult<Self> {
        let lib_name = Self::library_name();
        info!(library = %lib_name, "Loading libva");

        // SAFETY: libva's initializers only register driver bookkeeping.
        let lib = unsafe { Library::new(lib_name) }.map_err(|e| {
            ContextError::DriverLoad(format!(
                "Failed to load {lib_name}: {e}. Is libva installed?"
            ))
        })?;

        Self::load_functions(lib)
    }

    /// Load from a specific path (non-standard installs).
    pub fn load_from(path: &Path) -> ContextResult<Self> {
        info!(path = %path.display(), "Loading libva from custom path");

        // SAFETY: The caller asserts this is a libva build.
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            ContextError::DriverLoad(format!("Failed to load {}: {e}", path.display()))
        })?;

        Self::load_functions(lib)
    }

    fn load_functions(lib: Library) -> ContextResult<Self> {
        fn missing(name: &str, e: libloading::Error) -> ContextError {
            ContextError::DriverLoad(format!("{name}: {e}"))
        }

        // SAFETY: Each symbol is looked up with the signature declared in
        // va/va.h. The Symbol is dereferenced to copy the raw pointer, which
        // stays valid while `_lib` is alive.
        unsafe {
            let create_surfaces = *lib
                .get::<VaCreateSurfacesFn>(b"vaCreateSurfaces\0")
                .map_err(|e| missing("vaCreateSurfaces", e))?;
            let destroy_surfaces = *lib
                .get::<VaDestroySurfacesFn>(b"vaDestroySurfaces\0")
                .map_err(|e| missing("vaDestroySurfaces", e))?;
            let get_config_attributes = *lib
                .get::<VaGetConfigAttributesFn>(b"vaGetConfigAttributes\0")
                .map_err(|e| missing("vaGetConfigAttributes", e))?;
            let create_config = *lib
                .get::<VaCreateConfigFn>(b"vaCreateConfig\0")
                .map_err(|e| missing("vaCreateConfig", e))?;
            let destroy_config = *lib
                .get::<VaDestroyConfigFn>(b"vaDestroyConfig\0")
                .map_err(|e| missing("vaDestroyConfig", e))?;
            let create_context = *lib
                .get::<VaCreateContextFn>(b"vaCreateContext\0")
                .map_err(|e| missing("vaCreateContext", e))?;
            let destroy_context = *lib
                .get::<VaDestroyContextFn>(b"vaDestroyContext\0")
                .map_err(|e| missing("vaDestroyContext", e))?;
            let error_str = *lib
                .get::<VaErrorStrFn>(b"vaErrorStr\0")
                .map_err(|e| missing("vaErrorStr", e))?;

            debug!("libva symbols resolved");

            Ok(Self {
                _lib: lib,
                create_surfaces,
                destroy_surfaces,
                get_config_attributes,
                create_config,
                destroy_config,
                create_context,
                destroy_context,
                error_str,
            })
        }
    }

    /// libva's own description of a status code.
    pub fn error_str(&self, status: VaStatus) -> String {
        // SAFETY: vaErrorStr returns a pointer to a static string table entry.
        let ptr = unsafe { (self.error_str)(status) };
        if ptr.is_null() {
            return String::from("unknown libva error");
        }
        // SAFETY: Non-null, NUL-terminated and 'static per the libva API.
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

// ---------------------------------------------------------------------------
// LibvaDriver
// ---------------------------------------------------------------------------

/// [`VaDriver`] backed by a live libva display.
pub struct LibvaDriver {
    lib: Arc<LibvaLibrary>,
    display: VaDisplayHandle,
}

// SAFETY: The VADisplay handle is only used through `Display`, which
// serializes every call behind its mutex.
unsafe impl Send for LibvaDriver {}

impl std::fmt::Debug for LibvaDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibvaDriver")
            .field("display", &self.display)
            .finish()
    }
}

impl LibvaDriver {
    /// Wrap an initialized `VADisplay`.
    ///
    /// # Safety
    /// `display` must have been returned by a `vaGetDisplay*` call and passed
    /// through `vaInitialize`, and must stay valid until this driver and
    /// every object created through it are dropped.
    pub unsafe fn from_raw(lib: Arc<LibvaLibrary>, display: VaDisplayHandle) -> Self {
        Self { lib, display }
    }

    fn check(&self, status: VaStatus, call: &'static str) -> Result<(), VaStatus> {
        status_result(status).inspect_err(|&status| {
            debug!(call, status, error = %self.lib.error_str(status), "libva call failed");
        })
    }
}

impl VaDriver for LibvaDriver {
    fn name(&self) -> &str {
        "libva"
    }

    fn create_surface(
        &mut self,
        chroma: ChromaType,
        width: u32,
        height: u32,
    ) -> Result<VaId, VaStatus> {
        let mut id: c_uint = VaId::INVALID.0;
        // SAFETY: `id` is valid for one surface; no attribute list is passed.
        let status = unsafe {
            (self.lib.create_surfaces)(
                self.display,
                chroma.va_rt_format(),
                width,
                height,
                &mut id,
                1,
                std::ptr::null_mut(),
                0,
            )
        };
        self.check(status, "vaCreateSurfaces()")?;
        Ok(VaId(id))
    }

    fn destroy_surface(&mut self, surface: VaId) -> Result<(), VaStatus> {
        let mut id = surface.0;
        // SAFETY: A single, caller-owned surface id.
        let status = unsafe { (self.lib.destroy_surfaces)(self.display, &mut id, 1) };
        self.check(status, "vaDestroySurfaces()")
    }

    fn get_config_attributes(
        &mut self,
        profile: VaProfile,
        entrypoint: VaEntrypoint,
        attribs: &mut [ConfigAttrib],
    ) -> Result<(), VaStatus> {
        let mut raw: Vec<RawConfigAttrib> = attribs
            .iter()
            .map(|a| RawConfigAttrib {
                attrib_type: a.attrib_type.va_code(),
                value: a.value,
            })
            .collect();
        // SAFETY: `raw` holds `raw.len()` initialized entries libva fills in.
        let status = unsafe {
            (self.lib.get_config_attributes)(
                self.display,
                profile,
                entrypoint,
                raw.as_mut_ptr(),
                raw.len() as c_int,
            )
        };
        self.check(status, "vaGetConfigAttributes()")?;
        for (attrib, filled) in attribs.iter_mut().zip(&raw) {
            attrib.value = filled.value;
        }
        Ok(())
    }

    fn create_config(
        &mut self,
        profile: VaProfile,
        entrypoint: VaEntrypoint,
        attribs: &[ConfigAttrib],
    ) -> Result<VaId, VaStatus> {
        let mut raw: Vec<RawConfigAttrib> = attribs
            .iter()
            .map(|a| RawConfigAttrib {
                attrib_type: a.attrib_type.va_code(),
                value: a.value,
            })
            .collect();
        let mut id: c_uint = VaId::INVALID.0;
        // SAFETY: libva only reads the attribute list and writes one id.
        let status = unsafe {
            (self.lib.create_config)(
                self.display,
                profile,
                entrypoint,
                raw.as_mut_ptr(),
                raw.len() as c_int,
                &mut id,
            )
        };
        self.check(status, "vaCreateConfig()")?;
        Ok(VaId(id))
    }

    fn destroy_config(&mut self, config: VaId) -> Result<(), VaStatus> {
        // SAFETY: Plain id argument.
        let status = unsafe { (self.lib.destroy_config)(self.display, config.0) };
        self.check(status, "vaDestroyConfig()")
    }

    fn create_context(
        &mut self,
        config: VaId,
        width: u32,
        height: u32,
        flags: u32,
        render_targets: &[VaId],
    ) -> Result<VaId, VaStatus> {
        let mut targets: Vec<c_uint> = render_targets.iter().map(|id| id.0).collect();
        let mut id: c_uint = VaId::INVALID.0;
        // SAFETY: libva reads `targets.len()` ids and writes one context id.
        let status = unsafe {
            (self.lib.create_context)(
                self.display,
                config.0,
                width as c_int,
                height as c_int,
                flags as c_int,
                targets.as_mut_ptr(),
                targets.len() as c_int,
                &mut id,
            )
        };
        self.check(status, "vaCreateContext()")?;
        Ok(VaId(id))
    }

    fn destroy_context(&mut self, context: VaId) -> Result<(), VaStatus> {
        // SAFETY: Plain id argument.
        let status = unsafe { (self.lib.destroy_context)(self.display, context.0) };
        self.check(status, "vaDestroyContext()")
    }
}
