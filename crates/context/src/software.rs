//! In-process driver (software fallback).
//!
//! `SoftwareDriver` implements [`VaDriver`] without any hardware: it hands
//! out ids, remembers every live surface, config and context, and answers
//! capability queries from a configurable attribute table. It lets the
//! context machinery run headless, and it is what the tests drive.
//!
//! # Inspection
//!
//! The driver is cheaply cloneable and all clones share state, so a caller
//! can keep one clone after moving another into a [`Display`](crate::Display)
//! and inspect live objects, call counts and render-target bindings.
//!
//! # Failure injection
//!
//! [`SoftwareDriver::fail_after`] arms a one-shot failure for a given entry
//! point: the next `skip` calls succeed, the one after returns the status.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use va_common::status::{
    VA_STATUS_ERROR_INVALID_CONFIG, VA_STATUS_ERROR_INVALID_CONTEXT,
    VA_STATUS_ERROR_INVALID_PARAMETER, VA_STATUS_ERROR_INVALID_SURFACE,
};
use va_common::{
    ChromaType, ConfigAttrib, ConfigAttribType, RateControl, Resolution, VaEntrypoint, VaId,
    VaProfile, VaStatus, VA_ATTRIB_NOT_SUPPORTED,
};

use crate::display::VaDriver;

/// Driver entry points, for call accounting and failure injection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DriverCall {
    CreateSurface,
    DestroySurface,
    GetConfigAttributes,
    CreateConfig,
    DestroyConfig,
    CreateContext,
    DestroyContext,
}

/// A config as recorded by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigRecord {
    pub profile: VaProfile,
    pub entrypoint: VaEntrypoint,
    pub attribs: Vec<ConfigAttrib>,
}

/// A context as recorded by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextRecord {
    pub config: VaId,
    pub resolution: Resolution,
    pub flags: u32,
    pub render_targets: Vec<VaId>,
}

#[derive(Debug, Clone, Copy)]
struct ArmedFailure {
    skip: usize,
    status: VaStatus,
}

#[derive(Debug)]
struct SoftwareState {
    next_id: u32,
    attributes: HashMap<ConfigAttribType, u32>,
    surfaces: HashMap<VaId, (ChromaType, Resolution)>,
    configs: HashMap<VaId, ConfigRecord>,
    contexts: HashMap<VaId, ContextRecord>,
    calls: Vec<DriverCall>,
    failures: HashMap<DriverCall, ArmedFailure>,
}

impl SoftwareState {
    fn new() -> Self {
        let mut attributes = HashMap::new();
        attributes.insert(
            ConfigAttribType::RtFormat,
            ChromaType::Yuv420.va_rt_format() | ChromaType::Yuv420_10.va_rt_format(),
        );
        attributes.insert(
            ConfigAttribType::RateControl,
            RateControl::None.va_mask()
                | RateControl::Cbr.va_mask()
                | RateControl::Vbr.va_mask()
                | RateControl::Cqp.va_mask(),
        );
        attributes.insert(ConfigAttribType::EncMaxRefFrames, 16);

        Self {
            next_id: 1,
            attributes,
            surfaces: HashMap::new(),
            configs: HashMap::new(),
            contexts: HashMap::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }

    /// Record the call and consume an armed failure if it is due.
    fn enter(&mut self, call: DriverCall) -> Result<(), VaStatus> {
        self.calls.push(call);
        if let Some(armed) = self.failures.get_mut(&call) {
            if armed.skip == 0 {
                let status = armed.status;
                self.failures.remove(&call);
                return Err(status);
            }
            armed.skip -= 1;
        }
        Ok(())
    }

    fn alloc_id(&mut self) -> VaId {
        let id = VaId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// In-process [`VaDriver`] with shared, inspectable state.
#[derive(Clone)]
pub struct SoftwareDriver {
    state: Arc<Mutex<SoftwareState>>,
}

impl std::fmt::Debug for SoftwareDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SoftwareDriver")
            .field("surfaces", &state.surfaces.len())
            .field("configs", &state.configs.len())
            .field("contexts", &state.contexts.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl Default for SoftwareDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDriver {
    /// A driver advertising 4:2:0 surfaces and None/CBR/VBR/CQP rate control.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SoftwareState::new())),
        }
    }

    /// Override the value reported for an attribute.
    ///
    /// Pass `VA_ATTRIB_NOT_SUPPORTED` to make the driver not know it.
    pub fn with_attribute(self, attrib_type: ConfigAttribType, value: u32) -> Self {
        self.state.lock().attributes.insert(attrib_type, value);
        self
    }

    /// Make the next call to `call` fail with `status`.
    pub fn fail_next(&self, call: DriverCall, status: VaStatus) {
        self.fail_after(call, 0, status);
    }

    /// Let `skip` calls to `call` succeed, then fail the following one.
    pub fn fail_after(&self, call: DriverCall, skip: usize, status: VaStatus) {
        self.state
            .lock()
            .failures
            .insert(call, ArmedFailure { skip, status });
    }

    pub fn call_count(&self, call: DriverCall) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn live_surfaces(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    pub fn live_configs(&self) -> usize {
        self.state.lock().configs.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.state.lock().contexts.len()
    }

    pub fn config_attribs(&self, config: VaId) -> Option<Vec<ConfigAttrib>> {
        self.state
            .lock()
            .configs
            .get(&config)
            .map(|c| c.attribs.clone())
    }

    pub fn context(&self, context: VaId) -> Option<ContextRecord> {
        self.state.lock().contexts.get(&context).cloned()
    }
}

impl VaDriver for SoftwareDriver {
    fn name(&self) -> &str {
        "software"
    }

    fn create_surface(
        &mut self,
        chroma: ChromaType,
        width: u32,
        height: u32,
    ) -> Result<VaId, VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::CreateSurface)?;
        if width == 0 || height == 0 {
            return Err(VA_STATUS_ERROR_INVALID_PARAMETER);
        }
        let id = state.alloc_id();
        state
            .surfaces
            .insert(id, (chroma, Resolution::new(width, height)));
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: VaId) -> Result<(), VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::DestroySurface)?;
        state
            .surfaces
            .remove(&surface)
            .map(|_| ())
            .ok_or(VA_STATUS_ERROR_INVALID_SURFACE)
    }

    fn get_config_attributes(
        &mut self,
        _profile: VaProfile,
        _entrypoint: VaEntrypoint,
        attribs: &mut [ConfigAttrib],
    ) -> Result<(), VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::GetConfigAttributes)?;
        for attrib in attribs.iter_mut() {
            attrib.value = state
                .attributes
                .get(&attrib.attrib_type)
                .copied()
                .unwrap_or(VA_ATTRIB_NOT_SUPPORTED);
        }
        Ok(())
    }

    fn create_config(
        &mut self,
        profile: VaProfile,
        entrypoint: VaEntrypoint,
        attribs: &[ConfigAttrib],
    ) -> Result<VaId, VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::CreateConfig)?;
        let id = state.alloc_id();
        state.configs.insert(
            id,
            ConfigRecord {
                profile,
                entrypoint,
                attribs: attribs.to_vec(),
            },
        );
        Ok(id)
    }

    fn destroy_config(&mut self, config: VaId) -> Result<(), VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::DestroyConfig)?;
        state
            .configs
            .remove(&config)
            .map(|_| ())
            .ok_or(VA_STATUS_ERROR_INVALID_CONFIG)
    }

    fn create_context(
        &mut self,
        config: VaId,
        width: u32,
        height: u32,
        flags: u32,
        render_targets: &[VaId],
    ) -> Result<VaId, VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::CreateContext)?;
        if !state.configs.contains_key(&config) {
            return Err(VA_STATUS_ERROR_INVALID_CONFIG);
        }
        if render_targets
            .iter()
            .any(|id| !state.surfaces.contains_key(id))
        {
            return Err(VA_STATUS_ERROR_INVALID_SURFACE);
        }
        let id = state.alloc_id();
        state.contexts.insert(
            id,
            ContextRecord {
                config,
                resolution: Resolution::new(width, height),
                flags,
                render_targets: render_targets.to_vec(),
            },
        );
        Ok(id)
    }

    fn destroy_context(&mut self, context: VaId) -> Result<(), VaStatus> {
        let mut state = self.state.lock();
        state.enter(DriverCall::DestroyContext)?;
        state
            .contexts
            .remove(&context)
            .map(|_| ())
            .ok_or(VA_STATUS_ERROR_INVALID_CONTEXT)
    }
}
