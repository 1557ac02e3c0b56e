//! Configuration negotiation: capability query, validation and creation.
//!
//! ```text
//! ContextInfo
//!   --> HwCodes (profile / entry point driver codes)
//!     --> attribute table for the entry point
//!       --> vaGetConfigAttributes
//!         --> validate RT format + rate control
//!           --> vaCreateConfig
//! ```
//!
//! Query and creation are separate steps so a caller can check capabilities
//! before tearing down a working configuration.

use tracing::{debug, error, warn};

use va_common::{
    check_status, ChromaType, ConfigAttrib, ConfigAttribType, ContextError, ContextInfo,
    ContextResult, Entrypoint, RateControl, VaEntrypoint, VaId, VaProfile,
};

use crate::display::Display;

/// Driver codes for a profile / entry-point pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HwCodes {
    pub profile: VaProfile,
    pub entrypoint: VaEntrypoint,
}

impl HwCodes {
    /// Translate the descriptor's profile and entry point.
    ///
    /// # Errors
    /// Returns `ContextError::InvalidDescriptor` if either is unset.
    pub fn from_info(info: &ContextInfo) -> ContextResult<Self> {
        match (info.profile, info.entrypoint) {
            (Some(profile), Some(entrypoint)) => Ok(Self {
                profile: profile.va_profile(),
                entrypoint: entrypoint.va_entrypoint(),
            }),
            _ => Err(ContextError::InvalidDescriptor(
                "profile and entry point must be set".to_string(),
            )),
        }
    }
}

/// Attributes queried when negotiating a configuration for `entrypoint`.
pub fn attribute_table(entrypoint: Entrypoint) -> &'static [ConfigAttribType] {
    match entrypoint {
        Entrypoint::SliceEncode => &[ConfigAttribType::RtFormat, ConfigAttribType::RateControl],
        _ => &[ConfigAttribType::RtFormat],
    }
}

/// Outcome of a successful capability check, ready to be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiation {
    pub codes: HwCodes,
    pub attribs: Vec<ConfigAttrib>,
}

impl Negotiation {
    pub fn value(&self, attrib_type: ConfigAttribType) -> Option<u32> {
        self.attribs
            .iter()
            .find(|a| a.attrib_type == attrib_type)
            .map(|a| a.value)
    }
}

/// Negotiates configurations against one display.
#[derive(Debug)]
pub struct ConfigNegotiator<'a> {
    display: &'a Display,
}

impl<'a> ConfigNegotiator<'a> {
    pub fn new(display: &'a Display) -> Self {
        Self { display }
    }

    /// Query and validate the capabilities `info` needs, without creating anything.
    ///
    /// # Errors
    /// - `HardwareCall` if the attribute query fails.
    /// - `CapabilityUnsupported` if 4:2:0 surfaces or the requested rate
    ///   control mode are not advertised.
    pub fn negotiate(&self, info: &ContextInfo) -> ContextResult<Negotiation> {
        let codes = HwCodes::from_info(info)?;
        let Some(entrypoint) = info.entrypoint else {
            return Err(ContextError::InvalidDescriptor(
                "entry point must be set".to_string(),
            ));
        };

        let mut attribs: Vec<ConfigAttrib> = attribute_table(entrypoint)
            .iter()
            .copied()
            .map(ConfigAttrib::query)
            .collect();
        self.query(codes, &mut attribs)?;

        for attrib in &mut attribs {
            match attrib.attrib_type {
                ConfigAttribType::RtFormat => {
                    let yuv420 = ChromaType::Yuv420.va_rt_format();
                    if !attrib.is_supported() || attrib.value & yuv420 == 0 {
                        return Err(ContextError::CapabilityUnsupported {
                            capability: "surface format",
                            value: "YUV 4:2:0".to_string(),
                        });
                    }
                }
                ConfigAttribType::RateControl => {
                    attrib.value = select_rate_control(info.rc_mode, attrib.value)?;
                }
                _ => {}
            }
        }

        debug!(
            profile = codes.profile,
            entrypoint = codes.entrypoint,
            attribs = attribs.len(),
            "Config capabilities negotiated"
        );
        Ok(Negotiation { codes, attribs })
    }

    /// Create the driver configuration for a completed negotiation.
    ///
    /// # Errors
    /// Returns `HardwareCall` if `vaCreateConfig` fails.
    pub fn create(&self, negotiation: &Negotiation) -> ContextResult<VaId> {
        let codes = negotiation.codes;
        let result = self.display.lock().create_config(
            codes.profile,
            codes.entrypoint,
            &negotiation.attribs,
        );
        let config = check_status(result, "vaCreateConfig()").inspect_err(|e| {
            warn!(error = %e, profile = codes.profile, "Config creation failed");
        })?;

        debug!(config = %config, "Created config");
        Ok(config)
    }

    /// Query a single attribute value.
    ///
    /// # Errors
    /// Fails if the query fails or the driver does not know the attribute.
    pub fn get_attribute(&self, codes: HwCodes, attrib_type: ConfigAttribType) -> ContextResult<u32> {
        let mut attribs = [ConfigAttrib::query(attrib_type)];
        self.query(codes, &mut attribs)?;
        let [attrib] = attribs;
        if !attrib.is_supported() {
            return Err(ContextError::CapabilityUnsupported {
                capability: "config attribute",
                value: attrib_type.name().to_string(),
            });
        }
        Ok(attrib.value)
    }

    fn query(&self, codes: HwCodes, attribs: &mut [ConfigAttrib]) -> ContextResult<()> {
        let result =
            self.display
                .lock()
                .get_config_attributes(codes.profile, codes.entrypoint, attribs);
        check_status(result, "vaGetConfigAttributes()").inspect_err(|e| {
            warn!(error = %e, profile = codes.profile, "Capability query failed");
        })
    }
}

/// Pick the rate-control value to configure from the driver's capability mask.
///
/// `RateControl::None` is always accepted; any other mode needs every one of
/// its bits present in `capabilities`.
pub fn select_rate_control(requested: RateControl, capabilities: u32) -> ContextResult<u32> {
    let wanted = requested.va_mask();
    let available = if requested == RateControl::None {
        wanted
    } else {
        capabilities
    };

    if available & wanted != wanted {
        error!(mode = %requested, capabilities, "unsupported rate control");
        return Err(ContextError::CapabilityUnsupported {
            capability: "rate control",
            value: requested.name().to_string(),
        });
    }
    Ok(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::{DriverCall, SoftwareDriver};
    use va_common::status::{VA_STATUS_ERROR_INVALID_DISPLAY, VA_STATUS_ERROR_UNSUPPORTED_PROFILE};
    use va_common::{Profile, Resolution, VA_ATTRIB_NOT_SUPPORTED};

    fn encode_info(rc: RateControl) -> ContextInfo {
        ContextInfo::new(Profile::H264Main, Entrypoint::SliceEncode, Resolution::HD)
            .with_rate_control(rc)
    }

    fn decode_info() -> ContextInfo {
        ContextInfo::new(Profile::H264High, Entrypoint::Vld, Resolution::HD)
    }

    // ── Attribute table ──────────────────────────────────────────

    #[test]
    fn decode_queries_format_only() {
        assert_eq!(attribute_table(Entrypoint::Vld), &[ConfigAttribType::RtFormat]);
    }

    #[test]
    fn slice_encode_queries_rate_control() {
        assert_eq!(
            attribute_table(Entrypoint::SliceEncode),
            &[ConfigAttribType::RtFormat, ConfigAttribType::RateControl]
        );
    }

    // ── Rate control selection ───────────────────────────────────

    #[test]
    fn none_is_always_accepted() {
        assert_eq!(
            select_rate_control(RateControl::None, 0).unwrap(),
            RateControl::None.va_mask()
        );
        assert!(select_rate_control(RateControl::None, VA_ATTRIB_NOT_SUPPORTED).is_ok());
    }

    #[test]
    fn supported_mode_selected() {
        let caps = RateControl::Cbr.va_mask() | RateControl::Vbr.va_mask();
        assert_eq!(
            select_rate_control(RateControl::Vbr, caps).unwrap(),
            RateControl::Vbr.va_mask()
        );
    }

    #[test]
    fn missing_mode_names_it() {
        let caps = RateControl::Vbr.va_mask();
        let err = select_rate_control(RateControl::Cbr, caps).unwrap_err();
        assert_eq!(
            err,
            ContextError::CapabilityUnsupported {
                capability: "rate control",
                value: "CBR".to_string(),
            }
        );
    }

    // ── Negotiation ──────────────────────────────────────────────

    #[test]
    fn negotiate_decode() {
        let driver = SoftwareDriver::new();
        let display = Display::new(driver.clone());
        let neg = ConfigNegotiator::new(&display).negotiate(&decode_info()).unwrap();
        assert_eq!(neg.codes.profile, Profile::H264High.va_profile());
        assert_eq!(neg.attribs.len(), 1);
        assert_eq!(driver.call_count(DriverCall::CreateConfig), 0);
    }

    #[test]
    fn negotiate_encode_overrides_rate_control_value() {
        let driver = SoftwareDriver::new();
        let display = Display::new(driver);
        let neg = ConfigNegotiator::new(&display)
            .negotiate(&encode_info(RateControl::Cbr))
            .unwrap();
        assert_eq!(
            neg.value(ConfigAttribType::RateControl),
            Some(RateControl::Cbr.va_mask())
        );
    }

    #[test]
    fn negotiate_rejects_missing_yuv420() {
        let driver = SoftwareDriver::new()
            .with_attribute(ConfigAttribType::RtFormat, ChromaType::Yuv444.va_rt_format());
        let display = Display::new(driver);
        let err = ConfigNegotiator::new(&display)
            .negotiate(&decode_info())
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::CapabilityUnsupported {
                capability: "surface format",
                ..
            }
        ));
    }

    #[test]
    fn negotiate_rejects_unsupported_rate_control() {
        let driver = SoftwareDriver::new()
            .with_attribute(ConfigAttribType::RateControl, RateControl::Vbr.va_mask());
        let display = Display::new(driver);
        let err = ConfigNegotiator::new(&display)
            .negotiate(&encode_info(RateControl::Cbr))
            .unwrap_err();
        assert!(err.to_string().contains("CBR"));
    }

    #[test]
    fn query_failure_is_hardware_error() {
        let driver = SoftwareDriver::new();
        driver.fail_next(DriverCall::GetConfigAttributes, VA_STATUS_ERROR_INVALID_DISPLAY);
        let display = Display::new(driver);
        let err = ConfigNegotiator::new(&display)
            .negotiate(&decode_info())
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::HardwareCall {
                call: "vaGetConfigAttributes()",
                ..
            }
        ));
    }

    // ── Creation ─────────────────────────────────────────────────

    #[test]
    fn create_config_registers_with_driver() {
        let driver = SoftwareDriver::new();
        let display = Display::new(driver.clone());
        let negotiator = ConfigNegotiator::new(&display);
        let neg = negotiator.negotiate(&encode_info(RateControl::Vbr)).unwrap();
        let config = negotiator.create(&neg).unwrap();
        assert!(config.is_valid());
        assert_eq!(driver.live_configs(), 1);
        assert_eq!(driver.config_attribs(config), Some(neg.attribs));
    }

    #[test]
    fn create_failure_reported() {
        let driver = SoftwareDriver::new();
        driver.fail_next(DriverCall::CreateConfig, VA_STATUS_ERROR_UNSUPPORTED_PROFILE);
        let display = Display::new(driver.clone());
        let negotiator = ConfigNegotiator::new(&display);
        let neg = negotiator.negotiate(&decode_info()).unwrap();
        let err = negotiator.create(&neg).unwrap_err();
        assert!(err.to_string().contains("vaCreateConfig()"));
        assert_eq!(driver.live_configs(), 0);
    }

    // ── Single attribute ─────────────────────────────────────────

    #[test]
    fn get_known_attribute() {
        let driver = SoftwareDriver::new();
        let display = Display::new(driver);
        let codes = HwCodes::from_info(&decode_info()).unwrap();
        let value = ConfigNegotiator::new(&display)
            .get_attribute(codes, ConfigAttribType::RtFormat)
            .unwrap();
        assert_ne!(value & ChromaType::Yuv420.va_rt_format(), 0);
    }

    #[test]
    fn get_unknown_attribute_fails() {
        let driver = SoftwareDriver::new();
        let display = Display::new(driver);
        let codes = HwCodes::from_info(&decode_info()).unwrap();
        let err = ConfigNegotiator::new(&display)
            .get_attribute(codes, ConfigAttribType::EncRoi)
            .unwrap_err();
        assert!(err.to_string().contains("EncROI"));
    }
}
