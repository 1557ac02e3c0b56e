//! Session descriptor: what a hardware context is negotiated for.

use serde::{Deserialize, Serialize};

use crate::codec::{Entrypoint, Profile, RateControl};
use crate::error::{ContextError, ContextResult};
use crate::types::Resolution;

/// Caller-supplied description of a decode/encode context.
///
/// Immutable per negotiation round: a context stores its own copy and
/// replaces it wholesale on reset. `Default` produces a descriptor with no
/// profile or entry point, which [`ContextInfo::validate`] rejects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub profile: Option<Profile>,
    pub entrypoint: Option<Entrypoint>,
    /// Coded resolution.
    pub resolution: Resolution,
    /// Maximum simultaneous reference frames declared by the bitstream.
    pub ref_frames: u32,
    /// Only consulted for [`Entrypoint::SliceEncode`].
    #[serde(default)]
    pub rc_mode: RateControl,
}

impl ContextInfo {
    pub fn new(profile: Profile, entrypoint: Entrypoint, resolution: Resolution) -> Self {
        Self {
            profile: Some(profile),
            entrypoint: Some(entrypoint),
            resolution,
            ref_frames: 0,
            rc_mode: RateControl::None,
        }
    }

    pub fn with_ref_frames(mut self, ref_frames: u32) -> Self {
        self.ref_frames = ref_frames;
        self
    }

    pub fn with_rate_control(mut self, rc_mode: RateControl) -> Self {
        self.rc_mode = rc_mode;
        self
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }

    /// Check the preconditions for creating any hardware resource.
    pub fn validate(&self) -> ContextResult<()> {
        if self.profile.is_none() {
            return Err(ContextError::InvalidDescriptor(
                "profile must be set".to_string(),
            ));
        }
        if self.entrypoint.is_none() {
            return Err(ContextError::InvalidDescriptor(
                "entry point must be set".to_string(),
            ));
        }
        if self.resolution.width == 0 {
            return Err(ContextError::InvalidDescriptor(
                "width must be > 0".to_string(),
            ));
        }
        if self.resolution.height == 0 {
            return Err(ContextError::InvalidDescriptor(
                "height must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the surface set must be rebuilt to go from `self` to `other`.
    pub fn surfaces_differ(&self, other: &Self) -> bool {
        self.resolution != other.resolution || self.ref_frames != other.ref_frames
    }

    /// Whether the configuration must be renegotiated to go from `self` to `other`.
    ///
    /// A rate-control difference only counts when `other` is a slice encoder.
    pub fn config_differs(&self, other: &Self) -> bool {
        if self.profile != other.profile || self.entrypoint != other.entrypoint {
            return true;
        }
        other.entrypoint == Some(Entrypoint::SliceEncode) && self.rc_mode != other.rc_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_info() -> ContextInfo {
        ContextInfo::new(Profile::H264High, Entrypoint::Vld, Resolution::HD).with_ref_frames(4)
    }

    // ── Validation ───────────────────────────────────────────────

    #[test]
    fn valid_descriptor() {
        assert!(decode_info().validate().is_ok());
    }

    #[test]
    fn default_is_invalid() {
        let err = ContextInfo::default().validate().unwrap_err();
        assert!(matches!(err, ContextError::InvalidDescriptor(_)));
    }

    #[test]
    fn missing_entrypoint_rejected() {
        let mut info = decode_info();
        info.entrypoint = None;
        let err = info.validate().unwrap_err();
        assert!(err.to_string().contains("entry point"));
    }

    #[test]
    fn zero_dimensions_rejected() {
        let mut info = decode_info();
        info.resolution = Resolution::new(1920, 0);
        assert!(matches!(
            info.validate(),
            Err(ContextError::InvalidDescriptor(_))
        ));
        info.resolution = Resolution::new(0, 1080);
        assert!(info.validate().is_err());
    }

    // ── Change detection ─────────────────────────────────────────

    #[test]
    fn identical_descriptors_do_not_differ() {
        let a = decode_info();
        assert!(!a.surfaces_differ(&a.clone()));
        assert!(!a.config_differs(&a.clone()));
    }

    #[test]
    fn resolution_and_ref_frames_affect_surfaces_only() {
        let a = decode_info();
        let mut b = a.clone();
        b.resolution = Resolution::UHD;
        assert!(a.surfaces_differ(&b));
        assert!(!a.config_differs(&b));

        let c = a.clone().with_ref_frames(8);
        assert!(a.surfaces_differ(&c));
    }

    #[test]
    fn rate_control_ignored_for_decode() {
        let a = decode_info();
        let b = a.clone().with_rate_control(RateControl::Cbr);
        assert!(!a.config_differs(&b));
    }

    #[test]
    fn rate_control_counts_for_slice_encode() {
        let a = ContextInfo::new(Profile::H264Main, Entrypoint::SliceEncode, Resolution::HD)
            .with_rate_control(RateControl::Vbr);
        let b = a.clone().with_rate_control(RateControl::Cbr);
        assert!(a.config_differs(&b));
        assert!(!a.surfaces_differ(&b));
    }

    // ── Serialization ────────────────────────────────────────────

    #[test]
    fn deserialize_without_rate_control() {
        let json = r#"{
            "profile": "HevcMain",
            "entrypoint": "Vld",
            "resolution": { "width": 1280, "height": 720 },
            "ref_frames": 6
        }"#;
        let info: ContextInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.profile, Some(Profile::HevcMain));
        assert_eq!(info.rc_mode, RateControl::None);
        assert_eq!(info.resolution, Resolution::new(1280, 720));
        assert!(info.validate().is_ok());
    }
}
