//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque driver object id (surface, config or context).
///
/// `VaId::INVALID` is the driver's "not created" sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VaId(pub u32);

impl VaId {
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for VaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Coded video resolution.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Self = Self {
        width: 1920,
        height: 1080,
    };
    pub const UHD: Self = Self {
        width: 3840,
        height: 2160,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Config attribute value reported when the driver does not know the attribute.
pub const VA_ATTRIB_NOT_SUPPORTED: u32 = 0x8000_0000;

/// Config attribute type (`VAConfigAttribType`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigAttribType {
    RtFormat,
    SpatialResidual,
    SpatialClipping,
    IntraResidual,
    Encryption,
    RateControl,
    DecSliceMode,
    EncPackedHeaders,
    EncInterlaced,
    EncMaxRefFrames,
    EncMaxSlices,
    EncSliceStructure,
    EncQualityRange,
    EncIntraRefresh,
    EncRoi,
}

impl ConfigAttribType {
    /// Driver code for this attribute type.
    pub fn va_code(self) -> i32 {
        match self {
            Self::RtFormat => 0,
            Self::SpatialResidual => 1,
            Self::SpatialClipping => 2,
            Self::IntraResidual => 3,
            Self::Encryption => 4,
            Self::RateControl => 5,
            Self::DecSliceMode => 6,
            Self::EncPackedHeaders => 10,
            Self::EncInterlaced => 11,
            Self::EncMaxRefFrames => 13,
            Self::EncMaxSlices => 14,
            Self::EncSliceStructure => 15,
            Self::EncQualityRange => 21,
            Self::EncIntraRefresh => 23,
            Self::EncRoi => 25,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RtFormat => "RTFormat",
            Self::SpatialResidual => "SpatialResidual",
            Self::SpatialClipping => "SpatialClipping",
            Self::IntraResidual => "IntraResidual",
            Self::Encryption => "Encryption",
            Self::RateControl => "RateControl",
            Self::DecSliceMode => "DecSliceMode",
            Self::EncPackedHeaders => "EncPackedHeaders",
            Self::EncInterlaced => "EncInterlaced",
            Self::EncMaxRefFrames => "EncMaxRefFrames",
            Self::EncMaxSlices => "EncMaxSlices",
            Self::EncSliceStructure => "EncSliceStructure",
            Self::EncQualityRange => "EncQualityRange",
            Self::EncIntraRefresh => "EncIntraRefresh",
            Self::EncRoi => "EncROI",
        }
    }
}

impl fmt::Display for ConfigAttribType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single (type, value) config attribute pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConfigAttrib {
    pub attrib_type: ConfigAttribType,
    pub value: u32,
}

impl ConfigAttrib {
    /// An attribute entry ready to be filled in by a driver query.
    pub fn query(attrib_type: ConfigAttribType) -> Self {
        Self {
            attrib_type,
            value: VA_ATTRIB_NOT_SUPPORTED,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.value != VA_ATTRIB_NOT_SUPPORTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn va_id_sentinel() {
        assert!(!VaId::INVALID.is_valid());
        assert!(VaId(0).is_valid());
        assert_eq!(VaId(0x2a).to_string(), "0x0000002a");
    }

    #[test]
    fn resolution_empty() {
        assert!(Resolution::new(0, 1080).is_empty());
        assert!(Resolution::new(1920, 0).is_empty());
        assert!(!Resolution::HD.is_empty());
        assert_eq!(Resolution::HD.to_string(), "1920x1080");
    }

    #[test]
    fn query_attrib_starts_unsupported() {
        let attrib = ConfigAttrib::query(ConfigAttribType::RateControl);
        assert!(!attrib.is_supported());
        assert_eq!(attrib.attrib_type.va_code(), 5);
    }
}
