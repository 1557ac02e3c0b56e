//! Codec profile, entry point, rate-control and chroma enums.
//!
//! Each enum maps onto the numeric codes the VA driver expects. The codes
//! follow `va/va.h`; only the subset a decode/encode context needs is listed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw driver profile code (`VAProfile`).
pub type VaProfile = i32;

/// Raw driver entry point code (`VAEntrypoint`).
pub type VaEntrypoint = i32;

/// Codec profile (codec + level family).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    Mpeg2Simple,
    Mpeg2Main,
    Mpeg4Simple,
    Mpeg4AdvancedSimple,
    Mpeg4Main,
    H264ConstrainedBaseline,
    H264Main,
    H264High,
    Vc1Simple,
    Vc1Main,
    Vc1Advanced,
    JpegBaseline,
    Vp8,
    HevcMain,
    HevcMain10,
    Vp9Profile0,
    Vp9Profile2,
    Av1Profile0,
}

impl Profile {
    /// Driver code for this profile.
    pub fn va_profile(self) -> VaProfile {
        match self {
            Self::Mpeg2Simple => 0,
            Self::Mpeg2Main => 1,
            Self::Mpeg4Simple => 2,
            Self::Mpeg4AdvancedSimple => 3,
            Self::Mpeg4Main => 4,
            Self::H264Main => 6,
            Self::H264High => 7,
            Self::Vc1Simple => 8,
            Self::Vc1Main => 9,
            Self::Vc1Advanced => 10,
            Self::JpegBaseline => 12,
            Self::H264ConstrainedBaseline => 13,
            Self::Vp8 => 14,
            Self::HevcMain => 17,
            Self::HevcMain10 => 18,
            Self::Vp9Profile0 => 19,
            Self::Vp9Profile2 => 21,
            Self::Av1Profile0 => 32,
        }
    }

    /// Human-readable name (for display/logging).
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Mpeg2Simple => "MPEG-2 Simple",
            Self::Mpeg2Main => "MPEG-2 Main",
            Self::Mpeg4Simple => "MPEG-4 Simple",
            Self::Mpeg4AdvancedSimple => "MPEG-4 Advanced Simple",
            Self::Mpeg4Main => "MPEG-4 Main",
            Self::H264ConstrainedBaseline => "H.264 Constrained Baseline",
            Self::H264Main => "H.264 Main",
            Self::H264High => "H.264 High",
            Self::Vc1Simple => "VC-1 Simple",
            Self::Vc1Main => "VC-1 Main",
            Self::Vc1Advanced => "VC-1 Advanced",
            Self::JpegBaseline => "JPEG Baseline",
            Self::Vp8 => "VP8",
            Self::HevcMain => "H.265 Main",
            Self::HevcMain10 => "H.265 Main 10",
            Self::Vp9Profile0 => "VP9 Profile 0",
            Self::Vp9Profile2 => "VP9 Profile 2",
            Self::Av1Profile0 => "AV1 Profile 0",
        }
    }
}

/// Hardware entry point (what the context is used for).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entrypoint {
    /// Variable-length decode (full bitstream decode).
    Vld,
    /// Inverse DCT acceleration.
    Idct,
    /// Motion compensation acceleration.
    MoComp,
    /// Slice-level encode.
    SliceEncode,
    /// Picture-level encode (JPEG).
    PictureEncode,
    /// Low-power slice encode.
    SliceEncodeLp,
    /// Video post-processing.
    VideoProc,
}

impl Entrypoint {
    /// Driver code for this entry point.
    pub fn va_entrypoint(self) -> VaEntrypoint {
        match self {
            Self::Vld => 1,
            Self::Idct => 3,
            Self::MoComp => 4,
            Self::SliceEncode => 6,
            Self::PictureEncode => 7,
            Self::VideoProc => 10,
            Self::SliceEncodeLp => 8,
        }
    }
}

/// Encoder rate-control mode.
///
/// Only meaningful for encode entry points. Bit values match the
/// `VA_RC_*` masks so a mode can be tested against a capability mask.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateControl {
    #[default]
    None,
    Cbr,
    Vbr,
    Vcm,
    Cqp,
    VbrConstrained,
    Icq,
    Mb,
    Qvbr,
    Avbr,
}

impl RateControl {
    /// `VA_RC_*` bit for this mode.
    pub fn va_mask(self) -> u32 {
        match self {
            Self::None => 0x0000_0001,
            Self::Cbr => 0x0000_0002,
            Self::Vbr => 0x0000_0004,
            Self::Vcm => 0x0000_0008,
            Self::Cqp => 0x0000_0010,
            Self::VbrConstrained => 0x0000_0020,
            Self::Icq => 0x0000_0040,
            Self::Mb => 0x0000_0080,
            Self::Qvbr => 0x0000_0400,
            Self::Avbr => 0x0000_0800,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Cbr => "CBR",
            Self::Vbr => "VBR",
            Self::Vcm => "VCM",
            Self::Cqp => "CQP",
            Self::VbrConstrained => "VBR-Constrained",
            Self::Icq => "ICQ",
            Self::Mb => "MB",
            Self::Qvbr => "QVBR",
            Self::Avbr => "AVBR",
        }
    }
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Surface chroma sampling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChromaType {
    #[default]
    Yuv420,
    Yuv422,
    Yuv444,
    Yuv420_10,
}

impl ChromaType {
    /// `VA_RT_FORMAT_*` bit for this chroma type.
    pub fn va_rt_format(self) -> u32 {
        match self {
            Self::Yuv420 => 0x0000_0001,
            Self::Yuv422 => 0x0000_0002,
            Self::Yuv444 => 0x0000_0004,
            Self::Yuv420_10 => 0x0000_0100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_codes() {
        assert_eq!(Profile::H264Main.va_profile(), 6);
        assert_eq!(Profile::HevcMain.va_profile(), 17);
        assert_eq!(Profile::Av1Profile0.va_profile(), 32);
        assert_eq!(Profile::H264High.display_name(), "H.264 High");
    }

    #[test]
    fn entrypoint_codes() {
        assert_eq!(Entrypoint::Vld.va_entrypoint(), 1);
        assert_eq!(Entrypoint::SliceEncode.va_entrypoint(), 6);
        assert_eq!(Entrypoint::SliceEncodeLp.va_entrypoint(), 8);
        assert_eq!(Entrypoint::VideoProc.va_entrypoint(), 10);
    }

    #[test]
    fn rate_control_masks_are_distinct_bits() {
        let modes = [
            RateControl::None,
            RateControl::Cbr,
            RateControl::Vbr,
            RateControl::Vcm,
            RateControl::Cqp,
            RateControl::VbrConstrained,
            RateControl::Icq,
            RateControl::Mb,
            RateControl::Qvbr,
            RateControl::Avbr,
        ];
        let mut seen = 0u32;
        for mode in modes {
            let mask = mode.va_mask();
            assert_eq!(mask.count_ones(), 1, "{mode} must be a single bit");
            assert_eq!(seen & mask, 0, "{mode} overlaps another mode");
            seen |= mask;
        }
    }

    #[test]
    fn rate_control_display() {
        assert_eq!(RateControl::Cbr.to_string(), "CBR");
        assert_eq!(RateControl::VbrConstrained.to_string(), "VBR-Constrained");
        assert_eq!(RateControl::default(), RateControl::None);
    }

    #[test]
    fn yuv420_rt_format() {
        assert_eq!(ChromaType::Yuv420.va_rt_format(), 0x1);
        assert_eq!(ChromaType::default(), ChromaType::Yuv420);
    }
}
