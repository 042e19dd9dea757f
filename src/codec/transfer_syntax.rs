use std::fmt;
use std::str::FromStr;

use super::{CodecKind, CodecParameterBuilder, Quality};
use crate::error::BridgeError;

/// DICOM transfer syntaxes with a native codec behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferSyntax {
    ImplicitVrLittleEndian,
    ExplicitVrLittleEndian,
    JpegBaseline,
    JpegExtended,
    JpegLossless,
    JpegLosslessSv1,
    JpegLsLossless,
    JpegLsNearLossless,
    Jpeg2000Lossless,
    Jpeg2000,
}

impl TransferSyntax {
    pub const ALL: [Self; 10] = [
        Self::ImplicitVrLittleEndian,
        Self::ExplicitVrLittleEndian,
        Self::JpegBaseline,
        Self::JpegExtended,
        Self::JpegLossless,
        Self::JpegLosslessSv1,
        Self::JpegLsLossless,
        Self::JpegLsNearLossless,
        Self::Jpeg2000Lossless,
        Self::Jpeg2000,
    ];

    pub const fn uid(self) -> &'static str {
        match self {
            Self::ImplicitVrLittleEndian => "1.2.840.10008.1.2",
            Self::ExplicitVrLittleEndian => "1.2.840.10008.1.2.1",
            Self::JpegBaseline => "1.2.840.10008.1.2.4.50",
            Self::JpegExtended => "1.2.840.10008.1.2.4.51",
            Self::JpegLossless => "1.2.840.10008.1.2.4.57",
            Self::JpegLosslessSv1 => "1.2.840.10008.1.2.4.70",
            Self::JpegLsLossless => "1.2.840.10008.1.2.4.80",
            Self::JpegLsNearLossless => "1.2.840.10008.1.2.4.81",
            Self::Jpeg2000Lossless => "1.2.840.10008.1.2.4.90",
            Self::Jpeg2000 => "1.2.840.10008.1.2.4.91",
        }
    }

    pub const fn codec(self) -> CodecKind {
        match self {
            Self::ImplicitVrLittleEndian | Self::ExplicitVrLittleEndian => CodecKind::Raw,
            Self::JpegBaseline => CodecKind::JpegBaseline,
            Self::JpegExtended => CodecKind::JpegExtended,
            Self::JpegLossless | Self::JpegLosslessSv1 => CodecKind::JpegLossless,
            Self::JpegLsLossless | Self::JpegLsNearLossless => CodecKind::JpegLs,
            Self::Jpeg2000Lossless | Self::Jpeg2000 => CodecKind::Jpeg2000,
        }
    }

    /// Frames are stored as encapsulated fragments rather than native pixel data.
    pub const fn is_encapsulated(self) -> bool {
        !matches!(self, Self::ImplicitVrLittleEndian | Self::ExplicitVrLittleEndian)
    }

    pub fn default_quality(self) -> Quality {
        match self {
            Self::JpegLsNearLossless => Quality::near_lossless(),
            Self::Jpeg2000Lossless => Quality::Lossless,
            other => other.codec().default_quality(),
        }
    }

    /// Parameter builder preset for encoding to this syntax.
    ///
    /// Both lossless JPEG syntaxes use the first-order predictor (selection value 1).
    pub fn parameter_builder(self) -> CodecParameterBuilder {
        CodecParameterBuilder::new(self.codec()).with_quality(self.default_quality())
    }

    pub fn from_uid(uid: &str) -> Option<Self> {
        let uid = uid.trim_end_matches(['\0', ' ']);
        Self::ALL.into_iter().find(|ts| ts.uid() == uid)
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uid())
    }
}

impl FromStr for TransferSyntax {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uid(s)
            .ok_or_else(|| BridgeError::invalid_argument(format!("transfer syntax {s:?}")))
    }
}
