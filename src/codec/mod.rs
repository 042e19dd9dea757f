//! Codec selection, parameter blocks and the native codec boundary.

mod native;
mod parameters;
mod transfer_syntax;

pub use native::{FrameDecoder, FrameEncoder, NativeCodec, RawCodec};
pub use parameters::{
    CodecParameterBuilder, EncodeParameters, InterleaveMode, PARAMETER_BLOCK_VERSION,
    ParameterSlot, SLOT_COUNT, compute_maximum_near_lossless,
};
pub use transfer_syntax::TransferSyntax;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::constants::{DEFAULT_J2K_COMPRESSION_RATIO, DEFAULT_JPEG_QUALITY, DEFAULT_NEAR_LOSSLESS};

/// Native codec family. The discriminant is the codec id of the parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum CodecKind {
    /// Uncompressed native pixel data.
    Raw = 0,
    /// JPEG process 1, 8-bit lossy.
    JpegBaseline = 1,
    /// JPEG process 2 & 4, up to 12-bit lossy.
    JpegExtended = 2,
    /// JPEG process 14, lossless with predictor.
    JpegLossless = 3,
    JpegLs = 4,
    Jpeg2000 = 5,
}

impl CodecKind {
    /// Codecs whose lossless mode reproduces every sample bit-exactly, and thus cannot
    /// accept data that was chroma subsampled before encoding.
    pub const fn is_true_lossless_capable(self) -> bool {
        matches!(self, Self::JpegLossless | Self::JpegLs | Self::Jpeg2000)
    }

    pub const fn supports_near_lossless(self) -> bool {
        matches!(self, Self::JpegLs)
    }

    pub const fn is_lossy_jpeg(self) -> bool {
        matches!(self, Self::JpegBaseline | Self::JpegExtended)
    }

    pub fn default_quality(self) -> Quality {
        match self {
            Self::Raw | Self::JpegLossless | Self::JpegLs => Quality::Lossless,
            Self::JpegBaseline | Self::JpegExtended => Quality::Lossy {
                quality: DEFAULT_JPEG_QUALITY,
            },
            Self::Jpeg2000 => Quality::CompressionRatio(DEFAULT_J2K_COMPRESSION_RATIO),
        }
    }
}

/// Requested fidelity of an encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Lossless,
    /// JPEG quality factor, 1 to 100.
    Lossy { quality: u32 },
    /// JPEG 2000 target compression ratio.
    CompressionRatio(u32),
    /// JPEG-LS maximum absolute sample error (NEAR).
    NearLossless { error: u32 },
}

impl Quality {
    pub fn near_lossless() -> Self {
        Self::NearLossless {
            error: DEFAULT_NEAR_LOSSLESS,
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Lossless | Self::NearLossless { error: 0 })
    }
}
