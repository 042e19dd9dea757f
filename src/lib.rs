//! Frame segment resolution and native pixel matrix bridging.
//!
//! A container parser hands this crate a fragment table and a [`PixelDescriptor`].
//! The crate then:
//!
//! - resolves the exact byte ranges of a logical frame over a file or an in-memory
//!   buffer ([`fragment`], [`segment`]),
//! - converts between generic rasters, raw native frame bytes and the fixed-layout
//!   [`NativeMatrix`] consumed by codecs ([`bridge`]),
//! - builds the fixed-position parameter block of a native encode call ([`codec`]).
//!
//! Codec entropy coding itself is behind the [`codec::NativeCodec`] trait.

pub mod bridge;
pub mod codec;
pub mod constants;
pub mod error;
pub mod fragment;
pub mod matrix;
pub mod raster;
pub mod segment;

pub use bridge::{BitOrder, BridgeOptions, ChannelOrder, PixelBufferBridge};
pub use codec::{CodecKind, CodecParameterBuilder, EncodeParameters, Quality};
pub use error::{BridgeError, NativeError, Result};
pub use fragment::{FragmentStore, FragmentTable, FrameFragment, SourceStream};
pub use matrix::{ElementType, MatrixData, NativeMatrix};
pub use raster::{Raster, RasterLayout, SampleData};
pub use segment::{FrameResolver, FrameTable, LogicalFrame, Segment, SegmentLocator, StreamSegmentRange};

use std::fmt;
use std::str::FromStr;

use crate::constants::{MAXIMUM_SAMPLES_PER_PIXEL, MINIMUM_SAMPLES_PER_PIXEL};

/// Arrangement of color samples in native frame data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanarConfiguration {
    /// Samples of one pixel are adjacent (R1 G1 B1 R2 G2 B2 ...).
    #[default]
    Interleaved = 0,
    /// Each color component is stored as a separate plane (R1 R2 ... G1 G2 ... B1 B2 ...).
    Planar = 1,
}

impl std::convert::TryFrom<u16> for PlanarConfiguration {
    type Error = BridgeError;
    fn try_from(v: u16) -> std::result::Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Interleaved),
            1 => Ok(Self::Planar),
            _ => Err(BridgeError::invalid_argument(format!(
                "planar configuration {v}"
            ))),
        }
    }
}

/// Color model of the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhotometricInterpretation {
    Monochrome1,
    #[default]
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
    YbrPartial422,
    YbrPartial420,
    YbrIct,
    YbrRct,
}

impl PhotometricInterpretation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monochrome1 => "MONOCHROME1",
            Self::Monochrome2 => "MONOCHROME2",
            Self::PaletteColor => "PALETTE COLOR",
            Self::Rgb => "RGB",
            Self::YbrFull => "YBR_FULL",
            Self::YbrFull422 => "YBR_FULL_422",
            Self::YbrPartial422 => "YBR_PARTIAL_422",
            Self::YbrPartial420 => "YBR_PARTIAL_420",
            Self::YbrIct => "YBR_ICT",
            Self::YbrRct => "YBR_RCT",
        }
    }

    /// True when the chroma channels are stored at reduced resolution.
    pub const fn is_subsampled(self) -> bool {
        matches!(
            self,
            Self::YbrFull422 | Self::YbrPartial422 | Self::YbrPartial420
        )
    }

    pub const fn is_ybr(self) -> bool {
        matches!(
            self,
            Self::YbrFull
                | Self::YbrFull422
                | Self::YbrPartial422
                | Self::YbrPartial420
                | Self::YbrIct
                | Self::YbrRct
        )
    }

    pub const fn is_monochrome(self) -> bool {
        matches!(self, Self::Monochrome1 | Self::Monochrome2)
    }
}

impl fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotometricInterpretation {
    type Err = BridgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Values are padded with a trailing space to even length in DICOM.
        match s.trim_end_matches([' ', '\0']) {
            "MONOCHROME1" => Ok(Self::Monochrome1),
            "MONOCHROME2" => Ok(Self::Monochrome2),
            "PALETTE COLOR" => Ok(Self::PaletteColor),
            "RGB" => Ok(Self::Rgb),
            "YBR_FULL" => Ok(Self::YbrFull),
            "YBR_FULL_422" => Ok(Self::YbrFull422),
            "YBR_PARTIAL_422" => Ok(Self::YbrPartial422),
            "YBR_PARTIAL_420" => Ok(Self::YbrPartial420),
            "YBR_ICT" => Ok(Self::YbrIct),
            "YBR_RCT" => Ok(Self::YbrRct),
            other => Err(BridgeError::invalid_argument(format!(
                "photometric interpretation {other:?}"
            ))),
        }
    }
}

/// Pixel layout of one frame as declared by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelDescriptor {
    pub width: u32,
    pub height: u32,
    pub bits_allocated: u32,
    pub bits_stored: u32,
    pub samples_per_pixel: u32,
    pub planar_configuration: PlanarConfiguration,
    pub photometric_interpretation: PhotometricInterpretation,
    pub signed: bool,
    /// Samples are IEEE floating point (float or double float pixel data).
    pub floating_point: bool,
}

impl Default for PixelDescriptor {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            bits_allocated: 8,
            bits_stored: 8,
            samples_per_pixel: 1,
            planar_configuration: PlanarConfiguration::Interleaved,
            photometric_interpretation: PhotometricInterpretation::Monochrome2,
            signed: false,
            floating_point: false,
        }
    }
}

impl PixelDescriptor {
    pub fn new(width: u32, height: u32, bits_allocated: u32, samples_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bits_allocated,
            bits_stored: bits_allocated,
            samples_per_pixel,
            photometric_interpretation: if samples_per_pixel == 3 {
                PhotometricInterpretation::Rgb
            } else {
                PhotometricInterpretation::Monochrome2
            },
            ..Self::default()
        }
    }

    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    pub fn with_bits_stored(mut self, bits_stored: u32) -> Self {
        self.bits_stored = bits_stored;
        self
    }

    pub fn with_planar_configuration(mut self, planar: PlanarConfiguration) -> Self {
        self.planar_configuration = planar;
        self
    }

    pub fn with_photometric(mut self, photometric: PhotometricInterpretation) -> Self {
        self.photometric_interpretation = photometric;
        self
    }

    pub fn with_floating_point(mut self, floating_point: bool) -> Self {
        self.floating_point = floating_point;
        self
    }

    /// Native element type of the decoded matrix.
    pub fn element_type(&self) -> Result<ElementType> {
        ElementType::from_sample_format(self.bits_allocated, self.signed, self.floating_point)
    }

    pub fn is_binary(&self) -> bool {
        self.bits_allocated == 1
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of bytes of one uncompressed frame.
    ///
    /// 1-bit frames are a continuous bit stream rounded up to whole bytes.
    pub fn frame_length(&self) -> u64 {
        let samples = self.pixel_count() as u64 * self.samples_per_pixel as u64;
        if self.is_binary() {
            samples.div_ceil(8)
        } else {
            samples * (self.bits_allocated as u64).div_ceil(8)
        }
    }

    /// Largest unsigned magnitude representable in `bits_stored` bits.
    pub fn maximum_sample_value(&self) -> u32 {
        match self.bits_stored {
            0 => 0,
            b if b >= 32 => u32::MAX,
            b => (1u32 << b) - 1,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(BridgeError::invalid_argument(format!(
                "frame size {}x{}",
                self.width, self.height
            )));
        }
        if !(MINIMUM_SAMPLES_PER_PIXEL..=MAXIMUM_SAMPLES_PER_PIXEL)
            .contains(&self.samples_per_pixel)
        {
            return Err(BridgeError::invalid_argument(format!(
                "samples per pixel {}",
                self.samples_per_pixel
            )));
        }
        if self.bits_stored == 0 || self.bits_stored > self.bits_allocated {
            return Err(BridgeError::invalid_argument(format!(
                "bits stored {} with bits allocated {}",
                self.bits_stored, self.bits_allocated
            )));
        }
        self.element_type().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length() {
        let desc = PixelDescriptor::new(512, 512, 16, 1);
        assert_eq!(desc.frame_length(), 524_288);

        let rgb = PixelDescriptor::new(3, 3, 8, 3);
        assert_eq!(rgb.frame_length(), 27);

        // 10 bits -> 2 bytes
        let binary = PixelDescriptor::new(5, 2, 1, 1);
        assert_eq!(binary.frame_length(), 2);
    }

    #[test]
    fn test_photometric_parse() {
        assert_eq!(
            "YBR_FULL_422 ".parse::<PhotometricInterpretation>().unwrap(),
            PhotometricInterpretation::YbrFull422
        );
        assert!(PhotometricInterpretation::YbrPartial420.is_subsampled());
        assert!(!PhotometricInterpretation::YbrFull.is_subsampled());
        assert!("CMYK".parse::<PhotometricInterpretation>().is_err());
    }

    #[test]
    fn test_validate_rejects_bits_stored_above_allocated() {
        let desc = PixelDescriptor::new(4, 4, 8, 1).with_bits_stored(12);
        assert!(matches!(
            desc.validate(),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_validate_unsupported_format() {
        let desc = PixelDescriptor::new(4, 4, 24, 1);
        assert!(matches!(
            desc.validate(),
            Err(BridgeError::UnsupportedSampleFormat {
                bits_allocated: 24,
                ..
            })
        ));
    }

    #[test]
    fn test_maximum_sample_value() {
        let desc = PixelDescriptor::new(4, 4, 16, 1).with_bits_stored(12);
        assert_eq!(desc.maximum_sample_value(), 4095);
    }
}
