use std::cmp::min;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::{CodecKind, Quality};
use crate::PixelDescriptor;
use crate::constants::{
    BASELINE_BITS_PER_SAMPLE, DEFAULT_LOSSLESS_PREDICTOR, EXTENDED_BITS_PER_SAMPLE,
    MAXIMUM_J2K_BITS_PER_SAMPLE, MAXIMUM_JPEG_QUALITY, MAXIMUM_LOSSLESS_BITS_PER_SAMPLE,
    MAXIMUM_NEAR_LOSSLESS,
};
use crate::error::{BridgeError, Result};
use crate::matrix::ElementType;
use crate::{PhotometricInterpretation, PlanarConfiguration};

/// Layout version of the native parameter block. Bump on any slot change.
pub const PARAMETER_BLOCK_VERSION: i32 = 1;

/// Position of each value in the native parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ParameterSlot {
    Version = 0,
    Codec = 1,
    Width = 2,
    Height = 3,
    Components = 4,
    BitsAllocated = 5,
    BitsPerSample = 6,
    Signed = 7,
    Lossless = 8,
    NearLossless = 9,
    Quality = 10,
    CompressionRatio = 11,
    Interleave = 12,
    Predictor = 13,
    PointTransform = 14,
    ColorTransform = 15,
}

pub const SLOT_COUNT: usize = ParameterSlot::ColorTransform as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum InterleaveMode {
    #[default]
    None = 0,
    Line = 1,
    Sample = 2,
}

pub fn compute_maximum_near_lossless(maximum_sample_value: u32) -> u32 {
    debug_assert!(maximum_sample_value >= 1);
    min(MAXIMUM_NEAR_LOSSLESS, maximum_sample_value / 2)
}

/// Immutable parameters of one native encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParameters {
    codec: CodecKind,
    quality: Quality,
    descriptor: PixelDescriptor,
    bits_per_sample: u32,
    interleave: InterleaveMode,
    predictor: u32,
    point_transform: u32,
    color_transform: bool,
}

impl EncodeParameters {
    /// Codec after process selection, e.g. baseline or extended JPEG.
    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    /// Effective quality after the signedness rule.
    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn descriptor(&self) -> &PixelDescriptor {
        &self.descriptor
    }

    /// Logical sample precision handed to the codec.
    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    pub fn interleave(&self) -> InterleaveMode {
        self.interleave
    }

    pub fn predictor(&self) -> u32 {
        self.predictor
    }

    pub fn point_transform(&self) -> u32 {
        self.point_transform
    }

    pub fn color_transform(&self) -> bool {
        self.color_transform
    }

    pub fn near_lossless(&self) -> u32 {
        match self.quality {
            Quality::NearLossless { error } => error,
            _ => 0,
        }
    }

    pub fn get(&self, slot: ParameterSlot) -> i32 {
        self.to_native()[u8::from(slot) as usize]
    }

    /// The fixed-position block passed to the native call.
    pub fn to_native(&self) -> [i32; SLOT_COUNT] {
        let mut block = [0i32; SLOT_COUNT];
        let mut set = |slot: ParameterSlot, value: i32| block[u8::from(slot) as usize] = value;

        set(ParameterSlot::Version, PARAMETER_BLOCK_VERSION);
        set(ParameterSlot::Codec, u8::from(self.codec) as i32);
        set(ParameterSlot::Width, self.descriptor.width as i32);
        set(ParameterSlot::Height, self.descriptor.height as i32);
        set(ParameterSlot::Components, self.descriptor.samples_per_pixel as i32);
        set(ParameterSlot::BitsAllocated, self.descriptor.bits_allocated as i32);
        set(ParameterSlot::BitsPerSample, self.bits_per_sample as i32);
        set(ParameterSlot::Signed, self.descriptor.signed as i32);
        set(ParameterSlot::Lossless, self.quality.is_lossless() as i32);
        set(ParameterSlot::NearLossless, self.near_lossless() as i32);
        if let Quality::Lossy { quality } = self.quality {
            set(ParameterSlot::Quality, quality as i32);
        }
        if let Quality::CompressionRatio(ratio) = self.quality {
            set(ParameterSlot::CompressionRatio, ratio as i32);
        }
        set(ParameterSlot::Interleave, u8::from(self.interleave) as i32);
        set(ParameterSlot::Predictor, self.predictor as i32);
        set(ParameterSlot::PointTransform, self.point_transform as i32);
        set(ParameterSlot::ColorTransform, self.color_transform as i32);
        block
    }
}

/// Builds [`EncodeParameters`] from a pixel descriptor and quality settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParameterBuilder {
    codec: CodecKind,
    quality: Quality,
    interleave: Option<InterleaveMode>,
    predictor: u32,
    point_transform: u32,
}

impl Default for CodecParameterBuilder {
    fn default() -> Self {
        Self::new(CodecKind::Raw)
    }
}

impl CodecParameterBuilder {
    pub fn new(codec: CodecKind) -> Self {
        Self {
            codec,
            quality: codec.default_quality(),
            interleave: None,
            predictor: DEFAULT_LOSSLESS_PREDICTOR,
            point_transform: 0,
        }
    }

    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Overrides the interleave mode otherwise derived from the planar configuration.
    pub fn with_interleave(mut self, interleave: InterleaveMode) -> Self {
        self.interleave = Some(interleave);
        self
    }

    pub fn with_predictor(mut self, predictor: u32) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_point_transform(mut self, point_transform: u32) -> Self {
        self.point_transform = point_transform;
        self
    }

    /// `backing` is the element type of the matrix that will be encoded.
    pub fn build(&self, desc: &PixelDescriptor, backing: ElementType) -> Result<EncodeParameters> {
        desc.validate()?;

        let mut bits_per_sample = desc.bits_stored;
        if bits_per_sample == BASELINE_BITS_PER_SAMPLE && backing != ElementType::U8 {
            tracing::debug!(?backing, "8-bit samples in a wider element, encoding as 12-bit");
            bits_per_sample = EXTENDED_BITS_PER_SAMPLE;
        }

        let mut quality = self.quality;
        if desc.signed && self.codec.supports_near_lossless() && !quality.is_lossless() {
            tracing::warn!(
                codec = ?self.codec,
                requested = ?quality,
                "signed pixel data cannot be encoded lossy, encoding lossless"
            );
            quality = Quality::Lossless;
        }
        self.check_quality(quality)?;
        if quality == (Quality::NearLossless { error: 0 }) {
            quality = Quality::Lossless;
        }

        let unsupported = || BridgeError::UnsupportedSampleFormat {
            bits_allocated: desc.bits_allocated,
            signed: desc.signed,
            float: desc.floating_point,
        };
        if self.codec != CodecKind::Raw && (desc.floating_point || desc.is_binary()) {
            return Err(unsupported());
        }

        let codec = match self.codec {
            CodecKind::JpegBaseline | CodecKind::JpegExtended => {
                if bits_per_sample <= BASELINE_BITS_PER_SAMPLE {
                    CodecKind::JpegBaseline
                } else if bits_per_sample <= EXTENDED_BITS_PER_SAMPLE {
                    CodecKind::JpegExtended
                } else {
                    return Err(unsupported());
                }
            }
            CodecKind::JpegLossless | CodecKind::JpegLs
                if bits_per_sample > MAXIMUM_LOSSLESS_BITS_PER_SAMPLE =>
            {
                return Err(unsupported());
            }
            CodecKind::Jpeg2000 if bits_per_sample > MAXIMUM_J2K_BITS_PER_SAMPLE => {
                return Err(unsupported());
            }
            codec => codec,
        };

        if codec.is_true_lossless_capable()
            && quality.is_lossless()
            && desc.photometric_interpretation.is_subsampled()
        {
            return Err(BridgeError::IncompatiblePhotometric {
                photometric: desc.photometric_interpretation,
                codec,
            });
        }

        if let Quality::NearLossless { error } = quality {
            let maximum = compute_maximum_near_lossless(max_sample_value(bits_per_sample));
            if error > maximum {
                return Err(BridgeError::InvalidNearLossless {
                    near: error,
                    maximum,
                });
            }
        }

        let interleave = self.interleave.unwrap_or(
            if desc.samples_per_pixel == 1
                || desc.planar_configuration == PlanarConfiguration::Planar
            {
                InterleaveMode::None
            } else {
                InterleaveMode::Sample
            },
        );

        let color_transform = codec == CodecKind::Jpeg2000
            && desc.samples_per_pixel == 3
            && desc.photometric_interpretation == PhotometricInterpretation::Rgb;

        Ok(EncodeParameters {
            codec,
            quality,
            descriptor: *desc,
            bits_per_sample,
            interleave,
            predictor: self.predictor,
            point_transform: self.point_transform,
            color_transform,
        })
    }

    fn check_quality(&self, quality: Quality) -> Result<()> {
        let valid = match (self.codec, quality) {
            (CodecKind::Raw | CodecKind::JpegLossless, Quality::Lossless) => true,
            (CodecKind::JpegLs, Quality::Lossless | Quality::NearLossless { .. }) => true,
            (CodecKind::Jpeg2000, Quality::Lossless) => true,
            (CodecKind::Jpeg2000, Quality::CompressionRatio(ratio)) => ratio >= 1,
            (CodecKind::JpegBaseline | CodecKind::JpegExtended, Quality::Lossy { quality }) => {
                (1..=MAXIMUM_JPEG_QUALITY).contains(&quality)
            }
            _ => false,
        };
        if !valid {
            return Err(BridgeError::invalid_argument(format!(
                "quality {:?} for codec {:?}",
                quality, self.codec
            )));
        }
        Ok(())
    }
}

fn max_sample_value(bits_per_sample: u32) -> u32 {
    if bits_per_sample >= 32 {
        u32::MAX
    } else {
        (1u32 << bits_per_sample) - 1
    }
}
