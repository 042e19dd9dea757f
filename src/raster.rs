//! Generic raster: samples held in one or more banks, addressed through a layout.

use crate::error::{BridgeError, Result};
use crate::matrix::ElementType;

/// Sample banks of a raster. Interleaved and packed rasters hold one bank,
/// banded rasters one bank per band.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<Vec<u8>>),
    U16(Vec<Vec<u16>>),
    S16(Vec<Vec<i16>>),
    S32(Vec<Vec<i32>>),
    F32(Vec<Vec<f32>>),
    F64(Vec<Vec<f64>>),
}

impl SampleData {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::U8(_) => ElementType::U8,
            Self::U16(_) => ElementType::U16,
            Self::S16(_) => ElementType::S16,
            Self::S32(_) => ElementType::S32,
            Self::F32(_) => ElementType::F32,
            Self::F64(_) => ElementType::F64,
        }
    }

    pub fn bank_count(&self) -> usize {
        match self {
            Self::U8(b) => b.len(),
            Self::U16(b) => b.len(),
            Self::S16(b) => b.len(),
            Self::S32(b) => b.len(),
            Self::F32(b) => b.len(),
            Self::F64(b) => b.len(),
        }
    }

    pub fn bank_len(&self, bank: usize) -> Option<usize> {
        match self {
            Self::U8(b) => b.get(bank).map(Vec::len),
            Self::U16(b) => b.get(bank).map(Vec::len),
            Self::S16(b) => b.get(bank).map(Vec::len),
            Self::S32(b) => b.get(bank).map(Vec::len),
            Self::F32(b) => b.get(bank).map(Vec::len),
            Self::F64(b) => b.get(bank).map(Vec::len),
        }
    }

    fn get_f64(&self, bank: usize, index: usize) -> f64 {
        match self {
            Self::U8(b) => b[bank][index] as f64,
            Self::U16(b) => b[bank][index] as f64,
            Self::S16(b) => b[bank][index] as f64,
            Self::S32(b) => b[bank][index] as f64,
            Self::F32(b) => b[bank][index] as f64,
            Self::F64(b) => b[bank][index],
        }
    }
}

/// How raster samples are addressed inside the banks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterLayout {
    /// All bands in bank 0. Sample (x, y, b) is at
    /// `y * scanline_stride + x * pixel_stride + band_offsets[b]`.
    Interleaved {
        pixel_stride: usize,
        scanline_stride: usize,
        band_offsets: Vec<usize>,
    },
    /// Band `b` in bank `b`, at `band_offsets[b] + y * scanline_stride + x`.
    Banded {
        scanline_stride: usize,
        band_offsets: Vec<usize>,
    },
    /// Single band of 1-bit samples packed eight per byte, most significant bit first.
    /// `scanline_stride` is in bytes and `bit_offset` is the bit position of the first pixel.
    PackedBinary {
        scanline_stride: usize,
        bit_offset: usize,
    },
}

impl RasterLayout {
    /// Tightly packed interleaved layout with bands in natural order.
    pub fn interleaved(width: usize, bands: usize) -> Self {
        Self::Interleaved {
            pixel_stride: bands,
            scanline_stride: width * bands,
            band_offsets: (0..bands).collect(),
        }
    }

    /// Tightly packed banded layout.
    pub fn banded(width: usize, bands: usize) -> Self {
        Self::Banded {
            scanline_stride: width,
            band_offsets: vec![0; bands],
        }
    }

    pub fn packed_binary(width: usize) -> Self {
        Self::PackedBinary {
            scanline_stride: width.div_ceil(8),
            bit_offset: 0,
        }
    }

    pub fn band_count(&self) -> usize {
        match self {
            Self::Interleaved { band_offsets, .. } | Self::Banded { band_offsets, .. } => {
                band_offsets.len()
            }
            Self::PackedBinary { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    signed: bool,
    layout: RasterLayout,
    data: SampleData,
}

impl Raster {
    /// Builds a raster after checking that every addressed sample lies inside its bank.
    pub fn new(
        width: usize,
        height: usize,
        signed: bool,
        layout: RasterLayout,
        data: SampleData,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::invalid_argument(format!(
                "raster size {width}x{height}"
            )));
        }
        match (&data, signed) {
            (SampleData::U16(_), true) | (SampleData::S16(_), false) => {
                return Err(BridgeError::invalid_argument(
                    "16-bit bank type does not match raster signedness",
                ));
            }
            _ => {}
        }

        let bands = layout.band_count();
        if bands == 0 {
            return Err(BridgeError::invalid_argument("raster without bands"));
        }

        match &layout {
            RasterLayout::Interleaved {
                pixel_stride,
                scanline_stride,
                band_offsets,
            } => {
                expect_banks(&data, 1)?;
                let max_offset = band_offsets.iter().copied().max().unwrap_or(0);
                let last = (height - 1) * scanline_stride + (width - 1) * pixel_stride + max_offset;
                expect_bank_len(&data, 0, last + 1)?;
            }
            RasterLayout::Banded {
                scanline_stride,
                band_offsets,
            } => {
                expect_banks(&data, bands)?;
                for (bank, offset) in band_offsets.iter().enumerate() {
                    let last = offset + (height - 1) * scanline_stride + (width - 1);
                    expect_bank_len(&data, bank, last + 1)?;
                }
            }
            RasterLayout::PackedBinary {
                scanline_stride,
                bit_offset,
            } => {
                if !matches!(data, SampleData::U8(_)) {
                    return Err(BridgeError::invalid_argument(
                        "packed binary raster must use a byte bank",
                    ));
                }
                expect_banks(&data, 1)?;
                let last_bit = bit_offset + (height - 1) * scanline_stride * 8 + (width - 1);
                expect_bank_len(&data, 0, last_bit / 8 + 1)?;
            }
        }

        Ok(Self {
            width,
            height,
            signed,
            layout,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.layout.band_count()
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.layout, RasterLayout::PackedBinary { .. })
    }

    pub fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Bits allocated per sample in this raster.
    pub fn bits_allocated(&self) -> u32 {
        if self.is_binary() {
            1
        } else {
            self.data.element_type().byte_size() as u32 * 8
        }
    }

    /// Reads one sample widened to `f64`, which is exact for every bank type.
    pub fn sample(&self, x: usize, y: usize, band: usize) -> f64 {
        match &self.layout {
            RasterLayout::Interleaved {
                pixel_stride,
                scanline_stride,
                band_offsets,
            } => self.data.get_f64(
                0,
                y * scanline_stride + x * pixel_stride + band_offsets[band],
            ),
            RasterLayout::Banded {
                scanline_stride,
                band_offsets,
            } => self
                .data
                .get_f64(band, band_offsets[band] + y * scanline_stride + x),
            RasterLayout::PackedBinary {
                scanline_stride,
                bit_offset,
            } => {
                let bit = bit_offset + y * scanline_stride * 8 + x;
                let byte = self.data.get_f64(0, bit / 8) as u8;
                ((byte >> (7 - bit % 8)) & 1) as f64
            }
        }
    }
}

fn expect_banks(data: &SampleData, count: usize) -> Result<()> {
    if data.bank_count() != count {
        return Err(BridgeError::invalid_argument(format!(
            "expected {count} bank(s), found {}",
            data.bank_count()
        )));
    }
    Ok(())
}

fn expect_bank_len(data: &SampleData, bank: usize, needed: usize) -> Result<()> {
    let len = data.bank_len(bank).unwrap_or(0);
    if len < needed {
        return Err(BridgeError::invalid_argument(format!(
            "bank {bank} holds {len} samples, layout addresses {needed}"
        )));
    }
    Ok(())
}
