//! Conversion between generic rasters, raw native frame bytes and [`NativeMatrix`].
//!
//! Every conversion reads its source and allocates a fresh matrix or raster. Sample
//! values are copied bit-exactly; only channel order and bit packing are rearranged.

pub mod array_ops;
pub mod binary;

pub use binary::BitOrder;

use crate::error::{BridgeError, Result};
use crate::matrix::{ElementType, MatrixData, NativeMatrix, Sample};
use crate::raster::{Raster, RasterLayout, SampleData};
use crate::{PixelDescriptor, PlanarConfiguration};

/// Channel convention of 3-channel native matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Blue, green, red: the convention of the native imaging library.
    #[default]
    Bgr,
    /// Red, green, blue: the convention of rasters and DICOM frames.
    Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeOptions {
    /// Order of the channels in produced and consumed 3-channel matrices.
    pub channel_order: ChannelOrder,
    /// Bit order of 1-bit raw frame data.
    pub frame_bit_order: BitOrder,
}

/// Target layout of [`PixelBufferBridge::matrix_to_raster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Interleaved,
    Banded,
    PackedBinary,
}

macro_rules! with_banks {
    ($data:expr, $banks:ident => $body:expr) => {
        match $data {
            SampleData::U8($banks) => $body,
            SampleData::U16($banks) => $body,
            SampleData::S16($banks) => $body,
            SampleData::S32($banks) => $body,
            SampleData::F32($banks) => $body,
            SampleData::F64($banks) => $body,
        }
    };
}

macro_rules! with_elements {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            MatrixData::U8($v) => $body,
            MatrixData::U16($v) => $body,
            MatrixData::S16($v) => $body,
            MatrixData::S32($v) => $body,
            MatrixData::F32($v) => $body,
            MatrixData::F64($v) => $body,
        }
    };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PixelBufferBridge {
    options: BridgeOptions,
}

impl PixelBufferBridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Copies a raster into a freshly allocated matrix.
    pub fn raster_to_matrix(&self, raster: &Raster) -> Result<NativeMatrix> {
        let (width, height) = (raster.width(), raster.height());

        let matrix = match raster.layout() {
            RasterLayout::PackedBinary {
                scanline_stride,
                bit_offset,
            } => {
                let SampleData::U8(banks) = raster.data() else {
                    return Err(BridgeError::invalid_argument(
                        "packed binary raster must use a byte bank",
                    ));
                };
                let values = binary::unpack_bits(
                    &banks[0],
                    width,
                    height,
                    scanline_stride * 8,
                    *bit_offset,
                    BitOrder::MsbFirst,
                )?;
                NativeMatrix::from_data(height, width, 1, MatrixData::U8(values))?
            }
            layout => with_banks!(raster.data(), banks => self.gather(banks, layout, width, height)?),
        };

        check_dimensions(&matrix, height, width);
        tracing::debug!(
            rows = matrix.rows(),
            cols = matrix.cols(),
            channels = matrix.channels(),
            element = ?matrix.element_type(),
            "raster converted to native matrix"
        );
        Ok(matrix)
    }

    fn gather<T: Sample>(
        &self,
        banks: &[Vec<T>],
        layout: &RasterLayout,
        width: usize,
        height: usize,
    ) -> Result<NativeMatrix> {
        let bands = layout.band_count();
        let data = match layout {
            RasterLayout::Interleaved {
                pixel_stride,
                scanline_stride,
                band_offsets,
            } => {
                let bank = &banks[0];
                let mut out = Vec::with_capacity(width * height * bands);
                for y in 0..height {
                    let line = y * scanline_stride;
                    for x in 0..width {
                        let pixel = line + x * pixel_stride;
                        out.extend(band_offsets.iter().map(|offset| bank[pixel + offset]));
                    }
                }
                // Copied in raster (RGB) order, converted afterwards.
                self.to_matrix_order(out, bands)
            }
            RasterLayout::Banded {
                scanline_stride,
                band_offsets,
            } => {
                let planes: Vec<Vec<T>> = band_offsets
                    .iter()
                    .zip(banks)
                    .map(|(offset, bank)| {
                        let mut plane = Vec::with_capacity(width * height);
                        for y in 0..height {
                            let start = offset + y * scanline_stride;
                            plane.extend_from_slice(&bank[start..start + width]);
                        }
                        plane
                    })
                    .collect();
                self.merge(planes)
            }
            RasterLayout::PackedBinary { .. } => {
                return Err(BridgeError::invalid_argument(
                    "packed binary raster with a non-byte bank",
                ));
            }
        };
        NativeMatrix::from_data(height, width, bands, T::wrap(data))
    }

    /// Copies a matrix into a freshly allocated raster of the requested kind.
    pub fn matrix_to_raster(
        &self,
        matrix: &NativeMatrix,
        kind: RasterKind,
        signed: bool,
    ) -> Result<Raster> {
        let (width, height, channels) = (matrix.cols(), matrix.rows(), matrix.channels());
        let data = matrix.data()?;

        if kind == RasterKind::PackedBinary {
            let MatrixData::U8(values) = data else {
                return Err(BridgeError::invalid_argument(format!(
                    "binary raster from a {:?} matrix",
                    matrix.element_type()
                )));
            };
            if channels != 1 {
                return Err(BridgeError::invalid_argument(
                    "binary raster from a multi-channel matrix",
                ));
            }
            let layout = RasterLayout::packed_binary(width);
            let stride_bits = width.div_ceil(8) * 8;
            let packed = binary::pack_bits(values, width, height, stride_bits, BitOrder::MsbFirst)?;
            return Raster::new(width, height, signed, layout, SampleData::U8(vec![packed]));
        }

        let (layout, samples) =
            with_elements!(data, v => self.scatter(v, width, channels, kind));
        Raster::new(width, height, signed, layout, samples)
    }

    fn scatter<T: Sample>(
        &self,
        elements: &[T],
        width: usize,
        channels: usize,
        kind: RasterKind,
    ) -> (RasterLayout, SampleData) {
        if kind == RasterKind::Banded {
            let mut planes = array_ops::split_planes(elements, channels);
            if channels == 3 && self.options.channel_order == ChannelOrder::Bgr {
                planes = array_ops::reversed(planes);
            }
            (RasterLayout::banded(width, channels), T::wrap_banks(planes))
        } else {
            let interleaved = self.to_matrix_order(elements.to_vec(), channels);
            (
                RasterLayout::interleaved(width, channels),
                T::wrap_banks(vec![interleaved]),
            )
        }
    }

    /// Builds a matrix from one uncompressed frame in native DICOM layout
    /// (little-endian samples, interleaved or color-by-plane, 1-bit frames as a bit stream).
    pub fn matrix_from_frame(&self, desc: &PixelDescriptor, bytes: &[u8]) -> Result<NativeMatrix> {
        desc.validate()?;
        let expected = desc.frame_length() as usize;
        if bytes.len() < expected {
            return Err(BridgeError::invalid_argument(format!(
                "frame data holds {} bytes, descriptor requires {expected}",
                bytes.len()
            )));
        }

        let (width, height) = (desc.width as usize, desc.height as usize);
        let matrix = if desc.is_binary() {
            if desc.samples_per_pixel != 1 {
                return Err(BridgeError::invalid_argument(
                    "1-bit frames must have one sample per pixel",
                ));
            }
            let values = binary::unpack_bits(
                bytes,
                width,
                height,
                width,
                0,
                self.options.frame_bit_order,
            )?;
            NativeMatrix::from_data(height, width, 1, MatrixData::U8(values))?
        } else {
            match desc.element_type()? {
                ElementType::U8 => self.decode_samples::<u8>(desc, bytes)?,
                ElementType::U16 => self.decode_samples::<u16>(desc, bytes)?,
                ElementType::S16 => self.decode_samples::<i16>(desc, bytes)?,
                ElementType::S32 => self.decode_samples::<i32>(desc, bytes)?,
                ElementType::F32 => self.decode_samples::<f32>(desc, bytes)?,
                ElementType::F64 => self.decode_samples::<f64>(desc, bytes)?,
            }
        };

        check_dimensions(&matrix, height, width);
        tracing::debug!(
            rows = matrix.rows(),
            cols = matrix.cols(),
            channels = matrix.channels(),
            element = ?matrix.element_type(),
            "frame converted to native matrix"
        );
        Ok(matrix)
    }

    fn decode_samples<T: Sample>(&self, desc: &PixelDescriptor, bytes: &[u8]) -> Result<NativeMatrix> {
        let channels = desc.samples_per_pixel as usize;
        let count = desc.pixel_count() * channels;
        let size = T::ELEMENT_TYPE.byte_size();
        let samples: Vec<T> = bytes[..count * size].chunks_exact(size).map(T::read_le).collect();

        let data = if channels > 1 && desc.planar_configuration == PlanarConfiguration::Planar {
            let planes = samples
                .chunks_exact(desc.pixel_count())
                .map(<[T]>::to_vec)
                .collect();
            self.merge(planes)
        } else {
            self.to_matrix_order(samples, channels)
        };
        NativeMatrix::from_data(desc.height as usize, desc.width as usize, channels, T::wrap(data))
    }

    /// Serializes a matrix into one uncompressed frame laid out as `desc` declares.
    pub fn frame_from_matrix(&self, desc: &PixelDescriptor, matrix: &NativeMatrix) -> Result<Vec<u8>> {
        desc.validate()?;
        if matrix.rows() != desc.height as usize
            || matrix.cols() != desc.width as usize
            || matrix.channels() != desc.samples_per_pixel as usize
        {
            return Err(BridgeError::invalid_argument(format!(
                "matrix {}x{}x{} does not match frame {}x{}x{}",
                matrix.rows(),
                matrix.cols(),
                matrix.channels(),
                desc.height,
                desc.width,
                desc.samples_per_pixel
            )));
        }
        let expected_type = desc.element_type()?;
        if matrix.element_type() != expected_type {
            return Err(BridgeError::invalid_argument(format!(
                "matrix element {:?} does not match frame element {:?}",
                matrix.element_type(),
                expected_type
            )));
        }

        let data = matrix.data()?;
        if desc.is_binary() {
            let MatrixData::U8(values) = data else {
                return Err(BridgeError::invalid_argument("binary frame from a non-byte matrix"));
            };
            let (width, height) = (desc.width as usize, desc.height as usize);
            return binary::pack_bits(values, width, height, width, self.options.frame_bit_order);
        }

        let channels = matrix.channels();
        let planar = channels > 1 && desc.planar_configuration == PlanarConfiguration::Planar;
        let bytes = with_elements!(data, v => {
            let ordered = if planar {
                let mut planes = array_ops::split_planes(v, channels);
                if channels == 3 && self.options.channel_order == ChannelOrder::Bgr {
                    planes = array_ops::reversed(planes);
                }
                planes.concat()
            } else {
                self.to_matrix_order(v.to_vec(), channels)
            };
            let mut out = Vec::with_capacity(ordered.len() * expected_type.byte_size());
            for s in ordered {
                s.write_le(&mut out);
            }
            out
        });
        Ok(bytes)
    }

    /// Merges planes given in RGB order into one interleaved buffer in matrix order.
    fn merge<T: Copy>(&self, planes: Vec<Vec<T>>) -> Vec<T> {
        let planes = if planes.len() == 3 && self.options.channel_order == ChannelOrder::Bgr {
            array_ops::reversed(planes)
        } else {
            planes
        };
        array_ops::merge_planes(&planes)
    }

    /// Converts interleaved RGB samples to matrix order, or back. The swap is its own inverse.
    fn to_matrix_order<T>(&self, interleaved: Vec<T>, channels: usize) -> Vec<T> {
        if channels == 3 && self.options.channel_order == ChannelOrder::Bgr {
            array_ops::swap_channels(interleaved, 3, 0, 2)
        } else {
            interleaved
        }
    }
}

/// A produced matrix with the wrong shape is a programming error, not bad input.
fn check_dimensions(matrix: &NativeMatrix, rows: usize, cols: usize) {
    assert!(
        matrix.rows() == rows && matrix.cols() == cols,
        "native matrix is {}x{}, descriptor declares {}x{}",
        matrix.rows(),
        matrix.cols(),
        rows,
        cols
    );
}
