//! Native pixel matrix: a row-major buffer with an explicit element type and channel count.
//!
//! Element type codes follow the depth codes of the native imaging library, so
//! `type_code()` can be handed across the codec boundary unchanged.

use std::fmt::Debug;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::{BridgeError, Result};
use crate::raster::SampleData;

/// Element type of a native matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ElementType {
    U8 = 0,
    U16 = 2,
    S16 = 3,
    S32 = 4,
    F32 = 5,
    F64 = 6,
}

impl ElementType {
    /// Fixed lookup from a sample format to the element type that holds it.
    ///
    /// 1-bit samples land in `U8` after unpacking. Every other combination is unsupported.
    pub fn from_sample_format(bits_allocated: u32, signed: bool, float: bool) -> Result<Self> {
        match (bits_allocated, signed, float) {
            (1, _, false) | (8, _, false) => Ok(Self::U8),
            (16, false, false) => Ok(Self::U16),
            (16, true, false) => Ok(Self::S16),
            (32, _, false) => Ok(Self::S32),
            (32, _, true) => Ok(Self::F32),
            (64, _, true) => Ok(Self::F64),
            _ => Err(BridgeError::UnsupportedSampleFormat {
                bits_allocated,
                signed,
                float,
            }),
        }
    }

    /// Size in bytes of one element.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::U8 | Self::U16)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Combined element type and channel count code.
    pub fn type_code(self, channels: usize) -> i32 {
        u8::from(self) as i32 + ((channels as i32 - 1) << 3)
    }
}

/// Owned sample storage of a matrix, one variant per element type.
#[derive(Debug, PartialEq)]
pub enum MatrixData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! for_each_variant {
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

impl MatrixData {
    pub fn zeroed(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::U8 => Self::U8(vec![0; len]),
            ElementType::U16 => Self::U16(vec![0; len]),
            ElementType::S16 => Self::S16(vec![0; len]),
            ElementType::S32 => Self::S32(vec![0; len]),
            ElementType::F32 => Self::F32(vec![0.0; len]),
            ElementType::F64 => Self::F64(vec![0.0; len]),
        }
    }

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

    pub fn len(&self) -> usize {
        for_each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the elements in little-endian byte order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * self.element_type().byte_size());
        for_each_variant!(self, v => {
            for s in v {
                s.write_le(&mut out);
            }
        });
        out
    }
}

/// A primitive that can be stored in a [`MatrixData`].
pub trait Sample: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, out: &mut Vec<u8>);
    fn wrap(data: Vec<Self>) -> MatrixData;
    fn wrap_banks(banks: Vec<Vec<Self>>) -> SampleData;
    fn slice(data: &MatrixData) -> Option<&[Self]>;
    fn slice_mut(data: &mut MatrixData) -> Option<&mut [Self]>;
}

macro_rules! impl_sample {
    ($t:ty, $variant:ident) => {
        impl Sample for $t {
            const ELEMENT_TYPE: ElementType = ElementType::$variant;

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(raw)
            }

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn wrap(data: Vec<Self>) -> MatrixData {
                MatrixData::$variant(data)
            }

            fn wrap_banks(banks: Vec<Vec<Self>>) -> SampleData {
                SampleData::$variant(banks)
            }

            fn slice(data: &MatrixData) -> Option<&[Self]> {
                match data {
                    MatrixData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut MatrixData) -> Option<&mut [Self]> {
                match data {
                    MatrixData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(u8, U8);
impl_sample!(u16, U16);
impl_sample!(i16, S16);
impl_sample!(i32, S32);
impl_sample!(f32, F32);
impl_sample!(f64, F64);

/// Row-major pixel matrix exclusively owned by whoever allocated it.
///
/// The matrix is not `Clone`. Ownership moves with the value, and the buffer is given
/// away with [`NativeMatrix::into_data`] or dropped with [`NativeMatrix::release`].
#[derive(Debug)]
pub struct NativeMatrix {
    rows: usize,
    cols: usize,
    channels: usize,
    element_type: ElementType,
    data: Option<MatrixData>,
}

impl NativeMatrix {
    /// Allocates a zero-filled matrix.
    pub fn new(rows: usize, cols: usize, channels: usize, element_type: ElementType) -> Self {
        Self {
            rows,
            cols,
            channels,
            element_type,
            data: Some(MatrixData::zeroed(element_type, rows * cols * channels)),
        }
    }

    /// Wraps existing data. The element count must be `rows * cols * channels`.
    pub fn from_data(rows: usize, cols: usize, channels: usize, data: MatrixData) -> Result<Self> {
        if channels == 0 {
            return Err(BridgeError::invalid_argument("matrix with zero channels"));
        }
        let expected = rows * cols * channels;
        if data.len() != expected {
            return Err(BridgeError::invalid_argument(format!(
                "matrix {rows}x{cols}x{channels} needs {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            channels,
            element_type: data.element_type(),
            data: Some(data),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn type_code(&self) -> i32 {
        self.element_type.type_code(self.channels)
    }

    /// Number of elements in one row.
    pub fn row_len(&self) -> usize {
        self.cols * self.channels
    }

    pub fn data(&self) -> Result<&MatrixData> {
        self.data.as_ref().ok_or(BridgeError::Released)
    }

    /// Typed view of the elements. `None` when the element type differs.
    pub fn as_slice<T: Sample>(&self) -> Result<Option<&[T]>> {
        Ok(T::slice(self.data()?))
    }

    /// Mutable typed view. The element type and count cannot change through it.
    pub fn as_mut_slice<T: Sample>(&mut self) -> Result<Option<&mut [T]>> {
        let data = self.data.as_mut().ok_or(BridgeError::Released)?;
        Ok(T::slice_mut(data))
    }

    /// Replaces the buffer with `data` of the same element type and count.
    pub fn fill_from(&mut self, data: MatrixData) -> Result<()> {
        if self.is_released() {
            return Err(BridgeError::Released);
        }
        let expected = self.rows * self.cols * self.channels;
        if data.element_type() != self.element_type || data.len() != expected {
            return Err(BridgeError::invalid_argument(format!(
                "{} {:?} elements for a {}x{}x{} {:?} matrix",
                data.len(),
                data.element_type(),
                self.rows,
                self.cols,
                self.channels,
                self.element_type
            )));
        }
        self.data = Some(data);
        Ok(())
    }

    /// The buffer is present and agrees with the declared shape and element type.
    pub fn is_consistent(&self) -> bool {
        self.data.as_ref().is_some_and(|data| {
            data.element_type() == self.element_type
                && data.len() == self.rows * self.cols * self.channels
        })
    }

    /// Transfers the buffer to the caller.
    pub fn into_data(mut self) -> Result<MatrixData> {
        self.data.take().ok_or(BridgeError::Released)
    }

    /// Frees the buffer. Calling it again is a no-op.
    pub fn release(&mut self) {
        if self.data.take().is_some() {
            tracing::trace!(
                rows = self.rows,
                cols = self.cols,
                channels = self.channels,
                "released native matrix"
            );
        }
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }
}
