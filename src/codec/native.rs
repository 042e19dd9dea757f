use std::io::Write;

use super::{CodecKind, CodecParameterBuilder, EncodeParameters};
use crate::PixelDescriptor;
use crate::bridge::{BridgeOptions, PixelBufferBridge};
use crate::constants::BASELINE_BITS_PER_SAMPLE;
use crate::error::{BridgeError, NativeError, Result};
use crate::matrix::{ElementType, NativeMatrix};
use crate::raster::Raster;
use crate::segment::FrameResolver;

/// A native encode/decode implementation.
///
/// Entropy coding lives behind this boundary. Implementations report failures as
/// [`NativeError`]; callers wrap them with the operation that failed.
pub trait NativeCodec: Send + Sync {
    fn supports(&self, codec: CodecKind) -> bool;

    /// Decodes one frame into `target`, which is already shaped as `desc` declares.
    fn decode(
        &self,
        encoded: &[u8],
        desc: &PixelDescriptor,
        target: &mut NativeMatrix,
    ) -> std::result::Result<(), NativeError>;

    fn encode(
        &self,
        matrix: &NativeMatrix,
        parameters: &EncodeParameters,
    ) -> std::result::Result<Vec<u8>, NativeError>;
}

/// Uncompressed native pixel data.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec {
    bridge: PixelBufferBridge,
}

impl RawCodec {
    pub fn new(options: BridgeOptions) -> Self {
        Self {
            bridge: PixelBufferBridge::new(options),
        }
    }
}

fn message(err: BridgeError) -> NativeError {
    NativeError::Message(err.to_string())
}

impl NativeCodec for RawCodec {
    fn supports(&self, codec: CodecKind) -> bool {
        codec == CodecKind::Raw
    }

    fn decode(
        &self,
        encoded: &[u8],
        desc: &PixelDescriptor,
        target: &mut NativeMatrix,
    ) -> std::result::Result<(), NativeError> {
        if encoded.is_empty() {
            return Err(NativeError::EmptyResult);
        }
        let decoded = self.bridge.matrix_from_frame(desc, encoded).map_err(message)?;
        if decoded.rows() != target.rows()
            || decoded.cols() != target.cols()
            || decoded.channels() != target.channels()
            || decoded.element_type() != target.element_type()
        {
            return Err(NativeError::Message(format!(
                "decoded {}x{}x{} {:?}, target is {}x{}x{} {:?}",
                decoded.rows(),
                decoded.cols(),
                decoded.channels(),
                decoded.element_type(),
                target.rows(),
                target.cols(),
                target.channels(),
                target.element_type()
            )));
        }
        target
            .fill_from(decoded.into_data().map_err(message)?)
            .map_err(message)
    }

    fn encode(
        &self,
        matrix: &NativeMatrix,
        parameters: &EncodeParameters,
    ) -> std::result::Result<Vec<u8>, NativeError> {
        self.bridge
            .frame_from_matrix(parameters.descriptor(), matrix)
            .map_err(message)
    }
}

/// Decode path: resolve the frame, read its bytes, decode into a fresh matrix.
#[derive(Debug)]
pub struct FrameDecoder<C> {
    resolver: FrameResolver,
    codec: C,
}

impl<C: NativeCodec> FrameDecoder<C> {
    pub fn new(resolver: FrameResolver, codec: C) -> Self {
        Self { resolver, codec }
    }

    pub fn resolver(&self) -> &FrameResolver {
        &self.resolver
    }

    pub fn frame_count(&self) -> usize {
        self.resolver.frame_count()
    }

    pub fn decode_frame(&self, index: usize) -> Result<NativeMatrix> {
        let range = self.resolver.resolve(index)?;
        let encoded = self.resolver.store().read_segments(&range)?;

        let desc = range.descriptor;
        let mut matrix = NativeMatrix::new(
            desc.height as usize,
            desc.width as usize,
            desc.samples_per_pixel as usize,
            desc.element_type()?,
        );
        tracing::debug!(
            frame = index,
            rows = matrix.rows(),
            cols = matrix.cols(),
            type_code = matrix.type_code(),
            "allocated native matrix"
        );

        let decoded = self
            .codec
            .decode(&encoded, &desc, &mut matrix)
            .and_then(|()| {
                if matrix.is_consistent() {
                    Ok(())
                } else {
                    Err(NativeError::Message(format!(
                        "codec left an invalid {}x{}x{} {:?} target",
                        matrix.rows(),
                        matrix.cols(),
                        matrix.channels(),
                        matrix.element_type()
                    )))
                }
            });
        if let Err(err) = decoded {
            matrix.release();
            return Err(BridgeError::native("decoding frame", err));
        }
        Ok(matrix)
    }
}

/// Encode path: raster or matrix in, encoded frame bytes written to a sink.
#[derive(Debug)]
pub struct FrameEncoder<C> {
    codec: C,
    builder: CodecParameterBuilder,
    bridge: PixelBufferBridge,
}

impl<C: NativeCodec> FrameEncoder<C> {
    pub fn new(codec: C, builder: CodecParameterBuilder, options: BridgeOptions) -> Self {
        Self {
            codec,
            builder,
            bridge: PixelBufferBridge::new(options),
        }
    }

    /// Encodes a raster and returns the number of bytes written.
    pub fn encode_raster<W: Write>(
        &self,
        raster: &Raster,
        desc: &PixelDescriptor,
        sink: &mut W,
    ) -> Result<u64> {
        let mut matrix = self.bridge.raster_to_matrix(raster)?;
        let written = self.encode_matrix(&matrix, desc, sink);
        matrix.release();
        written
    }

    pub fn encode_matrix<W: Write>(
        &self,
        matrix: &NativeMatrix,
        desc: &PixelDescriptor,
        sink: &mut W,
    ) -> Result<u64> {
        check_shape(matrix, desc)?;
        let parameters = self.builder.build(desc, matrix.element_type())?;
        if !self.codec.supports(parameters.codec()) {
            return Err(BridgeError::invalid_argument(format!(
                "native codec cannot encode {:?}",
                parameters.codec()
            )));
        }

        let encoded = self
            .codec
            .encode(matrix, &parameters)
            .map_err(|err| BridgeError::native("encoding frame", err))?;
        if encoded.is_empty() {
            return Err(BridgeError::native("encoding frame", NativeError::EmptyResult));
        }

        sink.write_all(&encoded)?;
        tracing::debug!(
            codec = ?parameters.codec(),
            bytes = encoded.len(),
            "encoded frame"
        );
        Ok(encoded.len() as u64)
    }
}

/// The matrix must have the descriptor's shape. Its element type is the descriptor's,
/// or a wider integer type holding 8-bit samples.
fn check_shape(matrix: &NativeMatrix, desc: &PixelDescriptor) -> Result<()> {
    let element_type = desc.element_type()?;
    let widened = desc.bits_stored == BASELINE_BITS_PER_SAMPLE
        && !desc.floating_point
        && matches!(
            matrix.element_type(),
            ElementType::U16 | ElementType::S16 | ElementType::S32
        );
    if matrix.rows() != desc.height as usize
        || matrix.cols() != desc.width as usize
        || matrix.channels() != desc.samples_per_pixel as usize
        || (matrix.element_type() != element_type && !widened)
    {
        return Err(BridgeError::invalid_argument(format!(
            "matrix is {}x{}x{} {:?}, descriptor declares {}x{}x{} {:?}",
            matrix.rows(),
            matrix.cols(),
            matrix.channels(),
            matrix.element_type(),
            desc.height,
            desc.width,
            desc.samples_per_pixel,
            element_type
        )));
    }
    Ok(())
}
