use std::io;
use thiserror::Error;

use crate::PhotometricInterpretation;
use crate::codec::CodecKind;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// The stream wrapper has no resolution adapter. Permanent capability gap.
    #[error("Unsupported stream kind: {0}")]
    UnsupportedStreamKind(&'static str),

    /// Offset/length data failed a consistency check. Only the current frame is affected.
    #[error("Corrupt fragment table (frame {frame}): {reason}")]
    CorruptFragmentTable { frame: usize, reason: String },

    #[error("Unsupported sample format: {bits_allocated} bits allocated, signed = {signed}, float = {float}")]
    UnsupportedSampleFormat {
        bits_allocated: u32,
        signed: bool,
        float: bool,
    },

    #[error("Native codec failure while {context}: {source}")]
    NativeCodecFailure {
        context: &'static str,
        #[source]
        source: NativeError,
    },

    #[error("Photometric interpretation {photometric} cannot be encoded losslessly by {codec:?}")]
    IncompatiblePhotometric {
        photometric: PhotometricInterpretation,
        codec: CodecKind,
    },

    #[error("Invalid near lossless error {near} (maximum {maximum})")]
    InvalidNearLossless { near: u32, maximum: u32 },

    #[error("Invalid frame index {index} (frame count {count})")]
    InvalidFrameIndex { index: usize, count: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Native matrix buffer already released")]
    Released,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    pub(crate) fn corrupt(frame: usize, reason: impl Into<String>) -> Self {
        Self::CorruptFragmentTable {
            frame,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn native(context: &'static str, source: NativeError) -> Self {
        Self::NativeCodecFailure { context, source }
    }
}

/// Error reported by a native codec invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("codec returned status {0}")]
    Status(i32),

    #[error("codec produced an empty result")]
    EmptyResult,

    #[error("{0}")]
    Message(String),
}
