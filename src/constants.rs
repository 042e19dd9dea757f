pub const MINIMUM_SAMPLES_PER_PIXEL: u32 = 1;
pub const MAXIMUM_SAMPLES_PER_PIXEL: u32 = 4;

// Upper bound of the NEAR parameter as defined in ISO/IEC 14495-1, C.2.4.1.1, table C.1.
pub const MAXIMUM_NEAR_LOSSLESS: u32 = 255;

// JPEG process 4 (extended sequential) sample precision.
pub const EXTENDED_BITS_PER_SAMPLE: u32 = 12;

// JPEG process 1 (baseline) sample precision.
pub const BASELINE_BITS_PER_SAMPLE: u32 = 8;

// Highest sample precision of JPEG lossless (process 14) and JPEG-LS.
pub const MAXIMUM_LOSSLESS_BITS_PER_SAMPLE: u32 = 16;

// Highest sample precision of JPEG 2000 Part 1 (ISO/IEC 15444-1, A.5.1).
pub const MAXIMUM_J2K_BITS_PER_SAMPLE: u32 = 38;

pub const DEFAULT_JPEG_QUALITY: u32 = 85;
pub const DEFAULT_J2K_COMPRESSION_RATIO: u32 = 10;

// Selection value 1 (Ra) of ISO/IEC 10918-1, table H.1; the default of DICOM process 14 SV1.
pub const DEFAULT_LOSSLESS_PREDICTOR: u32 = 1;

pub const DEFAULT_NEAR_LOSSLESS: u32 = 3;

pub const MAXIMUM_JPEG_QUALITY: u32 = 100;
