//! Binary data decoding for mzML and mzXML
//!
//! Both formats store numerical arrays as Base64-encoded binary data,
//! optionally compressed with zlib. This module handles the decoding pipeline:
//!
//! 1. Base64 decode the text
//! 2. Decompress if needed (zlib)
//! 3. Interpret bytes as float32 or float64 in the declared byte order
//!
//! mzML arrays are little-endian and stored one array per element. mzXML
//! stores m/z and intensity interleaved in network (big-endian) order.

use std::io::Read;

use base64::prelude::*;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

/// Compression types used in binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// No compression (raw binary)
    #[default]
    None,
    /// zlib compression (most common)
    Zlib,
    /// MS-Numpress linear prediction
    NumpressLinear,
    /// MS-Numpress positive integer compression
    NumpressPic,
    /// MS-Numpress short logged float compression
    NumpressSlof,
}

impl CompressionType {
    /// Determine compression type from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000574" => Some(CompressionType::Zlib),
            "MS:1000576" => Some(CompressionType::None),
            "MS:1002312" => Some(CompressionType::NumpressLinear),
            "MS:1002313" => Some(CompressionType::NumpressPic),
            "MS:1002314" => Some(CompressionType::NumpressSlof),
            _ => None,
        }
    }

    /// Determine compression type from the mzXML `compressionType` attribute
    pub fn from_mzxml_attribute(value: &str) -> Option<Self> {
        match value {
            "zlib" => Some(CompressionType::Zlib),
            "none" | "" => Some(CompressionType::None),
            _ => None,
        }
    }
}

/// Binary encoding precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit floating point (CV: MS:1000521)
    Float32,
    /// 64-bit floating point (CV: MS:1000523)
    #[default]
    Float64,
}

impl BinaryEncoding {
    /// Determine encoding from the mzXML `precision` attribute
    pub fn from_precision_bits(bits: &str) -> Option<Self> {
        match bits {
            "32" => Some(BinaryEncoding::Float32),
            "64" => Some(BinaryEncoding::Float64),
            _ => None,
        }
    }

    /// Get the byte size per value
    pub fn byte_size(&self) -> usize {
        match self {
            BinaryEncoding::Float32 => 4,
            BinaryEncoding::Float64 => 8,
        }
    }
}

/// Byte order of the decoded values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Little-endian, mandated by mzML
    #[default]
    Little,
    /// Big-endian ("network"), mandated by mzXML
    Big,
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    /// Text content was not valid Base64
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// zlib stream could not be inflated
    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    /// Decoded value count disagrees with the declared length
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Declared length
        expected: usize,
        /// Decoded length
        actual: usize,
    },

    /// Compression scheme this decoder cannot handle
    #[error("Unsupported compression: {0:?}")]
    UnsupportedCompression(CompressionType),
}

/// Decoder for Base64 binary data arrays
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode a Base64-encoded little-endian mzML array
    ///
    /// # Arguments
    /// * `base64_data` - The Base64-encoded string from the `<binary>` element
    /// * `encoding` - The numerical precision (32 or 64 bit)
    /// * `compression` - The compression type (none, zlib, etc.)
    /// * `expected_length` - Expected number of values (from defaultArrayLength)
    pub fn decode(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let values =
            Self::decode_with_order(base64_data, encoding, compression, ByteOrder::Little)?;

        if let Some(expected) = expected_length {
            if values.len() != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len(),
                });
            }
        }

        Ok(values)
    }

    /// Decode a Base64-encoded array in an explicit byte order
    pub fn decode_with_order(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        order: ByteOrder,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        // Base64 may be wrapped over several lines
        let compact: String = base64_data.split_whitespace().collect();
        if compact.is_empty() {
            return Ok(Vec::new());
        }

        let decoded_bytes = BASE64_STANDARD.decode(compact.as_bytes())?;

        let uncompressed = match compression {
            CompressionType::None => decoded_bytes,
            CompressionType::Zlib => {
                let mut decoder = ZlibDecoder::new(&decoded_bytes[..]);
                let mut uncompressed = Vec::new();
                decoder.read_to_end(&mut uncompressed)?;
                uncompressed
            }
            CompressionType::NumpressLinear
            | CompressionType::NumpressPic
            | CompressionType::NumpressSlof => {
                return Err(BinaryDecodeError::UnsupportedCompression(compression));
            }
        };

        Self::bytes_to_floats(&uncompressed, encoding, order)
    }

    /// Decode an mzXML `<peaks>` payload into separate m/z and intensity arrays
    pub fn decode_interleaved_pairs(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        expected_pairs: Option<usize>,
    ) -> Result<(Vec<f64>, Vec<f64>), BinaryDecodeError> {
        let values = Self::decode_with_order(base64_data, encoding, compression, ByteOrder::Big)?;
        if values.len() % 2 != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: values.len() + 1,
                actual: values.len(),
            });
        }
        if let Some(expected) = expected_pairs {
            if values.len() / 2 != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len() / 2,
                });
            }
        }

        let mut mzs = Vec::with_capacity(values.len() / 2);
        let mut intensities = Vec::with_capacity(values.len() / 2);
        for pair in values.chunks_exact(2) {
            mzs.push(pair[0]);
            intensities.push(pair[1]);
        }
        Ok((mzs, intensities))
    }

    /// Convert raw bytes to f64 values based on encoding
    fn bytes_to_floats(
        bytes: &[u8],
        encoding: BinaryEncoding,
        order: ByteOrder,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let byte_size = encoding.byte_size();

        if bytes.len() % byte_size != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: bytes.len() / byte_size * byte_size,
                actual: bytes.len(),
            });
        }

        let count = bytes.len() / byte_size;
        let mut values = Vec::with_capacity(count);
        let mut cursor = std::io::Cursor::new(bytes);

        for _ in 0..count {
            let val = match (encoding, order) {
                (BinaryEncoding::Float32, ByteOrder::Little) => {
                    cursor.read_f32::<LittleEndian>()? as f64
                }
                (BinaryEncoding::Float32, ByteOrder::Big) => cursor.read_f32::<BigEndian>()? as f64,
                (BinaryEncoding::Float64, ByteOrder::Little) => cursor.read_f64::<LittleEndian>()?,
                (BinaryEncoding::Float64, ByteOrder::Big) => cursor.read_f64::<BigEndian>()?,
            };
            values.push(val);
        }

        Ok(values)
    }
}
