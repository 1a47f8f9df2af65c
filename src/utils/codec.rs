//! zlib-compressed JSON blobs, the on-disk shape of user documents.

use crate::utils::error::{AppError, AppResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};

pub fn compress_json<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AppError::Codec(format!("Failed to serialize: {}", e)))?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| AppError::Codec(format!("Failed to compress: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| AppError::Codec(format!("Failed to compress: {}", e)))
}

pub fn decompress_json<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
    let mut json = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| AppError::Codec(format!("Failed to decompress: {}", e)))?;

    serde_json::from_slice(&json)
        .map_err(|e| AppError::Codec(format!("Failed to parse: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        verified: bool,
    }

    #[test]
    fn output_is_a_zlib_stream() {
        let bytes = compress_json(&Sample {
            name: "Jane".into(),
            verified: true,
        })
        .unwrap();
        // zlib header: CMF 0x78 (deflate, 32K window)
        assert_eq!(bytes[0], 0x78);
        let back: Sample = decompress_json(&bytes).unwrap();
        assert_eq!(back.name, "Jane");
        assert!(back.verified);
    }

    #[test]
    fn reads_blobs_with_unknown_fields() {
        let legacy = serde_json::json!({
            "name": "Old",
            "verified": false,
            "some_field_we_dropped": 42
        });
        let bytes = compress_json(&legacy).unwrap();
        let parsed: Sample = decompress_json(&bytes).unwrap();
        assert_eq!(parsed.name, "Old");
    }

    #[test]
    fn garbage_is_reported_not_panicked() {
        let result: AppResult<Sample> = decompress_json(b"definitely not zlib");
        assert!(matches!(result, Err(AppError::Codec(_))));
    }
}
