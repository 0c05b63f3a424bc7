//! Content-Encoding handling for rewritten bodies.

use std::io::{Read, Write};

use axum::http::{header, HeaderMap};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::RewriteError;

/// Encodings the rewriter can see through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
}

impl ContentCoding {
    /// Determine the body encoding from the response headers.
    ///
    /// Only a single `gzip` token (or none at all) is understood; stacked
    /// encodings and anything else are reported as unsupported.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RewriteError> {
        let mut tokens = Vec::new();
        for value in headers.get_all(header::CONTENT_ENCODING) {
            let value = value.to_str().map_err(|_| {
                let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
                RewriteError::UnsupportedEncoding(raw)
            })?;
            tokens.extend(
                value
                    .split(',')
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty() && t != "identity"),
            );
        }

        match tokens.as_slice() {
            [] => Ok(ContentCoding::Identity),
            [token] if token == "gzip" || token == "x-gzip" => Ok(ContentCoding::Gzip),
            _ => Err(RewriteError::UnsupportedEncoding(tokens.join(", "))),
        }
    }

    /// Undo the encoding. Output longer than `limit` bytes is refused
    /// without being inflated any further.
    pub fn decode(&self, body: &[u8], limit: usize) -> Result<Vec<u8>, RewriteError> {
        let decoded = match self {
            ContentCoding::Identity => body.to_vec(),
            ContentCoding::Gzip => {
                let mut decoded = Vec::with_capacity(body.len().saturating_mul(4).min(limit));
                MultiGzDecoder::new(body)
                    .take(limit as u64 + 1)
                    .read_to_end(&mut decoded)
                    .map_err(RewriteError::Decode)?;
                decoded
            }
        };
        if decoded.len() > limit {
            return Err(RewriteError::TooLarge(limit));
        }
        Ok(decoded)
    }

    /// Re-apply the encoding at the given compression level (gzip only).
    pub fn encode(&self, body: Vec<u8>, level: u32) -> Result<Vec<u8>, RewriteError> {
        match self {
            ContentCoding::Identity => Ok(body),
            ContentCoding::Gzip => {
                let level = Compression::new(level.min(9));
                let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), level);
                encoder.write_all(&body).map_err(RewriteError::Encode)?;
                encoder.finish().map_err(RewriteError::Encode)
            }
        }
    }
}
