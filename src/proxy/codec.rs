//! On-disk record format for captured responses
//!
//! A record is a JSON object `{"statusCode", "headers", "body"}` where
//! `headers` is a flat array alternating name and value. The flat form keeps
//! header order and duplicate names intact. Bodies that are not valid UTF-8
//! are stored as standard base64 and flagged with `"bodyEncoding":"base64"`,
//! so every record replays byte for byte.

use crate::proxy::types::{CachedResponse, HeaderList};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while encoding or decoding a record
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid status code in record: {0}")]
    InvalidStatus(u16),

    #[error("Header list has an odd number of entries: {0}")]
    UnpairedHeader(usize),

    #[error("Invalid header name in record: {0}")]
    InvalidHeaderName(String),

    #[error("Invalid value for header {name}")]
    InvalidHeaderValue { name: String },

    #[error("Unknown body encoding in record: {0}")]
    UnknownBodyEncoding(String),

    #[error("Invalid base64 body in record: {0}")]
    InvalidBody(#[from] base64::DecodeError),
}

/// Marker for bodies stored as base64
const BASE64_BODY_ENCODING: &str = "base64";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseRecord {
    status_code: u16,
    headers: Vec<String>,
    body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_encoding: Option<String>,
}

/// Converts between [`CachedResponse`] and its persisted bytes
pub struct ResponseCodec;

impl ResponseCodec {
    /// UTF-8 bodies are stored as text, anything else as base64
    pub fn encode(response: &CachedResponse) -> Result<Vec<u8>, CodecError> {
        let headers = response
            .headers
            .iter()
            .flat_map(|(name, value)| {
                [
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                ]
            })
            .collect();

        let (body, body_encoding) = match std::str::from_utf8(&response.body) {
            Ok(text) => (text.to_string(), None),
            Err(_) => (
                STANDARD.encode(&response.body),
                Some(BASE64_BODY_ENCODING.to_string()),
            ),
        };

        let record = ResponseRecord {
            status_code: response.status.as_u16(),
            headers,
            body,
            body_encoding,
        };

        Ok(serde_json::to_vec(&record)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<CachedResponse, CodecError> {
        let record: ResponseRecord = serde_json::from_slice(bytes)?;

        let status = StatusCode::from_u16(record.status_code)
            .map_err(|_| CodecError::InvalidStatus(record.status_code))?;

        if record.headers.len() % 2 != 0 {
            return Err(CodecError::UnpairedHeader(record.headers.len()));
        }

        let headers = record
            .headers
            .chunks_exact(2)
            .map(|pair| {
                let name = HeaderName::from_bytes(pair[0].as_bytes())
                    .map_err(|_| CodecError::InvalidHeaderName(pair[0].clone()))?;
                let value = HeaderValue::from_str(&pair[1]).map_err(|_| {
                    CodecError::InvalidHeaderValue {
                        name: pair[0].clone(),
                    }
                })?;
                Ok((name, value))
            })
            .collect::<Result<HeaderList, CodecError>>()?;

        let body = match record.body_encoding.as_deref() {
            None => Bytes::from(record.body),
            Some(BASE64_BODY_ENCODING) => Bytes::from(STANDARD.decode(record.body)?),
            Some(other) => return Err(CodecError::UnknownBodyEncoding(other.to_string())),
        };

        Ok(CachedResponse::new(status, headers, body))
    }
}
