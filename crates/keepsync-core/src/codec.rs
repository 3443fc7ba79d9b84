//! Base64 wire codec for binary payloads.
//!
//! Binary pieces and inline attachments travel as standard, padded base64
//! text inside JSON documents.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::CoreError;

/// Encode bytes as standard padded base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard padded base64.
pub fn decode_base64(text: &str) -> Result<Bytes, CoreError> {
    Ok(Bytes::from(STANDARD.decode(text)?))
}

/// Serde adapter for `Option<Bytes>` fields carried as base64 strings.
///
/// Use with `#[serde(default, with = "keepsync_core::codec::base64_opt")]`.
pub mod base64_opt {
    use super::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&encode_base64(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|t| decode_base64(&t).map_err(serde::de::Error::custom))
            .transpose()
    }
}
