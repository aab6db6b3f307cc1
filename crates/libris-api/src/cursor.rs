// SPDX-License-Identifier: Apache-2.0

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

const CURSOR_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CursorError {
    Decode(String),
    VersionMismatch(String),
    QueryMismatch,
}

impl Display for CursorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(msg) => write!(f, "cursor decode failed: {msg}"),
            Self::VersionMismatch(got) => write!(f, "unsupported cursor version: {got}"),
            Self::QueryMismatch => {
                f.write_str("cursor does not belong to this query")
            }
        }
    }
}

impl std::error::Error for CursorError {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct CursorPayload {
    cursor_version: String,
    last_id: i64,
    query_hash: String,
}

/// Hash binding a cursor to the search parameters it was issued under.
/// A cursor is not portable across different queries.
#[must_use]
pub fn query_hash(q: Option<&str>, by: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"q=");
    hasher.update(q.unwrap_or_default().as_bytes());
    hasher.update(b"&by=");
    hasher.update(by.unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn encode_cursor(last_id: i64, query_hash: &str) -> Result<String, CursorError> {
    let payload = CursorPayload {
        cursor_version: CURSOR_VERSION.to_string(),
        last_id,
        query_hash: query_hash.to_string(),
    };
    let bytes = serde_json::to_vec(&payload).map_err(|e| CursorError::Decode(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn decode_cursor(token: &str, expected_query_hash: &str) -> Result<i64, CursorError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| CursorError::Decode(e.to_string()))?;
    let payload: CursorPayload =
        serde_json::from_slice(&bytes).map_err(|e| CursorError::Decode(e.to_string()))?;
    if payload.cursor_version != CURSOR_VERSION {
        return Err(CursorError::VersionMismatch(payload.cursor_version));
    }
    if payload.query_hash != expected_query_hash {
        return Err(CursorError::QueryMismatch);
    }
    Ok(payload.last_id)
}
