// ---------------------------------------------------------------------------
// save_metadata – Quick-access summary for slot listings
// ---------------------------------------------------------------------------
//
// SaveMetadata is a small, self-contained section encoded between the file
// header and the JSON payload.  A slot browser can show version, counts and
// play time without decoding or migrating the document.
//
// File layout:
//   [Header 32 bytes] [Metadata (variable)] [Payload]

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::save_types::{keys, Document};
use crate::version_detect::detect_version;

/// Summary of a save, read without touching the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SaveMetadata {
    /// Schema version of the payload, 0 when it could not be determined.
    pub version: u32,
    pub structure_count: u32,
    pub actor_count: u32,
    /// Total play time in seconds.
    pub playtime_secs: f64,
    pub tier: u32,
    /// Milliseconds since the Unix epoch at which the blob was written.
    pub saved_at: u64,
}

impl SaveMetadata {
    /// Summarize `doc`, tolerating missing or malformed fields.
    pub fn from_document(doc: &Document, saved_at: u64) -> Self {
        Self {
            version: detect_version(doc).unwrap_or(0),
            structure_count: doc.structures().len() as u32,
            actor_count: doc.actors().len() as u32,
            playtime_secs: doc
                .get(keys::PLAYTIME)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
            tier: doc
                .get(keys::TIER)
                .and_then(|v| v.as_u64())
                .map_or(0, |t| t.min(u32::MAX as u64) as u32),
            saved_at,
        }
    }

    /// Encode metadata to bytes using bitcode.
    pub fn encode(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    /// Decode metadata from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, bitcode::Error> {
        bitcode::decode(bytes)
    }
}
