// ---------------------------------------------------------------------------
// save_codec – Document <-> save blob
// ---------------------------------------------------------------------------

use crate::file_header::{
    decompress_payload, unwrap_header, wrap_with_header_and_metadata,
    wrap_with_header_compressed, UnwrapResult,
};
use crate::save_error::SaveError;
use crate::save_metadata::SaveMetadata;
use crate::save_types::Document;

/// Serialize `doc` into a headered blob stamped with `saved_at`.
pub fn encode_document(
    doc: &Document,
    compress: bool,
    saved_at: u64,
) -> Result<Vec<u8>, SaveError> {
    let json = serde_json::to_vec(doc).map_err(|e| SaveError::Encode(e.to_string()))?;
    let metadata = SaveMetadata::from_document(doc, saved_at);
    Ok(if compress {
        wrap_with_header_compressed(&json, &metadata)
    } else {
        wrap_with_header_and_metadata(&json, &metadata)
    })
}

/// Parse a blob produced by [`encode_document`], or a headerless legacy JSON
/// document.
pub fn decode_document(bytes: &[u8]) -> Result<Document, SaveError> {
    if bytes.is_empty() {
        return Err(SaveError::Decode("save data is empty".to_string()));
    }

    let json = match unwrap_header(bytes).map_err(SaveError::Decode)? {
        UnwrapResult::WithHeader {
            header, payload, ..
        } => {
            if header.is_compressed() {
                decompress_payload(payload, header.uncompressed_size).map_err(SaveError::Decode)?
            } else {
                payload.to_vec()
            }
        }
        UnwrapResult::Legacy(raw) => raw.to_vec(),
    };

    let value: serde_json::Value = serde_json::from_slice(&json)?;
    Document::try_from(value)
}
