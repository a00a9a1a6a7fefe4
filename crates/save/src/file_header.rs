// ---------------------------------------------------------------------------
// file_header – Save blob header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (32 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "HRTH"
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = LZ4 compressed payload)
//   [12..20] Timestamp (milliseconds since Unix epoch, u64)
//   [20..24] Uncompressed payload size (u32)
//   [24..28] xxHash32 checksum of everything after the header
//   [28..32] Metadata section size (u32)
//
// On save: encode document JSON -> (optionally) compress -> prepend header
//          and bitcode metadata
// On load: check magic -> validate checksum -> strip header and metadata ->
//          (optionally) decompress -> parse JSON
// Legacy:  if the first 4 bytes are not "HRTH", the whole buffer is treated
//          as a headerless JSON document.

use xxhash_rust::xxh32::xxh32;

use crate::save_metadata::SaveMetadata;

/// Magic bytes identifying a save blob.
pub const MAGIC: [u8; 4] = *b"HRTH";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 32;

/// Current header layout version.  Distinct from the document schema
/// version, which lives inside the payload.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Payload is LZ4 block-compressed with its size prepended.
pub const FLAG_COMPRESSED: u32 = 1;

/// Seed for xxHash32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
    pub metadata_size: u32,
}

impl FileHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.extend_from_slice(&self.metadata_size.to_le_bytes());
    }
}

fn assemble(
    payload: &[u8],
    uncompressed_size: usize,
    flags: u32,
    metadata: &SaveMetadata,
) -> Vec<u8> {
    let meta_bytes = metadata.encode();
    let mut body = Vec::with_capacity(meta_bytes.len() + payload.len());
    body.extend_from_slice(&meta_bytes);
    body.extend_from_slice(payload);

    let header = FileHeader {
        format_version: HEADER_FORMAT_VERSION,
        flags,
        timestamp: metadata.saved_at,
        uncompressed_size: uncompressed_size as u32,
        checksum: xxh32(&body, XXHASH_SEED),
        metadata_size: meta_bytes.len() as u32,
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    header.write_to(&mut out);
    out.extend_from_slice(&body);
    out
}

/// Wrap an uncompressed payload with a header and default metadata.
pub fn wrap_with_header(data: &[u8]) -> Vec<u8> {
    wrap_with_header_and_metadata(data, &SaveMetadata::default())
}

/// Wrap an uncompressed payload with a header and the given metadata.
pub fn wrap_with_header_and_metadata(data: &[u8], metadata: &SaveMetadata) -> Vec<u8> {
    assemble(data, data.len(), 0, metadata)
}

/// LZ4-compress `data` and wrap it with a header carrying `FLAG_COMPRESSED`.
pub fn wrap_with_header_compressed(data: &[u8], metadata: &SaveMetadata) -> Vec<u8> {
    let compressed = lz4_flex::compress_prepend_size(data);
    assemble(&compressed, data.len(), FLAG_COMPRESSED, metadata)
}

/// Undo [`wrap_with_header_compressed`]'s compression.  The size prefix
/// must agree with the header's `uncompressed_size` before anything is
/// allocated.
pub fn decompress_payload(payload: &[u8], uncompressed_size: u32) -> Result<Vec<u8>, String> {
    if payload.len() < 4 {
        return Err("Save payload is too short to be compressed".to_string());
    }
    let prefix = le_u32(payload, 0);
    if prefix != uncompressed_size {
        return Err(format!(
            "Save payload size mismatch: header says {uncompressed_size} bytes, \
             payload says {prefix}"
        ));
    }
    lz4_flex::decompress_size_prepended(payload)
        .map_err(|e| format!("Save payload failed to decompress: {e}"))
}

/// Result of unwrapping a save blob.
pub enum UnwrapResult<'a> {
    /// Blob has a valid header; metadata (when decodable) and payload follow.
    WithHeader {
        header: FileHeader,
        metadata: Option<SaveMetadata>,
        payload: &'a [u8],
    },
    /// Blob has no header; the entire buffer is the payload.
    Legacy(&'a [u8]),
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(buf)
}

fn le_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Parse and validate the header of a save blob.
///
/// # Errors
///
/// Returns an error if:
/// - The magic is present but the blob is too short for a header
/// - The header format version is from a newer build
/// - The checksum does not match (data corruption)
/// - The metadata section overruns the blob
pub fn unwrap_header(bytes: &[u8]) -> Result<UnwrapResult<'_>, String> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Ok(UnwrapResult::Legacy(bytes));
    }

    if bytes.len() < HEADER_SIZE {
        return Err(format!(
            "Save file has HRTH magic bytes but is too short ({} bytes, \
             need at least {} for header)",
            bytes.len(),
            HEADER_SIZE
        ));
    }

    let header = FileHeader {
        format_version: le_u32(bytes, 4),
        flags: le_u32(bytes, 8),
        timestamp: le_u64(bytes, 12),
        uncompressed_size: le_u32(bytes, 20),
        checksum: le_u32(bytes, 24),
        metadata_size: le_u32(bytes, 28),
    };

    if header.format_version > HEADER_FORMAT_VERSION {
        return Err(format!(
            "Save file uses header format version {}, but this build only supports \
             up to version {}",
            header.format_version, HEADER_FORMAT_VERSION,
        ));
    }

    let body = &bytes[HEADER_SIZE..];
    let computed = xxh32(body, XXHASH_SEED);
    if computed != header.checksum {
        return Err(format!(
            "Save file is corrupted: checksum mismatch \
             (expected {:#010X}, got {:#010X})",
            header.checksum, computed,
        ));
    }

    let meta_len = header.metadata_size as usize;
    if meta_len > body.len() {
        return Err(format!(
            "Save file metadata section ({meta_len} bytes) is larger than the \
             remaining {} bytes",
            body.len()
        ));
    }
    let (meta_bytes, payload) = body.split_at(meta_len);
    let metadata = if meta_bytes.is_empty() {
        None
    } else {
        SaveMetadata::decode(meta_bytes).ok()
    };

    Ok(UnwrapResult::WithHeader {
        header,
        metadata,
        payload,
    })
}

/// Read only the metadata section, without validating the payload checksum.
pub fn read_metadata_only(bytes: &[u8]) -> Option<SaveMetadata> {
    if bytes.len() < HEADER_SIZE || bytes[..MAGIC.len()] != MAGIC {
        return None;
    }
    let meta_len = le_u32(bytes, 28) as usize;
    let meta_bytes = bytes.get(HEADER_SIZE..HEADER_SIZE.checked_add(meta_len)?)?;
    SaveMetadata::decode(meta_bytes).ok()
}
