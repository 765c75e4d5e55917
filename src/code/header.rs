//! CodeHeader: The 16-byte prefix carried by every stored code blob

use serde::{Deserialize, Serialize};

/// Magic bytes opening every code header
pub const HEADER_MAGIC: &[u8; 8] = b"\x00SHUTTLE";

/// Header size: magic (8) + format (1) + version (1) + TEE type (1) + reserved (5)
pub const HEADER_SIZE: usize = 16;

/// Plain bytecode, never runnable inside a TEE
pub const FORMAT_RAW: u8 = 1;
/// WebAssembly module
pub const FORMAT_WASM: u8 = 2;
/// Length-prefixed table format
pub const FORMAT_CUSTOM: u8 = 3;

/// Code not bound to any enclave
pub const TEE_TYPE_NONE: u8 = 0;
/// Intel SGX
pub const TEE_TYPE_SGX: u8 = 1;
/// AMD SEV
pub const TEE_TYPE_SEV: u8 = 2;

/// Parsed code header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHeader {
    pub format: u8,
    pub version: u8,
    pub tee_type: u8,
    pub reserved: [u8; 5],
}

impl CodeHeader {
    pub fn new(format: u8, version: u8, tee_type: u8) -> Self {
        Self {
            format,
            version,
            tee_type,
            reserved: [0; 5],
        }
    }

    /// Parse the header from the front of `code`; `None` if too short or the
    /// magic does not match.
    pub fn parse(code: &[u8]) -> Option<Self> {
        if code.len() < HEADER_SIZE || &code[..8] != HEADER_MAGIC {
            return None;
        }
        let mut reserved = [0u8; 5];
        reserved.copy_from_slice(&code[11..16]);
        Some(Self {
            format: code[8],
            version: code[9],
            tee_type: code[10],
            reserved,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..8].copy_from_slice(HEADER_MAGIC);
        out[8] = self.format;
        out[9] = self.version;
        out[10] = self.tee_type;
        out[11..].copy_from_slice(&self.reserved);
        out
    }
}

/// Prepend a header to a code body. Producers must call this before
/// submitting code for storage.
pub fn wrap(format: u8, version: u8, tee_type: u8, body: &[u8]) -> Vec<u8> {
    let header = CodeHeader::new(format, version, tee_type);
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(body);
    out
}
