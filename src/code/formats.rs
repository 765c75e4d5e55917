//! Per-format body validators
//!
//! Each format checks the code body (everything after the header) and then
//! runs a TEE-specific secondary check for the header's TEE type.

use super::header::TEE_TYPE_NONE;
use super::CodeError;

/// WebAssembly module preamble: `\0asm` + version 1
pub const WASM_MAGIC: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

/// A validator for one code format
pub trait FormatValidator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Structural check of the code body
    fn validate(&self, body: &[u8]) -> Result<(), CodeError>;

    /// Secondary check for running the body inside `tee_type`
    fn validate_for_tee(&self, body: &[u8], tee_type: u8) -> Result<(), CodeError>;
}

/// Raw bytecode: any non-empty body, refused inside every TEE
#[derive(Debug, Default, Clone, Copy)]
pub struct RawValidator;

impl FormatValidator for RawValidator {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn validate(&self, body: &[u8]) -> Result<(), CodeError> {
        if body.is_empty() {
            return Err(CodeError::MalformedCode("empty raw body"));
        }
        Ok(())
    }

    fn validate_for_tee(&self, _body: &[u8], tee_type: u8) -> Result<(), CodeError> {
        if tee_type != TEE_TYPE_NONE {
            return Err(CodeError::InvalidTeeFormat {
                format: super::header::FORMAT_RAW,
                tee_type,
            });
        }
        Ok(())
    }
}

/// WebAssembly: body must open with the module magic and version
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmValidator;

impl FormatValidator for WasmValidator {
    fn name(&self) -> &'static str {
        "wasm"
    }

    fn validate(&self, body: &[u8]) -> Result<(), CodeError> {
        if body.len() < WASM_MAGIC.len() {
            return Err(CodeError::MalformedCode("wasm body shorter than module magic"));
        }
        if body[..WASM_MAGIC.len()] != WASM_MAGIC {
            return Err(CodeError::InvalidFormat("wasm module magic mismatch"));
        }
        Ok(())
    }

    fn validate_for_tee(&self, _body: &[u8], _tee_type: u8) -> Result<(), CodeError> {
        Ok(())
    }
}

/// Custom table format: little-endian `u32` table size, then at least that
/// many bytes of table
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomValidator;

impl FormatValidator for CustomValidator {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn validate(&self, body: &[u8]) -> Result<(), CodeError> {
        if body.len() < 4 {
            return Err(CodeError::MalformedCode("custom body missing table size"));
        }
        let table_size = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        if body.len() - 4 < table_size {
            return Err(CodeError::MalformedCode("custom body shorter than declared table"));
        }
        Ok(())
    }

    fn validate_for_tee(&self, _body: &[u8], _tee_type: u8) -> Result<(), CodeError> {
        Ok(())
    }
}
