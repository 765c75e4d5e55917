//! Code Format Validator: Gatekeeps code blobs before storage
//!
//! A code blob is a 16-byte [`CodeHeader`] followed by a format-specific body:
//! - the header magic and size are checked first
//! - the format id must map to a registered [`FormatValidator`]
//! - the header's TEE type must list the format in the capability table
//! - the format validator checks the body, then runs its TEE-specific check
//!
//! The registry is a plain value built once and read-only afterwards.

mod formats;
mod header;

pub use formats::{CustomValidator, FormatValidator, RawValidator, WasmValidator, WASM_MAGIC};
pub use header::{
    wrap, CodeHeader, FORMAT_CUSTOM, FORMAT_RAW, FORMAT_WASM, HEADER_MAGIC, HEADER_SIZE,
    TEE_TYPE_NONE, TEE_TYPE_SEV, TEE_TYPE_SGX,
};

use std::collections::BTreeMap;

/// Code format errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("code size {size} exceeds maximum {max}")]
    CodeTooLarge { size: usize, max: usize },

    #[error("invalid code header")]
    InvalidHeader,

    #[error("unsupported code format {0}")]
    UnsupportedFormat(u8),

    #[error("code format {format} not supported by TEE type {tee_type}")]
    InvalidTeeFormat { format: u8, tee_type: u8 },

    #[error("malformed code: {0}")]
    MalformedCode(&'static str),

    #[error("invalid code format: {0}")]
    InvalidFormat(&'static str),
}

/// Registry of format validators and TEE capabilities
pub struct CodeValidator {
    max_size: usize,
    formats: BTreeMap<u8, Box<dyn FormatValidator>>,
    tee_formats: BTreeMap<u8, Vec<u8>>,
}

impl CodeValidator {
    /// Empty registry: every format is unsupported until registered
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            formats: BTreeMap::new(),
            tee_formats: BTreeMap::new(),
        }
    }

    /// Registry with raw, wasm and custom formats.
    /// SGX runs wasm only; SEV runs wasm and custom.
    pub fn with_defaults(max_size: usize) -> Self {
        Self::new(max_size)
            .register_format(FORMAT_RAW, RawValidator)
            .register_format(FORMAT_WASM, WasmValidator)
            .register_format(FORMAT_CUSTOM, CustomValidator)
            .register_tee_formats(TEE_TYPE_SGX, &[FORMAT_WASM])
            .register_tee_formats(TEE_TYPE_SEV, &[FORMAT_WASM, FORMAT_CUSTOM])
    }

    pub fn register_format(mut self, format: u8, validator: impl FormatValidator + 'static) -> Self {
        self.formats.insert(format, Box::new(validator));
        self
    }

    /// Replace the list of formats `tee_type` can execute
    pub fn register_tee_formats(mut self, tee_type: u8, formats: &[u8]) -> Self {
        self.tee_formats.insert(tee_type, formats.to_vec());
        self
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn supports(&self, tee_type: u8, format: u8) -> bool {
        self.tee_formats
            .get(&tee_type)
            .is_some_and(|formats| formats.contains(&format))
    }

    /// Validate a full code blob and return its header
    pub fn validate(&self, code: &[u8]) -> Result<CodeHeader, CodeError> {
        if code.len() > self.max_size {
            return Err(CodeError::CodeTooLarge {
                size: code.len(),
                max: self.max_size,
            });
        }
        let header = CodeHeader::parse(code).ok_or(CodeError::InvalidHeader)?;

        let validator = self
            .formats
            .get(&header.format)
            .ok_or(CodeError::UnsupportedFormat(header.format))?;

        if !self.supports(header.tee_type, header.format) {
            return Err(CodeError::InvalidTeeFormat {
                format: header.format,
                tee_type: header.tee_type,
            });
        }

        let body = &code[HEADER_SIZE..];
        validator.validate(body)?;
        validator.validate_for_tee(body, header.tee_type)?;

        log::debug!(
            "Code accepted: format={} v{} tee={} body={}B",
            validator.name(),
            header.version,
            header.tee_type,
            body.len()
        );
        Ok(header)
    }
}

impl std::fmt::Debug for CodeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeValidator")
            .field("max_size", &self.max_size)
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field("tee_formats", &self.tee_formats)
            .finish()
    }
}
