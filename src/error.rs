//! Verification errors
//!
//! Each module has its own error enum; [`VerifyError`] wraps them together
//! with the semantic and batch rejections raised by the verifier itself.

use serde::Serialize;

use crate::code::CodeError;
use crate::codec::DecodeError;
use crate::state::StateError;
use crate::tee::TrustError;

/// Coarse error classes, for hosts that route rejections differently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClass {
    /// Undecodable bytes: action encodings, code headers, stored records
    Malformed,
    /// A well-formed action that is invalid against state
    Semantic,
    /// A batch-level constraint
    Batch,
    /// An attestation, enclave signature or time quorum failure
    Trust,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    #[error("code: {0}")]
    Code(#[from] CodeError),

    #[error(transparent)]
    Trust(#[from] TrustError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("object {0} already exists")]
    ObjectExists(String),

    #[error("object {0} not found")]
    ObjectNotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("code size {size} exceeds {max}")]
    CodeTooLarge { size: usize, max: usize },

    #[error("payload size {size} exceeds {max}")]
    StorageTooLarge { size: usize, max: usize },

    #[error("invalid function name: {0}")]
    InvalidFunction(String),

    #[error("{count} routes declared, at most {max}")]
    TooManyRoutes { count: usize, max: usize },

    #[error("region {0} already exists")]
    RegionExists(String),

    #[error("region {0} not found")]
    RegionNotFound(String),

    #[error("invalid region id: {0}")]
    InvalidRegionId(String),

    #[error("object {object} is not governed by region {region}")]
    InvalidRegion { object: String, region: String },

    #[error("invalid TEE set: {0}")]
    InvalidTee(String),

    #[error("caller is not privileged for {0}")]
    Unauthorized(&'static str),

    #[error("invalid contract: {0}")]
    InvalidContract(String),

    #[error("contract signature does not verify")]
    InvalidSignature,

    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("contract {0} already stored")]
    ContractExists(String),

    #[error("invalid state update: {0}")]
    InvalidStateUpdate(String),

    #[error("batch of {len} actions exceeds {max}")]
    BatchLimit { len: usize, max: usize },

    #[error("duplicate action at index {index}: {reason}")]
    DuplicateAction { index: usize, reason: String },

    #[error("conflicting action at index {index}: {reason}")]
    ConflictingAction { index: usize, reason: String },

    #[error("circular event dependency through {0}")]
    CircularDependency(String),

    #[error("event to {target} with priority {priority} follows priority {previous}")]
    InvalidEventOrder {
        target: String,
        priority: u64,
        previous: u64,
    },

    #[error("batch resources exceeded: {0}")]
    BatchResourceExceeded(String),

    #[error("action {index} rejected: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<VerifyError>,
    },
}

/// Header and body-shape failures are undecodable code; the rest reject a
/// well-formed blob against the registry.
fn code_class(err: &CodeError) -> ErrorClass {
    match err {
        CodeError::InvalidHeader | CodeError::MalformedCode(_) | CodeError::InvalidFormat(_) => {
            ErrorClass::Malformed
        }
        CodeError::CodeTooLarge { .. }
        | CodeError::UnsupportedFormat(_)
        | CodeError::InvalidTeeFormat { .. } => ErrorClass::Semantic,
    }
}

/// Unreadable enclave records are host corruption, not enclave misbehaviour
fn trust_class(err: &TrustError) -> ErrorClass {
    match err {
        TrustError::CorruptState(_) => ErrorClass::Malformed,
        TrustError::AttestationMismatch(_)
        | TrustError::InvalidAttestation(_)
        | TrustError::UnauthorizedEnclave(_)
        | TrustError::UnregisteredEnclave(_)
        | TrustError::MissingAttestation
        | TrustError::InvalidTimestamp(_)
        | TrustError::StaleTimestamp { .. }
        | TrustError::StaleAttestation { .. } => ErrorClass::Trust,
    }
}

impl VerifyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            VerifyError::Decode(_) | VerifyError::State(_) => ErrorClass::Malformed,
            VerifyError::Code(e) => code_class(e),
            VerifyError::Trust(e) => trust_class(e),
            VerifyError::ObjectExists(_)
            | VerifyError::ObjectNotFound(_)
            | VerifyError::InvalidId(_)
            | VerifyError::CodeTooLarge { .. }
            | VerifyError::StorageTooLarge { .. }
            | VerifyError::InvalidFunction(_)
            | VerifyError::TooManyRoutes { .. }
            | VerifyError::RegionExists(_)
            | VerifyError::RegionNotFound(_)
            | VerifyError::InvalidRegionId(_)
            | VerifyError::InvalidRegion { .. }
            | VerifyError::InvalidTee(_)
            | VerifyError::Unauthorized(_)
            | VerifyError::InvalidContract(_)
            | VerifyError::InvalidSignature
            | VerifyError::ChecksumMismatch { .. }
            | VerifyError::ContractExists(_)
            | VerifyError::InvalidStateUpdate(_) => ErrorClass::Semantic,
            VerifyError::BatchLimit { .. }
            | VerifyError::DuplicateAction { .. }
            | VerifyError::ConflictingAction { .. }
            | VerifyError::CircularDependency(_)
            | VerifyError::InvalidEventOrder { .. }
            | VerifyError::BatchResourceExceeded(_) => ErrorClass::Batch,
            VerifyError::InBatch { source, .. } => source.class(),
        }
    }

    /// The underlying error, looking through batch index wrapping
    pub fn root(&self) -> &VerifyError {
        match self {
            VerifyError::InBatch { source, .. } => source.root(),
            other => other,
        }
    }
}
