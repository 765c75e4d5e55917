//! TEE trust checks: Attestation pairs and Roughtime consensus
//!
//! Everything an enclave or time server produces is only *verified* here:
//! - **Enclave**: enclave kinds and their quote signature schemes
//! - **Attestation**: two-enclave pair consensus against a region's TEE set
//! - **Roughtime**: signed time-stamp quorum, lower median, staleness window

mod attestation;
mod enclave;
mod roughtime;

pub use attestation::{verify_pair, Attestation, AttestationPair};
pub use enclave::EnclaveType;
pub use roughtime::{lower_median, RoughtimeStamp, TimeQuorum};

use crate::state::StateError;

/// Trust-boundary failures: a misbehaving enclave, a bad time server or
/// clock skew. Callers should log these apart from ordinary rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    #[error("attestation pair disagrees on {0}")]
    AttestationMismatch(&'static str),

    #[error("invalid attestation: {0}")]
    InvalidAttestation(String),

    #[error("enclave {0} is not authorized for this region")]
    UnauthorizedEnclave(String),

    #[error("enclave {0} has no registered quote key")]
    UnregisteredEnclave(String),

    #[error("region-governed action carries no attestation pair")]
    MissingAttestation,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("stale timestamp: median {median} vs block time {block_time} exceeds {max_drift}s")]
    StaleTimestamp {
        median: u64,
        block_time: u64,
        max_drift: u64,
    },

    #[error("attested at {attested_at}, trusted time {trusted_now}: outside {max_drift}s")]
    StaleAttestation {
        attested_at: u64,
        trusted_now: u64,
        max_drift: u64,
    },

    #[error(transparent)]
    CorruptState(#[from] StateError),
}
