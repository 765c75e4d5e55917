//! Attestation pairs: Two enclaves jointly authorizing a region action
//!
//! A pair is accepted when:
//! 1. both attestations carry the same timestamp and the same data
//! 2. they come from two different enclaves
//! 3. the data is the digest of the action being authorized
//! 4. both enclaves belong to the authorized TEE set
//! 5. both enclaves are registered and their quotes verify under the
//!    registered key with their enclave type's scheme

use serde::{Deserialize, Serialize};

use super::TrustError;
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::state::{self, StateReader};

/// A TEE's signed claim over some data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// TEE address of the producing enclave
    pub enclave_id: Vec<u8>,
    /// Enclave code measurement
    pub measurement: Vec<u8>,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Attested data
    pub data: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Attestation {
    /// Canonical report body covered by the signature
    pub fn report_body(&self) -> Vec<u8> {
        let mut p = Packer::with_capacity(self.enclave_id.len() + self.measurement.len() + self.data.len() + 20);
        p.pack_bytes(&self.enclave_id);
        p.pack_bytes(&self.measurement);
        p.pack_u64(self.timestamp);
        p.pack_bytes(&self.data);
        p.into_bytes()
    }

    pub fn pack(&self, p: &mut Packer) {
        p.pack_bytes(&self.enclave_id);
        p.pack_bytes(&self.measurement);
        p.pack_u64(self.timestamp);
        p.pack_bytes(&self.data);
        p.pack_bytes(&self.signature);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            enclave_id: u.unpack_bytes()?,
            measurement: u.unpack_bytes()?,
            timestamp: u.unpack_u64()?,
            data: u.unpack_bytes()?,
            signature: u.unpack_bytes()?,
        })
    }
}

/// Exactly two attestations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationPair(pub [Attestation; 2]);

impl AttestationPair {
    pub fn new(first: Attestation, second: Attestation) -> Self {
        Self([first, second])
    }

    pub fn timestamp(&self) -> u64 {
        self.0[0].timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.0[0].data
    }

    pub fn pack(&self, p: &mut Packer) {
        self.0[0].pack(p);
        self.0[1].pack(p);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let first = Attestation::unpack(u)?;
        let second = Attestation::unpack(u)?;
        Ok(Self([first, second]))
    }
}

/// Verify `pair` against the authorized TEE set.
///
/// `expected_data` is the digest of the action the pair authorizes; `state`
/// supplies each enclave's registered quote key.
pub fn verify_pair(
    pair: &AttestationPair,
    authorized_tees: &[Vec<u8>],
    expected_data: &[u8],
    max_data: usize,
    state: &dyn StateReader,
) -> Result<(), TrustError> {
    let [a, b] = &pair.0;

    if a.timestamp != b.timestamp {
        return Err(TrustError::AttestationMismatch("timestamp"));
    }
    if a.data != b.data {
        return Err(TrustError::AttestationMismatch("data"));
    }
    if a.enclave_id == b.enclave_id {
        return Err(TrustError::InvalidAttestation(
            "pair must come from two distinct enclaves".into(),
        ));
    }
    if a.data.len() > max_data {
        return Err(TrustError::InvalidAttestation(format!(
            "attested data {}B exceeds {}B",
            a.data.len(),
            max_data
        )));
    }
    if a.data != expected_data {
        return Err(TrustError::InvalidAttestation(
            "attested data does not bind this action".into(),
        ));
    }

    for att in &pair.0 {
        verify_single(att, authorized_tees, state)?;
    }
    Ok(())
}

fn verify_single(
    att: &Attestation,
    authorized_tees: &[Vec<u8>],
    state: &dyn StateReader,
) -> Result<(), TrustError> {
    if !authorized_tees.iter().any(|t| *t == att.enclave_id) {
        return Err(TrustError::UnauthorizedEnclave(hex::encode(&att.enclave_id)));
    }
    let record = state::load_enclave(state, &att.enclave_id)?
        .ok_or_else(|| TrustError::UnregisteredEnclave(hex::encode(&att.enclave_id)))?;

    if !record
        .enclave_type
        .verify_quote(&record.public_key, &att.report_body(), &att.signature)
    {
        return Err(TrustError::InvalidAttestation(format!(
            "{} quote signature from {} does not verify",
            record.enclave_type,
            hex::encode(&att.enclave_id)
        )));
    }
    Ok(())
}
