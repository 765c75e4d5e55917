//! Contract verification: Register signed code under its SHA-256 checksum

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Access, StateKey};
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::state::keys;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractVerification {
    pub code: Vec<u8>,
    /// ed25519 signature over `code`
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    /// SHA-256 of `code`
    pub expected_checksum: Vec<u8>,
}

impl ContractVerification {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_bytes(&self.code);
        p.pack_bytes(&self.signature);
        p.pack_bytes(&self.public_key);
        p.pack_bytes(&self.expected_checksum);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            code: u.unpack_bytes()?,
            signature: u.unpack_bytes()?,
            public_key: u.unpack_bytes()?,
            expected_checksum: u.unpack_bytes()?,
        })
    }

    pub fn checksum(&self) -> [u8; 32] {
        Sha256::digest(&self.code).into()
    }

    /// Key and signature must be well-formed and the signature must cover the code
    pub fn signature_valid(&self) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(self.public_key.as_slice()) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(&self.signature) else {
            return false;
        };
        key.verify(&self.code, &sig).is_ok()
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        vec![StateKey::new(
            keys::contract_key(&self.expected_checksum),
            Access::ReadWrite,
        )]
    }
}
