//! Enclave types and their quote signature schemes
//!
//! Each enclave kind signs its report with a different construction:
//! - **SGX**: ed25519 over `SHA-256("shuttle/sgx-quote/v1" || report)`
//! - **SEV**: strict ed25519 over `SHA-512("shuttle/sev-report/v1" || report)`
//!
//! Dispatch is a match over [`EnclaveType`], selected by the registered
//! enclave record, never by anything the attestation claims about itself.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::code::{TEE_TYPE_SEV, TEE_TYPE_SGX};

const SGX_QUOTE_DOMAIN: &[u8] = b"shuttle/sgx-quote/v1";
const SEV_REPORT_DOMAIN: &[u8] = b"shuttle/sev-report/v1";

/// Supported enclave kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnclaveType {
    /// Intel SGX
    Sgx,
    /// AMD SEV
    Sev,
}

impl EnclaveType {
    /// Wire/header id, shared with the code header's TEE type byte
    pub fn id(&self) -> u8 {
        match self {
            EnclaveType::Sgx => TEE_TYPE_SGX,
            EnclaveType::Sev => TEE_TYPE_SEV,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            TEE_TYPE_SGX => Some(EnclaveType::Sgx),
            TEE_TYPE_SEV => Some(EnclaveType::Sev),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EnclaveType::Sgx => "Intel SGX",
            EnclaveType::Sev => "AMD SEV",
        }
    }

    /// The message an enclave of this type signs for `report`
    pub fn quote_digest(&self, report: &[u8]) -> Vec<u8> {
        match self {
            EnclaveType::Sgx => {
                let mut h = Sha256::new();
                h.update(SGX_QUOTE_DOMAIN);
                h.update(report);
                h.finalize().to_vec()
            }
            EnclaveType::Sev => {
                let mut h = Sha512::new();
                h.update(SEV_REPORT_DOMAIN);
                h.update(report);
                h.finalize().to_vec()
            }
        }
    }

    /// Verify `signature` over `report` under `public_key`
    pub fn verify_quote(&self, public_key: &[u8; 32], report: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        let digest = self.quote_digest(report);
        match self {
            EnclaveType::Sgx => key.verify(&digest, &sig).is_ok(),
            EnclaveType::Sev => key.verify_strict(&digest, &sig).is_ok(),
        }
    }
}

impl std::fmt::Display for EnclaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn test_schemes_are_not_interchangeable() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let public = key.verifying_key().to_bytes();
        let report = b"report-body";

        let sgx_sig = key.sign(&EnclaveType::Sgx.quote_digest(report)).to_bytes();
        assert!(EnclaveType::Sgx.verify_quote(&public, report, &sgx_sig));
        assert!(!EnclaveType::Sev.verify_quote(&public, report, &sgx_sig));

        let sev_sig = key.sign(&EnclaveType::Sev.quote_digest(report)).to_bytes();
        assert!(EnclaveType::Sev.verify_quote(&public, report, &sev_sig));
        assert!(!EnclaveType::Sgx.verify_quote(&public, report, &sev_sig));
    }

    #[test]
    fn test_wrong_key_or_length_rejected() {
        let key = SigningKey::from_bytes(&[3u8; 32]);
        let other = SigningKey::from_bytes(&[4u8; 32]).verifying_key().to_bytes();
        let sig = key.sign(&EnclaveType::Sgx.quote_digest(b"r")).to_bytes();
        assert!(!EnclaveType::Sgx.verify_quote(&other, b"r", &sig));
        assert!(!EnclaveType::Sgx.verify_quote(&other, b"r", &sig[..63]));
    }

    #[test]
    fn test_ids_match_code_header() {
        assert_eq!(EnclaveType::from_id(1), Some(EnclaveType::Sgx));
        assert_eq!(EnclaveType::from_id(2), Some(EnclaveType::Sev));
        assert_eq!(EnclaveType::from_id(0), None);
        assert_eq!(EnclaveType::Sev.id(), 2);
    }
}
