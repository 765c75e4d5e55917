//! Roughtime quorum: A trusted "now" from independent time servers
//!
//! Each stamp must come from a distinct configured server and carry a valid
//! ed25519 signature. With at least `min_quorum` verified stamps, the lower
//! median of their times is the trusted time, which must sit within
//! `max_drift_secs` of the block time in either direction.

use std::collections::{BTreeMap, BTreeSet};

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::TrustError;
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::config::{ConfigError, TimeConfig};

const ROUGHTIME_CONTEXT: &[u8] = b"RoughTime v1 response signature\x00";

/// An externally-issued time assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoughtimeStamp {
    pub server_id: String,
    /// Seconds since the Unix epoch
    pub time: u64,
    pub signature: Vec<u8>,
}

impl RoughtimeStamp {
    /// The bytes a server signs for this stamp
    pub fn signed_message(&self) -> Vec<u8> {
        let mut p = Packer::with_capacity(ROUGHTIME_CONTEXT.len() + self.server_id.len() + 10);
        p.pack_raw(ROUGHTIME_CONTEXT);
        p.pack_str(&self.server_id);
        p.pack_u64(self.time);
        p.into_bytes()
    }

    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.server_id);
        p.pack_u64(self.time);
        p.pack_bytes(&self.signature);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            server_id: u.unpack_string()?,
            time: u.unpack_u64()?,
            signature: u.unpack_bytes()?,
        })
    }
}

/// Lower median: sort ascending and take index `(len - 1) / 2`.
/// `[100, 104, 108]` → 104, `[100, 104, 108, 112]` → 104.
pub fn lower_median(times: &mut [u64]) -> Option<u64> {
    if times.is_empty() {
        return None;
    }
    times.sort_unstable();
    Some(times[(times.len() - 1) / 2])
}

/// Trusted time servers plus quorum and drift settings
#[derive(Debug, Clone)]
pub struct TimeQuorum {
    min_quorum: usize,
    max_drift_secs: u64,
    servers: BTreeMap<String, VerifyingKey>,
}

impl TimeQuorum {
    pub fn from_config(config: &TimeConfig) -> Result<Self, ConfigError> {
        let mut servers = BTreeMap::new();
        for server in &config.servers {
            let bytes = server.key_bytes()?;
            let key = VerifyingKey::from_bytes(&bytes).map_err(|_| ConfigError::InvalidServerKey {
                server_id: server.server_id.clone(),
            })?;
            if servers.insert(server.server_id.clone(), key).is_some() {
                return Err(ConfigError::DuplicateServer(server.server_id.clone()));
            }
        }
        Ok(Self {
            min_quorum: config.min_quorum,
            max_drift_secs: config.max_drift_secs,
            servers,
        })
    }

    pub fn max_drift_secs(&self) -> u64 {
        self.max_drift_secs
    }

    /// Verify every stamp and return the lower median time
    pub fn verify_timestamps(&self, stamps: &[RoughtimeStamp]) -> Result<u64, TrustError> {
        if stamps.len() < self.min_quorum {
            return Err(TrustError::InvalidTimestamp(format!(
                "{} stamps, quorum requires {}",
                stamps.len(),
                self.min_quorum
            )));
        }

        let mut seen = BTreeSet::new();
        let mut times = Vec::with_capacity(stamps.len());
        for stamp in stamps {
            if !seen.insert(stamp.server_id.as_str()) {
                return Err(TrustError::InvalidTimestamp(format!(
                    "duplicate stamp from server {}",
                    stamp.server_id
                )));
            }
            self.verify_stamp(stamp)?;
            times.push(stamp.time);
        }

        lower_median(&mut times)
            .ok_or_else(|| TrustError::InvalidTimestamp("no stamps".into()))
    }

    fn verify_stamp(&self, stamp: &RoughtimeStamp) -> Result<(), TrustError> {
        let key = self.servers.get(&stamp.server_id).ok_or_else(|| {
            TrustError::InvalidTimestamp(format!("unknown time server {}", stamp.server_id))
        })?;
        let sig = Signature::from_slice(&stamp.signature).map_err(|_| {
            TrustError::InvalidTimestamp(format!("malformed signature from {}", stamp.server_id))
        })?;
        key.verify(&stamp.signed_message(), &sig).map_err(|_| {
            TrustError::InvalidTimestamp(format!("bad signature from {}", stamp.server_id))
        })
    }

    /// `|median - block_time| <= max_drift_secs`
    pub fn check_staleness(&self, median: u64, block_time: u64) -> Result<(), TrustError> {
        if median.abs_diff(block_time) > self.max_drift_secs {
            return Err(TrustError::StaleTimestamp {
                median,
                block_time,
                max_drift: self.max_drift_secs,
            });
        }
        Ok(())
    }

    /// `|attested_at - trusted_now| <= max_drift_secs`, so an old quote
    /// cannot ride on freshly collected stamps
    pub fn check_freshness(&self, attested_at: u64, trusted_now: u64) -> Result<(), TrustError> {
        if attested_at.abs_diff(trusted_now) > self.max_drift_secs {
            return Err(TrustError::StaleAttestation {
                attested_at,
                trusted_now,
                max_drift: self.max_drift_secs,
            });
        }
        Ok(())
    }

    /// Quorum verification followed by the staleness window
    pub fn trusted_now(&self, stamps: &[RoughtimeStamp], block_time: u64) -> Result<u64, TrustError> {
        let median = self.verify_timestamps(stamps)?;
        self.check_staleness(median, block_time)?;
        Ok(median)
    }
}
