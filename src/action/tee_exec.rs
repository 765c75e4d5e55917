//! TEE execution results: State updates produced inside a region's enclave
//!
//! The enclave signs an execution report over the region, itself, the object,
//! its report time and the ordered updates, using its enclave type's quote
//! scheme. A stamp quorum pins the report time to the current block time.

use serde::{Deserialize, Serialize};

use super::{pack_stamps, unpack_stamps, Access, StateKey};
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::state::keys;
use crate::tee::RoughtimeStamp;

const EXEC_REPORT_CONTEXT: &[u8] = b"shuttle/tee-exec/v1";

/// One key/value write inside the region's state namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeeExec {
    pub region_id: String,
    /// TEE address of the executing enclave
    pub enclave_id: Vec<u8>,
    pub object_id: String,
    /// Seconds since the Unix epoch at which the enclave produced the report
    pub timestamp: u64,
    pub state_updates: Vec<StateUpdate>,
    pub signature: Vec<u8>,
    pub timestamps: Vec<RoughtimeStamp>,
}

impl TeeExec {
    pub fn pack_body(&self, p: &mut Packer) {
        p.pack_str(&self.region_id);
        p.pack_bytes(&self.enclave_id);
        p.pack_str(&self.object_id);
        p.pack_u64(self.timestamp);
        p.pack_count(self.state_updates.len());
        for update in &self.state_updates {
            p.pack_str(&update.key);
            p.pack_bytes(&update.value);
        }
    }

    pub fn pack(&self, p: &mut Packer) {
        self.pack_body(p);
        p.pack_bytes(&self.signature);
        pack_stamps(p, &self.timestamps);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let region_id = u.unpack_string()?;
        let enclave_id = u.unpack_bytes()?;
        let object_id = u.unpack_string()?;
        let timestamp = u.unpack_u64()?;
        let n = u.unpack_count(6)?;
        let mut state_updates = Vec::with_capacity(n);
        for _ in 0..n {
            state_updates.push(StateUpdate {
                key: u.unpack_string()?,
                value: u.unpack_bytes()?,
            });
        }
        Ok(Self {
            region_id,
            enclave_id,
            object_id,
            timestamp,
            state_updates,
            signature: u.unpack_bytes()?,
            timestamps: unpack_stamps(u)?,
        })
    }

    /// The report the enclave signs
    pub fn execution_report(&self) -> Vec<u8> {
        let mut p = Packer::new();
        p.pack_raw(EXEC_REPORT_CONTEXT);
        self.pack_body(&mut p);
        p.into_bytes()
    }

    /// Total bytes written by the updates
    pub fn update_bytes(&self) -> usize {
        self.state_updates.iter().map(|u| u.value.len()).sum()
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        let mut out = vec![
            StateKey::new(keys::region_key(&self.region_id), Access::Read),
            StateKey::new(keys::enclave_key(&self.enclave_id), Access::Read),
            StateKey::new(keys::object_key(&self.object_id), Access::Read),
        ];
        out.extend(self.state_updates.iter().map(|u| {
            StateKey::new(keys::region_state_key(&self.region_id, &u.key), Access::Write)
        }));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_excludes_signature_and_stamps() {
        let mut exec = TeeExec {
            region_id: "r1".into(),
            enclave_id: b"tee-a".to_vec(),
            object_id: "regional".into(),
            timestamp: 1_700_000_000,
            state_updates: vec![StateUpdate {
                key: "counter".into(),
                value: vec![1],
            }],
            signature: Vec::new(),
            timestamps: Vec::new(),
        };
        let report = exec.execution_report();
        exec.signature = vec![9; 64];
        assert_eq!(exec.execution_report(), report);

        exec.state_updates[0].value = vec![2];
        assert_ne!(exec.execution_report(), report);

        exec.state_updates[0].value = vec![1];
        exec.timestamp += 1;
        assert_ne!(exec.execution_report(), report);
    }
}
