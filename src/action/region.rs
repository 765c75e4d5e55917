//! Region actions: Create a region or change its TEE set
//!
//! Both carry an attestation pair over the action body and a Roughtime
//! quorum. CreateRegion is authorized by the TEEs it proposes; UpdateRegion
//! by the region's current TEEs.

use serde::{Deserialize, Serialize};

use super::{pack_stamps, unpack_stamps, Access, StateKey};
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::state::keys;
use crate::tee::{AttestationPair, RoughtimeStamp};

/// Opaque TEE identity
pub type TeeAddress = Vec<u8>;

fn pack_addresses(p: &mut Packer, addresses: &[TeeAddress]) {
    p.pack_count(addresses.len());
    for address in addresses {
        p.pack_bytes(address);
    }
}

fn unpack_addresses(u: &mut Unpacker<'_>) -> Result<Vec<TeeAddress>, DecodeError> {
    let n = u.unpack_count(4)?;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(u.unpack_bytes()?);
    }
    Ok(out)
}

fn enclave_keys(addresses: &[TeeAddress]) -> impl Iterator<Item = StateKey> + '_ {
    addresses
        .iter()
        .map(|a| StateKey::new(keys::enclave_key(a), Access::Read))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRegion {
    pub region_id: String,
    pub tees: Vec<TeeAddress>,
    pub attestations: AttestationPair,
    pub timestamps: Vec<RoughtimeStamp>,
}

impl CreateRegion {
    pub fn pack_body(&self, p: &mut Packer) {
        p.pack_str(&self.region_id);
        pack_addresses(p, &self.tees);
    }

    pub fn pack(&self, p: &mut Packer) {
        self.pack_body(p);
        self.attestations.pack(p);
        pack_stamps(p, &self.timestamps);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            region_id: u.unpack_string()?,
            tees: unpack_addresses(u)?,
            attestations: AttestationPair::unpack(u)?,
            timestamps: unpack_stamps(u)?,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        let mut out = vec![StateKey::new(keys::region_key(&self.region_id), Access::ReadWrite)];
        out.extend(enclave_keys(&self.tees));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRegion {
    pub region_id: String,
    pub add_tees: Vec<TeeAddress>,
    pub remove_tees: Vec<TeeAddress>,
    pub attestations: AttestationPair,
    pub timestamps: Vec<RoughtimeStamp>,
}

impl UpdateRegion {
    pub fn pack_body(&self, p: &mut Packer) {
        p.pack_str(&self.region_id);
        pack_addresses(p, &self.add_tees);
        pack_addresses(p, &self.remove_tees);
    }

    pub fn pack(&self, p: &mut Packer) {
        self.pack_body(p);
        self.attestations.pack(p);
        pack_stamps(p, &self.timestamps);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            region_id: u.unpack_string()?,
            add_tees: unpack_addresses(u)?,
            remove_tees: unpack_addresses(u)?,
            attestations: AttestationPair::unpack(u)?,
            timestamps: unpack_stamps(u)?,
        })
    }

    /// Apply the update to `current`: removals first, then additions
    pub fn apply_to(&self, current: &[TeeAddress]) -> Vec<TeeAddress> {
        let mut tees: Vec<TeeAddress> = current
            .iter()
            .filter(|t| !self.remove_tees.contains(t))
            .cloned()
            .collect();
        tees.extend(self.add_tees.iter().cloned());
        tees
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        let mut out = vec![StateKey::new(keys::region_key(&self.region_id), Access::ReadWrite)];
        out.extend(enclave_keys(&self.add_tees));
        out.extend(
            self.attestations
                .0
                .iter()
                .map(|a| StateKey::new(keys::enclave_key(&a.enclave_id), Access::Read)),
        );
        out
    }
}
