//! Object actions: Create, delete, change code/storage, route events

use serde::{Deserialize, Serialize};

use super::{Access, StateKey};
use crate::codec::{DecodeError, Packer, Unpacker};
use crate::state::keys;
use crate::tee::{AttestationPair, RoughtimeStamp};

/// Create a new object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateObject {
    pub id: String,
    /// Header-wrapped code blob
    pub code: Vec<u8>,
    pub storage: Vec<u8>,
    /// Region that will govern the object
    pub region: Option<String>,
}

impl CreateObject {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.id);
        p.pack_bytes(&self.code);
        p.pack_bytes(&self.storage);
        match &self.region {
            Some(region) => {
                p.pack_bool(true);
                p.pack_str(region);
            }
            None => p.pack_bool(false),
        }
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let id = u.unpack_string()?;
        let code = u.unpack_bytes()?;
        let storage = u.unpack_bytes()?;
        let region = if u.unpack_bool()? {
            Some(u.unpack_string()?)
        } else {
            None
        };
        Ok(Self {
            id,
            code,
            storage,
            region,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        let mut out = vec![StateKey::new(keys::object_key(&self.id), Access::ReadWrite)];
        if let Some(region) = &self.region {
            out.push(StateKey::new(keys::region_key(region), Access::Read));
        }
        out
    }
}

/// Queue an event on a target object.
///
/// `routes` declares the objects the target's handler will emit events to
/// when this event runs; the batch verifier uses them for cycle detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEvent {
    pub id_to: String,
    pub function_call: String,
    pub parameters: Vec<u8>,
    /// Ordering token within the target's queue
    pub priority: u64,
    pub routes: Vec<String>,
    /// Required when the target belongs to a region
    pub attestations: Option<AttestationPair>,
    pub timestamps: Vec<RoughtimeStamp>,
}

impl SendEvent {
    /// Fields covered by the attestation pair
    pub fn pack_body(&self, p: &mut Packer) {
        p.pack_str(&self.id_to);
        p.pack_str(&self.function_call);
        p.pack_bytes(&self.parameters);
        p.pack_u64(self.priority);
        p.pack_count(self.routes.len());
        for route in &self.routes {
            p.pack_str(route);
        }
    }

    pub fn pack(&self, p: &mut Packer) {
        self.pack_body(p);
        match &self.attestations {
            Some(pair) => {
                p.pack_bool(true);
                pair.pack(p);
            }
            None => p.pack_bool(false),
        }
        super::pack_stamps(p, &self.timestamps);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let id_to = u.unpack_string()?;
        let function_call = u.unpack_string()?;
        let parameters = u.unpack_bytes()?;
        let priority = u.unpack_u64()?;
        let n = u.unpack_count(2)?;
        let mut routes = Vec::with_capacity(n);
        for _ in 0..n {
            routes.push(u.unpack_string()?);
        }
        let attestations = if u.unpack_bool()? {
            Some(AttestationPair::unpack(u)?)
        } else {
            None
        };
        let timestamps = super::unpack_stamps(u)?;
        Ok(Self {
            id_to,
            function_call,
            parameters,
            priority,
            routes,
            attestations,
            timestamps,
        })
    }

    /// Declares the attesting enclaves' records. The governing region's record
    /// is also read, but its id lives in the target's stored object record and
    /// cannot be named from the action alone; hosts resolve it from the object
    /// key before scheduling.
    pub fn state_keys(&self) -> Vec<StateKey> {
        let mut out = vec![
            StateKey::new(keys::object_key(&self.id_to), Access::Read),
            StateKey::new(keys::event_key(self.priority, &self.id_to), Access::Write),
        ];
        if let Some(pair) = &self.attestations {
            out.extend(
                pair.0
                    .iter()
                    .map(|a| StateKey::new(keys::enclave_key(&a.enclave_id), Access::Read)),
            );
        }
        out
    }
}

/// Designate the object that receives external input (privileged)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetInputObject {
    pub id: String,
}

impl SetInputObject {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.id);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: u.unpack_string()?,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        vec![
            StateKey::new(keys::object_key(&self.id), Access::Read),
            StateKey::new(keys::input_object_key(), Access::Write),
        ]
    }
}

/// Delete an object (privileged)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteObject {
    pub id: String,
}

impl DeleteObject {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.id);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: u.unpack_string()?,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        vec![StateKey::new(keys::object_key(&self.id), Access::ReadWrite)]
    }
}

/// Replace an object's code (privileged)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeObjectCode {
    pub id: String,
    pub code: Vec<u8>,
}

impl ChangeObjectCode {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.id);
        p.pack_bytes(&self.code);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: u.unpack_string()?,
            code: u.unpack_bytes()?,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        vec![StateKey::new(keys::object_key(&self.id), Access::ReadWrite)]
    }
}

/// Replace an object's storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeObjectStorage {
    pub id: String,
    pub storage: Vec<u8>,
}

impl ChangeObjectStorage {
    pub fn pack(&self, p: &mut Packer) {
        p.pack_str(&self.id);
        p.pack_bytes(&self.storage);
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: u.unpack_string()?,
            storage: u.unpack_bytes()?,
        })
    }

    pub fn state_keys(&self) -> Vec<StateKey> {
        vec![StateKey::new(keys::object_key(&self.id), Access::ReadWrite)]
    }
}
