//! Actions: The closed set of state transitions a block may carry
//!
//! Wire format: one `u8` type id followed by the action's fields in fixed
//! order (see [`crate::codec`]). Type ids:
//!
//! | id | action |
//! |----|--------|
//! | 0 | CreateObject |
//! | 1 | SendEvent |
//! | 2 | SetInputObject |
//! | 3 | CreateRegion |
//! | 4 | UpdateRegion |
//! | 5 | DeleteObject |
//! | 6 | ChangeObjectCode |
//! | 7 | ChangeObjectStorage |
//! | 8 | ContractVerification |
//! | 9 | TeeExec |
//!
//! A batch is a `u32` count followed by `u32`-length-prefixed actions.

mod contract;
mod object;
mod region;
mod tee_exec;

pub use contract::ContractVerification;
pub use object::{
    ChangeObjectCode, ChangeObjectStorage, CreateObject, DeleteObject, SendEvent, SetInputObject,
};
pub use region::{CreateRegion, TeeAddress, UpdateRegion};
pub use tee_exec::{StateUpdate, TeeExec};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{DecodeError, Packer, Unpacker};
use crate::tee::RoughtimeStamp;

const ATTESTED_ACTION_CONTEXT: &[u8] = b"shuttle/attested-action/v1";

/// Smallest possible encoded stamp: empty id, time, empty signature
const MIN_STAMP_SIZE: usize = 2 + 8 + 4;

/// How an action touches a state key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// A state key an action reads or writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateKey {
    pub key: Vec<u8>,
    pub access: Access,
}

impl StateKey {
    pub fn new(key: Vec<u8>, access: Access) -> Self {
        Self { key, access }
    }
}

pub(crate) fn pack_stamps(p: &mut Packer, stamps: &[RoughtimeStamp]) {
    p.pack_count(stamps.len());
    for stamp in stamps {
        stamp.pack(p);
    }
}

pub(crate) fn unpack_stamps(u: &mut Unpacker<'_>) -> Result<Vec<RoughtimeStamp>, DecodeError> {
    let n = u.unpack_count(MIN_STAMP_SIZE)?;
    let mut stamps = Vec::with_capacity(n);
    for _ in 0..n {
        stamps.push(RoughtimeStamp::unpack(u)?);
    }
    Ok(stamps)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    CreateObject(CreateObject),
    SendEvent(SendEvent),
    SetInputObject(SetInputObject),
    CreateRegion(CreateRegion),
    UpdateRegion(UpdateRegion),
    DeleteObject(DeleteObject),
    ChangeObjectCode(ChangeObjectCode),
    ChangeObjectStorage(ChangeObjectStorage),
    ContractVerification(ContractVerification),
    TeeExec(TeeExec),
}

impl Action {
    pub fn type_id(&self) -> u8 {
        match self {
            Action::CreateObject(_) => 0,
            Action::SendEvent(_) => 1,
            Action::SetInputObject(_) => 2,
            Action::CreateRegion(_) => 3,
            Action::UpdateRegion(_) => 4,
            Action::DeleteObject(_) => 5,
            Action::ChangeObjectCode(_) => 6,
            Action::ChangeObjectStorage(_) => 7,
            Action::ContractVerification(_) => 8,
            Action::TeeExec(_) => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateObject(_) => "CreateObject",
            Action::SendEvent(_) => "SendEvent",
            Action::SetInputObject(_) => "SetInputObject",
            Action::CreateRegion(_) => "CreateRegion",
            Action::UpdateRegion(_) => "UpdateRegion",
            Action::DeleteObject(_) => "DeleteObject",
            Action::ChangeObjectCode(_) => "ChangeObjectCode",
            Action::ChangeObjectStorage(_) => "ChangeObjectStorage",
            Action::ContractVerification(_) => "ContractVerification",
            Action::TeeExec(_) => "TeeExec",
        }
    }

    /// Write the type id and fields
    pub fn pack(&self, p: &mut Packer) {
        p.pack_u8(self.type_id());
        match self {
            Action::CreateObject(a) => a.pack(p),
            Action::SendEvent(a) => a.pack(p),
            Action::SetInputObject(a) => a.pack(p),
            Action::CreateRegion(a) => a.pack(p),
            Action::UpdateRegion(a) => a.pack(p),
            Action::DeleteObject(a) => a.pack(p),
            Action::ChangeObjectCode(a) => a.pack(p),
            Action::ChangeObjectStorage(a) => a.pack(p),
            Action::ContractVerification(a) => a.pack(p),
            Action::TeeExec(a) => a.pack(p),
        }
    }

    pub fn unpack(u: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        let action = match u.unpack_u8()? {
            0 => Action::CreateObject(CreateObject::unpack(u)?),
            1 => Action::SendEvent(SendEvent::unpack(u)?),
            2 => Action::SetInputObject(SetInputObject::unpack(u)?),
            3 => Action::CreateRegion(CreateRegion::unpack(u)?),
            4 => Action::UpdateRegion(UpdateRegion::unpack(u)?),
            5 => Action::DeleteObject(DeleteObject::unpack(u)?),
            6 => Action::ChangeObjectCode(ChangeObjectCode::unpack(u)?),
            7 => Action::ChangeObjectStorage(ChangeObjectStorage::unpack(u)?),
            8 => Action::ContractVerification(ContractVerification::unpack(u)?),
            9 => Action::TeeExec(TeeExec::unpack(u)?),
            other => return Err(DecodeError::UnknownAction(other)),
        };
        Ok(action)
    }

    /// Fails with `TooLong` when a string field exceeds its length prefix
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let mut p = Packer::new();
        self.pack(&mut p);
        p.finish()
    }

    /// Strict decode: the whole buffer must be exactly one action
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(data);
        let action = Self::unpack(&mut u)?;
        u.finish()?;
        Ok(action)
    }

    /// Digest an attestation pair must carry to authorize this action.
    ///
    /// Covers the type id and every field except the attestations, stamps and
    /// enclave signature themselves. Overlong strings are left out of the
    /// digest; the verifier rejects them as invalid ids before comparing.
    pub fn attested_digest(&self) -> Vec<u8> {
        let mut p = Packer::new();
        p.pack_raw(ATTESTED_ACTION_CONTEXT);
        p.pack_u8(self.type_id());
        match self {
            Action::SendEvent(a) => a.pack_body(&mut p),
            Action::CreateRegion(a) => a.pack_body(&mut p),
            Action::UpdateRegion(a) => a.pack_body(&mut p),
            Action::TeeExec(a) => a.pack_body(&mut p),
            other => {
                let mut body = Packer::new();
                other.pack(&mut body);
                p.pack_raw(&body.as_bytes()[1..]);
            }
        }
        Sha256::digest(p.as_bytes()).to_vec()
    }

    /// Keys this action may read or write, for host-side scheduling
    pub fn state_keys(&self) -> Vec<StateKey> {
        match self {
            Action::CreateObject(a) => a.state_keys(),
            Action::SendEvent(a) => a.state_keys(),
            Action::SetInputObject(a) => a.state_keys(),
            Action::CreateRegion(a) => a.state_keys(),
            Action::UpdateRegion(a) => a.state_keys(),
            Action::DeleteObject(a) => a.state_keys(),
            Action::ChangeObjectCode(a) => a.state_keys(),
            Action::ChangeObjectStorage(a) => a.state_keys(),
            Action::ContractVerification(a) => a.state_keys(),
            Action::TeeExec(a) => a.state_keys(),
        }
    }
}

pub fn encode_batch(actions: &[Action]) -> Result<Vec<u8>, DecodeError> {
    let mut p = Packer::new();
    p.pack_count(actions.len());
    for action in actions {
        p.pack_bytes(&action.encode()?);
    }
    p.finish()
}

/// Decode a batch; every inner action must decode exactly
pub fn decode_batch(data: &[u8]) -> Result<Vec<Action>, DecodeError> {
    let mut u = Unpacker::new(data);
    let n = u.unpack_count(5)?;
    let mut actions = Vec::with_capacity(n);
    for _ in 0..n {
        let raw = u.unpack_bytes()?;
        actions.push(Action::decode(&raw)?);
    }
    u.finish()?;
    Ok(actions)
}
