//! Effect application for verified actions
//!
//! [`apply`] assumes the action has already passed verification against the
//! same store; it only turns the action into key/value writes. The batch
//! verifier uses it to stage earlier actions on an overlay, and
//! `Verifier::execute` uses it on the host's store.

use serde::Serialize;

use crate::action::Action;
use crate::error::VerifyError;
use crate::state::{self, keys, EventRecord, ObjectRecord, RegionRecord, StateStore};

/// What an applied action changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub action: String,
    /// Hex-encoded keys written
    pub written: Vec<String>,
    /// Hex-encoded keys removed
    pub removed: Vec<String>,
}

struct Writer<'s, S: StateStore> {
    store: &'s mut S,
    outcome: ActionOutcome,
}

impl<S: StateStore> Writer<'_, S> {
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.outcome.written.push(hex::encode(&key));
        self.store.insert(key, value);
    }

    fn delete(&mut self, key: Vec<u8>) {
        self.outcome.removed.push(hex::encode(&key));
        self.store.remove(&key);
    }
}

fn existing_object<S: StateStore>(store: &S, id: &str) -> Result<ObjectRecord, VerifyError> {
    state::load_object(store, id)?.ok_or_else(|| VerifyError::ObjectNotFound(id.to_string()))
}

fn existing_region<S: StateStore>(store: &S, id: &str) -> Result<RegionRecord, VerifyError> {
    state::load_region(store, id)?.ok_or_else(|| VerifyError::RegionNotFound(id.to_string()))
}

/// Write the effects of `action` into `store`
pub fn apply<S: StateStore>(action: &Action, store: &mut S) -> Result<ActionOutcome, VerifyError> {
    let mut w = Writer {
        store,
        outcome: ActionOutcome {
            action: action.name().to_string(),
            ..ActionOutcome::default()
        },
    };

    match action {
        Action::CreateObject(a) => {
            let record = ObjectRecord {
                code: a.code.clone(),
                storage: a.storage.clone(),
                region: a.region.clone(),
            };
            w.put(keys::object_key(&a.id), record.encode());
        }
        Action::SendEvent(a) => {
            let record = EventRecord {
                function_call: a.function_call.clone(),
                parameters: a.parameters.clone(),
            };
            w.put(keys::event_key(a.priority, &a.id_to), record.encode());
        }
        Action::SetInputObject(a) => {
            w.put(keys::input_object_key(), a.id.as_bytes().to_vec());
        }
        Action::CreateRegion(a) => {
            let record = RegionRecord {
                tees: a.tees.clone(),
            };
            w.put(keys::region_key(&a.region_id), record.encode());
        }
        Action::UpdateRegion(a) => {
            let current = existing_region(&*w.store, &a.region_id)?;
            let record = RegionRecord {
                tees: a.apply_to(&current.tees),
            };
            w.put(keys::region_key(&a.region_id), record.encode());
        }
        Action::DeleteObject(a) => {
            w.delete(keys::object_key(&a.id));
        }
        Action::ChangeObjectCode(a) => {
            let mut record = existing_object(&*w.store, &a.id)?;
            record.code = a.code.clone();
            w.put(keys::object_key(&a.id), record.encode());
        }
        Action::ChangeObjectStorage(a) => {
            let mut record = existing_object(&*w.store, &a.id)?;
            record.storage = a.storage.clone();
            w.put(keys::object_key(&a.id), record.encode());
        }
        Action::ContractVerification(a) => {
            w.put(keys::contract_key(&a.checksum()), a.code.clone());
        }
        Action::TeeExec(a) => {
            for update in &a.state_updates {
                w.put(
                    keys::region_state_key(&a.region_id, &update.key),
                    update.value.clone(),
                );
            }
        }
    }

    Ok(w.outcome)
}
