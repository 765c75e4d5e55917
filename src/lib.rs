//! Shuttle: Verification core of an object/event VM
//!
//! Decides whether proposed state transitions are valid before a block
//! applies them: objects with code and storage, regions governed by TEE
//! sets, events routed between objects, and batches of all of these.

pub mod action;
pub mod code;
pub mod codec;
pub mod config;
pub mod error;
pub mod executor;
pub mod state;
pub mod tee;
pub mod verifier;

#[cfg(test)]
mod testkit;

pub use action::{decode_batch, encode_batch, Action};
pub use code::{CodeHeader, CodeValidator};
pub use config::VerifierConfig;
pub use error::{ErrorClass, VerifyError};
pub use executor::ActionOutcome;
pub use state::{MemoryState, StateReader, StateStore};
pub use verifier::{Authorizer, BatchSummary, Env, Verifier};
