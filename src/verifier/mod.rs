//! State Transition Verifier: The host-facing entry point
//!
//! A [`Verifier`] is built once from a [`VerifierConfig`] and owns every
//! read-only registry the checks need:
//! - the code format registry and TEE capability table
//! - the trusted Roughtime servers and quorum settings
//! - the size limits
//!
//! It never owns state. `verify` and `verify_batch` read a snapshot and never
//! write; `execute` verifies and then applies the action to the host's store.

mod batch;
mod graph;
mod rules;

pub use batch::BatchSummary;

use crate::action::Action;
use crate::code::CodeValidator;
use crate::config::{ConfigError, VerifierConfig};
use crate::error::{ErrorClass, VerifyError};
use crate::executor::{self, ActionOutcome};
use crate::state::{StateReader, StateStore};
use crate::tee::TimeQuorum;

/// Decides whether a caller may run privileged actions
/// (SetInputObject, DeleteObject, ChangeObjectCode)
pub trait Authorizer {
    fn is_privileged(&self, caller: &[u8]) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(&[u8]) -> bool,
{
    fn is_privileged(&self, caller: &[u8]) -> bool {
        self(caller)
    }
}

/// Per-block verification environment supplied by the host
#[derive(Clone, Copy)]
pub struct Env<'a> {
    /// Block time in seconds since the Unix epoch
    pub block_time: u64,
    /// Identity of the submitter
    pub caller: &'a [u8],
    authorizer: &'a dyn Authorizer,
}

impl<'a> Env<'a> {
    pub fn new(block_time: u64, caller: &'a [u8], authorizer: &'a dyn Authorizer) -> Self {
        Self {
            block_time,
            caller,
            authorizer,
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.authorizer.is_privileged(self.caller)
    }
}

impl std::fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("block_time", &self.block_time)
            .field("caller", &hex::encode(self.caller))
            .finish_non_exhaustive()
    }
}

/// Pure verifier over host-supplied state snapshots
#[derive(Debug)]
pub struct Verifier {
    config: VerifierConfig,
    codes: CodeValidator,
    clock: TimeQuorum,
}

impl Verifier {
    /// Build the registries from `config`
    pub fn new(config: VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = TimeQuorum::from_config(&config.time)?;
        let codes = CodeValidator::with_defaults(config.max_code_size);
        log::info!(
            "Verifier ready: {} time servers, quorum {}, drift {}s",
            config.time.servers.len(),
            config.time.min_quorum,
            config.time.max_drift_secs
        );
        Ok(Self {
            config,
            codes,
            clock,
        })
    }

    /// Replace the code format registry (e.g. to register extra formats)
    pub fn with_code_validator(mut self, codes: CodeValidator) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn code_validator(&self) -> &CodeValidator {
        &self.codes
    }

    /// Check one action against `state`. Never writes.
    pub fn verify(
        &self,
        action: &Action,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        let result = self.check(action, env, state);
        if let Err(err) = &result {
            log_rejection(action.name(), err);
        }
        result
    }

    /// Verify `action` and apply its effects to `store`
    pub fn execute<S: StateStore>(
        &self,
        action: &Action,
        env: &Env<'_>,
        store: &mut S,
    ) -> Result<ActionOutcome, VerifyError> {
        self.verify(action, env, &*store)?;
        let outcome = executor::apply(action, store)?;
        log::debug!(
            "Executed {} ({} writes, {} removals)",
            outcome.action,
            outcome.written.len(),
            outcome.removed.len()
        );
        Ok(outcome)
    }
}

fn log_rejection(name: &str, err: &VerifyError) {
    if err.class() == ErrorClass::Trust {
        log::warn!(target: "shuttle::trust", "{} rejected: {}", name, err);
    } else {
        log::debug!("{} rejected: {}", name, err);
    }
}
