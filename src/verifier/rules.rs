//! Per-action validity rules. All checks are fatal to the action.

use std::collections::BTreeSet;

use super::{Env, Verifier};
use crate::action::{
    Action, ChangeObjectCode, ChangeObjectStorage, ContractVerification, CreateObject,
    CreateRegion, DeleteObject, SendEvent, SetInputObject, TeeAddress, TeeExec, UpdateRegion,
};
use crate::error::VerifyError;
use crate::state::{self, keys, ObjectRecord, RegionRecord, StateReader};
use crate::tee::{verify_pair, AttestationPair, RoughtimeStamp, TrustError};

const ED25519_KEY_LEN: usize = 32;
const ED25519_SIG_LEN: usize = 64;

fn id_ok(id: &str, max: usize) -> bool {
    !id.is_empty() && id.len() <= max
}

impl Verifier {
    pub(super) fn check(
        &self,
        action: &Action,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        match action {
            Action::CreateObject(a) => self.check_create_object(a, state),
            Action::SendEvent(a) => self.check_send_event(action, a, env, state),
            Action::SetInputObject(a) => self.check_set_input(a, env, state),
            Action::CreateRegion(a) => self.check_create_region(action, a, env, state),
            Action::UpdateRegion(a) => self.check_update_region(action, a, env, state),
            Action::DeleteObject(a) => self.check_delete_object(a, env, state),
            Action::ChangeObjectCode(a) => self.check_change_code(a, env, state),
            Action::ChangeObjectStorage(a) => self.check_change_storage(a, state),
            Action::ContractVerification(a) => self.check_contract(a, state),
            Action::TeeExec(a) => self.check_tee_exec(a, env, state),
        }
    }

    fn valid_object_id(&self, id: &str) -> Result<(), VerifyError> {
        if id_ok(id, self.config.max_id_length) {
            Ok(())
        } else {
            Err(VerifyError::InvalidId(format!(
                "{:?} must be 1..={} bytes",
                id, self.config.max_id_length
            )))
        }
    }

    fn valid_region_id(&self, id: &str) -> Result<(), VerifyError> {
        if id_ok(id, self.config.max_id_length) {
            Ok(())
        } else {
            Err(VerifyError::InvalidRegionId(format!(
                "{:?} must be 1..={} bytes",
                id, self.config.max_id_length
            )))
        }
    }

    fn code_size(&self, code: &[u8]) -> Result<(), VerifyError> {
        if code.len() > self.config.max_code_size {
            return Err(VerifyError::CodeTooLarge {
                size: code.len(),
                max: self.config.max_code_size,
            });
        }
        Ok(())
    }

    fn payload_size(&self, payload: &[u8]) -> Result<(), VerifyError> {
        if payload.len() > self.config.max_storage_size {
            return Err(VerifyError::StorageTooLarge {
                size: payload.len(),
                max: self.config.max_storage_size,
            });
        }
        Ok(())
    }

    fn privileged(&self, env: &Env<'_>, what: &'static str) -> Result<(), VerifyError> {
        if env.is_privileged() {
            Ok(())
        } else {
            Err(VerifyError::Unauthorized(what))
        }
    }

    fn existing_object(&self, id: &str, state: &dyn StateReader) -> Result<ObjectRecord, VerifyError> {
        self.valid_object_id(id)?;
        state::load_object(state, id)?.ok_or_else(|| VerifyError::ObjectNotFound(id.to_string()))
    }

    fn existing_region(&self, id: &str, state: &dyn StateReader) -> Result<RegionRecord, VerifyError> {
        self.valid_region_id(id)?;
        state::load_region(state, id)?.ok_or_else(|| VerifyError::RegionNotFound(id.to_string()))
    }

    /// Attestation pair over `action`, a fresh stamp quorum, and a pair
    /// timestamp within the drift window of the quorum's time
    fn trusted(
        &self,
        action: &Action,
        pair: &AttestationPair,
        stamps: &[RoughtimeStamp],
        tees: &[TeeAddress],
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        verify_pair(
            pair,
            tees,
            &action.attested_digest(),
            self.config.max_attestation_data,
            state,
        )?;
        let now = self.clock.trusted_now(stamps, env.block_time)?;
        self.clock.check_freshness(pair.timestamp(), now)?;
        Ok(())
    }

    fn check_create_object(&self, a: &CreateObject, state: &dyn StateReader) -> Result<(), VerifyError> {
        self.valid_object_id(&a.id)?;
        self.code_size(&a.code)?;
        self.payload_size(&a.storage)?;
        if state::object_exists(state, &a.id) {
            return Err(VerifyError::ObjectExists(a.id.clone()));
        }
        if let Some(region) = &a.region {
            self.existing_region(region, state)?;
        }
        self.codes.validate(&a.code)?;
        Ok(())
    }

    fn check_set_input(
        &self,
        a: &SetInputObject,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        self.existing_object(&a.id, state)?;
        self.privileged(env, "SetInputObject")
    }

    fn check_send_event(
        &self,
        action: &Action,
        a: &SendEvent,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        let target = self.existing_object(&a.id_to, state)?;
        if !id_ok(&a.function_call, self.config.max_function_length) {
            return Err(VerifyError::InvalidFunction(format!(
                "{:?} must be 1..={} bytes",
                a.function_call, self.config.max_function_length
            )));
        }
        self.payload_size(&a.parameters)?;
        if a.routes.len() > self.config.max_routes_per_event {
            return Err(VerifyError::TooManyRoutes {
                count: a.routes.len(),
                max: self.config.max_routes_per_event,
            });
        }
        for route in &a.routes {
            self.valid_object_id(route)?;
        }

        if let Some(region_id) = &target.region {
            let pair = a.attestations.as_ref().ok_or(TrustError::MissingAttestation)?;
            let region = self.existing_region(region_id, state)?;
            self.trusted(action, pair, &a.timestamps, &region.tees, env, state)?;
        }
        Ok(())
    }

    fn check_tee_set(&self, tees: &[TeeAddress]) -> Result<(), VerifyError> {
        if tees.is_empty() {
            return Err(VerifyError::InvalidTee("region needs at least one TEE".into()));
        }
        let mut seen = BTreeSet::new();
        for tee in tees {
            if tee.is_empty() {
                return Err(VerifyError::InvalidTee("zero-length TEE address".into()));
            }
            if !seen.insert(tee.as_slice()) {
                return Err(VerifyError::InvalidTee(format!(
                    "duplicate TEE {}",
                    hex::encode(tee)
                )));
            }
        }
        Ok(())
    }

    fn check_create_region(
        &self,
        action: &Action,
        a: &CreateRegion,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        self.valid_region_id(&a.region_id)?;
        if state.exists(&keys::region_key(&a.region_id)) {
            return Err(VerifyError::RegionExists(a.region_id.clone()));
        }
        self.check_tee_set(&a.tees)?;
        // bootstrap: the proposed TEEs authorize their own region
        self.trusted(action, &a.attestations, &a.timestamps, &a.tees, env, state)
    }

    fn check_update_region(
        &self,
        action: &Action,
        a: &UpdateRegion,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        let region = self.existing_region(&a.region_id, state)?;
        if a.add_tees.is_empty() && a.remove_tees.is_empty() {
            return Err(VerifyError::InvalidTee("update adds and removes nothing".into()));
        }

        let mut seen = BTreeSet::new();
        for tee in a.remove_tees.iter().chain(&a.add_tees) {
            if tee.is_empty() {
                return Err(VerifyError::InvalidTee("zero-length TEE address".into()));
            }
            if !seen.insert(tee.as_slice()) {
                return Err(VerifyError::InvalidTee(format!(
                    "TEE {} listed twice",
                    hex::encode(tee)
                )));
            }
        }
        for tee in &a.remove_tees {
            if !region.contains(tee) {
                return Err(VerifyError::InvalidTee(format!(
                    "cannot remove non-member {}",
                    hex::encode(tee)
                )));
            }
        }
        for tee in &a.add_tees {
            if region.contains(tee) {
                return Err(VerifyError::InvalidTee(format!(
                    "{} is already a member",
                    hex::encode(tee)
                )));
            }
        }
        if a.apply_to(&region.tees).is_empty() {
            return Err(VerifyError::InvalidTee("update would leave region empty".into()));
        }

        self.trusted(action, &a.attestations, &a.timestamps, &region.tees, env, state)
    }

    fn check_delete_object(
        &self,
        a: &DeleteObject,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        self.existing_object(&a.id, state)?;
        self.privileged(env, "DeleteObject")
    }

    fn check_change_code(
        &self,
        a: &ChangeObjectCode,
        env: &Env<'_>,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        self.existing_object(&a.id, state)?;
        self.privileged(env, "ChangeObjectCode")?;
        self.code_size(&a.code)?;
        self.codes.validate(&a.code)?;
        Ok(())
    }

    fn check_change_storage(
        &self,
        a: &ChangeObjectStorage,
        state: &dyn StateReader,
    ) -> Result<(), VerifyError> {
        self.existing_object(&a.id, state)?;
        self.payload_size(&a.storage)
    }

    fn check_contract(&self, a: &ContractVerification, state: &dyn StateReader) -> Result<(), VerifyError> {
        if a.code.is_empty() || a.code.len() > self.config.max_code_size {
            return Err(VerifyError::InvalidContract(format!(
                "code must be 1..={} bytes, got {}",
                self.config.max_code_size,
                a.code.len()
            )));
        }
        if a.public_key.len() != ED25519_KEY_LEN
            || a.signature.len() != ED25519_SIG_LEN
            || !a.signature_valid()
        {
            return Err(VerifyError::InvalidSignature);
        }
        let checksum = a.checksum();
        if checksum.as_slice() != a.expected_checksum.as_slice() {
            return Err(VerifyError::ChecksumMismatch {
                expected: hex::encode(&a.expected_checksum),
                actual: hex::encode(checksum),
            });
        }
        if state.exists(&keys::contract_key(&checksum)) {
            return Err(VerifyError::ContractExists(hex::encode(checksum)));
        }
        self.codes.validate(&a.code)?;
        Ok(())
    }

    fn check_tee_exec(&self, a: &TeeExec, env: &Env<'_>, state: &dyn StateReader) -> Result<(), VerifyError> {
        let region = self.existing_region(&a.region_id, state)?;
        if !region.contains(&a.enclave_id) {
            return Err(TrustError::UnauthorizedEnclave(hex::encode(&a.enclave_id)).into());
        }
        let object = self.existing_object(&a.object_id, state)?;
        if object.region.as_deref() != Some(a.region_id.as_str()) {
            return Err(VerifyError::InvalidRegion {
                object: a.object_id.clone(),
                region: a.region_id.clone(),
            });
        }
        for update in &a.state_updates {
            if !id_ok(&update.key, self.config.max_id_length) {
                return Err(VerifyError::InvalidStateUpdate(format!(
                    "key {:?} must be 1..={} bytes",
                    update.key, self.config.max_id_length
                )));
            }
            self.payload_size(&update.value)?;
        }

        let enclave = state::load_enclave(state, &a.enclave_id)?
            .ok_or_else(|| TrustError::UnregisteredEnclave(hex::encode(&a.enclave_id)))?;
        if !enclave
            .enclave_type
            .verify_quote(&enclave.public_key, &a.execution_report(), &a.signature)
        {
            return Err(TrustError::InvalidAttestation(format!(
                "{} execution report from {} does not verify",
                enclave.enclave_type,
                hex::encode(&a.enclave_id)
            ))
            .into());
        }
        let now = self.clock.trusted_now(&a.timestamps, env.block_time)?;
        self.clock.check_freshness(a.timestamp, now)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::StateUpdate;
    use crate::code::{wrap, CodeError, FORMAT_CUSTOM, FORMAT_RAW, TEE_TYPE_SGX};
    use crate::config::MIB;
    use crate::testkit::{
        attest_pair, create, create_region, event, update_region, wasm_code, Fixture, BLOCK_TIME,
    };
    use ed25519_dalek::{Signer, SigningKey};
    use sha2::{Digest, Sha256};

    fn trust_err(result: Result<(), VerifyError>) -> TrustError {
        match result {
            Err(VerifyError::Trust(e)) => e,
            other => panic!("expected trust error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_object_rules() {
        let fx = Fixture::new();
        let env = fx.env();
        let v = &fx.verifier;

        assert!(matches!(v.verify(&create(""), &env, &fx.state), Err(VerifyError::InvalidId(_))));
        assert!(matches!(
            v.verify(&create(&"x".repeat(257)), &env, &fx.state),
            Err(VerifyError::InvalidId(_))
        ));
        assert!(v.verify(&create(&"x".repeat(256)), &env, &fx.state).is_ok());
        assert_eq!(
            v.verify(&create("plain"), &env, &fx.state),
            Err(VerifyError::ObjectExists("plain".into()))
        );

        let big = Action::CreateObject(CreateObject {
            id: "big".into(),
            code: vec![0; MIB + 1],
            storage: Vec::new(),
            region: None,
        });
        assert!(matches!(v.verify(&big, &env, &fx.state), Err(VerifyError::CodeTooLarge { .. })));

        let big_storage = Action::CreateObject(CreateObject {
            id: "big".into(),
            code: wasm_code(),
            storage: vec![0; MIB + 1],
            region: None,
        });
        assert!(matches!(
            v.verify(&big_storage, &env, &fx.state),
            Err(VerifyError::StorageTooLarge { .. })
        ));
    }

    #[test]
    fn test_create_object_region_and_code() {
        let fx = Fixture::new();
        let env = fx.env();
        let mut a = CreateObject {
            id: "new".into(),
            code: wasm_code(),
            storage: Vec::new(),
            region: Some("nowhere".into()),
        };
        assert_eq!(
            fx.verifier.verify(&Action::CreateObject(a.clone()), &env, &fx.state),
            Err(VerifyError::RegionNotFound("nowhere".into()))
        );

        a.region = Some("r1".into());
        assert!(fx.verifier.verify(&Action::CreateObject(a.clone()), &env, &fx.state).is_ok());

        // raw code inside an SGX header
        a.code = wrap(FORMAT_RAW, 1, TEE_TYPE_SGX, b"native");
        assert!(matches!(
            fx.verifier.verify(&Action::CreateObject(a), &env, &fx.state),
            Err(VerifyError::Code(CodeError::InvalidTeeFormat { .. }))
        ));
    }

    #[test]
    fn test_set_input_requires_privilege() {
        let fx = Fixture::new();
        let set = |id: &str| Action::SetInputObject(SetInputObject { id: id.into() });
        assert!(fx.verifier.verify(&set("plain"), &fx.env(), &fx.state).is_ok());
        assert_eq!(
            fx.verifier.verify(&set("plain"), &fx.unprivileged_env(), &fx.state),
            Err(VerifyError::Unauthorized("SetInputObject"))
        );
        assert_eq!(
            fx.verifier.verify(&set("ghost"), &fx.env(), &fx.state),
            Err(VerifyError::ObjectNotFound("ghost".into()))
        );
    }

    #[test]
    fn test_send_event_to_plain_object() {
        let fx = Fixture::new();
        let env = fx.env();
        assert!(fx.verifier.verify(&event("plain", 1, &["other"]), &env, &fx.state).is_ok());
        assert_eq!(
            fx.verifier.verify(&event("ghost", 1, &[]), &env, &fx.state),
            Err(VerifyError::ObjectNotFound("ghost".into()))
        );
        assert!(matches!(
            fx.verifier.verify(&event("plain", 1, &[""]), &env, &fx.state),
            Err(VerifyError::InvalidId(_))
        ));

        let names: Vec<String> = (0..17).map(|i| format!("r{}", i)).collect();
        let crowded: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(
            fx.verifier.verify(&event("plain", 1, &crowded), &env, &fx.state),
            Err(VerifyError::TooManyRoutes { count: 17, max: 16 })
        );
        assert!(fx.verifier.verify(&event("plain", 1, &crowded[..16]), &env, &fx.state).is_ok());

        let mut no_fn = event("plain", 1, &[]);
        if let Action::SendEvent(e) = &mut no_fn {
            e.function_call.clear();
        }
        assert!(matches!(
            fx.verifier.verify(&no_fn, &env, &fx.state),
            Err(VerifyError::InvalidFunction(_))
        ));
    }

    #[test]
    fn test_send_event_to_regional_object() {
        let fx = Fixture::new();
        let env = fx.env();
        let mut action = event("regional", 1, &[]);
        assert_eq!(
            trust_err(fx.verifier.verify(&action, &env, &fx.state)),
            TrustError::MissingAttestation
        );

        fx.authorize(&mut action, &fx.tee_a, &fx.tee_b);
        assert!(fx.verifier.verify(&action, &env, &fx.state).is_ok());

        // tee-c is registered but not a member of r1
        let mut outsider = event("regional", 1, &[]);
        fx.authorize(&mut outsider, &fx.tee_a, &fx.tee_c);
        assert_eq!(
            trust_err(fx.verifier.verify(&outsider, &env, &fx.state)),
            TrustError::UnauthorizedEnclave(hex::encode(&fx.tee_c.address))
        );
    }

    #[test]
    fn test_attestation_bound_to_action() {
        let fx = Fixture::new();
        let mut action = event("regional", 1, &[]);
        fx.authorize(&mut action, &fx.tee_a, &fx.tee_b);
        // reuse the pair on a different event
        if let Action::SendEvent(e) = &mut action {
            e.parameters = b"swapped".to_vec();
        }
        assert!(matches!(
            trust_err(fx.verifier.verify(&action, &fx.env(), &fx.state)),
            TrustError::InvalidAttestation(_)
        ));
    }

    #[test]
    fn test_stale_stamps_rejected() {
        let fx = Fixture::new();
        let mut action = event("regional", 1, &[]);
        fx.authorize(&mut action, &fx.tee_a, &fx.tee_b);
        if let Action::SendEvent(e) = &mut action {
            e.timestamps = fx.stamps(BLOCK_TIME - 350);
        }
        assert!(matches!(
            trust_err(fx.verifier.verify(&action, &fx.env(), &fx.state)),
            TrustError::StaleTimestamp { .. }
        ));

        if let Action::SendEvent(e) = &mut action {
            e.timestamps = fx.stamps(BLOCK_TIME - 250);
        }
        assert!(fx.verifier.verify(&action, &fx.env(), &fx.state).is_ok());
    }

    #[test]
    fn test_old_pair_with_fresh_stamps_rejected() {
        let fx = Fixture::new();
        let mut action = event("regional", 1, &[]);
        let digest = action.attested_digest();
        if let Action::SendEvent(e) = &mut action {
            e.attestations = Some(attest_pair(&fx.tee_a, &fx.tee_b, 1, &digest));
            e.timestamps = fx.stamps(BLOCK_TIME);
        }
        assert_eq!(
            trust_err(fx.verifier.verify(&action, &fx.env(), &fx.state)),
            TrustError::StaleAttestation {
                attested_at: 1,
                trusted_now: BLOCK_TIME,
                max_drift: 300
            }
        );

        let mut region = update_region("r1", &[&fx.tee_c], &[]);
        let digest = region.attested_digest();
        if let Action::UpdateRegion(r) = &mut region {
            r.attestations = attest_pair(&fx.tee_a, &fx.tee_b, BLOCK_TIME + 301, &digest);
            r.timestamps = fx.stamps(BLOCK_TIME);
        }
        assert!(matches!(
            trust_err(fx.verifier.verify(&region, &fx.env(), &fx.state)),
            TrustError::StaleAttestation { .. }
        ));
    }

    #[test]
    fn test_create_region_bootstrap() {
        let fx = Fixture::new();
        let env = fx.env();
        let mut action = create_region("r2", &[&fx.tee_b, &fx.tee_c]);
        fx.authorize(&mut action, &fx.tee_b, &fx.tee_c);
        assert!(fx.verifier.verify(&action, &env, &fx.state).is_ok());

        let mut taken = create_region("r1", &[&fx.tee_b, &fx.tee_c]);
        fx.authorize(&mut taken, &fx.tee_b, &fx.tee_c);
        assert_eq!(
            fx.verifier.verify(&taken, &env, &fx.state),
            Err(VerifyError::RegionExists("r1".into()))
        );

        let mut dup = create_region("r3", &[&fx.tee_a, &fx.tee_a]);
        fx.authorize(&mut dup, &fx.tee_a, &fx.tee_b);
        assert!(matches!(
            fx.verifier.verify(&dup, &env, &fx.state),
            Err(VerifyError::InvalidTee(_))
        ));

        let empty = create_region("r4", &[]);
        assert!(matches!(
            fx.verifier.verify(&empty, &env, &fx.state),
            Err(VerifyError::InvalidTee(_))
        ));

        let bad_id = create_region("", &[&fx.tee_a]);
        assert!(matches!(
            fx.verifier.verify(&bad_id, &env, &fx.state),
            Err(VerifyError::InvalidRegionId(_))
        ));
    }

    #[test]
    fn test_update_region_rules() {
        let fx = Fixture::new();
        let env = fx.env();

        let mut ok = update_region("r1", &[&fx.tee_c], &[&fx.tee_a]);
        fx.authorize(&mut ok, &fx.tee_a, &fx.tee_b);
        assert!(fx.verifier.verify(&ok, &env, &fx.state).is_ok());

        // signed by a TEE that only joins with this update
        let mut future = update_region("r1", &[&fx.tee_c], &[]);
        fx.authorize(&mut future, &fx.tee_a, &fx.tee_c);
        assert!(matches!(
            fx.verifier.verify(&future, &env, &fx.state),
            Err(VerifyError::Trust(TrustError::UnauthorizedEnclave(_)))
        ));

        let cases = [
            update_region("r1", &[], &[]),
            update_region("r1", &[&fx.tee_a], &[]),
            update_region("r1", &[], &[&fx.tee_c]),
            update_region("r1", &[], &[&fx.tee_a, &fx.tee_b]),
        ];
        for mut action in cases {
            fx.authorize(&mut action, &fx.tee_a, &fx.tee_b);
            assert!(
                matches!(fx.verifier.verify(&action, &env, &fx.state), Err(VerifyError::InvalidTee(_))),
                "{:?}",
                action
            );
        }

        let missing = update_region("r9", &[&fx.tee_c], &[]);
        assert_eq!(
            fx.verifier.verify(&missing, &env, &fx.state),
            Err(VerifyError::RegionNotFound("r9".into()))
        );
    }

    #[test]
    fn test_change_code_and_storage() {
        let fx = Fixture::new();
        let code = Action::ChangeObjectCode(ChangeObjectCode {
            id: "plain".into(),
            code: wrap(FORMAT_CUSTOM, 1, TEE_TYPE_SGX, &[0, 0, 0, 0]),
        });
        // SGX does not run the custom format
        assert!(matches!(
            fx.verifier.verify(&code, &fx.env(), &fx.state),
            Err(VerifyError::Code(CodeError::InvalidTeeFormat { .. }))
        ));
        assert_eq!(
            fx.verifier.verify(&code, &fx.unprivileged_env(), &fx.state),
            Err(VerifyError::Unauthorized("ChangeObjectCode"))
        );

        let storage = Action::ChangeObjectStorage(ChangeObjectStorage {
            id: "plain".into(),
            storage: b"state".to_vec(),
        });
        assert!(fx.verifier.verify(&storage, &fx.unprivileged_env(), &fx.state).is_ok());
    }

    fn contract(code: &[u8]) -> ContractVerification {
        let key = SigningKey::from_bytes(&[42; 32]);
        ContractVerification {
            code: code.to_vec(),
            signature: key.sign(code).to_bytes().to_vec(),
            public_key: key.verifying_key().to_bytes().to_vec(),
            expected_checksum: Sha256::digest(code).to_vec(),
        }
    }

    #[test]
    fn test_contract_verification() {
        let mut fx = Fixture::new();
        let env = fx.env();
        let good = Action::ContractVerification(contract(&wasm_code()));
        assert!(fx.verifier.verify(&good, &env, &fx.state).is_ok());

        let mut wrong_sum = contract(&wasm_code());
        wrong_sum.expected_checksum = vec![0; 32];
        assert!(matches!(
            fx.verifier.verify(&Action::ContractVerification(wrong_sum), &env, &fx.state),
            Err(VerifyError::ChecksumMismatch { .. })
        ));

        let mut forged = contract(&wasm_code());
        forged.signature[0] ^= 1;
        assert_eq!(
            fx.verifier.verify(&Action::ContractVerification(forged), &env, &fx.state),
            Err(VerifyError::InvalidSignature)
        );

        assert!(matches!(
            fx.verifier.verify(&Action::ContractVerification(contract(b"")), &env, &fx.state),
            Err(VerifyError::InvalidContract(_))
        ));

        fx.verifier.execute(&good, &env, &mut fx.state).unwrap();
        assert!(matches!(
            fx.verifier.verify(&good, &env, &fx.state),
            Err(VerifyError::ContractExists(_))
        ));
    }

    fn tee_exec(fx: &Fixture, object: &str) -> TeeExec {
        let mut exec = TeeExec {
            region_id: "r1".into(),
            enclave_id: fx.tee_b.address.clone(),
            object_id: object.into(),
            timestamp: BLOCK_TIME,
            state_updates: vec![StateUpdate {
                key: "balance".into(),
                value: vec![0, 10],
            }],
            signature: Vec::new(),
            timestamps: fx.stamps(BLOCK_TIME),
        };
        exec.signature = fx.tee_b.sign_report(&exec.execution_report());
        exec
    }

    #[test]
    fn test_tee_exec() {
        let fx = Fixture::new();
        let env = fx.env();
        let ok = tee_exec(&fx, "regional");
        assert!(fx.verifier.verify(&Action::TeeExec(ok.clone()), &env, &fx.state).is_ok());

        assert!(matches!(
            fx.verifier.verify(&Action::TeeExec(tee_exec(&fx, "plain")), &env, &fx.state),
            Err(VerifyError::InvalidRegion { .. })
        ));

        let mut tampered = ok.clone();
        tampered.state_updates[0].value = vec![0xFF, 0xFF];
        assert!(matches!(
            trust_err(fx.verifier.verify(&Action::TeeExec(tampered), &env, &fx.state)),
            TrustError::InvalidAttestation(_)
        ));

        let mut outsider = ok.clone();
        outsider.enclave_id = fx.tee_c.address.clone();
        assert!(matches!(
            trust_err(fx.verifier.verify(&Action::TeeExec(outsider), &env, &fx.state)),
            TrustError::UnauthorizedEnclave(_)
        ));

        let mut late = ok;
        late.timestamps = fx.stamps(BLOCK_TIME + 301);
        assert!(matches!(
            trust_err(fx.verifier.verify(&Action::TeeExec(late), &env, &fx.state)),
            TrustError::StaleTimestamp { .. }
        ));
    }

    #[test]
    fn test_tee_exec_old_report_with_fresh_stamps() {
        let fx = Fixture::new();
        let mut old = tee_exec(&fx, "regional");
        old.timestamp = BLOCK_TIME - 301;
        old.signature = fx.tee_b.sign_report(&old.execution_report());
        assert_eq!(
            trust_err(fx.verifier.verify(&Action::TeeExec(old), &fx.env(), &fx.state)),
            TrustError::StaleAttestation {
                attested_at: BLOCK_TIME - 301,
                trusted_now: BLOCK_TIME,
                max_drift: 300
            }
        );
    }
}
