//! Deterministic fixtures for unit tests: enclaves, time servers, code blobs
//! and a ready-made verifier environment.

use ed25519_dalek::{Signer, SigningKey};

use crate::action::{Action, CreateObject, CreateRegion, SendEvent, UpdateRegion};
use crate::code::{wrap, FORMAT_WASM, TEE_TYPE_SGX, WASM_MAGIC};
use crate::config::{TimeServer, VerifierConfig};
use crate::state::{EnclaveRecord, MemoryState, ObjectRecord, RegionRecord};
use crate::tee::{Attestation, AttestationPair, EnclaveType, RoughtimeStamp};
use crate::verifier::{Env, Verifier};

pub const BLOCK_TIME: u64 = 1_700_000_000;

/// A test enclave with a deterministic key
pub struct Enclave {
    pub address: Vec<u8>,
    pub enclave_type: EnclaveType,
    key: SigningKey,
}

impl Enclave {
    pub fn new(address: &[u8], seed: u8, enclave_type: EnclaveType) -> Self {
        Self {
            address: address.to_vec(),
            enclave_type,
            key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn record(&self) -> EnclaveRecord {
        EnclaveRecord {
            enclave_type: self.enclave_type,
            public_key: self.key.verifying_key().to_bytes(),
        }
    }

    pub fn attest(&self, timestamp: u64, data: &[u8]) -> Attestation {
        let mut att = Attestation {
            enclave_id: self.address.clone(),
            measurement: b"mrenclave-test".to_vec(),
            timestamp,
            data: data.to_vec(),
            signature: Vec::new(),
        };
        att.signature = self.sign_report(&att.report_body());
        att
    }

    pub fn sign_report(&self, report: &[u8]) -> Vec<u8> {
        self.key
            .sign(&self.enclave_type.quote_digest(report))
            .to_bytes()
            .to_vec()
    }
}

pub fn register(state: &mut MemoryState, enclave: &Enclave) {
    state.put_enclave(&enclave.address, &enclave.record());
}

pub fn attest_pair(a: &Enclave, b: &Enclave, timestamp: u64, data: &[u8]) -> AttestationPair {
    AttestationPair::new(a.attest(timestamp, data), b.attest(timestamp, data))
}

/// A test Roughtime server
pub struct TimeServerKey {
    pub server_id: String,
    key: SigningKey,
}

impl TimeServerKey {
    pub fn new(server_id: &str, seed: u8) -> Self {
        Self {
            server_id: server_id.to_string(),
            key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn config_entry(&self) -> TimeServer {
        TimeServer::new(self.server_id.clone(), &self.key.verifying_key().to_bytes())
    }

    pub fn stamp(&self, time: u64) -> RoughtimeStamp {
        let mut stamp = RoughtimeStamp {
            server_id: self.server_id.clone(),
            time,
            signature: Vec::new(),
        };
        stamp.signature = self.key.sign(&stamp.signed_message()).to_bytes().to_vec();
        stamp
    }
}

/// Default config trusting `n` deterministic time servers
pub fn time_config(n: u8) -> (VerifierConfig, Vec<TimeServerKey>) {
    let servers: Vec<_> = (0..n)
        .map(|i| TimeServerKey::new(&format!("rt-{}", i), 100 + i))
        .collect();
    let config = VerifierConfig::with_time_servers(servers.iter().map(|s| s.config_entry()).collect());
    (config, servers)
}

/// Minimal valid code: wasm for SGX
pub fn wasm_code() -> Vec<u8> {
    wrap(FORMAT_WASM, 1, TEE_TYPE_SGX, &WASM_MAGIC)
}

/// A verifier, a snapshot and signers for building region actions
pub struct Fixture {
    pub verifier: Verifier,
    pub state: MemoryState,
    pub servers: Vec<TimeServerKey>,
    pub tee_a: Enclave,
    pub tee_b: Enclave,
    pub tee_c: Enclave,
}

pub static ALLOW_ALL: fn(&[u8]) -> bool = |_| true;
pub static DENY_ALL: fn(&[u8]) -> bool = |_| false;

impl Fixture {
    /// Registered enclaves a (SGX), b (SEV), c (SGX); region "r1" governed by
    /// a and b; objects "plain" and "regional" (in r1).
    pub fn new() -> Self {
        let (config, servers) = time_config(4);
        let verifier = Verifier::new(config).unwrap();
        let tee_a = Enclave::new(b"tee-a", 1, EnclaveType::Sgx);
        let tee_b = Enclave::new(b"tee-b", 2, EnclaveType::Sev);
        let tee_c = Enclave::new(b"tee-c", 3, EnclaveType::Sgx);

        let mut state = MemoryState::new();
        register(&mut state, &tee_a);
        register(&mut state, &tee_b);
        register(&mut state, &tee_c);
        state.put_region(
            "r1",
            &RegionRecord {
                tees: vec![tee_a.address.clone(), tee_b.address.clone()],
            },
        );
        state.put_object("plain", &object(None));
        state.put_object("regional", &object(Some("r1")));

        Self {
            verifier,
            state,
            servers,
            tee_a,
            tee_b,
            tee_c,
        }
    }

    pub fn env(&self) -> Env<'static> {
        Env::new(BLOCK_TIME, b"caller", &ALLOW_ALL)
    }

    pub fn unprivileged_env(&self) -> Env<'static> {
        Env::new(BLOCK_TIME, b"stranger", &DENY_ALL)
    }

    pub fn stamps(&self, time: u64) -> Vec<RoughtimeStamp> {
        self.servers.iter().take(3).map(|s| s.stamp(time)).collect()
    }

    /// Attach a fresh pair from `a` and `b` plus a fresh stamp quorum
    pub fn authorize(&self, action: &mut Action, a: &Enclave, b: &Enclave) {
        let digest = action.attested_digest();
        let pair = attest_pair(a, b, BLOCK_TIME, &digest);
        let stamps = self.stamps(BLOCK_TIME);
        match action {
            Action::SendEvent(e) => {
                e.attestations = Some(pair);
                e.timestamps = stamps;
            }
            Action::CreateRegion(r) => {
                r.attestations = pair;
                r.timestamps = stamps;
            }
            Action::UpdateRegion(r) => {
                r.attestations = pair;
                r.timestamps = stamps;
            }
            _ => panic!("action does not carry attestations"),
        }
    }
}

pub fn object(region: Option<&str>) -> ObjectRecord {
    ObjectRecord {
        code: wasm_code(),
        storage: Vec::new(),
        region: region.map(str::to_string),
    }
}

pub fn create(id: &str) -> Action {
    Action::CreateObject(CreateObject {
        id: id.to_string(),
        code: wasm_code(),
        storage: Vec::new(),
        region: None,
    })
}

pub fn event(to: &str, priority: u64, routes: &[&str]) -> Action {
    Action::SendEvent(SendEvent {
        id_to: to.to_string(),
        function_call: "handle".to_string(),
        parameters: Vec::new(),
        priority,
        routes: routes.iter().map(|r| r.to_string()).collect(),
        attestations: None,
        timestamps: Vec::new(),
    })
}

/// Placeholder pair for region actions before `Fixture::authorize`
pub fn empty_pair() -> AttestationPair {
    let blank = Attestation {
        enclave_id: Vec::new(),
        measurement: Vec::new(),
        timestamp: 0,
        data: Vec::new(),
        signature: Vec::new(),
    };
    AttestationPair::new(blank.clone(), blank)
}

pub fn create_region(id: &str, tees: &[&Enclave]) -> Action {
    Action::CreateRegion(CreateRegion {
        region_id: id.to_string(),
        tees: tees.iter().map(|t| t.address.clone()).collect(),
        attestations: empty_pair(),
        timestamps: Vec::new(),
    })
}

pub fn update_region(id: &str, add: &[&Enclave], remove: &[&Enclave]) -> Action {
    Action::UpdateRegion(UpdateRegion {
        region_id: id.to_string(),
        add_tees: add.iter().map(|t| t.address.clone()).collect(),
        remove_tees: remove.iter().map(|t| t.address.clone()).collect(),
        attestations: empty_pair(),
        timestamps: Vec::new(),
    })
}
