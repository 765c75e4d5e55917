//! State key layout
//!
//! Single-byte prefixes; numeric components are big-endian so that keys sort
//! in numeric order in the host's key-value store.

const OBJECT_PREFIX: u8 = 0x04;
const EVENT_PREFIX: u8 = 0x05;
const INPUT_PREFIX: u8 = 0x06;
const REGION_PREFIX: u8 = 0x07;
const ENCLAVE_PREFIX: u8 = 0x08;
const CONTRACT_PREFIX: u8 = 0x09;
const REGION_STATE_PREFIX: u8 = 0x0A;

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + body.len());
    k.push(prefix);
    k.extend_from_slice(body);
    k
}

/// `[0x04] ++ id`
pub fn object_key(id: &str) -> Vec<u8> {
    prefixed(OBJECT_PREFIX, id.as_bytes())
}

/// `[0x05] ++ priority (u64 BE) ++ id`
pub fn event_key(priority: u64, id: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + 8 + id.len());
    k.push(EVENT_PREFIX);
    k.extend_from_slice(&priority.to_be_bytes());
    k.extend_from_slice(id.as_bytes());
    k
}

/// `[0x06]`
pub fn input_object_key() -> Vec<u8> {
    vec![INPUT_PREFIX]
}

/// `[0x07] ++ region id`
pub fn region_key(id: &str) -> Vec<u8> {
    prefixed(REGION_PREFIX, id.as_bytes())
}

/// `[0x08] ++ TEE address`
pub fn enclave_key(address: &[u8]) -> Vec<u8> {
    prefixed(ENCLAVE_PREFIX, address)
}

/// `[0x09] ++ SHA-256 checksum`
pub fn contract_key(checksum: &[u8]) -> Vec<u8> {
    prefixed(CONTRACT_PREFIX, checksum)
}

/// `[0x0A] ++ len(region) (u16 BE) ++ region ++ key`
pub fn region_state_key(region: &str, key: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(3 + region.len() + key.len());
    k.push(REGION_STATE_PREFIX);
    k.extend_from_slice(&(region.len() as u16).to_be_bytes());
    k.extend_from_slice(region.as_bytes());
    k.extend_from_slice(key.as_bytes());
    k
}
