//! Stored records: Binary encodings of objects, regions, enclaves and events

use crate::codec::{DecodeError, Packer, Unpacker};
use crate::tee::EnclaveType;
use serde::Serialize;

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRecord {
    pub code: Vec<u8>,
    pub storage: Vec<u8>,
    /// Region governing this object, if any
    pub region: Option<String>,
}

impl ObjectRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut p = Packer::with_capacity(self.code.len() + self.storage.len() + 16);
        p.pack_bytes(&self.code);
        p.pack_bytes(&self.storage);
        match &self.region {
            Some(region) => {
                p.pack_bool(true);
                p.pack_str(region);
            }
            None => p.pack_bool(false),
        }
        p.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(data);
        let code = u.unpack_bytes()?;
        let storage = u.unpack_bytes()?;
        let region = if u.unpack_bool()? {
            Some(u.unpack_string()?)
        } else {
            None
        };
        u.finish()?;
        Ok(Self {
            code,
            storage,
            region,
        })
    }
}

/// A stored region: its ordered authorized TEE set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRecord {
    pub tees: Vec<Vec<u8>>,
}

impl RegionRecord {
    pub fn contains(&self, address: &[u8]) -> bool {
        self.tees.iter().any(|t| t == address)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut p = Packer::new();
        p.pack_count(self.tees.len());
        for tee in &self.tees {
            p.pack_bytes(tee);
        }
        p.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(data);
        let n = u.unpack_count(4)?;
        let mut tees = Vec::with_capacity(n);
        for _ in 0..n {
            tees.push(u.unpack_bytes()?);
        }
        u.finish()?;
        Ok(Self { tees })
    }
}

/// A registered enclave: its quote scheme and signing key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnclaveRecord {
    pub enclave_type: EnclaveType,
    pub public_key: [u8; 32],
}

impl EnclaveRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut p = Packer::with_capacity(33);
        p.pack_u8(self.enclave_type.id());
        p.pack_raw(&self.public_key);
        p.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(data);
        let enclave_type = EnclaveType::from_id(u.unpack_u8()?)
            .ok_or(DecodeError::InvalidField("enclave type"))?;
        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(u.unpack_raw(32)?);
        u.finish()?;
        Ok(Self {
            enclave_type,
            public_key,
        })
    }
}

/// A queued event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub function_call: String,
    pub parameters: Vec<u8>,
}

impl EventRecord {
    pub fn encode(&self) -> Vec<u8> {
        let mut p = Packer::with_capacity(self.parameters.len() + self.function_call.len() + 6);
        p.pack_str(&self.function_call);
        p.pack_bytes(&self.parameters);
        p.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut u = Unpacker::new(data);
        let function_call = u.unpack_string()?;
        let parameters = u.unpack_bytes()?;
        u.finish()?;
        Ok(Self {
            function_call,
            parameters,
        })
    }
}
