//! MNID: versioned, checksummed, chain-scoped address encoding.
//!
//! Layout of the decoded bytes:
//!
//! ```text
//! | version (1) | chain id (n) | address (20) | checksum (4) |
//! ```
//!
//! The checksum is the first four bytes of Keccak-256 over everything before
//! it, and the whole buffer is rendered as base58. The chain id length is not
//! fixed; it is recovered from the total length on decode.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, Address};
use thiserror::Error;

/// The only MNID version in use.
pub const MNID_VERSION: u8 = 1;

const ADDRESS_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;
/// Address plus checksum; anything longer carries a version byte.
const TAIL_LEN: usize = ADDRESS_LEN + CHECKSUM_LEN;

/// Errors returned when decoding an MNID string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnidError {
    #[error("MNID is not valid base58: {0}")]
    Base58(String),

    #[error("MNID payload too short: {0} bytes")]
    TooShort(usize),

    #[error("MNID checksum mismatch")]
    Checksum,
}

/// A decoded MNID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mnid {
    /// Chain id bytes exactly as they were encoded.
    pub chain_id: Vec<u8>,
    /// The 20-byte account address.
    pub address: Address,
}

impl Mnid {
    pub fn new(chain_id: impl Into<Vec<u8>>, address: Address) -> Self {
        Self {
            chain_id: chain_id.into(),
            address,
        }
    }

    /// Encode to the base58 text form.
    pub fn encode(&self) -> String {
        encode(&self.address, &self.chain_id)
    }
}

impl fmt::Display for Mnid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Mnid {
    type Err = MnidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

/// First four bytes of Keccak-256 over `payload`.
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = keccak256(payload);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode `address` scoped to `chain_id`.
pub fn encode(address: &Address, chain_id: &[u8]) -> String {
    let mut buf = Vec::with_capacity(1 + chain_id.len() + TAIL_LEN);
    buf.push(MNID_VERSION);
    buf.extend_from_slice(chain_id);
    buf.extend_from_slice(address.as_slice());
    let sum = checksum(&buf);
    buf.extend_from_slice(&sum);
    bs58::encode(buf).into_string()
}

/// Decode and verify an MNID string.
///
/// Only the checksum is verified; the version byte is carried through
/// unchecked. Use [`is_valid`] to screen for version 1.
pub fn decode(mnid: &str) -> Result<Mnid, MnidError> {
    let bytes = bs58::decode(mnid)
        .into_vec()
        .map_err(|e| MnidError::Base58(e.to_string()))?;

    if bytes.len() <= TAIL_LEN {
        return Err(MnidError::TooShort(bytes.len()));
    }

    let (payload, expected) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if checksum(payload) != expected {
        return Err(MnidError::Checksum);
    }

    let address_start = payload.len() - ADDRESS_LEN;
    Ok(Mnid {
        chain_id: payload[1..address_start].to_vec(),
        address: Address::from_slice(&payload[address_start..]),
    })
}

/// Cheap structural check: base58, longer than 24 bytes, version byte 1.
///
/// The checksum is not verified here; use [`decode`] for that.
pub fn is_valid(mnid: &str) -> bool {
    match bs58::decode(mnid).into_vec() {
        Ok(bytes) => bytes.len() > TAIL_LEN && bytes[0] == MNID_VERSION,
        Err(_) => false,
    }
}

/// Minimal big-endian bytes of a network id, used as the MNID chain id.
pub fn chain_id_bytes(network_id: u64) -> Vec<u8> {
    let bytes = network_id.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}
