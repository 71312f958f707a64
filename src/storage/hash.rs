//! Multihash content identifiers.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::B256;
use sha2::{Digest, Sha256};

use crate::error::{IpcError, IpcResult};

/// Multihash function code for sha2-256.
const SHA2_256: u8 = 0x12;
const DIGEST_LEN: u8 = 32;

/// sha2-256 multihash: `0x12 0x20` followed by the 32-byte digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash {
    digest: B256,
}

impl ContentHash {
    /// Hash `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(bytes).into();
        Self {
            digest: B256::from(digest),
        }
    }

    /// Rebuild from the digest stored in the registry.
    pub fn from_registry_digest(digest: B256) -> Self {
        Self { digest }
    }

    /// Digest without the multihash prefix, as stored on chain.
    pub fn registry_digest(&self) -> B256 {
        self.digest
    }

    /// Full multihash bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(34);
        bytes.push(SHA2_256);
        bytes.push(DIGEST_LEN);
        bytes.extend_from_slice(self.digest.as_slice());
        bytes
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    pub fn from_base58(s: &str) -> IpcResult<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| IpcError::ContentStore(format!("'{s}' is not base58: {e}")))?;

        match bytes.as_slice() {
            [SHA2_256, DIGEST_LEN, digest @ ..] if digest.len() == DIGEST_LEN as usize => {
                Ok(Self::from_registry_digest(B256::from_slice(digest)))
            }
            _ => Err(IpcError::ContentStore(format!(
                "'{s}' is not a sha2-256 multihash"
            ))),
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for ContentHash {
    type Err = IpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hash() {
        // sha256("hello world")
        let hash = ContentHash::of(b"hello world");
        assert_eq!(
            hash.registry_digest().to_string(),
            "0xb94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(&hash.to_bytes()[..2], &[0x12, 0x20]);
        assert!(hash.to_base58().starts_with("Qm"));
    }

    #[test]
    fn test_base58_and_digest_forms_agree() {
        let hash = ContentHash::of(b"profile");
        let text = hash.to_string();
        assert_eq!(text.parse::<ContentHash>().unwrap(), hash);
        assert_eq!(
            ContentHash::from_registry_digest(hash.registry_digest()),
            hash
        );
    }

    #[test]
    fn test_rejects_other_multihashes() {
        let sha1_like = bs58::encode([0x11u8, 0x14, 1, 2, 3]).into_string();
        assert!(ContentHash::from_base58(&sha1_like).is_err());
        assert!(ContentHash::from_base58("0OIl").is_err());
    }
}
