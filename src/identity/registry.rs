//! On-chain profile registry.
//!
//! Profiles are registered by the identity contract itself: the owner asks
//! the identity manager to forward `Registry.set(key, identity, digest)`
//! from the identity. Lookups read `Registry.get(key, identity, identity)`.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, Address, B256};

use crate::chain::builder::{IDENTITY_MANAGER_CONTRACT, REGISTRY_CONTRACT};
use crate::chain::{EthClient, Transaction, TransactionBuilder};
use crate::error::{IpcError, IpcResult};
use crate::storage::ContentHash;

/// Registration identifier for IPFS profiles with sha2-256 hashes.
pub const REGISTRATION_IDENTIFIER: &str = "uPortProfileIPFS1220";

/// The identifier's bytes, right-padded to 32.
pub fn registry_key() -> B256 {
    B256::right_padding_from(REGISTRATION_IDENTIFIER.as_bytes())
}

/// Build the owner's transaction that registers `profile` for `identity`.
pub fn registration_transaction(
    builder: &TransactionBuilder,
    sender: Address,
    identity: Address,
    identity_manager: Address,
    registry: Address,
    profile: &ContentHash,
) -> IpcResult<Transaction> {
    let set_args = [
        registry_key().to_string(),
        identity.to_string(),
        profile.registry_digest().to_string(),
    ];
    let set_data = builder
        .contracts()
        .get(REGISTRY_CONTRACT)?
        .encode_call("set", &set_args)?;

    let forward_args = [
        sender.to_string(),
        identity.to_string(),
        registry.to_string(),
        "0".to_string(),
        hex::encode_prefixed(&set_data),
    ];
    builder.build_call(
        IDENTITY_MANAGER_CONTRACT,
        "forwardTo",
        &forward_args,
        sender,
        Some(identity_manager),
    )
}

/// Profile hash registered for `identity`; `None` when nothing is set.
pub async fn lookup(
    builder: &TransactionBuilder,
    client: &EthClient,
    registry: Address,
    identity: Address,
) -> IpcResult<Option<ContentHash>> {
    let args = [
        registry_key().to_string(),
        identity.to_string(),
        identity.to_string(),
    ];
    let values = builder
        .call_contract(client, REGISTRY_CONTRACT, "get", &args, registry)
        .await?;

    match values.first() {
        Some(DynSolValue::FixedBytes(word, 32)) if word.is_zero() => Ok(None),
        Some(DynSolValue::FixedBytes(word, 32)) => Ok(Some(ContentHash::from_registry_digest(*word))),
        other => Err(IpcError::schema(
            "eth_call",
            format!("registry get returned {other:?}"),
        )),
    }
}
