//! Contract interfaces and transaction assembly.
//!
//! # Responsibilities
//! - Load truffle-style contract artifacts (`contractName`, `abi`,
//!   `unlinked_binary`/`bytecode`)
//! - Encode method calls from string arguments, coerced per ABI type
//! - Turn a call or deployment into a `Transaction` intent

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::primitives::{hex, Address, Bytes, U256};
use serde::Deserialize;

use crate::chain::client::EthClient;
use crate::chain::types::Transaction;
use crate::config::TransactionDefaults;
use crate::error::{IpcError, IpcResult};
use crate::rpc::BlockTag;

/// Identity factory and call forwarder.
pub const IDENTITY_MANAGER_CONTRACT: &str = "MetaIdentityManager";
/// Key/value attestation registry.
pub const REGISTRY_CONTRACT: &str = "UportRegistry";

const BUILTIN_ARTIFACTS: &[&str] = &[
    include_str!("../../contracts/MetaIdentityManager.json"),
    include_str!("../../contracts/UportRegistry.json"),
];

#[derive(Debug, Deserialize)]
struct Artifact {
    #[serde(rename = "contractName")]
    contract_name: String,
    abi: JsonAbi,
    #[serde(default)]
    unlinked_binary: Option<String>,
    #[serde(default)]
    bytecode: Option<String>,
}

/// A contract's ABI and deployable bytecode.
#[derive(Debug, Clone)]
pub struct ContractInterface {
    pub name: String,
    pub abi: JsonAbi,
    /// Empty for ABI-only artifacts.
    pub bytecode: Bytes,
}

impl ContractInterface {
    /// Parse a truffle artifact.
    pub fn from_artifact_json(json: &str) -> IpcResult<Self> {
        let artifact: Artifact = serde_json::from_str(json)
            .map_err(|e| IpcError::Encoding(format!("invalid contract artifact: {e}")))?;

        let code = artifact
            .unlinked_binary
            .or(artifact.bytecode)
            .unwrap_or_default();
        let bytecode = hex::decode(code.trim()).map_err(|e| {
            IpcError::Encoding(format!("{}: bad bytecode: {e}", artifact.contract_name))
        })?;

        Ok(Self {
            name: artifact.contract_name,
            abi: artifact.abi,
            bytecode: bytecode.into(),
        })
    }

    /// Resolve `method` to the overload taking `arity` arguments.
    pub fn function(&self, method: &str, arity: usize) -> IpcResult<&Function> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| IpcError::MethodNotFound {
                contract: self.name.clone(),
                method: method.to_string(),
            })?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| {
                IpcError::Encoding(format!(
                    "{}.{method} has no overload taking {arity} arguments",
                    self.name
                ))
            })
    }

    /// ABI-encode `method(args)` including its selector.
    pub fn encode_call(&self, method: &str, args: &[String]) -> IpcResult<Bytes> {
        let function = self.function(method, args.len())?;
        let values = function
            .inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| coerce_arg(param, arg))
            .collect::<IpcResult<Vec<_>>>()?;

        function
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| IpcError::Encoding(format!("{}.{method}: {e}", self.name)))
    }

    /// Decode the return data of `method`.
    pub fn decode_output(&self, method: &str, arity: usize, data: &[u8]) -> IpcResult<Vec<DynSolValue>> {
        let function = self.function(method, arity)?;
        function
            .abi_decode_output(data)
            .map_err(|e| IpcError::Encoding(format!("{}.{method} output: {e}", self.name)))
    }
}

fn coerce_arg(param: &Param, arg: &str) -> IpcResult<DynSolValue> {
    let ty: DynSolType = param
        .resolve()
        .map_err(|e| IpcError::Encoding(format!("parameter {}: {e}", param.name)))?;

    // coercion rejects mixed-case addresses with a bad checksum
    let arg = match ty {
        DynSolType::Address => arg.to_ascii_lowercase(),
        _ => arg.to_string(),
    };

    ty.coerce_str(&arg)
        .map_err(|e| IpcError::Encoding(format!("parameter {} ({}): {e}", param.name, param.ty)))
}

/// Contract interfaces by name.
#[derive(Debug, Clone, Default)]
pub struct ContractStore {
    contracts: HashMap<String, Arc<ContractInterface>>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the identity manager and registry interfaces.
    pub fn with_identity_contracts() -> IpcResult<Self> {
        let mut store = Self::new();
        for json in BUILTIN_ARTIFACTS {
            store.insert(ContractInterface::from_artifact_json(json)?);
        }
        Ok(store)
    }

    /// Load every `*.json` artifact in `dir`.
    pub fn load_dir(dir: &Path) -> IpcResult<Self> {
        let mut store = Self::new();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| IpcError::ContractNotFound(format!("{}: {e}", dir.display())))?;

        for entry in entries {
            let path = entry
                .map_err(|e| IpcError::ContractNotFound(format!("{}: {e}", dir.display())))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let json = std::fs::read_to_string(&path)
                .map_err(|e| IpcError::ContractNotFound(format!("{}: {e}", path.display())))?;
            let interface = ContractInterface::from_artifact_json(&json)?;
            tracing::debug!(contract = %interface.name, path = %path.display(), "Loaded contract artifact");
            store.insert(interface);
        }
        Ok(store)
    }

    pub fn insert(&mut self, interface: ContractInterface) {
        self.contracts
            .insert(interface.name.clone(), Arc::new(interface));
    }

    pub fn get(&self, name: &str) -> IpcResult<Arc<ContractInterface>> {
        self.contracts
            .get(name)
            .cloned()
            .ok_or_else(|| IpcError::ContractNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }
}

/// Builds transaction intents from contract interfaces.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    contracts: Arc<ContractStore>,
    defaults: TransactionDefaults,
}

impl TransactionBuilder {
    pub fn new(contracts: Arc<ContractStore>, defaults: TransactionDefaults) -> Self {
        Self { contracts, defaults }
    }

    pub fn contracts(&self) -> &ContractStore {
        &self.contracts
    }

    /// Contract call when `to` is given, deployment otherwise.
    ///
    /// A deployment is addressed to `from` and carries the contract's
    /// bytecode; `method` and `args` are not used for it.
    pub fn build_call(
        &self,
        contract: &str,
        method: &str,
        args: &[String],
        from: Address,
        to: Option<Address>,
    ) -> IpcResult<Transaction> {
        let interface = self.contracts.get(contract)?;
        let mut tx = Transaction::new(from);
        tx.gas_limit = self.defaults.default_gas_limit;

        match to {
            Some(contract_address) => {
                tx.to = Some(contract_address);
                tx.data = interface.encode_call(method, args)?;
            }
            None => {
                if interface.bytecode.is_empty() {
                    return Err(IpcError::Encoding(format!(
                        "{contract} has no bytecode to deploy"
                    )));
                }
                tx.to = Some(from);
                tx.data = interface.bytecode.clone();
            }
        }

        tracing::debug!(contract, method, %from, deploy = to.is_none(), "Built transaction");
        Ok(tx)
    }

    pub fn build_transfer(&self, from: Address, to: Address, value: U256) -> Transaction {
        let mut tx = Transaction::transfer(from, to, value);
        tx.gas_limit = self.defaults.default_gas_limit;
        tx
    }

    /// Run a read-only call at `latest` and decode its return values.
    pub async fn call_contract(
        &self,
        client: &EthClient,
        contract: &str,
        method: &str,
        args: &[String],
        to: Address,
    ) -> IpcResult<Vec<DynSolValue>> {
        let mut tx = self.build_call(contract, method, args, Address::ZERO, Some(to))?;
        tx.gas_limit = 0;
        let output = client.call(&tx, BlockTag::Latest).await?;
        self.contracts
            .get(contract)?
            .decode_output(method, args.len(), &output)
    }
}
