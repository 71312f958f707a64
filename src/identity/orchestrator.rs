//! End-to-end identity flows.
//!
//! # Flow states (`setup_identity`)
//! ```text
//! CreatingAccount → Unlocking → Funding → AwaitingFundingReceipt
//!     → DeployingIdentity → AwaitingDeployReceipt → ExtractingIdentityAddress
//!     → BuildingProfile → PublishingProfile
//!     → RegisteringProfile → AwaitingRegistrationReceipt → Done
//! any step error or reverted receipt → Failed (no rollback; broadcast
//! transactions stand)
//! ```
//!
//! Every flow runs under its own span with a fresh flow id, reports progress
//! through the optional callback, and owns a child cancellation token that
//! is cancelled when the flow returns.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{hex, Address, B256};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::chain::builder::IDENTITY_MANAGER_CONTRACT;
use crate::chain::logs::{self, LogField};
use crate::chain::{
    Account, ContractStore, EthClient, KeyCustody, NonceManager, PollPolicy, ReceiptWaiter,
    TransactionBroadcaster, TransactionBuilder, TransactionReceipt,
};
use crate::config::{ClientConfig, NetworkEndpoint};
use crate::error::{IpcError, IpcResult};
use crate::identity::faucet::Faucet;
use crate::identity::profile::Profile;
use crate::identity::registry;
use crate::mnid;
use crate::observability::metrics;
use crate::rpc::RpcTransport;
use crate::storage::{ContentHash, ContentStore};

/// Topic index of the identity address in the identity-created event.
const IDENTITY_TOPIC: usize = 1;

/// A step of an identity flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    CreatingAccount,
    Unlocking,
    Funding,
    AwaitingFundingReceipt,
    DeployingIdentity,
    AwaitingDeployReceipt,
    ExtractingIdentityAddress,
    BuildingProfile,
    PublishingProfile,
    RegisteringProfile,
    AwaitingRegistrationReceipt,
    LookingUpProfile,
    Done,
    Failed,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::CreatingAccount => "creating_account",
            FlowState::Unlocking => "unlocking",
            FlowState::Funding => "funding",
            FlowState::AwaitingFundingReceipt => "awaiting_funding_receipt",
            FlowState::DeployingIdentity => "deploying_identity",
            FlowState::AwaitingDeployReceipt => "awaiting_deploy_receipt",
            FlowState::ExtractingIdentityAddress => "extracting_identity_address",
            FlowState::BuildingProfile => "building_profile",
            FlowState::PublishingProfile => "publishing_profile",
            FlowState::RegisteringProfile => "registering_profile",
            FlowState::AwaitingRegistrationReceipt => "awaiting_registration_receipt",
            FlowState::LookingUpProfile => "looking_up_profile",
            FlowState::Done => "done",
            FlowState::Failed => "failed",
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notification handed to the caller's callback.
#[derive(Debug)]
pub enum FlowEvent<'a> {
    Started { flow_id: Uuid, flow: &'static str },
    Entered { flow_id: Uuid, state: FlowState },
    Finished { flow_id: Uuid },
    Failed { flow_id: Uuid, error: &'a IpcError },
}

pub type ProgressCallback = Arc<dyn Fn(&FlowEvent<'_>) + Send + Sync>;

/// Owner account and identity contract produced by `new_identity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewIdentity {
    pub sender: Address,
    pub identity: Address,
}

/// Everything `setup_identity` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub sender: Address,
    pub identity: Address,
    /// MNID of the identity on its network.
    pub mnid: String,
    pub profile: ContentHash,
    pub registration_tx: B256,
}

/// Per-call bundle of the components bound to one network.
struct Network {
    endpoint: NetworkEndpoint,
    client: EthClient,
    broadcaster: TransactionBroadcaster,
    waiter: ReceiptWaiter,
}

impl Network {
    /// Wait for `hash` and fail if it reverted.
    async fn confirm(&self, hash: B256, cancel: &CancellationToken) -> IpcResult<TransactionReceipt> {
        let receipt = self.waiter.wait(hash, cancel).await?;
        if receipt.is_reverted() {
            tracing::warn!(tx_hash = %hash, block_number = receipt.block_number, "Transaction reverted");
            return Err(IpcError::Reverted(hash));
        }
        Ok(receipt)
    }
}

/// One running flow: id, progress sink and cancellation scope.
struct Flow {
    id: Uuid,
    name: &'static str,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
    _cancel_on_exit: DropGuard,
}

impl Flow {
    fn start(name: &'static str, parent: &CancellationToken, progress: Option<ProgressCallback>) -> Self {
        let cancel = parent.child_token();
        let flow = Self {
            id: Uuid::new_v4(),
            name,
            progress,
            _cancel_on_exit: cancel.clone().drop_guard(),
            cancel,
        };
        flow.emit(&FlowEvent::Started {
            flow_id: flow.id,
            flow: name,
        });
        flow
    }

    fn emit(&self, event: &FlowEvent<'_>) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    /// Move to `state`, unless the caller has given up on the flow.
    fn enter(&self, state: FlowState) -> IpcResult<()> {
        if self.cancel.is_cancelled() {
            return Err(IpcError::Cancelled);
        }
        metrics::record_flow_transition(state.as_str());
        tracing::info!(state = %state, "Flow step");
        self.emit(&FlowEvent::Entered {
            flow_id: self.id,
            state,
        });
        Ok(())
    }

    fn finish<T>(&self, result: &IpcResult<T>) {
        match result {
            Ok(_) => {
                metrics::record_flow_transition(FlowState::Done.as_str());
                self.emit(&FlowEvent::Entered {
                    flow_id: self.id,
                    state: FlowState::Done,
                });
                self.emit(&FlowEvent::Finished { flow_id: self.id });
                tracing::info!(flow = self.name, "Flow finished");
            }
            Err(error) => {
                metrics::record_flow_transition(FlowState::Failed.as_str());
                self.emit(&FlowEvent::Entered {
                    flow_id: self.id,
                    state: FlowState::Failed,
                });
                self.emit(&FlowEvent::Failed {
                    flow_id: self.id,
                    error,
                });
                tracing::warn!(flow = self.name, error = %error, "Flow failed");
            }
        }
    }

    fn span(&self, network_id: u64) -> tracing::Span {
        tracing::info_span!("identity_flow", flow = self.name, flow_id = %self.id, network_id)
    }
}

/// Composes custody, chain, storage and registry into identity flows.
pub struct IdentityOrchestrator {
    config: Arc<ClientConfig>,
    transport: Arc<dyn RpcTransport>,
    nonces: Arc<NonceManager>,
    builder: TransactionBuilder,
    custody: Arc<dyn KeyCustody>,
    store: Arc<dyn ContentStore>,
    faucet: Faucet,
    progress: Option<ProgressCallback>,
}

impl IdentityOrchestrator {
    /// Orchestrator using the bundled identity manager and registry ABIs.
    pub fn new(
        config: Arc<ClientConfig>,
        transport: Arc<dyn RpcTransport>,
        custody: Arc<dyn KeyCustody>,
        store: Arc<dyn ContentStore>,
    ) -> IpcResult<Self> {
        PollPolicy::from(&config.receipts).validate()?;
        let faucet = Faucet::new(&config.transport)?;
        let builder = TransactionBuilder::new(
            Arc::new(ContractStore::with_identity_contracts()?),
            config.transactions.clone(),
        );
        Ok(Self {
            config,
            transport,
            nonces: Arc::new(NonceManager::new()),
            builder,
            custody,
            store,
            faucet,
            progress: None,
        })
    }

    /// Replace the contract interfaces (e.g. artifacts loaded from disk).
    pub fn with_contracts(mut self, contracts: ContractStore) -> Self {
        self.builder = TransactionBuilder::new(Arc::new(contracts), self.config.transactions.clone());
        self
    }

    pub fn with_faucet(mut self, faucet: Faucet) -> Self {
        self.faucet = faucet;
        self
    }

    /// Share a nonce cache with other senders in the process.
    pub fn with_nonce_manager(mut self, nonces: Arc<NonceManager>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn nonces(&self) -> &Arc<NonceManager> {
        &self.nonces
    }

    fn network(&self, network_id: u64) -> IpcResult<Network> {
        let endpoint = self.config.endpoint(network_id)?.clone();
        let client = EthClient::new(self.transport.clone(), endpoint.clone());
        let broadcaster = TransactionBroadcaster::new(
            client.clone(),
            self.nonces.clone(),
            self.config.transactions.clone(),
        );
        let waiter = ReceiptWaiter::new(client.clone(), PollPolicy::from(&self.config.receipts));
        Ok(Network {
            endpoint,
            client,
            broadcaster,
            waiter,
        })
    }

    /// Create and fund an account, then deploy its identity contract.
    pub async fn new_identity(&self, network_id: u64, cancel: &CancellationToken) -> IpcResult<NewIdentity> {
        let flow = Flow::start("new_identity", cancel, self.progress.clone());
        let span = flow.span(network_id);
        let result: IpcResult<NewIdentity> = async {
            let net = self.network(network_id)?;
            let (_, created) = self.create_identity(&flow, &net).await?;
            Ok(created)
        }
        .instrument(span)
        .await;
        flow.finish(&result);
        result
    }

    /// Register an already published profile for `identity`.
    pub async fn connect_registry(
        &self,
        network_id: u64,
        sender: Address,
        identity: Address,
        profile: &ContentHash,
        cancel: &CancellationToken,
    ) -> IpcResult<B256> {
        let flow = Flow::start("connect_registry", cancel, self.progress.clone());
        let span = flow.span(network_id);
        let result: IpcResult<B256> = async {
            let net = self.network(network_id)?;
            let account = self.custody.unlock(&sender).await?;
            self.register_profile(&flow, &net, account.as_ref(), identity, profile)
                .await
        }
        .instrument(span)
        .await;
        flow.finish(&result);
        result
    }

    /// Full flow: new identity, profile publication and registration.
    pub async fn setup_identity(
        &self,
        network_id: u64,
        name: &str,
        image: Vec<u8>,
        cancel: &CancellationToken,
    ) -> IpcResult<IdentityRecord> {
        let flow = Flow::start("setup_identity", cancel, self.progress.clone());
        let span = flow.span(network_id);
        let result: IpcResult<IdentityRecord> = async {
            let net = self.network(network_id)?;
            let (account, created) = self.create_identity(&flow, &net).await?;

            flow.enter(FlowState::BuildingProfile)?;
            let image_hash = self.store.put(image).await?;
            let mnid = mnid::encode(&created.identity, &mnid::chain_id_bytes(net.endpoint.network_id));
            let mut profile = Profile::person(name, mnid.clone(), net.endpoint.name.clone())
                .with_avatar(&image_hash);
            if let Some(key) = account.public_key() {
                profile = profile.with_public_key(hex::encode_prefixed(key));
            }
            let document = serde_json::to_vec_pretty(&profile)
                .map_err(|e| IpcError::ContentStore(format!("profile serialization: {e}")))?;

            flow.enter(FlowState::PublishingProfile)?;
            let profile_hash = self.store.put(document).await?;
            tracing::info!(profile = %profile_hash, "Profile published");

            let registration_tx = self
                .register_profile(&flow, &net, account.as_ref(), created.identity, &profile_hash)
                .await?;

            Ok(IdentityRecord {
                sender: created.sender,
                identity: created.identity,
                mnid,
                profile: profile_hash,
                registration_tx,
            })
        }
        .instrument(span)
        .await;
        flow.finish(&result);
        result
    }

    /// Read the profile registered for `identity`, if there is one.
    pub async fn get_identity_profile(&self, network_id: u64, identity: Address) -> IpcResult<Option<Profile>> {
        let flow = Flow::start("get_identity_profile", &CancellationToken::new(), self.progress.clone());
        let span = flow.span(network_id);
        let result: IpcResult<Option<Profile>> = async {
            let net = self.network(network_id)?;
            flow.enter(FlowState::LookingUpProfile)?;
            let registry_address = net.endpoint.registry()?;
            let Some(hash) = registry::lookup(&self.builder, &net.client, registry_address, identity).await? else {
                tracing::debug!(%identity, "No profile registered");
                return Ok(None);
            };

            let document = self.store.get(&hash).await?;
            serde_json::from_slice(&document)
                .map(Some)
                .map_err(|e| IpcError::ContentStore(format!("{hash} is not a profile: {e}")))
        }
        .instrument(span)
        .await;
        flow.finish(&result);
        result
    }

    async fn create_identity(&self, flow: &Flow, net: &Network) -> IpcResult<(Arc<dyn Account>, NewIdentity)> {
        let identity_manager = net.endpoint.identity_manager()?;

        flow.enter(FlowState::CreatingAccount)?;
        let sender = self.custody.create_account().await?;

        flow.enter(FlowState::Unlocking)?;
        let account = self.custody.unlock(&sender).await?;

        flow.enter(FlowState::Funding)?;
        let funding_tx = tokio::select! {
            biased;
            _ = flow.cancel.cancelled() => return Err(IpcError::Cancelled),
            funded = self.faucet.fund(&net.endpoint, &sender) => funded?,
        };

        flow.enter(FlowState::AwaitingFundingReceipt)?;
        net.confirm(funding_tx, &flow.cancel).await?;

        flow.enter(FlowState::DeployingIdentity)?;
        let owner = sender.to_string();
        let mut tx = self.builder.build_call(
            IDENTITY_MANAGER_CONTRACT,
            "createIdentity",
            &[owner.clone(), owner],
            sender,
            Some(identity_manager),
        )?;
        let deploy_tx = net
            .broadcaster
            .send_raw_transaction(account.as_ref(), &mut tx)
            .await?;

        flow.enter(FlowState::AwaitingDeployReceipt)?;
        let receipt = net.confirm(deploy_tx, &flow.cancel).await?;

        flow.enter(FlowState::ExtractingIdentityAddress)?;
        let identity = identity_from_receipt(&receipt)?;
        tracing::info!(%sender, %identity, "Identity created");

        Ok((account, NewIdentity { sender, identity }))
    }

    async fn register_profile(
        &self,
        flow: &Flow,
        net: &Network,
        account: &dyn Account,
        identity: Address,
        profile: &ContentHash,
    ) -> IpcResult<B256> {
        flow.enter(FlowState::RegisteringProfile)?;
        let mut tx = registry::registration_transaction(
            &self.builder,
            account.address(),
            identity,
            net.endpoint.identity_manager()?,
            net.endpoint.registry()?,
            profile,
        )?;
        let hash = net.broadcaster.send_raw_transaction(account, &mut tx).await?;

        flow.enter(FlowState::AwaitingRegistrationReceipt)?;
        net.confirm(hash, &flow.cancel).await?;
        tracing::info!(%identity, profile = %profile, tx_hash = %hash, "Profile registered");
        Ok(hash)
    }
}

fn identity_from_receipt(receipt: &TransactionReceipt) -> IpcResult<Address> {
    logs::first_address(&receipt.logs, LogField::Topic(IDENTITY_TOPIC))?.ok_or_else(|| {
        IpcError::schema(
            "eth_getTransactionReceipt",
            "identity creation receipt carries no identity log",
        )
    })
}
