use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{hex, Address, B256};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ipc_client::chain::{EthClient, NonceManager, PollPolicy, ReceiptWaiter};
use ipc_client::config::{load_config, ClientConfig};
use ipc_client::mnid;
use ipc_client::observability::logging::init_logging;
use ipc_client::rpc::HttpTransport;

#[derive(Parser)]
#[command(name = "ipc-cli")]
#[command(about = "Ethereum node and MNID utilities", long_about = None)]
struct Cli {
    /// Network table and client settings.
    #[arg(short, long, default_value = "config/networks.example.toml")]
    config: PathBuf,

    /// Network id, decimal or 0x-prefixed hex.
    #[arg(short, long, default_value = "1", value_parser = parse_network_id)]
    network: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode, decode or check MNIDs
    Mnid {
        #[command(subcommand)]
        action: MnidAction,
    },
    /// Print the latest block number
    BlockNumber,
    /// Print the next nonce for an address (pending count)
    Nonce { address: Address },
    /// Wait for a transaction to be mined and print its receipt
    Receipt { hash: B256 },
    /// List recent transactions sent or received by an address
    History {
        address: Address,
        /// First block to scan; defaults to 100 blocks back
        #[arg(long)]
        start: Option<u64>,
    },
}

#[derive(Subcommand)]
enum MnidAction {
    /// Encode an address; chain id is hex bytes
    Encode {
        address: Address,
        #[arg(long, default_value = "01")]
        chain_id: String,
    },
    /// Decode and verify an MNID
    Decode { mnid: String },
    /// Structural check only (no checksum)
    Check { mnid: String },
}

fn parse_network_id(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid network id '{s}': {e}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::Mnid { action } = &cli.command {
        init_logging(&Default::default());
        return run_mnid(action);
    }

    let config: ClientConfig = load_config(&cli.config)?;
    init_logging(&config.observability);

    let transport = Arc::new(HttpTransport::new(&config.transport)?);
    let client = EthClient::new(transport, config.endpoint(cli.network)?.clone());

    match cli.command {
        Commands::Mnid { .. } => {}
        Commands::BlockNumber => {
            println!("{}", client.block_number().await?);
        }
        Commands::Nonce { address } => {
            let nonces = NonceManager::new();
            println!("{}", nonces.refresh(&client, address).await?);
        }
        Commands::Receipt { hash } => {
            let waiter = ReceiptWaiter::new(client, PollPolicy::from(&config.receipts));
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let receipt = waiter.wait(hash, &cancel).await?;
            println!("block {}", receipt.block_number);
            for (i, log) in receipt.logs.iter().enumerate() {
                println!("log {i}: data {}", hex::encode_prefixed(&log.data));
                for topic in &log.topics {
                    println!("    topic {topic}");
                }
            }
        }
        Commands::History { address, start } => {
            let transactions = client.transactions_involving(&address, start).await?;
            if transactions.is_empty() {
                println!("no transactions");
            }
            for tx in transactions {
                let to = tx.to.map_or_else(|| "(create)".to_string(), |to| to.to_string());
                println!(
                    "{} block {} {} -> {} value {}",
                    tx.hash,
                    tx.block_number.unwrap_or_default(),
                    tx.from,
                    to,
                    tx.value
                );
            }
        }
    }

    Ok(())
}

fn run_mnid(action: &MnidAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        MnidAction::Encode { address, chain_id } => {
            let chain_id = hex::decode(chain_id)?;
            println!("{}", mnid::encode(address, &chain_id));
        }
        MnidAction::Decode { mnid: text } => {
            let decoded = mnid::decode(text)?;
            println!("chain id: {}", hex::encode_prefixed(&decoded.chain_id));
            println!("address:  {}", decoded.address);
        }
        MnidAction::Check { mnid: text } => {
            println!("{}", mnid::is_valid(text));
        }
    }
    Ok(())
}
