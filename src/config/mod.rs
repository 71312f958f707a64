//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → shared via Arc by the orchestrator
//!     → NetworkEndpoint resolved per call by network id
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Endpoint tables live in config files, never in source

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ClientConfig, FaucetMethod, NetworkEndpoint, ObservabilityConfig, ReceiptConfig,
    TransactionDefaults, TransportConfig,
};
