//! Identity creation and profile registration.
//!
//! # Data Flow
//! ```text
//! orchestrator.rs
//!     → chain::KeyCustody (create + unlock account)
//!     → faucet.rs (fund, or zero hash when the network has none)
//!     → chain (createIdentity → receipt → identity address from topic 1)
//!     → profile.rs + storage::ContentStore (publish avatar and Person JSON)
//!     → registry.rs (forwardTo(Registry.set) → receipt)
//! ```
//!
//! # Design Decisions
//! - Flows are plain sequential async fns; the first error ends the flow
//! - Progress reporting goes through a caller-supplied callback
//! - A zero registry digest means "no profile", not an error

pub mod faucet;
pub mod orchestrator;
pub mod profile;
pub mod registry;

pub use faucet::Faucet;
pub use orchestrator::{
    FlowEvent, FlowState, IdentityOrchestrator, IdentityRecord, NewIdentity, ProgressCallback,
};
pub use profile::{ImageObject, Profile};
