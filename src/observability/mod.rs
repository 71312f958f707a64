//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics exporter; the host owns that
//! - Every orchestrated flow carries a flow id on its span
//! - Keys and signed payloads are never logged

pub mod logging;
pub mod metrics;
