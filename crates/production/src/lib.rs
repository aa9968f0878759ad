//! Async runner for the chained-BFT replication engine.
//!
//! [`SmrService`] wraps the synchronous [`chainbft_bft::Smr`] with real I/O:
//!
//! - Inbound proposals and votes arrive through [`chainbft_core::Network`]
//!   subscriptions and are drained by a single consumer task
//! - Outbound sends are fire-and-forget tokio tasks
//! - Public operations lock the SMR, run, and dispatch what it returns
//!
//! ```text
//! Network ──subscribe──▶ mpsc ──▶ worker ──lock──▶ Smr ──Actions──▶ spawn(send)
//!                                                   ▲
//! enclosing consensus ──process_proposal / keep_up──┘
//! ```

mod config;
mod service;
pub mod telemetry;

pub use config::{LogConfig, NodeConfig, NodeConfigError};
pub use service::{ServiceError, SmrService};
pub use telemetry::{init_tracing, TelemetryError};
