//! Metrics collection.
//!
//! # Metrics
//! - `ipc_rpc_requests_total` (counter): JSON-RPC calls by method, outcome
//! - `ipc_transactions_broadcast_total` (counter): submissions by custody mode
//! - `ipc_receipt_polls_total` (counter): receipt polls by outcome
//! - `ipc_flow_transitions_total` (counter): orchestrator state entries
//!
//! Recording is a no-op until the host installs a recorder.

use metrics::counter;

pub fn record_rpc_call(method: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "ipc_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_broadcast(mode: &'static str) {
    counter!("ipc_transactions_broadcast_total", "mode" => mode).increment(1);
}

pub fn record_receipt_poll(outcome: &'static str) {
    counter!("ipc_receipt_polls_total", "outcome" => outcome).increment(1);
}

pub fn record_flow_transition(state: &'static str) {
    counter!("ipc_flow_transitions_total", "state" => state).increment(1);
}
