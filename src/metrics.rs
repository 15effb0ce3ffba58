//! Prometheus metrics for the oracle
//!
//! Owned registry (no global state) so each server instance and each test
//! gets its own counters.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

pub struct OracleMetrics {
    /// JSON-RPC requests by method and outcome (`ok` or an error kind)
    pub requests_total: IntCounterVec,
    /// Chain-mutating submissions by request kind
    pub submissions_total: IntCounterVec,
    /// Requests short-circuited because the ledger already recorded completion
    pub already_completed_total: IntCounterVec,
    /// Failed completion-ledger reads
    pub chain_query_failures_total: IntCounter,
    pub registry: Registry,
}

impl Default for OracleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("oracle_requests_total", "JSON-RPC requests handled"),
            &["method", "outcome"],
        )
        .expect("constant metric name is valid");

        let submissions_total = IntCounterVec::new(
            Opts::new(
                "oracle_submissions_total",
                "Chain-mutating transactions submitted",
            ),
            &["kind"],
        )
        .expect("constant metric name is valid");

        let already_completed_total = IntCounterVec::new(
            Opts::new(
                "oracle_already_completed_total",
                "Requests skipped because the ledger already recorded completion",
            ),
            &["kind"],
        )
        .expect("constant metric name is valid");

        let chain_query_failures_total = IntCounter::new(
            "oracle_chain_query_failures_total",
            "Completion-ledger reads that failed",
        )
        .expect("constant metric name is valid");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(submissions_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(already_completed_total.clone()))
            .expect("metric registration must not be called twice");
        registry
            .register(Box::new(chain_query_failures_total.clone()))
            .expect("metric registration must not be called twice");

        Self {
            requests_total,
            submissions_total,
            already_completed_total,
            chain_query_failures_total,
            registry,
        }
    }

    pub fn record_request(&self, method: &str, outcome: &str) {
        self.requests_total
            .with_label_values(&[method, outcome])
            .inc();
    }

    pub fn record_submission(&self, kind: &str) {
        self.submissions_total.with_label_values(&[kind]).inc();
    }

    pub fn record_already_completed(&self, kind: &str) {
        self.already_completed_total.with_label_values(&[kind]).inc();
    }

    /// Total requests across all methods and outcomes
    pub fn total_requests(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "oracle_requests_total")
            .flat_map(|family| family.get_metric().iter())
            .map(|m| m.get_counter().get_value() as u64)
            .sum()
    }
}
