//! Completion oracle
//!
//! Answers "has the bridging contract already finalized this identifier?" by
//! reading the contract's `completed` ledger. The ledger is the only source
//! of truth: nothing is cached locally, so every call is a fresh read.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::chain::ChainReader;
use crate::error::OracleResult;
use crate::metrics::OracleMetrics;
use crate::types::TxRef;

/// Default bound on concurrent ledger reads for batch queries
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;

#[derive(Clone)]
pub struct CompletionOracle {
    reader: Arc<dyn ChainReader>,
    metrics: Option<Arc<OracleMetrics>>,
    max_concurrent_queries: usize,
}

impl CompletionOracle {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self {
            reader,
            metrics: None,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<OracleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Bound batch fan-out. Zero is treated as one (sequential).
    pub fn with_max_concurrent_queries(mut self, max: usize) -> Self {
        self.max_concurrent_queries = max.max(1);
        self
    }

    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }

    /// Whether `tx` is recorded as completed.
    ///
    /// A failed read is `QueryUnavailable`, never `false`.
    pub async fn is_completed(&self, tx: &TxRef) -> OracleResult<bool> {
        match self.reader.is_completed(tx).await {
            Ok(completed) => {
                debug!(tx = %tx, completed, "Completion checked");
                Ok(completed)
            }
            Err(e) => {
                warn!(tx = %tx, error = %e, "Completion query failed");
                if let Some(metrics) = &self.metrics {
                    metrics.chain_query_failures_total.inc();
                }
                Err(e)
            }
        }
    }

    /// Completion flag for each entry, in input order.
    ///
    /// Reads run concurrently up to the configured bound; results are
    /// buffered back into input order. The first failure fails the batch.
    pub async fn completion_flags(&self, txs: &[TxRef]) -> OracleResult<Vec<bool>> {
        // futures are built up front so the stream holds no closure over `&self`
        let queries: Vec<_> = txs
            .iter()
            .map(|tx| Box::pin(self.is_completed(tx)))
            .collect();
        stream::iter(queries)
            .buffered(self.max_concurrent_queries)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::testing::FakeChain;
    use std::time::Duration;

    fn tx(byte: u8) -> TxRef {
        TxRef::from_bytes([byte; 32])
    }

    #[tokio::test]
    async fn test_prefixed_and_bare_refs_query_same_key() {
        let chain = Arc::new(FakeChain::new());
        let hex_body = "de".repeat(32);
        chain.mark_completed(TxRef::parse(&hex_body).unwrap());
        let oracle = CompletionOracle::new(chain.clone());

        let bare = TxRef::parse(&hex_body).unwrap();
        let prefixed = TxRef::parse(&format!("0x{}", hex_body)).unwrap();

        assert!(oracle.is_completed(&bare).await.unwrap());
        assert!(oracle.is_completed(&prefixed).await.unwrap());

        let queries = chain.completion_queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], queries[1]);
    }

    #[tokio::test]
    async fn test_query_failure_is_not_false() {
        let chain = Arc::new(FakeChain::new());
        chain.fail_reads("node down");
        let metrics = Arc::new(OracleMetrics::new());
        let oracle = CompletionOracle::new(chain).with_metrics(metrics.clone());

        let err = oracle.is_completed(&tx(1)).await.unwrap_err();
        assert!(matches!(err, OracleError::QueryUnavailable(_)));
        assert_eq!(metrics.chain_query_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn test_completion_flags_preserve_order() {
        let chain = Arc::new(FakeChain::new());
        chain.mark_completed(tx(2));
        let oracle = CompletionOracle::new(chain).with_max_concurrent_queries(3);

        let flags = oracle
            .completion_flags(&[tx(1), tx(2), tx(3), tx(2)])
            .await
            .unwrap();
        assert_eq!(flags, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn test_concurrent_flags_keep_input_order() {
        let chain = Arc::new(FakeChain::new());
        chain.mark_completed(tx(2));
        // earlier entries answer later
        chain.delay_reads(tx(1), Duration::from_millis(80));
        chain.delay_reads(tx(2), Duration::from_millis(40));
        let oracle = CompletionOracle::new(chain.clone()).with_max_concurrent_queries(4);

        let flags = oracle
            .completion_flags(&[tx(1), tx(2), tx(3), tx(2)])
            .await
            .unwrap();
        assert_eq!(flags, vec![false, true, false, true]);
        assert!(chain.peak_reads_in_flight() > 1, "reads did not overlap");
    }

    #[tokio::test]
    async fn test_completion_flags_empty_batch() {
        let oracle = CompletionOracle::new(Arc::new(FakeChain::new()));
        assert!(oracle.completion_flags(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_concurrency_means_sequential() {
        let chain = Arc::new(FakeChain::new());
        chain.mark_completed(tx(5));
        let oracle = CompletionOracle::new(chain).with_max_concurrent_queries(0);
        assert_eq!(
            oracle.completion_flags(&[tx(5), tx(6)]).await.unwrap(),
            vec![true, false]
        );
    }
}
