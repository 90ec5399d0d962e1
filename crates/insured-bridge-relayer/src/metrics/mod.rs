// Metrics and monitoring

use prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Relayer metrics
pub struct RelayerMetrics {
    /// Calls confirmed on chain, by call kind (slow_relay, dispute, settle, ...)
    pub calls_submitted: CounterVec,
    /// Calls that reverted or could not be sent, by call kind
    pub transaction_failures: CounterVec,
    /// Multicall batches that failed and were re-sent one call at a time
    pub batch_fallbacks: Histogram,
    /// Deposits or relays whose processing failed, by sweep
    pub sweep_item_errors: CounterVec,
    pub sweep_duration: HistogramVec,

    registry: Arc<Registry>,
}

impl RelayerMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let calls_submitted = CounterVec::new(
            Opts::new("bridge_relayer_calls_submitted_total", "Total calls submitted successfully"),
            &["kind"],
        )?;
        let transaction_failures = CounterVec::new(
            Opts::new("bridge_relayer_transaction_failures_total", "Total calls that failed to submit"),
            &["kind"],
        )?;
        let batch_fallbacks = Histogram::with_opts(
            HistogramOpts::new(
                "bridge_relayer_batch_fallback_size",
                "Number of calls re-sent individually after a failed multicall",
            )
            .buckets(vec![2.0, 5.0, 10.0, 25.0, 50.0]),
        )?;
        let sweep_item_errors = CounterVec::new(
            Opts::new("bridge_relayer_sweep_item_errors_total", "Total items skipped because of an error"),
            &["sweep"],
        )?;
        let sweep_duration = HistogramVec::new(
            HistogramOpts::new("bridge_relayer_sweep_duration_seconds", "Time to complete a sweep"),
            &["sweep"],
        )?;

        registry.register(Box::new(calls_submitted.clone()))?;
        registry.register(Box::new(transaction_failures.clone()))?;
        registry.register(Box::new(batch_fallbacks.clone()))?;
        registry.register(Box::new(sweep_item_errors.clone()))?;
        registry.register(Box::new(sweep_duration.clone()))?;

        Ok(Self {
            calls_submitted,
            transaction_failures,
            batch_fallbacks,
            sweep_item_errors,
            sweep_duration,
            registry,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Current values in the Prometheus text exposition format
    pub fn gather_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
