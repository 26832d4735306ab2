//! Prometheus metrics for the battle engine.
//!
//! The [`EngineMetrics`] struct owns a dedicated [`Registry`] that the
//! RPC `/metrics` endpoint encodes into the text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

/// Central collection of engine-level Prometheus metrics.
pub struct EngineMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Battles completed by the sweep.
    pub battles_completed: IntCounter,
    /// Casts accepted by submit paths.
    pub casts_submitted: IntCounter,
    /// Joins accepted.
    pub joins_accepted: IntCounter,
    /// Payout submissions accepted by the chain.
    pub payouts_submitted: IntCounter,
    /// Payout attempts that failed and will be retried.
    pub payout_failures: IntCounter,
    /// Sweep iterations run.
    pub sweep_runs: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Currently active battles.
    pub active_battles: IntGauge,
    /// Currently connected live subscribers.
    pub live_connections: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Wall time of one sweep iteration, in milliseconds.
    pub sweep_duration_ms: Histogram,
}

impl EngineMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let battles_completed = register_int_counter_with_registry!(
            Opts::new("clashcast_battles_completed_total", "Battles completed"),
            registry
        )
        .expect("failed to register battles_completed counter");

        let casts_submitted = register_int_counter_with_registry!(
            Opts::new("clashcast_casts_submitted_total", "Casts accepted"),
            registry
        )
        .expect("failed to register casts_submitted counter");

        let joins_accepted = register_int_counter_with_registry!(
            Opts::new("clashcast_joins_accepted_total", "Joins accepted"),
            registry
        )
        .expect("failed to register joins_accepted counter");

        let payouts_submitted = register_int_counter_with_registry!(
            Opts::new("clashcast_payouts_submitted_total", "Payouts accepted on chain"),
            registry
        )
        .expect("failed to register payouts_submitted counter");

        let payout_failures = register_int_counter_with_registry!(
            Opts::new(
                "clashcast_payout_failures_total",
                "Payout attempts that failed and will retry"
            ),
            registry
        )
        .expect("failed to register payout_failures counter");

        let sweep_runs = register_int_counter_with_registry!(
            Opts::new("clashcast_sweep_runs_total", "Sweep iterations run"),
            registry
        )
        .expect("failed to register sweep_runs counter");

        let active_battles = register_int_gauge_with_registry!(
            Opts::new("clashcast_active_battles", "Currently active battles"),
            registry
        )
        .expect("failed to register active_battles gauge");

        let live_connections = register_int_gauge_with_registry!(
            Opts::new("clashcast_live_connections", "Connected live subscribers"),
            registry
        )
        .expect("failed to register live_connections gauge");

        let sweep_duration_ms = register_histogram_with_registry!(
            HistogramOpts::new("clashcast_sweep_duration_ms", "Sweep duration in ms")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 12).unwrap()),
            registry
        )
        .expect("failed to register sweep_duration_ms histogram");

        Self {
            registry,
            battles_completed,
            casts_submitted,
            joins_accepted,
            payouts_submitted,
            payout_failures,
            sweep_runs,
            active_battles,
            live_connections,
            sweep_duration_ms,
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
