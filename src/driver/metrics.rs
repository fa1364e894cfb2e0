use crate::error::Result;
use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Process-lifetime counters for the rebalance loop
pub struct CycleMetrics {
    registry: Registry,
    cycles: IntCounter,
    orders_submitted: IntCounter,
    cancel_failures: IntCounter,
    cycle_failures: IntCounterVec,
}

impl CycleMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounter::new("rebalancer_cycles_total", "Rebalance cycles started")?;
        let orders_submitted = IntCounter::new(
            "rebalancer_orders_submitted_total",
            "Rebalance orders accepted by the exchange",
        )?;
        let cancel_failures = IntCounter::new(
            "rebalancer_cancel_failures_total",
            "Cancel-all calls that failed without aborting the cycle",
        )?;
        let cycle_failures = IntCounterVec::new(
            Opts::new("rebalancer_cycle_failures_total", "Aborted cycles by error kind"),
            &["kind"],
        )?;

        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(orders_submitted.clone()))?;
        registry.register(Box::new(cancel_failures.clone()))?;
        registry.register(Box::new(cycle_failures.clone()))?;

        Ok(Self {
            registry,
            cycles,
            orders_submitted,
            cancel_failures,
            cycle_failures,
        })
    }

    pub fn record_cycle(&self) {
        self.cycles.inc();
    }

    pub fn record_submission(&self) {
        self.orders_submitted.inc();
    }

    pub fn record_cancel_failure(&self) {
        self.cancel_failures.inc();
    }

    pub fn record_failure(&self, kind: &str) {
        self.cycle_failures.with_label_values(&[kind]).inc();
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    pub fn orders_submitted(&self) -> u64 {
        self.orders_submitted.get()
    }

    pub fn cancel_failures(&self) -> u64 {
        self.cancel_failures.get()
    }

    /// Failures recorded for `kind`; reading never creates the series
    pub fn failures(&self, kind: &str) -> u64 {
        self.cycle_failures
            .collect()
            .iter()
            .flat_map(|family| family.get_metric())
            .filter(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == "kind" && label.get_value() == kind)
            })
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
