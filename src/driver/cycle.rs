use crate::data::{AccountState, ExposureTarget, MarketQuote, PositionEntry};
use crate::driver::CycleMetrics;
use crate::error::{FailureClass, RebalanceError, Result};
use crate::exchange::{Credentials, ExchangeClient, SessionToken};
use crate::signal::SignalSource;
use crate::strategy::{build_signed_order, compute_rebalance_with, RebalanceOrder, RebalanceParams};
use crate::utils::config::{Config, TimingConfig};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// Everything the driver needs, fixed at construction
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub instrument: String,
    pub vault_id: String,
    /// Prefix for client order ids; the cycle number is appended
    pub client_id: String,
    pub credentials: Credentials,
    pub params: RebalanceParams,
    pub timing: TimingConfig,
}

impl From<&Config> for DriverConfig {
    fn from(config: &Config) -> Self {
        Self {
            instrument: config.general.instrument.clone(),
            vault_id: config.general.vault_id.clone(),
            client_id: config.general.client_id.clone(),
            credentials: config.credentials(),
            params: config.rebalance.params(),
            timing: config.timing.clone(),
        }
    }
}

/// State read during the fetch stage
#[derive(Debug, Clone)]
pub struct CycleInputs {
    pub session: SessionToken,
    pub target: ExposureTarget,
    pub account: AccountState,
    pub quote: MarketQuote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Submitted(RebalanceOrder),
    NoOrder,
}

/// Runs fetch → decide → act forever against one instrument.
///
/// Cycles are strictly sequential. Nothing but the metrics survives from one
/// cycle to the next; every failure aborts the cycle and the next one starts
/// from scratch after a backoff.
pub struct CycleDriver<E, S> {
    exchange: E,
    signal: S,
    config: DriverConfig,
    metrics: CycleMetrics,
    cycle: u64,
}

impl<E: ExchangeClient, S: SignalSource> CycleDriver<E, S> {
    pub fn new(config: DriverConfig, exchange: E, signal: S) -> Result<Self> {
        Ok(Self {
            exchange,
            signal,
            config,
            metrics: CycleMetrics::new()?,
            cycle: 0,
        })
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn metrics(&self) -> &CycleMetrics {
        &self.metrics
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Bound an external call by the configured request timeout
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let after = self.config.timing.request_timeout();
        tokio::time::timeout(after, call)
            .await
            .map_err(|_| RebalanceError::Timeout { operation, after })?
    }

    /// Fetching: signal, session, positions, equity, quote
    pub async fn fetch(&self) -> Result<CycleInputs> {
        let target = self.timed("latest_target", self.signal.latest_target()).await?;

        let session = self
            .timed("authenticate", self.exchange.authenticate(&self.config.credentials))
            .await?;

        let positions = self
            .timed("get_positions", self.exchange.get_positions(&session))
            .await?;
        let position_size = PositionEntry::size_for(&positions, &self.config.instrument);

        let balance_value = self
            .timed("get_account_value", self.exchange.get_account_value(&self.config.vault_id))
            .await?;

        let quote = self
            .timed("get_quote", self.exchange.get_quote(&self.config.instrument))
            .await?;
        quote.validate()?;

        let account = AccountState::new(position_size, balance_value);

        info!(
            %target,
            position = %account.position_size,
            balance = %account.balance_value,
            bid = %quote.bid,
            ask = %quote.ask,
            "State fetched"
        );

        Ok(CycleInputs {
            session,
            target,
            account,
            quote,
        })
    }

    /// Deciding: compute the delta and, if it is not dust, a signed order
    pub fn decide(&self, inputs: &CycleInputs) -> Result<Option<RebalanceOrder>> {
        let decision = compute_rebalance_with(
            inputs.target,
            &inputs.account,
            &inputs.quote,
            &self.config.params,
        )?;

        let Some(decision) = decision else {
            info!("Within dust threshold, no order this cycle");
            return Ok(None);
        };

        let client_id = format!("{}-{}", self.config.client_id, self.cycle);
        let order = build_signed_order(
            &decision,
            &inputs.quote,
            &self.config.instrument,
            &client_id,
            &self.config.credentials,
        );

        info!(
            side = order.side.as_str(),
            size = %order.size,
            price = %order.price,
            "Rebalance order built"
        );

        Ok(Some(order))
    }

    /// Acting: cancel-all always, then submit when there is an order.
    ///
    /// A failed cancel is logged and counted but does not stop submission.
    pub async fn act(
        &self,
        session: &SessionToken,
        order: Option<RebalanceOrder>,
    ) -> Result<CycleOutcome> {
        if let Err(e) = self
            .timed("cancel_all_orders", self.exchange.cancel_all_orders(session))
            .await
        {
            warn!(kind = e.kind(), "Cancel-all failed, continuing: {}", e);
            self.metrics.record_cancel_failure();
        }

        let Some(order) = order else {
            return Ok(CycleOutcome::NoOrder);
        };

        self.timed("submit_order", self.exchange.submit_order(session, &order))
            .await?;
        self.metrics.record_submission();

        info!(client_id = %order.client_id, "✅ Order submitted");

        Ok(CycleOutcome::Submitted(order))
    }

    /// One full fetch → decide → act pass. Errors propagate untouched.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        self.cycle += 1;
        self.metrics.record_cycle();

        let inputs = self.fetch().await?;
        let order = self.decide(&inputs)?;
        self.act(&inputs.session, order).await
    }

    /// Run one cycle, absorb any failure, and return how long to wait
    pub async fn step(&mut self) -> Duration {
        let span = info_span!("cycle", n = self.cycle + 1);
        let result = self.run_cycle().instrument(span).await;
        self.delay_after(&result)
    }

    fn delay_after(&self, result: &Result<CycleOutcome>) -> Duration {
        let timing = &self.config.timing;

        match result {
            Ok(CycleOutcome::Submitted(_)) => timing.pacing_interval(),
            Ok(CycleOutcome::NoOrder) => timing.idle_interval(),
            Err(e) => {
                self.metrics.record_failure(e.kind());

                let delay = match e.class() {
                    FailureClass::Persistent => timing.persistent_failure_backoff(),
                    FailureClass::Transient => timing.failure_backoff(),
                };

                error!(
                    cycle = self.cycle,
                    kind = e.kind(),
                    "Cycle aborted: {}. Retrying in {:?}",
                    e,
                    delay
                );

                delay
            }
        }
    }

    /// Loop forever; only external termination stops it
    pub async fn run(&mut self) {
        info!(
            instrument = %self.config.instrument,
            vault = %self.config.vault_id,
            "Rebalancer started"
        );

        loop {
            let delay = self.step().await;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Side;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockExchange {
        position: Decimal,
        balance: Decimal,
        quote: Option<MarketQuote>,
        fail_auth: bool,
        fail_positions: bool,
        fail_cancel: bool,
        fail_submit: bool,
        hang_quote: bool,
        cancel_calls: AtomicUsize,
        submitted: Mutex<Vec<RebalanceOrder>>,
    }

    impl MockExchange {
        fn scenario(position: Decimal) -> Self {
            Self {
                position,
                balance: dec!(100000),
                quote: Some(MarketQuote::new(dec!(50000), dec!(50010))),
                ..Default::default()
            }
        }

        fn cancels(&self) -> usize {
            self.cancel_calls.load(Ordering::SeqCst)
        }

        fn submissions(&self) -> Vec<RebalanceOrder> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExchangeClient for MockExchange {
        async fn authenticate(&self, _credentials: &Credentials) -> Result<SessionToken> {
            if self.fail_auth {
                return Err(RebalanceError::Auth("401 Unauthorized".into()));
            }
            Ok(SessionToken::new("jwt"))
        }

        async fn get_positions(&self, _session: &SessionToken) -> Result<Vec<PositionEntry>> {
            if self.fail_positions {
                return Err(RebalanceError::fetch("positions", "503 Service Unavailable"));
            }
            Ok(vec![PositionEntry {
                instrument: "BTC-USD-PERP".into(),
                size: self.position,
            }])
        }

        async fn get_account_value(&self, _vault_id: &str) -> Result<Decimal> {
            Ok(self.balance)
        }

        async fn get_quote(&self, _instrument: &str) -> Result<MarketQuote> {
            if self.hang_quote {
                std::future::pending::<()>().await;
            }
            self.quote
                .ok_or_else(|| RebalanceError::fetch("quote", "no book"))
        }

        async fn cancel_all_orders(&self, _session: &SessionToken) -> Result<()> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_cancel {
                return Err(RebalanceError::Cancel("500".into()));
            }
            Ok(())
        }

        async fn submit_order(&self, _session: &SessionToken, order: &RebalanceOrder) -> Result<()> {
            if self.fail_submit {
                return Err(RebalanceError::Submit("post-only would cross".into()));
            }
            self.submitted.lock().unwrap().push(order.clone());
            Ok(())
        }
    }

    struct MockSignal(Option<Decimal>);

    #[async_trait]
    impl SignalSource for MockSignal {
        async fn latest_target(&self) -> Result<ExposureTarget> {
            self.0
                .ok_or_else(|| RebalanceError::SignalUnavailable("404".into()))
        }
    }

    fn driver_config() -> DriverConfig {
        DriverConfig {
            instrument: "BTC-USD-PERP".into(),
            vault_id: "0xvault".into(),
            client_id: "rebalancer".into(),
            credentials: Credentials::new("0xmanager", "key"),
            params: RebalanceParams::default(),
            timing: TimingConfig::default(),
        }
    }

    fn driver(exchange: MockExchange, target: Option<Decimal>) -> CycleDriver<MockExchange, MockSignal> {
        CycleDriver::new(driver_config(), exchange, MockSignal(target)).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_submits_buy_at_bid() {
        let mut driver = driver(MockExchange::scenario(dec!(48)), Some(dec!(0.5)));

        let outcome = driver.run_cycle().await.unwrap();

        let CycleOutcome::Submitted(order) = outcome else {
            panic!("expected an order");
        };
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.size, dec!(2));
        assert_eq!(order.price, dec!(50000));
        assert_eq!(order.client_id, "rebalancer-1");
        assert!(order.is_signed());

        assert_eq!(driver.exchange().cancels(), 1);
        assert_eq!(driver.exchange().submissions().len(), 1);
        assert_eq!(driver.metrics().orders_submitted(), 1);
    }

    #[tokio::test]
    async fn test_dust_cycle_still_cancels() {
        let mut driver = driver(MockExchange::scenario(dec!(50.001)), Some(dec!(0.5)));

        for _ in 0..3 {
            let outcome = driver.run_cycle().await.unwrap();
            assert_eq!(outcome, CycleOutcome::NoOrder);
        }

        // Exactly one cancel per cycle, never a submission
        assert_eq!(driver.exchange().cancels(), 3);
        assert!(driver.exchange().submissions().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_has_no_side_effects() {
        let mut exchange = MockExchange::scenario(dec!(48));
        exchange.fail_positions = true;
        let mut driver = driver(exchange, Some(dec!(0.5)));

        let result = driver.run_cycle().await;
        assert!(matches!(result, Err(RebalanceError::Fetch { .. })));
        assert_eq!(driver.exchange().cancels(), 0);
        assert!(driver.exchange().submissions().is_empty());
    }

    #[tokio::test]
    async fn test_signal_failure_has_no_side_effects() {
        let mut driver = driver(MockExchange::scenario(dec!(48)), None);

        let delay = driver.step().await;

        assert_eq!(delay, Duration::from_secs(30));
        assert_eq!(driver.exchange().cancels(), 0);
        assert_eq!(driver.metrics().failures("signal_unavailable"), 1);
    }

    #[tokio::test]
    async fn test_invalid_quote_aborts_before_acting() {
        let mut exchange = MockExchange::scenario(dec!(48));
        exchange.quote = Some(MarketQuote::new(dec!(50011), dec!(50010)));
        let mut driver = driver(exchange, Some(dec!(0.5)));

        let result = driver.run_cycle().await;
        assert!(matches!(result, Err(RebalanceError::InvalidQuote { .. })));
        assert_eq!(driver.exchange().cancels(), 0);
    }

    #[tokio::test]
    async fn test_cancel_failure_does_not_block_submission() {
        let mut exchange = MockExchange::scenario(dec!(50.02));
        exchange.fail_cancel = true;
        let mut driver = driver(exchange, Some(dec!(0.5)));

        let outcome = driver.run_cycle().await.unwrap();

        let CycleOutcome::Submitted(order) = outcome else {
            panic!("expected an order");
        };
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.price, dec!(50010));
        assert_eq!(driver.metrics().cancel_failures(), 1);
    }

    #[tokio::test]
    async fn test_step_delays() {
        let mut submitting = driver(MockExchange::scenario(dec!(48)), Some(dec!(0.5)));
        assert_eq!(submitting.step().await, Duration::from_secs(10));

        let mut idle = driver(MockExchange::scenario(dec!(50)), Some(dec!(0.5)));
        assert_eq!(idle.step().await, Duration::ZERO);

        let mut exchange = MockExchange::scenario(dec!(48));
        exchange.fail_submit = true;
        let mut rejected = driver(exchange, Some(dec!(0.5)));
        assert_eq!(rejected.step().await, Duration::from_secs(5));
        assert_eq!(rejected.metrics().failures("submit"), 1);
        assert_eq!(rejected.exchange().cancels(), 1);

        let mut exchange = MockExchange::scenario(dec!(48));
        exchange.fail_auth = true;
        let mut unauthorized = driver(exchange, Some(dec!(0.5)));
        assert_eq!(unauthorized.step().await, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_call_times_out() {
        let mut exchange = MockExchange::scenario(dec!(48));
        exchange.hang_quote = true;
        let mut driver = driver(exchange, Some(dec!(0.5)));

        let result = driver.run_cycle().await;
        assert!(matches!(
            result,
            Err(RebalanceError::Timeout { operation: "get_quote", .. })
        ));
        assert_eq!(driver.exchange().cancels(), 0);

        let delay = driver.step().await;
        assert_eq!(delay, Duration::from_secs(5));
        assert_eq!(driver.metrics().failures("timeout"), 1);
        assert_eq!(driver.cycle(), 2);
    }

    #[tokio::test]
    async fn test_missing_position_is_flat() {
        let exchange = MockExchange::scenario(dec!(48));
        let mut config = driver_config();
        config.instrument = "ETH-USD-PERP".into();
        let driver = CycleDriver::new(config, exchange, MockSignal(Some(dec!(0)))).unwrap();

        let inputs = driver.fetch().await.unwrap();
        assert_eq!(inputs.account.position_size, Decimal::ZERO);
        assert_eq!(inputs.account.balance_value, dec!(100000));
    }
}
