//! Arbitrage engine
//!
//! Consumes the push-message stream one tick at a time: normalize, update
//! the quote table, and when an update moved a decision price on a
//! complete pair with liquidity on both legs, price the spread and hand it
//! to the dispatcher. Ticks are processed to completion in arrival order;
//! nothing else mutates the table.

use crate::broker::ExecutionClient;
use crate::core::{CostModel, QuoteRow, QuoteTable};
use crate::dispatch::OrderDispatcher;
use crate::feed::{MarketDataMessage, PushMessage};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Days used to annualize the two-day carry
const ANNUALIZATION_DAYS: u32 = 365;

/// Annualized net rate implied by the cost-adjusted spread, in percent,
/// rounded to 2 decimals
pub fn annualized_rate(forward_adjusted: Decimal, spot_adjusted: Decimal) -> Decimal {
    ((forward_adjusted / spot_adjusted - Decimal::ONE) / Decimal::TWO
        * Decimal::from(ANNUALIZATION_DAYS)
        * Decimal::ONE_HUNDRED)
        .round_dp(2)
}

/// The decision-and-execution engine
pub struct ArbitrageEngine<C> {
    table: Arc<RwLock<QuoteTable>>,
    costs: CostModel,
    tna_expected: Decimal,
    dispatcher: OrderDispatcher<C>,
    /// Originating-user tag that marks order reports as ours
    own_tag: String,
    /// Use the push-style submission path instead of inline confirmation
    streaming: bool,
}

impl<C: ExecutionClient> ArbitrageEngine<C> {
    pub fn new(
        table: Arc<RwLock<QuoteTable>>,
        costs: CostModel,
        tna_expected: Decimal,
        dispatcher: OrderDispatcher<C>,
        own_tag: String,
        streaming: bool,
    ) -> Self {
        Self {
            table,
            costs,
            tna_expected,
            dispatcher,
            own_tag,
            streaming,
        }
    }

    /// Shared handle to the quote table (read-only consumers)
    pub fn table(&self) -> Arc<RwLock<QuoteTable>> {
        self.table.clone()
    }

    /// Drain the push stream until the feed side closes
    pub async fn run(&mut self, mut rx: mpsc::Receiver<PushMessage>) {
        tracing::info!("engine running");
        while let Some(message) = rx.recv().await {
            self.on_message(message).await;
        }
        tracing::info!("push stream closed, engine stopping");
    }

    pub async fn on_message(&mut self, message: PushMessage) {
        match message {
            PushMessage::MarketData(md) => self.on_tick(&md).await,
            PushMessage::OrderReport { order_report } => {
                let tag = self.own_tag.clone();
                self.dispatcher.on_order_report(&order_report, &tag).await;
            }
        }
    }

    /// One tick: upsert and, when warranted, recalculate and maybe fire
    pub async fn on_tick(&mut self, md: &MarketDataMessage) {
        let Some(update) = md.normalize() else {
            tracing::debug!(symbol = %md.instrument_id.symbol, "unrecognized instrument, tick skipped");
            return;
        };
        let symbol = update.symbol.clone();

        let outcome = self.table.write().await.upsert(&update);
        tracing::debug!(%symbol, term = %update.term, ?outcome, "tick applied");

        if outcome.needs_recalc() {
            self.evaluate(&symbol).await;
        }
    }

    /// Price the pair and trigger dispatch when the rate clears the
    /// threshold. No-op unless both legs exist with nonzero size.
    async fn evaluate(&mut self, symbol: &str) {
        let triggered: Option<(QuoteRow, QuoteRow)> = {
            let mut table = self.table.write().await;
            let Some((si, fi)) = table.pair_indices(symbol) else {
                return;
            };
            if table.row(si).size == 0 || table.row(fi).size == 0 {
                return;
            }

            let spot_adjusted = table.row_mut(si).adjusted_price(&self.costs);
            let forward_adjusted = table.row_mut(fi).adjusted_price(&self.costs);
            if spot_adjusted.is_zero() {
                return;
            }

            let tna = annualized_rate(forward_adjusted, spot_adjusted);
            table.row_mut(si).tna = Some(tna);
            table.row_mut(fi).tna = Some(tna);
            tracing::info!(%symbol, %tna, "spread repriced");

            if tna >= self.tna_expected {
                Some((table.row(si).clone(), table.row(fi).clone()))
            } else {
                None
            }
        };

        let Some((spot, forward)) = triggered else {
            return;
        };

        let outcome = if self.streaming {
            self.dispatcher.prepare_and_send_streaming(&spot, &forward).await
        } else {
            self.dispatcher.prepare_and_send(&spot, &forward).await
        };
        tracing::info!(%symbol, ?outcome, "pair dispatched");
    }
}
