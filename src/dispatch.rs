//! Order dispatch: sizing, budget accounting and the two-leg lifecycle
//!
//! A triggered spread becomes a balanced buy/sell pair: buy the spot leg,
//! sell the forward leg, both at their raw decision prices and at a common
//! size. The buy leg is gated by the account budget; the debit happens at
//! submission time, before the fill is known, and is not rolled back on a
//! rejection.

use crate::broker::{Account, ExecutionClient, OrderRequest};
use crate::core::instrument::format_instrument;
use crate::core::{QuoteRow, Side, Term};
use crate::feed::OrderReport;
use crate::ledger::{LedgerHandle, LegRecord};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Lifecycle of one leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegStatus {
    Prepared,
    Sized,
    Submitted,
    Confirmed,
    Rejected,
    Cancelled,
}

/// One side of the paired order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLeg {
    pub symbol: String,
    pub term: Term,
    pub side: Side,
    /// Raw decision price the leg is submitted at
    pub price: Decimal,
    pub size: u64,
    /// Frozen cost-adjusted price (sizing and debit use this, not `price`)
    pub cost_adjusted: Decimal,
    pub tna: Option<Decimal>,
    pub client_order_id: Option<String>,
    pub status: LegStatus,
}

impl OrderLeg {
    /// Prepare a leg from its quote row; the row's cost cache must already
    /// be resolved by the time a trigger reaches the dispatcher
    fn prepare(row: &QuoteRow) -> Self {
        Self {
            symbol: row.symbol.clone(),
            term: row.term,
            side: row.leg_side(),
            price: row.decision_price(),
            size: row.size,
            cost_adjusted: row.cost_adjusted.value().unwrap_or_else(|| row.decision_price()),
            tna: row.tna,
            client_order_id: None,
            status: LegStatus::Prepared,
        }
    }

    fn request(&self) -> OrderRequest {
        OrderRequest {
            instrument: format_instrument(&self.symbol, self.term),
            side: self.side,
            size: self.size,
            price: self.price,
        }
    }

    fn to_record(&self) -> LegRecord {
        LegRecord::new(
            self.symbol.clone(),
            self.term,
            self.side,
            self.size,
            self.price,
            self.cost_adjusted,
            self.tna,
            self.client_order_id.clone(),
        )
    }
}

/// How a dispatch attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every leg went out (sync path: every leg confirmed)
    Completed { size: u64 },
    /// Affordable size came out to zero; nothing submitted, nothing debited
    InsufficientFunds,
    /// A submitted leg did not fill; it was cancelled and the remaining
    /// sibling abandoned
    LegNotFilled { symbol: String, side: Side },
    /// The venue failed mid-pair; legs already out stay as they are
    SubmitFailed,
}

/// Drives prepared pairs through submission against a venue client
pub struct OrderDispatcher<C> {
    client: C,
    account: Arc<Mutex<Account>>,
    ledger: LedgerHandle,
    /// Outcome of the most recent out-of-band order report
    last_report_filled: Option<bool>,
}

impl<C: ExecutionClient> OrderDispatcher<C> {
    pub fn new(client: C, account: Arc<Mutex<Account>>, ledger: LedgerHandle) -> Self {
        Self {
            client,
            account,
            ledger,
            last_report_filled: None,
        }
    }

    /// Last fill outcome seen on the order-report channel
    pub fn last_report_filled(&self) -> Option<bool> {
        self.last_report_filled
    }

    /// Common size, buy-leg affordability and the optimistic debit.
    ///
    /// Returns the final size, or None when the budget cannot cover a
    /// single unit (in which case nothing was debited).
    fn size_and_debit(&self, legs: &mut [OrderLeg; 2], mut size: u64) -> Option<u64> {
        for leg in legs.iter_mut() {
            if !leg.side.is_buy() {
                continue;
            }
            let budget = match self.account.lock().budget() {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(target: "dispatch", "budget unavailable: {}", e);
                    return None;
                }
            };
            if leg.cost_adjusted <= Decimal::ZERO {
                tracing::warn!(target: "dispatch", symbol = %leg.symbol, "degenerate buy price, pair aborted");
                return None;
            }
            let affordable = (budget / leg.cost_adjusted)
                .floor()
                .to_u64()
                .unwrap_or(0);
            size = size.min(affordable);
            if size == 0 {
                tracing::warn!(
                    target: "dispatch",
                    symbol = %leg.symbol,
                    %budget,
                    unit_cost = %leg.cost_adjusted,
                    "cannot afford a single unit, pair aborted"
                );
                return None;
            }
            let cost = leg.cost_adjusted * Decimal::from(size);
            if let Err(e) = self.account.lock().try_debit(cost) {
                tracing::warn!(target: "dispatch", "debit refused: {}", e);
                return None;
            }
        }
        for leg in legs.iter_mut() {
            leg.size = size;
            leg.status = LegStatus::Sized;
        }
        Some(size)
    }

    /// Submit both legs with inline confirmation.
    ///
    /// Buy leg first. A leg whose status query reports anything but filled
    /// is cancelled and the sibling never goes out. A venue error on the
    /// status query is logged and the pair carries on - the legs already
    /// out keep whatever state they reached.
    pub async fn prepare_and_send(&self, spot: &QuoteRow, forward: &QuoteRow) -> DispatchOutcome {
        let mut legs = [OrderLeg::prepare(spot), OrderLeg::prepare(forward)];
        let size = spot.size.min(forward.size);
        let Some(size) = self.size_and_debit(&mut legs, size) else {
            return DispatchOutcome::InsufficientFunds;
        };

        for leg in legs.iter_mut() {
            let request = leg.request();
            let client_id = match self.client.submit(&request).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(target: "dispatch", symbol = %leg.symbol, "submit failed: {}", e);
                    leg.status = LegStatus::Rejected;
                    return DispatchOutcome::SubmitFailed;
                }
            };
            leg.client_order_id = Some(client_id.clone());
            leg.status = LegStatus::Submitted;
            tracing::info!(
                target: "dispatch",
                symbol = %leg.symbol,
                side = %leg.side,
                size = leg.size,
                price = %leg.price,
                %client_id,
                "leg submitted"
            );

            match self.client.status(&client_id).await {
                Ok(status) if status.is_filled() => {
                    leg.status = LegStatus::Confirmed;
                    self.ledger.record(leg.to_record());
                }
                Ok(status) => {
                    tracing::warn!(
                        target: "dispatch",
                        symbol = %leg.symbol,
                        side = %leg.side,
                        text = %status.text,
                        "leg not filled, cancelling"
                    );
                    if let Err(e) = self.client.cancel(&client_id).await {
                        tracing::error!(target: "dispatch", "cancel failed: {}", e);
                    }
                    leg.status = LegStatus::Cancelled;
                    return DispatchOutcome::LegNotFilled {
                        symbol: leg.symbol.clone(),
                        side: leg.side,
                    };
                }
                Err(e) => {
                    // Status query failures never abort the pair.
                    tracing::error!(target: "dispatch", symbol = %leg.symbol, "status query failed: {}", e);
                }
            }
        }

        DispatchOutcome::Completed { size }
    }

    /// Submit both legs push-style; confirmation arrives later through the
    /// order-report channel and does not block the next tick
    pub async fn prepare_and_send_streaming(
        &self,
        spot: &QuoteRow,
        forward: &QuoteRow,
    ) -> DispatchOutcome {
        let mut legs = [OrderLeg::prepare(spot), OrderLeg::prepare(forward)];
        let size = spot.size.min(forward.size);
        let Some(size) = self.size_and_debit(&mut legs, size) else {
            return DispatchOutcome::InsufficientFunds;
        };

        for leg in legs.iter_mut() {
            let request = leg.request();
            if let Err(e) = self.client.submit_streaming(&request).await {
                tracing::error!(target: "dispatch", symbol = %leg.symbol, "submit failed: {}", e);
                leg.status = LegStatus::Rejected;
                return DispatchOutcome::SubmitFailed;
            }
            leg.status = LegStatus::Submitted;
            tracing::info!(
                target: "dispatch",
                symbol = %leg.symbol,
                side = %leg.side,
                size = leg.size,
                price = %leg.price,
                "leg submitted (streaming)"
            );
            self.ledger.record(leg.to_record());
        }

        DispatchOutcome::Completed { size }
    }

    /// Out-of-band order report: cancel non-fills of our own orders and
    /// remember the outcome for the next decision cycle
    pub async fn on_order_report(&mut self, report: &OrderReport, own_tag: &str) {
        if report.originating_username.as_deref() != Some(own_tag) {
            return;
        }
        let filled = report.text.trim() == "Operada";
        if !filled {
            tracing::warn!(
                target: "dispatch",
                client_order_id = %report.client_order_id,
                text = %report.text,
                "reported not filled, cancelling"
            );
            if let Err(e) = self.client.cancel(&report.client_order_id).await {
                tracing::error!(target: "dispatch", "cancel failed: {}", e);
            }
        }
        self.last_report_filled = Some(filled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{ExecutionError, OrderStatus};
    use crate::core::quote::QuoteUpdate;
    use crate::core::CostModel;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[derive(Default)]
    struct StubInner {
        submissions: Mutex<Vec<OrderRequest>>,
        cancels: Mutex<Vec<String>>,
        statuses: Mutex<VecDeque<OrderStatus>>,
        next_id: AtomicU32,
    }

    /// Scripted venue: statuses are served in order, one per query
    #[derive(Clone, Default)]
    struct StubClient(Arc<StubInner>);

    impl StubClient {
        fn script_status(&self, text: &str) {
            self.0
                .statuses
                .lock()
                .push_back(OrderStatus { text: text.to_string() });
        }

        fn submissions(&self) -> Vec<OrderRequest> {
            self.0.submissions.lock().clone()
        }

        fn cancels(&self) -> Vec<String> {
            self.0.cancels.lock().clone()
        }
    }

    impl ExecutionClient for StubClient {
        async fn submit(&self, order: &OrderRequest) -> Result<String, ExecutionError> {
            self.0.submissions.lock().push(order.clone());
            let id = self.0.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(format!("ord-{id}"))
        }

        async fn status(&self, _client_order_id: &str) -> Result<OrderStatus, ExecutionError> {
            self.0
                .statuses
                .lock()
                .pop_front()
                .ok_or_else(|| ExecutionError::Transport("no scripted status".to_string()))
        }

        async fn cancel(&self, client_order_id: &str) -> Result<(), ExecutionError> {
            self.0.cancels.lock().push(client_order_id.to_string());
            Ok(())
        }

        async fn submit_streaming(&self, order: &OrderRequest) -> Result<(), ExecutionError> {
            self.0.submissions.lock().push(order.clone());
            Ok(())
        }
    }

    /// Quote pair matching the worked example: spot offered at 52294.0,
    /// forward bid at 95620.0, eight units on each side
    fn pair(spot_size: u64, forward_size: u64) -> (QuoteRow, QuoteRow) {
        let model = CostModel::new(dec("0.15"), dec("0.08"));
        let mut spot = QuoteRow::from_update(&QuoteUpdate {
            symbol: "ALUA".to_string(),
            term: Term::Spot,
            bid: Decimal::ZERO,
            offer: dec("52294.0"),
            size: spot_size,
        });
        let mut forward = QuoteRow::from_update(&QuoteUpdate {
            symbol: "ALUA".to_string(),
            term: Term::Forward,
            bid: dec("95620.0"),
            offer: Decimal::ZERO,
            size: forward_size,
        });
        spot.adjusted_price(&model);
        forward.adjusted_price(&model);
        (spot, forward)
    }

    fn account(budget: &str) -> Arc<Mutex<Account>> {
        Arc::new(Mutex::new(
            Account::new(dec(budget), dec("0.15"), dec("0.08")).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_dispatch_with_sufficient_budget() {
        let client = StubClient::default();
        client.script_status("Operada ");
        client.script_status("Operada ");
        let account = account("90000");
        let (ledger, store) = crate::ledger::spawn(8);
        let dispatcher = OrderDispatcher::new(client.clone(), account.clone(), ledger);

        let (spot, forward) = pair(8, 8);
        // Adjusted buy price 52439.53 -> exactly one unit affordable.
        let outcome = dispatcher.prepare_and_send(&spot, &forward).await;
        assert_eq!(outcome, DispatchOutcome::Completed { size: 1 });

        let submissions = client.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].side, Side::Buy);
        assert_eq!(submissions[0].price, dec("52294.0"));
        assert_eq!(submissions[0].size, 1);
        assert_eq!(submissions[1].side, Side::Sell);
        assert_eq!(submissions[1].price, dec("95620.0"));
        assert_eq!(submissions[1].size, 1);

        // Debited by the adjusted price, not the raw one.
        assert_eq!(account.lock().budget().unwrap(), dec("90000") - dec("52439.53"));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_insufficient_funds_submits_nothing() {
        let client = StubClient::default();
        let account = account("50000");
        let (ledger, store) = crate::ledger::spawn(8);
        let dispatcher = OrderDispatcher::new(client.clone(), account.clone(), ledger);

        let (spot, forward) = pair(8, 8);
        let outcome = dispatcher.prepare_and_send(&spot, &forward).await;
        assert_eq!(outcome, DispatchOutcome::InsufficientFunds);
        assert!(client.submissions().is_empty());
        assert_eq!(account.lock().budget().unwrap(), dec("50000"));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(store.lock().is_empty());
    }

    #[tokio::test]
    async fn test_sell_leg_rejection_cancels_and_keeps_debit() {
        let client = StubClient::default();
        client.script_status("Operada ");
        client.script_status("Pendiente de operar");
        let account = account("90000");
        let (ledger, store) = crate::ledger::spawn(8);
        let dispatcher = OrderDispatcher::new(client.clone(), account.clone(), ledger);

        let (spot, forward) = pair(8, 8);
        let outcome = dispatcher.prepare_and_send(&spot, &forward).await;
        assert_eq!(
            outcome,
            DispatchOutcome::LegNotFilled {
                symbol: "ALUA".to_string(),
                side: Side::Sell,
            }
        );

        // Both legs went out, the second was cancelled.
        assert_eq!(client.submissions().len(), 2);
        assert_eq!(client.cancels(), vec!["ord-1".to_string()]);

        // The optimistic debit stays debited.
        assert_eq!(account.lock().budget().unwrap(), dec("90000") - dec("52439.53"));

        // Only the confirmed buy leg reached the ledger.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let records = store.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].side, Side::Buy);
    }

    #[tokio::test]
    async fn test_size_is_min_of_legs_and_affordability() {
        let client = StubClient::default();
        client.script_status("Operada ");
        client.script_status("Operada ");
        let account = account("1000000");
        let (ledger, _store) = crate::ledger::spawn(8);
        let dispatcher = OrderDispatcher::new(client.clone(), account, ledger);

        let (spot, forward) = pair(8, 3);
        let outcome = dispatcher.prepare_and_send(&spot, &forward).await;
        assert_eq!(outcome, DispatchOutcome::Completed { size: 3 });
        assert!(client.submissions().iter().all(|o| o.size == 3));
    }

    #[tokio::test]
    async fn test_streaming_path_records_without_confirmation() {
        let client = StubClient::default();
        let account = account("90000");
        let (ledger, store) = crate::ledger::spawn(8);
        let dispatcher = OrderDispatcher::new(client.clone(), account, ledger);

        let (spot, forward) = pair(8, 8);
        let outcome = dispatcher.prepare_and_send_streaming(&spot, &forward).await;
        assert_eq!(outcome, DispatchOutcome::Completed { size: 1 });
        assert_eq!(client.submissions().len(), 2);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_order_report_filters_and_cancels() {
        let client = StubClient::default();
        let account = account("90000");
        let (ledger, _store) = crate::ledger::spawn(8);
        let mut dispatcher = OrderDispatcher::new(client.clone(), account, ledger);

        // Someone else's report is ignored.
        let foreign = OrderReport {
            client_order_id: "x-1".to_string(),
            text: "Rechazada".to_string(),
            originating_username: Some("OTHER".to_string()),
        };
        dispatcher.on_order_report(&foreign, "PBCP").await;
        assert!(client.cancels().is_empty());
        assert_eq!(dispatcher.last_report_filled(), None);

        // Our non-fill gets a compensating cancel.
        let ours = OrderReport {
            client_order_id: "ord-7".to_string(),
            text: "Rechazada".to_string(),
            originating_username: Some("PBCP".to_string()),
        };
        dispatcher.on_order_report(&ours, "PBCP").await;
        assert_eq!(client.cancels(), vec!["ord-7".to_string()]);
        assert_eq!(dispatcher.last_report_filled(), Some(false));

        // A fill just records the outcome.
        let filled = OrderReport {
            client_order_id: "ord-8".to_string(),
            text: "Operada".to_string(),
            originating_username: Some("PBCP".to_string()),
        };
        dispatcher.on_order_report(&filled, "PBCP").await;
        assert_eq!(client.cancels().len(), 1);
        assert_eq!(dispatcher.last_report_filled(), Some(true));
    }
}
