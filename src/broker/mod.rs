//! Account state and the execution venue boundary
//!
//! The account owns the trading budget and the fee configuration. The
//! `ExecutionClient` trait is the seam between the dispatcher and the
//! venue's order entry; the REST implementation lives in `session`.

pub mod session;

pub use session::{RestExecutionClient, Session, SessionError};

use crate::core::Side;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Account-level failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("budget has to be greater than zero")]
    BudgetExhausted,
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Login credentials, read from the environment at startup
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub account: String,
}

impl Credentials {
    /// Read `ARB_USER`, `ARB_PASSWORD` and `ARB_ACCOUNT`
    pub fn from_env() -> Result<Self, AccountError> {
        let var = |name: &'static str| {
            std::env::var(name).map_err(|_| AccountError::MissingCredential(name))
        };
        Ok(Self {
            user: var("ARB_USER")?,
            password: var("ARB_PASSWORD")?,
            account: var("ARB_ACCOUNT")?,
        })
    }
}

/// Trading account: budget plus fee rates
///
/// The budget must stay strictly positive; every read re-validates it so a
/// drained account surfaces as an error at the next decision instead of a
/// silent negative balance.
#[derive(Debug, Clone)]
pub struct Account {
    budget: Decimal,
    commission_pct: Decimal,
    market_right_pct: Decimal,
}

impl Account {
    pub fn new(
        budget: Decimal,
        commission_pct: Decimal,
        market_right_pct: Decimal,
    ) -> Result<Self, AccountError> {
        if budget <= Decimal::ZERO {
            return Err(AccountError::BudgetExhausted);
        }
        Ok(Self {
            budget,
            commission_pct,
            market_right_pct,
        })
    }

    /// Current budget, validated > 0
    pub fn budget(&self) -> Result<Decimal, AccountError> {
        if self.budget <= Decimal::ZERO {
            return Err(AccountError::BudgetExhausted);
        }
        Ok(self.budget)
    }

    /// Debit the budget; refuses an assignment that would leave it <= 0
    pub fn try_debit(&mut self, amount: Decimal) -> Result<Decimal, AccountError> {
        let next = self.budget - amount;
        if next <= Decimal::ZERO {
            return Err(AccountError::BudgetExhausted);
        }
        self.budget = next;
        Ok(next)
    }

    pub fn commission_pct(&self) -> Decimal {
        self.commission_pct
    }

    pub fn market_right_pct(&self) -> Decimal {
        self.market_right_pct
    }
}

/// A limit order as the venue's order entry accepts it
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Full instrument id ("MERV - XMEV - TICKER - TERM")
    pub instrument: String,
    pub side: Side,
    pub size: u64,
    pub price: Decimal,
}

/// Venue-reported order status
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderStatus {
    /// Free-text status; `"Operada "` (trailing space) means filled
    pub text: String,
}

impl OrderStatus {
    /// Filled per the venue's literal status text
    pub fn is_filled(&self) -> bool {
        self.text == "Operada "
    }
}

/// Venue order-entry failures
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("order entry rejected: {0}")]
    Rejected(String),
    #[error("venue unreachable: {0}")]
    Transport(String),
}

/// Order entry seam between the dispatcher and the venue.
///
/// `submit` is the blocking-confirmation path: it returns the client order
/// id which `status`/`cancel` operate on. `submit_streaming` is
/// fire-and-forget: the fill outcome arrives later through the
/// order-report subscription.
#[allow(async_fn_in_trait)]
pub trait ExecutionClient {
    async fn submit(&self, order: &OrderRequest) -> Result<String, ExecutionError>;

    async fn status(&self, client_order_id: &str) -> Result<OrderStatus, ExecutionError>;

    async fn cancel(&self, client_order_id: &str) -> Result<(), ExecutionError>;

    /// Push-style submission; confirmation is delivered out of band
    async fn submit_streaming(&self, order: &OrderRequest) -> Result<(), ExecutionError>;
}
