//! Core decision logic: instruments, quotes, the quote table and cost model

pub mod costs;
pub mod instrument;
pub mod quote;
pub mod table;

pub use costs::CostModel;
pub use instrument::{Side, Term};
pub use quote::{CachedPrice, QuoteRow, QuoteUpdate};
pub use table::{QuoteTable, UpdateOutcome};
