//! The quote table: ordered rows with a symbol index
//!
//! One row per (symbol, term). Rows for the same symbol are adjacent, spot
//! first, so the engine and dispatcher pair legs by index instead of
//! searching. Insertion at an interior index is an O(n) shift, fine at the
//! tens-of-symbols scale this bot watches.

use super::quote::{QuoteRow, QuoteUpdate};
use super::Term;
use std::collections::HashMap;
use std::fmt;

/// What an upsert did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// First sighting of the symbol; row appended at `index`
    NewSymbol { index: usize },
    /// Second term arrived; the symbol's pair is now complete and the
    /// spread must be recalculated
    PairCompleted { spot: usize, forward: usize },
    /// Decision price moved on an existing row; row replaced, spread must
    /// be recalculated
    PriceChanged { index: usize },
    /// Decision price unchanged (size-only churn); nothing touched
    Unchanged,
}

impl UpdateOutcome {
    /// Whether the engine should re-run the spread economics
    #[inline]
    pub fn needs_recalc(&self) -> bool {
        matches!(
            self,
            UpdateOutcome::PairCompleted { .. } | UpdateOutcome::PriceChanged { .. }
        )
    }
}

/// Ordered quote rows plus an O(1) symbol index
#[derive(Debug, Default)]
pub struct QuoteTable {
    rows: Vec<QuoteRow>,
    /// Symbol -> index of the symbol's first row
    index: HashMap<String, usize>,
}

impl QuoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[QuoteRow] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, index: usize) -> &QuoteRow {
        &self.rows[index]
    }

    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut QuoteRow {
        &mut self.rows[index]
    }

    /// Index of the row holding (symbol, term), if present.
    ///
    /// Adjacency keeps both candidate positions next to the symbol's first
    /// row, so this is two comparisons, not a scan.
    pub fn find(&self, symbol: &str, term: Term) -> Option<usize> {
        let first = *self.index.get(symbol)?;
        for i in [first, first + 1] {
            if let Some(row) = self.rows.get(i) {
                if row.symbol == symbol && row.term == term {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Indices of (spot, forward) for a symbol, only once both exist
    pub fn pair_indices(&self, symbol: &str) -> Option<(usize, usize)> {
        let spot = self.find(symbol, Term::Spot)?;
        let forward = self.find(symbol, Term::Forward)?;
        Some((spot, forward))
    }

    /// Both rows for a symbol in one call: (spot, forward)
    pub fn pair(&self, symbol: &str) -> Option<(&QuoteRow, &QuoteRow)> {
        let (s, f) = self.pair_indices(symbol)?;
        Some((&self.rows[s], &self.rows[f]))
    }

    /// Apply one normalized tick to the table.
    ///
    /// New symbols append; a new term for a known symbol is inserted so the
    /// pair sits spot-first; an update to an existing row only replaces it
    /// when the decision price actually moved. Replacement resets the row's
    /// cost cache and cached rate.
    pub fn upsert(&mut self, update: &QuoteUpdate) -> UpdateOutcome {
        let Some(&first) = self.index.get(&update.symbol) else {
            let index = self.rows.len();
            self.rows.push(QuoteRow::from_update(update));
            self.index.insert(update.symbol.clone(), index);
            return UpdateOutcome::NewSymbol { index };
        };

        if let Some(i) = self.find(&update.symbol, update.term) {
            if self.rows[i].decision_price() == update.decision_price() {
                return UpdateOutcome::Unchanged;
            }
            self.rows[i] = QuoteRow::from_update(update);
            return UpdateOutcome::PriceChanged { index: i };
        }

        // Second term for a known symbol: insert keeping spot before forward.
        let insert_at = match update.term {
            Term::Forward => first + 1,
            Term::Spot => first,
        };
        self.rows.insert(insert_at, QuoteRow::from_update(update));
        for slot in self.index.values_mut() {
            if *slot >= insert_at {
                *slot += 1;
            }
        }
        self.index.insert(update.symbol.clone(), first.min(insert_at));

        let (spot, forward) = match update.term {
            Term::Forward => (first, insert_at),
            Term::Spot => (insert_at, insert_at + 1),
        };
        UpdateOutcome::PairCompleted { spot, forward }
    }
}

impl fmt::Display for QuoteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<8} {:<6} {:>14} {:>14} {:>8} {:>14} {:>10}",
            "Symbol", "Term", "Bid", "Offer", "Size", "AdjPrice", "TNA"
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<8} {:<6} {:>14} {:>14} {:>8} {:>14} {:>10}",
                row.symbol,
                row.term.as_str(),
                row.bid.to_string(),
                row.offer.to_string(),
                row.size,
                row.cost_adjusted
                    .value()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                row.tna
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            )?;
        }
        Ok(())
    }
}
