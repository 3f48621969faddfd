//! Durable record of completed legs
//!
//! A bounded channel feeds a single consumer task, so records land in
//! submission order and a slow write never stalls tick processing. Export
//! dumps the accumulated records to a CSV file.

use crate::core::{Side, Term};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Default export file name
pub const EXPORT_FILE: &str = "operaciones.csv";

/// Ledger failures
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One completed (or streamed) leg, as recorded
#[derive(Debug, Clone, PartialEq)]
pub struct LegRecord {
    pub id: Uuid,
    pub symbol: String,
    pub term: Term,
    pub side: Side,
    pub size: u64,
    /// Limit price the leg was submitted at
    pub price: Decimal,
    /// Frozen cost-adjusted price
    pub cost_adjusted: Decimal,
    pub tna: Option<Decimal>,
    pub client_order_id: Option<String>,
    pub recorded_at: OffsetDateTime,
}

impl LegRecord {
    pub fn new(
        symbol: String,
        term: Term,
        side: Side,
        size: u64,
        price: Decimal,
        cost_adjusted: Decimal,
        tna: Option<Decimal>,
        client_order_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            term,
            side,
            size,
            price,
            cost_adjusted,
            tna,
            client_order_id,
            recorded_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Cheap handle for producers; dropping a record on a full queue is logged,
/// never blocks the decision path
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<LegRecord>,
}

impl LedgerHandle {
    /// Fire-and-forget record hand-off
    pub fn record(&self, record: LegRecord) {
        if let Err(e) = self.tx.try_send(record) {
            tracing::warn!(target: "ledger", "dropping leg record: {}", e);
        }
    }
}

/// Shared view of everything recorded so far
pub type LedgerStore = Arc<Mutex<Vec<LegRecord>>>;

/// Spawn the consumer task; returns the producer handle and the store
pub fn spawn(capacity: usize) -> (LedgerHandle, LedgerStore) {
    let (tx, mut rx) = mpsc::channel::<LegRecord>(capacity);
    let store: LedgerStore = Arc::new(Mutex::new(Vec::new()));

    let sink = store.clone();
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            tracing::info!(
                target: "ledger",
                symbol = %record.symbol,
                term = %record.term,
                side = %record.side,
                size = record.size,
                "leg recorded"
            );
            sink.lock().push(record);
        }
    });

    (LedgerHandle { tx }, store)
}

/// Write all records to `path` as CSV, replacing any stale file
pub fn export(store: &LedgerStore, path: &Path) -> Result<usize, LedgerError> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id",
        "symbol",
        "term",
        "side",
        "size",
        "price",
        "cost_adjusted",
        "tna",
        "client_order_id",
        "recorded_at",
    ])?;

    let records = store.lock();
    for r in records.iter() {
        writer.write_record([
            r.id.to_string(),
            r.symbol.clone(),
            r.term.as_str().to_string(),
            r.side.as_str().to_string(),
            r.size.to_string(),
            r.price.to_string(),
            r.cost_adjusted.to_string(),
            r.tna.map(|v| v.to_string()).unwrap_or_default(),
            r.client_order_id.clone().unwrap_or_default(),
            r.recorded_at.format(&Rfc3339).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;

    Ok(records.len())
}
