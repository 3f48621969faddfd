//! Benchmarks for the tick-processing path
//!
//! Cost adjustment and table upsert dominate the per-tick work.

use clearing_arb::core::{CostModel, QuoteTable, QuoteUpdate, Side, Term};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

fn spot_update(symbol: &str, offer: i64, size: u64) -> QuoteUpdate {
    QuoteUpdate {
        symbol: symbol.to_string(),
        term: Term::Spot,
        bid: Decimal::ZERO,
        offer: Decimal::from(offer),
        size,
    }
}

fn bench_cost_adjust(c: &mut Criterion) {
    let model = CostModel::new(Decimal::new(15, 2), Decimal::new(8, 2));
    let price = Decimal::from(52294);

    c.bench_function("cost_adjust", |b| {
        b.iter(|| model.adjust(black_box(Side::Buy), black_box(price)))
    });
}

fn bench_table_upsert(c: &mut Criterion) {
    let symbols = ["ALUA", "BMA", "BYMA", "COME", "CRES", "GGAL", "PAMP", "YPFD"];

    c.bench_function("table_upsert_price_move", |b| {
        let mut table = QuoteTable::new();
        for s in symbols {
            table.upsert(&spot_update(s, 1000, 10));
        }
        let mut price = 1000;
        b.iter(|| {
            price += 1;
            for s in symbols {
                table.upsert(black_box(&spot_update(s, price, 10)));
            }
        })
    });
}

criterion_group!(benches, bench_cost_adjust, bench_table_upsert);
criterion_main!(benches);
