//! Month-over-month metrics per instrument.
//!
//! Each instrument's rows form a chain ordered by month end; a row's
//! "previous period" is the row before it in that chain.
use crate::core::config::HoldingScale;
use crate::core::record::{DerivedMetrics, EnrichedRecord, HoldingRecord};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Appends derived metrics to every record, preserving input order.
pub fn derive(records: Vec<HoldingRecord>, scale: HoldingScale) -> Vec<EnrichedRecord> {
    let metrics = {
        let mut metrics = vec![DerivedMetrics::default(); records.len()];
        let chains = instrument_chains(&records);
        debug!(instruments = chains.len(), "Partitioned rows by instrument");

        for (name, chain) in &chains {
            for pair in chain.windows(2) {
                let (prev, curr) = (&records[pair[0]], &records[pair[1]]);
                if prev.month_end == curr.month_end {
                    warn!(
                        instrument = %name,
                        month_end = %curr.month_end,
                        "Duplicate month end for instrument, chaining in input order"
                    );
                }
                metrics[pair[1]] = period_metrics(prev, curr, scale);
            }
        }
        metrics
    };

    let enriched: Vec<EnrichedRecord> = records
        .into_iter()
        .zip(metrics)
        .map(|(holding, metrics)| EnrichedRecord { holding, metrics })
        .collect();
    info!(rows = enriched.len(), "Calculated derived columns");
    enriched
}

/// Row indices per instrument name, each sorted by month end.
///
/// Instruments come out in name order. The sort is stable, so rows sharing
/// a month end keep their input order.
fn instrument_chains(records: &[HoldingRecord]) -> BTreeMap<&str, Vec<usize>> {
    let mut chains: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        chains
            .entry(record.instrument_name.as_str())
            .or_default()
            .push(i);
    }
    for chain in chains.values_mut() {
        chain.sort_by_key(|&i| records[i].month_end);
    }
    chains
}

/// Metrics for `curr` given the preceding row `prev` of the same instrument.
fn period_metrics(prev: &HoldingRecord, curr: &HoldingRecord, scale: HoldingScale) -> DerivedMetrics {
    let start_price = prev.price;
    let monthly_return = monthly_return(curr.price, start_price);
    let start_weight = prev.holding.map_or(0.0, |h| {
        if h == 1.0 && scale == HoldingScale::Auto {
            warn!(
                instrument = %prev.instrument_name,
                "Holding of exactly 1 read as a fraction"
            );
        }
        scale.to_fraction(h)
    });
    DerivedMetrics {
        start_price,
        monthly_return,
        start_weight,
        contribution: contribution(start_weight, monthly_return),
    }
}

/// `(price / start_price) - 1`; absent when either price is missing or the start is 0.
pub fn monthly_return(price: Option<f64>, start_price: Option<f64>) -> Option<f64> {
    match (price, start_price) {
        (Some(p), Some(s)) if s != 0.0 => Some(p / s - 1.0),
        _ => None,
    }
}

/// Weight times return, exactly 0 when either operand is absent or zero.
pub fn contribution(start_weight: f64, monthly_return: Option<f64>) -> f64 {
    match monthly_return {
        Some(r) if r != 0.0 && start_weight != 0.0 => start_weight * r,
        _ => 0.0,
    }
}
