//! Rolls per-row contributions up by a grouping column and month end.
use crate::core::record::{Column, EnrichedRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::{debug, info};

/// Columns a summary can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Instrument,
    Sector,
    MarketCapType,
}

impl GroupKey {
    pub fn column(&self) -> Column {
        match self {
            GroupKey::Instrument => Column::InstrumentName,
            GroupKey::Sector => Column::InstrumentSector,
            GroupKey::MarketCapType => Column::SebiMcapType,
        }
    }

    /// Name of the export section holding this summary.
    pub fn section_name(&self) -> &'static str {
        match self {
            GroupKey::Instrument => "Company Pivot",
            GroupKey::Sector => "Sector Pivot",
            GroupKey::MarketCapType => "Market Cap Pivot",
        }
    }

    fn value<'a>(&self, record: &'a EnrichedRecord) -> &'a str {
        match self {
            GroupKey::Instrument => &record.holding.instrument_name,
            GroupKey::Sector => &record.holding.instrument_sector,
            GroupKey::MarketCapType => &record.holding.sebi_mcap_type,
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// Summed contribution per (group, month end).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSummary {
    pub key: GroupKey,
    cells: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
    month_ends: BTreeSet<NaiveDate>,
}

impl GroupedSummary {
    /// Group values in sorted order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Month ends present anywhere in the table, oldest first.
    pub fn month_ends(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.month_ends.iter().copied()
    }

    /// Summed contribution for a cell, 0 where the pair never occurs.
    pub fn value(&self, group: &str, month_end: NaiveDate) -> f64 {
        self.cells
            .get(group)
            .and_then(|row| row.get(&month_end))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.cells.contains_key(group)
    }

    /// Whether any row contributed to this (group, month end) pair.
    pub fn contains(&self, group: &str, month_end: NaiveDate) -> bool {
        self.cells
            .get(group)
            .is_some_and(|row| row.contains_key(&month_end))
    }

    pub fn row_total(&self, group: &str) -> f64 {
        self.cells.get(group).map_or(0.0, |row| row.values().sum())
    }

    pub fn column_total(&self, month_end: NaiveDate) -> f64 {
        self.cells
            .values()
            .filter_map(|row| row.get(&month_end))
            .sum()
    }

    pub fn grand_total(&self) -> f64 {
        self.cells.values().flat_map(|row| row.values()).sum()
    }

    pub fn group_count(&self) -> usize {
        self.cells.len()
    }
}

/// Builds the summary for one grouping column.
pub fn summarize(records: &[EnrichedRecord], key: GroupKey) -> GroupedSummary {
    let mut cells: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    let mut month_ends = BTreeSet::new();

    for record in records {
        let month_end = record.holding.month_end;
        month_ends.insert(month_end);
        *cells
            .entry(key.value(record).to_string())
            .or_default()
            .entry(month_end)
            .or_insert(0.0) += record.metrics.contribution;
    }

    debug!(
        key = %key,
        groups = cells.len(),
        months = month_ends.len(),
        "Built grouped summary"
    );
    GroupedSummary {
        key,
        cells,
        month_ends,
    }
}

/// The three summaries exported alongside the processed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotSet {
    pub company: GroupedSummary,
    pub sector: GroupedSummary,
    pub market_cap: GroupedSummary,
}

impl PivotSet {
    /// Each summary is computed independently from the enriched rows.
    pub fn build(records: &[EnrichedRecord]) -> Self {
        let pivots = PivotSet {
            company: summarize(records, GroupKey::Instrument),
            sector: summarize(records, GroupKey::Sector),
            market_cap: summarize(records, GroupKey::MarketCapType),
        };
        info!(
            companies = pivots.company.group_count(),
            sectors = pivots.sector.group_count(),
            market_caps = pivots.market_cap.group_count(),
            "Created pivot tables"
        );
        pivots
    }

    /// Summaries in export order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupedSummary> {
        [&self.company, &self.sector, &self.market_cap].into_iter()
    }
}
