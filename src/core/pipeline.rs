//! Composes the stages: validate, derive, aggregate, then lay out sections for export.
use crate::core::config::AppConfig;
use crate::core::derive::derive;
use crate::core::error::ProcessError;
use crate::core::pivot::{GroupedSummary, PivotSet};
use crate::core::record::{Cell, Column, EnrichedRecord, Section, Table};
use crate::core::schema::validate;
use tracing::{debug, info, warn};

pub const PROCESSED_DATA: &str = "Processed Data";
pub const GRAND_TOTAL: &str = "Grand Total";

/// Result of a full run: enriched rows and the three summaries built from them.
#[derive(Debug, Clone)]
pub struct ProcessedOutput {
    /// The loaded table. Its header and raw cells shape the processed section.
    pub source: Table,
    pub records: Vec<EnrichedRecord>,
    pub pivots: PivotSet,
}

/// Runs every stage over a loaded table. Fails fast on the first structural error.
pub fn process(table: &Table, config: &AppConfig) -> Result<ProcessedOutput, ProcessError> {
    let records = validate(table)?;
    let records = derive(records, config.holding_scale);
    let pivots = PivotSet::build(&records);
    info!(rows = records.len(), "Processing completed");
    Ok(ProcessedOutput {
        source: table.clone(),
        records,
        pivots,
    })
}

impl ProcessedOutput {
    /// Export sections in their fixed order: processed rows, then company,
    /// sector and market cap pivots.
    pub fn sections(&self, grand_totals: bool) -> Vec<Section> {
        let mut sections = vec![self.processed_section()];
        sections.extend(
            self.pivots
                .iter()
                .map(|summary| pivot_section(summary, grand_totals)),
        );
        sections
    }

    /// Input columns in input order, then the derived columns.
    ///
    /// Required columns are written from the validated record; any other
    /// input column passes through verbatim. An input column that shares a
    /// derived column's name is replaced by the derived one.
    fn processed_section(&self) -> Section {
        let source = &self.source;
        let layout: Vec<(usize, Option<Column>)> = source
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                let derived = Column::DERIVED.iter().any(|c| c.name() == name.as_str());
                if derived {
                    debug!(column = %name, "Input column replaced by derived column");
                }
                !derived
            })
            .map(|(j, name)| {
                // Only the first header with a required name is the validated one.
                let column = Column::from_name(name).filter(|_| source.position(name) == Some(j));
                (j, column)
            })
            .collect();

        let mut columns: Vec<String> = layout
            .iter()
            .map(|&(j, _)| source.columns[j].clone())
            .collect();
        columns.extend(Column::DERIVED.iter().map(|c| c.name().to_string()));

        let rows = self
            .records
            .iter()
            .zip(&source.rows)
            .map(|(record, raw)| {
                let mut row: Vec<Cell> = layout
                    .iter()
                    .map(|&(j, column)| match column {
                        Some(column) => record.cell(column),
                        None => match raw.get(j) {
                            Some(value) if !value.is_empty() => Cell::Text(value.clone()),
                            _ => Cell::Empty,
                        },
                    })
                    .collect();
                row.extend(Column::DERIVED.iter().map(|&c| record.cell(c)));
                row
            })
            .collect();

        Section {
            name: PROCESSED_DATA.to_string(),
            columns,
            rows,
        }
    }
}

/// Lays out a summary as a grid: one row per group, one column per month end.
pub fn pivot_section(summary: &GroupedSummary, grand_totals: bool) -> Section {
    let month_ends: Vec<_> = summary.month_ends().collect();
    if grand_totals && summary.has_group(GRAND_TOTAL) {
        warn!(
            key = %summary.key,
            "A group is named '{GRAND_TOTAL}' and shares its label with the totals row"
        );
    }

    let mut columns = vec![summary.key.column().name().to_string()];
    columns.extend(month_ends.iter().map(|d| d.format("%Y-%m-%d").to_string()));
    if grand_totals {
        columns.push(GRAND_TOTAL.to_string());
    }

    let mut rows: Vec<Vec<Cell>> = summary
        .groups()
        .map(|group| {
            let mut row = vec![Cell::Text(group.to_string())];
            row.extend(
                month_ends
                    .iter()
                    .map(|d| Cell::Number(summary.value(group, *d))),
            );
            if grand_totals {
                row.push(Cell::Number(summary.row_total(group)));
            }
            row
        })
        .collect();

    if grand_totals {
        let mut total = vec![Cell::Text(GRAND_TOTAL.to_string())];
        total.extend(
            month_ends
                .iter()
                .map(|d| Cell::Number(summary.column_total(*d))),
        );
        total.push(Cell::Number(summary.grand_total()));
        rows.push(total);
    }

    Section {
        name: summary.key.section_name().to_string(),
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(rows: &[[&str; 11]]) -> Table {
        Table::new(
            Column::REQUIRED.iter().map(|c| c.name().to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    fn sample() -> Table {
        table(&[
            ["1", "Fund", "202505", "202505", "ABC", "10", "Banks", "100", "Large Cap", "ABC", "100"],
            ["1", "Fund", "202506", "202506", "ABC", "12", "Banks", "100", "Large Cap", "ABC", "110"],
            ["1", "Fund", "202505", "202505", "XYZ", "5", "IT", "50", "Mid Cap", "XYZ", "200"],
            ["1", "Fund", "202506", "202506", "XYZ", "6", "IT", "50", "Mid Cap", "XYZ", "180"],
        ])
    }

    #[test]
    fn test_process_end_to_end() {
        let output = process(&sample(), &AppConfig::default()).unwrap();
        assert_eq!(output.records.len(), 4);
        assert_relative_eq!(output.records[1].metrics.contribution, 0.01, epsilon = 1e-12);
        assert_relative_eq!(output.records[3].metrics.contribution, -0.005, epsilon = 1e-12);
        assert_relative_eq!(output.pivots.market_cap.grand_total(), 0.005, epsilon = 1e-12);
    }

    #[test]
    fn test_process_propagates_schema_error() {
        let mut t = sample();
        t.columns[10] = "Close".to_string();
        assert!(matches!(
            process(&t, &AppConfig::default()),
            Err(ProcessError::Schema { .. })
        ));
    }

    #[test]
    fn test_sections_layout() {
        let output = process(&sample(), &AppConfig::default()).unwrap();
        let sections = output.sections(true);
        let names: Vec<_> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Processed Data", "Company Pivot", "Sector Pivot", "Market Cap Pivot"]
        );

        let processed = &sections[0];
        assert_eq!(processed.columns.len(), 15);
        assert_eq!(processed.columns[14], "Stock Monthly Contribution %");
        assert_eq!(processed.rows.len(), 4);
        assert_eq!(processed.rows[0][11], Cell::Empty);

        let company = &sections[1];
        assert_eq!(
            company.columns,
            vec!["Instrument Name", "2025-05-31", "2025-06-30", "Grand Total"]
        );
        assert_eq!(company.rows.len(), 3);
        assert_eq!(company.rows[0][0], Cell::Text("ABC".to_string()));
        assert_eq!(company.rows[2][0], Cell::Text("Grand Total".to_string()));
    }

    #[test]
    fn test_processed_section_keeps_extra_input_columns() {
        let mut t = sample();
        t.columns.insert(0, "ISIN".to_string());
        t.columns.push("Notes".to_string());
        for (i, row) in t.rows.iter_mut().enumerate() {
            row.insert(0, format!("INE00{i}"));
            row.push(String::new());
        }
        let output = process(&t, &AppConfig::default()).unwrap();
        let processed = &output.sections(true)[0];

        assert_eq!(processed.columns.len(), 17);
        assert_eq!(processed.columns[0], "ISIN");
        assert_eq!(processed.columns[1], "Scheme Code");
        assert_eq!(processed.columns[12], "Notes");
        assert_eq!(processed.columns[13], "Start Price");
        assert_eq!(processed.rows[1][0], Cell::Text("INE001".to_string()));
        assert_eq!(processed.rows[1][1], Cell::Integer(1));
        assert_eq!(processed.rows[1][12], Cell::Empty);
        assert_eq!(processed.rows[1][13], Cell::Number(100.0));
    }

    #[test]
    fn test_processed_section_follows_input_column_order() {
        let mut t = sample();
        t.columns.swap(0, 10);
        for row in t.rows.iter_mut() {
            row.swap(0, 10);
        }
        let output = process(&t, &AppConfig::default()).unwrap();
        let processed = &output.sections(false)[0];
        assert_eq!(processed.columns[0], "Price");
        assert_eq!(processed.columns[10], "Scheme Code");
        assert_eq!(processed.rows[0][0], Cell::Number(100.0));
    }

    #[test]
    fn test_input_column_named_like_derived_is_replaced() {
        let mut t = sample();
        t.columns.push("Start Price".to_string());
        for row in t.rows.iter_mut() {
            row.push("999".to_string());
        }
        let output = process(&t, &AppConfig::default()).unwrap();
        let processed = &output.sections(true)[0];
        assert_eq!(processed.columns.len(), 15);
        assert_eq!(processed.columns[11], "Start Price");
        assert_eq!(processed.rows[0][11], Cell::Empty);
        assert_eq!(processed.rows[1][11], Cell::Number(100.0));
    }

    #[test]
    fn test_group_named_grand_total_keeps_totals_row_last() {
        let mut t = sample();
        t.rows[0][4] = GRAND_TOTAL.to_string();
        t.rows[1][4] = GRAND_TOTAL.to_string();
        let output = process(&t, &AppConfig::default()).unwrap();
        assert!(output.pivots.company.has_group(GRAND_TOTAL));

        let company = &output.sections(true)[1];
        let labels: Vec<_> = company.rows.iter().map(|r| r[0].to_string()).collect();
        assert_eq!(labels, vec!["Grand Total", "XYZ", "Grand Total"]);
        assert_relative_eq!(
            output.pivots.company.grand_total(),
            0.005,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sections_without_grand_totals() {
        let output = process(&sample(), &AppConfig::default()).unwrap();
        let sections = output.sections(false);
        let sector = &sections[2];
        assert_eq!(sector.columns, vec!["Instrument Sector", "2025-05-31", "2025-06-30"]);
        assert_eq!(sector.rows.len(), 2);
    }
}
