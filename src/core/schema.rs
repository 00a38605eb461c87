//! Checks a loaded table against the required-column contract and converts
//! each row into a typed [`HoldingRecord`].

use crate::core::error::ProcessError;
use crate::core::record::{Column, HoldingRecord, Table};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

const NULL_MARKERS: [&str; 5] = ["nan", "na", "n/a", "null", "none"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d-%b-%Y"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Validates `table` and returns its rows as typed records, in input order.
///
/// Checks run in order: emptiness, column presence (the first missing
/// required column is reported), then per-cell types row by row.
pub fn validate(table: &Table) -> Result<Vec<HoldingRecord>, ProcessError> {
    if table.is_empty() {
        return Err(ProcessError::EmptyTable);
    }

    let mut index = [0usize; 11];
    for (slot, column) in index.iter_mut().zip(Column::REQUIRED) {
        *slot = table
            .position(column.name())
            .ok_or_else(|| ProcessError::Schema {
                column: column.name().to_string(),
                found: table.columns.clone(),
            })?;
    }
    debug!("All required columns present");

    let records = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let reader = RowReader {
                row,
                number: i + 1,
                index: &index,
            };
            reader.record()
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(rows = records.len(), "Validated input table");
    Ok(records)
}

struct RowReader<'a> {
    row: &'a [String],
    number: usize,
    index: &'a [usize; 11],
}

impl RowReader<'_> {
    fn record(&self) -> Result<HoldingRecord, ProcessError> {
        Ok(HoldingRecord {
            scheme_code: self.integer(Column::SchemeCode)?,
            scheme_name: self.text(Column::SchemeName),
            month: self.month()?,
            month_end: self.month_end()?,
            instrument_name: self.text(Column::InstrumentName),
            holding: self.decimal(Column::Holding)?,
            instrument_sector: self.text(Column::InstrumentSector),
            sebi_mcap: self.decimal(Column::SebiMcap)?,
            sebi_mcap_type: self.text(Column::SebiMcapType),
            nse_symbol: self.text(Column::NseSymbol),
            price: self.price()?,
        })
    }

    // Required columns lead the `Column` enum, so the discriminant indexes `index`.
    fn raw(&self, column: Column) -> &str {
        self.row
            .get(self.index[column as usize])
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Text columns are kept exactly as read; grouping is whitespace-sensitive.
    fn text(&self, column: Column) -> String {
        self.raw(column).to_string()
    }

    fn non_null(&self, column: Column) -> Option<&str> {
        let value = self.raw(column).trim();
        if is_null(value) { None } else { Some(value) }
    }

    fn error(&self, column: Column, expected: &str) -> ProcessError {
        ProcessError::TypeCoercion {
            column: column.name().to_string(),
            row: self.number,
            value: self.raw(column).to_string(),
            expected: expected.to_string(),
        }
    }

    fn integer(&self, column: Column) -> Result<Option<i64>, ProcessError> {
        self.non_null(column)
            .map(|v| parse_integer(v).ok_or_else(|| self.error(column, "an integer")))
            .transpose()
    }

    fn decimal(&self, column: Column) -> Result<Option<f64>, ProcessError> {
        self.non_null(column)
            .map(|v| parse_decimal(v).ok_or_else(|| self.error(column, "a decimal number")))
            .transpose()
    }

    fn month(&self) -> Result<Option<u32>, ProcessError> {
        self.non_null(Column::Month)
            .map(|v| parse_month(v).ok_or_else(|| self.error(Column::Month, "a YYYYMM month")))
            .transpose()
    }

    fn month_end(&self) -> Result<NaiveDate, ProcessError> {
        self.non_null(Column::MonthEnd)
            .and_then(parse_month_end)
            .ok_or_else(|| self.error(Column::MonthEnd, "a date"))
    }

    fn price(&self) -> Result<Option<f64>, ProcessError> {
        match self.decimal(Column::Price)? {
            Some(p) if p < 0.0 => Err(self.error(Column::Price, "a non-negative price")),
            other => Ok(other),
        }
    }
}

fn is_null(value: &str) -> bool {
    value.is_empty() || NULL_MARKERS.iter().any(|m| value.eq_ignore_ascii_case(m))
}

/// Parses a finite decimal.
pub fn parse_decimal(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses an integer, also accepting spreadsheet-style whole floats such as `101.0`.
pub fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(i);
    }
    parse_decimal(value)
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Parses a `YYYYMM` month key.
pub fn parse_month(value: &str) -> Option<u32> {
    let month = u32::try_from(parse_integer(value)?).ok()?;
    (100_000..=999_999)
        .contains(&month)
        .then_some(month)
        .filter(|m| (1..=12).contains(&(m % 100)))
}

/// Parses a month-end date in any of the accepted layouts.
///
/// A bare `YYYYMM` is read as the last calendar day of that month.
pub fn parse_month_end(value: &str) -> Option<NaiveDate> {
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
    {
        return Some(date);
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
    {
        return Some(dt.date());
    }
    let month = parse_month(value)?;
    last_day_of_month((month / 100) as i32, month % 100)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .filter(|d| d.month() == month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn header() -> Vec<String> {
        Column::REQUIRED
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    fn row(values: [&str; 11]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn valid_row() -> Vec<String> {
        row([
            "101",
            "Bluechip Fund",
            "202505",
            "2025-05-31",
            "ABC Ltd",
            "10",
            "Banks",
            "150000",
            "Large Cap",
            "ABC",
            "100",
        ])
    }

    #[test]
    fn test_validate_valid_table() {
        let table = Table::new(header(), vec![valid_row()]);
        let records = validate(&table).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.scheme_code, Some(101));
        assert_eq!(r.month, Some(202505));
        assert_eq!(r.month_end, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap());
        assert_eq!(r.instrument_name, "ABC Ltd");
        assert_eq!(r.holding, Some(10.0));
        assert_eq!(r.price, Some(100.0));
    }

    #[test]
    fn test_validate_empty_table() {
        let table = Table::new(header(), vec![]);
        assert!(matches!(validate(&table), Err(ProcessError::EmptyTable)));
    }

    #[test]
    fn test_validate_missing_price_column() {
        let mut columns = header();
        columns.pop();
        let mut r = valid_row();
        r.pop();
        let table = Table::new(columns, vec![r]);
        match validate(&table) {
            Err(ProcessError::Schema { column, .. }) => assert_eq!(column, "Price"),
            other => panic!("Expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_reports_first_missing_column() {
        let columns = vec!["Price".to_string(), "Scheme Name".to_string()];
        let table = Table::new(columns, vec![vec!["1".to_string(), "x".to_string()]]);
        match validate(&table) {
            Err(ProcessError::Schema { column, found }) => {
                assert_eq!(column, "Scheme Code");
                assert_eq!(found.len(), 2);
            }
            other => panic!("Expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_columns_in_any_order() {
        let mut columns = header();
        columns.reverse();
        let mut r = valid_row();
        r.reverse();
        let table = Table::new(columns, vec![r]);
        let records = validate(&table).unwrap();
        assert_eq!(records[0].nse_symbol, "ABC");
        assert_eq!(records[0].scheme_name, "Bluechip Fund");
    }

    #[test]
    fn test_validate_null_numerics() {
        let mut r = valid_row();
        r[5] = "".to_string();
        r[10] = "NaN".to_string();
        let table = Table::new(header(), vec![r]);
        let records = validate(&table).unwrap();
        assert_eq!(records[0].holding, None);
        assert_eq!(records[0].price, None);
    }

    #[test]
    fn test_validate_bad_decimal_names_column_and_row() {
        let mut bad = valid_row();
        bad[5] = "ten".to_string();
        let table = Table::new(header(), vec![valid_row(), bad]);
        match validate(&table) {
            Err(ProcessError::TypeCoercion { column, row, value, .. }) => {
                assert_eq!(column, "Holding (%)");
                assert_eq!(row, 2);
                assert_eq!(value, "ten");
            }
            other => panic!("Expected type coercion error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let mut r = valid_row();
        r[10] = "-1".to_string();
        let table = Table::new(header(), vec![r]);
        assert!(matches!(
            validate(&table),
            Err(ProcessError::TypeCoercion { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_missing_month_end() {
        let mut r = valid_row();
        r[3] = "".to_string();
        let table = Table::new(header(), vec![r]);
        match validate(&table) {
            Err(ProcessError::TypeCoercion { column, .. }) => assert_eq!(column, "Month End"),
            other => panic!("Expected type coercion error, got {other:?}"),
        }
    }

    #[rstest]
    #[case(0, "12.5", "Scheme Code")]
    #[case(0, "ABC101", "Scheme Code")]
    #[case(2, "202513", "Month")]
    #[case(2, "202500", "Month")]
    #[case(2, "2025-05", "Month")]
    fn test_validate_rejects_bad_cell(
        #[case] index: usize,
        #[case] value: &str,
        #[case] column: &str,
    ) {
        let mut r = valid_row();
        r[index] = value.to_string();
        let table = Table::new(header(), vec![r]);
        match validate(&table) {
            Err(ProcessError::TypeCoercion {
                column: found,
                row,
                value: raw,
                ..
            }) => {
                assert_eq!(found, column);
                assert_eq!(row, 1);
                assert_eq!(raw, value);
            }
            other => panic!("Expected type coercion error, got {other:?}"),
        }
    }

    #[rstest]
    #[case("2025-05-31", 2025, 5, 31)]
    #[case("2025-05-31 00:00:00", 2025, 5, 31)]
    #[case("31-05-2025", 2025, 5, 31)]
    #[case("31/05/2025", 2025, 5, 31)]
    #[case("31-May-2025", 2025, 5, 31)]
    #[case("202505", 2025, 5, 31)]
    #[case("202402", 2024, 2, 29)]
    #[case("202412", 2024, 12, 31)]
    fn test_parse_month_end(#[case] input: &str, #[case] y: i32, #[case] m: u32, #[case] d: u32) {
        assert_eq!(
            parse_month_end(input),
            Some(NaiveDate::from_ymd_opt(y, m, d).unwrap())
        );
    }

    #[rstest]
    #[case("202513")]
    #[case("2025")]
    #[case("May 2025")]
    fn test_parse_month_end_rejects(#[case] input: &str) {
        assert_eq!(parse_month_end(input), None);
    }

    #[test]
    fn test_parse_integer_accepts_whole_floats() {
        assert_eq!(parse_integer("101"), Some(101));
        assert_eq!(parse_integer("101.0"), Some(101));
        assert_eq!(parse_integer("101.5"), None);
    }

    #[test]
    fn test_parse_decimal_rejects_non_finite() {
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal(" 1.5"), None);
        assert_eq!(parse_decimal("1.5"), Some(1.5));
    }
}
