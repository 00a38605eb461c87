//! Fixed schema of the holdings table and the generic table used at the I/O seam.

use chrono::NaiveDate;
use std::fmt::Display;

/// Every column the processor reads or writes, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    SchemeCode,
    SchemeName,
    Month,
    MonthEnd,
    InstrumentName,
    Holding,
    InstrumentSector,
    SebiMcap,
    SebiMcapType,
    NseSymbol,
    Price,
    StartPrice,
    MonthlyReturn,
    StartWeight,
    Contribution,
}

impl Column {
    /// Columns that must be present in the input, in spreadsheet order (A-K).
    pub const REQUIRED: [Column; 11] = [
        Column::SchemeCode,
        Column::SchemeName,
        Column::Month,
        Column::MonthEnd,
        Column::InstrumentName,
        Column::Holding,
        Column::InstrumentSector,
        Column::SebiMcap,
        Column::SebiMcapType,
        Column::NseSymbol,
        Column::Price,
    ];

    /// Columns appended by the derivation step (L-O).
    pub const DERIVED: [Column; 4] = [
        Column::StartPrice,
        Column::MonthlyReturn,
        Column::StartWeight,
        Column::Contribution,
    ];

    /// The fixed column with this exact header name, if any.
    pub fn from_name(name: &str) -> Option<Column> {
        Column::REQUIRED
            .into_iter()
            .chain(Column::DERIVED)
            .find(|c| c.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Column::SchemeCode => "Scheme Code",
            Column::SchemeName => "Scheme Name",
            Column::Month => "Month",
            Column::MonthEnd => "Month End",
            Column::InstrumentName => "Instrument Name",
            Column::Holding => "Holding (%)",
            Column::InstrumentSector => "Instrument Sector",
            Column::SebiMcap => "Instrument SEBI Mcap",
            Column::SebiMcapType => "Instrument SEBI Mcap Type",
            Column::NseSymbol => "NSE Symbol",
            Column::Price => "Price",
            Column::StartPrice => "Start Price",
            Column::MonthlyReturn => "Monthly Stock Return%",
            Column::StartWeight => "Start wt%",
            Column::Contribution => "Stock Monthly Contribution %",
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One validated input row.
///
/// Numeric fields are `None` where the source cell was null.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRecord {
    pub scheme_code: Option<i64>,
    pub scheme_name: String,
    pub month: Option<u32>,
    pub month_end: NaiveDate,
    pub instrument_name: String,
    pub holding: Option<f64>,
    pub instrument_sector: String,
    pub sebi_mcap: Option<f64>,
    pub sebi_mcap_type: String,
    pub nse_symbol: String,
    pub price: Option<f64>,
}

/// Month-over-month metrics computed for a single row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedMetrics {
    /// Price of the same instrument in its previous period.
    pub start_price: Option<f64>,
    /// `(price / start_price) - 1`, absent when it cannot be computed.
    pub monthly_return: Option<f64>,
    /// Previous period's holding as a 0-1 fraction, 0 when there is none.
    pub start_weight: f64,
    /// `start_weight * monthly_return`, 0 when either side is absent.
    pub contribution: f64,
}

/// An input row together with its derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub holding: HoldingRecord,
    pub metrics: DerivedMetrics,
}

impl EnrichedRecord {
    /// Typed output cell for one of the fixed columns.
    pub fn cell(&self, column: Column) -> Cell {
        let h = &self.holding;
        let m = &self.metrics;
        match column {
            Column::SchemeCode => Cell::from(h.scheme_code),
            Column::SchemeName => Cell::Text(h.scheme_name.clone()),
            Column::Month => Cell::from(h.month.map(i64::from)),
            Column::MonthEnd => Cell::Date(h.month_end),
            Column::InstrumentName => Cell::Text(h.instrument_name.clone()),
            Column::Holding => Cell::from(h.holding),
            Column::InstrumentSector => Cell::Text(h.instrument_sector.clone()),
            Column::SebiMcap => Cell::from(h.sebi_mcap),
            Column::SebiMcapType => Cell::Text(h.sebi_mcap_type.clone()),
            Column::NseSymbol => Cell::Text(h.nse_symbol.clone()),
            Column::Price => Cell::from(h.price),
            Column::StartPrice => Cell::from(m.start_price),
            Column::MonthlyReturn => Cell::from(m.monthly_return),
            Column::StartWeight => Cell::Number(m.start_weight),
            Column::Contribution => Cell::Number(m.contribution),
        }
    }
}

/// A single typed output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Cell::Empty, Cell::Integer)
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Raw table as produced by a loader: a header row and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// A named block of typed rows handed to a writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Section {
    /// File-system friendly form of the section name, e.g. `company_pivot`.
    pub fn slug(&self) -> String {
        self.name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_")
    }
}
