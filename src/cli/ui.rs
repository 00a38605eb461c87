use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats a fraction as a percentage, e.g. `0.0123` as `1.23%`.
pub fn format_percentage(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Creates a right-aligned percentage cell, red when negative.
pub fn percentage_cell(fraction: f64) -> Cell {
    let cell = Cell::new(format_percentage(fraction)).set_alignment(CellAlignment::Right);
    if fraction < 0.0 {
        cell.fg(Color::Red)
    } else {
        cell
    }
}

/// Creates a bold percentage cell for totals.
pub fn total_cell(fraction: f64) -> Cell {
    percentage_cell(fraction).add_attribute(Attribute::Bold)
}

/// Creates a dimmed placeholder for a cell no row contributed to.
pub fn empty_cell() -> Cell {
    Cell::new("-")
        .fg(Color::DarkGrey)
        .set_alignment(CellAlignment::Right)
}

/// Creates a new `indicatif::ProgressBar` spinner for stages of unknown length.
pub fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
