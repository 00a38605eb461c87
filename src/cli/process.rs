use super::ui;
use crate::core::config::{AppConfig, OutputFormat};
use crate::core::pipeline::{self, GRAND_TOTAL};
use crate::core::pivot::GroupedSummary;
use crate::core::record::Section;
use crate::io::csv_table::TableLoader;
use crate::io::export::{default_output_path, writer_for};
use anyhow::Result;
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the `process` command.
#[derive(Debug, Clone)]
pub struct ProcessArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub show: bool,
}

impl GroupedSummary {
    pub fn display_as_table(&self, grand_totals: bool) -> String {
        let month_ends: Vec<_> = self.month_ends().collect();

        let mut table = ui::new_styled_table();
        let mut header = vec![ui::header_cell(self.key.column().name())];
        header.extend(
            month_ends
                .iter()
                .map(|d| ui::header_cell(&d.format("%b %Y").to_string())),
        );
        if grand_totals {
            header.push(ui::header_cell(GRAND_TOTAL));
        }
        table.set_header(header);

        for group in self.groups() {
            let mut row = vec![Cell::new(group)];
            row.extend(month_ends.iter().map(|d| {
                if self.contains(group, *d) {
                    ui::percentage_cell(self.value(group, *d))
                } else {
                    ui::empty_cell()
                }
            }));
            if grand_totals {
                row.push(ui::total_cell(self.row_total(group)));
            }
            table.add_row(row);
        }

        if grand_totals {
            let mut totals = vec![Cell::new(ui::style_text(GRAND_TOTAL, ui::StyleType::TotalLabel))];
            totals.extend(
                month_ends
                    .iter()
                    .map(|d| ui::total_cell(self.column_total(*d))),
            );
            totals.push(ui::total_cell(self.grand_total()));
            table.add_row(totals);
        }

        format!(
            "{}\n\n{table}",
            ui::style_text(self.key.section_name(), ui::StyleType::Title)
        )
    }
}

fn display_output_info(destination: &std::path::Path, sections: &[Section]) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Section"),
        ui::header_cell("Rows"),
        ui::header_cell("Columns"),
    ]);
    for (i, section) in sections.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&section.name),
            Cell::new(section.rows.len()),
            Cell::new(section.columns.len()),
        ]);
    }

    println!(
        "\nOutput saved to: {}\n",
        ui::style_text(&destination.display().to_string(), ui::StyleType::Title)
    );
    println!("{table}");
}

/// Loads, processes and exports one holdings file. Returns where the output went.
pub fn run(args: &ProcessArgs, config: &AppConfig, loader: &dyn TableLoader) -> Result<PathBuf> {
    let format = args.format.unwrap_or(config.output.format);
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input, format));
    info!(
        input = %args.input.display(),
        output = %destination.display(),
        ?format,
        "Starting processing pipeline"
    );

    let pb = ui::new_spinner();
    let result = (|| -> Result<_> {
        pb.set_message("Loading data...");
        let table = loader.load(&args.input)?;

        pb.set_message("Calculating contributions...");
        let output = pipeline::process(&table, config)?;

        pb.set_message("Saving output...");
        let sections = output.sections(config.output.grand_totals);
        writer_for(format).write(&destination, &sections)?;
        Ok((output, sections))
    })();
    pb.finish_and_clear();
    let (output, sections) = result?;

    if args.show {
        for summary in output.pivots.iter() {
            println!("\n{}", summary.display_as_table(config.output.grand_totals));
            ui::print_separator();
        }
    }
    display_output_info(&destination, &sections);
    println!(
        "{}",
        ui::style_text(
            &format!("{} rows processed", output.records.len()),
            ui::StyleType::Subtle
        )
    );

    Ok(destination)
}
