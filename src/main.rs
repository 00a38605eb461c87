use clap::{CommandFactory, Parser, Subcommand};
use mfcontrib::cli::{process::ProcessArgs, setup, ui};
use mfcontrib::core::config::OutputFormat;
use mfcontrib::core::log::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compute contributions and pivots for a holdings export
    Process {
        /// Holdings CSV with one row per scheme, instrument and month
        input: PathBuf,

        /// Output location, defaults to <input>_processed next to the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format, overrides the configured one
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Print the pivots to the terminal
        #[arg(short, long)]
        show: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup::setup(),
        Some(Commands::Process {
            input,
            output,
            format,
            show,
        }) => mfcontrib::run_command(
            mfcontrib::AppCommand::Process(ProcessArgs {
                input,
                output,
                format,
                show,
            }),
            cli.config_path.as_deref(),
        ),
        None => Cli::command().print_help().map_err(Into::into),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            ExitCode::FAILURE
        }
    }
}
