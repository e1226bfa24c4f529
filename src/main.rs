//! rowfilter - filter CSV tables with safe boolean expressions

use anyhow::Result;
use clap::{Parser as ClapParser, Subcommand};
use rowfilter::batch::{batch_run, BatchOptions};
use rowfilter::expression::ExprError;
use rowfilter::filter::{ExprFilter, FilterStage};
use rowfilter::table::{read_table, write_table};
use std::path::PathBuf;
use std::process::ExitCode;

/// Filter CSV tables with safe boolean expressions
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter a table by a safe boolean expression
    Filter {
        /// Input CSV file
        #[arg(long = "in", value_name = "CSV")]
        input: PathBuf,

        /// Output CSV file
        #[arg(long = "out", value_name = "CSV")]
        output: PathBuf,

        /// Filtering expression, e.g. "abs(dem_h-h_te_best_fit)<=3"
        ///
        /// Parentheses, calls, `not` and signs nest at most 48 levels deep,
        /// and the whole expression at most 200 levels deep.
        #[arg(long)]
        expr: String,

        /// Print filtering summary
        #[arg(long)]
        summary: bool,
    },

    /// Filter every matching CSV file of a folder
    Batch {
        /// Input folder
        #[arg(long)]
        in_dir: PathBuf,

        /// Output folder, files keep their names
        #[arg(long)]
        out_dir: PathBuf,

        /// File name pattern
        #[arg(long, default_value = "*.csv")]
        pattern: String,

        /// Filtering expression; files are copied through when omitted
        ///
        /// Parentheses, calls, `not` and signs nest at most 48 levels deep,
        /// and the whole expression at most 200 levels deep.
        #[arg(long)]
        expr: Option<String>,

        /// Write a per-file summary CSV
        #[arg(long, value_name = "CSV")]
        summary: Option<PathBuf>,

        /// Print one summary line per file
        #[arg(long)]
        print_summary: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Filter { .. } => "filter",
            Command::Batch { .. } => "batch",
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG overrides the level
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let name = args.command.name();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = if err.chain().any(|e| e.is::<ExprError>()) {
                "expression"
            } else {
                name
            };
            eprintln!("[rowfilter] {} error: {:#}", kind, err);
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Filter {
            input,
            output,
            expr,
            summary,
        } => {
            // Compile before touching any data
            let stage = ExprFilter::new(&expr)?;
            let table = read_table(&input)?;
            let (filtered, stats) = stage.apply(&table)?;
            write_table(&filtered, &output)?;

            if summary {
                println!("[rowfilter] filter summary: {}", stats);
            }
        }

        Command::Batch {
            in_dir,
            out_dir,
            pattern,
            expr,
            summary,
            print_summary,
        } => {
            let options = BatchOptions {
                pattern,
                expr,
                summary_csv: summary,
            };
            let records = batch_run(&in_dir, &out_dir, &options)?;

            if print_summary {
                for record in &records {
                    println!(
                        "[rowfilter] {}: N_in={} N_out={} pass_rate={:.3}",
                        record.file, record.n_in, record.n_out, record.pass_rate
                    );
                }
                println!("[rowfilter] batch summary: files={}", records.len());
            }
        }
    }

    Ok(())
}
