//! arch-table: print the architecture trait tables of this build

use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use vm_archdefs::arch::{self, check};
use vm_archdefs::TraitTable;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "arch-table")]
#[command(about = "Print the architecture trait table compiled into this build", long_about = None)]
struct Cli {
    /// Print the named table instead of the selected one
    #[arg(short, long)]
    arch: Option<String>,

    /// Print every known table
    #[arg(long, conflicts_with = "arch")]
    all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Re-run the table checker and fail on any defect
    #[arg(long)]
    check: bool,

    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Route `log` records from the library to stderr
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbose))
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {}", e))
}

fn print_table(table: &TraitTable, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => println!("{}\n", table),
        Format::Json => println!("{}", serde_json::to_string_pretty(table)?),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    log::info!(
        "vm-archdefs {} built with table `{}`",
        vm_archdefs::VERSION,
        arch::SELECTED.name
    );

    let tables: Vec<&TraitTable> = if cli.all {
        arch::ALL.iter().collect()
    } else if let Some(name) = &cli.arch {
        match arch::by_name(name) {
            Some(table) => vec![table],
            None => anyhow::bail!("unknown architecture table `{}`", name),
        }
    } else {
        vec![&arch::SELECTED]
    };

    for table in tables {
        if cli.check {
            check(table).map_err(|defect| anyhow::anyhow!("{}: {}", table.name, defect))?;
            log::debug!("{}: table ok", table.name);
        }
        print_table(table, cli.format)?;
    }
    Ok(())
}
