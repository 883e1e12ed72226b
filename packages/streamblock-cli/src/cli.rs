use clap::{Args, Parser, Subcommand};
use streamblock_rs::OverflowStrategy;

#[derive(Parser)]
#[command(
    name = "stblock",
    version,
    about = "Drive streamblock dataflow blocks from the command line",
    long_about = "Run timeseries and ticker blocks outside a dataflow engine.\n\
                  `run` feeds a timeseries block with an NDJSON script read from a file or stdin."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a timeseries block against an NDJSON script
    Run(RunArgs),
    /// Run a ticker block and print its ticks
    Ticker(TickerArgs),
    /// List the ports of each block kind
    Routes(RoutesArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// NDJSON script file (default: stdin)
    #[arg(long)]
    pub script: Option<String>,

    /// JSON settings file
    #[arg(long, env = "STBLOCK_SETTINGS")]
    pub settings: Option<String>,

    /// Outbound overflow policy (block, drop-newest)
    #[arg(long, env = "STBLOCK_OVERFLOW")]
    pub overflow: Option<OverflowStrategy>,

    /// Query timeout in milliseconds
    #[arg(long, env = "STBLOCK_QUERY_TIMEOUT_MS")]
    pub query_timeout_ms: Option<u64>,

    /// Largest window a rule may request
    #[arg(long)]
    pub max_window: Option<usize>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct TickerArgs {
    /// Tick period in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub interval_ms: u64,

    /// Number of ticks to print before quitting
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Args)]
pub struct RoutesArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
