use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;
mod script;
mod settings;

use cli::Cli;

const LOG_ENV: &str = "STBLOCK_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let exit_code = match cli.command {
        cli::Command::Run(args) => commands::run::execute(args).await,
        cli::Command::Ticker(args) => commands::ticker::execute(args).await,
        cli::Command::Routes(args) => commands::routes::execute(args),
    };

    std::process::exit(exit_code);
}

/// `-v` flags win; otherwise `STBLOCK_LOG` (env_logger filter syntax), then `warn`.
fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "warn"));
    let flag_level = match verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    };
    if let Some(level) = flag_level {
        builder.filter_level(level);
    }
    builder
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();
}
