use crate::cli::TickerArgs;
use crate::exit_codes;
use crate::output::JsonLines;
use std::time::Duration;
use streamblock_rs::{spawn_block, BlockSettings, IdAllocator, Ticker};

pub async fn execute(args: TickerArgs) -> i32 {
    if args.interval_ms == 0 {
        eprintln!("Error: --interval-ms must be at least 1");
        return exit_codes::INPUT_ERROR;
    }

    let mut out = match JsonLines::open(None) {
        Ok(out) => out,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let ids = IdAllocator::new();
    let ticker = Ticker::with_interval(&ids, Duration::from_millis(args.interval_ms));
    let (handle, mut outputs) = spawn_block(ticker, &BlockSettings::default());
    log::info!("Started {} every {}ms", handle.id(), args.interval_ms);

    let mut exit_code = exit_codes::SUCCESS;
    for _ in 0..args.count {
        let Some(tick) = outputs.outbound.recv().await else {
            eprintln!("Error: ticker stopped early");
            exit_code = exit_codes::EXECUTION_ERROR;
            break;
        };
        if let Err(e) = out.line(&tick) {
            eprintln!("Error: {}", e);
            exit_code = exit_codes::EXECUTION_ERROR;
            break;
        }
    }

    handle.quit();
    if let Err(e) = outputs.task.await {
        eprintln!("Error: ticker task failed: {}", e);
        exit_code = exit_codes::EXECUTION_ERROR;
    }
    exit_code
}
