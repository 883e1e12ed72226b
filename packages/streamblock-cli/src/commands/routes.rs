use crate::cli::RoutesArgs;
use crate::exit_codes;
use crate::output::JsonLines;
use serde::Serialize;
use streamblock_rs::{Block, IdAllocator, Ticker, Timeseries};

#[derive(Serialize)]
struct BlockPorts {
    kind: &'static str,
    in_routes: &'static [&'static str],
    query_routes: &'static [&'static str],
    ticks: bool,
}

impl BlockPorts {
    fn of<B: Block>(block: &B) -> Self {
        Self {
            kind: block.kind(),
            in_routes: block.in_routes(),
            query_routes: block.query_routes(),
            ticks: block.tick_interval().is_some(),
        }
    }
}

pub fn execute(args: RoutesArgs) -> i32 {
    let ids = IdAllocator::new();
    let blocks = vec![
        BlockPorts::of(&Timeseries::new(&ids)),
        BlockPorts::of(&Ticker::new(&ids)),
    ];

    if args.json {
        let written = JsonLines::open(None).and_then(|mut out| out.pretty(&blocks));
        if let Err(e) = written {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("Block ports:\n");
        println!("  {:<12} {:<20} {:<36} {:<6}", "Kind", "In", "Query", "Timer");
        println!("  {}", "-".repeat(76));
        for b in &blocks {
            println!(
                "  {:<12} {:<20} {:<36} {:<6}",
                b.kind,
                join_or_dash(b.in_routes),
                join_or_dash(b.query_routes),
                if b.ticks { "yes" } else { "no" }
            );
        }
        println!();
        println!("Every block also accepts quit and owns one outbound port.");
    }

    exit_codes::SUCCESS
}

fn join_or_dash(routes: &[&str]) -> String {
    if routes.is_empty() {
        "-".to_string()
    } else {
        routes.join(",")
    }
}
