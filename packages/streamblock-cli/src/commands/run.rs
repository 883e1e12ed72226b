use crate::cli::RunArgs;
use crate::exit_codes;
use crate::output::JsonLines;
use crate::script::{self, ScriptOp};
use crate::settings;
use serde_json::{json, Value};
use streamblock_rs::{
    spawn_block, BlockError, BlockFault, BlockHandle, BlockOutputs, IdAllocator, Timeseries,
};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

pub async fn execute(args: RunArgs) -> i32 {
    let settings = match settings::resolve_settings(&args) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let text = match read_script(args.script.as_deref()).await {
        Ok(t) => t,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let ops = match script::parse_script(&text) {
        Ok(ops) => ops,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let mut out = match JsonLines::open(args.output.as_deref()) {
        Ok(out) => out,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let ids = IdAllocator::new();
    let block = Timeseries::from_settings(&ids, &settings);
    let (handle, outputs) = spawn_block(block, &settings);
    let BlockOutputs {
        mut outbound,
        mut faults,
        task,
    } = outputs;
    log::info!("Spawned {} block {}", handle.kind(), handle.id());

    let mut exit_code = exit_codes::SUCCESS;

    for op in ops {
        let step = match op {
            ScriptOp::Send { route, msg } => match handle.send(&route, msg).await {
                // Wait until the loop has serviced the message so faults and
                // outbound messages line up with the op that caused them
                Ok(()) => barrier(&handle).await.map(|_| ()).map_err(Failure::Block),
                Err(e) => Err(Failure::Block(e)),
            },
            ScriptOp::Query { route } => match handle.query(&route).await {
                Ok(response) => out
                    .line(&json!({ "query": route, "response": response }))
                    .map_err(Failure::Output),
                Err(e) => Err(Failure::Block(e)),
            },
            ScriptOp::Quit => break,
        };
        let step = step.and_then(|_| {
            drain(&mut outbound, &mut faults, &mut out).map_err(Failure::Output)
        });
        if let Err(failure) = step {
            exit_code = failure.report();
            break;
        }
    }

    handle.quit();
    if let Err(e) = task.await {
        eprintln!("Error: block task failed: {}", e);
        exit_code = exit_codes::EXECUTION_ERROR;
    }
    // Events accepted before quit may still have produced output
    if let Err(e) = drain(&mut outbound, &mut faults, &mut out) {
        eprintln!("Error: {}", e);
        exit_code = exit_codes::EXECUTION_ERROR;
    }

    exit_code
}

enum Failure {
    Block(BlockError),
    Output(String),
}

impl Failure {
    /// Print the failure and pick the exit code
    fn report(self) -> i32 {
        match self {
            Failure::Block(e) => {
                eprintln!("Error: {}", e);
                match e {
                    BlockError::UnknownRoute(_) => exit_codes::INPUT_ERROR,
                    _ => exit_codes::EXECUTION_ERROR,
                }
            }
            Failure::Output(msg) => {
                eprintln!("Error: {}", msg);
                exit_codes::EXECUTION_ERROR
            }
        }
    }
}

async fn read_script(path: Option<&str>) -> Result<String, String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read script '{}': {}", path, e)),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|e| format!("Failed to read script from stdin: {}", e))?;
            Ok(text)
        }
    }
}

/// A read-only query that returns once every earlier event has been serviced
async fn barrier(handle: &BlockHandle) -> Result<Value, BlockError> {
    handle.query("rule").await
}

/// Write pending outbound messages and faults
fn drain(
    outbound: &mut mpsc::Receiver<Value>,
    faults: &mut mpsc::UnboundedReceiver<BlockFault>,
    out: &mut JsonLines,
) -> Result<(), String> {
    while let Ok(msg) = outbound.try_recv() {
        out.line(&json!({ "outbound": msg }))?;
    }
    while let Ok(fault) = faults.try_recv() {
        out.line(&fault_line(&fault))?;
    }
    Ok(())
}

fn fault_line(fault: &BlockFault) -> Value {
    json!({
        "fault": {
            "block": fault.block_id.to_string(),
            "kind": fault.kind,
            "route": fault.route,
            "error": fault.error.to_string(),
        }
    })
}
