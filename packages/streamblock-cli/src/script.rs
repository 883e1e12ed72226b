use serde::Deserialize;
use serde_json::Value;

/// One line of a `run` script
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// `{"op": "send", "route": "in", "msg": {...}}`
    Send {
        route: String,
        #[serde(default)]
        msg: Value,
    },
    /// `{"op": "query", "route": "fft"}`
    Query { route: String },
    /// `{"op": "quit"}`
    Quit,
}

/// Parse an NDJSON script. Blank lines and lines starting with `#` are skipped.
pub fn parse_script(text: &str) -> Result<Vec<ScriptOp>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("Script line {}: {}", i + 1, e))
        })
        .collect()
}
