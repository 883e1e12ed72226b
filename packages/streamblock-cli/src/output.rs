use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// JSON sink for command output: stdout, or a file created up front.
///
/// Every record is flushed as soon as it is written, so a consumer reading a
/// pipe sees block output while the script is still running.
pub struct JsonLines {
    sink: Box<dyn Write>,
    target: String,
}

impl JsonLines {
    pub fn open(output_path: Option<&str>) -> Result<Self, String> {
        match output_path {
            Some(path) => {
                let file = File::create(path)
                    .map_err(|e| format!("Failed to create output file '{}': {}", path, e))?;
                Ok(Self {
                    sink: Box::new(BufWriter::new(file)),
                    target: format!("output file '{}'", path),
                })
            }
            None => Ok(Self {
                sink: Box::new(std::io::stdout()),
                target: "stdout".to_string(),
            }),
        }
    }

    /// Write one compact record followed by a newline
    pub fn line<T: Serialize>(&mut self, value: &T) -> Result<(), String> {
        let text = serde_json::to_string(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))?;
        self.write_record(&text)
    }

    /// Write one indented record followed by a newline
    pub fn pretty<T: Serialize>(&mut self, value: &T) -> Result<(), String> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {}", e))?;
        self.write_record(&text)
    }

    fn write_record(&mut self, text: &str) -> Result<(), String> {
        self.sink
            .write_all(text.as_bytes())
            .and_then(|_| self.sink.write_all(b"\n"))
            .and_then(|_| self.sink.flush())
            .map_err(|e| format!("Failed to write to {}: {}", self.target, e))
    }
}
