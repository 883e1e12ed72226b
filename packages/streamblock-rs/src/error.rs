use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Rule type error: {0}")]
    RuleType(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Path evaluation failed: {0}")]
    Eval(String),

    #[error("Unsupported value at '{path}': expected a number, found {found}")]
    UnsupportedValue { path: String, found: &'static str },

    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    #[error("Outbound buffer full, message dropped")]
    OutboundFull,

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Block terminated")]
    Terminated,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BlockError>;
