use crate::cli::RunArgs;
use std::path::Path;
use streamblock_rs::BlockSettings;

/// Load settings from `--settings` (if given) and apply flag overrides.
pub fn resolve_settings(args: &RunArgs) -> Result<BlockSettings, String> {
    let mut settings = match &args.settings {
        Some(path) => load_settings(Path::new(path))?,
        None => BlockSettings::default(),
    };

    if let Some(overflow) = args.overflow {
        settings.overflow = overflow;
    }
    if let Some(timeout) = args.query_timeout_ms {
        settings.query_timeout_ms = Some(timeout);
    }
    if let Some(max_window) = args.max_window {
        settings.max_window = max_window;
    }

    if settings.max_window == 0 {
        return Err("max_window must be at least 1".to_string());
    }

    Ok(settings)
}

pub fn load_settings(path: &Path) -> Result<BlockSettings, String> {
    if !path.exists() {
        return Err(format!("Settings file not found: {}", path.display()));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read settings file '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("Invalid settings file '{}': {}", path.display(), e))
}
