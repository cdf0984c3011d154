//! Output formatting for CLI commands

use serde::Serialize;
use std::fmt::Display;

/// Format output as JSON or human-readable text based on --json flag
pub fn format_output<T: Serialize + Display>(data: &T, json: bool) -> String {
    if json {
        serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
    } else {
        data.to_string()
    }
}
