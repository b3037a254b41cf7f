//! JSON I/O handling for CLI
//!
//! - Input: one JSON fixture file
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read and parse a JSON fixture file
pub fn read_fixture<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::io_error(format!("failed to read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
