//! Formatted output helpers for CLI commands.

use volmount_common::types::BindSpec;

/// Renders bind specs one per line, or as a JSON array of strings.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_binds(binds: &[BindSpec], json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(serde_json::to_string(binds)?);
    }
    Ok(binds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Renders a `-v` flag per bind, ready to splice into a runtime command line.
#[must_use]
pub fn render_volume_flags(binds: &[BindSpec]) -> String {
    binds
        .iter()
        .map(|b| format!("-v {b}"))
        .collect::<Vec<_>>()
        .join(" ")
}
