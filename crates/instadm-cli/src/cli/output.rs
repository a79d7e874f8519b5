use std::io::Write;

use anyhow::{Context, Result};
use instadm_core::SyncNotice;
use serde::Serialize;

fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize output")
}

/// Write `value` as one JSON document followed by a newline.
pub fn write_json<T: Serialize, W: Write>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    let json = render_json(value, pretty)?;
    writeln!(out, "{}", json).context("Failed to write output")?;
    out.flush().context("Failed to flush output")
}

pub fn format_notice(notice: &SyncNotice) -> String {
    format!("{}: {} ({})", notice.title, notice.description, notice.detail)
}
