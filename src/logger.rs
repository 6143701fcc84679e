//! Terminal formatting of upstream exchanges at configurable verbosity.
//!
//! - Minimal: one line, nginx-style
//! - Compact: request and response arrows, httpie-style
//! - Verbose: framed block with token breakdown

use crate::claude::TokenUsage;
use crate::config::LogVerbosity;

const SEPARATOR: &str = "────────────────────────────────────────";

/// One call to the upstream chat API, as seen by the forwarder.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRecord {
    pub method: &'static str,
    pub url: String,
    pub model: String,
    /// `None` when the request never got a response.
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub usage: Option<TokenUsage>,
}

/// Format duration in human-readable form.
fn format_duration(ms: u64) -> String {
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}

/// Extract path from URL.
fn extract_path(url: &str) -> &str {
    url.find("://")
        .and_then(|i| url[i + 3..].find('/').map(|j| &url[i + 3 + j..]))
        .unwrap_or(url)
}

fn status_text(status: Option<u16>) -> &'static str {
    match status {
        Some(s) if (200..300).contains(&s) => "OK",
        Some(_) => "ERROR",
        None => "FAILED",
    }
}

/// Format an exchange for terminal output.
pub fn format_exchange(record: &ExchangeRecord, verbosity: LogVerbosity) -> String {
    let path = extract_path(&record.url);

    match verbosity {
        LogVerbosity::Minimal => format_minimal(record, path),
        LogVerbosity::Compact => format_compact(record, path),
        LogVerbosity::Verbose => format_verbose(record, path),
    }
}

fn format_minimal(record: &ExchangeRecord, path: &str) -> String {
    let status = record.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    let tokens = record
        .usage
        .map(|u| format!(" [{} tokens]", u.total()))
        .unwrap_or_default();

    format!(
        "{} {} {} {} {}{}",
        record.method,
        path,
        status,
        format_duration(record.duration_ms),
        record.model,
        tokens
    )
}

fn format_compact(record: &ExchangeRecord, path: &str) -> String {
    let request_line = format!("→ {} {} [{}]", record.method, path, record.model);

    let response_line = match record.status {
        Some(status) => {
            let tokens = record
                .usage
                .map(|u| format!(", {} in / {} out", u.input_tokens, u.output_tokens))
                .unwrap_or_default();
            format!(
                "← {} {} ({}{})",
                status,
                status_text(record.status),
                format_duration(record.duration_ms),
                tokens
            )
        }
        None => format!("← no response ({})", format_duration(record.duration_ms)),
    };

    format!("{}\n{}", request_line, response_line)
}

fn format_verbose(record: &ExchangeRecord, path: &str) -> String {
    let status = record.status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    let input = record
        .usage
        .map(|u| u.input_tokens.to_string())
        .unwrap_or_else(|| "-".to_string());
    let output = record
        .usage
        .map(|u| u.output_tokens.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{separator}\n\
         {method} {path}\n\
         Model: {model}\n\
         Status: {status} {status_text}\n\
         Timing: {duration} total\n\
         Tokens: {input} input, {output} output\n\
         {separator}",
        separator = SEPARATOR,
        method = record.method,
        path = path,
        model = record.model,
        status = status,
        status_text = status_text(record.status),
        duration = format_duration(record.duration_ms),
        input = input,
        output = output,
    )
}
