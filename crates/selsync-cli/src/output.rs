//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use selsync_core::sync::{Response, Status};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a peer response
    ///
    /// Quiet mode prints only the text of a pull reply.
    pub fn print_response(&self, response: &Response) {
        match self.format {
            OutputFormat::Human => match response.status {
                Status::Ok if response.is_update() => {
                    println!(
                        "Selection: {}",
                        response.selection.as_deref().unwrap_or("CLIPBOARD")
                    );
                    println!("Node:      {}", response.node.as_deref().unwrap_or("?"));
                    if let Some(timestamp) = response.timestamp {
                        println!("Timestamp: {}", format_timestamp(timestamp));
                    }
                    println!();
                    println!("{}", response.text.as_deref().unwrap_or(""));
                }
                Status::Ok => println!("✓ Accepted by peer"),
                Status::Ignored => println!("Peer already has this or a newer value"),
                Status::Empty => println!("Peer has no value for this selection"),
                Status::Unauthorized => println!("✗ Peer rejected the shared secret"),
                Status::Error => println!(
                    "✗ Peer error: {}",
                    response.message.as_deref().unwrap_or("(no message)")
                ),
            },
            OutputFormat::Json => match serde_json::to_string(response) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to encode response: {}", e),
            },
            OutputFormat::Quiet => {
                if let Some(ref text) = response.text {
                    println!("{}", text);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Render a millisecond epoch timestamp as local time
pub fn format_timestamp(millis: i64) -> String {
    use chrono::{Local, TimeZone};

    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => format!("{} ({})", time.format("%Y-%m-%d %H:%M:%S%.3f"), millis),
        None => millis.to_string(),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ééééééééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
        assert_eq!(truncate_line("", 20), "");
    }

    #[test]
    fn test_format_timestamp_keeps_raw_value() {
        assert!(format_timestamp(1000).ends_with("(1000)"));
    }
}
