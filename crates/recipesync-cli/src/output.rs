//! Command output in human or JSON form
//!
//! Human mode prints status lines and indented detail; JSON mode emits
//! structured payloads (detail lines are silent there, the payload carries
//! the data).

use serde_json::Value;

/// Output format selector, shared by every subcommand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }

    /// Confirmation line
    pub fn success(&self, message: &str) {
        match self {
            OutputFormat::Human => println!("\u{2713} {message}"),
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({"success": true, "message": message})
            ),
        }
    }

    /// Failure line, on stderr
    pub fn error(&self, message: &str) {
        match self {
            OutputFormat::Human => eprintln!("\u{2717} Error: {message}"),
            OutputFormat::Json => eprintln!(
                "{}",
                serde_json::json!({"success": false, "error": message})
            ),
        }
    }

    /// Warning line, on stderr
    pub fn warn(&self, message: &str) {
        match self {
            OutputFormat::Human => eprintln!("\u{26a0} Warning: {message}"),
            OutputFormat::Json => eprintln!(
                "{}",
                serde_json::json!({"level": "warning", "message": message})
            ),
        }
    }

    /// Indented detail line under a success header; silent in JSON mode
    pub fn detail(&self, message: &str) {
        if let OutputFormat::Human = self {
            println!("  {message}");
        }
    }

    /// Structured result payload; the human rendering is the caller's job
    pub fn payload(&self, value: &Value) {
        if let OutputFormat::Json = self {
            println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
        }
    }
}
