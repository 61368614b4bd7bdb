/// file: src/ui.rs
/// description: terminal presentation of state commits and notifications for the cli
use crate::sink::{EndpointHealth, Notifier, Severity, StateCommit, StateSink};
use chrono::Local;
use serde_json::json;

// ANSI color codes
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";
    pub const GRAY: &'static str = "\x1b[90m";
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Minimal,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "minimal" => OutputFormat::Minimal,
            _ => OutputFormat::Text,
        }
    }
}

/// Prints every commit and notification as one line on stdout.
pub struct TerminalReporter {
    format: OutputFormat,
    colored: bool,
}

impl TerminalReporter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    fn paint(&self, color: &'static str, text: &str) -> String {
        if self.colored {
            format!("{}{}{}{}", Colors::BOLD, color, text, Colors::RESET)
        } else {
            text.to_string()
        }
    }

    fn label(&self, color: &'static str, label: &str, message: &str) -> String {
        let time = Local::now().format("%H:%M:%S");
        match self.format {
            OutputFormat::Minimal => format!("{} {}", label, message),
            _ => {
                let time = if self.colored {
                    format!("{}{}{}", Colors::GRAY, time, Colors::RESET)
                } else {
                    time.to_string()
                };
                format!("{} {} {}", time, self.paint(color, &format!("[{}]", label)), message)
            }
        }
    }

    pub fn render_commit(&self, commit: &StateCommit) -> String {
        if self.format == OutputFormat::Json {
            return serde_json::to_string(commit).unwrap_or_else(|e| {
                json!({"commit": "unserializable", "error": e.to_string()}).to_string()
            });
        }

        match commit {
            StateCommit::NewBlock(block) => self.label(
                Colors::BRIGHT_BLUE,
                "BLOCK",
                &format!("height {}", block.height),
            ),
            StateCommit::AddTransaction(tx) => self.label(
                Colors::BRIGHT_GREEN,
                "TRANSACTION",
                &format!(
                    "{} {} {} fee {}",
                    format!("{:?}", tx.group).to_lowercase(),
                    tx.type_name,
                    tx.hash,
                    tx.max_fee
                ),
            ),
            StateCommit::RemoveTransaction { hash, group } => self.label(
                Colors::DIM,
                "REMOVED",
                &format!("{} {}", format!("{:?}", group).to_lowercase(), hash),
            ),
            StateCommit::EndpointStatus { endpoint, health } => {
                let color = match health {
                    EndpointHealth::Loading => Colors::BRIGHT_YELLOW,
                    EndpointHealth::Healthy => Colors::BRIGHT_GREEN,
                    EndpointHealth::Unhealthy => Colors::BRIGHT_RED,
                };
                let health = format!("{:?}", health).to_lowercase();
                self.label(color, "NODE", &format!("{} {}", endpoint, health))
            }
            StateCommit::NetworkProperties(properties) => self.label(
                Colors::BRIGHT_CYAN,
                "NETWORK",
                &format!(
                    "{} height {} generation hash {}",
                    properties.network_name.as_deref().unwrap_or("unknown"),
                    properties.height,
                    properties.generation_hash
                ),
            ),
            StateCommit::ResetNetworkProperties => {
                self.label(Colors::BRIGHT_RED, "NETWORK", "reset")
            }
            StateCommit::GenerationHashChanged { current, .. } => self.label(
                Colors::BRIGHT_MAGENTA,
                "NETWORK",
                &format!("switched to generation hash {}", current),
            ),
        }
    }

    pub fn render_notification(&self, message: &str, severity: Severity) -> String {
        if self.format == OutputFormat::Json {
            return json!({"notification": message, "severity": severity}).to_string();
        }
        match severity {
            Severity::Success => self.label(Colors::BRIGHT_GREEN, "NOTICE", message),
            Severity::Error => self.label(Colors::BRIGHT_RED, "ERROR", message),
        }
    }
}

impl StateSink for TerminalReporter {
    fn commit(&self, commit: StateCommit) {
        println!("{}", self.render_commit(&commit));
    }
}

impl Notifier for TerminalReporter {
    fn trigger(&self, message: &str, severity: Severity) {
        println!("{}", self.render_notification(message, severity));
    }
}
