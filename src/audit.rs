//! Audit logging for submitted commands
//!
//! Records every command the CLI hands to the engine, whether it ran in
//! dry-run mode, and how it ended. Entries are JSON lines.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Types of auditable events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunCommand,
    CheckCommand,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Whether the operation succeeded
    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    /// Creates a new audit event
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }
}

/// Audit log writer
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Creates an audit log in the state directory
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::get_state_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Creates an audit log at an explicit path
    pub fn at(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Appends an event to the audit log
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub fn log(&self, event: &AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(event)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;

        Ok(())
    }

    /// Reads the most recent events from the log, newest first
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be read
    pub fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = std::fs::read_to_string(&self.log_path)?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .take(count)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(events)
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }
}

/// Logs a command submission
///
/// # Arguments
///
/// * `event_type` - `RunCommand` or `CheckCommand`
/// * `command` - Command text as submitted
/// * `flags` - Output flags active for the command
/// * `dry_run` - Whether dry-run mode was on
/// * `error` - Engine error text if the command failed
pub fn log_command(
    log: &AuditLog,
    event_type: EventType,
    command: &str,
    flags: u32,
    dry_run: bool,
    error: Option<String>,
) {
    let event = AuditEvent::new(
        event_type,
        error.is_none(),
        serde_json::json!({
            "command": command,
            "flags": flags,
            "dry_run": dry_run,
        }),
        error,
    );

    if let Err(e) = log.log(&event) {
        tracing::warn!("Failed to write audit log {:?}: {}", log.path(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_creation() {
        let event = AuditEvent::new(
            EventType::RunCommand,
            true,
            serde_json::json!({"command": "list ruleset"}),
            None,
        );

        assert!(event.success);
        assert!(event.error.is_none());
        assert_eq!(event.details["command"], "list ruleset");
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(
            EventType::CheckCommand,
            false,
            serde_json::json!({}),
            Some("syntax error".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("check_command"));
        assert!(json.contains("syntax error"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00Z","event_type":"run_command","success":true,"details":{},"error":null}"#;
        let event: AuditEvent = serde_json::from_str(json).unwrap();

        assert!(event.success);
        assert!(matches!(event.event_type, EventType::RunCommand));
    }

    #[test]
    fn test_log_command_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::at(dir.path().join("audit.log"));

        log_command(&log, EventType::RunCommand, "add table ip t", 8, false, None);
        log_command(
            &log,
            EventType::RunCommand,
            "add bogus",
            8,
            true,
            Some("Error: syntax error".to_string()),
        );
        log_command(&log, EventType::CheckCommand, "list ruleset", 0, true, None);

        let events = log.read_recent(10).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0].event_type, EventType::CheckCommand));
        assert!(!events[1].success);
        assert_eq!(events[1].details["dry_run"], true);
        assert_eq!(events[2].details["command"], "add table ip t");
        assert_eq!(events[2].details["flags"], 8);
    }
}
