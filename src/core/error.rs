use thiserror::Error;

/// Core error types for nftctx
#[derive(Debug, Error)]
pub enum Error {
    /// Engine handle could not be created or its buffers could not be enabled.
    ///
    /// Fatal for the context until a successful `refresh()`.
    #[error("Resource error: {0}")]
    Resource(String),

    /// The engine rejected a command. Carries the engine's error buffer.
    #[error("nftables error: {message}")]
    Command { message: String },

    /// Caller supplied malformed arguments; no engine call was made
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// The engine did not honor a requested mode change
    #[error("State error: {0}")]
    State(String),

    /// The last response is not valid JSON
    #[error("Format error: {0}")]
    Format(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or written
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors after which the context must be refreshed
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
    pub help_url: Option<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
            help_url: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }
}

/// Database of libnftables error patterns and their translations
pub struct NftablesErrorPattern;

impl NftablesErrorPattern {
    /// Matches an engine error buffer against known patterns and returns a
    /// user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        // Permission errors
        if lower.contains("permission denied") || lower.contains("operation not permitted") {
            return ErrorTranslation::new("Insufficient permissions to modify firewall rules")
                .with_suggestion("Run as root or grant CAP_NET_ADMIN to the process")
                .with_suggestion("Use --dry-run to validate commands without privileges")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Quick_reference-nftables_in_10_minutes");
        }

        // Cache initialization failed (common with insufficient permissions)
        if lower.contains("cache initialization failed") {
            return ErrorTranslation::new(
                "Failed to initialize nftables cache - insufficient privileges",
            )
            .with_suggestion("Listing the ruleset requires CAP_NET_ADMIN")
            .with_suggestion("Re-run the command as root")
            .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Troubleshooting");
        }

        // Syntax errors
        if lower.contains("syntax error") {
            return ErrorTranslation::new("Invalid command syntax")
                .with_suggestion("Check the statement against the nft(8) grammar")
                .with_suggestion("Each command must be on its own line")
                .with_suggestion("Quote strings containing spaces")
                .with_help(
                    "https://wiki.nftables.org/wiki-nftables/index.php/Simple_rule_management",
                );
        }

        // Missing object ("Could not process rule: No such file or directory")
        if lower.contains("no such file or directory") {
            return ErrorTranslation::new("Referenced table, chain, set or rule does not exist")
                .with_suggestion("List the ruleset to check the object name and family")
                .with_suggestion("Create the table or chain before adding to it")
                .with_suggestion("Handles change when objects are recreated; list with --flag handle");
        }

        // Duplicate object
        if lower.contains("file exists") || lower.contains("already exists") {
            return ErrorTranslation::new("Object already exists")
                .with_suggestion("Use 'add' instead of 'create' to ignore existing objects")
                .with_suggestion("Or delete the existing object first");
        }

        // Invalid expression type (common with protocol mismatches)
        if lower.contains("unknown expression type") || lower.contains("invalid expression") {
            return ErrorTranslation::new("Invalid rule expression - protocol or match type error")
                .with_suggestion("Ensure protocol matches the match type (e.g., TCP/UDP for ports)")
                .with_suggestion("Verify you're using correct nftables syntax")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Quick_reference-nftables_in_10_minutes");
        }

        // Resource busy
        if lower.contains("resource busy") || lower.contains("device or resource busy") {
            return ErrorTranslation::new("Firewall resource is busy")
                .with_suggestion("Another process may be modifying nftables")
                .with_suggestion("Objects in use (e.g. chains with jumps) cannot be deleted");
        }

        // Netlink errors
        if lower.contains("netlink") {
            return ErrorTranslation::new("Communication error with kernel netlink interface")
                .with_suggestion("Check kernel modules: lsmod | grep nf_tables")
                .with_suggestion("Load nf_tables module: sudo modprobe nf_tables")
                .with_suggestion("Avoid creating many contexts in quick succession; refresh one instead")
                .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Troubleshooting");
        }

        // Generic fallback
        ErrorTranslation::new(format!("Firewall error: {}", msg.trim()))
            .with_suggestion("Check the detailed error message for more information")
            .with_help("https://wiki.nftables.org/wiki-nftables/index.php/Troubleshooting")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
