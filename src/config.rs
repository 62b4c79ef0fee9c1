use crate::core::error::{Error, Result};
use crate::core::flags::{FlagTable, OutputFlag};
use crate::core::view::View;
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "NFTCTX_CONFIG";

/// Defaults applied to every context the CLI creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output flags set before the first command
    #[serde(default)]
    pub default_flags: Vec<OutputFlag>,
    /// Start every session in dry-run mode
    #[serde(default)]
    pub dry_run: bool,
    /// View used when `--view` is not given
    #[serde(default)]
    pub view: View,
    /// Append every submitted command to the audit log (opt-in)
    #[serde(default)]
    pub audit_log: bool,
    /// Write tracing output to `nftctx.log` in the state dir instead of stderr
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_flags: Vec::new(),
            dry_run: false,
            view: View::Text,
            audit_log: false,
            log_to_file: false,
        }
    }
}

impl AppConfig {
    /// Bitmask of `default_flags` for the given library
    pub fn default_bits(&self, table: &FlagTable) -> u32 {
        table.combine(&self.default_flags)
    }
}

/// Location of the config file: `$NFTCTX_CONFIG`, else `config.json` in the data dir
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    get_data_dir().map(|mut p| {
        p.push("config.json");
        p
    })
}

/// Saves the config using an atomic write pattern.
/// 1. Writes to a temporary file created with mode 0o600.
/// 2. Flushes it to disk.
/// 3. Atomically renames it over the target path.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be written or renamed.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    // Create file with restrictive permissions from the start to prevent
    // race condition where file is briefly world-readable
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(&temp_path)?;

    file.write_all(json.as_bytes())?;
    file.sync_all()?;

    std::fs::rename(&temp_path, path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            Error::Config(
                "Disk full: cannot save configuration. Free up space and try again.".to_string(),
            )
        } else {
            Error::Io(e)
        }
    })
}

/// Loads a config file.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read and `Error::Config` if it
/// is not a valid config.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json)
        .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}

/// Loads a config file, treating a missing file as the defaults.
///
/// # Errors
///
/// Same as [`load_config_from`], except that a missing file is not an error.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig> {
    match load_config_from(path) {
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        other => other,
    }
}

/// Loads the config from [`config_path`].
///
/// Defaults are used when no config location exists or the file is missing.
///
/// # Errors
///
/// Returns the read or parse error of an existing file so the caller can
/// report it once logging is up.
pub fn load_config() -> Result<AppConfig> {
    match config_path() {
        Some(path) => load_config_or_default(&path),
        None => Ok(AppConfig::default()),
    }
}
