//! Defaults for the standard mock scope, optionally loaded from TOML.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Conventional file name for a project's mock defaults.
pub const CONFIG_FILE_NAME: &str = "procmock.toml";

/// Behavior of the preconfigured interceptions in a standard scope.
///
/// Missing fields fall back to the defaults: uptime `0.0`, writes return
/// `true`, exit does not raise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MockConfig {
    /// Value returned by the intercepted uptime query, in seconds.
    pub uptime_secs: f64,

    /// Value returned by intercepted stdout/stderr writes.
    pub write_returns: bool,

    /// When set, the intercepted exit raises a fault with this message
    /// instead of returning.
    pub exit_fault: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            uptime_secs: 0.0,
            write_returns: true,
            exit_fault: None,
        }
    }
}

impl MockConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.uptime_secs.is_finite() || self.uptime_secs < 0.0 {
            return Err(anyhow!(
                "uptime_secs must be a finite, non-negative number (got {})",
                self.uptime_secs
            ));
        }
        if let Some(message) = &self.exit_fault
            && message.trim().is_empty()
        {
            return Err(anyhow!("exit_fault must not be empty when set"));
        }
        Ok(())
    }
}

/// Load mock defaults from a TOML file.
///
/// A missing file is not an error: the standard scope simply runs with
/// `MockConfig::default()`.
pub fn load_config(path: &Path) -> Result<MockConfig> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no mock config, using defaults");
            return Ok(MockConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read mock config {}", path.display()));
        }
    };
    let cfg: MockConfig = toml::from_str(&contents)
        .with_context(|| format!("mock config {} is not valid TOML", path.display()))?;
    cfg.validate()
        .with_context(|| format!("mock config {} rejected", path.display()))?;
    debug!(
        path = %path.display(),
        uptime_secs = cfg.uptime_secs,
        write_returns = cfg.write_returns,
        raises_on_exit = cfg.exit_fault.is_some(),
        "loaded mock config"
    );
    Ok(cfg)
}

/// Persist mock defaults. Readers never observe a half-written file: the
/// TOML goes to a hidden sibling first and is renamed over `path`.
pub fn write_config(path: &Path, cfg: &MockConfig) -> Result<()> {
    cfg.validate().context("refusing to write invalid mock config")?;
    let body = toml::to_string_pretty(cfg).context("encode mock config")?;

    let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("create mock config directory {}", dir.display()))?;
    }
    let file_name = path
        .file_name()
        .with_context(|| format!("mock config path {} has no file name", path.display()))?;
    let staging = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&staging, format!("{body}\n"))
        .with_context(|| format!("stage mock config {}", staging.display()))?;
    fs::rename(&staging, path)
        .with_context(|| format!("install mock config {}", path.display()))?;
    debug!(path = %path.display(), "wrote mock config");
    Ok(())
}
