//! Centralized path resolution for cloudstack
//!
//! # Environment Variables
//!
//! - `CLOUDSTACK_CONFIG_DIR` - Override config directory (e.g., `~/infra/cloudstack`)
//! - `CLOUDSTACK_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `--config-dir` flag
//! 2. `CLOUDSTACK_CONFIG_DIR` environment variable
//! 3. `XDG_CONFIG_HOME/cloudstack` (if set)
//! 4. `~/.config/cloudstack`
//!
//! For state_dir():
//! 1. `CLOUDSTACK_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/cloudstack` (if set)
//! 3. `~/.local/state/cloudstack`

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CLOUDSTACK_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "CLOUDSTACK_STATE_DIR";

const APP_DIR: &str = "cloudstack";

/// Get the cloudstack config directory path
pub fn config_dir(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        let path = expand(&dir.to_string_lossy());
        log::debug!("Using config dir from --config-dir: {}", path.display());
        return Ok(path);
    }

    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the cloudstack state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Reject stack names that are not plain file stems
///
/// The stack name becomes part of every resource name and of the config and
/// snapshot file names, so it follows the resource naming rules.
pub fn check_stack_name(stack: &str) -> Result<()> {
    if !declarative::is_valid_name(stack) {
        bail!("Invalid stack name '{stack}': use ASCII letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Path of a stack's config file inside a config directory
pub fn stack_file(config_dir: &Path, stack: &str) -> PathBuf {
    config_dir.join("stacks").join(format!("{stack}.toml"))
}

/// Path of a stack's last emitted snapshot inside a state directory
pub fn snapshot_file(state_dir: &Path, stack: &str) -> PathBuf {
    state_dir.join("snapshots").join(format!("{stack}.json"))
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
