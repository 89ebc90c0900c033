//! Loading and writing stack config files

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::schema::StackConfig;

/// Load a stack's config from `<config_dir>/stacks/<stack>.toml`
pub fn load(config_dir: &Path, stack: &str) -> Result<StackConfig> {
    paths::check_stack_name(stack)?;
    let path = paths::stack_file(config_dir, stack);
    if !path.exists() {
        bail!(
            "No config for stack '{}' at {}\n  Run 'cloudstack --stack {} config init' to create one",
            stack,
            path.display(),
            stack
        );
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    let mut config: StackConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
    config.stack = stack.to_string();

    if let Err(errors) = config.validate() {
        let details: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
        bail!(
            "Invalid config for stack '{}':\n{}",
            stack,
            details.join("\n")
        );
    }

    log::debug!("Loaded stack config from {}", path.display());
    Ok(config)
}

/// Write a stack's config, creating parent directories
pub fn save(config_dir: &Path, config: &StackConfig) -> Result<PathBuf> {
    paths::check_stack_name(&config.stack)?;
    let path = paths::stack_file(config_dir, &config.stack);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    log::debug!("Saved stack config to {}", path.display());
    Ok(path)
}

/// Write the starter config for a stack unless one exists
pub fn init(config_dir: &Path, stack: &str, force: bool) -> Result<PathBuf> {
    paths::check_stack_name(stack)?;
    let path = paths::stack_file(config_dir, stack);
    if path.exists() && !force {
        bail!(
            "Config already exists: {}\n  Use --force to overwrite",
            path.display()
        );
    }
    save(config_dir, &StackConfig::example(stack))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_stack_hints_init() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path(), "dev").unwrap_err();
        assert!(err.to_string().contains("config init"));
    }

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = init(dir.path(), "staging", false).unwrap();
        assert!(path.ends_with("stacks/staging.toml"));

        let config = load(dir.path(), "staging").unwrap();
        assert_eq!(config.stack, "staging");
        assert_eq!(config.project.region, "us-west1");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        init(dir.path(), "dev", false).unwrap();
        assert!(init(dir.path(), "dev", false).is_err());
        assert!(init(dir.path(), "dev", true).is_ok());
    }

    #[test]
    fn test_init_rejects_stack_names_that_escape_the_config_dir() {
        let root = TempDir::new().unwrap();
        let cfg = root.path().join("cfg");
        let err = init(&cfg, "../../escaped", false).unwrap_err();
        assert!(err.to_string().contains("Invalid stack name"));
        assert!(!root.path().join("escaped.toml").exists());
        assert!(!cfg.exists());
        assert!(load(&cfg, "../../escaped").is_err());
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = StackConfig::example("dev");
        config.cluster.master_cidr = "nope".to_string();
        save(dir.path(), &config).unwrap();

        let err = load(dir.path(), "dev").unwrap_err();
        assert!(err.to_string().contains("cluster.master_cidr"));
    }
}
