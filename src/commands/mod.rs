pub mod check;
pub mod config;
pub mod diff;
pub mod emit;
pub mod graph;
pub mod outputs;
pub mod preview;

use anyhow::{Context as _, Result, bail};
use declarative::{DeploymentPlan, ResourceGraph};
use std::path::PathBuf;

use crate::Context;
use crate::resource::ProviderCatalog;
use crate::schema::StackConfig;
use crate::{paths, stack, ui};

/// Resolved config directory for this invocation
pub fn config_dir(ctx: &Context) -> Result<PathBuf> {
    paths::config_dir(ctx.config_dir.as_deref())
}

/// Load the config of the selected stack
pub fn load_config(ctx: &Context) -> Result<StackConfig> {
    let dir = config_dir(ctx)?;
    crate::config::load(&dir, &ctx.stack)
}

/// Build the stack's graph without validating it
pub fn build_graph(config: &StackConfig) -> Result<ResourceGraph> {
    stack::build(config)
        .with_context(|| format!("Failed to declare stack '{}'", config.stack))
}

/// Build and validate the stack's graph, reporting every violation
pub fn validated_graph(config: &StackConfig) -> Result<ResourceGraph> {
    let graph = build_graph(config)?;

    if let Err(errors) = graph.validate(&ProviderCatalog, config) {
        for error in &errors {
            ui::error(&error.to_string());
        }
        bail!(
            "Stack '{}' is invalid ({})",
            config.stack,
            ui::count(errors.len(), "error")
        );
    }

    log::debug!("Validated {} declarations", graph.len());
    Ok(graph)
}

/// Plan the deployment waves of a validated graph
pub fn plan(graph: &ResourceGraph) -> Result<DeploymentPlan> {
    DeploymentPlan::from_graph(graph).context("Failed to plan deployment")
}
