use anyhow::{Context as _, Result};

use crate::Context;
use crate::cli::ConfigCommand;
use crate::{config, paths, ui};

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Init { force } => init(ctx, force),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    print!("{content}");
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    let dir = super::config_dir(ctx)?;
    println!("{}", paths::stack_file(&dir, &ctx.stack).display());
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let dir = super::config_dir(ctx)?;
    let path = config::init(&dir, &ctx.stack, force)?;

    ui::success(&format!("Wrote starter config for stack '{}'", ctx.stack));
    ui::kv("path", &path.display().to_string());
    if !ctx.quiet {
        ui::dim("Fill in [values] root-service-account and cicd-service-account before emitting");
    }
    Ok(())
}
