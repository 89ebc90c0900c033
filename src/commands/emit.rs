//! `emit` - hand the manifest to the reconciler

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{Manifest, Snapshot};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::Context;
use crate::checks;
use crate::state::{SavedSnapshot, SnapshotStore};
use crate::ui;

/// The manifest as written, stamped with its generation time
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmittedManifest<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    manifest: &'a Manifest,
}

pub fn run(ctx: &Context, output: Option<&Path>, no_snapshot: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::validated_graph(&config)?;

    let report = checks::run(&graph, &config);
    if report.has_errors() {
        for finding in report.errors() {
            ui::error(&super::check::describe(finding));
        }
        bail!("Policy checks failed, run 'cloudstack check' for details");
    }

    let plan = super::plan(&graph)?;
    let manifest = Manifest::build(&graph, &plan);
    let document = EmittedManifest {
        generated_at: Utc::now(),
        manifest: &manifest,
    };
    let json = serde_json::to_string_pretty(&document).context("Failed to serialize manifest")?;

    match output {
        None => println!("{json}"),
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
            log::debug!("Wrote manifest to {}", path.display());
        }
    }

    if !no_snapshot {
        let snapshot = Snapshot::from_manifest(&manifest).context("Failed to snapshot manifest")?;
        let store = SnapshotStore::open()?;
        let path = store.save(&SavedSnapshot::new(&config.stack, snapshot))?;
        log::info!("Recorded snapshot at {}", path.display());
    }

    // stdout carries the manifest itself
    if let Some(path) = output
        && !ctx.quiet
    {
        ui::success(&format!(
            "Emitted {} in {} to {}",
            ui::count(manifest.resources.len(), "resource"),
            ui::count(plan.waves.len(), "wave"),
            path.display()
        ));
    }

    Ok(())
}
