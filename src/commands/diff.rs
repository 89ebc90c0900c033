use anyhow::{Context as _, Result};
use declarative::{Manifest, Snapshot, compute_diffs};

use crate::Context;
use crate::engine::differ;
use crate::state::SnapshotStore;
use crate::ui;

pub fn run(ctx: &Context, details: bool) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::validated_graph(&config)?;
    let plan = super::plan(&graph)?;
    let current = Snapshot::from_manifest(&Manifest::build(&graph, &plan))
        .context("Failed to snapshot manifest")?;

    let store = SnapshotStore::open()?;
    ui::header(&format!("Stack: {}", config.stack));

    let previous = match store.load(&config.stack)? {
        Some(saved) => {
            ui::kv(
                "last emit",
                &saved.emitted_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            saved.snapshot
        }
        None => {
            ui::info("No snapshot recorded yet, comparing against an empty stack");
            Snapshot::default()
        }
    };

    let diffs = compute_diffs(&previous, &current);
    differ::display_diff(&diffs, &previous, &current, details);
    Ok(())
}
