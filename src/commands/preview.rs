use anyhow::Result;

use crate::Context;
use crate::engine::planner;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::validated_graph(&config)?;
    let plan = super::plan(&graph)?.filter_by_target(&graph, target);

    if !ctx.quiet {
        ui::header(&format!("Stack: {}", graph.stack()));
        ui::kv("project", &config.project.id);
        ui::kv("region", &config.project.region);
        if let Some(t) = target {
            ui::kv("target", t);
        }
    }

    if let Some(t) = target
        && plan.is_empty()
    {
        ui::warn(&format!("No resources match target '{t}'"));
        return Ok(());
    }

    planner::display_plan(&graph, &plan);
    Ok(())
}
