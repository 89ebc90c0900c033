use anyhow::Result;

use crate::Context;
use crate::cli::GraphFormat;
use crate::engine::planner;

pub fn run(ctx: &Context, format: GraphFormat) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::validated_graph(&config)?;

    let rendered = match format {
        GraphFormat::Dot => planner::render_dot(&graph),
        GraphFormat::Text => planner::render_text(&graph, &super::plan(&graph)?),
    };
    print!("{rendered}");
    Ok(())
}
