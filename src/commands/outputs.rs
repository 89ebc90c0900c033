use anyhow::Result;
use colored::Colorize;
use declarative::{Output, Value};

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::validated_graph(&config)?;

    ui::header(&format!("Outputs: {}", config.stack));
    if graph.outputs().is_empty() {
        ui::dim("(none)");
        return Ok(());
    }

    let width = graph
        .outputs()
        .iter()
        .map(|o| o.name.len())
        .max()
        .unwrap_or(0);
    for output in graph.outputs() {
        println!(
            "  {:<width$}  {}",
            output.name.bold(),
            display_value(output)
        );
    }
    Ok(())
}

/// What an output shows, with sensitive values masked
fn display_value(output: &Output) -> String {
    if output.is_masked() {
        return ui::MASK.dimmed().to_string();
    }
    render(&output.value)
}

/// Human rendering: references as `<resource.attribute>`, concatenations
/// joined, everything else as JSON
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Ref(r) => format!("<{r}>"),
        Value::Secret(_) => ui::MASK.to_string(),
        Value::Concat(parts) => parts.iter().map(render).collect(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
