//! Plan display and graph rendering

use colored::Colorize;
use declarative::{DeploymentPlan, EdgeKind, ResourceGraph};
use std::fmt::Write;

/// Print the deployment plan wave by wave
pub fn display_plan(graph: &ResourceGraph, plan: &DeploymentPlan) {
    if plan.is_empty() {
        println!();
        println!("  {} Nothing to deploy", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Deployment Plan".bold()
    );
    println!("│");

    for (i, wave) in plan.waves.iter().enumerate() {
        println!(
            "│ {} {}",
            format!("Wave {}", i + 1).bold(),
            format!("({} resources)", wave.len()).dimmed()
        );
        for name in wave {
            let Some(decl) = graph.get(name) else {
                continue;
            };
            let mut hints = Vec::new();
            if !decl.options.depends_on.is_empty() {
                hints.push(format!("after {}", decl.options.depends_on.join(", ")));
            }
            if let Some(provider) = &decl.options.provider {
                hints.push(format!("via {provider}"));
            }
            println!(
                "│   {} {:<36} {} {}",
                "•".cyan(),
                name,
                decl.kind.dimmed(),
                hints.join("; ").yellow()
            );
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} resources in {} waves",
        plan.total_resources().to_string().bold(),
        plan.waves.len().to_string().bold()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Graphviz rendering of the graph
///
/// Reference edges are solid, explicit `depends_on` edges dashed and provider
/// edges dotted.
pub fn render_dot(graph: &ResourceGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph \"{}\" {{", graph.stack());
    let _ = writeln!(out, "  rankdir=LR;");
    let _ = writeln!(out, "  node [shape=box, fontname=\"Helvetica\"];");

    for decl in graph.iter() {
        let _ = writeln!(
            out,
            "  \"{}\" [label=\"{}\\n{}\"];",
            decl.name,
            decl.name,
            short_kind(&decl.kind)
        );
    }
    for edge in graph.edges() {
        let style = match edge.kind {
            EdgeKind::Reference => "solid",
            EdgeKind::Explicit => "dashed",
            EdgeKind::Provider => "dotted",
        };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [style={style}];",
            edge.from, edge.to
        );
    }
    out.push_str("}\n");
    out
}

/// Indented text rendering: each resource with what it waits for
pub fn render_text(graph: &ResourceGraph, plan: &DeploymentPlan) -> String {
    let edges = graph.edges();
    let mut out = String::new();

    for name in plan.order() {
        let Some(decl) = graph.get(name) else {
            continue;
        };
        let _ = writeln!(out, "{name} ({})", short_kind(&decl.kind));
        for edge in edges.iter().filter(|e| e.to == name) {
            let marker = match edge.kind {
                EdgeKind::Reference => "ref",
                EdgeKind::Explicit => "depends_on",
                EdgeKind::Provider => "provider",
            };
            let _ = writeln!(out, "  <- {} [{marker}]", edge.from);
        }
    }
    out
}

/// Last segment of a kind token: `gcp:storage/bucket:Bucket` -> `Bucket`
fn short_kind(kind: &str) -> &str {
    kind.rsplit(':').next().unwrap_or(kind)
}
