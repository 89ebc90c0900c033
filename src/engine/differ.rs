//! Manifest diff display

use colored::Colorize;
use declarative::{Change, DiffSummary, ResourceDiff, Snapshot, group_by_type};

/// Display a list of diffs grouped by kind
///
/// With `details`, updated resources also show a line diff of their
/// property bags.
pub fn display_diff(diffs: &[ResourceDiff], previous: &Snapshot, current: &Snapshot, details: bool) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes since the last emit", "✓".green());
        return;
    }

    let by_type = group_by_type(diffs);
    let mut kinds: Vec<&String> = by_type.keys().collect();
    kinds.sort();

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Manifest Diff".bold()
    );
    println!("│");

    for kind in kinds {
        println!("│ {}", kind.bold());

        for diff in &by_type[kind] {
            let (symbol, desc) = match &diff.change {
                Change::Add => ("+".green(), "(new)".to_string()),
                Change::Remove => ("-".red(), "(no longer declared)".to_string()),
                Change::Update { keys } => ("~".yellow(), keys.join(", ")),
                Change::Replace { from_kind } => ("±".magenta(), format!("replaces {from_kind}")),
            };
            println!("│   {} {:<36} {}", symbol, diff.name, desc.dimmed());

            if details && diff.is_update() {
                let before = previous.resources.get(&diff.name).map(|e| &e.properties);
                let after = current.resources.get(&diff.name).map(|e| &e.properties);
                if let (Some(before), Some(after)) = (before, after) {
                    for line in property_diff(before, after) {
                        println!("│       {line}");
                    }
                }
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} added, {} updated, {} replaced, {} removed)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.updates.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Changed lines between two property bags, rendered as pretty JSON
pub fn property_diff(before: &serde_json::Value, after: &serde_json::Value) -> Vec<String> {
    let render = |v: &serde_json::Value| serde_json::to_string_pretty(v).unwrap_or_default() + "\n";
    let (before, after) = (render(before), render(after));

    let diff = similar::TextDiff::from_lines(&before, &after);
    let mut lines = Vec::new();
    for change in diff.iter_all_changes() {
        let text = change.to_string();
        let text = text.trim_end_matches('\n');
        match change.tag() {
            similar::ChangeTag::Delete => lines.push(format!("- {text}").red().to_string()),
            similar::ChangeTag::Insert => lines.push(format!("+ {text}").green().to_string()),
            similar::ChangeTag::Equal => {}
        }
    }
    lines
}
