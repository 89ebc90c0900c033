use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::checks::{self, Finding, Severity};
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let config = super::load_config(ctx)?;
    let graph = super::build_graph(&config)?;

    ui::header(&format!("Policy Checks: {}", config.stack));
    let report = checks::run(&graph, &config);

    println!();
    if report.findings.is_empty() {
        ui::success(&format!(
            "{} pass all checks",
            ui::count(graph.len(), "resource")
        ));
        return Ok(());
    }

    print_findings(&report.findings);

    let errors = report.errors().count();
    let warnings = report.warnings().count();
    if errors > 0 {
        bail!(
            "{} and {}",
            ui::count(errors, "error"),
            ui::count(warnings, "warning")
        );
    }

    ui::warn(&ui::count(warnings, "warning"));
    Ok(())
}

fn print_findings(findings: &[Finding]) {
    for (i, finding) in findings.iter().enumerate() {
        let marker = match finding.severity {
            Severity::Error => "✗".red(),
            Severity::Warning => "⚠".yellow(),
        };
        println!(
            "  {}  {} {}",
            format!("{}.", i + 1).bold(),
            marker,
            finding.message
        );
        let mut context = vec![finding.check.to_string()];
        if let Some(resource) = &finding.resource {
            context.push(resource.clone());
        }
        println!("      {}", format!("[{}]", context.join(" @ ")).dimmed());
    }
    println!();
}

/// One-line rendering of a finding
pub fn describe(finding: &Finding) -> String {
    match &finding.resource {
        Some(resource) => format!(
            "{} [{}] {}: {}",
            finding.severity, finding.check, resource, finding.message
        ),
        None => format!(
            "{} [{}] {}",
            finding.severity, finding.check, finding.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StackConfig;
    use crate::stack;

    #[test]
    fn test_describe_names_check_and_resource() {
        let graph = stack::build(&StackConfig::example("dev")).unwrap();
        let report = checks::run(&graph, &StackConfig::example("dev"));
        let finding = report.warnings().next().unwrap();
        let line = describe(finding);
        assert!(line.starts_with("warning [open-master-access]"));
        assert!(line.contains("dev-cluster"));
    }
}
