//! Manifest emission - the document handed to the reconciler

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::planner::DeploymentPlan;
use crate::types::{Properties, ResourceMode, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// One declaration as emitted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub kind: String,
    pub name: String,
    pub mode: ResourceMode,
    pub wave: usize,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// One stack output as emitted
#[derive(Debug, Clone, Serialize)]
pub struct ManifestOutput {
    pub value: Value,
    pub sensitive: bool,
}

/// The full declaration set of a stack, in topological order
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub stack: String,
    pub resources: Vec<ManifestEntry>,
    pub outputs: BTreeMap<String, ManifestOutput>,
}

impl Manifest {
    /// Build a manifest from a graph and its plan
    ///
    /// Resources absent from the plan (filtered out) are left out.
    pub fn build(graph: &ResourceGraph, plan: &DeploymentPlan) -> Self {
        let resources = plan
            .waves
            .iter()
            .enumerate()
            .flat_map(|(wave, names)| names.iter().map(move |n| (wave, n)))
            .filter_map(|(wave, name)| {
                graph.get(name).map(|decl| ManifestEntry {
                    kind: decl.kind.clone(),
                    name: decl.name.clone(),
                    mode: decl.mode,
                    wave,
                    properties: decl.properties.clone(),
                    depends_on: decl.options.depends_on.clone(),
                    provider: decl.options.provider.clone(),
                })
            })
            .collect();

        let outputs = graph
            .outputs()
            .iter()
            .map(|o| {
                (
                    o.name.clone(),
                    ManifestOutput {
                        value: o.value.clone(),
                        sensitive: o.is_masked(),
                    },
                )
            })
            .collect();

        Self {
            stack: graph.stack().to_string(),
            resources,
            outputs,
        }
    }

    /// Pretty JSON rendering
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Declaration;

    #[test]
    fn test_manifest_is_in_plan_order_and_hides_nothing_secret() {
        let mut g = ResourceGraph::new("dev");
        let db = g
            .add(Declaration::raw(
                "gcp:sql/databaseInstance:DatabaseInstance",
                "db",
                Properties::new().with("rootPassword", Value::secret("db-root-password")),
            ))
            .unwrap();
        g.add(
            Declaration::raw(
                "gcp:sql/user:User",
                "user",
                Properties::new().with("instance", db.attr("name")),
            )
            .depends_on(&db),
        )
        .unwrap();
        g.export("instance", db.attr("name"), false).unwrap();

        let plan = DeploymentPlan::from_graph(&g).unwrap();
        let manifest = Manifest::build(&g, &plan);
        assert_eq!(manifest.resources[0].name, "db");
        assert_eq!(manifest.resources[1].wave, 1);
        assert_eq!(manifest.resources[1].depends_on, vec!["db".to_string()]);

        let json = manifest.to_json_pretty().unwrap();
        assert!(json.contains("\"$secret\": \"db-root-password\""));
        assert!(json.contains("\"$ref\": \"db.name\""));
        assert!(json.contains("\"dependsOn\""));
    }
}
