//! Deployment planner - orders declarations into dependency waves

use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use crate::resource::Declaration;
use std::collections::{BTreeMap, BTreeSet};

/// Declarations grouped into topological waves
///
/// Every resource in wave `n` depends only on resources in earlier waves, so
/// a reconciler may process each wave in parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub waves: Vec<Vec<String>>,
}

impl DeploymentPlan {
    /// Build the plan with Kahn's algorithm, level by level
    ///
    /// Names inside a wave are sorted so the plan is deterministic.
    pub fn from_graph(graph: &ResourceGraph) -> Result<Self> {
        let adjacency = graph.adjacency();
        let mut in_degree: BTreeMap<&str, usize> =
            graph.iter().map(|d| (d.name.as_str(), 0)).collect();
        for dependents in adjacency.values() {
            for d in dependents {
                if let Some(count) = in_degree.get_mut(d.as_str()) {
                    *count += 1;
                }
            }
        }

        let mut waves = Vec::new();
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut placed = 0;

        while !ready.is_empty() {
            let wave: Vec<String> = ready.iter().map(|n| n.to_string()).collect();
            let mut next = BTreeSet::new();
            for name in &ready {
                if let Some(dependents) = adjacency.get(*name) {
                    for d in dependents {
                        if let Some(count) = in_degree.get_mut(d.as_str()) {
                            *count -= 1;
                            if *count == 0 {
                                next.insert(d.as_str());
                            }
                        }
                    }
                }
            }
            placed += wave.len();
            waves.push(wave);
            ready = next;
        }

        if placed < graph.len() {
            let cycle = graph.find_cycle().unwrap_or_else(|| {
                in_degree
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(name, _)| name.to_string())
                    .collect()
            });
            return Err(Error::Cycle(cycle));
        }

        log::debug!(
            "planned {} resources in {} waves",
            placed,
            waves.len()
        );
        Ok(Self { waves })
    }

    /// Flattened topological order
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.waves.iter().flatten().map(String::as_str)
    }

    /// Index of the wave holding `name`
    pub fn wave_of(&self, name: &str) -> Option<usize> {
        self.waves.iter().position(|w| w.iter().any(|n| n == name))
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.waves.iter().all(Vec::is_empty)
    }

    /// Keep only resources matching a predicate, plus their dependencies
    pub fn filter<F>(self, graph: &ResourceGraph, predicate: F) -> Self
    where
        F: Fn(&Declaration) -> bool,
    {
        let keep: BTreeSet<String> = graph
            .iter()
            .filter(|d| predicate(d))
            .flat_map(|d| graph.closure(&d.name))
            .collect();

        Self {
            waves: self
                .waves
                .into_iter()
                .map(|w| w.into_iter().filter(|n| keep.contains(n)).collect::<Vec<_>>())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Filter the plan to a target pattern
    ///
    /// Target format: "family", "name" or "family.name". The family is the
    /// module segment of the kind token (`storage` in
    /// `gcp:storage/bucket:Bucket`), or a package alias such as `k8s`.
    pub fn filter_by_target(self, graph: &ResourceGraph, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (family, name) = parse_target(t);
                self.filter(graph, |d| matches_filter(d, family.as_deref(), name.as_deref()))
            }
        }
    }
}

/// Parse a target string like "family.name" into (family, name)
///
/// Names never contain `.`, so the last dot splits; families may contain dots
/// (`networking.k8s.io`).
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.rsplit_once('.') {
        None => (None, Some(target.to_string())),
        Some((family, name)) => (Some(family.to_string()), Some(name.to_string())),
    }
}

/// Module segment of a kind token, e.g. `storage` for `gcp:storage/bucket:Bucket`
fn kind_family(kind: &str) -> &str {
    kind.split(':')
        .nth(1)
        .and_then(|m| m.split('/').next())
        .unwrap_or(kind)
}

/// Check if a declaration matches the filter criteria
fn matches_filter(decl: &Declaration, family: Option<&str>, name: Option<&str>) -> bool {
    let family_matches = |f: &str| match f {
        "k8s" | "kubernetes" => decl.kind.starts_with("kubernetes:"),
        "gcp" => decl.kind.starts_with("gcp:"),
        _ => kind_family(&decl.kind) == f,
    };

    match (family, name) {
        (Some(f), Some(n)) => family_matches(f) && decl.name.contains(n),
        // A bare word selects a whole family or any name containing it
        (None, Some(n)) => family_matches(n) || decl.name.contains(n),
        (Some(f), None) => family_matches(f),
        (None, None) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Properties, Value};

    fn decl(kind: &str, name: &str, props: Properties) -> Declaration {
        Declaration::raw(kind, name, props)
    }

    fn sample() -> ResourceGraph {
        let mut g = ResourceGraph::new("dev");
        let ring = g
            .add(decl("gcp:kms/keyRing:KeyRing", "ring", Properties::new()))
            .unwrap();
        let key = g
            .add(decl(
                "gcp:kms/cryptoKey:CryptoKey",
                "key",
                Properties::new().with("keyRing", ring.attr("id")),
            ))
            .unwrap();
        g.add(decl(
            "gcp:storage/bucket:Bucket",
            "bucket",
            Properties::new().with("kms", key.attr("id")),
        ))
        .unwrap();
        g.add(decl("gcp:pubsub/topic:Topic", "topic", Properties::new()))
            .unwrap();
        g
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("bucket"), (None, Some("bucket".to_string())));
        assert_eq!(
            parse_target("storage.bucket"),
            (Some("storage".to_string()), Some("bucket".to_string()))
        );
        assert_eq!(
            parse_target("networking.k8s.io.prod-ingress"),
            (
                Some("networking.k8s.io".to_string()),
                Some("prod-ingress".to_string())
            )
        );
    }

    #[test]
    fn test_kind_family() {
        assert_eq!(kind_family("gcp:storage/bucket:Bucket"), "storage");
        assert_eq!(kind_family("kubernetes:apps/v1:Deployment"), "apps");
        assert_eq!(kind_family("opaque"), "opaque");
    }

    #[test]
    fn test_waves_respect_dependencies() {
        let plan = DeploymentPlan::from_graph(&sample()).unwrap();
        assert_eq!(
            plan.waves,
            vec![
                vec!["ring".to_string(), "topic".to_string()],
                vec!["key".to_string()],
                vec!["bucket".to_string()],
            ]
        );
        assert_eq!(plan.total_resources(), 4);
        assert_eq!(plan.wave_of("bucket"), Some(2));
        let order: Vec<&str> = plan.order().collect();
        assert_eq!(order, vec!["ring", "topic", "key", "bucket"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let mut g = ResourceGraph::new("dev");
        g.add(decl("t", "a", Properties::new().with("x", Value::reference("b", "id"))))
            .unwrap();
        g.add(decl("t", "b", Properties::new().with("x", Value::reference("a", "id"))))
            .unwrap();
        assert!(matches!(DeploymentPlan::from_graph(&g), Err(Error::Cycle(_))));
    }

    #[test]
    fn test_filter_keeps_dependencies() {
        let g = sample();
        let plan = DeploymentPlan::from_graph(&g)
            .unwrap()
            .filter_by_target(&g, Some("storage"));
        assert_eq!(plan.total_resources(), 3);
        assert_eq!(plan.wave_of("topic"), None);

        let plan = DeploymentPlan::from_graph(&g)
            .unwrap()
            .filter_by_target(&g, Some("pubsub.topic"));
        assert_eq!(plan.waves, vec![vec!["topic".to_string()]]);
    }
}
