//! Diff computation between two emitted manifests
//!
//! This compares declarations, not live cloud state. It previews what the
//! reconciler will be asked to change.

use crate::error::Result;
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stored form of one emitted declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub kind: String,
    /// blake3 of the canonical JSON of properties, dependencies and provider
    pub fingerprint: String,
    pub properties: serde_json::Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Stored form of an emitted manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub resources: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let mut resources = BTreeMap::new();
        for entry in &manifest.resources {
            let properties = serde_json::to_value(&entry.properties)?;
            let canonical = serde_json::to_vec(&(
                &entry.kind,
                &properties,
                &entry.depends_on,
                &entry.provider,
            ))?;
            resources.insert(
                entry.name.clone(),
                SnapshotEntry {
                    kind: entry.kind.clone(),
                    fingerprint: blake3::hash(&canonical).to_hex().to_string(),
                    properties,
                    depends_on: entry.depends_on.clone(),
                    provider: entry.provider.clone(),
                },
            );
        }
        Ok(Self { resources })
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// What happened to one declaration between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "change")]
pub enum Change {
    /// Newly declared
    Add,
    /// No longer declared
    Remove,
    /// Same kind, different properties or ordering hints
    Update { keys: Vec<String> },
    /// Same name, different kind
    Replace { from_kind: String },
}

/// A diff of one declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    pub name: String,
    pub kind: String,
    pub change: Change,
}

impl ResourceDiff {
    pub fn is_update(&self) -> bool {
        matches!(self.change, Change::Update { .. })
    }
}

/// Compute diffs between a previous and a current snapshot
///
/// Returns only declarations that changed, sorted by name.
pub fn compute_diffs(previous: &Snapshot, current: &Snapshot) -> Vec<ResourceDiff> {
    let names: BTreeSet<&String> = previous
        .resources
        .keys()
        .chain(current.resources.keys())
        .collect();

    names
        .into_iter()
        .filter_map(|name| {
            match (previous.resources.get(name), current.resources.get(name)) {
                (None, Some(new)) => Some(ResourceDiff {
                    name: name.clone(),
                    kind: new.kind.clone(),
                    change: Change::Add,
                }),
                (Some(old), None) => Some(ResourceDiff {
                    name: name.clone(),
                    kind: old.kind.clone(),
                    change: Change::Remove,
                }),
                (Some(old), Some(new)) if old.kind != new.kind => Some(ResourceDiff {
                    name: name.clone(),
                    kind: new.kind.clone(),
                    change: Change::Replace {
                        from_kind: old.kind.clone(),
                    },
                }),
                (Some(old), Some(new)) if old.fingerprint != new.fingerprint => {
                    Some(ResourceDiff {
                        name: name.clone(),
                        kind: new.kind.clone(),
                        change: Change::Update {
                            keys: changed_keys(old, new),
                        },
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Top-level property keys (and ordering hints) that differ
fn changed_keys(old: &SnapshotEntry, new: &SnapshotEntry) -> Vec<String> {
    let empty = serde_json::Map::new();
    let old_props = old.properties.as_object().unwrap_or(&empty);
    let new_props = new.properties.as_object().unwrap_or(&empty);

    let mut keys: Vec<String> = old_props
        .keys()
        .chain(new_props.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|k| old_props.get(*k) != new_props.get(*k))
        .cloned()
        .collect();

    if old.depends_on != new.depends_on {
        keys.push("(dependsOn)".to_string());
    }
    if old.provider != new.provider {
        keys.push("(provider)".to_string());
    }
    keys
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub updates: usize,
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.change {
                Change::Add => summary.additions += 1,
                Change::Remove => summary.removals += 1,
                Change::Update { .. } => summary.updates += 1,
                Change::Replace { .. } => summary.replacements += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.updates + self.replacements
    }
}

/// Group diffs by resource kind
pub fn group_by_type(diffs: &[ResourceDiff]) -> HashMap<String, Vec<&ResourceDiff>> {
    let mut groups: HashMap<String, Vec<&ResourceDiff>> = HashMap::new();
    for diff in diffs {
        groups.entry(diff.kind.clone()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;
    use crate::planner::DeploymentPlan;
    use crate::resource::Declaration;
    use crate::types::Properties;

    fn snapshot(decls: Vec<Declaration>) -> Snapshot {
        let mut g = ResourceGraph::new("dev");
        for d in decls {
            g.add(d).unwrap();
        }
        let plan = DeploymentPlan::from_graph(&g).unwrap();
        Snapshot::from_manifest(&Manifest::build(&g, &plan)).unwrap()
    }

    fn bucket(location: &str) -> Declaration {
        Declaration::raw(
            "gcp:storage/bucket:Bucket",
            "bucket",
            Properties::new()
                .with("location", location)
                .with("forceDestroy", true),
        )
    }

    #[test]
    fn test_identical_snapshots_have_no_diff() {
        let a = snapshot(vec![bucket("US")]);
        let b = snapshot(vec![bucket("US")]);
        assert!(compute_diffs(&a, &b).is_empty());
    }

    #[test]
    fn test_add_remove_update_replace() {
        let old = snapshot(vec![
            bucket("US"),
            Declaration::raw("gcp:pubsub/topic:Topic", "topic", Properties::new()),
            Declaration::raw("gcp:sql/user:User", "user", Properties::new()),
        ]);
        let new = snapshot(vec![
            bucket("EU"),
            Declaration::raw("gcp:pubsub/topic:Topic", "topic2", Properties::new()),
            Declaration::raw("gcp:sql/database:Database", "user", Properties::new()),
        ]);

        let diffs = compute_diffs(&old, &new);
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.total(), 4);

        let update = diffs.iter().find(|d| d.name == "bucket").unwrap();
        assert_eq!(
            update.change,
            Change::Update {
                keys: vec!["location".to_string()]
            }
        );
        let user = diffs.iter().find(|d| d.name == "user").unwrap();
        assert!(matches!(user.change, Change::Replace { .. }));
        assert_eq!(group_by_type(&diffs).len(), 4);
    }

    #[test]
    fn test_dependency_change_is_reported() {
        let mut g = ResourceGraph::new("dev");
        let binding = g
            .add(Declaration::raw("gcp:pubsub/topicIAMBinding:TopicIAMBinding", "binding", Properties::new()))
            .unwrap();
        g.add(Declaration::raw("gcp:storage/notification:Notification", "notify", Properties::new()))
            .unwrap();
        let plan = DeploymentPlan::from_graph(&g).unwrap();
        let old = Snapshot::from_manifest(&Manifest::build(&g, &plan)).unwrap();

        let mut g2 = ResourceGraph::new("dev");
        let binding2 = g2.add(Declaration::raw(binding.kind(), "binding", Properties::new())).unwrap();
        g2.add(
            Declaration::raw("gcp:storage/notification:Notification", "notify", Properties::new())
                .depends_on(&binding2),
        )
        .unwrap();
        let plan2 = DeploymentPlan::from_graph(&g2).unwrap();
        let new = Snapshot::from_manifest(&Manifest::build(&g2, &plan2)).unwrap();

        let diffs = compute_diffs(&old, &new);
        assert_eq!(diffs.len(), 1);
        assert_eq!(
            diffs[0].change,
            Change::Update {
                keys: vec!["(dependsOn)".to_string()]
            }
        );
    }
}
