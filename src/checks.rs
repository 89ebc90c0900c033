//! Policy checks over a built stack
//!
//! Each check inspects the declared graph and pushes [`Finding`]s. Errors
//! block `emit`; warnings are only reported.

use crate::resource::ProviderCatalog;
use crate::resource::artifact_registry::{Repository, RepositoryFormat};
use crate::resource::cloudbuild::Trigger;
use crate::resource::container::Cluster;
use crate::resource::kms::CryptoKeyIamBinding;
use crate::resource::kubernetes::Deployment;
use crate::resource::pubsub::{PUBLISHER_ROLE, TopicIamBinding};
use crate::resource::storage::{Bucket, Notification};
use crate::schema::StackConfig;
use declarative::{Declaration, ResourceGraph, Value};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Property keys that must never hold a literal
static SECRET_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(password|secret|token|credential)s?$").unwrap());

/// Public images allowed outside the stack's registry
const PUBLIC_IMAGE_PREFIXES: &[&str] = &["gcr.io/cloud-sql-connectors/"];

const OPEN_NETWORK: &str = "0.0.0.0/0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Short check identifier, e.g. `secret-literals`
    pub check: &'static str,
    pub resource: Option<String>,
    pub message: String,
}

impl Finding {
    fn error(check: &'static str, resource: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            check,
            resource: resource.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(check: &'static str, resource: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(check, resource, message)
        }
    }
}

/// Findings of one run, errors first
#[derive(Debug, Default)]
pub struct Report {
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// Run every check against a built stack
pub fn run(graph: &ResourceGraph, config: &StackConfig) -> Report {
    let mut findings = Vec::new();

    check_graph(graph, config, &mut findings);
    check_notification_order(graph, &mut findings);
    check_secret_literals(graph, &mut findings);
    check_image_registry(graph, config, &mut findings);
    check_trigger_paths(graph, &mut findings);
    check_lifecycle_order(graph, &mut findings);
    check_kms_binding_order(graph, &mut findings);
    check_master_access(graph, &mut findings);

    findings.sort_by_key(|f| f.severity);
    log::debug!("policy checks produced {} finding(s)", findings.len());
    Report { findings }
}

// ============================================================================
// Checks
// ============================================================================

fn check_graph(graph: &ResourceGraph, config: &StackConfig, findings: &mut Vec<Finding>) {
    if let Err(errors) = graph.validate(&ProviderCatalog, config) {
        findings.extend(
            errors
                .into_iter()
                .map(|e| Finding::error("graph", None, e.to_string())),
        );
    }

    for decl in graph.iter().filter(|d| !ProviderCatalog::has_kind(&d.kind)) {
        findings.push(Finding::error(
            "graph",
            Some(decl.name.as_str()),
            format!("kind {} is not known to the reconciler", decl.kind),
        ));
    }
}

/// Notifications need an explicit dependency on a publisher binding for
/// their topic
fn check_notification_order(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for notification in graph.of_kind(Notification::KIND) {
        let Some(topic) = referenced_resource(notification.properties.get("topic")) else {
            findings.push(Finding::error(
                "notification-order",
                Some(notification.name.as_str()),
                "topic is not a reference to a declared topic",
            ));
            continue;
        };

        let bindings: Vec<&str> = graph
            .of_kind(TopicIamBinding::KIND)
            .filter(|b| b.properties.get("role").and_then(Value::as_str) == Some(PUBLISHER_ROLE))
            .filter(|b| referenced_resource(b.properties.get("topic")) == Some(topic))
            .map(|b| b.name.as_str())
            .collect();

        if bindings.is_empty() {
            findings.push(Finding::error(
                "notification-order",
                Some(notification.name.as_str()),
                format!("no publisher binding declared on topic '{topic}'"),
            ));
        } else if !notification
            .options
            .depends_on
            .iter()
            .any(|d| bindings.contains(&d.as_str()))
        {
            findings.push(Finding::error(
                "notification-order",
                Some(notification.name.as_str()),
                format!("must depend explicitly on {}", bindings.join(" or ")),
            ));
        }
    }
}

/// Secret-looking keys must hold secret references, not literals
fn check_secret_literals(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for decl in graph.iter() {
        decl.properties.walk_entries(&mut |path, value| {
            let key = path.rsplit('.').next().unwrap_or(path);
            if SECRET_KEY.is_match(key) && holds_literal_string(value) {
                findings.push(Finding::error(
                    "secret-literals",
                    Some(decl.name.as_str()),
                    format!("'{path}' holds a literal; use a secret reference"),
                ));
            }
        });
    }
}

/// Deployment images come from the stack's registry
fn check_image_registry(graph: &ResourceGraph, config: &StackConfig, findings: &mut Vec<Finding>) {
    let region = config.project.region.as_str();
    let repository = config.images.repository.as_str();
    let format = RepositoryFormat::Docker.to_string();

    let registry_declared = graph.of_kind(Repository::KIND).any(|r| {
        let prop = |key: &str| r.properties.get(key).and_then(Value::as_str);
        prop("repositoryId") == Some(repository)
            && prop("location") == Some(region)
            && prop("format") == Some(format.as_str())
    });
    if !registry_declared {
        findings.push(Finding::error(
            "image-registry",
            None,
            format!("no docker registry '{repository}' declared in {region}"),
        ));
    }

    let prefix = config.image_prefix();
    for deployment in graph.of_kind(Deployment::KIND) {
        for image in container_images(deployment) {
            if PUBLIC_IMAGE_PREFIXES.iter().any(|p| image.starts_with(p)) {
                continue;
            }
            if !image.starts_with(&prefix) {
                findings.push(Finding::error(
                    "image-registry",
                    Some(deployment.name.as_str()),
                    format!("image '{image}' is outside {prefix}"),
                ));
            }
        }
    }
}

/// Two triggers must not fire on the same path
fn check_trigger_paths(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    let triggers: Vec<(&str, Vec<&str>)> = graph
        .of_kind(Trigger::KIND)
        .map(|t| {
            let patterns = t
                .properties
                .get("includedFiles")
                .and_then(Value::as_list)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_str)
                .collect();
            (t.name.as_str(), patterns)
        })
        .collect();

    for (i, (name_a, patterns_a)) in triggers.iter().enumerate() {
        for (name_b, patterns_b) in &triggers[i + 1..] {
            for a in patterns_a {
                for b in patterns_b {
                    if paths_overlap(a, b) {
                        findings.push(Finding::error(
                            "trigger-paths",
                            Some(*name_a),
                            format!("'{a}' overlaps '{b}' of {name_b}"),
                        ));
                    }
                }
            }
        }
    }
}

/// Lifecycle ages must strictly increase
fn check_lifecycle_order(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for bucket in graph.of_kind(Bucket::KIND) {
        let ages: Vec<i64> = bucket
            .properties
            .get("lifecycleRules")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|rule| rule.get_path("condition.age").and_then(Value::as_int))
            .collect();

        if let Some(pair) = ages.windows(2).find(|w| w[0] >= w[1]) {
            findings.push(Finding::error(
                "lifecycle-order",
                Some(bucket.name.as_str()),
                format!("lifecycle age {} is not after {}", pair[1], pair[0]),
            ));
        }
    }
}

/// Anything encrypted by default with a KMS key waits for the key binding
fn check_kms_binding_order(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for decl in graph.iter() {
        let Some(key) =
            referenced_resource(decl.properties.get_path("encryption.defaultKmsKeyName"))
        else {
            continue;
        };

        let bindings: Vec<&str> = graph
            .of_kind(CryptoKeyIamBinding::KIND)
            .filter(|b| referenced_resource(b.properties.get("cryptoKeyId")) == Some(key))
            .map(|b| b.name.as_str())
            .collect();

        if bindings.is_empty() {
            findings.push(Finding::error(
                "kms-binding-order",
                Some(decl.name.as_str()),
                format!("no IAM binding grants access to key '{key}'"),
            ));
        } else if !decl
            .options
            .depends_on
            .iter()
            .any(|d| bindings.contains(&d.as_str()))
        {
            findings.push(Finding::error(
                "kms-binding-order",
                Some(decl.name.as_str()),
                format!("must depend explicitly on {}", bindings.join(" or ")),
            ));
        }
    }
}

fn check_master_access(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for cluster in graph.of_kind(Cluster::KIND) {
        let open = cluster
            .properties
            .get_path("masterAuthorizedNetworksConfig.cidrBlocks")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .any(|b| b.get("cidrBlock").and_then(Value::as_str) == Some(OPEN_NETWORK));
        if open {
            findings.push(Finding::warning(
                "open-master-access",
                Some(cluster.name.as_str()),
                format!("control plane accepts connections from {OPEN_NETWORK}"),
            ));
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn referenced_resource(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::Ref(r) => Some(r.resource.as_str()),
        _ => None,
    }
}

fn holds_literal_string(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::List(items) => items.iter().any(holds_literal_string),
        // Interpolated literals are still literals unless a secret is spliced in
        Value::Concat(parts) => !value.is_secret() && parts.iter().any(holds_literal_string),
        _ => false,
    }
}

fn container_images(deployment: &Declaration) -> Vec<&str> {
    deployment
        .properties
        .get_path("spec.template.spec.containers")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|c| c.get("image").and_then(Value::as_str))
        .collect()
}

/// Path segments before the first one containing a glob character
fn static_prefix(pattern: &str) -> Vec<&str> {
    pattern
        .split('/')
        .take_while(|seg| !seg.contains(['*', '?', '[', '{']))
        .filter(|seg| !seg.is_empty())
        .collect()
}

/// Whether two include patterns can match a common path
///
/// Compares static prefixes segment-wise: `server/**` and `server-utils/**`
/// are disjoint, `libs/**` and `libs/core/**` are not.
fn paths_overlap(a: &str, b: &str) -> bool {
    let (a, b) = (static_prefix(a), static_prefix(b));
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack;
    use declarative::Properties;

    fn dev() -> (StackConfig, ResourceGraph) {
        let config = StackConfig::example("dev");
        let graph = stack::build(&config).unwrap();
        (config, graph)
    }

    fn checks_of(report: &Report, severity: Severity) -> Vec<&'static str> {
        report
            .findings
            .iter()
            .filter(|f| f.severity == severity)
            .map(|f| f.check)
            .collect()
    }

    #[test]
    fn test_default_stack_only_warns_about_master_access() {
        let (config, graph) = dev();
        let report = run(&graph, &config);
        assert!(!report.has_errors(), "{:?}", report.findings);
        assert_eq!(checks_of(&report, Severity::Warning), ["open-master-access"]);
    }

    #[test]
    fn test_restricted_master_networks_do_not_warn() {
        let (mut config, _) = dev();
        config.cluster.master_authorized_networks = vec!["10.0.0.0/8".into()];
        let graph = stack::build(&config).unwrap();
        assert!(run(&graph, &config).findings.is_empty());
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("libs/**", "libs/core/**"));
        assert!(paths_overlap("**", "server/**"));
        assert!(!paths_overlap("server/**", "server-utils/**"));
        assert!(!paths_overlap("workers/fit-file-worker/**", "workers/scheduler/**"));
        assert!(paths_overlap("workers/*/src/**", "workers/scheduler/**"));
    }

    #[test]
    fn test_secret_key_pattern() {
        for key in ["rootPassword", "DB_PASSWORD", "JWT_SECRET", "apiTokens", "credential"] {
            assert!(SECRET_KEY.is_match(key), "{key}");
        }
        for key in ["secretEnvs", "secretRef", "tokenUri", "name"] {
            assert!(!SECRET_KEY.is_match(key), "{key}");
        }
    }

    #[test]
    fn test_literal_password_is_flagged() {
        let (config, mut graph) = dev();
        graph
            .add(Declaration::raw(
                "gcp:sql/user:User",
                "leaky-user",
                Properties::new()
                    .with("name", "leaky")
                    .with("password", "hunter2"),
            ))
            .unwrap();
        let report = run(&graph, &config);
        assert!(
            report
                .errors()
                .any(|f| f.check == "secret-literals" && f.resource.as_deref() == Some("leaky-user"))
        );
    }

    #[test]
    fn test_interpolated_literal_password_is_flagged() {
        let (config, mut graph) = dev();
        graph
            .add(Declaration::raw(
                "gcp:sql/user:User",
                "split-user",
                Properties::new()
                    .with("name", "split")
                    .with("password", Value::concat(["hun", "ter2"])),
            ))
            .unwrap();
        let report = run(&graph, &config);
        assert!(
            report
                .errors()
                .any(|f| f.check == "secret-literals" && f.resource.as_deref() == Some("split-user"))
        );
    }

    #[test]
    fn test_literal_string_detection() {
        assert!(holds_literal_string(&Value::concat(["a", "b"])));
        assert!(holds_literal_string(&Value::list([Value::concat(["a", "b"])])));
        assert!(!holds_literal_string(&Value::concat([
            Value::from("pw="),
            Value::secret("db-root-password"),
        ])));
        assert!(!holds_literal_string(&Value::concat([Value::reference("db", "name")])));
        assert!(!holds_literal_string(&Value::secret("db-root-password")));
    }

    #[test]
    fn test_notification_without_binding_dependency() {
        let (config, mut graph) = dev();
        graph
            .add(Declaration::raw(
                Notification::KIND,
                "eager-notification",
                Properties::new()
                    .with("bucket", Value::reference("dev-fit-file-bucket", "name"))
                    .with("topic", Value::reference("k8s-transport-topic", "id")),
            ))
            .unwrap();
        let report = run(&graph, &config);
        let finding = report
            .errors()
            .find(|f| f.check == "notification-order")
            .unwrap();
        assert_eq!(finding.resource.as_deref(), Some("eager-notification"));
        assert!(finding.message.contains("dev-notification-binding"));
    }

    #[test]
    fn test_foreign_image_is_flagged() {
        let (mut config, graph) = dev();
        config.images.repository = "other-repo".into();
        let report = run(&graph, &config);
        let errors: Vec<_> = report
            .errors()
            .filter(|f| f.check == "image-registry")
            .collect();
        // Missing registry plus one per workload container
        assert_eq!(errors.len(), 1 + stack::workloads::WORKLOADS.len());
    }

    #[test]
    fn test_unsorted_lifecycle_is_flagged() {
        let (config, mut graph) = dev();
        let rule = |age: i64| {
            Properties::new().with("condition", Properties::new().with("age", age))
        };
        graph
            .add(Declaration::raw(
                Bucket::KIND,
                "odd-bucket",
                Properties::new().with("lifecycleRules", vec![rule(90), rule(30)]),
            ))
            .unwrap();
        let report = run(&graph, &config);
        assert!(report.errors().any(|f| f.check == "lifecycle-order"));
    }

    #[test]
    fn test_encrypted_resource_without_binding_dependency() {
        let (config, mut graph) = dev();
        graph
            .add(Declaration::raw(
                Bucket::KIND,
                "rushed-bucket",
                Properties::new().with(
                    "encryption",
                    Properties::new()
                        .with("defaultKmsKeyName", Value::reference("dev-storage-key", "id")),
                ),
            ))
            .unwrap();
        let report = run(&graph, &config);
        assert!(
            report
                .errors()
                .any(|f| f.check == "kms-binding-order"
                    && f.resource.as_deref() == Some("rushed-bucket"))
        );
    }

    #[test]
    fn test_overlapping_trigger_is_flagged() {
        let (config, mut graph) = dev();
        graph
            .add(Declaration::raw(
                Trigger::KIND,
                "everything-trigger",
                Properties::new().with("includedFiles", vec!["**"]),
            ))
            .unwrap();
        let report = run(&graph, &config);
        let overlaps = report
            .errors()
            .filter(|f| f.check == "trigger-paths")
            .count();
        assert_eq!(overlaps, stack::workloads::WORKLOADS.len() + 1);
    }
}
