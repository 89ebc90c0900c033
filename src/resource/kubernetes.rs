//! Kubernetes objects, reached through a cluster provider handle

use declarative::{Properties, Resource, Value};
use std::collections::BTreeMap;

// ============================================================================
// Metadata
// ============================================================================

/// Object metadata
#[derive(Debug, Clone, Default)]
pub struct ObjectMeta {
    pub name: String,
    /// Namespace name, usually a reference to a declared namespace
    pub namespace: Option<Value>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, Value>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn in_namespace(mut self, namespace: Value) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotation(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.annotations.insert(key.to_string(), value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut meta = Properties::new()
            .with("name", self.name.as_str())
            .with_opt("namespace", self.namespace.clone());
        if !self.labels.is_empty() {
            let labels: Properties = self
                .labels
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            meta.set("labels", labels);
        }
        if !self.annotations.is_empty() {
            let annotations: Properties = self
                .annotations
                .iter()
                .map(|(k, v)| (k.as_str(), v.clone()))
                .collect();
            meta.set("annotations", annotations);
        }
        meta.into()
    }
}

/// Attributes every Kubernetes object exposes
const OBJECT_ATTRIBUTES: &[&str] = &["metadata", "spec", "status"];

// ============================================================================
// Provider
// ============================================================================

/// Provider handle bound to one cluster
#[derive(Debug, Clone)]
pub struct Provider {
    pub kubeconfig: Value,
}

impl Provider {
    pub const KIND: &'static str = "pulumi:providers:kubernetes";
    pub const ATTRIBUTES: &'static [&'static str] = &["id"];
}

impl Resource for Provider {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("kubeconfig", self.kubeconfig.clone())
            .with("enableServerSideApply", true)
    }
}

// ============================================================================
// Core objects
// ============================================================================

#[derive(Debug, Clone)]
pub struct Namespace {
    pub metadata: ObjectMeta,
}

impl Namespace {
    pub const KIND: &'static str = "kubernetes:core/v1:Namespace";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for Namespace {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new().with("metadata", self.metadata.to_value())
    }
}

#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub metadata: ObjectMeta,
}

impl ServiceAccount {
    pub const KIND: &'static str = "kubernetes:core/v1:ServiceAccount";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for ServiceAccount {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new().with("metadata", self.metadata.to_value())
    }
}

/// Opaque secret whose entries come from the external secret store
#[derive(Debug, Clone)]
pub struct Secret {
    pub metadata: ObjectMeta,
    pub string_data: BTreeMap<String, Value>,
}

impl Secret {
    pub const KIND: &'static str = "kubernetes:core/v1:Secret";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for Secret {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let data: Properties = self
            .string_data
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with("type", "Opaque")
            .with("stringData", data)
    }
}

// ============================================================================
// Workloads
// ============================================================================

/// HTTP GET probe
#[derive(Debug, Clone)]
pub struct HttpProbe {
    pub path: String,
    pub port: u16,
    pub initial_delay_seconds: u32,
}

impl HttpProbe {
    fn to_value(&self) -> Value {
        Properties::new()
            .with(
                "httpGet",
                Properties::new()
                    .with("path", self.path.as_str())
                    .with("port", u32::from(self.port)),
            )
            .with("initialDelaySeconds", self.initial_delay_seconds)
            .with("periodSeconds", 10)
            .into()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub args: Vec<Value>,
    pub ports: Vec<u16>,
    /// Secret whose keys become environment variables
    pub env_from_secret: Option<Value>,
    pub cpu: String,
    pub memory: String,
    /// Used for both liveness and readiness
    pub probe: Option<HttpProbe>,
}

impl Container {
    fn to_value(&self) -> Value {
        let mut container = Properties::new()
            .with("name", self.name.as_str())
            .with("image", self.image.as_str())
            .with(
                "resources",
                Properties::new().with(
                    "requests",
                    Properties::new()
                        .with("cpu", self.cpu.as_str())
                        .with("memory", self.memory.as_str()),
                ),
            );
        if !self.args.is_empty() {
            container.set("args", self.args.clone());
        }
        if !self.ports.is_empty() {
            container.set(
                "ports",
                Value::list(
                    self.ports
                        .iter()
                        .map(|p| Properties::new().with("containerPort", u32::from(*p))),
                ),
            );
        }
        if let Some(secret) = &self.env_from_secret {
            container.set(
                "envFrom",
                Value::list([Properties::new()
                    .with("secretRef", Properties::new().with("name", secret.clone()))]),
            );
        }
        if let Some(probe) = &self.probe {
            container.set("livenessProbe", probe.to_value());
            container.set("readinessProbe", probe.to_value());
        }
        container.into()
    }
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub replicas: u32,
    /// Value of the `app` label tying pods to the deployment
    pub app: String,
    pub service_account: Option<Value>,
    pub containers: Vec<Container>,
}

impl Deployment {
    pub const KIND: &'static str = "kubernetes:apps/v1:Deployment";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;

    /// Images of every container, sidecars included
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.containers.iter().map(|c| c.image.as_str())
    }
}

impl Resource for Deployment {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let labels = Properties::new().with("app", self.app.as_str());
        let pod_spec = Properties::new()
            .with_opt("serviceAccountName", self.service_account.clone())
            .with(
                "containers",
                Value::list(self.containers.iter().map(Container::to_value)),
            );

        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with(
                "spec",
                Properties::new()
                    .with("replicas", self.replicas)
                    .with("selector", Properties::new().with("matchLabels", labels.clone()))
                    .with(
                        "template",
                        Properties::new()
                            .with("metadata", Properties::new().with("labels", labels))
                            .with("spec", pod_spec),
                    ),
            )
    }
}

// ============================================================================
// Networking
// ============================================================================

#[derive(Debug, Clone)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub target_port: u16,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub metadata: ObjectMeta,
    /// `NodePort`, `ClusterIP`, ...
    pub service_type: String,
    pub selector_app: String,
    pub ports: Vec<ServicePort>,
}

impl Service {
    pub const KIND: &'static str = "kubernetes:core/v1:Service";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for Service {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let ports = Value::list(self.ports.iter().map(|p| {
            Properties::new()
                .with("name", p.name.as_str())
                .with("port", u32::from(p.port))
                .with("targetPort", u32::from(p.target_port))
                .with("protocol", "TCP")
        }));
        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with(
                "spec",
                Properties::new()
                    .with("type", self.service_type.as_str())
                    .with("selector", Properties::new().with("app", self.selector_app.as_str()))
                    .with("ports", ports),
            )
    }
}

/// Host rule routing every path to one service port
#[derive(Debug, Clone)]
pub struct IngressRule {
    pub host: String,
    pub service_name: Value,
    pub service_port: u16,
}

#[derive(Debug, Clone)]
pub struct Ingress {
    pub metadata: ObjectMeta,
    pub rules: Vec<IngressRule>,
}

impl Ingress {
    pub const KIND: &'static str = "kubernetes:networking.k8s.io/v1:Ingress";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for Ingress {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let rules = Value::list(self.rules.iter().map(|r| {
            let backend = Properties::new().with(
                "service",
                Properties::new()
                    .with("name", r.service_name.clone())
                    .with(
                        "port",
                        Properties::new().with("number", u32::from(r.service_port)),
                    ),
            );
            let path = Properties::new()
                .with("path", "/")
                .with("pathType", "Prefix")
                .with("backend", backend);
            Properties::new()
                .with("host", r.host.as_str())
                .with("http", Properties::new().with("paths", Value::list([path])))
        }));
        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with("spec", Properties::new().with("rules", rules))
    }
}

// ============================================================================
// RBAC
// ============================================================================

#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub api_groups: Vec<String>,
    pub resources: Vec<String>,
    pub verbs: Vec<String>,
}

impl PolicyRule {
    pub fn new(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            api_groups: owned(api_groups),
            resources: owned(resources),
            verbs: owned(verbs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterRole {
    pub metadata: ObjectMeta,
    pub rules: Vec<PolicyRule>,
}

impl ClusterRole {
    pub const KIND: &'static str = "kubernetes:rbac.authorization.k8s.io/v1:ClusterRole";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for ClusterRole {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let rules = Value::list(self.rules.iter().map(|r| {
            Properties::new()
                .with("apiGroups", r.api_groups.clone())
                .with("resources", r.resources.clone())
                .with("verbs", r.verbs.clone())
        }));
        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with("rules", rules)
    }
}

/// Binds a cluster role to one service account
#[derive(Debug, Clone)]
pub struct ClusterRoleBinding {
    pub metadata: ObjectMeta,
    pub role_name: Value,
    pub subject_name: Value,
    pub subject_namespace: Value,
}

impl ClusterRoleBinding {
    pub const KIND: &'static str = "kubernetes:rbac.authorization.k8s.io/v1:ClusterRoleBinding";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;
}

impl Resource for ClusterRoleBinding {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let subject = Properties::new()
            .with("kind", "ServiceAccount")
            .with("name", self.subject_name.clone())
            .with("namespace", self.subject_namespace.clone());
        Properties::new()
            .with("metadata", self.metadata.to_value())
            .with(
                "roleRef",
                Properties::new()
                    .with("apiGroup", "rbac.authorization.k8s.io")
                    .with("kind", "ClusterRole")
                    .with("name", self.role_name.clone()),
            )
            .with("subjects", Value::list([subject]))
    }
}

// ============================================================================
// Custom resources and manifests
// ============================================================================

/// Instance of a custom resource definition
#[derive(Debug, Clone)]
pub struct CustomResource {
    /// Type token, e.g. `kubernetes:rabbitmq.com/v1beta1:RabbitmqCluster`
    pub token: &'static str,
    pub api_version: &'static str,
    pub object_kind: &'static str,
    pub metadata: ObjectMeta,
    pub spec: Properties,
}

impl CustomResource {
    pub const MANAGED_CERTIFICATE: &'static str =
        "kubernetes:networking.gke.io/v1:ManagedCertificate";
    pub const RABBITMQ_CLUSTER: &'static str = "kubernetes:rabbitmq.com/v1beta1:RabbitmqCluster";
    pub const ATTRIBUTES: &'static [&'static str] = OBJECT_ATTRIBUTES;

    pub fn managed_certificate(metadata: ObjectMeta, domains: &[String]) -> Self {
        Self {
            token: Self::MANAGED_CERTIFICATE,
            api_version: "networking.gke.io/v1",
            object_kind: "ManagedCertificate",
            metadata,
            spec: Properties::new().with("domains", domains.to_vec()),
        }
    }

    pub fn rabbitmq_cluster(metadata: ObjectMeta, spec: Properties) -> Self {
        Self {
            token: Self::RABBITMQ_CLUSTER,
            api_version: "rabbitmq.com/v1beta1",
            object_kind: "RabbitmqCluster",
            metadata,
            spec,
        }
    }
}

impl Resource for CustomResource {
    fn kind(&self) -> &'static str {
        self.token
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("apiVersion", self.api_version)
            .with("kind", self.object_kind)
            .with("metadata", self.metadata.to_value())
            .with("spec", self.spec.clone())
    }
}

/// Multi-document manifest applied from a URL
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub file: String,
}

impl ConfigFile {
    pub const KIND: &'static str = "kubernetes:yaml:ConfigFile";
    pub const ATTRIBUTES: &'static [&'static str] = &["resources"];
}

impl Resource for ConfigFile {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new().with("file", self.file.as_str())
    }
}
