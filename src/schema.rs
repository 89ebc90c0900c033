//! Stack configuration schema
//!
//! One TOML file per stack. Secret values never live here: `secrets` only
//! names the keys the external secret store is expected to hold.

use declarative::ConfigSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Problems found in a stack config after parsing
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("'{field}' is not a valid CIDR block: {value}")]
    InvalidCidr { field: &'static str, value: String },

    #[error("zone '{zone}' is not inside region '{region}'")]
    ZoneOutsideRegion { zone: String, region: String },

    #[error("host '{host}' is not under domain '{domain}'")]
    HostOutsideDomain { host: String, domain: String },
}

// ============================================================================
// Main Config Schema
// ============================================================================

/// Configuration of one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackConfig {
    /// Stack name, taken from the file name
    #[serde(skip)]
    pub stack: String,

    /// Keys held by the external secret store
    #[serde(default)]
    pub secrets: Vec<String>,

    pub project: ProjectConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    /// Free-form plain values (`root-service-account`, `cicd-service-account`, ...)
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl StackConfig {
    /// Starter config written by `config init`
    pub fn example(stack: &str) -> Self {
        let project = ProjectConfig::default();
        let values = [
            (
                "root-service-account",
                format!("root-sa@{}.iam.gserviceaccount.com", project.id),
            ),
            (
                "cicd-service-account",
                format!("cicd-writer@{}.iam.gserviceaccount.com", project.id),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            stack: stack.to_string(),
            secrets: DEFAULT_SECRETS.iter().map(|s| (*s).to_string()).collect(),
            project,
            github: GithubConfig::default(),
            cluster: ClusterConfig::default(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
            dns: DnsConfig::default(),
            images: ImagesConfig::default(),
            values,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("project.id", &self.project.id),
            ("project.region", &self.project.region),
            ("project.zone", &self.project.zone),
            ("github.owner", &self.github.owner),
            ("github.repo", &self.github.repo),
            ("dns.domain", &self.dns.domain),
            ("images.tag", &self.images.tag),
            ("images.repository", &self.images.repository),
        ] {
            if value.trim().is_empty() {
                errors.push(ConfigError::EmptyField(field));
            }
        }

        if !self.project.zone.starts_with(&format!("{}-", self.project.region)) {
            errors.push(ConfigError::ZoneOutsideRegion {
                zone: self.project.zone.clone(),
                region: self.project.region.clone(),
            });
        }

        let cidrs = [
            ("cluster.master_cidr", &self.cluster.master_cidr),
            ("cluster.subnet_cidr", &self.cluster.subnet_cidr),
            ("cluster.pods_cidr", &self.cluster.pods_cidr),
            ("cluster.services_cidr", &self.cluster.services_cidr),
        ];
        for (field, value) in cidrs {
            if !is_cidr(value) {
                errors.push(ConfigError::InvalidCidr {
                    field,
                    value: value.clone(),
                });
            }
        }
        for value in &self.cluster.master_authorized_networks {
            if !is_cidr(value) {
                errors.push(ConfigError::InvalidCidr {
                    field: "cluster.master_authorized_networks",
                    value: value.clone(),
                });
            }
        }

        for host in &self.dns.hosts {
            if host != &self.dns.domain && !host.ends_with(&format!(".{}", self.dns.domain)) {
                errors.push(ConfigError::HostOutsideDomain {
                    host: host.clone(),
                    domain: self.dns.domain.clone(),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Registry host for container images, e.g. `us-west1-docker.pkg.dev`
    pub fn docker_host(&self) -> String {
        format!("{}-docker.pkg.dev", self.project.region)
    }

    /// Image path prefix inside the docker registry, with trailing slash
    pub fn image_prefix(&self) -> String {
        format!(
            "{}/{}/{}/",
            self.docker_host(),
            self.project.id,
            self.images.repository
        )
    }

    /// Full image reference for a workload at the configured tag
    pub fn image(&self, workload: &str) -> String {
        format!("{}{}:{}", self.image_prefix(), workload, self.images.tag)
    }
}

impl ConfigSource for StackConfig {
    fn value(&self, key: &str) -> Option<String> {
        match key {
            "stack" => Some(self.stack.clone()),
            "project" => Some(self.project.id.clone()),
            "region" => Some(self.project.region.clone()),
            "zone" => Some(self.project.zone.clone()),
            _ => self.values.get(key).cloned(),
        }
    }

    fn has_secret(&self, key: &str) -> bool {
        self.secrets.iter().any(|s| s == key)
    }
}

/// Secret keys a stack references out of the box
pub const DEFAULT_SECRETS: &[&str] = &[
    "db-root-password",
    "web-app-bi-password",
    "jwt-secret",
    "webhook-client-secret",
    "webhook-verify-token",
    "rabbitmq-password",
];

/// Loose `a.b.c.d/n` check
fn is_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.split_once('/') else {
        return false;
    };
    let octets: Vec<&str> = addr.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|o| o.parse::<u8>().is_ok())
        && prefix.parse::<u8>().is_ok_and(|p| p <= 32)
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_zone")]
    pub zone: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            id: "animated-cell-381917".to_string(),
            region: default_region(),
            zone: default_zone(),
        }
    }
}

fn default_region() -> String {
    "us-west1".to_string()
}

fn default_zone() -> String {
    "us-west1-a".to_string()
}

/// Source repository that build triggers watch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    /// Branch regex for push triggers
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: "christopherstj".to_string(),
            repo: "ultrack".to_string(),
            branch: default_branch(),
        }
    }
}

fn default_branch() -> String {
    "^main$".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// CIDR blocks allowed to reach the control plane
    #[serde(default = "default_master_networks")]
    pub master_authorized_networks: Vec<String>,
    #[serde(default = "default_master_cidr")]
    pub master_cidr: String,
    #[serde(default = "default_subnet_cidr")]
    pub subnet_cidr: String,
    #[serde(default = "default_pods_cidr")]
    pub pods_cidr: String,
    #[serde(default = "default_services_cidr")]
    pub services_cidr: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            master_authorized_networks: default_master_networks(),
            master_cidr: default_master_cidr(),
            subnet_cidr: default_subnet_cidr(),
            pods_cidr: default_pods_cidr(),
            services_cidr: default_services_cidr(),
        }
    }
}

fn default_master_networks() -> Vec<String> {
    vec!["0.0.0.0/0".to_string()]
}

fn default_master_cidr() -> String {
    "172.16.0.0/28".to_string()
}

fn default_subnet_cidr() -> String {
    "10.10.0.0/20".to_string()
}

fn default_pods_cidr() -> String {
    "10.20.0.0/14".to_string()
}

fn default_services_cidr() -> String {
    "10.30.0.0/20".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Let teardown delete non-empty buckets
    #[serde(default = "default_true")]
    pub force_destroy: bool,
    #[serde(default = "default_bucket_location")]
    pub location: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            force_destroy: true,
            location: default_bucket_location(),
        }
    }
}

fn default_bucket_location() -> String {
    "US".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Also declare the private-IP instance
    #[serde(default = "default_true")]
    pub private_instance: bool,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default = "default_db_version")]
    pub version: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            private_instance: true,
            tier: default_tier(),
            version: default_db_version(),
        }
    }
}

fn default_tier() -> String {
    "db-f1-micro".to_string()
}

fn default_db_version() -> String {
    "MYSQL_8_0".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    pub domain: String,
    /// Hostnames routed by the ingress
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            domain: "example.com".to_string(),
            hosts: vec!["app.example.com".to_string(), "api.example.com".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Artifact registry repository id holding the images
    #[serde(default = "default_docker_repo")]
    pub repository: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            repository: default_docker_repo(),
        }
    }
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_docker_repo() -> String {
    "docker-repo".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml_str = r#"
secrets = ["db-root-password"]

[project]
id = "demo-project"

[dns]
domain = "demo.dev"
hosts = ["www.demo.dev"]

[values]
root-service-account = "root@demo-project.iam.gserviceaccount.com"
"#;
        let config: StackConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project.region, "us-west1");
        assert_eq!(config.cluster.master_authorized_networks, vec!["0.0.0.0/0"]);
        assert!(config.storage.force_destroy);
        assert!(config.database.private_instance);
        assert_eq!(config.github.branch, "^main$");
        assert!(config.has_secret("db-root-password"));
        assert!(!config.has_secret("jwt-secret"));
        assert_eq!(
            config.value("root-service-account").as_deref(),
            Some("root@demo-project.iam.gserviceaccount.com")
        );
        assert_eq!(config.value("project").as_deref(), Some("demo-project"));
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let example = StackConfig::example("dev");
        let text = toml::to_string_pretty(&example).unwrap();
        let parsed: StackConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.project.id, example.project.id);
        assert_eq!(parsed.secrets.len(), DEFAULT_SECRETS.len());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_problems() {
        let mut config = StackConfig::example("dev");
        config.project.id = String::new();
        config.project.zone = "europe-west1-b".to_string();
        config.cluster.pods_cidr = "10.0.0.0".to_string();
        config.cluster.master_authorized_networks = vec!["300.0.0.0/8".to_string()];
        config.dns.hosts = vec!["api.other.org".to_string()];

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ConfigError::EmptyField("project.id")));
        assert!(errors.iter().any(|e| matches!(e, ConfigError::ZoneOutsideRegion { .. })));
        assert!(errors.iter().any(|e| matches!(e, ConfigError::HostOutsideDomain { .. })));
    }

    #[test]
    fn test_image_paths() {
        let config = StackConfig::example("dev");
        assert_eq!(
            config.image("server"),
            "us-west1-docker.pkg.dev/animated-cell-381917/docker-repo/server:latest"
        );
        assert!(config.image("client").starts_with(&config.image_prefix()));
    }

    #[test]
    fn test_is_cidr() {
        assert!(is_cidr("0.0.0.0/0"));
        assert!(is_cidr("172.16.0.0/28"));
        assert!(!is_cidr("172.16.0.0"));
        assert!(!is_cidr("172.16.0/28"));
        assert!(!is_cidr("172.16.0.0/33"));
    }
}
