//! Declarations for one stack
//!
//! [`build`] turns a [`StackConfig`] into the full resource graph. Each
//! submodule declares one functional cluster and hands back the handles later
//! clusters reference.

mod cicd;
mod database;
mod identity;
mod ingress;
mod messaging;
mod platform;
mod storage;
pub mod workloads;

use crate::schema::StackConfig;
use declarative::{ResourceGraph, Result};

/// Build the resource graph for a stack
pub fn build(config: &StackConfig) -> Result<ResourceGraph> {
    let mut graph = ResourceGraph::new(config.stack.as_str());

    let identity = identity::declare(&mut graph, config)?;
    let bucket = storage::declare(&mut graph, config, &identity)?;
    let platform = platform::declare(&mut graph, config)?;
    let database = database::declare(&mut graph, config, &platform)?;
    messaging::declare(&mut graph, config, &identity, &bucket)?;
    workloads::declare(&mut graph, config, &platform, &database)?;
    ingress::declare(&mut graph, config, &platform)?;
    cicd::declare(&mut graph, config, &platform)?;

    graph.export("clusterName", platform.cluster.attr("name"), false)?;
    graph.export("clusterEndpoint", platform.cluster.attr("endpoint"), false)?;
    graph.export("kubeconfig", platform.kubeconfig.clone(), true)?;

    log::debug!(
        "declared {} resources for stack '{}'",
        graph.len(),
        config.stack
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::workloads::WORKLOADS;
    use super::*;
    use crate::resource::ProviderCatalog;
    use crate::resource::kubernetes::{ConfigFile, CustomResource, Deployment, Provider};
    use crate::resource::{cloudbuild, storage as gcs};
    use declarative::{DeploymentPlan, Value};

    fn dev_graph() -> (StackConfig, ResourceGraph) {
        let config = StackConfig::example("dev");
        let graph = build(&config).unwrap();
        (config, graph)
    }

    #[test]
    fn test_dev_stack_validates() {
        let (config, graph) = dev_graph();
        graph.validate(&ProviderCatalog, &config).unwrap();
        assert!(DeploymentPlan::from_graph(&graph).is_ok());
    }

    #[test]
    fn test_every_kind_is_cataloged() {
        let (_, graph) = dev_graph();
        for decl in graph.iter() {
            assert!(ProviderCatalog::has_kind(&decl.kind), "{}", decl.kind);
        }
    }

    #[test]
    fn test_in_cluster_resources_use_provider() {
        let (_, graph) = dev_graph();
        for decl in graph.iter() {
            if decl.kind.starts_with("kubernetes:") {
                assert_eq!(
                    decl.options.provider.as_deref(),
                    Some("dev-gke-provider"),
                    "{}",
                    decl.name
                );
            }
        }
        assert_eq!(graph.of_kind(Provider::KIND).count(), 1);
    }

    #[test]
    fn test_six_deployments_with_shared_secrets() {
        let (_, graph) = dev_graph();
        let deployments: Vec<_> = graph.of_kind(Deployment::KIND).collect();
        assert_eq!(deployments.len(), 6);
        for d in deployments {
            let containers = d
                .properties
                .get_path("spec.template.spec.containers")
                .and_then(Value::as_list)
                .unwrap();
            assert_eq!(
                containers[0].get_path("envFrom").and_then(Value::as_list).map(<[Value]>::len),
                Some(1)
            );
        }
    }

    #[test]
    fn test_sql_proxy_sidecars() {
        let (_, graph) = dev_graph();
        for name in ["dev-server", "dev-fit-file-worker"] {
            let decl = graph.get(name).unwrap();
            let containers = decl
                .properties
                .get_path("spec.template.spec.containers")
                .and_then(Value::as_list)
                .unwrap();
            assert_eq!(containers.len(), 2, "{name}");
            assert!(
                decl.references()
                    .iter()
                    .any(|r| r.resource == "dev-private-db-instance"
                        && r.attribute == "connectionName")
            );
        }
        let client = graph.get("dev-client").unwrap();
        assert_eq!(
            client
                .properties
                .get_path("spec.template.spec.containers")
                .and_then(Value::as_list)
                .map(<[Value]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_rabbitmq_waits_for_operator() {
        let (_, graph) = dev_graph();
        let rabbit = graph.get("dev-rabbitmq").unwrap();
        assert_eq!(rabbit.kind, CustomResource::RABBITMQ_CLUSTER);
        assert!(
            rabbit
                .options
                .depends_on
                .contains(&"rabbitmq-cluster-operator".to_string())
        );
        assert_eq!(
            graph.get("rabbitmq-cluster-operator").map(|d| d.kind.as_str()),
            Some(ConfigFile::KIND)
        );
        let config = rabbit
            .properties
            .get_path("spec.rabbitmq.additionalConfig")
            .unwrap();
        assert!(config.is_secret());
    }

    #[test]
    fn test_bucket_encryption_and_lifecycle() {
        let (_, graph) = dev_graph();
        let bucket = graph.get("dev-fit-file-bucket").unwrap();
        assert_eq!(bucket.kind, gcs::Bucket::KIND);
        assert_eq!(
            bucket.properties.get_path("encryption.defaultKmsKeyName"),
            Some(&Value::reference("dev-storage-key", "id"))
        );
        assert!(
            bucket
                .options
                .depends_on
                .contains(&"dev-storage-key-binding".to_string())
        );
    }

    #[test]
    fn test_triggers_per_workload() {
        let (_, graph) = dev_graph();
        let triggers: Vec<_> = graph.of_kind(cloudbuild::Trigger::KIND).collect();
        assert_eq!(triggers.len(), WORKLOADS.len() + 1);
        let inline = triggers
            .iter()
            .filter(|t| t.properties.get("build").is_some())
            .count();
        assert_eq!(inline, 4);
    }

    #[test]
    fn test_private_instance_can_be_disabled() {
        let mut config = StackConfig::example("dev");
        config.database.private_instance = false;
        let graph = build(&config).unwrap();
        graph.validate(&ProviderCatalog, &config).unwrap();
        assert!(!graph.contains("dev-private-db-instance"));
        assert!(!graph.contains("dev-private-vpc-connection"));
        assert!(graph.contains("mysql-db-instance"));
    }

    #[test]
    fn test_outputs() {
        let (_, graph) = dev_graph();
        let names: Vec<_> = graph.outputs().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["clusterName", "clusterEndpoint", "kubeconfig"]);
        assert!(graph.outputs()[2].is_masked());
        assert!(!graph.outputs()[0].is_masked());
    }

    #[test]
    fn test_missing_root_service_account_fails() {
        let mut config = StackConfig::example("dev");
        config.values.remove("root-service-account");
        assert!(build(&config).is_err());
    }

    #[test]
    fn test_unknown_secret_key_fails_at_declaration() {
        let mut config = StackConfig::example("dev");
        config.secrets.retain(|s| s != "rabbitmq-password");
        let err = build(&config).unwrap_err();
        assert!(
            matches!(&err, declarative::Error::MissingConfig(key) if key == "rabbitmq-password"),
            "{err}"
        );
    }
}
