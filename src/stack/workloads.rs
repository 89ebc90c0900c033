//! Application deployments, their shared secret bundle and the message broker

use super::database::Databases;
use super::platform::Platform;
use crate::resource::kubernetes::{
    ConfigFile, Container, CustomResource, Deployment, HttpProbe, ObjectMeta, Secret,
};
use crate::schema::StackConfig;
use declarative::{ConfigSource, Declaration, Properties, ResourceGraph, Result, Value};
use std::collections::BTreeMap;

/// Public image of the Cloud SQL auth proxy sidecar
pub const SQL_PROXY_IMAGE: &str = "gcr.io/cloud-sql-connectors/cloud-sql-proxy:2.11.4";

const RABBITMQ_OPERATOR_URL: &str =
    "https://github.com/rabbitmq/cluster-operator/releases/latest/download/cluster-operator.yml";

/// One application workload built from the monorepo
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    pub name: &'static str,
    /// Repository directory holding the workload's sources
    pub source_dir: &'static str,
    /// Serves HTTP on port 80 with a `/health` endpoint
    pub http: bool,
    /// Runs a Cloud SQL proxy sidecar
    pub sql_proxy: bool,
    /// Build steps are declared on the trigger rather than in the repository
    pub inline_build: bool,
    pub cpu: &'static str,
    pub memory: &'static str,
}

pub const WORKLOADS: &[Workload] = &[
    Workload {
        name: "server",
        source_dir: "server",
        http: true,
        sql_proxy: true,
        inline_build: true,
        cpu: "500m",
        memory: "1Gi",
    },
    Workload {
        name: "client",
        source_dir: "client",
        http: true,
        sql_proxy: false,
        inline_build: true,
        cpu: "250m",
        memory: "512Mi",
    },
    Workload {
        name: "fit-file-worker",
        source_dir: "workers/fit-file-worker",
        http: false,
        sql_proxy: true,
        inline_build: true,
        cpu: "500m",
        memory: "1Gi",
    },
    Workload {
        name: "python-processor",
        source_dir: "workers/python-processor",
        http: false,
        sql_proxy: false,
        inline_build: true,
        cpu: "1",
        memory: "2Gi",
    },
    Workload {
        name: "webhook-worker",
        source_dir: "workers/webhook-worker",
        http: false,
        sql_proxy: false,
        inline_build: false,
        cpu: "250m",
        memory: "512Mi",
    },
    Workload {
        name: "scheduler",
        source_dir: "workers/scheduler",
        http: false,
        sql_proxy: false,
        inline_build: false,
        cpu: "250m",
        memory: "256Mi",
    },
];

/// Environment variable to secret store key
const APP_SECRETS: &[(&str, &str)] = &[
    ("JWT_SECRET", "jwt-secret"),
    ("DB_PASSWORD", "web-app-bi-password"),
    ("WEBHOOK_CLIENT_SECRET", "webhook-client-secret"),
    ("WEBHOOK_VERIFY_TOKEN", "webhook-verify-token"),
    ("RABBITMQ_PASSWORD", "rabbitmq-password"),
];

pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    platform: &Platform,
    databases: &Databases,
) -> Result<()> {
    let env = &config.stack;
    let namespace = platform.namespace.attr("metadata.name");

    let string_data: BTreeMap<String, Value> = APP_SECRETS
        .iter()
        .map(|(var, key)| Ok(((*var).to_string(), config.require_secret(key)?)))
        .collect::<Result<_>>()?;
    let secrets = graph.add(
        Declaration::new(
            format!("{env}-app-secrets"),
            &Secret {
                metadata: ObjectMeta::named("app-secrets").in_namespace(namespace.clone()),
                string_data,
            },
        )
        .with_provider(&platform.provider),
    )?;

    for workload in WORKLOADS {
        let mut containers = vec![Container {
            name: workload.name.to_string(),
            image: config.image(workload.name),
            ports: if workload.http { vec![80] } else { Vec::new() },
            env_from_secret: Some(secrets.attr("metadata.name")),
            cpu: workload.cpu.to_string(),
            memory: workload.memory.to_string(),
            probe: workload.http.then(|| HttpProbe {
                path: "/health".into(),
                port: 80,
                initial_delay_seconds: 15,
            }),
            ..Default::default()
        }];
        if workload.sql_proxy {
            containers.push(sql_proxy(databases));
        }

        let deployment = Deployment {
            metadata: ObjectMeta::named(workload.name)
                .in_namespace(namespace.clone())
                .label("app", workload.name),
            replicas: 1,
            app: workload.name.to_string(),
            service_account: Some(platform.service_account.attr("metadata.name")),
            containers,
        };
        graph.add(
            Declaration::new(format!("{env}-{}", workload.name), &deployment)
                .with_provider(&platform.provider),
        )?;
    }

    declare_broker(graph, config, platform, &namespace)
}

fn sql_proxy(databases: &Databases) -> Container {
    let mut args: Vec<Value> = vec!["--structured-logs".into(), "--port=3306".into()];
    if databases.private {
        args.push("--private-ip".into());
    }
    args.push(databases.proxy_target.attr("connectionName"));

    Container {
        name: "cloud-sql-proxy".into(),
        image: SQL_PROXY_IMAGE.into(),
        args,
        cpu: "100m".into(),
        memory: "128Mi".into(),
        ..Default::default()
    }
}

/// RabbitMQ operator and a single-node cluster
fn declare_broker(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    platform: &Platform,
    namespace: &Value,
) -> Result<()> {
    let env = &config.stack;
    // Installs the RabbitmqCluster CRD
    let operator = graph.add(
        Declaration::new(
            "rabbitmq-cluster-operator",
            &ConfigFile {
                file: RABBITMQ_OPERATOR_URL.into(),
            },
        )
        .with_provider(&platform.provider),
    )?;

    let resources = Properties::new()
        .with(
            "requests",
            Properties::new().with("cpu", "500m").with("memory", "1Gi"),
        )
        .with(
            "limits",
            Properties::new().with("cpu", "1").with("memory", "2Gi"),
        );
    let additional_config = Value::concat([
        Value::from("default_user = rabbitmq\ndefault_pass = "),
        config.require_secret("rabbitmq-password")?,
        Value::from("\n"),
    ]);
    let spec = Properties::new()
        .with("replicas", 1)
        .with("resources", resources)
        .with(
            "rabbitmq",
            Properties::new().with("additionalConfig", additional_config),
        );

    graph.add(
        Declaration::new(
            format!("{env}-rabbitmq"),
            &CustomResource::rabbitmq_cluster(
                ObjectMeta::named("rabbitmq").in_namespace(namespace.clone()),
                spec,
            ),
        )
        .depends_on(&operator)
        .with_provider(&platform.provider),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_table() {
        let names: Vec<_> = WORKLOADS.iter().map(|w| w.name).collect();
        assert_eq!(
            names,
            [
                "server",
                "client",
                "fit-file-worker",
                "python-processor",
                "webhook-worker",
                "scheduler"
            ]
        );
        assert_eq!(WORKLOADS.iter().filter(|w| w.inline_build).count(), 4);
        assert_eq!(WORKLOADS.iter().filter(|w| w.sql_proxy).count(), 2);
    }

    #[test]
    fn test_app_secret_keys_are_declared_by_default() {
        let config = StackConfig::example("dev");
        for (_, key) in APP_SECRETS {
            assert!(
                config.secrets.iter().any(|s| s == key),
                "{key} missing from default secrets"
            );
        }
    }
}
