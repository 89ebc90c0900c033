//! Network, cluster and the in-cluster basics every workload shares

use crate::resource::container::Cluster;
use crate::resource::kubernetes::{Namespace, ObjectMeta, Provider, ServiceAccount};
use crate::resource::network::{Network, SecondaryRange, Subnetwork};
use crate::schema::StackConfig;
use declarative::{Declaration, Handle, ResourceGraph, Result, Value};

const BINAUTHZ_MODE: &str = "PROJECT_SINGLETON_POLICY_ENFORCE";
const PODS_RANGE: &str = "pods";
const SERVICES_RANGE: &str = "services";

pub(super) struct Platform {
    pub network: Handle,
    pub cluster: Handle,
    pub kubeconfig: Value,
    pub provider: Handle,
    pub namespace: Handle,
    pub service_account: Handle,
}

pub(super) fn declare(graph: &mut ResourceGraph, config: &StackConfig) -> Result<Platform> {
    let env = &config.stack;
    let project = &config.project;

    let network = graph.add(Declaration::new(
        format!("{env}-network"),
        &Network {
            name: format!("{env}-network"),
            project: project.id.clone(),
        },
    ))?;

    let subnet = graph.add(Declaration::new(
        format!("{env}-subnet"),
        &Subnetwork {
            name: format!("{env}-subnet"),
            region: project.region.clone(),
            network: network.attr("id"),
            ip_cidr_range: config.cluster.subnet_cidr.clone(),
            private_ip_google_access: true,
            secondary_ranges: vec![
                SecondaryRange {
                    name: PODS_RANGE.into(),
                    cidr: config.cluster.pods_cidr.clone(),
                },
                SecondaryRange {
                    name: SERVICES_RANGE.into(),
                    cidr: config.cluster.services_cidr.clone(),
                },
            ],
        },
    ))?;

    let cluster = graph.add(Declaration::new(
        format!("{env}-cluster"),
        &Cluster {
            name: format!("{env}-cluster"),
            project: project.id.clone(),
            location: project.region.clone(),
            network: network.attr("id"),
            subnetwork: subnet.attr("id"),
            binauthz_mode: BINAUTHZ_MODE.into(),
            master_authorized_networks: config.cluster.master_authorized_networks.clone(),
            master_ipv4_cidr_block: config.cluster.master_cidr.clone(),
            pods_range_name: PODS_RANGE.into(),
            services_range_name: SERVICES_RANGE.into(),
            deletion_protection: false,
        },
    ))?;

    let kubeconfig = kubeconfig(&cluster);
    let provider = graph.add(Declaration::new(
        format!("{env}-gke-provider"),
        &Provider {
            kubeconfig: kubeconfig.clone(),
        },
    ))?;

    let namespace = graph.add(
        Declaration::new(
            env.as_str(),
            &Namespace {
                metadata: ObjectMeta::named(env),
            },
        )
        .with_provider(&provider),
    )?;

    let sa_name = format!("{env}-service-account");
    let service_account = graph.add(
        Declaration::new(
            sa_name.as_str(),
            &ServiceAccount {
                metadata: ObjectMeta::named(&sa_name).in_namespace(namespace.attr("metadata.name")),
            },
        )
        .with_provider(&provider),
    )?;

    Ok(Platform {
        network,
        cluster,
        kubeconfig,
        provider,
        namespace,
        service_account,
    })
}

/// Kubeconfig document for the cluster, authenticating through
/// `gke-gcloud-auth-plugin`
fn kubeconfig(cluster: &Handle) -> Value {
    let name = || cluster.attr("name");
    Value::concat([
        Value::from(
            "apiVersion: v1\n\
             clusters:\n\
             - cluster:\n    \
             certificate-authority-data: ",
        ),
        cluster.attr("masterAuth.clusterCaCertificate"),
        "\n    server: https://".into(),
        cluster.attr("endpoint"),
        "\n  name: ".into(),
        name(),
        "\ncontexts:\n- context:\n    cluster: ".into(),
        name(),
        "\n    user: ".into(),
        name(),
        "\n  name: ".into(),
        name(),
        "\ncurrent-context: ".into(),
        name(),
        "\nkind: Config\npreferences: {}\nusers:\n- name: ".into(),
        name(),
        "\n  user:\n    exec:\n      \
         apiVersion: client.authentication.k8s.io/v1beta1\n      \
         command: gke-gcloud-auth-plugin\n      \
         installHint: Install gke-gcloud-auth-plugin for use with kubectl\n      \
         provideClusterInfo: true\n"
            .into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubeconfig_references_cluster() {
        let config = StackConfig::example("dev");
        let mut graph = ResourceGraph::new("dev");
        let platform = declare(&mut graph, &config).unwrap();

        let attrs: Vec<_> = platform
            .kubeconfig
            .refs()
            .into_iter()
            .map(|r| r.attribute.as_str())
            .collect();
        assert!(attrs.contains(&"masterAuth.clusterCaCertificate"));
        assert!(attrs.contains(&"endpoint"));
        assert!(
            platform
                .kubeconfig
                .refs()
                .iter()
                .all(|r| r.resource == "dev-cluster")
        );
    }

    #[test]
    fn test_subnet_secondary_ranges() {
        let config = StackConfig::example("dev");
        let mut graph = ResourceGraph::new("dev");
        declare(&mut graph, &config).unwrap();

        let subnet = graph.get("dev-subnet").unwrap();
        let ranges = subnet
            .properties
            .get("secondaryIpRanges")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(
            subnet.properties.get("privateIpGoogleAccess"),
            Some(&Value::Bool(true))
        );
    }
}
