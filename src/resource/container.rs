//! GKE cluster resource

use declarative::{Properties, Resource, Value};

/// An Autopilot GKE cluster with private nodes
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub project: String,
    pub location: String,
    pub network: Value,
    pub subnetwork: Value,
    /// Binary authorization evaluation mode
    pub binauthz_mode: String,
    /// CIDR blocks allowed to reach the control plane
    pub master_authorized_networks: Vec<String>,
    pub master_ipv4_cidr_block: String,
    pub pods_range_name: String,
    pub services_range_name: String,
    pub deletion_protection: bool,
}

impl Cluster {
    pub const KIND: &'static str = "gcp:container/cluster:Cluster";
    pub const ATTRIBUTES: &'static [&'static str] =
        &["name", "endpoint", "masterAuth", "location", "selfLink"];
}

impl Resource for Cluster {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let cidr_blocks = Value::list(self.master_authorized_networks.iter().map(|cidr| {
            Properties::new()
                .with("cidrBlock", cidr.as_str())
                .with("displayName", authorized_network_label(cidr))
        }));

        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("location", self.location.as_str())
            .with("network", self.network.clone())
            .with("subnetwork", self.subnetwork.clone())
            .with("enableAutopilot", true)
            .with("deletionProtection", self.deletion_protection)
            .with(
                "binaryAuthorization",
                Properties::new().with("evaluationMode", self.binauthz_mode.as_str()),
            )
            .with(
                "masterAuthorizedNetworksConfig",
                Properties::new().with("cidrBlocks", cidr_blocks),
            )
            .with(
                "privateClusterConfig",
                Properties::new()
                    .with("enablePrivateNodes", true)
                    .with("enablePrivateEndpoint", false)
                    .with("masterIpv4CidrBlock", self.master_ipv4_cidr_block.as_str()),
            )
            .with(
                "ipAllocationPolicy",
                Properties::new()
                    .with("clusterSecondaryRangeName", self.pods_range_name.as_str())
                    .with("servicesSecondaryRangeName", self.services_range_name.as_str()),
            )
    }
}

fn authorized_network_label(cidr: &str) -> String {
    if cidr == "0.0.0.0/0" {
        "all".to_string()
    } else {
        format!("net-{}", cidr.replace(['.', '/'], "-"))
    }
}
