//! VPC networking resources

use declarative::{Properties, Resource, Value};

/// A custom-mode VPC network
#[derive(Debug, Clone)]
pub struct Network {
    pub name: String,
    pub project: String,
}

impl Network {
    pub const KIND: &'static str = "gcp:compute/network:Network";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "selfLink", "gatewayIpv4"];
}

impl Resource for Network {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("autoCreateSubnetworks", false)
    }
}

/// Named secondary range of a subnetwork
#[derive(Debug, Clone)]
pub struct SecondaryRange {
    pub name: String,
    pub cidr: String,
}

#[derive(Debug, Clone)]
pub struct Subnetwork {
    pub name: String,
    pub region: String,
    pub network: Value,
    pub ip_cidr_range: String,
    pub private_ip_google_access: bool,
    pub secondary_ranges: Vec<SecondaryRange>,
}

impl Subnetwork {
    pub const KIND: &'static str = "gcp:compute/subnetwork:Subnetwork";
    pub const ATTRIBUTES: &'static [&'static str] =
        &["name", "selfLink", "gatewayAddress", "ipCidrRange"];
}

impl Resource for Subnetwork {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let ranges = Value::list(self.secondary_ranges.iter().map(|r| {
            Properties::new()
                .with("rangeName", r.name.as_str())
                .with("ipCidrRange", r.cidr.as_str())
        }));

        Properties::new()
            .with("name", self.name.as_str())
            .with("region", self.region.as_str())
            .with("network", self.network.clone())
            .with("ipCidrRange", self.ip_cidr_range.as_str())
            .with("privateIpGoogleAccess", self.private_ip_google_access)
            .with("secondaryIpRanges", ranges)
    }
}

/// A global address: either an external static IP or a reserved peering range
#[derive(Debug, Clone)]
pub struct GlobalAddress {
    pub name: String,
    pub project: String,
    /// `VPC_PEERING` for reserved ranges
    pub purpose: Option<String>,
    /// `INTERNAL` for reserved ranges
    pub address_type: Option<String>,
    pub prefix_length: Option<u32>,
    pub network: Option<Value>,
}

impl GlobalAddress {
    pub const KIND: &'static str = "gcp:compute/globalAddress:GlobalAddress";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "address", "selfLink"];

    /// External static IP, e.g. for a load balancer
    pub fn external(name: &str, project: &str) -> Self {
        Self {
            name: name.to_string(),
            project: project.to_string(),
            purpose: None,
            address_type: None,
            prefix_length: None,
            network: None,
        }
    }

    /// Internal range reserved for VPC peering with managed services
    pub fn peering_range(name: &str, project: &str, prefix_length: u32, network: Value) -> Self {
        Self {
            name: name.to_string(),
            project: project.to_string(),
            purpose: Some("VPC_PEERING".to_string()),
            address_type: Some("INTERNAL".to_string()),
            prefix_length: Some(prefix_length),
            network: Some(network),
        }
    }
}

impl Resource for GlobalAddress {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with_opt("purpose", self.purpose.as_deref())
            .with_opt("addressType", self.address_type.as_deref())
            .with_opt("prefixLength", self.prefix_length)
            .with_opt("network", self.network.clone())
    }
}

/// Private services access peering (used by private Cloud SQL)
#[derive(Debug, Clone)]
pub struct ServiceConnection {
    pub network: Value,
    pub service: String,
    pub reserved_peering_ranges: Vec<Value>,
}

impl ServiceConnection {
    pub const KIND: &'static str = "gcp:servicenetworking/connection:Connection";
    pub const ATTRIBUTES: &'static [&'static str] = &["peering"];
}

impl Resource for ServiceConnection {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("network", self.network.clone())
            .with("service", self.service.as_str())
            .with("reservedPeeringRanges", self.reserved_peering_ranges.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_address_is_minimal() {
        let props = GlobalAddress::external("dev-ingress-ip", "demo").properties();
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_peering_range_references_network() {
        let props =
            GlobalAddress::peering_range("range", "demo", 16, Value::reference("net", "id"))
                .properties();
        assert_eq!(props.get("purpose").and_then(Value::as_str), Some("VPC_PEERING"));
        assert_eq!(props.get("prefixLength").and_then(Value::as_int), Some(16));
        assert_eq!(props.refs().len(), 1);
    }
}
