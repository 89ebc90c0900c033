//! Cloud DNS resources

use declarative::{Properties, Resource};

/// A public managed zone
#[derive(Debug, Clone)]
pub struct ManagedZone {
    pub name: String,
    pub project: String,
    /// Fully qualified, with trailing dot
    pub dns_name: String,
    pub description: String,
}

impl ManagedZone {
    pub const KIND: &'static str = "gcp:dns/managedZone:ManagedZone";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "nameServers", "managedZoneId"];

    pub fn new(name: &str, project: &str, domain: &str, description: &str) -> Self {
        let dns_name = if domain.ends_with('.') {
            domain.to_string()
        } else {
            format!("{domain}.")
        };
        Self {
            name: name.to_string(),
            project: project.to_string(),
            dns_name,
            description: description.to_string(),
        }
    }
}

impl Resource for ManagedZone {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("dnsName", self.dns_name.as_str())
            .with("description", self.description.as_str())
            .with("visibility", "public")
    }
}
