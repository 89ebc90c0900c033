//! Typed resource kinds for the stack
//!
//! One module per provider family. Each kind carries its provider type token
//! (`KIND`) and the computed attributes other declarations may reference
//! (`ATTRIBUTES`), and implements [`declarative::Resource`] to produce its
//! property bag.

pub mod artifact_registry;
pub mod cloudbuild;
pub mod container;
pub mod dns;
pub mod kms;
pub mod kubernetes;
pub mod logging;
pub mod network;
pub mod pubsub;
pub mod sql;
pub mod storage;

use declarative::{AttributeCatalog, Value};

/// Attributes every managed resource exposes once created
const COMMON_ATTRIBUTES: &[&str] = &["id", "urn"];

/// Kind token to exposed attributes, for every kind this crate declares
const CATALOG: &[(&str, &[&str])] = &[
    (kms::KeyRing::KIND, kms::KeyRing::ATTRIBUTES),
    (kms::CryptoKey::KIND, kms::CryptoKey::ATTRIBUTES),
    (kms::CryptoKeyIamBinding::KIND, kms::CryptoKeyIamBinding::ATTRIBUTES),
    (storage::Bucket::KIND, storage::Bucket::ATTRIBUTES),
    (storage::Notification::KIND, storage::Notification::ATTRIBUTES),
    (
        storage::ProjectServiceAccount::KIND,
        storage::ProjectServiceAccount::ATTRIBUTES,
    ),
    (logging::ProjectBucketConfig::KIND, logging::ProjectBucketConfig::ATTRIBUTES),
    (sql::DatabaseInstance::KIND, sql::DatabaseInstance::ATTRIBUTES),
    (sql::Database::KIND, sql::Database::ATTRIBUTES),
    (sql::User::KIND, sql::User::ATTRIBUTES),
    (pubsub::Topic::KIND, pubsub::Topic::ATTRIBUTES),
    (pubsub::Subscription::KIND, pubsub::Subscription::ATTRIBUTES),
    (pubsub::TopicIamBinding::KIND, pubsub::TopicIamBinding::ATTRIBUTES),
    (network::Network::KIND, network::Network::ATTRIBUTES),
    (network::Subnetwork::KIND, network::Subnetwork::ATTRIBUTES),
    (network::GlobalAddress::KIND, network::GlobalAddress::ATTRIBUTES),
    (network::ServiceConnection::KIND, network::ServiceConnection::ATTRIBUTES),
    (container::Cluster::KIND, container::Cluster::ATTRIBUTES),
    (artifact_registry::Repository::KIND, artifact_registry::Repository::ATTRIBUTES),
    (cloudbuild::Trigger::KIND, cloudbuild::Trigger::ATTRIBUTES),
    (dns::ManagedZone::KIND, dns::ManagedZone::ATTRIBUTES),
    (kubernetes::Provider::KIND, kubernetes::Provider::ATTRIBUTES),
    (kubernetes::Namespace::KIND, kubernetes::Namespace::ATTRIBUTES),
    (kubernetes::ServiceAccount::KIND, kubernetes::ServiceAccount::ATTRIBUTES),
    (kubernetes::Secret::KIND, kubernetes::Secret::ATTRIBUTES),
    (kubernetes::Deployment::KIND, kubernetes::Deployment::ATTRIBUTES),
    (kubernetes::Service::KIND, kubernetes::Service::ATTRIBUTES),
    (kubernetes::Ingress::KIND, kubernetes::Ingress::ATTRIBUTES),
    (kubernetes::ClusterRole::KIND, kubernetes::ClusterRole::ATTRIBUTES),
    (
        kubernetes::ClusterRoleBinding::KIND,
        kubernetes::ClusterRoleBinding::ATTRIBUTES,
    ),
    (
        kubernetes::CustomResource::MANAGED_CERTIFICATE,
        kubernetes::CustomResource::ATTRIBUTES,
    ),
    (
        kubernetes::CustomResource::RABBITMQ_CLUSTER,
        kubernetes::CustomResource::ATTRIBUTES,
    ),
    (kubernetes::ConfigFile::KIND, kubernetes::ConfigFile::ATTRIBUTES),
];

/// Attribute knowledge for every kind in this crate
///
/// A reference is accepted when the first segment of its attribute path
/// (before any `.` or `[`) is exposed by the target kind. Unknown kinds expose
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderCatalog;

impl ProviderCatalog {
    /// Whether `kind` is declared anywhere in this crate
    pub fn has_kind(kind: &str) -> bool {
        CATALOG.iter().any(|(k, _)| *k == kind)
    }
}

impl AttributeCatalog for ProviderCatalog {
    fn knows(&self, kind: &str, attribute: &str) -> bool {
        let head = attribute
            .split(['.', '['])
            .next()
            .unwrap_or(attribute);
        CATALOG
            .iter()
            .find(|(k, _)| *k == kind)
            .is_some_and(|(_, attrs)| COMMON_ATTRIBUTES.contains(&head) || attrs.contains(&head))
    }
}

/// IAM member string for a service account email
pub fn service_account_member(email: impl Into<Value>) -> Value {
    Value::concat([Value::from("serviceAccount:"), email.into()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_attribute_head() {
        let catalog = ProviderCatalog;
        assert!(catalog.knows(container::Cluster::KIND, "masterAuth.clusterCaCertificate"));
        assert!(catalog.knows(container::Cluster::KIND, "id"));
        assert!(catalog.knows(kubernetes::Namespace::KIND, "metadata.name"));
        assert!(!catalog.knows(container::Cluster::KIND, "kubeconfig"));
        assert!(!catalog.knows("gcp:unknown/thing:Thing", "id"));
    }

    #[test]
    fn test_catalog_has_no_duplicate_kinds() {
        for (i, (kind, _)) in CATALOG.iter().enumerate() {
            assert!(
                CATALOG[i + 1..].iter().all(|(k, _)| k != kind),
                "duplicate kind {kind}"
            );
        }
    }

    #[test]
    fn test_service_account_member_is_interpolated() {
        let member = service_account_member(Value::reference("gcs-account", "emailAddress"));
        assert_eq!(member.refs().len(), 1);
        assert!(!member.is_secret());
    }
}
