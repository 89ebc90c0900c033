//! Cloud Storage resources

use declarative::{Properties, Resource, ResourceMode, Value};
use std::collections::BTreeMap;

/// CORS policy entry of a bucket
#[derive(Debug, Clone)]
pub struct Cors {
    pub max_age_seconds: u32,
    pub methods: Vec<String>,
    pub origins: Vec<String>,
    pub response_headers: Vec<String>,
}

impl Cors {
    /// Every verb from any origin
    pub fn permissive(max_age_seconds: u32) -> Self {
        Self {
            max_age_seconds,
            methods: ["GET", "HEAD", "PUT", "POST", "DELETE"]
                .into_iter()
                .map(String::from)
                .collect(),
            origins: vec!["*".to_string()],
            response_headers: vec!["*".to_string()],
        }
    }

    fn to_value(&self) -> Value {
        Properties::new()
            .with("maxAgeSeconds", self.max_age_seconds)
            .with("methods", self.methods.clone())
            .with("origins", self.origins.clone())
            .with("responseHeaders", self.response_headers.clone())
            .into()
    }
}

/// Move objects to a colder storage class after `age` days
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRule {
    pub age: u32,
    pub storage_class: String,
}

impl LifecycleRule {
    pub fn set_storage_class(age: u32, storage_class: &str) -> Self {
        Self {
            age,
            storage_class: storage_class.to_string(),
        }
    }

    fn to_value(&self) -> Value {
        Properties::new()
            .with(
                "action",
                Properties::new()
                    .with("type", "SetStorageClass")
                    .with("storageClass", self.storage_class.as_str()),
            )
            .with("condition", Properties::new().with("age", self.age))
            .into()
    }
}

/// An object bucket
#[derive(Debug, Clone)]
pub struct Bucket {
    pub name: String,
    pub location: String,
    pub force_destroy: bool,
    pub labels: BTreeMap<String, String>,
    pub cors: Vec<Cors>,
    pub lifecycle_rules: Vec<LifecycleRule>,
    /// Crypto key id used as default encryption key
    pub default_kms_key_name: Option<Value>,
}

impl Bucket {
    pub const KIND: &'static str = "gcp:storage/bucket:Bucket";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "url", "selfLink", "location"];
}

impl Resource for Bucket {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let labels: Properties = self
            .labels
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        Properties::new()
            .with("name", self.name.as_str())
            .with("location", self.location.as_str())
            .with("forceDestroy", self.force_destroy)
            .with("labels", labels)
            .with("cors", Value::list(self.cors.iter().map(Cors::to_value)))
            .with(
                "lifecycleRules",
                Value::list(self.lifecycle_rules.iter().map(LifecycleRule::to_value)),
            )
            .with_opt(
                "encryption",
                self.default_kms_key_name
                    .clone()
                    .map(|key| Properties::new().with("defaultKmsKeyName", key)),
            )
    }
}

/// Bucket change notifications published to a topic
#[derive(Debug, Clone)]
pub struct Notification {
    pub bucket: Value,
    pub topic: Value,
    pub payload_format: String,
    pub event_types: Vec<String>,
    pub custom_attributes: BTreeMap<String, String>,
}

impl Notification {
    pub const KIND: &'static str = "gcp:storage/notification:Notification";
    pub const ATTRIBUTES: &'static [&'static str] = &["notificationId", "selfLink"];
}

impl Resource for Notification {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let attributes: Properties = self
            .custom_attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        Properties::new()
            .with("bucket", self.bucket.clone())
            .with("topic", self.topic.clone())
            .with("payloadFormat", self.payload_format.as_str())
            .with("eventTypes", self.event_types.clone())
            .with("customAttributes", attributes)
    }
}

/// The project's Cloud Storage service agent (read-only lookup)
#[derive(Debug, Clone)]
pub struct ProjectServiceAccount {
    pub project: String,
}

impl ProjectServiceAccount {
    pub const KIND: &'static str = "gcp:storage/getProjectServiceAccount:getProjectServiceAccount";
    pub const ATTRIBUTES: &'static [&'static str] = &["emailAddress", "member"];
}

impl Resource for ProjectServiceAccount {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn mode(&self) -> ResourceMode {
        ResourceMode::Lookup
    }

    fn properties(&self) -> Properties {
        Properties::new().with("project", self.project.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_properties_shape() {
        let bucket = Bucket {
            name: "dev-fit-file-bucket".into(),
            location: "US".into(),
            force_destroy: true,
            labels: [("env".to_string(), "dev".to_string())].into_iter().collect(),
            cors: vec![Cors::permissive(3600)],
            lifecycle_rules: vec![
                LifecycleRule::set_storage_class(30, "NEARLINE"),
                LifecycleRule::set_storage_class(90, "COLDLINE"),
            ],
            default_kms_key_name: Some(Value::reference("dev-storage-key", "id")),
        };
        let props = bucket.properties();

        assert_eq!(
            props.get_path("encryption.defaultKmsKeyName"),
            Some(&Value::reference("dev-storage-key", "id"))
        );
        let rules = props.get("lifecycleRules").and_then(Value::as_list).unwrap();
        assert_eq!(rules[1].get_path("condition.age"), Some(&Value::Int(90)));
        assert_eq!(
            rules[0].get_path("action.storageClass").and_then(Value::as_str),
            Some("NEARLINE")
        );
        let cors = props.get("cors").and_then(Value::as_list).unwrap();
        assert_eq!(cors[0].get("methods").and_then(Value::as_list).unwrap().len(), 5);
    }

    #[test]
    fn test_service_account_is_lookup() {
        let sa = ProjectServiceAccount {
            project: "demo".into(),
        };
        assert_eq!(sa.mode(), ResourceMode::Lookup);
    }

    #[test]
    fn test_bucket_without_kms_has_no_encryption() {
        let bucket = Bucket {
            name: "logs".into(),
            location: "US".into(),
            force_destroy: false,
            labels: BTreeMap::new(),
            cors: vec![],
            lifecycle_rules: vec![],
            default_kms_key_name: None,
        };
        assert!(bucket.properties().get("encryption").is_none());
    }
}
