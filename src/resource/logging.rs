//! Cloud Logging resources

use declarative::{Properties, Resource};

/// Retention settings of a project log bucket
#[derive(Debug, Clone)]
pub struct ProjectBucketConfig {
    pub project: String,
    pub location: String,
    pub retention_days: u32,
    pub bucket_id: String,
}

impl ProjectBucketConfig {
    pub const KIND: &'static str = "gcp:logging/projectBucketConfig:ProjectBucketConfig";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "lifecycleState"];
}

impl Resource for ProjectBucketConfig {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("project", self.project.as_str())
            .with("location", self.location.as_str())
            .with("retentionDays", self.retention_days)
            .with("bucketId", self.bucket_id.as_str())
    }
}
