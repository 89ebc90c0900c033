//! File bucket and project log bucket

use super::identity::Identity;
use crate::resource::logging::ProjectBucketConfig;
use crate::resource::storage::{Bucket, Cors, LifecycleRule};
use crate::schema::StackConfig;
use declarative::{Declaration, Handle, ResourceGraph, Result};
use std::collections::BTreeMap;

const CORS_MAX_AGE_SECONDS: u32 = 3600;
const LOG_RETENTION_DAYS: u32 = 30;

/// Age in days at which objects move to a colder storage class
const LIFECYCLE: &[(u32, &str)] = &[(30, "NEARLINE"), (90, "COLDLINE"), (365, "ARCHIVE")];

/// Declares the buckets, returning the file bucket
pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    identity: &Identity,
) -> Result<Handle> {
    let env = &config.stack;

    let bucket = Bucket {
        name: format!("{env}-fit-file-bucket"),
        location: config.storage.location.clone(),
        force_destroy: config.storage.force_destroy,
        labels: BTreeMap::from([("env".to_string(), env.clone())]),
        cors: vec![Cors::permissive(CORS_MAX_AGE_SECONDS)],
        lifecycle_rules: LIFECYCLE
            .iter()
            .map(|(age, class)| LifecycleRule::set_storage_class(*age, class))
            .collect(),
        default_kms_key_name: Some(identity.storage_key.attr("id")),
    };
    let bucket = graph.add(
        Declaration::new(format!("{env}-fit-file-bucket"), &bucket).depends_on(&identity.key_binding),
    )?;

    let logs_id = format!("{env}-project-logs");
    graph.add(Declaration::new(
        logs_id.as_str(),
        &ProjectBucketConfig {
            project: config.project.id.clone(),
            location: "global".into(),
            retention_days: LOG_RETENTION_DAYS,
            bucket_id: logs_id.clone(),
        },
    ))?;

    Ok(bucket)
}
