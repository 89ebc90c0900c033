//! Transport topic and bucket notifications

use super::identity::Identity;
use crate::resource::pubsub::{PUBLISHER_ROLE, Subscription, Topic, TopicIamBinding};
use crate::resource::service_account_member;
use crate::resource::storage::Notification;
use crate::schema::StackConfig;
use declarative::{Declaration, Handle, ResourceGraph, Result};
use std::collections::BTreeMap;

const ACK_DEADLINE_SECONDS: u32 = 20;

pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    identity: &Identity,
    bucket: &Handle,
) -> Result<()> {
    let env = &config.stack;
    let project = &config.project.id;

    let topic = graph.add(Declaration::new(
        "k8s-transport-topic",
        &Topic {
            name: "k8s-transport-topic".into(),
            project: project.clone(),
        },
    ))?;

    graph.add(Declaration::new(
        "k8s-transport-sub",
        &Subscription {
            name: "k8s-transport-sub".into(),
            project: project.clone(),
            topic: topic.attr("name"),
            ack_deadline_seconds: ACK_DEADLINE_SECONDS,
        },
    ))?;

    // The storage service agent publishes notifications
    let binding = graph.add(Declaration::new(
        format!("{env}-notification-binding"),
        &TopicIamBinding {
            topic: topic.attr("id"),
            role: PUBLISHER_ROLE.into(),
            members: vec![service_account_member(
                identity.gcs_account.attr("emailAddress"),
            )],
        },
    ))?;

    // GCS rejects the notification until the publisher role is granted, and
    // nothing in its properties points at the binding
    graph.add(
        Declaration::new(
            format!("{env}-python-notification"),
            &Notification {
                bucket: bucket.attr("name"),
                topic: topic.attr("id"),
                payload_format: "JSON_API_V1".into(),
                event_types: vec!["OBJECT_FINALIZE".into()],
                custom_attributes: BTreeMap::from([("env".to_string(), env.clone())]),
            },
        )
        .depends_on(&binding),
    )?;

    Ok(())
}
