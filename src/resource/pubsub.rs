//! Pub/Sub resources

use declarative::{Properties, Resource, Value};

/// Role that lets a member publish to a topic
pub const PUBLISHER_ROLE: &str = "roles/pubsub.publisher";

#[derive(Debug, Clone)]
pub struct Topic {
    pub name: String,
    pub project: String,
}

impl Topic {
    pub const KIND: &'static str = "gcp:pubsub/topic:Topic";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "project"];
}

impl Resource for Topic {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub name: String,
    pub project: String,
    pub topic: Value,
    pub ack_deadline_seconds: u32,
}

impl Subscription {
    pub const KIND: &'static str = "gcp:pubsub/subscription:Subscription";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "topic"];
}

impl Resource for Subscription {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("topic", self.topic.clone())
            .with("ackDeadlineSeconds", self.ack_deadline_seconds)
    }
}

/// Authoritative role binding on one topic
#[derive(Debug, Clone)]
pub struct TopicIamBinding {
    pub topic: Value,
    pub role: String,
    pub members: Vec<Value>,
}

impl TopicIamBinding {
    pub const KIND: &'static str = "gcp:pubsub/topicIAMBinding:TopicIAMBinding";
    pub const ATTRIBUTES: &'static [&'static str] = &["etag", "role"];
}

impl Resource for TopicIamBinding {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("topic", self.topic.clone())
            .with("role", self.role.as_str())
            .with("members", self.members.clone())
    }
}
