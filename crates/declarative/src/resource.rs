//! Resource trait and declarations
//!
//! A Resource is a typed description of one provider object. Turning it into
//! a [`Declaration`] gives it a logical name and options (explicit
//! dependencies, provider handle) so it can join a graph.

use crate::types::{AttrRef, Properties, ResourceMode, SecretRef, Value};
use std::fmt;

/// Core trait for declarable resources
///
/// # Example
///
/// ```
/// use declarative::{Declaration, Properties, Resource};
///
/// #[derive(Debug)]
/// struct Topic {
///     project: String,
/// }
///
/// impl Resource for Topic {
///     fn kind(&self) -> &'static str {
///         "gcp:pubsub/topic:Topic"
///     }
///
///     fn properties(&self) -> Properties {
///         Properties::new().with("project", self.project.as_str())
///     }
/// }
///
/// let decl = Declaration::new("events", &Topic { project: "demo".into() });
/// assert_eq!(decl.kind, "gcp:pubsub/topic:Topic");
/// ```
pub trait Resource: fmt::Debug {
    /// Provider type token, e.g. `gcp:storage/bucket:Bucket`
    fn kind(&self) -> &'static str;

    /// Whether the reconciler manages this resource or only reads it
    fn mode(&self) -> ResourceMode {
        ResourceMode::Managed
    }

    /// Property bag handed to the reconciler
    fn properties(&self) -> Properties;
}

/// Options that affect ordering but not the property bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    /// Resources that must exist first even without an attribute reference
    pub depends_on: Vec<String>,
    /// Provider handle used to reach the resource (e.g. a cluster)
    pub provider: Option<String>,
}

/// A named resource ready to be added to a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub kind: String,
    pub name: String,
    pub mode: ResourceMode,
    pub properties: Properties,
    pub options: ResourceOptions,
}

impl Declaration {
    /// Declare a typed resource under a logical name
    pub fn new(name: impl Into<String>, resource: &dyn Resource) -> Self {
        Self {
            kind: resource.kind().to_string(),
            name: name.into(),
            mode: resource.mode(),
            properties: resource.properties(),
            options: ResourceOptions::default(),
        }
    }

    /// Declare from raw parts, for kinds with no typed wrapper
    pub fn raw(kind: impl Into<String>, name: impl Into<String>, properties: Properties) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            mode: ResourceMode::Managed,
            properties,
            options: ResourceOptions::default(),
        }
    }

    /// Add an explicit ordering edge on another resource
    pub fn depends_on(mut self, other: &Handle) -> Self {
        if !self.options.depends_on.contains(&other.name) {
            self.options.depends_on.push(other.name.clone());
        }
        self
    }

    /// Reach this resource through a provider handle
    pub fn with_provider(mut self, provider: &Handle) -> Self {
        self.options.provider = Some(provider.name.clone());
        self
    }

    /// Attribute references found in the property bag
    pub fn references(&self) -> Vec<&AttrRef> {
        self.properties.refs()
    }

    /// Secret references found in the property bag
    pub fn secret_refs(&self) -> Vec<&SecretRef> {
        self.properties.secrets()
    }
}

/// Handle to a resource already added to a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    name: String,
    kind: String,
}

impl Handle {
    pub(crate) fn new(name: String, kind: String) -> Self {
        Self { name, kind }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Reference one of this resource's computed attributes
    pub fn attr(&self, attribute: &str) -> Value {
        Value::reference(self.name.clone(), attribute)
    }
}

/// Check that a logical name is usable as a graph key
///
/// `.` is excluded: references render as `<name>.<attribute>` and targets as
/// `<family>.<name>`, both split at the name boundary.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy;

    impl Resource for Dummy {
        fn kind(&self) -> &'static str {
            "test:index:Dummy"
        }

        fn properties(&self) -> Properties {
            Properties::new()
                .with("ring", Value::reference("ring", "id"))
                .with("password", Value::secret("pw"))
        }
    }

    #[test]
    fn test_declaration_collects_refs_and_secrets() {
        let decl = Declaration::new("dummy", &Dummy);
        assert_eq!(decl.references().len(), 1);
        assert_eq!(decl.secret_refs()[0].key, "pw");
        assert_eq!(decl.mode, ResourceMode::Managed);
    }

    #[test]
    fn test_depends_on_is_deduplicated() {
        let h = Handle::new("binding".into(), "test".into());
        let decl = Declaration::new("dummy", &Dummy).depends_on(&h).depends_on(&h);
        assert_eq!(decl.options.depends_on, vec!["binding".to_string()]);
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("dev-fit-file-bucket"));
        assert!(is_valid_name("web_app_bi"));
        assert!(!is_valid_name("web_app.bi"));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("has space"));
        assert!(!is_valid_name("slash/name"));
    }
}
