//! Error types for the declarative crate

use thiserror::Error;

/// Errors raised while building or validating a resource graph
#[derive(Error, Debug)]
pub enum Error {
    /// Logical name is empty or contains unsupported characters
    #[error("invalid resource name '{0}'")]
    InvalidName(String),

    /// Two declarations share a logical name
    #[error("duplicate resource name '{0}'")]
    DuplicateName(String),

    /// Two outputs share a name
    #[error("duplicate output '{0}'")]
    DuplicateOutput(String),

    /// A property references an attribute of an undeclared resource
    #[error("'{from}' references unknown resource '{target}'")]
    UnknownReference { from: String, target: String },

    /// An explicit dependency names an undeclared resource
    #[error("'{from}' depends on unknown resource '{target}'")]
    UnknownDependency { from: String, target: String },

    /// A provider handle names an undeclared resource
    #[error("'{from}' uses unknown provider '{target}'")]
    UnknownProvider { from: String, target: String },

    /// A reference names an attribute the target kind does not expose
    #[error("'{from}' references unknown attribute '{attribute}' of {kind} '{target}'")]
    UnknownAttribute {
        from: String,
        target: String,
        kind: String,
        attribute: String,
    },

    /// The dependency edges form a cycle
    #[error("dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// A secret key is not known to the stack's secret store
    #[error("'{resource}' uses secret '{key}' which is not declared for this stack")]
    MissingSecret { resource: String, key: String },

    /// A required configuration value is absent
    #[error("missing required config value '{0}'")]
    MissingConfig(String),

    /// Manifest serialization failed
    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;
