//! # Declarative
//!
//! A resource-graph model for declarative infrastructure.
//!
//! This crate describes *what* should exist and in which order, and leaves
//! creating it to an external reconciler.
//!
//! ## Core Concepts
//!
//! - **Resource**: A typed provider object (bucket, key, deployment)
//! - **Declaration**: A resource with a logical name and ordering options
//! - **Value**: A literal, an attribute reference, a secret reference or a
//!   concatenation of those
//! - **ResourceGraph**: The declarations of one stack, with validation
//! - **DeploymentPlan**: Topological waves over the graph
//! - **Manifest**: The emitted document, and **Snapshot** diffs between two
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     AnyAttribute, Declaration, DeploymentPlan, MapConfig, Manifest, Properties,
//!     ResourceGraph,
//! };
//!
//! let mut graph = ResourceGraph::new("dev");
//! let ring = graph.add(Declaration::raw(
//!     "gcp:kms/keyRing:KeyRing",
//!     "dev-keyring",
//!     Properties::new().with("location", "us"),
//! ))?;
//! graph.add(Declaration::raw(
//!     "gcp:kms/cryptoKey:CryptoKey",
//!     "dev-storage-key",
//!     Properties::new()
//!         .with("keyRing", ring.attr("id"))
//!         .with("rotationPeriod", "100000s"),
//! ))?;
//!
//! graph
//!     .validate(&AnyAttribute, &MapConfig::new())
//!     .map_err(|errors| errors.into_iter().next().unwrap())?;
//!
//! let plan = DeploymentPlan::from_graph(&graph)?;
//! assert_eq!(plan.waves.len(), 2);
//!
//! let manifest = Manifest::build(&graph, &plan);
//! assert!(manifest.to_json_pretty()?.contains("dev-keyring.id"));
//! # Ok::<(), declarative::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`ConfigSource`]: Plain config values and known secret keys
//! - [`AttributeCatalog`]: Which attributes each resource kind exposes
//!
//! Neither trait ever carries secret plaintext.

pub mod context;
pub mod diff;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{AnyAttribute, AttributeCatalog, ConfigSource, MapConfig};
pub use diff::{compute_diffs, group_by_type, Change, DiffSummary, ResourceDiff, Snapshot, SnapshotEntry};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeKind, Output, ResourceGraph};
pub use manifest::{Manifest, ManifestEntry, ManifestOutput};
pub use planner::DeploymentPlan;
pub use resource::{is_valid_name, Declaration, Handle, Resource, ResourceOptions};
pub use types::{AttrRef, Properties, ResourceMode, SecretRef, Value};
