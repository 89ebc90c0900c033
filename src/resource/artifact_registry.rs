//! Artifact Registry repositories

use declarative::{Properties, Resource};
use std::fmt;

/// Package format held by a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryFormat {
    Docker,
    Npm,
}

impl fmt::Display for RepositoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryFormat::Docker => write!(f, "DOCKER"),
            RepositoryFormat::Npm => write!(f, "NPM"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Repository {
    pub repository_id: String,
    pub project: String,
    pub location: String,
    pub format: RepositoryFormat,
    pub description: String,
}

impl Repository {
    pub const KIND: &'static str = "gcp:artifactregistry/repository:Repository";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "repositoryId", "location"];

    /// Host serving this repository, e.g. `us-west1-docker.pkg.dev`
    pub fn host(&self) -> String {
        match self.format {
            RepositoryFormat::Docker => format!("{}-docker.pkg.dev", self.location),
            RepositoryFormat::Npm => format!("{}-npm.pkg.dev", self.location),
        }
    }
}

impl Resource for Repository {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("repositoryId", self.repository_id.as_str())
            .with("project", self.project.as_str())
            .with("location", self.location.as_str())
            .with("format", self.format.to_string())
            .with("description", self.description.as_str())
    }
}
