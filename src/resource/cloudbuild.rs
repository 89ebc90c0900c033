//! Cloud Build triggers

use declarative::{Properties, Resource, Value};

/// GitHub push event a trigger listens to
#[derive(Debug, Clone)]
pub struct GithubPush {
    pub owner: String,
    pub repo: String,
    /// Branch regex, e.g. `^main$`
    pub branch: String,
}

/// One step of an inline build
#[derive(Debug, Clone, Default)]
pub struct BuildStep {
    /// Builder image
    pub name: String,
    pub entrypoint: Option<String>,
    pub args: Vec<Value>,
    pub env: Vec<Value>,
    /// Names of `available_secrets` entries exposed to this step
    pub secret_env: Vec<String>,
}

impl BuildStep {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn entrypoint(mut self, entrypoint: &str) -> Self {
        self.entrypoint = Some(entrypoint.to_string());
        self
    }

    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, env: impl Into<Value>) -> Self {
        self.env.push(env.into());
        self
    }

    pub fn secret_env(mut self, name: &str) -> Self {
        self.secret_env.push(name.to_string());
        self
    }

    fn to_value(&self) -> Value {
        let mut step = Properties::new()
            .with("name", self.name.as_str())
            .with_opt("entrypoint", self.entrypoint.as_deref())
            .with("args", self.args.clone());
        if !self.env.is_empty() {
            step.set("envs", self.env.clone());
        }
        if !self.secret_env.is_empty() {
            step.set("secretEnvs", self.secret_env.clone());
        }
        step.into()
    }
}

/// Secret Manager version exposed to build steps as an env var
#[derive(Debug, Clone)]
pub struct BuildSecret {
    pub env: String,
    /// `projects/<p>/secrets/<name>/versions/<v>`
    pub version_name: String,
}

/// Inline build definition
#[derive(Debug, Clone, Default)]
pub struct Build {
    pub steps: Vec<BuildStep>,
    pub images: Vec<String>,
    pub secrets: Vec<BuildSecret>,
    pub timeout: Option<String>,
}

impl Build {
    fn to_value(&self) -> Value {
        let mut build = Properties::new()
            .with("steps", Value::list(self.steps.iter().map(BuildStep::to_value)))
            .with("images", self.images.clone())
            .with_opt("timeout", self.timeout.as_deref());
        if !self.secrets.is_empty() {
            let versions = Value::list(self.secrets.iter().map(|s| {
                Properties::new()
                    .with("env", s.env.as_str())
                    .with("versionName", s.version_name.as_str())
            }));
            build.set(
                "availableSecrets",
                Properties::new().with("secretManagers", versions),
            );
        }
        build.into()
    }
}

/// What a trigger runs
#[derive(Debug, Clone)]
pub enum TriggerSource {
    /// Build config file inside the repository
    Filename(String),
    /// Build defined in the trigger itself
    Inline(Build),
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub project: String,
    pub location: String,
    pub github: GithubPush,
    pub included_files: Vec<String>,
    /// `projects/<p>/serviceAccounts/<email>`
    pub service_account: String,
    pub source: TriggerSource,
}

impl Trigger {
    pub const KIND: &'static str = "gcp:cloudbuild/trigger:Trigger";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "triggerId"];
}

impl Resource for Trigger {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let github = Properties::new()
            .with("owner", self.github.owner.as_str())
            .with("name", self.github.repo.as_str())
            .with(
                "push",
                Properties::new().with("branch", self.github.branch.as_str()),
            );

        let props = Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("location", self.location.as_str())
            .with("github", github)
            .with("includedFiles", self.included_files.clone())
            .with("serviceAccount", self.service_account.as_str());

        match &self.source {
            TriggerSource::Filename(file) => props.with("filename", file.as_str()),
            TriggerSource::Inline(build) => props.with("build", build.to_value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(source: TriggerSource) -> Trigger {
        Trigger {
            name: "server-trigger".into(),
            project: "demo".into(),
            location: "global".into(),
            github: GithubPush {
                owner: "acme".into(),
                repo: "app".into(),
                branch: "^main$".into(),
            },
            included_files: vec!["server/**".into()],
            service_account: "projects/demo/serviceAccounts/ci@demo.iam.gserviceaccount.com"
                .into(),
            source,
        }
    }

    #[test]
    fn test_filename_trigger() {
        let props = trigger(TriggerSource::Filename("server/cloudbuild.yaml".into())).properties();
        assert_eq!(
            props.get("filename").and_then(Value::as_str),
            Some("server/cloudbuild.yaml")
        );
        assert!(props.get("build").is_none());
        assert_eq!(
            props.get_path("github.push.branch").and_then(Value::as_str),
            Some("^main$")
        );
    }

    #[test]
    fn test_inline_build_exposes_secret_manager_versions() {
        let build = Build {
            steps: vec![
                BuildStep::new("gcr.io/cloud-builders/docker")
                    .entrypoint("bash")
                    .args(["-c", "docker build ."])
                    .secret_env("NPM_TOKEN"),
            ],
            images: vec![],
            secrets: vec![BuildSecret {
                env: "NPM_TOKEN".into(),
                version_name: "projects/demo/secrets/npm-token/versions/latest".into(),
            }],
            timeout: None,
        };
        let props = trigger(TriggerSource::Inline(build)).properties();
        let steps = props.get_path("build.steps").and_then(Value::as_list).unwrap();
        assert_eq!(steps.len(), 1);
        assert!(steps[0].get("secretEnvs").is_some());
        assert!(props.get_path("build.availableSecrets.secretManagers").is_some());
        assert!(props.secrets().is_empty());
    }
}
