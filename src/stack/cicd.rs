//! Registries and Cloud Build triggers

use super::platform::Platform;
use super::workloads::{WORKLOADS, Workload};
use crate::resource::artifact_registry::{Repository, RepositoryFormat};
use crate::resource::cloudbuild::{
    Build, BuildSecret, BuildStep, GithubPush, Trigger, TriggerSource,
};
use crate::schema::StackConfig;
use declarative::{ConfigSource, Declaration, Handle, ResourceGraph, Result, Value};

const TRIGGER_LOCATION: &str = "global";
const LIBS_BUILD_FILE: &str = "libs/_CICD/libs-deployment.yaml";

/// Only files directly under `libs/` start a libs build
const LIBS_INCLUDED: &str = "libs/*";
const BUILD_TIMEOUT: &str = "1200s";

pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    platform: &Platform,
) -> Result<()> {
    let project = &config.project;

    graph.add(Declaration::new(
        "npm-repo",
        &Repository {
            repository_id: "npm-repo".into(),
            project: project.id.clone(),
            location: project.region.clone(),
            format: RepositoryFormat::Npm,
            description: "Private NPM package repository".into(),
        },
    ))?;

    let docker_repo = config.images.repository.as_str();
    graph.add(Declaration::new(
        docker_repo,
        &Repository {
            repository_id: docker_repo.to_string(),
            project: project.id.clone(),
            location: project.region.clone(),
            format: RepositoryFormat::Docker,
            description: "Workload container images".into(),
        },
    ))?;

    let ci_account = config.require("cicd-service-account")?;
    let service_account = format!("projects/{}/serviceAccounts/{ci_account}", project.id);
    let trigger = |name: &str, included: String, source: TriggerSource| Trigger {
        name: name.to_string(),
        project: project.id.clone(),
        location: TRIGGER_LOCATION.into(),
        github: GithubPush {
            owner: config.github.owner.clone(),
            repo: config.github.repo.clone(),
            branch: config.github.branch.clone(),
        },
        included_files: vec![included],
        service_account: service_account.clone(),
        source,
    };

    graph.add(Declaration::new(
        "libs-trigger",
        &trigger(
            "libs-trigger",
            LIBS_INCLUDED.to_string(),
            TriggerSource::Filename(LIBS_BUILD_FILE.into()),
        ),
    ))?;

    for workload in WORKLOADS {
        let name = format!("{}-trigger", workload.name);
        let source = if workload.inline_build {
            TriggerSource::Inline(inline_build(config, workload, &platform.cluster))
        } else {
            TriggerSource::Filename(format!("{}/cloudbuild.yaml", workload.source_dir))
        };
        graph.add(Declaration::new(
            name.as_str(),
            &trigger(&name, format!("{}/**", workload.source_dir), source),
        ))?;
    }

    Ok(())
}

/// Build, push and roll out one workload image
fn inline_build(config: &StackConfig, workload: &Workload, cluster: &Handle) -> Build {
    let image = config.image(workload.name);
    let name = workload.name;

    let login = BuildStep::new("gcr.io/cloud-builders/gcloud").args([
        "auth".to_string(),
        "configure-docker".to_string(),
        config.docker_host(),
        "--quiet".to_string(),
    ]);

    // `$$` escapes substitution so bash sees the secret env var
    let build = BuildStep::new("gcr.io/cloud-builders/docker")
        .entrypoint("bash")
        .args([
            "-c".to_string(),
            format!(
                "docker build --target production --build-arg NPM_TOKEN=$$NPM_TOKEN \
                 -t {image} -f {dir}/Dockerfile .",
                dir = workload.source_dir
            ),
        ])
        .secret_env("NPM_TOKEN");

    let push = BuildStep::new("gcr.io/cloud-builders/docker").args(["push", image.as_str()]);

    let rollout = BuildStep::new("gcr.io/cloud-builders/kubectl")
        .args([
            "set".to_string(),
            "image".to_string(),
            format!("deployment/{name}"),
            format!("{name}={image}"),
            "-n".to_string(),
            config.stack.clone(),
        ])
        .env(format!("CLOUDSDK_COMPUTE_REGION={}", config.project.region))
        .env(Value::concat([
            Value::from("CLOUDSDK_CONTAINER_CLUSTER="),
            cluster.attr("name"),
        ]));

    Build {
        steps: vec![login, build, push, rollout],
        images: vec![image.clone()],
        secrets: vec![BuildSecret {
            env: "NPM_TOKEN".into(),
            version_name: format!(
                "projects/{}/secrets/npm-token/versions/latest",
                config.project.id
            ),
        }],
        timeout: Some(BUILD_TIMEOUT.into()),
    }
}
