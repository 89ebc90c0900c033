//! Public entry point: static IP, service, certificate, ingress and DNS

use super::platform::Platform;
use crate::resource::dns::ManagedZone;
use crate::resource::kubernetes::{
    ClusterRole, ClusterRoleBinding, CustomResource, Ingress, IngressRule, ObjectMeta,
    PolicyRule, Service, ServicePort,
};
use crate::resource::network::GlobalAddress;
use crate::schema::StackConfig;
use declarative::{Declaration, ResourceGraph, Result};

const SERVED_WORKLOAD: &str = "server";

pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    platform: &Platform,
) -> Result<()> {
    let env = &config.stack;
    let namespace = platform.namespace.attr("metadata.name");

    let ip_name = format!("{env}-ingress-ip");
    let ip = graph.add(Declaration::new(
        ip_name.as_str(),
        &GlobalAddress::external(&ip_name, &config.project.id),
    ))?;

    let service = graph.add(
        Declaration::new(
            format!("{env}-server-service"),
            &Service {
                metadata: ObjectMeta::named("server-service").in_namespace(namespace.clone()),
                service_type: "NodePort".into(),
                selector_app: SERVED_WORKLOAD.into(),
                ports: vec![
                    ServicePort {
                        name: "http".into(),
                        port: 80,
                        target_port: 80,
                    },
                    ServicePort {
                        name: "https".into(),
                        port: 443,
                        target_port: 80,
                    },
                ],
            },
        )
        .with_provider(&platform.provider),
    )?;

    let cert_name = format!("{env}-managed-cert");
    let cert = graph.add(
        Declaration::new(
            cert_name.as_str(),
            &CustomResource::managed_certificate(
                ObjectMeta::named(&cert_name).in_namespace(namespace.clone()),
                &config.dns.hosts,
            ),
        )
        .with_provider(&platform.provider),
    )?;

    let rules = config
        .dns
        .hosts
        .iter()
        .map(|host| IngressRule {
            host: host.clone(),
            service_name: service.attr("metadata.name"),
            service_port: 80,
        })
        .collect();
    graph.add(
        Declaration::new(
            format!("{env}-ingress"),
            &Ingress {
                metadata: ObjectMeta::named("ingress")
                    .in_namespace(namespace.clone())
                    .annotation("kubernetes.io/ingress.class", "gce")
                    .annotation("kubernetes.io/ingress.global-static-ip-name", ip.attr("name"))
                    .annotation(
                        "networking.gke.io/managed-certificates",
                        cert.attr("metadata.name"),
                    ),
                rules,
            },
        )
        .with_provider(&platform.provider),
    )?;

    graph.add(Declaration::new(
        format!("{env}-zone"),
        &ManagedZone::new(
            &format!("{env}-zone"),
            &config.project.id,
            &config.dns.domain,
            &format!("Public zone for the {env} stack"),
        ),
    ))?;

    // Permissions for an external-dns controller deployed outside this stack
    let role = graph.add(
        Declaration::new(
            "external-dns",
            &ClusterRole {
                metadata: ObjectMeta::named("external-dns"),
                rules: vec![
                    PolicyRule::new(&[""], &["services", "endpoints", "pods"], &[
                        "get", "watch", "list",
                    ]),
                    PolicyRule::new(&["extensions", "networking.k8s.io"], &["ingresses"], &[
                        "get", "watch", "list",
                    ]),
                    PolicyRule::new(&[""], &["nodes"], &["list", "watch"]),
                ],
            },
        )
        .with_provider(&platform.provider),
    )?;

    graph.add(
        Declaration::new(
            "external-dns-viewer",
            &ClusterRoleBinding {
                metadata: ObjectMeta::named("external-dns-viewer"),
                role_name: role.attr("metadata.name"),
                subject_name: platform.service_account.attr("metadata.name"),
                subject_namespace: namespace,
            },
        )
        .with_provider(&platform.provider),
    )?;

    Ok(())
}
