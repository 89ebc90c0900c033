//! MySQL instances, their databases and users

use super::platform::Platform;
use crate::resource::network::{GlobalAddress, ServiceConnection};
use crate::resource::sql::{Database, DatabaseInstance, User, UserType};
use crate::schema::StackConfig;
use declarative::{ConfigSource, Declaration, Handle, ResourceGraph, Result, Value};

const COLLATION: &str = "utf8_general_ci";
const PEERING_PREFIX_LENGTH: u32 = 16;
const SERVICE_NETWORKING: &str = "servicenetworking.googleapis.com";

pub(super) struct Databases {
    /// Instance the Cloud SQL proxy sidecars connect to
    pub proxy_target: Handle,
    /// Whether `proxy_target` is reachable only over private IP
    pub private: bool,
}

pub(super) fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    platform: &Platform,
) -> Result<Databases> {
    let env = &config.stack;

    let public = graph.add(Declaration::new(
        "mysql-db-instance",
        &instance(config, "mysql-db-instance", None)?,
    ))?;
    declare_contents(graph, config, &public, &format!("{env}-db"), "")?;

    if !config.database.private_instance {
        return Ok(Databases {
            proxy_target: public,
            private: false,
        });
    }

    let range_name = format!("{env}-private-ip-range");
    let range = graph.add(Declaration::new(
        range_name.as_str(),
        &GlobalAddress::peering_range(
            &range_name,
            &config.project.id,
            PEERING_PREFIX_LENGTH,
            platform.network.attr("id"),
        ),
    ))?;

    let connection = graph.add(Declaration::new(
        format!("{env}-private-vpc-connection"),
        &ServiceConnection {
            network: platform.network.attr("id"),
            service: SERVICE_NETWORKING.into(),
            reserved_peering_ranges: vec![range.attr("name")],
        },
    ))?;

    let private_name = format!("{env}-private-db-instance");
    let private = graph.add(
        Declaration::new(
            private_name.as_str(),
            &instance(config, &private_name, Some(platform.network.attr("id")))?,
        )
        .depends_on(&connection),
    )?;
    declare_contents(graph, config, &private, &format!("{env}-private-db"), "private-")?;

    Ok(Databases {
        proxy_target: private,
        private: true,
    })
}

fn instance(
    config: &StackConfig,
    name: &str,
    private_network: Option<Value>,
) -> Result<DatabaseInstance> {
    Ok(DatabaseInstance {
        name: name.to_string(),
        project: config.project.id.clone(),
        region: config.project.region.clone(),
        database_version: config.database.version.clone(),
        tier: config.database.tier.clone(),
        database_flags: vec![("cloudsql_iam_authentication".into(), "on".into())],
        root_password: Some(config.require_secret("db-root-password")?),
        private_network,
        deletion_protection: false,
    })
}

/// Database plus the IAM and built-in application users
fn declare_contents(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    instance: &Handle,
    database: &str,
    user_prefix: &str,
) -> Result<()> {
    let project = &config.project.id;

    graph.add(Declaration::new(
        database,
        &Database {
            name: database.to_string(),
            project: project.clone(),
            instance: instance.attr("name"),
            collation: COLLATION.into(),
        },
    ))?;

    // IAM database users drop the `.gserviceaccount.com` suffix
    graph.add(Declaration::new(
        format!("{user_prefix}web-app-sa"),
        &User {
            name: format!("web-app-sa@{project}.iam"),
            project: project.clone(),
            instance: instance.attr("name"),
            user_type: UserType::CloudIamServiceAccount,
            password: None,
        },
    ))?;

    graph.add(Declaration::new(
        format!("{user_prefix}web-app-bi"),
        &User {
            name: "web-app-bi".into(),
            project: project.clone(),
            instance: instance.attr("name"),
            user_type: UserType::BuiltIn,
            password: Some(config.require_secret("web-app-bi-password")?),
        },
    ))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::platform;

    fn declared(private_instance: bool) -> (ResourceGraph, Databases) {
        let mut config = StackConfig::example("dev");
        config.database.private_instance = private_instance;
        let mut graph = ResourceGraph::new("dev");
        let platform = platform::declare(&mut graph, &config).unwrap();
        let dbs = declare(&mut graph, &config, &platform).unwrap();
        (graph, dbs)
    }

    #[test]
    fn test_private_instance_waits_for_peering() {
        let (graph, dbs) = declared(true);
        assert!(dbs.private);
        assert_eq!(dbs.proxy_target.name(), "dev-private-db-instance");

        let private = graph.get("dev-private-db-instance").unwrap();
        assert_eq!(
            private.options.depends_on,
            vec!["dev-private-vpc-connection".to_string()]
        );
        assert_eq!(
            private.properties.get_path("settings.ipConfiguration.ipv4Enabled"),
            Some(&Value::Bool(false))
        );
        assert!(graph.contains("private-web-app-bi"));
        assert!(graph.contains("dev-private-db"));
    }

    #[test]
    fn test_users_reference_instance_name() {
        let (graph, _) = declared(false);
        for user in ["web-app-sa", "web-app-bi"] {
            let decl = graph.get(user).unwrap();
            assert_eq!(
                decl.properties.get("instance"),
                Some(&Value::reference("mysql-db-instance", "name"))
            );
        }
        let bi = graph.get("web-app-bi").unwrap();
        assert!(bi.properties.get("password").is_some_and(Value::is_secret));
        let sa = graph.get("web-app-sa").unwrap();
        assert!(sa.properties.get("password").is_none());
    }
}
