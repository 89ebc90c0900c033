//! Cloud SQL resources

use declarative::{Properties, Resource, Value};
use std::fmt;

/// A managed MySQL instance
#[derive(Debug, Clone)]
pub struct DatabaseInstance {
    pub name: String,
    pub project: String,
    pub region: String,
    pub database_version: String,
    pub tier: String,
    pub database_flags: Vec<(String, String)>,
    pub root_password: Option<Value>,
    /// Network id for private IP; `None` keeps the public address
    pub private_network: Option<Value>,
    pub deletion_protection: bool,
}

impl DatabaseInstance {
    pub const KIND: &'static str = "gcp:sql/databaseInstance:DatabaseInstance";
    pub const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "connectionName",
        "privateIpAddress",
        "publicIpAddress",
        "selfLink",
    ];
}

impl Resource for DatabaseInstance {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        let flags = Value::list(self.database_flags.iter().map(|(name, value)| {
            Properties::new()
                .with("name", name.as_str())
                .with("value", value.as_str())
        }));

        let mut settings = Properties::new()
            .with("tier", self.tier.as_str())
            .with("databaseFlags", flags);
        if let Some(network) = &self.private_network {
            settings.set(
                "ipConfiguration",
                Properties::new()
                    .with("ipv4Enabled", false)
                    .with("privateNetwork", network.clone()),
            );
        }

        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("region", self.region.as_str())
            .with("databaseVersion", self.database_version.as_str())
            .with("deletionProtection", self.deletion_protection)
            .with("settings", settings)
            .with_opt("rootPassword", self.root_password.clone())
    }
}

/// A logical database inside an instance
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    pub project: String,
    pub instance: Value,
    pub collation: String,
}

impl Database {
    pub const KIND: &'static str = "gcp:sql/database:Database";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "selfLink"];
}

impl Resource for Database {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("instance", self.instance.clone())
            .with("collation", self.collation.as_str())
    }
}

/// How a database user authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    /// Password stored by the database
    BuiltIn,
    /// IAM federated service account, no password
    CloudIamServiceAccount,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::BuiltIn => write!(f, "BUILT_IN"),
            UserType::CloudIamServiceAccount => write!(f, "CLOUD_IAM_SERVICE_ACCOUNT"),
        }
    }
}

/// A database user
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub project: String,
    pub instance: Value,
    pub user_type: UserType,
    pub password: Option<Value>,
}

impl User {
    pub const KIND: &'static str = "gcp:sql/user:User";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "host"];
}

impl Resource for User {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("project", self.project.as_str())
            .with("instance", self.instance.clone())
            .with("type", self.user_type.to_string())
            .with_opt("password", self.password.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(private_network: Option<Value>) -> DatabaseInstance {
        DatabaseInstance {
            name: "db".into(),
            project: "demo".into(),
            region: "us-west1".into(),
            database_version: "MYSQL_8_0".into(),
            tier: "db-f1-micro".into(),
            database_flags: vec![("cloudsql_iam_authentication".into(), "on".into())],
            root_password: Some(Value::secret("db-root-password")),
            private_network,
            deletion_protection: false,
        }
    }

    #[test]
    fn test_private_instance_disables_public_ip() {
        let props = instance(Some(Value::reference("net", "id"))).properties();
        assert_eq!(
            props.get_path("settings.ipConfiguration.ipv4Enabled"),
            Some(&Value::Bool(false))
        );
        assert_eq!(props.refs()[0].resource, "net");
    }

    #[test]
    fn test_public_instance_has_no_ip_configuration() {
        let props = instance(None).properties();
        assert!(props.get_path("settings.ipConfiguration").is_none());
        assert!(props.get("rootPassword").unwrap().is_secret());
    }

    #[test]
    fn test_iam_user_has_no_password() {
        let user = User {
            name: "web-app-sa".into(),
            project: "demo".into(),
            instance: Value::reference("db", "name"),
            user_type: UserType::CloudIamServiceAccount,
            password: None,
        };
        let props = user.properties();
        assert_eq!(
            props.get("type").and_then(Value::as_str),
            Some("CLOUD_IAM_SERVICE_ACCOUNT")
        );
        assert!(props.get("password").is_none());
    }
}
