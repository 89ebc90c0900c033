//! Encryption key and the identities allowed to use it

use crate::resource::kms::{CryptoKey, CryptoKeyIamBinding, KeyRing};
use crate::resource::service_account_member;
use crate::resource::storage::ProjectServiceAccount;
use crate::schema::StackConfig;
use declarative::{ConfigSource, Declaration, Handle, ResourceGraph, Result};

const ENCRYPTER_DECRYPTER: &str = "roles/cloudkms.cryptoKeyEncrypterDecrypter";

/// About 27.7 hours
const KEY_ROTATION_SECONDS: u32 = 100_000;

pub(super) struct Identity {
    pub storage_key: Handle,
    /// Anything encrypted with `storage_key` must depend on this
    pub key_binding: Handle,
    pub gcs_account: Handle,
}

pub(super) fn declare(graph: &mut ResourceGraph, config: &StackConfig) -> Result<Identity> {
    let env = &config.stack;

    let keyring_name = format!("{env}-keyring");
    let keyring = graph.add(Declaration::new(
        keyring_name.as_str(),
        &KeyRing {
            name: keyring_name.clone(),
            location: "us".into(),
        },
    ))?;

    let key_name = format!("{env}-storage-key");
    let storage_key = graph.add(Declaration::new(
        key_name.as_str(),
        &CryptoKey {
            name: key_name.clone(),
            key_ring: keyring.attr("id"),
            rotation_seconds: KEY_ROTATION_SECONDS,
        },
    ))?;

    let gcs_account = graph.add(Declaration::new(
        "gcs-account",
        &ProjectServiceAccount {
            project: config.project.id.clone(),
        },
    ))?;

    let root_account = config.require("root-service-account")?;
    let key_binding = graph.add(Declaration::new(
        format!("{env}-storage-key-binding"),
        &CryptoKeyIamBinding {
            crypto_key_id: storage_key.attr("id"),
            role: ENCRYPTER_DECRYPTER.into(),
            members: vec![
                service_account_member(gcs_account.attr("emailAddress")),
                format!("serviceAccount:{root_account}").into(),
            ],
        },
    ))?;

    Ok(Identity {
        storage_key,
        key_binding,
        gcs_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ResourceMode, Value};

    #[test]
    fn test_binding_members() {
        let config = StackConfig::example("dev");
        let mut graph = ResourceGraph::new("dev");
        let identity = declare(&mut graph, &config).unwrap();

        let binding = graph.get(identity.key_binding.name()).unwrap();
        let members = binding
            .properties
            .get("members")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(
            members[1].as_str(),
            Some("serviceAccount:root-sa@animated-cell-381917.iam.gserviceaccount.com")
        );
        assert_eq!(
            graph.get("gcs-account").map(|d| d.mode),
            Some(ResourceMode::Lookup)
        );
        assert_eq!(
            graph
                .get("dev-storage-key")
                .and_then(|d| d.properties.get("rotationPeriod"))
                .and_then(Value::as_str),
            Some("100000s")
        );
    }
}
