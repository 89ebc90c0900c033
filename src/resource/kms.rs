//! Cloud KMS resources

use declarative::{Properties, Resource, Value};

/// A KMS key ring
#[derive(Debug, Clone)]
pub struct KeyRing {
    pub name: String,
    pub location: String,
}

impl KeyRing {
    pub const KIND: &'static str = "gcp:kms/keyRing:KeyRing";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "location", "project"];
}

impl Resource for KeyRing {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("location", self.location.as_str())
    }
}

/// A symmetric key with automatic rotation
#[derive(Debug, Clone)]
pub struct CryptoKey {
    pub name: String,
    /// Key ring id reference
    pub key_ring: Value,
    /// Rotation period in seconds, rendered as `"<n>s"`
    pub rotation_seconds: u32,
}

impl CryptoKey {
    pub const KIND: &'static str = "gcp:kms/cryptoKey:CryptoKey";
    pub const ATTRIBUTES: &'static [&'static str] = &["name", "keyRing", "rotationPeriod"];
}

impl Resource for CryptoKey {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("name", self.name.as_str())
            .with("keyRing", self.key_ring.clone())
            .with("rotationPeriod", format!("{}s", self.rotation_seconds))
    }
}

/// Authoritative role binding on one crypto key
#[derive(Debug, Clone)]
pub struct CryptoKeyIamBinding {
    pub crypto_key_id: Value,
    pub role: String,
    pub members: Vec<Value>,
}

impl CryptoKeyIamBinding {
    pub const KIND: &'static str = "gcp:kms/cryptoKeyIAMBinding:CryptoKeyIAMBinding";
    pub const ATTRIBUTES: &'static [&'static str] = &["etag", "cryptoKeyId", "role"];
}

impl Resource for CryptoKeyIamBinding {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn properties(&self) -> Properties {
        Properties::new()
            .with("cryptoKeyId", self.crypto_key_id.clone())
            .with("role", self.role.as_str())
            .with("members", self.members.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_period_rendering() {
        let key = CryptoKey {
            name: "dev-storage-key".into(),
            key_ring: Value::reference("dev-keyring", "id"),
            rotation_seconds: 100_000,
        };
        let props = key.properties();
        assert_eq!(props.get("rotationPeriod").and_then(Value::as_str), Some("100000s"));
        assert_eq!(props.refs().len(), 1);
    }
}
