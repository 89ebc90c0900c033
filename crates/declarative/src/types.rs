//! Core value types for declarative resource graphs

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Reference to a computed attribute of another declared resource
///
/// The attribute may be a dotted path into a nested output, e.g.
/// `masterAuth.clusterCaCertificate`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrRef {
    pub resource: String,
    pub attribute: String,
}

impl AttrRef {
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Reference to an entry in the external secret store
///
/// Only the key is known here. The reconciler resolves it at apply time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecretRef {
    pub key: String,
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secret:{}", self.key)
    }
}

/// Whether a declaration is owned by the reconciler or only read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    /// Created, updated and deleted by the reconciler
    #[default]
    Managed,
    /// Read-only data source resolved by the reconciler
    Lookup,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMode::Managed => write!(f, "managed"),
            ResourceMode::Lookup => write!(f, "lookup"),
        }
    }
}

/// A property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Computed attribute of another resource
    Ref(AttrRef),
    /// Value held by the external secret store
    Secret(SecretRef),
    /// String built by concatenating the rendered parts
    Concat(Vec<Value>),
}

impl Value {
    /// Reference `resource.attribute`
    pub fn reference(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Ref(AttrRef::new(resource, attribute))
    }

    /// Reference a key in the external secret store
    pub fn secret(key: impl Into<String>) -> Self {
        Self::Secret(SecretRef { key: key.into() })
    }

    /// Concatenate parts into a single string value
    pub fn concat<I, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Concat(parts.into_iter().map(Into::into).collect())
    }

    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// All attribute references contained in this value, recursively
    pub fn refs(&self) -> Vec<&AttrRef> {
        let mut out = Vec::new();
        self.walk(&mut |v| {
            if let Value::Ref(r) = v {
                out.push(r);
            }
        });
        out
    }

    /// All secret references contained in this value, recursively
    pub fn secrets(&self) -> Vec<&SecretRef> {
        let mut out = Vec::new();
        self.walk(&mut |v| {
            if let Value::Secret(s) = v {
                out.push(s);
            }
        });
        out
    }

    /// Whether any part of this value comes from the secret store
    pub fn is_secret(&self) -> bool {
        !self.secrets().is_empty()
    }

    /// Whether this value is a plain literal string
    pub fn is_literal_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key of a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// Look up a dotted path through nested maps
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |v, key| v.get(key))
    }

    /// Visit this value and every nested value, depth first
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Value),
    {
        f(self);
        match self {
            Value::List(items) | Value::Concat(items) => {
                for item in items {
                    item.walk(f);
                }
            }
            Value::Map(m) => {
                for v in m.values() {
                    v.walk(f);
                }
            }
            _ => {}
        }
    }

    /// Visit every map entry with its dotted key path
    pub fn walk_entries<'a, F>(&'a self, prefix: &str, f: &mut F)
    where
        F: FnMut(&str, &'a Value),
    {
        match self {
            Value::Map(m) => {
                for (k, v) in m {
                    let path = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    f(path.as_str(), v);
                    v.walk_entries(&path, f);
                }
            }
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.walk_entries(&format!("{prefix}[{i}]"), f);
                }
            }
            _ => {}
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Ref(r) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$ref", &r.to_string())?;
                map.end()
            }
            Value::Secret(s) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$secret", &s.key)?;
                map.end()
            }
            Value::Concat(parts) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$concat", parts)?;
                map.serialize_entry("secret", &self.is_secret())?;
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<AttrRef> for Value {
    fn from(r: AttrRef) -> Self {
        Value::Ref(r)
    }
}

impl From<Properties> for Value {
    fn from(p: Properties) -> Self {
        Value::Map(p.0)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::String(n.to_string()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(m) => {
                Value::Map(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Property bag of a declared resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property only when a value is present
    pub fn with_opt<V: Into<Value>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.set(key, v);
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a dotted path, e.g. `settings.tier`
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.0.get(head)?;
        match rest {
            Some(rest) => value.get_path(rest),
            None => Some(value),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All attribute references in the bag
    pub fn refs(&self) -> Vec<&AttrRef> {
        self.0.values().flat_map(Value::refs).collect()
    }

    /// All secret references in the bag
    pub fn secrets(&self) -> Vec<&SecretRef> {
        self.0.values().flat_map(Value::secrets).collect()
    }

    /// Visit every property with its dotted path
    pub fn walk_entries<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&str, &'a Value),
    {
        for (k, v) in &self.0 {
            f(k.as_str(), v);
            v.walk_entries(k, f);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
