//! Host-provided bindings and the per-request view over them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of a host binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// Key-value namespace.
    Kv,
    /// Secret string.
    Secret,
    /// Message queue producer.
    Queue,
    /// Plain environment variable.
    Var,
    /// Durable object namespace (stateful, may outlive a request).
    Durable,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kv => write!(f, "kv"),
            Self::Secret => write!(f, "secret"),
            Self::Queue => write!(f, "queue"),
            Self::Var => write!(f, "var"),
            Self::Durable => write!(f, "durable"),
        }
    }
}

/// Binding declared in site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDeclaration {
    /// Binding name as seen by render entries.
    pub name: String,
    /// Expected kind.
    pub kind: BindingKind,
}

impl BindingDeclaration {
    /// Create a declaration.
    pub fn new(name: impl Into<String>, kind: BindingKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Binding access errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("binding not found: {0}")]
    NotFound(String),

    #[error("binding '{name}' is {actual}, expected {expected}")]
    WrongKind {
        name: String,
        expected: BindingKind,
        actual: BindingKind,
    },

    #[error("store operation failed: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("queue closed: {0}")]
    QueueClosed(String),
}

impl From<serde_json::Error> for BindingError {
    fn from(e: serde_json::Error) -> Self {
        BindingError::Serialization(e.to_string())
    }
}

/// Key-value store provided by the host.
///
/// Implementations must tolerate concurrent use from many in-flight requests.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BindingError>;

    /// Write a value.
    async fn put(&self, key: &str, value: Bytes) -> Result<(), BindingError>;

    /// Delete a value, returning whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, BindingError>;

    /// List keys starting with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BindingError>;
}

/// Queue producer provided by the host.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Enqueue a message.
    async fn send(&self, message: Bytes) -> Result<(), BindingError>;
}

/// Secret value. `Debug` never prints the content.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Arc<str>);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(Arc::from(value.as_ref()))
    }

    /// Reveal the secret.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

/// A single resource handed over by the host.
#[derive(Clone)]
pub enum HostBinding {
    Kv(Arc<dyn KvStore>),
    Durable(Arc<dyn KvStore>),
    Secret(Secret),
    Queue(Arc<dyn Queue>),
    Var(String),
}

impl HostBinding {
    /// Kind of this binding.
    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Kv(_) => BindingKind::Kv,
            Self::Durable(_) => BindingKind::Durable,
            Self::Secret(_) => BindingKind::Secret,
            Self::Queue(_) => BindingKind::Queue,
            Self::Var(_) => BindingKind::Var,
        }
    }
}

impl fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(value) => write!(f, "Var({:?})", value),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// Name-keyed bindings visible to one request.
///
/// Built fresh for every request from the host environment and dropped with
/// the request context.
#[derive(Clone, Default, Debug)]
pub struct Bindings {
    entries: HashMap<String, HostBinding>,
}

impl Bindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    pub fn insert(&mut self, name: impl Into<String>, binding: HostBinding) {
        self.entries.insert(name.into(), binding);
    }

    /// Builder-style [`Bindings::insert`].
    pub fn with(mut self, name: impl Into<String>, binding: HostBinding) -> Self {
        self.insert(name, binding);
        self
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&HostBinding> {
        self.entries.get(name)
    }

    /// Whether a binding exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Binding names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key-value store (plain or durable) by name.
    pub fn kv(&self, name: &str) -> Result<&Arc<dyn KvStore>, BindingError> {
        match self.lookup(name)? {
            HostBinding::Kv(store) | HostBinding::Durable(store) => Ok(store),
            other => Err(wrong_kind(name, BindingKind::Kv, other)),
        }
    }

    /// Secret by name.
    pub fn secret(&self, name: &str) -> Result<&Secret, BindingError> {
        match self.lookup(name)? {
            HostBinding::Secret(secret) => Ok(secret),
            other => Err(wrong_kind(name, BindingKind::Secret, other)),
        }
    }

    /// Queue by name.
    pub fn queue(&self, name: &str) -> Result<&Arc<dyn Queue>, BindingError> {
        match self.lookup(name)? {
            HostBinding::Queue(queue) => Ok(queue),
            other => Err(wrong_kind(name, BindingKind::Queue, other)),
        }
    }

    /// Plain variable by name.
    pub fn var(&self, name: &str) -> Result<&str, BindingError> {
        match self.lookup(name)? {
            HostBinding::Var(value) => Ok(value),
            other => Err(wrong_kind(name, BindingKind::Var, other)),
        }
    }

    fn lookup(&self, name: &str) -> Result<&HostBinding, BindingError> {
        self.entries
            .get(name)
            .ok_or_else(|| BindingError::NotFound(name.to_string()))
    }
}

fn wrong_kind(name: &str, expected: BindingKind, actual: &HostBinding) -> BindingError {
    BindingError::WrongKind {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}
