//! Host environment: the bindings a host hands over at instantiation.

use std::collections::HashSet;
use std::sync::Arc;

use edge_core::{
    BindingDeclaration, Bindings, ConfigurationError, HostBinding, KvStore, Queue, Secret,
};

/// All bindings supplied by the host for one deployment instance.
///
/// Owned by the host. Shims only derive per-request [`Bindings`] views from it.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    bindings: Bindings,
}

impl HostEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add any binding.
    pub fn with(mut self, name: impl Into<String>, binding: HostBinding) -> Self {
        self.bindings.insert(name, binding);
        self
    }

    /// Add a key-value namespace.
    pub fn with_kv(self, name: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        self.with(name, HostBinding::Kv(store))
    }

    /// Add a durable object namespace.
    pub fn with_durable(self, name: impl Into<String>, store: Arc<dyn KvStore>) -> Self {
        self.with(name, HostBinding::Durable(store))
    }

    /// Add a secret.
    pub fn with_secret(self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.with(name, HostBinding::Secret(Secret::new(value)))
    }

    /// Add a queue producer.
    pub fn with_queue(self, name: impl Into<String>, queue: Arc<dyn Queue>) -> Self {
        self.with(name, HostBinding::Queue(queue))
    }

    /// Add a plain variable.
    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, HostBinding::Var(value.into()))
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&HostBinding> {
        self.bindings.get(name)
    }

    /// Every binding the host supplied.
    pub fn all(&self) -> &Bindings {
        &self.bindings
    }

    /// Check that every declared binding is present with the declared kind.
    pub fn validate(&self, declarations: &[BindingDeclaration]) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for decl in declarations {
            if !seen.insert(decl.name.as_str()) {
                return Err(ConfigurationError::DuplicateBinding(decl.name.clone()));
            }
            let binding = self
                .bindings
                .get(&decl.name)
                .ok_or_else(|| ConfigurationError::MissingBinding {
                    name: decl.name.clone(),
                    kind: decl.kind,
                })?;
            if binding.kind() != decl.kind {
                return Err(ConfigurationError::BindingKindMismatch {
                    name: decl.name.clone(),
                    expected: decl.kind,
                    actual: binding.kind(),
                });
            }
        }
        Ok(())
    }

    /// Per-request view restricted to the declared bindings.
    pub fn request_bindings(&self, declarations: &[BindingDeclaration]) -> Bindings {
        let mut view = Bindings::new();
        for decl in declarations {
            if let Some(binding) = self.bindings.get(&decl.name) {
                view.insert(decl.name.clone(), binding.clone());
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use edge_core::BindingKind;

    fn declarations() -> Vec<BindingDeclaration> {
        vec![
            BindingDeclaration::new("SESSIONS", BindingKind::Kv),
            BindingDeclaration::new("API_KEY", BindingKind::Secret),
        ]
    }

    #[test]
    fn test_validate_accepts_complete_env() {
        let env = HostEnv::new()
            .with_kv("SESSIONS", MemoryKv::shared())
            .with_secret("API_KEY", "k");
        assert!(env.validate(&declarations()).is_ok());
    }

    #[test]
    fn test_validate_reports_missing_binding() {
        let env = HostEnv::new().with_kv("SESSIONS", MemoryKv::shared());
        assert_eq!(
            env.validate(&declarations()),
            Err(ConfigurationError::MissingBinding {
                name: "API_KEY".into(),
                kind: BindingKind::Secret,
            })
        );
    }

    #[test]
    fn test_validate_reports_kind_mismatch() {
        let env = HostEnv::new()
            .with_var("SESSIONS", "oops")
            .with_secret("API_KEY", "k");
        assert_eq!(
            env.validate(&declarations()),
            Err(ConfigurationError::BindingKindMismatch {
                name: "SESSIONS".into(),
                expected: BindingKind::Kv,
                actual: BindingKind::Var,
            })
        );
    }

    #[test]
    fn test_request_view_only_exposes_declared() {
        let env = HostEnv::new()
            .with_kv("SESSIONS", MemoryKv::shared())
            .with_secret("API_KEY", "k")
            .with_var("INTERNAL_ONLY", "x");
        let view = env.request_bindings(&declarations());
        assert_eq!(view.len(), 2);
        assert!(!view.contains("INTERNAL_ONLY"));
    }
}
