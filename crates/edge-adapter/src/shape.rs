//! The build-time contract an adapter publishes for its host.

use edge_core::{
    AdapterKind, BindingKind, ConfigurationError, EntryShape, EntrySignature, OutputMode,
};
use edge_streaming::StreamingSupport;
use serde::{Deserialize, Serialize};

/// What the build must produce for a given host.
///
/// A pure function of adapter configuration; serializable so a build tool
/// can read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputShapeSpec {
    /// Host identifier.
    pub host: AdapterKind,
    /// Entry signatures the host can invoke.
    pub accepted_signatures: Vec<EntrySignature>,
    /// Whether responses may be streamed to the client.
    pub streaming: StreamingSupport,
    /// Output mode the host requires, if it only supports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_output: Option<OutputMode>,
    /// Module format label of the deployable artifact.
    pub module_format: String,
    /// Binding kinds the adapter can wire.
    pub binding_kinds: Vec<BindingKind>,
}

impl OutputShapeSpec {
    /// Whether an entry with `signature` can be wrapped.
    pub fn accepts(&self, signature: EntrySignature) -> bool {
        self.accepted_signatures.contains(&signature)
    }

    /// Whether the host can provide bindings of `kind`.
    pub fn supports_binding(&self, kind: BindingKind) -> bool {
        self.binding_kinds.contains(&kind)
    }

    /// Check an output mode against the host's requirement.
    pub fn check_output(&self, mode: OutputMode) -> Result<(), ConfigurationError> {
        match self.required_output {
            Some(required) if required != mode => Err(ConfigurationError::OutputModeMismatch {
                host: self.host.to_string(),
                expected: required.to_string(),
                actual: mode.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Check an entry's declared shape against this spec.
    ///
    /// Streaming entries are accepted on buffered-only hosts; their bodies
    /// are collected before the response is handed over.
    pub fn check_entry(&self, route: &str, shape: &EntryShape) -> Result<(), ConfigurationError> {
        if !self.accepts(shape.signature) {
            let accepted: Vec<String> = self
                .accepted_signatures
                .iter()
                .map(ToString::to_string)
                .collect();
            return Err(ConfigurationError::ShapeMismatch {
                route: route.to_string(),
                reason: format!(
                    "signature {} is not accepted by {} (accepts {})",
                    shape.signature,
                    self.host,
                    accepted.join(", ")
                ),
            });
        }
        Ok(())
    }

    /// Pretty JSON for build tools.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
