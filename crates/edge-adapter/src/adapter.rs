//! The adapter contract shared by every host.

use edge_core::{AdapterKind, ConfigurationError, SiteConfig};

use crate::build::BuildOutput;
use crate::bundle::DeployableBundle;
use crate::hosts::{CloudflareAdapter, SpinAdapter};
use crate::manifest::{check_plan, BuildPlan, BundleManifest};
use crate::shape::OutputShapeSpec;

/// Adapts a site build to one hosting runtime.
///
/// Implementations only describe their host; checking and wrapping are
/// shared so every host rejects malformed builds the same way.
pub trait Adapter: Send + Sync {
    /// Site configuration the adapter was created from.
    fn config(&self) -> &SiteConfig;

    /// What the build must produce for this host.
    fn negotiate_output_shape(&self) -> OutputShapeSpec;

    /// Host this adapter targets.
    fn kind(&self) -> AdapterKind {
        self.negotiate_output_shape().host
    }

    /// Run every `wrap` check against a build plan and return the manifest
    /// the bundle would carry.
    fn check(&self, plan: &BuildPlan) -> Result<BundleManifest, ConfigurationError> {
        let spec = self.negotiate_output_shape();
        check_plan(&spec, self.config(), plan)?;
        let streaming = spec.streaming.can_stream() && self.config().adapter.streaming;
        Ok(BundleManifest::new(&spec, self.config(), plan, streaming))
    }

    /// Wrap every render entry in a runtime shim for this host.
    fn wrap(&self, build: &BuildOutput) -> Result<DeployableBundle, ConfigurationError> {
        DeployableBundle::assemble(&self.negotiate_output_shape(), self.config(), build)
    }
}

/// Create the adapter selected in `config`.
pub fn adapter_for(config: SiteConfig) -> Box<dyn Adapter> {
    tracing::debug!(kind = %config.adapter.kind, "selecting adapter");
    match config.adapter.kind {
        AdapterKind::Cloudflare => Box::new(CloudflareAdapter::new(config)),
        AdapterKind::Spin => Box::new(SpinAdapter::new(config)),
    }
}
