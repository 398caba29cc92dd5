//! Deployable bundles and their instantiated form.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use edge_bindings::HostEnv;
use edge_core::{
    AdapterKind, BindingDeclaration, CancellationToken, ConfigurationError, EntryShape, Method,
    RenderEntry, Request, RequestId, Response, SiteConfig, StatusCode,
};
use edge_observability::{LogOutput, MetricsSink, StructuredLogger};
use edge_streaming::BodyStrategy;
use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};

use crate::build::{BuildOutput, StaticAsset};
use crate::fallback::FallbackStrategy;
use crate::manifest::{check_plan, BuildPlan, BundleManifest};
use crate::route::RouteTable;
use crate::shape::OutputShapeSpec;
use crate::shim::{serve, HostCodec};

/// The shim synthesized for one render entry.
pub struct RouteShim {
    pub(crate) entry: Arc<dyn RenderEntry>,
    pub(crate) shape: EntryShape,
    /// Declarations of the bindings this entry reads.
    pub(crate) bindings: Vec<BindingDeclaration>,
}

impl RouteShim {
    /// Declared entry shape.
    pub fn shape(&self) -> &EntryShape {
        &self.shape
    }
}

impl fmt::Debug for RouteShim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteShim")
            .field("shape", &self.shape)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Static assets plus one runtime shim per route.
///
/// Produced by [`crate::Adapter::wrap`]; either complete or not produced at all.
pub struct DeployableBundle {
    host: AdapterKind,
    site: Option<Arc<str>>,
    assets: HashMap<String, StaticAsset>,
    routes: RouteTable<RouteShim>,
    declarations: Vec<BindingDeclaration>,
    body_strategy: BodyStrategy,
    fallback: FallbackStrategy,
    manifest: BundleManifest,
    log_output: LogOutput,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl DeployableBundle {
    /// Check `build` against `spec` and `config` and synthesize its shims.
    pub(crate) fn assemble(
        spec: &OutputShapeSpec,
        config: &SiteConfig,
        build: &BuildOutput,
    ) -> Result<Self, ConfigurationError> {
        let plan = BuildPlan::from_build(build);
        let patterns = check_plan(spec, config, &plan)?;

        let routes = patterns
            .into_iter()
            .zip(&build.entries)
            .map(|(pattern, routed)| {
                let shape = routed.entry.shape();
                let bindings = shape
                    .bindings
                    .iter()
                    .filter_map(|name| config.binding(name).cloned())
                    .collect();
                let shim = RouteShim {
                    entry: Arc::clone(&routed.entry),
                    shape,
                    bindings,
                };
                (pattern, shim)
            })
            .collect();
        let routes = RouteTable::new(routes)?;

        let body_strategy = BodyStrategy::negotiate(spec.streaming, config.adapter.streaming);
        let manifest = BundleManifest::new(spec, config, &plan, body_strategy.is_passthrough());

        let assets = build
            .assets
            .iter()
            .map(|asset| (asset.path.clone(), asset.clone()))
            .collect();

        Ok(Self {
            host: spec.host,
            site: config.site.url.as_deref().map(Arc::from),
            assets,
            routes,
            declarations: config.bindings.clone(),
            body_strategy,
            fallback: FallbackStrategy::from(config.adapter.fallback),
            manifest,
            log_output: LogOutput::default(),
            metrics: None,
        })
    }

    /// Replace the fallback strategy.
    pub fn with_fallback(mut self, fallback: FallbackStrategy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Where shim logs go.
    pub fn with_log_output(mut self, output: LogOutput) -> Self {
        self.log_output = output;
        self
    }

    /// Receive per-request metrics.
    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Target host.
    pub fn host(&self) -> AdapterKind {
        self.host
    }

    /// Manifest with content fingerprint.
    pub fn manifest(&self) -> &BundleManifest {
        &self.manifest
    }

    /// Route table in match order.
    pub fn routes(&self) -> &RouteTable<RouteShim> {
        &self.routes
    }

    /// Number of static assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Whether the bundle has no shims.
    pub fn is_static(&self) -> bool {
        self.routes.is_empty()
    }

    /// Validate the host environment and make the bundle ready for requests.
    pub fn instantiate(self, env: HostEnv) -> Result<Instance, ConfigurationError> {
        env.validate(&self.declarations)?;
        Ok(Instance {
            bundle: Arc::new(self),
            env,
        })
    }

    pub(crate) fn site(&self) -> Option<Arc<str>> {
        self.site.clone()
    }

    pub(crate) fn body_strategy(&self) -> BodyStrategy {
        self.body_strategy
    }

    pub(crate) fn fallback_strategy(&self) -> &FallbackStrategy {
        &self.fallback
    }

    pub(crate) fn metrics_sink(&self) -> Option<&Arc<dyn MetricsSink>> {
        self.metrics.as_ref()
    }

    pub(crate) fn logger(&self, request_id: RequestId) -> StructuredLogger {
        StructuredLogger::new(request_id).with_output(self.log_output.clone())
    }

    /// Serve `GET`/`HEAD` for static assets. Directory paths fall back to
    /// their `index.html`.
    pub(crate) fn asset_response(&self, request: &Request) -> Option<Response> {
        let head = request.method == Method::HEAD;
        if request.method != Method::GET && !head {
            return None;
        }

        let path = request.path();
        let asset = self.assets.get(path).or_else(|| {
            let index = if path.ends_with('/') {
                format!("{}index.html", path)
            } else {
                format!("{}/index.html", path)
            };
            self.assets.get(&index)
        })?;

        let mut response = Response::new(StatusCode::OK);
        if let Ok(value) = HeaderValue::from_str(&asset.content_type) {
            response.headers.insert(CONTENT_TYPE, value);
        }
        response
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(asset.bytes.len()));
        if !head {
            response = response.with_body(asset.bytes.clone());
        }
        Some(response)
    }
}

impl fmt::Debug for DeployableBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployableBundle")
            .field("host", &self.host)
            .field("routes", &self.routes.len())
            .field("assets", &self.assets.len())
            .field("fingerprint", &self.manifest.fingerprint)
            .finish()
    }
}

/// A bundle bound to a validated host environment.
///
/// Cheap to clone; share one instance across concurrent requests.
#[derive(Clone)]
pub struct Instance {
    bundle: Arc<DeployableBundle>,
    env: HostEnv,
}

impl Instance {
    /// Target host.
    pub fn host(&self) -> AdapterKind {
        self.bundle.host
    }

    /// Manifest of the underlying bundle.
    pub fn manifest(&self) -> &BundleManifest {
        &self.bundle.manifest
    }

    /// Environment captured at instantiation.
    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    /// Serve one host-native request against the environment validated at
    /// instantiation. `signal` is the host's abort signal for the request.
    ///
    /// Only the host fronts call this, after [`Instance::expect_host`].
    pub(crate) async fn serve<H: HostCodec>(
        &self,
        codec: &H,
        request: H::Request,
        signal: &CancellationToken,
    ) -> H::Response {
        serve(&self.bundle, codec, request, &self.env, signal).await
    }

    /// Fail unless this instance targets `host`.
    pub(crate) fn expect_host(&self, host: AdapterKind) -> Result<(), ConfigurationError> {
        if self.host() == host {
            Ok(())
        } else {
            Err(ConfigurationError::Invalid(format!(
                "bundle was wrapped for {} but is being run on {}",
                self.host(),
                host
            )))
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("bundle", &self.bundle)
            .field("env", &self.env)
            .finish()
    }
}
