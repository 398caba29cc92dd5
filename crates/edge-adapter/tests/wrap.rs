//! Deploy-time behavior: wrapping, manifests and instantiation.

mod common;

use common::*;
use edge_adapter::hosts::cloudflare::ExecutionContext;
use edge_adapter::hosts::{CloudflareWorker, SpinComponent, SpinRequest};
use edge_adapter::{adapter_for, BuildOutput, BuildPlan, StaticAsset};
use edge_bindings::{HostEnv, MemoryKv};
use edge_core::{
    AdapterKind, BindingDeclaration, BindingKind, ConfigurationError, EntrySignature, OutputMode,
    SiteConfig, StatusCode,
};

fn site_build(host: AdapterKind) -> BuildOutput {
    BuildOutput::server()
        .with_asset(StaticAsset::new("/style.css", "body{}"))
        .with_asset(StaticAsset::new("/docs/index.html", "<h1>Docs</h1>"))
        .with_entry("/", text_entry(host, "home"))
        .with_entry("/posts/:slug", text_entry(host, "post"))
}

#[tokio::test]
async fn test_wrap_is_idempotent() {
    let adapter = adapter_for(SiteConfig::server(AdapterKind::Cloudflare));
    let build = site_build(AdapterKind::Cloudflare);

    let first = adapter.wrap(&build).unwrap();
    let second = adapter.wrap(&build).unwrap();
    assert_eq!(first.manifest(), second.manifest());
    assert!(first.manifest().verify());

    let first = CloudflareWorker::new(first.instantiate(HostEnv::new()).unwrap()).unwrap();
    let second = CloudflareWorker::new(second.instantiate(HostEnv::new()).unwrap()).unwrap();
    for path in ["/", "/posts/hello", "/style.css", "/docs/", "/missing"] {
        let a = first
            .fetch(worker_request("GET", path), &ExecutionContext::new())
            .await;
        let b = second
            .fetch(worker_request("GET", path), &ExecutionContext::new())
            .await;
        assert_eq!(a.status(), b.status(), "status for {}", path);
        assert_eq!(
            a.headers().get("content-type"),
            b.headers().get("content-type")
        );
        assert_eq!(body_text(a).await, body_text(b).await);
    }
}

#[test]
fn test_shape_violation_is_configuration_error() {
    // Spin invokes `handle(request)` only.
    let build = BuildOutput::server().with_entry("/", text_entry(AdapterKind::Cloudflare, "x"));
    let result = adapter_for(SiteConfig::server(AdapterKind::Spin)).wrap(&build);
    match result {
        Err(ConfigurationError::ShapeMismatch { route, reason }) => {
            assert_eq!(route, "/");
            assert!(reason.contains(&EntrySignature::RequestEnvContext.to_string()));
        }
        other => panic!("expected shape mismatch, got {:?}", other),
    }
}

#[test]
fn test_static_build_with_entries_is_rejected() {
    let config = SiteConfig::server(AdapterKind::Spin).with_output(OutputMode::Static);
    let mut build = site_build(AdapterKind::Spin);
    build.mode = OutputMode::Static;
    assert_eq!(
        adapter_for(config).wrap(&build).unwrap_err(),
        ConfigurationError::EntriesInStaticBuild { count: 2 }
    );
}

#[test]
fn test_cloudflare_requires_server_output() {
    let config = SiteConfig::server(AdapterKind::Cloudflare).with_output(OutputMode::Static);
    let build = BuildOutput::static_site().with_asset(StaticAsset::new("/index.html", "hi"));
    assert!(matches!(
        adapter_for(config).wrap(&build),
        Err(ConfigurationError::OutputModeMismatch { .. })
    ));
}

#[test]
fn test_build_mode_must_match_site_config() {
    let config = SiteConfig::server(AdapterKind::Spin);
    let build = BuildOutput::static_site();
    assert!(matches!(
        adapter_for(config).wrap(&build),
        Err(ConfigurationError::Invalid(_))
    ));
}

#[tokio::test]
async fn test_static_bundle_serves_assets_only() {
    let config = SiteConfig::server(AdapterKind::Spin).with_output(OutputMode::Static);
    let build = BuildOutput::static_site()
        .with_asset(StaticAsset::new("/index.html", "<h1>Home</h1>"))
        .with_asset(StaticAsset::new("/robots.txt", "User-agent: *"));

    let bundle = adapter_for(config).wrap(&build).unwrap();
    assert!(bundle.is_static());
    assert_eq!(bundle.asset_count(), 2);

    let component = SpinComponent::new(bundle.instantiate(HostEnv::new()).unwrap()).unwrap();
    let home = component.handle(SpinRequest::new("GET", "/")).await;
    assert_eq!(home.status, 200);
    assert_eq!(home.body_text(), "<h1>Home</h1>");
    assert_eq!(
        home.header("content-type"),
        Some(b"text/html; charset=utf-8".as_slice())
    );

    let head = component.handle(SpinRequest::new("HEAD", "/robots.txt")).await;
    assert_eq!(head.status, 200);
    assert!(head.body.is_empty());
    assert_eq!(head.header("content-length"), Some(b"13".as_slice()));

    let post = component.handle(SpinRequest::new("POST", "/robots.txt")).await;
    assert_eq!(post.status, 404);
}

#[test]
fn test_collisions_are_rejected() {
    let adapter = adapter_for(SiteConfig::server(AdapterKind::Cloudflare));

    let build = site_build(AdapterKind::Cloudflare).with_asset(StaticAsset::new("/style.css", "x"));
    assert_eq!(
        adapter.wrap(&build).unwrap_err(),
        ConfigurationError::DuplicateAsset("/style.css".into())
    );

    let build = site_build(AdapterKind::Cloudflare)
        .with_entry("/posts/:id", text_entry(AdapterKind::Cloudflare, "again"));
    assert_eq!(
        adapter.wrap(&build).unwrap_err(),
        ConfigurationError::DuplicateRoute("/posts/:id".into())
    );
}

#[test]
fn test_entry_binding_must_be_declared() {
    let build = BuildOutput::server().with_entry(
        "/count",
        edge_core::entry_fn(
            shape_for(AdapterKind::Cloudflare).with_binding("VISITS"),
            |_req: edge_core::Request, _ctx: edge_core::RequestContext| async move {
                Ok::<_, edge_core::EntryError>(edge_core::Response::new(StatusCode::OK))
            },
        ),
    );

    let undeclared = adapter_for(SiteConfig::server(AdapterKind::Cloudflare)).wrap(&build);
    assert_eq!(
        undeclared.unwrap_err(),
        ConfigurationError::UndeclaredBinding {
            route: "/count".into(),
            binding: "VISITS".into(),
        }
    );

    let config = SiteConfig::server(AdapterKind::Cloudflare)
        .with_binding(BindingDeclaration::new("VISITS", BindingKind::Kv));
    assert!(adapter_for(config).wrap(&build).is_ok());
}

#[test]
fn test_spin_cannot_wire_queues() {
    let config = SiteConfig::server(AdapterKind::Spin)
        .with_binding(BindingDeclaration::new("JOBS", BindingKind::Queue));
    assert!(matches!(
        adapter_for(config).wrap(&BuildOutput::server()),
        Err(ConfigurationError::UnsupportedBinding { kind: BindingKind::Queue, .. })
    ));
}

#[test]
fn test_instantiate_validates_bindings() {
    let config = SiteConfig::server(AdapterKind::Cloudflare)
        .with_binding(BindingDeclaration::new("VISITS", BindingKind::Kv))
        .with_binding(BindingDeclaration::new("API_KEY", BindingKind::Secret));
    let adapter = adapter_for(config);
    let build = site_build(AdapterKind::Cloudflare);

    let missing = adapter
        .wrap(&build)
        .unwrap()
        .instantiate(HostEnv::new().with_kv("VISITS", MemoryKv::shared()));
    assert_eq!(
        missing.unwrap_err(),
        ConfigurationError::MissingBinding {
            name: "API_KEY".into(),
            kind: BindingKind::Secret,
        }
    );

    let complete = adapter.wrap(&build).unwrap().instantiate(
        HostEnv::new()
            .with_kv("VISITS", MemoryKv::shared())
            .with_secret("API_KEY", "s3cret"),
    );
    assert!(complete.is_ok());
}

#[test]
fn test_bundle_for_one_host_cannot_run_on_another() {
    let bundle = adapter_for(SiteConfig::server(AdapterKind::Spin))
        .wrap(&BuildOutput::server())
        .unwrap();
    let instance = bundle.instantiate(HostEnv::new()).unwrap();
    assert!(CloudflareWorker::new(instance).is_err());
}

#[test]
fn test_check_reports_same_errors_as_wrap() {
    let adapter = adapter_for(SiteConfig::server(AdapterKind::Spin));
    let build = BuildOutput::server().with_entry("/", text_entry(AdapterKind::Cloudflare, "x"));
    assert_eq!(
        adapter.check(&BuildPlan::from_build(&build)).unwrap_err(),
        adapter.wrap(&build).unwrap_err()
    );
}

#[test]
fn test_manifest_records_site_and_assets() {
    let config =
        SiteConfig::server(AdapterKind::Cloudflare).with_url("https://blog.example.com");
    let bundle = adapter_for(config)
        .wrap(&site_build(AdapterKind::Cloudflare))
        .unwrap();
    let manifest = bundle.manifest();

    assert_eq!(manifest.site.as_deref(), Some("https://blog.example.com"));
    assert_eq!(manifest.assets.len(), 2);
    assert_eq!(manifest.assets[0].size, 6);
    assert_eq!(manifest.assets[0].sha256.len(), 64);
    assert_eq!(manifest.routes[1].pattern, "/posts/:slug");
    assert!(manifest.streaming);
}
