#![allow(dead_code)]

use edge_adapter::hosts::cloudflare::{WorkerRequest, WorkerResponse};
use edge_adapter::hosts::{CloudflareWorker, SpinComponent};
use edge_adapter::{adapter_for, BuildOutput};
use edge_bindings::HostEnv;
use edge_core::{
    entry_fn, AdapterKind, Body, EntryError, EntryShape, EntrySignature, Request, RequestContext, Response,
    SiteConfig, StatusCode,
};

pub fn worker_request(method: &str, uri: &str) -> WorkerRequest {
    http::Request::builder()
        .method(method)
        .uri(format!("https://site.test{}", uri))
        .body(Body::Empty)
        .unwrap()
}

pub async fn body_text(response: WorkerResponse) -> String {
    let bytes = response.into_body().collect().await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn deploy_worker(config: SiteConfig, build: &BuildOutput, env: HostEnv) -> CloudflareWorker {
    let bundle = adapter_for(config).wrap(build).unwrap();
    CloudflareWorker::new(bundle.instantiate(env).unwrap()).unwrap()
}

pub fn deploy_component(config: SiteConfig, build: &BuildOutput, env: HostEnv) -> SpinComponent {
    let bundle = adapter_for(config).wrap(build).unwrap();
    SpinComponent::new(bundle.instantiate(env).unwrap()).unwrap()
}

pub fn shape_for(host: AdapterKind) -> EntryShape {
    match host {
        AdapterKind::Cloudflare => EntryShape::new(EntrySignature::RequestEnvContext),
        AdapterKind::Spin => EntryShape::new(EntrySignature::RequestOnly),
    }
}

/// Entry answering `text` with 200.
pub fn text_entry(host: AdapterKind, text: &'static str) -> impl edge_core::RenderEntry {
    entry_fn(shape_for(host), move |_req: Request, _ctx: RequestContext| async move {
        Ok::<_, EntryError>(Response::text(StatusCode::OK, text))
    })
}
