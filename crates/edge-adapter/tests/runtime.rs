//! Runtime shim behavior under load, faults and cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use common::*;
use edge_adapter::hosts::cloudflare::ExecutionContext;
use edge_adapter::hosts::{CloudflareWorker, SpinComponent, SpinRequest};
use edge_adapter::{adapter_for, BuildOutput, FallbackStrategy};
use edge_bindings::{HostEnv, MemoryKv};
use edge_core::{
    entry_fn, AdapterKind, BindingDeclaration, BindingError, BindingKind, CancellationToken,
    ConfigurationError, EntryError, FallbackFormat, Request, RequestContext, Response, SiteConfig, StatusCode,
};
use edge_observability::{LogCapture, LogLevel, LogOutput, MetricsLog};
use http::HeaderValue;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};

/// Entry that echoes `x-token` after a short, token-dependent delay.
fn token_build() -> BuildOutput {
    BuildOutput::server().with_entry(
        "/token",
        entry_fn(
            shape_for(AdapterKind::Cloudflare),
            |req: Request, _ctx: RequestContext| async move {
                let token = req.header("x-token").unwrap_or_default().to_string();
                let delay = token.bytes().map(u64::from).sum::<u64>() % 5;
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let mut response = Response::text(StatusCode::OK, token.clone());
                if let Ok(value) = HeaderValue::from_str(&token) {
                    response.headers.insert("x-token", value);
                }
                Ok::<_, EntryError>(response)
            },
        ),
    )
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_state() {
    let worker = Arc::new(deploy_worker(
        SiteConfig::server(AdapterKind::Cloudflare),
        &token_build(),
        HostEnv::new(),
    ));

    let mut handles = Vec::new();
    for i in 0..100 {
        let worker = Arc::clone(&worker);
        handles.push(tokio::spawn(async move {
            let token = format!("token-{}", i);
            let mut request = worker_request("GET", "/token");
            request
                .headers_mut()
                .insert("x-token", HeaderValue::from_str(&token).unwrap());
            let response = worker
                .fetch(request, &ExecutionContext::new())
                .await;
            (token, response)
        }));
    }

    for handle in handles {
        let (token, response) = handle.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-token"], token.as_str());
        assert_eq!(body_text(response).await, token);
    }
}

fn faulty_build() -> BuildOutput {
    let shape = shape_for(AdapterKind::Cloudflare);
    BuildOutput::server()
        .with_entry(
            "/x",
            entry_fn(shape.clone(), |_req: Request, _ctx: RequestContext| async move {
                Err::<Response, EntryError>(anyhow::anyhow!("database unavailable").into())
            }),
        )
        .with_entry(
            "/boom",
            entry_fn(shape.clone(), |req: Request, _ctx: RequestContext| async move {
                if req.path() == "/boom" {
                    panic!("render exploded");
                }
                Ok::<_, EntryError>(Response::text(StatusCode::OK, "unreachable"))
            }),
        )
        .with_entry("/y", text_entry(AdapterKind::Cloudflare, "still fine"))
}

#[tokio::test]
async fn test_handler_fault_is_isolated() {
    let logs = LogCapture::new();
    let metrics = MetricsLog::new();
    let bundle = adapter_for(SiteConfig::server(AdapterKind::Cloudflare))
        .wrap(&faulty_build())
        .unwrap()
        .with_log_output(LogOutput::Capture(logs.clone()))
        .with_metrics(Arc::new(metrics.clone()));
    let worker = CloudflareWorker::new(bundle.instantiate(HostEnv::new()).unwrap()).unwrap();

    let failed = worker
        .fetch(worker_request("GET", "/x"), &ExecutionContext::new())
        .await;
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(failed.headers().contains_key("x-request-id"));
    let body = body_text(failed).await;
    assert_eq!(body, "500 Internal Server Error\n");
    assert!(!body.contains("database"));

    let panicked = worker
        .fetch(worker_request("GET", "/boom"), &ExecutionContext::new())
        .await;
    assert_eq!(panicked.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let fine = worker
        .fetch(worker_request("GET", "/y"), &ExecutionContext::new())
        .await;
    assert_eq!(fine.status(), StatusCode::OK);
    assert_eq!(body_text(fine).await, "still fine");

    let errors = logs.at_level(LogLevel::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.field_str("stage") == Some("handler")));
    assert!(errors[0].message.contains("database unavailable"));
    assert_eq!(errors[0].route.as_deref(), Some("/x"));
    assert_eq!(errors[1].field_str("fault"), Some("panicked"));
    assert!(errors[1].message.contains("render exploded"));

    let records = metrics.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].error_stage.as_deref(), Some("handler"));
    assert_eq!(records[0].error_kind.as_deref(), Some("failed"));
    assert_eq!(records[0].phases.last().map(String::as_str), Some("error"));
    assert!(records[0].used_fallback());
    assert_eq!(
        records[2].phases,
        vec!["received", "translated_in", "handler_invoked", "translated_out", "sent"]
    );
    assert_eq!(records[2].status_code, Some(200));
    assert!(!records[2].used_fallback());
}

#[tokio::test]
async fn test_abort_cancels_entry_and_its_tasks() {
    let started = Arc::new(Notify::new());
    let (observed_tx, mut observed_rx) = mpsc::unbounded_channel();

    let entry_started = Arc::clone(&started);
    let build = BuildOutput::server().with_entry(
        "/slow",
        entry_fn(
            shape_for(AdapterKind::Cloudflare),
            move |_req: Request, ctx: RequestContext| {
                let started = Arc::clone(&entry_started);
                let observed_tx = observed_tx.clone();
                async move {
                    let token = ctx.cancellation().clone();
                    tokio::spawn(async move {
                        token.cancelled().await;
                        let _ = observed_tx.send(());
                    });
                    started.notify_one();
                    std::future::pending::<()>().await;
                    Ok::<_, EntryError>(Response::text(StatusCode::OK, "too late"))
                }
            },
        ),
    );
    let worker = deploy_worker(
        SiteConfig::server(AdapterKind::Cloudflare),
        &build,
        HostEnv::new(),
    );

    let ctx = ExecutionContext::new();
    let abort = async {
        started.notified().await;
        ctx.abort();
    };
    let (response, ()) = tokio::join!(worker.fetch(worker_request("GET", "/slow"), &ctx), abort);

    assert_eq!(response.status().as_u16(), 499);
    tokio::time::timeout(Duration::from_secs(1), observed_rx.recv())
        .await
        .expect("spawned task observes cancellation")
        .expect("sender kept alive by the entry");
}

#[tokio::test]
async fn test_already_aborted_request_never_renders() {
    let (rendered_tx, mut rendered_rx) = mpsc::unbounded_channel();
    let build = BuildOutput::server().with_entry(
        "/",
        entry_fn(
            shape_for(AdapterKind::Spin),
            move |_req: Request, _ctx: RequestContext| {
                let rendered_tx = rendered_tx.clone();
                async move {
                    let _ = rendered_tx.send(());
                    Ok::<_, EntryError>(Response::text(StatusCode::OK, "rendered"))
                }
            },
        ),
    );
    let component = deploy_component(SiteConfig::server(AdapterKind::Spin), &build, HostEnv::new());

    let signal = CancellationToken::new();
    signal.cancel();
    let response = component
        .handle_with_signal(SpinRequest::new("GET", "/"), &signal)
        .await;
    assert_eq!(response.status, 499);
    assert!(rendered_rx.try_recv().is_err());
}

fn status_build(host: AdapterKind, status: u16) -> BuildOutput {
    BuildOutput::server().with_entry(
        "/",
        entry_fn(shape_for(host), move |_req: Request, _ctx: RequestContext| async move {
            Ok::<_, EntryError>(Response::new(StatusCode::from_u16(status).unwrap()))
        }),
    )
}

#[tokio::test]
async fn test_unrepresentable_status_becomes_bad_gateway() {
    let worker = deploy_worker(
        SiteConfig::server(AdapterKind::Cloudflare),
        &status_build(AdapterKind::Cloudflare, 103),
        HostEnv::new(),
    );
    let response = worker
        .fetch(worker_request("GET", "/"), &ExecutionContext::new())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_text(response).await, "502 Bad Gateway\n");

    let component = deploy_component(
        SiteConfig::server(AdapterKind::Spin),
        &status_build(AdapterKind::Spin, 600),
        HostEnv::new(),
    );
    let response = component.handle(SpinRequest::new("GET", "/")).await;
    assert_eq!(response.status, 502);
}

#[tokio::test]
async fn test_malformed_request_becomes_bad_request() {
    let metrics = MetricsLog::new();
    let bundle = adapter_for(SiteConfig::server(AdapterKind::Spin))
        .wrap(&BuildOutput::server().with_entry("/", text_entry(AdapterKind::Spin, "hi")))
        .unwrap()
        .with_metrics(Arc::new(metrics.clone()));
    let component = SpinComponent::new(bundle.instantiate(HostEnv::new()).unwrap()).unwrap();

    let response = component.handle(SpinRequest::new("GE T", "/")).await;
    assert_eq!(response.status, 400);
    assert!(response.header("x-request-id").is_some());

    let response = component
        .handle(SpinRequest::new("GET", "/").with_header("bad header", "x"))
        .await;
    assert_eq!(response.status, 400);

    let records = metrics.records();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|m| m.error_stage.as_deref() == Some("translate-in")));
    assert_eq!(records[0].phases, vec!["received", "error"]);
    assert_eq!(records[0].route, None);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let worker = deploy_worker(
        SiteConfig::server(AdapterKind::Cloudflare),
        &token_build(),
        HostEnv::new(),
    );
    let response = worker
        .fetch(worker_request("GET", "/nope"), &ExecutionContext::new())
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "404 Not Found\n");
}

fn counter_build(host: AdapterKind) -> BuildOutput {
    BuildOutput::server().with_entry(
        "/visits",
        entry_fn(
            shape_for(host).with_binding("VISITS"),
            |_req: Request, ctx: RequestContext| async move {
                let kv = ctx.kv("VISITS")?;
                let current = kv
                    .get("count")
                    .await?
                    .and_then(|bytes| String::from_utf8_lossy(&bytes).parse::<u64>().ok())
                    .unwrap_or(0);
                kv.put("count", Bytes::from((current + 1).to_string()))
                    .await?;

                let hidden = matches!(ctx.var("GREETING"), Err(BindingError::NotFound(_)));
                let body = format!("visits={} greeting_hidden={}", current + 1, hidden);
                Ok::<_, EntryError>(Response::text(StatusCode::OK, body))
            },
        ),
    )
}

#[tokio::test]
async fn test_entries_only_see_declared_bindings() {
    let config = SiteConfig::server(AdapterKind::Spin)
        .with_binding(BindingDeclaration::new("VISITS", BindingKind::Kv))
        .with_binding(BindingDeclaration::new("GREETING", BindingKind::Var));
    let store = MemoryKv::shared();
    let env = HostEnv::new()
        .with_kv("VISITS", store.clone())
        .with_var("GREETING", "hello");
    let component = deploy_component(config, &counter_build(AdapterKind::Spin), env);

    for expected in 1..=3 {
        let response = component.handle(SpinRequest::new("GET", "/visits")).await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.body_text(),
            format!("visits={} greeting_hidden=true", expected)
        );
    }
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_cloudflare_bindings_are_validated_at_instantiate() {
    let config = SiteConfig::server(AdapterKind::Cloudflare)
        .with_binding(BindingDeclaration::new("VISITS", BindingKind::Kv));
    let build = counter_build(AdapterKind::Cloudflare);

    let missing = adapter_for(config.clone())
        .wrap(&build)
        .unwrap()
        .instantiate(HostEnv::new());
    assert!(matches!(
        missing,
        Err(ConfigurationError::MissingBinding { ref name, .. }) if name == "VISITS"
    ));

    let worker = deploy_worker(
        config,
        &build,
        HostEnv::new().with_kv("VISITS", MemoryKv::shared()),
    );
    for expected in 1..=2 {
        let response = worker
            .fetch(worker_request("GET", "/visits"), &ExecutionContext::new())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            format!("visits={} greeting_hidden=true", expected)
        );
    }
}

#[tokio::test]
async fn test_context_carries_params_and_site_url() {
    let build = BuildOutput::server().with_entry(
        "/posts/:slug",
        entry_fn(
            shape_for(AdapterKind::Cloudflare),
            |_req: Request, ctx: RequestContext| async move {
                let slug = ctx.param("slug").unwrap_or_default().to_string();
                let canonical = ctx
                    .absolute_url(&format!("/posts/{}", slug))
                    .unwrap_or_default();
                Ok::<_, EntryError>(Response::text(StatusCode::OK, canonical))
            },
        ),
    );
    let config = SiteConfig::server(AdapterKind::Cloudflare).with_url("https://blog.example.com/");
    let worker = deploy_worker(config, &build, HostEnv::new());

    let response = worker
        .fetch(
            worker_request("GET", "/posts/first-light"),
            &ExecutionContext::new(),
        )
        .await;
    assert_eq!(
        body_text(response).await,
        "https://blog.example.com/posts/first-light"
    );
}

#[tokio::test]
async fn test_json_fallback_reports_stage_and_request_id() {
    let mut config = SiteConfig::server(AdapterKind::Cloudflare);
    config.adapter.fallback = FallbackFormat::Json;
    let worker = deploy_worker(config, &faulty_build(), HostEnv::new());

    let response = worker
        .fetch(worker_request("GET", "/x"), &ExecutionContext::new())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()["content-type"],
        "application/problem+json"
    );
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let problem: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(problem["status"], 500);
    assert_eq!(problem["stage"], "handler");
    assert_eq!(problem["request_id"], request_id.as_str());
}

#[tokio::test]
async fn test_entry_sees_the_request_id_of_its_fallback() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let build = BuildOutput::server().with_entry(
        "/",
        entry_fn(
            shape_for(AdapterKind::Cloudflare),
            move |_req: Request, ctx: RequestContext| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(ctx.request_id.to_string());
                    Err::<Response, EntryError>(anyhow::anyhow!("no content yet").into())
                }
            },
        ),
    );
    let worker = deploy_worker(SiteConfig::server(AdapterKind::Cloudflare), &build, HostEnv::new());

    let response = worker
        .fetch(worker_request("GET", "/"), &ExecutionContext::new())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let seen = seen_rx.try_recv().unwrap();
    assert_eq!(response.headers()["x-request-id"], seen.as_str());
}

#[tokio::test]
async fn test_static_fallback_body() {
    let bundle = adapter_for(SiteConfig::server(AdapterKind::Cloudflare))
        .wrap(&faulty_build())
        .unwrap()
        .with_fallback(FallbackStrategy::html("<h1>Something broke</h1>"));
    let worker = CloudflareWorker::new(bundle.instantiate(HostEnv::new()).unwrap()).unwrap();

    let response = worker
        .fetch(worker_request("GET", "/boom"), &ExecutionContext::new())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "<h1>Something broke</h1>");
}
