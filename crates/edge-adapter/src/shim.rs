//! The runtime shim: per-request translation, invocation and recovery.
//!
//! Every request walks `Received → TranslatedIn → HandlerInvoked →
//! TranslatedOut → Sent`. Any failure moves to `Error(stage)` and is answered
//! with a fallback response; nothing escapes to the host.

use std::panic::AssertUnwindSafe;

use edge_bindings::HostEnv;
use edge_core::{
    AdapterKind, Body, CancellationToken, EntryError, ErrorStage, HandlerFault, PhaseTracker, Request,
    RequestContext, RequestId, Response, ShimPhase, StreamError, TranslationError,
};
use edge_observability::{ShimMetricsCollector, StructuredLogger};
use edge_streaming::{panic_message, prepare_body};
use futures::future::{self, Either};
use futures::{pin_mut, FutureExt, StreamExt};

use crate::bundle::{DeployableBundle, RouteShim};
use crate::fallback::{not_found, render_fallback, stage_status, FallbackResponse};

/// Host-native request and response types and the translation between them
/// and the normalized messages.
pub trait HostCodec: Send + Sync {
    /// Request type the host hands to its handler.
    type Request: Send;
    /// Response type the host expects back.
    type Response: Send;

    /// Host served by this codec.
    fn host(&self) -> AdapterKind;

    /// Normalize a host request.
    fn translate_in(&self, request: Self::Request) -> Result<Request, TranslationError>;

    /// Express an entry response in host types.
    fn translate_out(&self, response: Response) -> Result<Self::Response, TranslationError>;

    /// Express a fallback response. Cannot fail.
    fn fallback(&self, response: FallbackResponse) -> Self::Response;
}

/// Run one request through `bundle`.
pub(crate) async fn serve<H: HostCodec>(
    bundle: &DeployableBundle,
    codec: &H,
    native: H::Request,
    env: &HostEnv,
    host_signal: &CancellationToken,
) -> H::Response {
    let mut run = ShimRun::start(bundle);

    let request = match codec.translate_in(native) {
        Ok(request) => request,
        Err(err) => return run.fail_translation(codec, ErrorStage::TranslateIn, &err),
    };
    run.advance(ShimPhase::TranslatedIn);
    run.logger
        .debug_builder("request received")
        .field("method", request.method.as_str())
        .field("path", request.path())
        .emit();

    if let Some(response) = bundle.asset_response(&request) {
        run.advance(ShimPhase::HandlerInvoked);
        return run.respond(codec, response, host_signal).await;
    }

    let Some((pattern, shim, params)) = bundle.routes().lookup(request.path()) else {
        run.advance(ShimPhase::HandlerInvoked);
        let fallback = not_found(&run.request_id);
        run.metrics.record_status(fallback.status.as_u16());
        run.advance(ShimPhase::TranslatedOut);
        run.advance(ShimPhase::Sent);
        run.finish();
        return codec.fallback(fallback);
    };

    run.set_route(pattern.as_str());
    run.advance(ShimPhase::HandlerInvoked);

    let ctx = RequestContext::new(
        run.request_id.clone(),
        pattern.as_str(),
        env.request_bindings(&shim.bindings),
        host_signal.child_token(),
    )
    .with_params(params)
    .with_site(bundle.site());

    match invoke(shim, request, &ctx).await {
        Ok(response) => run.respond(codec, response, ctx.cancellation()).await,
        Err(fault) => run.fail_handler(codec, fault),
    }
}

/// Await the entry, turning errors, panics and cancellation into faults.
async fn invoke(
    shim: &RouteShim,
    request: Request,
    ctx: &RequestContext,
) -> Result<Response, HandlerFault> {
    let route = ctx.route.clone();
    if ctx.is_cancelled() {
        return Err(HandlerFault::Cancelled { route });
    }

    let render = AssertUnwindSafe(shim.entry.render(request, ctx)).catch_unwind();
    let cancelled = ctx.cancelled();
    pin_mut!(render, cancelled);

    match future::select(render, cancelled).await {
        Either::Left((Ok(Ok(response)), _)) => Ok(response),
        Either::Left((Ok(Err(err)), _)) => Err(HandlerFault::Failed {
            route,
            message: entry_error_message(&err),
        }),
        Either::Left((Err(payload), _)) => Err(HandlerFault::Panicked {
            route,
            message: panic_message(payload.as_ref()),
        }),
        Either::Right(_) => Err(HandlerFault::Cancelled { route }),
    }
}

fn entry_error_message(err: &EntryError) -> String {
    format!("{:#}", err)
}

/// Per-request state. Lives on the stack of one `serve` call.
struct ShimRun<'a> {
    bundle: &'a DeployableBundle,
    request_id: RequestId,
    route: Option<String>,
    tracker: PhaseTracker,
    metrics: ShimMetricsCollector,
    logger: StructuredLogger,
}

impl<'a> ShimRun<'a> {
    fn start(bundle: &'a DeployableBundle) -> Self {
        let request_id = RequestId::generate();
        let host = bundle.host().to_string();

        let mut metrics = ShimMetricsCollector::new(request_id.clone());
        metrics.set_host(host.clone());

        let logger = bundle.logger(request_id.clone()).with_host(host);

        Self {
            bundle,
            request_id,
            route: None,
            tracker: PhaseTracker::new(),
            metrics,
            logger,
        }
    }

    fn set_route(&mut self, route: &str) {
        self.route = Some(route.to_string());
        self.metrics.set_route(route);
        self.logger = self.logger.clone().with_route(route);
    }

    fn advance(&mut self, phase: ShimPhase) {
        if let Err(err) = self.tracker.advance(phase) {
            self.logger
                .warn_builder("illegal shim transition")
                .field("from", format!("{:?}", err.from))
                .field("to", format!("{:?}", err.to))
                .emit();
        }
    }

    /// Prepare the body for the host and translate the response out.
    async fn respond<H: HostCodec>(
        mut self,
        codec: &H,
        response: Response,
        cancellation: &CancellationToken,
    ) -> H::Response {
        let Response {
            status,
            headers,
            body,
        } = response;

        let body = match prepare_body(body, self.bundle.body_strategy(), cancellation).await {
            Ok(body) => body,
            Err(StreamError::Cancelled) => {
                let route = self.route.clone().unwrap_or_default();
                return self.fail_handler(codec, HandlerFault::Cancelled { route });
            }
            Err(err) => {
                return self.fail_translation(
                    codec,
                    ErrorStage::TranslateOut,
                    &TranslationError::Body(err),
                )
            }
        };

        self.metrics.record_body(body.is_stream(), body.known_len());
        let body = match body {
            Body::Stream(stream) => {
                let logger = self.logger.clone();
                let logged = stream.inspect(move |item| {
                    if let Err(err) = item {
                        logger
                            .error_builder("response stream aborted")
                            .field("stage", ErrorStage::TranslateOut.to_string())
                            .field("error", err.to_string())
                            .emit();
                    }
                });
                Body::from_stream(logged)
            }
            other => other,
        };

        let response = Response {
            status,
            headers,
            body,
        };
        match codec.translate_out(response) {
            Ok(native) => {
                self.advance(ShimPhase::TranslatedOut);
                self.advance(ShimPhase::Sent);
                self.metrics.record_status(status.as_u16());
                self.finish();
                native
            }
            Err(err) => self.fail_translation(codec, ErrorStage::TranslateOut, &err),
        }
    }

    fn fail_translation<H: HostCodec>(
        self,
        codec: &H,
        stage: ErrorStage,
        err: &TranslationError,
    ) -> H::Response {
        let status = stage_status(stage);
        self.logger
            .error_builder(format!("{} failed: {}", stage, err))
            .field("stage", stage.to_string())
            .field_i64("status", i64::from(status.as_u16()))
            .field("error", err.to_string())
            .emit();
        self.fail(codec, stage, status, "translation")
    }

    fn fail_handler<H: HostCodec>(self, codec: &H, fault: HandlerFault) -> H::Response {
        let status = fault.status();
        self.logger
            .error_builder(fault.to_string())
            .field("stage", ErrorStage::Handler.to_string())
            .field_i64("status", i64::from(status.as_u16()))
            .field("fault", fault.kind())
            .emit();
        self.fail(codec, ErrorStage::Handler, status, fault.kind())
    }

    fn fail<H: HostCodec>(
        mut self,
        codec: &H,
        stage: ErrorStage,
        status: http::StatusCode,
        kind: &str,
    ) -> H::Response {
        self.advance(ShimPhase::Error(stage));
        self.metrics.record_error(stage, kind);
        self.metrics.record_status(status.as_u16());
        let fallback = render_fallback(
            self.bundle.fallback_strategy(),
            status,
            stage,
            &self.request_id,
        );
        self.metrics.record_body(false, Some(fallback.body.len()));
        self.finish();
        codec.fallback(fallback)
    }

    fn finish(self) {
        let metrics = self.metrics.finalize(&self.tracker);
        self.logger
            .debug_builder("request finished")
            .field_json(
                "metrics",
                serde_json::to_value(&metrics).unwrap_or_default(),
            )
            .emit();
        if let Some(sink) = self.bundle.metrics_sink() {
            sink.record(metrics);
        }
    }
}
