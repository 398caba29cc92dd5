//! Render entries.

use bytes::Bytes;
use edge_sdk::edge_bindings::TypedKv;
use edge_sdk::edge_core::{
    entry_fn, AdapterKind, BindingError, Body, EntryError, RenderEntry, Request, RequestContext,
    Response, StatusCode, StreamError,
};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::{shape_for, VISITS};

const FOOTER: &str = "\n    </main>\n  </body>\n</html>\n";

/// Streaming home page.
///
/// The shell goes out before the visit counter is read, so the host can
/// start painting while KV answers.
pub fn home(kind: AdapterKind) -> impl RenderEntry {
    entry_fn(
        shape_for(kind).streaming().with_binding(VISITS),
        move |_req: Request, ctx: RequestContext| async move {
            let shell = render_shell(&ctx, kind);
            let visits = async move {
                count_visit(&ctx)
                    .await
                    .map(|count| {
                        Bytes::from(format!(
                            "      <section id=\"visits\">Visit number {}</section>",
                            count
                        ))
                    })
                    .map_err(|e| StreamError::Source(e.to_string()))
            };

            let body = stream::once(async move { Ok(Bytes::from(shell)) })
                .chain(stream::once(visits))
                .chain(stream::once(async { Ok(Bytes::from_static(FOOTER.as_bytes())) }));

            Ok::<_, EntryError>(
                Response::new(StatusCode::OK)
                    .with_content_type("text/html; charset=utf-8")
                    .with_body(Body::from_stream(body)),
            )
        },
    )
}

fn render_shell(ctx: &RequestContext, kind: AdapterKind) -> String {
    let canonical = ctx.absolute_url("/").unwrap_or_else(|| "/".to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <title>Hello from the edge</title>
    <link rel="canonical" href="{canonical}">
    <link rel="stylesheet" href="/style.css">
  </head>
  <body>
    <main>
      <h1>Hello from {kind}</h1>
      <p><small>Request ID: {request_id}</small></p>
"#,
        canonical = canonical,
        kind = kind,
        request_id = ctx.request_id,
    )
}

async fn count_visit(ctx: &RequestContext) -> Result<u64, BindingError> {
    let kv = TypedKv::new(ctx.kv(VISITS)?.as_ref());
    let count = kv.get::<u64>("visits:home").await?.unwrap_or(0) + 1;
    kv.put("visits:home", &count).await?;
    Ok(count)
}

/// Greeting page with a canonical link.
pub fn greeting(kind: AdapterKind) -> impl RenderEntry {
    entry_fn(
        shape_for(kind),
        |_req: Request, ctx: RequestContext| async move {
            let name = ctx.param("name").unwrap_or("stranger");
            let canonical = ctx
                .absolute_url(&format!("/hello/{}", name))
                .unwrap_or_default();
            let html = format!(
                "<!DOCTYPE html>\n<html><head><link rel=\"canonical\" href=\"{}\"></head>\
                 <body><h1>Hello, {}!</h1></body></html>\n",
                canonical,
                escape(name)
            );
            Ok::<_, EntryError>(Response::html(html))
        },
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Serialize)]
struct Echo<'a> {
    host: String,
    method: &'a str,
    path: &'a str,
    rest: Option<&'a str>,
    query: Option<&'a str>,
    request_id: &'a str,
    body_bytes: usize,
}

/// JSON reflection of the normalized request.
pub fn echo(kind: AdapterKind) -> impl RenderEntry {
    entry_fn(
        shape_for(kind),
        move |req: Request, ctx: RequestContext| async move {
            let Request {
                method,
                uri,
                body,
                ..
            } = req;
            let body = body.collect().await?;

            let echo = Echo {
                host: kind.to_string(),
                method: method.as_str(),
                path: uri.path(),
                rest: ctx.param("rest"),
                query: uri.query(),
                request_id: &ctx.request_id.0,
                body_bytes: body.len(),
            };
            let response = Response::json(StatusCode::OK, &echo).map_err(anyhow::Error::from)?;
            Ok::<_, EntryError>(response)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }
}
