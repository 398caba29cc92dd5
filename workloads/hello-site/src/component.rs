//! Spin component entrypoint.
//!
//! The bundle is wrapped and instantiated once per component instance; each
//! request is converted to a [`SpinRequest`] and served through the shim.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use bytes::Bytes;
use edge_sdk::edge_adapter::adapter_for;
use edge_sdk::edge_adapter::hosts::{SpinComponent, SpinRequest, SpinResponse};
use edge_sdk::edge_bindings::HostEnv;
use edge_sdk::edge_core::{AdapterKind, BindingError, KvStore, RequestId};
use edge_sdk::edge_observability::StructuredLogger;
use futures::SinkExt;
use spin_sdk::http::{Fields, IncomingRequest, Method, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;
use spin_sdk::key_value::Store;

use crate::{build_output, site_config, VISITS};

static COMPONENT: OnceLock<SpinComponent> = OnceLock::new();

/// KV binding backed by a Spin key-value store label.
struct SpinKv {
    label: String,
}

impl SpinKv {
    fn open(&self) -> Result<Store, BindingError> {
        Store::open(&self.label).map_err(|e| BindingError::Store(format!("{:?}", e)))
    }
}

#[async_trait]
impl KvStore for SpinKv {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BindingError> {
        let value = self
            .open()?
            .get(key)
            .map_err(|e| BindingError::Store(format!("{:?}", e)))?;
        Ok(value.map(Bytes::from))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BindingError> {
        self.open()?
            .set(key, &value)
            .map_err(|e| BindingError::Store(format!("{:?}", e)))
    }

    async fn delete(&self, key: &str) -> Result<bool, BindingError> {
        let store = self.open()?;
        let existed = store
            .exists(key)
            .map_err(|e| BindingError::Store(format!("{:?}", e)))?;
        store
            .delete(key)
            .map_err(|e| BindingError::Store(format!("{:?}", e)))?;
        Ok(existed)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BindingError> {
        let keys = self
            .open()?
            .get_keys()
            .map_err(|e| BindingError::Store(format!("{:?}", e)))?;
        Ok(keys.into_iter().filter(|k| k.starts_with(prefix)).collect())
    }
}

fn component() -> anyhow::Result<&'static SpinComponent> {
    if let Some(component) = COMPONENT.get() {
        return Ok(component);
    }

    let bundle = adapter_for(site_config(AdapterKind::Spin)).wrap(&build_output(AdapterKind::Spin))?;
    let env = HostEnv::new().with_kv(
        VISITS,
        Arc::new(SpinKv {
            label: "default".to_string(),
        }),
    );
    let component = SpinComponent::new(bundle.instantiate(env)?)?;
    Ok(COMPONENT.get_or_init(|| component))
}

fn method_name(method: &Method) -> String {
    match method {
        Method::Get => "GET".to_string(),
        Method::Head => "HEAD".to_string(),
        Method::Post => "POST".to_string(),
        Method::Put => "PUT".to_string(),
        Method::Delete => "DELETE".to_string(),
        Method::Connect => "CONNECT".to_string(),
        Method::Options => "OPTIONS".to_string(),
        Method::Trace => "TRACE".to_string(),
        Method::Patch => "PATCH".to_string(),
        Method::Other(other) => other.clone(),
    }
}

async fn spin_request(req: IncomingRequest) -> anyhow::Result<SpinRequest> {
    let method = method_name(&req.method());
    let uri = req.path_with_query().unwrap_or_else(|| "/".to_string());
    let headers = req.headers().entries();
    let body = req
        .into_body()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read request body: {:?}", e))?;

    Ok(SpinRequest {
        method,
        uri,
        headers,
        body: Bytes::from(body),
    })
}

fn plain(status: u16, text: &'static str) -> SpinResponse {
    SpinResponse {
        status,
        headers: vec![(
            "content-type".to_string(),
            b"text/plain; charset=utf-8".to_vec(),
        )],
        body: Bytes::from_static(text.as_bytes()),
    }
}

#[http_component]
async fn handle(req: IncomingRequest, response_out: ResponseOutparam) {
    let response = match component() {
        Ok(component) => match spin_request(req).await {
            Ok(request) => component.handle(request).await,
            Err(e) => {
                log_failure("request body unreadable", &e);
                plain(400, "400 Bad Request\n")
            }
        },
        Err(e) => {
            log_failure("component failed to start", &e);
            plain(500, "500 Internal Server Error\n")
        }
    };

    send(response, response_out).await;
}

fn log_failure(message: &str, error: &anyhow::Error) {
    StructuredLogger::new(RequestId::generate())
        .with_host(AdapterKind::Spin.to_string())
        .error_builder(message)
        .field("error", format!("{:#}", error))
        .emit();
}

fn outgoing_response(response: &SpinResponse) -> anyhow::Result<OutgoingResponse> {
    let headers = Fields::from_list(&response.headers)
        .map_err(|e| anyhow::anyhow!("response headers rejected: {:?}", e))?;
    let outgoing = OutgoingResponse::new(headers);
    outgoing
        .set_status_code(response.status)
        .map_err(|()| anyhow::anyhow!("status {} rejected", response.status))?;
    Ok(outgoing)
}

async fn send(response: SpinResponse, response_out: ResponseOutparam) {
    let (outgoing, payload) = match outgoing_response(&response) {
        Ok(outgoing) => (outgoing, response.body),
        Err(e) => {
            log_failure("host rejected response", &e);
            let fallback = plain(500, "500 Internal Server Error\n");
            match outgoing_response(&fallback) {
                Ok(outgoing) => (outgoing, fallback.body),
                Err(e) => {
                    // Dropping the outparam unset makes the host answer 500.
                    log_failure("host rejected fallback response", &e);
                    return;
                }
            }
        }
    };

    let mut body = outgoing.take_body();
    response_out.set(outgoing);
    if !payload.is_empty() {
        if let Err(e) = body.send(payload.to_vec()).await {
            log_failure("response body write failed", &anyhow::anyhow!("{:?}", e));
        }
    }
}
