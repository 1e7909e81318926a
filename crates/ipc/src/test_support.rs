//! Mock server and labeled command shared by this crate's tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rmpv::Value;

use crate::error::{Error, Result};
use crate::performer::Command;
use crate::protocol::{field, map, named, take_field, Request, Response};
use crate::transport::{FrameTransport, MemoryTransport};

/// Command answered by `label_response: <label>`
pub struct Labeled {
    pub label: String,
    pub decodes: Arc<AtomicUsize>,
}

impl Labeled {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            decodes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Command for Labeled {
    type Output = String;

    fn name(&self) -> &str {
        "label_request"
    }

    fn build_request_payload(&self) -> Result<Value> {
        Ok(named("label_request", map([("label", Value::from(self.label.as_str()))])))
    }

    fn decode_response(&self, content: Value) -> Result<String> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        take_field(content, "label_response")
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Error::malformed("label_request", "missing label_response"))
    }
}

/// Label carried by a labeled request
pub fn request_label(request: &Request) -> String {
    field(&request.content, "label_request")
        .and_then(|body| field(body, "label"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Answer every request with `respond`, in arrival order
pub fn serve<F>(mut transport: MemoryTransport, respond: F)
where
    F: Fn(&Request) -> Response + Send + 'static,
{
    tokio::spawn(async move {
        while let Ok(frame) = transport.recv_frame().await {
            let request = Request::decode(&frame).unwrap();
            let response = respond(&request);
            if transport.send_frame(response.encode().unwrap()).await.is_err() {
                break;
            }
        }
    });
}

/// Answer each request with its own label
pub fn echo_server(transport: MemoryTransport) {
    serve(transport, |request| {
        Response::success(
            &request.request_id,
            "label_response",
            Value::from(request_label(request).as_str()),
        )
    });
}
