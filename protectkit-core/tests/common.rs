//! Common test utilities shared across integration tests.

#![allow(dead_code, reason = "not every test binary uses every helper")]
#![allow(missing_docs, reason = "test-only helpers")]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use protectkit_core::transport::{
    RawResponse, RequestEnvelope, ResponseBody, Transport, TransportFault,
};
use protectkit_core::version::VERSION_HEADER;
use protectkit_core::{ProtectKitClient, Revision};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;

/// Replays canned outcomes in order and records every request it is asked to send.
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<RawResponse, TransportFault>>>,
    requests: Mutex<Vec<RequestEnvelope>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<Result<RawResponse, TransportFault>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: RequestEnvelope) -> Result<RawResponse, TransportFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportFault::new("no scripted response left")))
    }
}

pub fn response(status: u16, version: Option<&str>, body: &str) -> RawResponse {
    let mut headers = HeaderMap::new();
    if let Some(version) = version {
        headers.insert(VERSION_HEADER, HeaderValue::from_str(version).unwrap());
    }
    RawResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: ResponseBody::parse(body.as_bytes()),
    }
}

pub fn client(
    revision: Revision,
    outcomes: Vec<Result<RawResponse, TransportFault>>,
) -> ProtectKitClient<ScriptedTransport> {
    ProtectKitClient::with_transport(
        "https://protect.internal",
        revision,
        ScriptedTransport::new(outcomes),
    )
    .unwrap()
}
