//! Shared helpers for driving the engine against canned provider responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use acme_engine::key::SigningKey;
use acme_engine::protocol::transport::TransportFuture;
use acme_engine::protocol::{AcmeError, HttpTransport};
use acme_engine::service::AcmeContext;
use base64ct::Encoding;

pub const DIRECTORY: &str = "https://example.com/acme/directory";
pub const ACCOUNT: &str = "https://example.com/acme/acct/evOfKhNU60wg";

#[macro_export]
macro_rules! fixture {
    ($name:tt) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/", $name))
    };
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn account_key() -> Arc<SigningKey> {
    Arc::new(
        SigningKey::from_pkcs8_pem(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/reference-keys/ec-p256.pem"
        )))
        .unwrap(),
    )
}

/// Parse a raw HTTP/1.1 response as stored in the fixtures.
pub fn parse(data: &str) -> http::Response<Vec<u8>> {
    let data = data.replace("\r\n", "\n");
    let (head, body) = data.split_once("\n\n").unwrap_or((data.as_str(), ""));
    let mut lines = head.lines();

    let status_line = lines.next().unwrap();
    let code: u16 = status_line.split(' ').nth(1).unwrap().parse().unwrap();

    let mut response = http::Response::builder().status(code);
    for line in lines {
        let (name, value) = line.split_once(':').unwrap();
        response = response.header(name.trim(), value.trim());
    }
    response.body(body.as_bytes().to_vec()).unwrap()
}

#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: http::Method,
    pub url: String,
    pub body: Vec<u8>,
}

impl Exchange {
    fn segment(&self, name: &str) -> serde_json::Value {
        let body: serde_json::Value = serde_json::from_slice(&self.body).unwrap();
        let bytes = base64ct::Base64UrlUnpadded::decode_vec(body[name].as_str().unwrap()).unwrap();
        if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        }
    }

    pub fn protected(&self) -> serde_json::Value {
        self.segment("protected")
    }

    pub fn payload(&self) -> serde_json::Value {
        self.segment("payload")
    }
}

/// Answers `HEAD` nonce requests with fresh nonces, and every other request
/// from a queue of fixtures.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    responses: Mutex<VecDeque<http::Response<Vec<u8>>>>,
    exchanges: Mutex<Vec<Exchange>>,
    nonces: AtomicUsize,
}

impl FixtureTransport {
    pub fn new() -> Arc<Self> {
        let transport = Arc::new(Self::default());
        transport.push(fixture!("directory.http"));
        transport
    }

    pub fn push(&self, fixture: &str) {
        self.responses.lock().unwrap().push_back(parse(fixture));
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.lock().unwrap().clone()
    }

    /// Signed requests, in the order they were sent.
    pub fn posts(&self) -> Vec<Exchange> {
        self.exchanges()
            .into_iter()
            .filter(|exchange| exchange.method == http::Method::POST)
            .collect()
    }

    pub fn nonces_issued(&self) -> usize {
        self.nonces.load(Ordering::SeqCst)
    }
}

impl HttpTransport for FixtureTransport {
    fn execute(&self, request: http::Request<Vec<u8>>) -> TransportFuture<'_> {
        let (parts, body) = request.into_parts();
        self.exchanges.lock().unwrap().push(Exchange {
            method: parts.method.clone(),
            url: parts.uri.to_string(),
            body,
        });

        let response = if parts.method == http::Method::HEAD {
            let n = self.nonces.fetch_add(1, Ordering::SeqCst);
            http::Response::builder()
                .status(200)
                .header("Replay-Nonce", format!("fresh-nonce-{n}"))
                .body(Vec::new())
                .map_err(AcmeError::from)
        } else {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AcmeError::Transport(format!("no fixture left for {}", parts.uri)))
        };

        Box::pin(async move { response })
    }
}

pub fn context(transport: &Arc<FixtureTransport>) -> AcmeContext {
    AcmeContext::builder()
        .directory_url(DIRECTORY.parse().unwrap())
        .account_key(account_key())
        .transport(transport.clone())
        .build()
        .unwrap()
}
