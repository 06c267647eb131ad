//! Request identification.
//!
//! # Responsibilities
//! - Reuse the client's `X-Request-ID` or generate a fresh one
//! - Expose the ID to later stages and handlers via request extensions
//! - Echo the ID on the response
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer)
//! - Any non-empty inbound value is echoed byte for byte
//! - Generated IDs are 16 random bytes, hex-encoded; if the OS random
//!   source fails the ID degrades to a timestamp instead of failing the request

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use rand::{rngs::OsRng, RngCore};

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identifier of the request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extension trait to read the request ID off a request.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Generate a fresh request ID.
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(_) => timestamp_id(),
    }
}

/// Base-36 nanoseconds since the Unix epoch.
fn timestamp_id() -> String {
    let mut nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(nanos % 36) as usize]);
        nanos /= 36;
        if nanos == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Middleware: assign the request ID and echo it on the response.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let inbound = request
        .headers()
        .get(&X_REQUEST_ID)
        .filter(|value| !value.as_bytes().is_empty())
        .cloned();

    let (header, id) = match inbound {
        Some(header) => {
            let id = String::from_utf8_lossy(header.as_bytes()).into_owned();
            (Some(header), id)
        }
        None => {
            let id = generate_request_id();
            (HeaderValue::from_str(&id).ok(), id)
        }
    };

    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;
    if let Some(header) = header {
        response.headers_mut().insert(X_REQUEST_ID.clone(), header);
    }
    response
}
