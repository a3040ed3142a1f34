//! Request/response summaries and test-friendly tracing setup.

use crate::request::FakeRequest;
use crate::response::FakeResponse;
use hyper::HeaderMap;
use std::fmt::Write;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const REQUEST_OPEN: &str = ">>>REQUEST>>>>>>>>>>>>>>>>>>>>>>>>>>>>>";
const REQUEST_CLOSE: &str = ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>";
const RESPONSE_OPEN: &str = "<<<RESPONSE<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
const RESPONSE_CLOSE: &str = "<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";

/// Install a fmt subscriber writing through the libtest capture.
///
/// `directive` uses `EnvFilter` syntax, e.g. `"fake_http_service=debug"`.
/// Later calls are ignored once a global subscriber exists.
pub fn init_test_tracing(directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_test_writer()
        .try_init();
}

pub(crate) fn log_request(request: &FakeRequest) {
    debug!(target: "fake_http_service::logging", "{}", request_summary(request));
}

pub(crate) fn log_response(response: &FakeResponse) {
    debug!(target: "fake_http_service::logging", "{}", response_summary(response));
}

/// Method, absolute URI, headers and body. Does not mark the body as read.
pub fn request_summary(request: &FakeRequest) -> String {
    format!(
        "{REQUEST_OPEN}\n\n{} {}\n{}\n{}\n{REQUEST_CLOSE}",
        request.method(),
        request.uri(),
        header_summary(request.headers()),
        request.body_preview()
    )
}

pub fn response_summary(response: &FakeResponse) -> String {
    format!(
        "{RESPONSE_OPEN}\n\nHTTP/1.1 {}\n{}\n{}\n{RESPONSE_CLOSE}",
        response.status(),
        header_summary(response.headers()),
        response.body_text()
    )
}

/// One `name: v1, v2` line per header name.
fn header_summary(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for name in headers.keys() {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        let _ = writeln!(out, "{}: {}", name, values.join(", "));
    }
    out
}
