//! Turns a request into a response using the first matching rule.

use crate::registry::RuleRegistry;
use crate::request::FakeRequest;
use crate::response::FakeResponse;
use futures::FutureExt;
use hyper::{StatusCode, Uri};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Find the first matching rule, mark it used, and run its responder.
///
/// - No rule matches: `404` with an empty body.
/// - A predicate or responder fails: `500` with the error text as the body.
/// - A predicate or responder panics: `500` with the panic message as the body.
///
/// Never fails; every outcome is a response.
pub async fn dispatch(
    rules: &RuleRegistry,
    base_address: &Uri,
    request: &FakeRequest,
) -> FakeResponse {
    let outcome = AssertUnwindSafe(respond(rules, base_address, request))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(Some(response))) => response,
        Ok(Ok(None)) => {
            debug!("No rule matched {} {}", request.method(), request.uri());
            FakeResponse::with_status(StatusCode::NOT_FOUND)
        }
        Ok(Err(e)) => {
            warn!("Rule failed for {} {}: {}", request.method(), request.uri(), e);
            internal_error(&format!("{e:?}"))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(
                "Rule panicked for {} {}: {}",
                request.method(),
                request.uri(),
                message
            );
            internal_error(&message)
        }
    }
}

async fn respond(
    rules: &RuleRegistry,
    base_address: &Uri,
    request: &FakeRequest,
) -> anyhow::Result<Option<FakeResponse>> {
    let Some(rule) = rules.find_first_match(request)? else {
        return Ok(None);
    };
    debug!("Request matched rule {}: {}", rule.index(), rule.label());

    // Used as soon as it matched, whatever the responder does next
    rules.mark_used(&rule);

    let mut response = FakeResponse::new();
    rule.responder()
        .respond(request, &mut response, base_address)
        .await?;
    Ok(Some(response))
}

fn internal_error(message: &str) -> FakeResponse {
    let mut response = FakeResponse::with_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.write_text(message);
    response
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "responder panicked".to_string()
    }
}
