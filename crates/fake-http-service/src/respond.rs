//! Responders and the builder that registers a rule.

use crate::predicate::RequestPredicate;
use crate::request::FakeRequest;
use crate::response::FakeResponse;
use crate::service::FakeHttpService;
use async_trait::async_trait;
use hyper::{StatusCode, Uri};
use std::future::Future;
use std::sync::Arc;

/// Populates the response for a matched request.
///
/// Errors (and panics) are turned into a `500` whose body carries the error text.
#[async_trait]
pub trait Respond: Send + Sync + 'static {
    async fn respond(
        &self,
        request: &FakeRequest,
        response: &mut FakeResponse,
        base_address: &Uri,
    ) -> anyhow::Result<()>;
}

pub(crate) struct FnResponder<F>(F);

#[async_trait]
impl<F> Respond for FnResponder<F>
where
    F: Fn(&mut FakeResponse) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn respond(
        &self,
        _request: &FakeRequest,
        response: &mut FakeResponse,
        _base_address: &Uri,
    ) -> anyhow::Result<()> {
        (self.0)(response)
    }
}

pub(crate) struct BaseAddressResponder<F>(F);

#[async_trait]
impl<F> Respond for BaseAddressResponder<F>
where
    F: Fn(&mut FakeResponse, &Uri) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn respond(
        &self,
        _request: &FakeRequest,
        response: &mut FakeResponse,
        base_address: &Uri,
    ) -> anyhow::Result<()> {
        (self.0)(response, base_address)
    }
}

/// Takes the response by value and hands it back once the future completes.
pub(crate) struct AsyncResponder<F>(F);

#[async_trait]
impl<F, Fut> Respond for AsyncResponder<F>
where
    F: Fn(FakeResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<FakeResponse>> + Send + 'static,
{
    async fn respond(
        &self,
        _request: &FakeRequest,
        response: &mut FakeResponse,
        _base_address: &Uri,
    ) -> anyhow::Result<()> {
        let current = std::mem::take(response);
        *response = (self.0)(current).await?;
        Ok(())
    }
}

/// Answers with a fixed status and no body.
pub(crate) struct StatusResponder(pub StatusCode);

#[async_trait]
impl Respond for StatusResponder {
    async fn respond(
        &self,
        _request: &FakeRequest,
        response: &mut FakeResponse,
        _base_address: &Uri,
    ) -> anyhow::Result<()> {
        response.set_status(self.0);
        Ok(())
    }
}

/// Writes a fixed text body.
pub(crate) struct ContentResponder(pub String);

#[async_trait]
impl Respond for ContentResponder {
    async fn respond(
        &self,
        _request: &FakeRequest,
        response: &mut FakeResponse,
        _base_address: &Uri,
    ) -> anyhow::Result<()> {
        response.write_text(&self.0);
        Ok(())
    }
}

/// Catch-all answer for requests no other rule expected.
pub(crate) struct UnexpectedRequestResponder;

#[async_trait]
impl Respond for UnexpectedRequestResponder {
    async fn respond(
        &self,
        request: &FakeRequest,
        response: &mut FakeResponse,
        _base_address: &Uri,
    ) -> anyhow::Result<()> {
        response
            .set_status(StatusCode::INTERNAL_SERVER_ERROR)
            .write_text(&format!(
                "unexpected request: {} {}",
                request.method(),
                request.uri()
            ));
        Ok(())
    }
}

/// Second half of a rule: what to answer once the predicate matched.
#[must_use = "a rule is only registered by a `respond_with*`, `succeed` or `fail` call"]
pub struct ResponseBuilder<'a> {
    service: &'a FakeHttpService,
    predicate: RequestPredicate,
}

impl<'a> ResponseBuilder<'a> {
    pub(crate) fn new(service: &'a FakeHttpService, predicate: RequestPredicate) -> Self {
        Self { service, predicate }
    }

    pub fn predicate(&self) -> &RequestPredicate {
        &self.predicate
    }

    pub fn respond_with<F>(self, responder: F) -> &'a FakeHttpService
    where
        F: Fn(&mut FakeResponse) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.respond_with_responder(FnResponder(responder))
    }

    /// Like [`respond_with`](Self::respond_with), also receiving the service's base address.
    pub fn respond_with_base_address<F>(self, responder: F) -> &'a FakeHttpService
    where
        F: Fn(&mut FakeResponse, &Uri) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.respond_with_responder(BaseAddressResponder(responder))
    }

    pub fn respond_with_async<F, Fut>(self, responder: F) -> &'a FakeHttpService
    where
        F: Fn(FakeResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<FakeResponse>> + Send + 'static,
    {
        self.respond_with_responder(AsyncResponder(responder))
    }

    pub fn respond_with_responder<R: Respond>(self, responder: R) -> &'a FakeHttpService {
        self.service
            .register_rule(self.predicate, Arc::new(responder), true)
    }

    /// Answer `200 OK` with an empty body.
    pub fn succeed(self) -> &'a FakeHttpService {
        self.respond_with_responder(StatusResponder(StatusCode::OK))
    }

    /// Answer `500 Internal Server Error` with an empty body.
    pub fn fail(self) -> &'a FakeHttpService {
        self.respond_with_responder(StatusResponder(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{HeaderMap, Method};

    fn request() -> FakeRequest {
        FakeRequest::new(
            Method::GET,
            Uri::from_static("http://127.0.0.1:4000/missing"),
            HeaderMap::new(),
            "",
        )
    }

    #[tokio::test]
    async fn test_fn_responder() {
        let responder = FnResponder(|r: &mut FakeResponse| -> anyhow::Result<()> {
            r.set_status(StatusCode::CREATED).write_text("made");
            Ok(())
        });
        let mut response = FakeResponse::new();
        let base = Uri::from_static("http://127.0.0.1:4000/");
        responder
            .respond(&request(), &mut response, &base)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body_text(), "made");
    }

    #[tokio::test]
    async fn test_base_address_responder() {
        let responder = BaseAddressResponder(|r: &mut FakeResponse, base: &Uri| -> anyhow::Result<()> {
            r.write_text(&format!("{base}some/path"));
            Ok(())
        });
        let mut response = FakeResponse::new();
        let base = Uri::from_static("http://127.0.0.1:4000/");
        responder
            .respond(&request(), &mut response, &base)
            .await
            .unwrap();
        assert_eq!(response.body_text(), "http://127.0.0.1:4000/some/path");
    }

    #[tokio::test]
    async fn test_async_responder_hands_response_back() {
        let responder = AsyncResponder(|mut r: FakeResponse| async move {
            tokio::task::yield_now().await;
            r.write_text("later");
            Ok::<_, anyhow::Error>(r)
        });
        let mut response = FakeResponse::new();
        response.insert_header("x-before", "1").unwrap();
        let base = Uri::from_static("http://127.0.0.1:4000/");
        responder
            .respond(&request(), &mut response, &base)
            .await
            .unwrap();
        assert_eq!(response.body_text(), "later");
        assert!(response.headers().contains_key("x-before"));
    }

    #[tokio::test]
    async fn test_unexpected_request_responder() {
        let mut response = FakeResponse::new();
        let base = Uri::from_static("http://127.0.0.1:4000/");
        UnexpectedRequestResponder
            .respond(&request(), &mut response, &base)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.body_text(),
            "unexpected request: GET http://127.0.0.1:4000/missing"
        );
    }
}
