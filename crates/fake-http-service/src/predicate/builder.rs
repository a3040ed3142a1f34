//! Fluent filter builder returned by [`FakeHttpService::on_request`].

use super::condition::Condition;
use super::filter::RequestPredicate;
use crate::respond::ResponseBuilder;
use crate::service::FakeHttpService;
use hyper::Uri;
use serde::de::DeserializeOwned;

/// Collects sub-filters that are AND-ed together, in the order they were added.
///
/// Put cheap filters (method, path) before body filters: a body filter is not
/// evaluated for requests an earlier filter already rejected.
#[must_use = "call `then()` and a `respond_with*` method to register the rule"]
pub struct FilterBuilder<'a> {
    service: &'a FakeHttpService,
    filters: Vec<RequestPredicate>,
}

impl<'a> FilterBuilder<'a> {
    pub(crate) fn new(service: &'a FakeHttpService) -> Self {
        Self {
            service,
            filters: Vec::new(),
        }
    }

    pub fn where_uri<C: Condition<Uri>>(self, condition: C) -> Self {
        self.with(RequestPredicate::uri(condition))
    }

    pub fn where_path<C: Condition<str>>(self, condition: C) -> Self {
        self.with(RequestPredicate::path(condition))
    }

    pub fn where_method<C: Condition<str>>(self, condition: C) -> Self {
        self.with(RequestPredicate::method(condition))
    }

    pub fn where_header<C: Condition<str>>(self, name: &str, condition: C) -> Self {
        self.with(RequestPredicate::header(name, condition))
    }

    pub fn where_body_as_text<C: Condition<str>>(self, condition: C) -> Self {
        self.with(RequestPredicate::body_text(condition))
    }

    pub fn where_body_as_document<C: Condition<serde_json::Value>>(self, condition: C) -> Self {
        self.with(RequestPredicate::body_document(condition))
    }

    pub fn where_body_as<T, C>(self, condition: C) -> Self
    where
        T: DeserializeOwned + 'static,
        C: Condition<T>,
    {
        self.with(RequestPredicate::body_as::<T, C>(condition))
    }

    /// Add an arbitrary predicate to the chain.
    pub fn with(mut self, predicate: RequestPredicate) -> Self {
        self.filters.push(predicate);
        self
    }

    /// Finish the filter chain; an empty chain matches every request.
    pub fn then(self) -> ResponseBuilder<'a> {
        ResponseBuilder::new(self.service, RequestPredicate::all(self.filters))
    }
}
