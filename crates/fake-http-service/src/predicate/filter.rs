//! Labelled request predicates and their composition.

use super::condition::Condition;
use crate::error::Result;
use crate::request::{short_type_name, FakeRequest};
use hyper::Uri;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&FakeRequest) -> Result<bool> + Send + Sync;

/// A boolean test over a request together with its printable form.
///
/// Evaluation may fail (for example when a typed body filter cannot parse the
/// body); the error is reported by the dispatcher as a 500.
#[derive(Clone)]
pub struct RequestPredicate {
    label: String,
    test: Arc<PredicateFn>,
}

impl RequestPredicate {
    pub fn new<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&FakeRequest) -> bool + Send + Sync + 'static,
    {
        Self::fallible(label, move |request| Ok(test(request)))
    }

    pub fn fallible<F>(label: impl Into<String>, test: F) -> Self
    where
        F: Fn(&FakeRequest) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            test: Arc::new(test),
        }
    }

    /// Matches every request.
    pub fn always() -> Self {
        Self::new("any request", |_| true)
    }

    /// AND of all predicates, left to right. An empty list matches everything.
    pub fn all(predicates: impl IntoIterator<Item = RequestPredicate>) -> Self {
        predicates
            .into_iter()
            .reduce(RequestPredicate::and)
            .unwrap_or_else(Self::always)
    }

    /// `other` is only evaluated when `self` holds.
    pub fn and(self, other: RequestPredicate) -> Self {
        let label = format!("{} AND {}", self.label, other.label);
        let (left, right) = (self.test, other.test);
        Self::fallible(label, move |request| {
            Ok(left(request)? && right(request)?)
        })
    }

    /// `other` is only evaluated when `self` does not hold.
    pub fn or(self, other: RequestPredicate) -> Self {
        let label = format!("({} OR {})", self.label, other.label);
        let (left, right) = (self.test, other.test);
        Self::fallible(label, move |request| {
            Ok(left(request)? || right(request)?)
        })
    }

    pub fn not(self) -> Self {
        let label = format!("NOT ({})", self.label);
        let inner = self.test;
        Self::fallible(label, move |request| Ok(!inner(request)?))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn evaluate(&self, request: &FakeRequest) -> Result<bool> {
        (self.test)(request)
    }

    // ===== Facet filters =====

    pub fn uri<C: Condition<Uri>>(condition: C) -> Self {
        let label = format!("uri {}", condition.describe());
        Self::new(label, move |request| condition.check(request.uri()))
    }

    pub fn path<C: Condition<str>>(condition: C) -> Self {
        let label = format!("path {}", condition.describe());
        Self::new(label, move |request| condition.check(request.path()))
    }

    pub fn method<C: Condition<str>>(condition: C) -> Self {
        let label = format!("method {}", condition.describe());
        Self::new(label, move |request| condition.check(request.method()))
    }

    /// A missing header never matches.
    pub fn header<C: Condition<str>>(name: &str, condition: C) -> Self {
        let name = name.to_ascii_lowercase();
        let label = format!("header[{name}] {}", condition.describe());
        Self::new(label, move |request| {
            request
                .header(&name)
                .is_some_and(|value| condition.check(value))
        })
    }

    pub fn body_text<C: Condition<str>>(condition: C) -> Self {
        let label = format!("body {}", condition.describe());
        Self::new(label, move |request| condition.check(request.body_text()))
    }

    pub fn body_document<C: Condition<serde_json::Value>>(condition: C) -> Self {
        let label = format!("body<json> {}", condition.describe());
        Self::fallible(label, move |request| {
            let document = request.body_document()?;
            Ok(condition.check(&document))
        })
    }

    pub fn body_as<T, C>(condition: C) -> Self
    where
        T: DeserializeOwned + 'static,
        C: Condition<T>,
    {
        let label = format!("body<{}> {}", short_type_name::<T>(), condition.describe());
        Self::fallible(label, move |request| {
            let body = request.body_as::<T>()?;
            Ok(condition.check(&body))
        })
    }
}

impl fmt::Debug for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPredicate")
            .field("label", &self.label)
            .finish()
    }
}

impl fmt::Display for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FakeServiceError;
    use crate::predicate::condition::{described, ends_with, equals};
    use hyper::{HeaderMap, Method};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct SamplePoco {
        value: String,
    }

    fn request(method: Method, path: &str, body: &str) -> FakeRequest {
        let uri: Uri = format!("http://127.0.0.1:4000{path}").parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant", "acme".parse().unwrap());
        FakeRequest::new(method, uri, headers, body.to_string())
    }

    #[test]
    fn test_empty_composition_matches_everything() {
        let predicate = RequestPredicate::all(Vec::new());
        assert_eq!(predicate.label(), "any request");
        assert!(predicate
            .evaluate(&request(Method::DELETE, "/anything", ""))
            .unwrap());
    }

    #[test]
    fn test_labels_are_joined_with_and() {
        let predicate = RequestPredicate::all(vec![
            RequestPredicate::method(equals("POST")),
            RequestPredicate::path(ends_with("/foo")),
        ]);
        assert_eq!(
            predicate.label(),
            r#"method == "POST" AND path ends-with "/foo""#
        );
    }

    #[test]
    fn test_method_and_body_filter() {
        let predicate = RequestPredicate::method(|m: &str| m == "POST")
            .and(RequestPredicate::body_text(|b: &str| b == "nothing"));

        assert!(predicate
            .evaluate(&request(Method::POST, "/x", "nothing"))
            .unwrap());
        assert!(!predicate
            .evaluate(&request(Method::POST, "/x", "different"))
            .unwrap());
    }

    #[test]
    fn test_and_short_circuits_before_reading_body() {
        let predicate = RequestPredicate::method(equals("POST"))
            .and(RequestPredicate::body_text(equals("nothing")));
        let get = request(Method::GET, "/x", "nothing");

        assert!(!predicate.evaluate(&get).unwrap());
        assert!(!get.body_was_read());
    }

    #[test]
    fn test_or_and_not() {
        let predicate = RequestPredicate::method(equals("GET"))
            .or(RequestPredicate::method(equals("HEAD")));
        assert_eq!(predicate.label(), r#"(method == "GET" OR method == "HEAD")"#);
        assert!(predicate.evaluate(&request(Method::HEAD, "/", "")).unwrap());
        assert!(!predicate.evaluate(&request(Method::PUT, "/", "")).unwrap());

        let negated = RequestPredicate::path(equals("/health")).not();
        assert_eq!(negated.label(), r#"NOT (path == "/health")"#);
        assert!(!negated.evaluate(&request(Method::GET, "/health", "")).unwrap());
        assert!(negated.evaluate(&request(Method::GET, "/orders", "")).unwrap());
    }

    #[test]
    fn test_uri_filter_sees_absolute_uri() {
        let predicate = RequestPredicate::uri(|uri: &Uri| {
            uri.to_string().ends_with("customapicall")
        });
        assert!(predicate
            .evaluate(&request(Method::GET, "/customapicall", ""))
            .unwrap());
        assert!(!predicate
            .evaluate(&request(Method::GET, "/other", ""))
            .unwrap());
    }

    #[test]
    fn test_header_filter() {
        let predicate = RequestPredicate::header("X-Tenant", equals("acme"));
        assert_eq!(predicate.label(), r#"header[x-tenant] == "acme""#);
        assert!(predicate.evaluate(&request(Method::GET, "/", "")).unwrap());

        let missing = RequestPredicate::header("x-missing", |_: &str| true);
        assert!(!missing.evaluate(&request(Method::GET, "/", "")).unwrap());
    }

    #[test]
    fn test_body_document_filter() {
        let predicate = RequestPredicate::body_document(|doc: &serde_json::Value| {
            *doc == serde_json::json!({"field": 1})
        });
        assert!(predicate
            .evaluate(&request(Method::POST, "/", r#"{"field": 1}"#))
            .unwrap());
        assert!(!predicate
            .evaluate(&request(Method::POST, "/", "{}"))
            .unwrap());

        let err = predicate
            .evaluate(&request(Method::POST, "/", "not json"))
            .unwrap_err();
        assert!(matches!(err, FakeServiceError::MalformedBody { .. }));
    }

    #[test]
    fn test_typed_body_filter() {
        let predicate = RequestPredicate::body_as::<SamplePoco, _>(described(
            "value is defined",
            |poco: &SamplePoco| poco.value == "defined",
        ));
        assert_eq!(predicate.label(), "body<SamplePoco> value is defined");
        assert!(predicate
            .evaluate(&request(Method::POST, "/", r#"{"value": "defined"}"#))
            .unwrap());
        assert!(!predicate
            .evaluate(&request(Method::POST, "/", r#"{"value": "undefined"}"#))
            .unwrap());
        assert!(predicate
            .evaluate(&request(Method::POST, "/", r#"{"other": 1}"#))
            .is_err());
    }

    #[test]
    fn test_body_is_decoded_once_across_filters() {
        let predicate = RequestPredicate::body_text(contains_text("field"))
            .and(RequestPredicate::body_document(|_: &serde_json::Value| true));
        let req = request(Method::POST, "/", r#"{"field": 1}"#);
        assert!(predicate.evaluate(&req).unwrap());
        assert!(req.body_was_read());
    }

    fn contains_text(needle: &'static str) -> impl Fn(&str) -> bool + Send + Sync + 'static {
        move |body: &str| body.contains(needle)
    }
}
