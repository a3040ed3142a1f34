//! Per-instance state shared between the owner and the host loop.

use crate::dispatch::dispatch;
use crate::error::{FakeServiceError, Result};
use crate::registry::RuleRegistry;
use crate::request::FakeRequest;
use crate::response::FakeResponse;
use hyper::Uri;
use std::sync::OnceLock;

/// Everything the host loop needs to answer requests for one fake service.
#[derive(Debug)]
pub struct ServiceState {
    service_id: String,
    id_is_user_specified: bool,
    throw_on_unused_handlers: bool,
    base_address: OnceLock<Uri>,
    rules: RuleRegistry,
}

impl ServiceState {
    pub(crate) fn new(
        service_id: String,
        id_is_user_specified: bool,
        throw_on_unused_handlers: bool,
    ) -> Self {
        Self {
            service_id,
            id_is_user_specified,
            throw_on_unused_handlers,
            base_address: OnceLock::new(),
            rules: RuleRegistry::new(),
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// `None` until the listener is bound.
    pub fn base_address(&self) -> Option<&Uri> {
        self.base_address.get()
    }

    /// Record the bound address. Only the first call succeeds.
    pub fn set_base_address(&self, base_address: Uri) -> Result<()> {
        self.base_address
            .set(base_address)
            .map_err(|_| FakeServiceError::BaseAddressAlreadySet)
    }

    pub fn throw_on_unused_handlers(&self) -> bool {
        self.throw_on_unused_handlers
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// `"id" @ http://host:port/` for caller-chosen ids, `@ http://host:port/` otherwise.
    pub fn label(&self) -> String {
        let base = self
            .base_address()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<unbound>".to_string());
        if self.id_is_user_specified {
            format!("\"{}\" @ {}", self.service_id, base)
        } else {
            format!("@ {base}")
        }
    }

    /// Diagnostic listing of tracked rules that never matched.
    pub fn unmet_expectations(&self) -> Option<String> {
        let unused = self.rules.unused_rules();
        if unused.is_empty() {
            return None;
        }

        let mut message = format!("{} expected requests", self.label());
        for rule in &unused {
            message.push('\n');
            message.push_str(rule.label());
        }
        message.push_str("\nbut they were not made.");
        Some(message)
    }

    pub async fn dispatch(&self, request: &FakeRequest) -> FakeResponse {
        match self.base_address() {
            Some(base_address) => dispatch(&self.rules, base_address, request).await,
            None => {
                let fallback = Uri::from_static("http://localhost/");
                dispatch(&self.rules, &fallback, request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{ends_with, equals, RequestPredicate};
    use crate::respond::StatusResponder;
    use hyper::StatusCode;
    use std::sync::Arc;

    fn bound(id: &str, user_specified: bool) -> ServiceState {
        let state = ServiceState::new(id.to_string(), user_specified, true);
        state
            .set_base_address(Uri::from_static("http://127.0.0.1:4000/"))
            .unwrap();
        state
    }

    #[test]
    fn test_base_address_is_set_once() {
        let state = ServiceState::new("svc".to_string(), false, false);
        assert!(state.base_address().is_none());
        state
            .set_base_address(Uri::from_static("http://127.0.0.1:4000/"))
            .unwrap();
        let err = state
            .set_base_address(Uri::from_static("http://127.0.0.1:5000/"))
            .unwrap_err();
        assert!(matches!(err, FakeServiceError::BaseAddressAlreadySet));
        assert_eq!(
            state.base_address().unwrap().to_string(),
            "http://127.0.0.1:4000/"
        );
    }

    #[test]
    fn test_label() {
        assert_eq!(
            bound("billing", true).label(),
            "\"billing\" @ http://127.0.0.1:4000/"
        );
        assert_eq!(
            bound("5e0c7a1c", false).label(),
            "@ http://127.0.0.1:4000/"
        );
    }

    #[test]
    fn test_unmet_expectations_listing() {
        let state = bound("billing", true);
        assert!(state.unmet_expectations().is_none());

        let ok = Arc::new(StatusResponder(StatusCode::OK));
        state
            .rules()
            .add(RequestPredicate::method(equals("POST")), ok.clone());
        state
            .rules()
            .add(RequestPredicate::path(ends_with("/zap.zip")), ok);

        assert_eq!(
            state.unmet_expectations().unwrap(),
            "\"billing\" @ http://127.0.0.1:4000/ expected requests\n\
             method == \"POST\"\n\
             path ends-with \"/zap.zip\"\n\
             but they were not made."
        );
    }

    #[tokio::test]
    async fn test_dispatch_marks_rule_used() {
        let state = bound("svc", false);
        state.rules().add(
            RequestPredicate::always(),
            Arc::new(StatusResponder(StatusCode::ACCEPTED)),
        );
        let request = FakeRequest::new(
            hyper::Method::GET,
            Uri::from_static("http://127.0.0.1:4000/"),
            hyper::HeaderMap::new(),
            "",
        );

        let response = state.dispatch(&request).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(state.unmet_expectations().is_none());
    }
}
