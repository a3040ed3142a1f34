//! In-process fake HTTP server for tests.
//!
//! A [`FakeHttpService`] binds an ephemeral local port and answers requests
//! from rules registered by the test: a predicate over the request and a
//! responder that fills in the response. Rules are tried in registration
//! order; the first match answers, and unmatched requests get `404`.
//!
//! ```no_run
//! use fake_http_service::{equals, FakeHttpService, FakeServiceConfig};
//!
//! let mut service = FakeHttpService::with_config(
//!     FakeServiceConfig::default().throw_on_unused_handlers(true),
//! )?;
//! service
//!     .on_request()
//!     .where_method(equals("POST"))
//!     .where_path(equals("/orders"))
//!     .then()
//!     .respond_with(|response| {
//!         response.write_json(&serde_json::json!({"id": 1}))?;
//!         Ok(())
//!     })
//!     .fail_on_unexpected_request();
//!
//! // ... point the code under test at service.base_address() ...
//!
//! service.stop()?;
//! # Ok::<(), fake_http_service::FakeServiceError>(())
//! ```

// ===== Building rules =====
pub mod predicate;
pub mod respond;

// ===== Matching and answering =====
pub mod dispatch;
pub mod registry;
pub mod request;
pub mod response;

// ===== Lifecycle =====
pub mod config;
pub mod directory;
pub mod service;
pub mod state;

pub mod error;
pub mod logging;

// Host loop is internal
mod server;

pub use config::FakeServiceConfig;
pub use directory::{get_service_by_id, ServiceDirectory};
pub use error::{FakeServiceError, Result};
pub use logging::init_test_tracing;
pub use predicate::{
    contains, described, ends_with, equals, matches_regex, starts_with, Condition,
    FilterBuilder, RequestPredicate, StringCondition,
};
pub use request::FakeRequest;
pub use respond::{Respond, ResponseBuilder};
pub use response::FakeResponse;
pub use service::FakeHttpService;
pub use state::ServiceState;
