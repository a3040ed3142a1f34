//! The fake service handle owned by a test.

use crate::config::FakeServiceConfig;
use crate::directory::ServiceDirectory;
use crate::error::{FakeServiceError, Result};
use crate::predicate::{ends_with, FilterBuilder, RequestPredicate};
use crate::respond::{ContentResponder, Respond, ResponseBuilder, UnexpectedRequestResponder};
use crate::server::{self, ServerHandle};
use crate::state::ServiceState;
use hyper::Uri;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// An HTTP server on an ephemeral local port that answers from registered rules.
///
/// ```no_run
/// use fake_http_service::FakeHttpService;
///
/// let service = FakeHttpService::new()?;
/// service
///     .on_request()
///     .where_method(|m: &str| m == "GET")
///     .then()
///     .respond_with(|response| {
///         response.write_text("pong");
///         Ok(())
///     });
/// let url = service.url("ping");
/// # Ok::<(), fake_http_service::FakeServiceError>(())
/// ```
///
/// Rules are tried in registration order and the first match answers.
/// Requests nothing matches get `404`. Dropping the service stops it; with
/// `throw_on_unused_handlers` set, dropping it while some rule never matched
/// panics with the list of expected requests.
pub struct FakeHttpService {
    state: Arc<ServiceState>,
    directory: &'static ServiceDirectory,
    base_address: Uri,
    server: Option<ServerHandle>,
    stopped: bool,
}

impl FakeHttpService {
    /// Start with a random id and default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(FakeServiceConfig::default())
    }

    /// Start under a caller-chosen id; fails if the id is already in use.
    pub fn with_id(service_id: impl Into<String>) -> Result<Self> {
        Self::with_config(FakeServiceConfig::default().with_service_id(service_id))
    }

    pub fn with_config(config: FakeServiceConfig) -> Result<Self> {
        Self::start_in(ServiceDirectory::global(), config)
    }

    /// Start against a specific directory instead of the global one.
    pub fn start_in(
        directory: &'static ServiceDirectory,
        config: FakeServiceConfig,
    ) -> Result<Self> {
        let listener = server::bind(&config.host)?;
        let local_addr = listener.local_addr().map_err(|source| FakeServiceError::Bind {
            host: config.host.clone(),
            source,
        })?;

        let id_is_user_specified = config.service_id.is_some();
        let service_id = config
            .service_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let state = Arc::new(ServiceState::new(
            service_id,
            id_is_user_specified,
            config.throw_on_unused_handlers,
        ));

        directory.register(Arc::clone(&state))?;

        let base_address = match base_address_for(&local_addr.to_string())
            .and_then(|uri| state.set_base_address(uri.clone()).map(|_| uri))
        {
            Ok(uri) => uri,
            Err(e) => {
                let _ = directory.unregister(&state);
                return Err(e);
            }
        };

        let spawned = server::spawn(listener, directory, state.service_id(), config.workers);
        let server = match spawned {
            Ok(server) => server,
            Err(e) => {
                let _ = directory.unregister(&state);
                return Err(e);
            }
        };

        Ok(Self {
            state,
            directory,
            base_address,
            server: Some(server),
            stopped: false,
        })
    }

    pub fn service_id(&self) -> &str {
        self.state.service_id()
    }

    /// `http://<ip>:<port>/`, fixed for the lifetime of the service.
    pub fn base_address(&self) -> &Uri {
        &self.base_address
    }

    /// Absolute URL for `path` under the base address.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_address, path.trim_start_matches('/'))
    }

    pub fn state(&self) -> &Arc<ServiceState> {
        &self.state
    }

    pub fn rule_count(&self) -> usize {
        self.state.rules().len()
    }

    /// Start a rule built from AND-ed filters.
    pub fn on_request(&self) -> FilterBuilder<'_> {
        FilterBuilder::new(self)
    }

    /// Start a rule from a single predicate.
    pub fn on_request_matching(&self, predicate: RequestPredicate) -> ResponseBuilder<'_> {
        ResponseBuilder::new(self, predicate)
    }

    /// Answer any request whose path ends with `path` with `content` as the body.
    pub fn with_content_at(&self, path: &str, content: impl Into<String>) -> &Self {
        self.register_rule(
            RequestPredicate::path(ends_with(path)),
            Arc::new(ContentResponder(content.into())),
            true,
        )
    }

    /// Answer `500` to anything no earlier rule matched.
    ///
    /// Register it last. The catch-all is never reported as an unmet expectation.
    pub fn fail_on_unexpected_request(&self) -> &Self {
        self.register_rule(
            RequestPredicate::always(),
            Arc::new(UnexpectedRequestResponder),
            false,
        )
    }

    pub(crate) fn register_rule(
        &self,
        predicate: RequestPredicate,
        responder: Arc<dyn Respond>,
        tracked: bool,
    ) -> &Self {
        debug!("{} registered rule: {}", self.state.label(), predicate.label());
        if tracked {
            self.state.rules().add(predicate, responder);
        } else {
            self.state.rules().add_untracked(predicate, responder);
        }
        self
    }

    /// Stop serving, release the port, and leave the directory.
    ///
    /// With `throw_on_unused_handlers`, returns [`FakeServiceError::UnmetExpectations`]
    /// if some rule never matched. Cleanup has happened by then either way.
    /// Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        if let Some(mut server) = self.server.take() {
            server.shutdown();
        }
        self.directory.unregister(&self.state)?;

        if self.state.throw_on_unused_handlers() {
            if let Some(message) = self.state.unmet_expectations() {
                return Err(FakeServiceError::UnmetExpectations(message));
            }
        }
        Ok(())
    }
}

fn base_address_for(authority: &str) -> Result<Uri> {
    format!("http://{authority}/")
        .parse()
        .map_err(|_| FakeServiceError::InvalidBaseAddress(authority.to_string()))
}

impl fmt::Display for FakeHttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state.label())
    }
}

impl fmt::Debug for FakeHttpService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeHttpService")
            .field("service_id", &self.service_id())
            .field("base_address", &self.base_address)
            .field("rules", &self.rule_count())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl Drop for FakeHttpService {
    fn drop(&mut self) {
        match self.stop() {
            Ok(()) => {}
            Err(FakeServiceError::UnmetExpectations(message)) => {
                if std::thread::panicking() {
                    warn!("{}", message);
                } else {
                    panic!("{}", message);
                }
            }
            Err(e) => warn!("Failed to stop {}: {}", self, e),
        }
    }
}
