//! Construction options for a fake service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FakeServiceConfig {
    /// Identifier used in the service directory. A random UUID is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Fail teardown when some registered rule never matched a request
    #[serde(default)]
    pub throw_on_unused_handlers: bool,
    /// Interface to bind; the port is always ephemeral
    #[serde(default = "default_host")]
    pub host: String,
    /// Number of runtime worker threads (0 = current-thread runtime)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_workers() -> usize {
    2
}

impl Default for FakeServiceConfig {
    fn default() -> Self {
        Self {
            service_id: None,
            throw_on_unused_handlers: false,
            host: default_host(),
            workers: default_workers(),
        }
    }
}

impl FakeServiceConfig {
    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn throw_on_unused_handlers(mut self, throw: bool) -> Self {
        self.throw_on_unused_handlers = throw;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
