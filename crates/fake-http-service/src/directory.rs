//! Process-wide directory of live fake services, keyed by service id.

use crate::error::{FakeServiceError, Result};
use crate::state::ServiceState;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

static GLOBAL: Lazy<ServiceDirectory> = Lazy::new(ServiceDirectory::new);

/// Maps service ids to the state of running services.
///
/// Every host loop resolves its service here on each request, so a service
/// that was unregistered stops answering even if its socket is still open.
#[derive(Debug, Default)]
pub struct ServiceDirectory {
    services: Mutex<HashMap<String, Arc<ServiceState>>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory used by [`FakeHttpService::new`](crate::FakeHttpService::new) and friends.
    pub fn global() -> &'static ServiceDirectory {
        &GLOBAL
    }

    pub fn register(&self, state: Arc<ServiceState>) -> Result<()> {
        let mut services = self.services.lock();
        if services.contains_key(state.service_id()) {
            return Err(FakeServiceError::DuplicateServiceId(
                state.service_id().to_string(),
            ));
        }
        debug!("Registered fake service {}", state.service_id());
        services.insert(state.service_id().to_string(), state);
        Ok(())
    }

    /// Remove `state`. Fails when its id is absent or held by another instance.
    pub fn unregister(&self, state: &ServiceState) -> Result<()> {
        let mut services = self.services.lock();
        match services.get(state.service_id()) {
            Some(current) if std::ptr::eq(current.as_ref(), state) => {
                services.remove(state.service_id());
                debug!("Unregistered fake service {}", state.service_id());
                Ok(())
            }
            _ => Err(FakeServiceError::NotRegistered(
                state.service_id().to_string(),
            )),
        }
    }

    pub fn lookup(&self, service_id: &str) -> Option<Arc<ServiceState>> {
        self.services.lock().get(service_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.services.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all registered services, sorted.
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Look up a live service in the global directory.
pub fn get_service_by_id(service_id: &str) -> Option<Arc<ServiceState>> {
    ServiceDirectory::global().lookup(service_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn state(id: &str) -> Arc<ServiceState> {
        Arc::new(ServiceState::new(id.to_string(), true, false))
    }

    #[test]
    fn test_lookup_lifecycle() {
        let directory = ServiceDirectory::new();
        assert!(directory.lookup("orders").is_none());

        let orders = state("orders");
        directory.register(Arc::clone(&orders)).unwrap();
        let found = directory.lookup("orders").unwrap();
        assert!(Arc::ptr_eq(&found, &orders));
        assert_eq!(directory.service_ids(), vec!["orders".to_string()]);

        directory.unregister(&orders).unwrap();
        assert!(directory.lookup("orders").is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let directory = ServiceDirectory::new();
        directory.register(state("orders")).unwrap();
        let err = directory.register(state("orders")).unwrap_err();
        assert_eq!(err.to_string(), "ServiceId in use: orders");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_unregister_unknown() {
        let directory = ServiceDirectory::new();
        let err = directory.unregister(&state("ghost")).unwrap_err();
        assert!(matches!(err, FakeServiceError::NotRegistered(id) if id == "ghost"));
    }

    #[test]
    fn test_unregister_keeps_other_instance_with_same_id() {
        let directory = ServiceDirectory::new();
        let live = state("orders");
        directory.register(Arc::clone(&live)).unwrap();

        assert!(directory.unregister(&state("orders")).is_err());
        assert!(directory.lookup("orders").is_some());
    }

    #[test]
    fn test_concurrent_registration_of_same_id() {
        let directory = Arc::new(ServiceDirectory::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let directory = Arc::clone(&directory);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    directory.register(state("contended")).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }
}
