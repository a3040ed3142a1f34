//! Ordered rule list with unused-rule tracking.

use crate::error::Result;
use crate::predicate::RequestPredicate;
use crate::request::FakeRequest;
use crate::respond::Respond;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A registered (predicate, responder) pair. Identity is the registration index.
pub struct Rule {
    index: usize,
    predicate: RequestPredicate,
    responder: Arc<dyn Respond>,
    tracked: bool,
}

impl Rule {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn predicate(&self) -> &RequestPredicate {
        &self.predicate
    }

    pub fn label(&self) -> &str {
        self.predicate.label()
    }

    /// Untracked rules never count as unmet expectations.
    pub fn is_tracked(&self) -> bool {
        self.tracked
    }

    pub(crate) fn responder(&self) -> &Arc<dyn Respond> {
        &self.responder
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("index", &self.index)
            .field("predicate", &self.predicate.label())
            .field("tracked", &self.tracked)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    rules: Vec<Arc<Rule>>,
    /// Indexes of tracked rules that have not matched yet
    unused: BTreeSet<usize>,
}

/// Rules of one fake service, evaluated first-match-wins in registration order.
///
/// The rule list and the unused set share one lock. Predicates run on a
/// snapshot of the list, outside the lock.
#[derive(Default)]
pub struct RuleRegistry {
    state: RwLock<RegistryState>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule that must be matched at least once.
    pub fn add(&self, predicate: RequestPredicate, responder: Arc<dyn Respond>) {
        self.push(predicate, responder, true);
    }

    /// Append a rule that is never reported as unused.
    pub fn add_untracked(&self, predicate: RequestPredicate, responder: Arc<dyn Respond>) {
        self.push(predicate, responder, false);
    }

    fn push(&self, predicate: RequestPredicate, responder: Arc<dyn Respond>, tracked: bool) {
        let mut state = self.state.write();
        let index = state.rules.len();
        state.rules.push(Arc::new(Rule {
            index,
            predicate,
            responder,
            tracked,
        }));
        if tracked {
            state.unused.insert(index);
        }
    }

    /// First rule whose predicate holds. Stops evaluating at the first match or error.
    pub fn find_first_match(&self, request: &FakeRequest) -> Result<Option<Arc<Rule>>> {
        let rules = self.state.read().rules.clone();
        for rule in rules {
            if rule.predicate.evaluate(request)? {
                return Ok(Some(rule));
            }
        }
        Ok(None)
    }

    /// Remove `rule` from the unused set; later calls are no-ops.
    pub fn mark_used(&self, rule: &Rule) {
        self.state.write().unused.remove(&rule.index);
    }

    /// Tracked rules that never matched, in registration order.
    pub fn unused_rules(&self) -> Vec<Arc<Rule>> {
        let state = self.state.read();
        state
            .unused
            .iter()
            .filter_map(|index| state.rules.get(*index).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("RuleRegistry")
            .field("rules", &state.rules)
            .field("unused", &state.unused)
            .finish()
    }
}
