//! Retention evaluator
//!
//! Pure classification of endpoints into keep/terminate. The evaluator does
//! no I/O; "today" is fixed at construction so a pass is reproducible.

use chrono::NaiveDate;
use janitor_api::{Classification, Endpoint, TerminationCandidate};
use janitor_config::RetentionPolicy;
use tracing::debug;

use crate::lifecycle::{decide, lifecycle_signal};

/// Evaluates endpoints against the keep-alive/keep-until rule
#[derive(Debug, Clone)]
pub struct RetentionEvaluator {
    policy: RetentionPolicy,
    today: NaiveDate,
}

impl RetentionEvaluator {
    pub fn new(policy: RetentionPolicy, today: NaiveDate) -> Self {
        Self { policy, today }
    }

    /// Classify a single endpoint from its tags alone
    pub fn classify_endpoint(&self, endpoint: &Endpoint) -> Classification {
        let signal = lifecycle_signal(endpoint.custom_tags(), self.today);
        Classification {
            decision: decide(signal),
            signal,
        }
    }

    /// Whether an endpoint is considered at all by the retention pass
    pub fn is_eligible(&self, endpoint: &Endpoint) -> bool {
        endpoint.state.is_stopped() && !self.policy.is_exempt(&endpoint.name)
    }

    /// Termination candidates among `endpoints`, in input order.
    ///
    /// Only stopped or stopping endpoints whose name is not exempt are
    /// classified.
    pub fn select_termination_candidates(&self, endpoints: &[Endpoint]) -> Vec<TerminationCandidate> {
        endpoints
            .iter()
            .filter(|e| self.is_eligible(e))
            .filter_map(|endpoint| {
                let classification = self.classify_endpoint(endpoint);
                debug!(
                    endpoint_id = %endpoint.id,
                    name = %endpoint.name,
                    keep_alive = classification.signal.keep_alive,
                    keep_until = %classification.signal.keep_until,
                    decision = ?classification.decision,
                    "Endpoint classified"
                );
                classification
                    .should_terminate()
                    .then(|| TerminationCandidate::from_endpoint(endpoint, classification.signal))
            })
            .collect()
    }

    /// Classify every endpoint, ignoring state and exemptions
    pub fn evaluate_all<'a>(&self, endpoints: &'a [Endpoint]) -> Vec<(&'a Endpoint, Classification)> {
        endpoints
            .iter()
            .map(|e| (e, self.classify_endpoint(e)))
            .collect()
    }
}
