//! Retention types: lifecycle signals, decisions and termination candidates

use janitor_util::EndpointId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Endpoint;

/// What a `KeepUntil` tag says about an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepUntil {
    /// Date is today or later: the endpoint is inside its grace window
    Stop,
    /// Date is in the past, or the tag value could not be parsed
    Expired,
    /// No `KeepUntil` tag
    #[serde(rename = "False")]
    Unset,
}

impl fmt::Display for KeepUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeepUntil::Stop => "Stop",
            KeepUntil::Expired => "Expired",
            KeepUntil::Unset => "False",
        };
        f.write_str(s)
    }
}

/// Lifecycle hints derived from an endpoint's tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleSignal {
    pub keep_alive: bool,
    pub keep_until: KeepUntil,
}

impl LifecycleSignal {
    /// Signal for an endpoint without any lifecycle tags
    pub const NONE: LifecycleSignal = LifecycleSignal {
        keep_alive: false,
        keep_until: KeepUntil::Unset,
    };
}

/// Outcome of evaluating one endpoint against the retention rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetentionDecision {
    Keep,
    Terminate,
}

/// A decision together with the signal that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub decision: RetentionDecision,
    pub signal: LifecycleSignal,
}

impl Classification {
    pub fn should_terminate(&self) -> bool {
        self.decision == RetentionDecision::Terminate
    }
}

/// Sizing attributes carried into termination records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDetails {
    pub min_num_clusters: Option<u32>,
    pub max_num_clusters: Option<u32>,
    pub cluster_size: Option<String>,
}

/// Audit record for an endpoint flagged for termination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationCandidate {
    pub cluster_name: String,
    pub creator_user_name: Option<String>,
    pub cluster_id: EndpointId,
    pub autotermination_minutes: Option<u32>,
    pub cluster_details: ClusterDetails,
    pub keep_alive: bool,
    pub keep_until: KeepUntil,
}

impl TerminationCandidate {
    pub fn from_endpoint(endpoint: &Endpoint, signal: LifecycleSignal) -> Self {
        Self {
            cluster_name: endpoint.name.clone(),
            creator_user_name: endpoint.creator_name.clone(),
            cluster_id: endpoint.id.clone(),
            autotermination_minutes: endpoint.auto_stop_mins,
            cluster_details: ClusterDetails {
                min_num_clusters: endpoint.min_num_clusters,
                max_num_clusters: endpoint.max_num_clusters,
                cluster_size: endpoint.cluster_size.clone(),
            },
            keep_alive: signal.keep_alive,
            keep_until: signal.keep_until,
        }
    }

    pub fn signal(&self) -> LifecycleSignal {
        LifecycleSignal {
            keep_alive: self.keep_alive,
            keep_until: self.keep_until,
        }
    }
}
