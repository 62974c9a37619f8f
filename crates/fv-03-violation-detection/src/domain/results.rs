//! Result of one `(node, period)` job.

use serde::{Deserialize, Serialize};

use shared_types::{NodeId, Period, Violation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCheck {
    pub node_id: NodeId,
    pub period: Period,
    pub violations: Vec<Violation>,
}
