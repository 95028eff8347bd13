/// Core workflow type definitions
///
/// Defines the fundamental structures for workflows, nodes, edges, and
/// execution records. These types are serialized/deserialized from JSON for
/// persistence; node `config` stays a flexible JSON object because every node
/// type carries different parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A complete workflow definition containing nodes and their connections
///
/// Workflows are stored as JSON in SQLite and compiled into a fresh
/// `WorkflowGraph` for each execution. Node and edge declaration order is
/// significant: the first declared trigger node is the entry point, and a
/// node's children execute in edge declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier (e.g., "wf-standup-digest")
    pub id: String,
    /// Human-readable workflow name
    pub name: String,
    /// List of nodes in this workflow
    pub nodes: Vec<Node>,
    /// List of edges connecting nodes
    pub edges: Vec<Edge>,
}

/// A single step in the workflow graph
///
/// Nodes are immutable during execution. `config` holds type-specific
/// parameters (delay duration, destination channel, target URL, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier within the workflow (e.g., "n1", "notify-team")
    pub id: String,
    /// The type of node which determines execution behavior
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Display title shown in the builder UI
    #[serde(default)]
    pub title: String,
    /// Node-specific configuration parameters as flexible JSON
    #[serde(default)]
    pub config: Value,
}

/// Available node types for the workloom engine
///
/// Unrecognized tags deserialize into `Other` instead of failing, so graphs
/// produced by a newer generator still execute (the fallback handler reports
/// them as executed without doing work).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Entry point of the graph; execution starts here
    Trigger,
    /// Generic action stub
    Action,
    /// Boolean condition stub; yields `result` for downstream consumers
    Condition,
    /// Suspends the current path for `config.delayMs` (default 2000)
    Delay,
    /// Outbound webhook delivery stub
    Webhook,
    /// Email delivery stub
    Email,
    /// Database lookup stub
    Database,
    /// Slack channel message (real send when a notifier is configured)
    Slack,
    /// Discord channel message (real send when a notifier is configured)
    Discord,
    /// Spreadsheet append stub
    Spreadsheet,
    /// Outbound HTTP request stub
    HttpRequest,
    /// Unrecognized node type, kept verbatim for the permissive fallback
    Other(String),
}

impl NodeType {
    /// Wire tag for this node type, matching the generator's vocabulary
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Trigger => "trigger",
            NodeType::Action => "action",
            NodeType::Condition => "condition",
            NodeType::Delay => "delay",
            NodeType::Webhook => "webhook",
            NodeType::Email => "email",
            NodeType::Database => "database",
            NodeType::Slack => "slack",
            NodeType::Discord => "discord",
            NodeType::Spreadsheet => "spreadsheet",
            NodeType::HttpRequest => "http-request",
            NodeType::Other(tag) => tag,
        }
    }

    /// True for the messaging-channel family (slack/discord)
    pub fn is_messaging(&self) -> bool {
        matches!(self, NodeType::Slack | NodeType::Discord)
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        match tag {
            "trigger" => NodeType::Trigger,
            "action" => NodeType::Action,
            "condition" => NodeType::Condition,
            "delay" => NodeType::Delay,
            "webhook" => NodeType::Webhook,
            "email" => NodeType::Email,
            "database" => NodeType::Database,
            "slack" => NodeType::Slack,
            "discord" => NodeType::Discord,
            "spreadsheet" => NodeType::Spreadsheet,
            "http-request" => NodeType::HttpRequest,
            other => NodeType::Other(other.to_string()),
        }
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(NodeType::from(tag.as_str()))
    }
}

/// Connection between two nodes in the workflow graph
///
/// Edges define execution order from one node to another. Declaration order
/// is preserved all the way into child execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    pub from: String,
    /// Target node ID
    pub to: String,
}

/// Terminal and non-terminal states of an execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// One invocation of a workflow's graph
///
/// Created in `running` state the instant a trigger fires and transitioned
/// exactly once to `completed` (with the aggregated output tree) or `failed`
/// (with the causing message). Owned by the execution engine; everything else
/// only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    /// Trigger context (e.g., {"triggeredBy": "scheduler"})
    pub input: Value,
    /// Final aggregated result tree, present only on completion
    pub output: Option<Value>,
    /// Failure message, present only on failure
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A persisted workflow together with its activation and schedule state
///
/// `schedule` is a standard 5-field cron expression; the scheduler rebuilds
/// its in-process bindings from this field at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub workflow: Workflow,
    pub is_active: bool,
    pub schedule: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_round_trips_wire_tags() {
        for tag in [
            "trigger",
            "action",
            "condition",
            "delay",
            "webhook",
            "email",
            "database",
            "slack",
            "discord",
            "spreadsheet",
            "http-request",
        ] {
            let parsed = NodeType::from(tag);
            assert!(!matches!(parsed, NodeType::Other(_)), "tag {tag} should be known");
            assert_eq!(parsed.as_str(), tag);
        }
    }

    #[test]
    fn unknown_node_type_is_preserved_not_rejected() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "type": "quantum-flux",
        }))
        .expect("unknown types must still deserialize");
        assert_eq!(node.node_type, NodeType::Other("quantum-flux".to_string()));
        assert_eq!(node.node_type.as_str(), "quantum-flux");
    }

    #[test]
    fn execution_status_display_and_parse_agree() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
        ] {
            let parsed: ExecutionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("exploded".parse::<ExecutionStatus>().is_err());
    }
}
