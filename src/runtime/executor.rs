/// Node execution handlers
///
/// One handler per node type, selected through a lookup table keyed by
/// `NodeType`. Adding a node type means adding a handler and one table entry;
/// no dispatch branching anywhere else. Most handlers are fixed-latency stubs
/// that produce a deterministic-shaped payload; the messaging handlers talk
/// to a real notifier when one is registered and simulate the send otherwise.

use crate::notify::NotifierRegistry;
use crate::workflow::types::{Node, NodeType};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Accumulated mapping of prior results along the current path
///
/// Shallow-merged as the traversal descends: later (closer) results overwrite
/// ancestors on key collision. That is the law for context propagation.
pub type Context = Map<String, Value>;

/// Flat result payload of a single node, before children are attached
pub type NodePayload = Map<String, Value>;

/// Default suspension for delay nodes without an explicit `delayMs`
const DEFAULT_DELAY_MS: u64 = 2000;

/// Fixed latency used by the simulated stub handlers
const STUB_LATENCY_MS: u64 = 250;

/// Behavior of one node type
///
/// Handlers return `Err` only when a real downstream dependency is
/// unreachable; that error escapes the traversal and fails the whole run.
/// Everything recoverable is reported inside the payload instead.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn handle(&self, node: &Node, context: &Context) -> Result<NodePayload>;
}

/// Dispatches a single node to its type-specific handler
///
/// The table is populated with the built-in handlers at construction;
/// `register_handler` swaps an entry, which is how a deployment wires a real
/// database or HTTP integration in place of the stub.
pub struct NodeExecutor {
    handlers: HashMap<NodeType, Arc<dyn NodeHandler>>,
    fallback: Arc<dyn NodeHandler>,
}

impl NodeExecutor {
    /// Create an executor with the built-in handler table
    pub fn new(notifiers: Arc<NotifierRegistry>) -> Self {
        let mut handlers: HashMap<NodeType, Arc<dyn NodeHandler>> = HashMap::new();

        handlers.insert(NodeType::Trigger, Arc::new(TriggerHandler));
        handlers.insert(NodeType::Delay, Arc::new(DelayHandler));
        handlers.insert(NodeType::Action, Arc::new(ActionHandler));
        handlers.insert(NodeType::Condition, Arc::new(ConditionHandler));
        handlers.insert(NodeType::Database, Arc::new(DatabaseHandler));
        handlers.insert(NodeType::Webhook, Arc::new(WebhookHandler));
        handlers.insert(NodeType::HttpRequest, Arc::new(HttpRequestHandler));
        handlers.insert(NodeType::Email, Arc::new(EmailHandler));
        handlers.insert(NodeType::Spreadsheet, Arc::new(SpreadsheetHandler));

        let messaging = Arc::new(MessagingHandler { notifiers });
        handlers.insert(NodeType::Slack, messaging.clone());
        handlers.insert(NodeType::Discord, messaging);

        Self {
            handlers,
            fallback: Arc::new(UnknownHandler),
        }
    }

    /// Replace the handler for a node type
    pub fn register_handler(&mut self, node_type: NodeType, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(node_type, handler);
    }

    /// Execute a single node with the accumulated path context
    pub async fn execute(&self, node: &Node, context: &Context) -> Result<NodePayload> {
        tracing::debug!("🚀 Executing node '{}' (type: {})", node.id, node.node_type.as_str());
        let start = std::time::Instant::now();

        let handler = self
            .handlers
            .get(&node.node_type)
            .unwrap_or(&self.fallback);

        let result = handler.handle(node, context).await;

        match &result {
            Ok(_) => {
                tracing::debug!("✅ Node '{}' completed in {:?}", node.id, start.elapsed());
            }
            Err(e) => {
                tracing::error!("❌ Node '{}' failed in {:?}: {}", node.id, start.elapsed(), e);
            }
        }

        result
    }
}

fn as_object(value: Value) -> NodePayload {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Entry point marker; never fails, never sleeps
struct TriggerHandler;

#[async_trait]
impl NodeHandler for TriggerHandler {
    async fn handle(&self, _node: &Node, _context: &Context) -> Result<NodePayload> {
        Ok(as_object(json!({
            "triggered": true,
            "timestamp": Utc::now().to_rfc3339(),
        })))
    }
}

/// Suspends the current execution path only; concurrent runs are unaffected
struct DelayHandler;

#[async_trait]
impl NodeHandler for DelayHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        let duration_ms = node
            .config
            .get("delayMs")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_DELAY_MS);

        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        Ok(as_object(json!({
            "delayed": true,
            "duration": duration_ms,
        })))
    }
}

struct ActionHandler;

#[async_trait]
impl NodeHandler for ActionHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let action = node
            .config
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or(node.title.as_str());

        Ok(as_object(json!({
            "completed": true,
            "action": action,
        })))
    }
}

/// Yields a boolean `result`; the engine does not branch on it, downstream
/// nodes read it out of their context instead
struct ConditionHandler;

#[async_trait]
impl NodeHandler for ConditionHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let result = node
            .config
            .get("result")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Ok(as_object(json!({
            "evaluated": true,
            "result": result,
        })))
    }
}

struct DatabaseHandler;

#[async_trait]
impl NodeHandler for DatabaseHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let query = node.config.get("query").cloned().unwrap_or(Value::Null);

        Ok(as_object(json!({
            "queried": true,
            "query": query,
            "rows": [],
        })))
    }
}

struct WebhookHandler;

#[async_trait]
impl NodeHandler for WebhookHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let url = node.config.get("url").cloned().unwrap_or(Value::Null);

        Ok(as_object(json!({
            "delivered": true,
            "url": url,
        })))
    }
}

struct HttpRequestHandler;

#[async_trait]
impl NodeHandler for HttpRequestHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let url = node.config.get("url").cloned().unwrap_or(Value::Null);
        let method = node
            .config
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET");

        Ok(as_object(json!({
            "requested": true,
            "method": method,
            "url": url,
            "status": 200,
        })))
    }
}

struct EmailHandler;

#[async_trait]
impl NodeHandler for EmailHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let to = node.config.get("to").cloned().unwrap_or(Value::Null);

        Ok(as_object(json!({
            "queued": true,
            "to": to,
        })))
    }
}

struct SpreadsheetHandler;

#[async_trait]
impl NodeHandler for SpreadsheetHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
        let spreadsheet = node
            .config
            .get("spreadsheet")
            .cloned()
            .unwrap_or(Value::Null);

        Ok(as_object(json!({
            "appended": true,
            "spreadsheet": spreadsheet,
        })))
    }
}

/// Messaging-channel handler (slack/discord)
///
/// Never fails the run: a notifier failure is reported inside the payload,
/// and a missing notifier means the send is simulated.
struct MessagingHandler {
    notifiers: Arc<NotifierRegistry>,
}

#[async_trait]
impl NodeHandler for MessagingHandler {
    async fn handle(&self, node: &Node, context: &Context) -> Result<NodePayload> {
        let channel = node.node_type.as_str();
        let destination = node
            .config
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or("general");
        let message = node
            .config
            .get("message")
            .cloned()
            .unwrap_or_else(|| Value::String(node.title.clone()));

        match self.notifiers.get(channel) {
            Some(notifier) => {
                let payload = json!({
                    "message": message,
                    "context": Value::Object(context.clone()),
                });
                let outcome = notifier.send(destination, &payload).await;

                if outcome.success {
                    Ok(as_object(json!({
                        "sent": true,
                        "real": true,
                        "channel": channel,
                        "destination": destination,
                    })))
                } else {
                    tracing::warn!(
                        "⚠️ Notifier send failed for node '{}' ({}): {:?}",
                        node.id,
                        channel,
                        outcome.error
                    );
                    Ok(as_object(json!({
                        "sent": false,
                        "channel": channel,
                        "destination": destination,
                        "error": outcome.error,
                    })))
                }
            }
            None => {
                tokio::time::sleep(Duration::from_millis(STUB_LATENCY_MS)).await;
                Ok(as_object(json!({
                    "sent": true,
                    "simulated": true,
                    "channel": channel,
                    "destination": destination,
                })))
            }
        }
    }
}

/// Permissive default for node types this engine version does not know
struct UnknownHandler;

#[async_trait]
impl NodeHandler for UnknownHandler {
    async fn handle(&self, node: &Node, _context: &Context) -> Result<NodePayload> {
        tracing::warn!(
            "⚠️ No handler for node type '{}', reporting as executed",
            node.node_type.as_str()
        );
        Ok(as_object(json!({
            "executed": true,
            "type": node.node_type.as_str(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType, config: Value) -> Node {
        Node {
            id: id.to_string(),
            node_type,
            title: String::new(),
            config,
        }
    }

    fn executor() -> NodeExecutor {
        NodeExecutor::new(Arc::new(NotifierRegistry::new()))
    }

    #[tokio::test]
    async fn trigger_reports_triggered_with_timestamp() {
        let payload = executor()
            .execute(&node("t", NodeType::Trigger, Value::Null), &Context::new())
            .await
            .unwrap();
        assert_eq!(payload["triggered"], json!(true));
        assert!(payload["timestamp"].is_string());
    }

    #[tokio::test]
    async fn condition_result_defaults_true_and_honors_config() {
        let payload = executor()
            .execute(&node("c", NodeType::Condition, Value::Null), &Context::new())
            .await
            .unwrap();
        assert_eq!(payload["result"], json!(true));

        let payload = executor()
            .execute(
                &node("c", NodeType::Condition, json!({"result": false})),
                &Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(payload["result"], json!(false));
    }

    #[tokio::test]
    async fn unknown_type_is_reported_executed() {
        let payload = executor()
            .execute(
                &node("x", NodeType::Other("carrier-pigeon".into()), Value::Null),
                &Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(payload["executed"], json!(true));
        assert_eq!(payload["type"], json!("carrier-pigeon"));
    }

    #[tokio::test]
    async fn messaging_without_notifier_simulates() {
        let payload = executor()
            .execute(
                &node("m", NodeType::Slack, json!({"channel": "ops"})),
                &Context::new(),
            )
            .await
            .unwrap();
        assert_eq!(payload["sent"], json!(true));
        assert_eq!(payload["simulated"], json!(true));
        assert_eq!(payload["destination"], json!("ops"));
    }
}
