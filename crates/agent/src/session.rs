//! Session store and the chat boundary.
//!
//! Each session sits behind its own async mutex: queries against one session
//! run one at a time, different sessions run in parallel.

use crate::orchestrator::{Orchestrator, OrchestratorError};
use jobsuite_core::session::{ConversationSession, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct Entry {
    session: Arc<Mutex<ConversationSession>>,
    last_used: Instant,
}

/// In-process sessions keyed by ID.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Fetch a session, creating it on first contact.
    pub async fn get_or_create(&self, id: &SessionId) -> Arc<Mutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.entry(id.clone()).or_insert_with(|| {
            debug!(session_id = %id, "Creating session");
            Entry {
                session: Arc::new(Mutex::new(ConversationSession::new(id.clone()))),
                last_used: Instant::now(),
            }
        });
        entry.last_used = Instant::now();
        entry.session.clone()
    }

    /// Drop a session. Returns whether it existed.
    pub async fn close(&self, id: &SessionId) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session closed");
        }
        removed
    }

    /// Drop sessions idle longer than the TTL. Sessions with a query in
    /// flight are kept. Returns how many were dropped.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = entry.last_used.elapsed() >= self.ttl;
            let busy = entry.session.try_lock().is_err();
            let keep = !idle || busy;
            if !keep {
                debug!(session_id = %id, "Evicting idle session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// How a chat query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    BudgetExceeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub outcome: Outcome,
}

/// `query(session_id, prompt) -> text`, the boundary callers use.
///
/// Callers always get text back; `outcome` tells an answer apart from a
/// budget stop or a failure.
pub struct ChatService {
    orchestrator: Arc<Orchestrator>,
    sessions: Arc<SessionStore>,
}

impl ChatService {
    pub fn new(orchestrator: Arc<Orchestrator>, sessions: Arc<SessionStore>) -> Self {
        Self {
            orchestrator,
            sessions,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn query(&self, session_id: &SessionId, prompt: &str) -> ChatResponse {
        let handle = self.sessions.get_or_create(session_id).await;
        let mut session = handle.lock().await;

        match self.orchestrator.query(&mut session, prompt).await {
            Ok(text) => ChatResponse {
                text,
                outcome: Outcome::Answered,
            },
            Err(OrchestratorError::BudgetExceeded { rounds }) => ChatResponse {
                text: format!(
                    "Exceeded tool-call budget of {rounds} rounds without reaching a final answer. \
                     Please narrow the question and try again."
                ),
                outcome: Outcome::BudgetExceeded,
            },
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Query failed");
                ChatResponse {
                    text: format!("An error occurred while communicating with the agent: {e}"),
                    outcome: Outcome::Failed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jobsuite_core::error::ProviderError;
    use jobsuite_core::event::EventBus;
    use jobsuite_core::error::ToolError;
    use jobsuite_core::message::{Role, Turn, TurnToolCall};
    use jobsuite_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use jobsuite_core::tool::{Tool, ToolRegistry, ToolResult};

    /// Answers with the number of turns it was shown, after a delay.
    struct CountingProvider {
        delay_ms: u64,
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(ProviderResponse {
                turn: Turn::model(format!("saw {}", request.turns.len())),
                usage: None,
                model: "m".into(),
            })
        }
    }

    /// Always asks for a tool that does not exist.
    struct LoopingProvider;

    #[async_trait]
    impl Provider for LoopingProvider {
        fn name(&self) -> &str {
            "looping"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                turn: Turn::model_tool_calls(
                    "",
                    vec![TurnToolCall {
                        id: "c".into(),
                        name: "missing".into(),
                        arguments: "{}".into(),
                    }],
                ),
                usage: None,
                model: "m".into(),
            })
        }
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::AuthenticationFailed("bad key".into()))
        }
    }

    /// Calls `slow_lookup` once, then answers after seeing its result.
    struct LookupProvider;

    #[async_trait]
    impl Provider for LookupProvider {
        fn name(&self) -> &str {
            "lookup"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let turn = match request.turns.last() {
                Some(last) if last.role == Role::Tool => Turn::model(format!("found {}", last.content)),
                _ => Turn::model_tool_calls(
                    "",
                    vec![TurnToolCall {
                        id: "lookup-1".into(),
                        name: "slow_lookup".into(),
                        arguments: "{}".into(),
                    }],
                ),
            };
            Ok(ProviderResponse {
                turn,
                usage: None,
                model: "m".into(),
            })
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl Tool for SlowLookup {
        fn name(&self) -> &str {
            "slow_lookup"
        }
        fn description(&self) -> &str {
            "slow"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::ok("job 7"))
        }
    }

    fn service(provider: Arc<dyn Provider>) -> ChatService {
        let orchestrator = Orchestrator::new(
            provider,
            "m",
            Arc::new(ToolRegistry::new()),
            Arc::new(EventBus::new(16)),
        )
        .with_max_rounds(1);
        ChatService::new(
            Arc::new(orchestrator),
            Arc::new(SessionStore::new(Duration::from_secs(60))),
        )
    }

    #[tokio::test]
    async fn history_accumulates_per_session() {
        let chat = service(Arc::new(CountingProvider { delay_ms: 0 }));
        let a = SessionId::from("a");
        let b = SessionId::from("b");

        assert_eq!(chat.query(&a, "one").await.text, "saw 1");
        assert_eq!(chat.query(&a, "two").await.text, "saw 3");
        assert_eq!(chat.query(&b, "one").await.text, "saw 1");
        assert_eq!(chat.sessions().len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn same_session_queries_are_serialized() {
        let chat = Arc::new(service(Arc::new(CountingProvider { delay_ms: 100 })));
        let id = SessionId::from("shared");

        let first = tokio::spawn({
            let chat = chat.clone();
            let id = id.clone();
            async move { chat.query(&id, "first").await.text }
        });
        let second = tokio::spawn({
            let chat = chat.clone();
            let id = id.clone();
            async move { chat.query(&id, "second").await.text }
        });

        let mut seen = vec![first.await.unwrap(), second.await.unwrap()];
        seen.sort();
        // Whichever ran second saw the first query's prompt and answer.
        assert_eq!(seen, vec!["saw 1", "saw 3"]);

        let handle = chat.sessions().get_or_create(&id).await;
        assert_eq!(handle.lock().await.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_query_keeps_last_committed_state() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowLookup));
        let orchestrator = Orchestrator::new(
            Arc::new(LookupProvider),
            "m",
            Arc::new(registry),
            Arc::new(EventBus::new(16)),
        );
        let chat = ChatService::new(
            Arc::new(orchestrator),
            Arc::new(SessionStore::new(Duration::from_secs(60))),
        );
        let id = SessionId::from("cancelled");

        // Abandon the query while the tool is still running
        let abandoned = tokio::time::timeout(Duration::from_secs(1), chat.query(&id, "find job 7")).await;
        assert!(abandoned.is_err());

        let handle = chat.sessions().get_or_create(&id).await;
        {
            let session = handle.lock().await;
            let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
            assert_eq!(roles, vec![Role::User]);
            assert_eq!(session.turns()[0].content, "find job 7");
            assert!(session.tool_rounds().is_empty());
        }

        // The session lock was released and the next query completes
        let response = chat.query(&id, "find job 7 again").await;
        assert_eq!(response.outcome, Outcome::Answered);
        assert_eq!(response.text, "found job 7");

        let session = handle.lock().await;
        let roles: Vec<Role> = session.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Model, Role::Tool, Role::Model]);
    }

    #[tokio::test]
    async fn budget_outcome() {
        let chat = service(Arc::new(LoopingProvider));
        let response = chat.query(&SessionId::from("s"), "loop").await;
        assert_eq!(response.outcome, Outcome::BudgetExceeded);
        assert!(response.text.starts_with("Exceeded tool-call budget of 1 rounds"));
    }

    #[tokio::test]
    async fn failure_outcome() {
        let chat = service(Arc::new(DownProvider));
        let response = chat.query(&SessionId::from("s"), "hi").await;
        assert_eq!(response.outcome, Outcome::Failed);
        assert!(response.text.starts_with("An error occurred while communicating with the agent: "));
        assert!(response.text.contains("bad key"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_evicted() {
        let store = SessionStore::new(Duration::from_secs(60));
        let idle = SessionId::from("idle");
        let busy = SessionId::from("busy");
        store.get_or_create(&idle).await;
        let busy_handle = store.get_or_create(&busy).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        let _guard = busy_handle.lock().await;

        assert_eq!(store.evict_idle().await, 1);
        assert!(!store.contains(&idle).await);
        assert!(store.contains(&busy).await);
    }

    #[tokio::test(start_paused = true)]
    async fn recent_sessions_survive_eviction() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = SessionId::from("s");
        store.get_or_create(&id).await;
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.evict_idle().await, 0);
        assert!(store.contains(&id).await);
    }

    #[tokio::test]
    async fn close_removes() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = SessionId::from("s");
        store.get_or_create(&id).await;
        assert!(store.close(&id).await);
        assert!(!store.close(&id).await);
        assert!(store.is_empty().await);
    }
}
