//! The tool dispatch loop.
//!
//! One `query()` drives a session through
//! `ModelThinking -> (ToolExecuting -> ModelThinking)* -> AnsweringUser`:
//!
//! 1. Append the user's prompt
//! 2. Send policy + full history + tool definitions to the decision model
//! 3. If the model requests tools: run them concurrently, commit the call
//!    turn and its results as one round, loop back to step 2
//! 4. If the model answers: append the answer and return it
//!
//! At most `max_rounds` tool rounds run per query.

use crate::policy::routing_policy;
use futures::future::join_all;
use jobsuite_config::{DecisionConfig, OrchestratorConfig};
use jobsuite_core::error::{ProviderError, SessionError, ToolError};
use jobsuite_core::event::{DomainEvent, EventBus};
use jobsuite_core::message::{Turn, TurnToolCall};
use jobsuite_core::provider::{Provider, ProviderRequest};
use jobsuite_core::session::ConversationSession;
use jobsuite_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why a query ended without a final answer.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Decision model failed: {0}")]
    Decision(#[from] ProviderError),

    #[error("Exceeded tool-call budget of {rounds} rounds")]
    BudgetExceeded { rounds: u32 },

    #[error("Session invariant violated: {0}")]
    Session(#[from] SessionError),
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    policy: String,
    max_rounds: u32,
    max_result_chars: usize,
    tool_timeout: Duration,
    decision_timeout: Duration,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            tools,
            policy: routing_policy(None),
            max_rounds: 6,
            max_result_chars: 8000,
            tool_timeout: Duration::from_secs(30),
            decision_timeout: Duration::from_secs(60),
            event_bus,
        }
    }

    /// Build from the `[decision]` and `[orchestrator]` config sections.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
        decision: &DecisionConfig,
        orchestrator: &OrchestratorConfig,
    ) -> Self {
        Self::new(provider, &decision.model, tools, event_bus)
            .with_temperature(decision.temperature)
            .with_max_tokens(decision.max_tokens)
            .with_decision_timeout(Duration::from_secs(decision.timeout_secs))
            .with_policy(routing_policy(orchestrator.required_schema.as_deref()))
            .with_max_rounds(orchestrator.max_tool_rounds)
            .with_max_result_chars(orchestrator.max_result_chars)
            .with_tool_timeout(Duration::from_secs(orchestrator.tool_timeout_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the routing policy sent as the system text.
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Maximum tool rounds per query. Clamped to at least one.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn with_max_result_chars(mut self, max: usize) -> Self {
        self.max_result_chars = max.max(1);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    /// Answer `prompt` within `session`.
    ///
    /// On error the session keeps every turn committed so far: the user turn
    /// and all complete tool rounds. A partial round is never committed.
    pub async fn query(
        &self,
        session: &mut ConversationSession,
        prompt: &str,
    ) -> Result<String, OrchestratorError> {
        let session_id = session.id.to_string();
        info!(session_id = %session_id, turns = session.len(), "Processing prompt");

        self.event_bus.publish(DomainEvent::PromptReceived {
            session_id: session_id.clone(),
            content_preview: prompt.chars().take(80).collect(),
            timestamp: chrono::Utc::now(),
        });
        session.push_user(prompt);

        let definitions = self.tools.definitions();
        let mut rounds = 0u32;

        loop {
            debug!(session_id = %session_id, round = rounds, "Consulting decision model");

            let request = ProviderRequest {
                model: self.model.clone(),
                system: self.policy.clone(),
                turns: session.turns().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: definitions.clone(),
            };

            let response = match tokio::time::timeout(
                self.decision_timeout,
                self.provider.complete(request),
            )
            .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(self.decision_failed(&session_id, e)),
                Err(_) => {
                    let e = ProviderError::Timeout(format!(
                        "no response within {}s",
                        self.decision_timeout.as_secs()
                    ));
                    return Err(self.decision_failed(&session_id, e));
                }
            };

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    session_id: session_id.clone(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: chrono::Utc::now(),
                });
            }

            let turn = response.turn;
            if turn.tool_calls.is_empty() {
                let text = turn.content.clone();
                session.push_answer(turn)?;
                info!(session_id = %session_id, rounds, "Answered");
                return Ok(text);
            }

            if rounds >= self.max_rounds {
                warn!(
                    session_id = %session_id,
                    rounds,
                    requested = turn.tool_calls.len(),
                    "Tool-call budget exhausted"
                );
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("session {session_id}"),
                    error_message: format!("tool-call budget of {rounds} rounds exhausted"),
                    timestamp: chrono::Utc::now(),
                });
                return Err(OrchestratorError::BudgetExceeded { rounds });
            }
            rounds += 1;

            debug!(
                session_id = %session_id,
                round = rounds,
                tool_count = turn.tool_calls.len(),
                "Executing tool calls"
            );

            let results = join_all(
                turn.tool_calls
                    .iter()
                    .map(|tc| self.dispatch(&session_id, rounds, tc)),
            )
            .await;

            session.commit_round(turn, results)?;
        }
    }

    fn decision_failed(&self, session_id: &str, e: ProviderError) -> OrchestratorError {
        warn!(session_id = %session_id, error = %e, "Decision model failed");
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: format!("session {session_id}"),
            error_message: e.to_string(),
            timestamp: chrono::Utc::now(),
        });
        OrchestratorError::Decision(e)
    }

    /// Run one requested call and turn its outcome into a result turn.
    ///
    /// Every failure becomes text the model can read.
    async fn dispatch(&self, session_id: &str, round: u32, tc: &TurnToolCall) -> Turn {
        let start = Instant::now();

        let (success, output) = match parse_arguments(&tc.arguments) {
            Err(e) => (false, format!("Error: invalid arguments for {}: {e}", tc.name)),
            Ok(arguments) => {
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments,
                };
                match tokio::time::timeout(self.tool_timeout, self.tools.execute(&call)).await {
                    Ok(Ok(result)) => (result.success, result.output),
                    Ok(Err(e)) => (false, format!("Error: {e}")),
                    Err(_) => {
                        let e = ToolError::Timeout {
                            tool_name: tc.name.clone(),
                            timeout_secs: self.tool_timeout.as_secs(),
                        };
                        (false, format!("Error: {e}"))
                    }
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        if success {
            debug!(session_id = %session_id, round, tool = %tc.name, duration_ms, "Tool succeeded");
        } else {
            warn!(session_id = %session_id, round, tool = %tc.name, duration_ms, "Tool reported an error");
        }
        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: tc.name.clone(),
            success,
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        Turn::tool_result(&tc.id, truncate(&output, self.max_result_chars))
    }
}

fn parse_arguments(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
}

/// Cap `text` at `max_chars` characters, marking what was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => {
            let dropped = text[cut..].chars().count();
            format!("{}\n... [truncated {dropped} characters]", &text[..cut])
        }
    }
}
