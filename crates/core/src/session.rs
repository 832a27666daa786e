//! Conversation session: the ordered, append-only turn history.
//!
//! Invariants enforced here rather than by callers:
//! - turns are only ever appended
//! - a tool-call turn is committed together with one result turn per call,
//!   in call order, so a result never appears without its call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::message::{Role, Turn};

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tool-call turn and the result turns that answer it.
#[derive(Debug, Clone, Copy)]
pub struct ToolRound<'a> {
    pub call: &'a Turn,
    pub results: &'a [Turn],
}

/// A conversation with one caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    /// Unique session ID
    pub id: SessionId,

    turns: Vec<Turn>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a new empty session.
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The ordered turn history.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append the user's prompt.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.append(Turn::user(content));
    }

    /// Append the model's final answer. The turn must not request tools.
    pub fn push_answer(&mut self, turn: Turn) -> Result<(), SessionError> {
        if turn.role != Role::Model || !turn.tool_calls.is_empty() {
            return Err(SessionError::UnexpectedRole(turn.role.to_string()));
        }
        self.append(turn);
        Ok(())
    }

    /// Commit one tool round: the model's call turn followed by its results.
    ///
    /// `results` must contain exactly one tool turn per requested call, in
    /// the order the calls were requested. Nothing is appended on error.
    pub fn commit_round(&mut self, call: Turn, results: Vec<Turn>) -> Result<(), SessionError> {
        if call.role != Role::Model {
            return Err(SessionError::CallTurnNotFromModel);
        }
        if call.tool_calls.is_empty() {
            return Err(SessionError::EmptyRound);
        }
        if call.tool_calls.len() != results.len() {
            return Err(SessionError::ResultCountMismatch {
                expected: call.tool_calls.len(),
                actual: results.len(),
            });
        }
        for (requested, result) in call.tool_calls.iter().zip(&results) {
            if result.role != Role::Tool {
                return Err(SessionError::UnexpectedRole(result.role.to_string()));
            }
            let answered = result.tool_call_id.as_deref().unwrap_or_default();
            if answered != requested.id {
                return Err(SessionError::ResultOutOfOrder {
                    expected: requested.id.clone(),
                    actual: answered.to_string(),
                });
            }
        }

        self.append(call);
        for result in results {
            self.append(result);
        }
        Ok(())
    }

    /// Replay the history as tool rounds, in commit order.
    pub fn tool_rounds(&self) -> Vec<ToolRound<'_>> {
        let mut rounds = Vec::new();
        for (i, turn) in self.turns.iter().enumerate() {
            if turn.is_tool_call() {
                let end = (i + 1 + turn.tool_calls.len()).min(self.turns.len());
                rounds.push(ToolRound {
                    call: turn,
                    results: &self.turns[i + 1..end],
                });
            }
        }
        rounds
    }

    /// Last final answer, if any.
    pub fn last_answer(&self) -> Option<&Turn> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Model && t.tool_calls.is_empty())
    }

    fn append(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }
}
