//! The tool dispatch orchestrator: the heart of jobsuite.
//!
//! A query follows a **Think → Act → Observe** cycle:
//!
//! 1. **Receive** a prompt for a session
//! 2. **Send** the routing policy, the session history and the tool
//!    definitions to the decision model
//! 3. **If tool calls**: run them, commit the round, loop back to step 2
//! 4. **If text**: append the answer and return it
//!
//! The loop stops at the configured number of tool rounds.

pub mod orchestrator;
pub mod policy;
pub mod session;

pub use orchestrator::{Orchestrator, OrchestratorError};
pub use policy::routing_policy;
pub use session::{ChatResponse, ChatService, Outcome, SessionStore};
