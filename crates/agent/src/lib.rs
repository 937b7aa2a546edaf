//! Agent Runtime - canned-reply generation and turn orchestration
//!
//! This crate drives one TokenizeAI conversation turn at a time:
//! - Picks a reply template from an ordered keyword rule table (`responder`)
//! - Keeps caller-owned session history (`conversation`)
//! - Extracts cards, choices and documents from the reply markup (`runtime`)
//!
//! # Architecture
//!
//! 1. **Generation** (`llm`) - `ResponseGenerator` produces raw annotated text
//! 2. **Keyword dispatch** (`responder`) - first matching rule wins
//! 3. **Extraction** - `tokenize_core::markup` turns markup into typed records
//! 4. **Fallback** - any failure yields the fixed apology reply
//!
//! # Key Types
//!
//! - `AgentRuntime` - turn orchestrator (see `runtime` module)
//! - `KeywordResponder` - the in-process rule table
//! - `Conversation` - session history and current step

pub mod conversation;
pub mod llm;
pub mod responder;
pub mod runtime;

pub use conversation::{Conversation, ConversationEntry, Speaker};
pub use llm::ResponseGenerator;
pub use responder::{CompanyDetails, KeywordResponder, ResponseRule, RuleMatch};
pub use runtime::AgentRuntime;
