//! Chat relay integration: wire payloads, HTTP client, sessions.

pub mod assistant;
pub mod client;
pub mod context;
pub mod session;

pub use assistant::{Assistant, AssistantReply, ChatContext, FALLBACK_REPLY};
pub use client::{ChatClient, ChatConfig, Health};
pub use context::{ChatRequest, FitSummary};
pub use session::{ChatTurn, SessionId, SessionStore, Speaker};
