//! Conversational front end over [`ChatClient`].
//!
//! Relay failures never escape as errors here: the user gets a fixed
//! apology and the session stays usable.

use tracing::warn;

use crate::chat::client::ChatClient;
use crate::chat::context::ChatRequest;
use crate::chat::session::{ChatTurn, SessionId, SessionStore, Speaker};
use crate::data::summary::Summary;
use crate::domain::{FitResult, Row};

pub const FALLBACK_REPLY: &str =
    "Sorry, the assistant is unavailable right now. Your data and fit results are unaffected; please try again.";

/// Dataset context attached to a question. All parts are optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatContext<'a> {
    pub rows: Option<&'a [Row]>,
    pub fit: Option<&'a FitResult>,
    pub summary: Option<&'a Summary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    /// Set when the relay failed and `text` is the fallback message.
    pub error: Option<String>,
}

impl AssistantReply {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

pub struct Assistant {
    client: ChatClient,
    session: SessionId,
    store: SessionStore,
}

impl Assistant {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            session: SessionId::generate(),
            store: SessionStore::default(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    /// Drop the current conversation and start a fresh one.
    pub fn new_session(&mut self) -> &SessionId {
        self.store.remove(&self.session);
        self.session = SessionId::generate();
        &self.session
    }

    pub fn ask(&mut self, text: &str, ctx: ChatContext<'_>) -> AssistantReply {
        self.store
            .append(&self.session, ChatTurn::new(Speaker::User, text));

        let mut request = ChatRequest::question(text, self.session.as_str());
        if let Some(rows) = ctx.rows {
            request = request.with_rows(rows, self.client.config().sample_rows);
        }
        if let Some(fit) = ctx.fit {
            request = request.with_fit(fit);
        }
        if let Some(summary) = ctx.summary {
            request = request.with_summary(summary);
        }

        let reply = match self.client.send(&request) {
            Ok(text) => AssistantReply { text, error: None },
            Err(e) => {
                warn!(session = %self.session, error = %e, "chat relay failed");
                AssistantReply {
                    text: FALLBACK_REPLY.to_string(),
                    error: Some(e.to_string()),
                }
            }
        };

        self.store
            .append(&self.session, ChatTurn::new(Speaker::Assistant, reply.text.clone()));
        reply
    }

    /// Turns of the current session, oldest first.
    pub fn history(&mut self) -> Vec<ChatTurn> {
        self.store.history(&self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::client::ChatConfig;

    fn offline() -> Assistant {
        Assistant::new(ChatClient::new(ChatConfig::new("http://127.0.0.1:9/api/chat")))
    }

    #[test]
    fn relay_failure_yields_fallback_and_keeps_history() {
        let mut assistant = offline();
        let reply = assistant.ask("what is delta?", ChatContext::default());

        assert!(reply.is_fallback());
        assert_eq!(reply.text, FALLBACK_REPLY);

        let history = assistant.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].speaker, Speaker::User);
        assert_eq!(history[0].text, "what is delta?");
        assert_eq!(history[1].speaker, Speaker::Assistant);
    }

    #[test]
    fn new_session_clears_history() {
        let mut assistant = offline();
        assistant.ask("hello", ChatContext::default());
        let before = assistant.session_id().clone();

        let after = assistant.new_session().clone();
        assert_ne!(before, after);
        assert!(assistant.history().is_empty());
    }
}
