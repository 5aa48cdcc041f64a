//! Chat: question answering over the tracked intel.
//!
//! The conversation lives only in the page; each request carries the turns
//! that came before the message being sent.

use std::sync::Arc;

use serde_json::json;

use super::Page;
use crate::api::decode;
use crate::api::endpoints;
use crate::cache::Mutation;
use crate::error::ClientError;
use crate::render::Screen;
use crate::routes::Route;
use crate::state::AppState;
use crate::types::{ChatReply, ChatRole, ChatTurn};

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

pub const EXAMPLES: &[&str] = &[
    "Brief me on Cohere vs Distyl for claims",
    "Who are the key IBM Healthcare AI execs?",
    "What changed with GCP Healthcare AI this week?",
    "Which of our open deals have the highest competitive risk?",
    "What is Palantir's healthcare go-to-market?",
];

pub struct ChatPage {
    state: Arc<AppState>,
    messages: Vec<ChatTurn>,
    pending: bool,
}

impl ChatPage {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            messages: Vec::new(),
            pending: false,
        }
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Send one of the canned example questions.
    pub async fn send_example(&mut self, index: usize) -> Result<(), ClientError> {
        let text = EXAMPLES
            .get(index)
            .ok_or_else(|| ClientError::InvalidInput(format!("no example #{}", index)))?;
        self.send(text).await
    }

    /// Append the message and wait for the assistant's answer. A failed call
    /// still leaves an assistant turn (the apology) so the thread stays
    /// alternating.
    pub async fn send(&mut self, text: &str) -> Result<(), ClientError> {
        let message = text.trim();
        if message.is_empty() || self.pending {
            return Ok(());
        }
        let history = self.messages.clone();
        self.messages.push(ChatTurn {
            role: ChatRole::User,
            content: message.to_string(),
        });

        self.pending = true;
        let result = Mutation::post(
            endpoints::CHAT,
            json!({ "message": message, "history": history }),
        )
        .run(&self.state.cache)
        .await
        .and_then(|value| decode::<ChatReply>(&value));
        self.pending = false;

        match result {
            Ok(reply) => {
                self.messages.push(ChatTurn {
                    role: ChatRole::Assistant,
                    content: reply.response,
                });
                Ok(())
            }
            Err(e) => {
                log::warn!("Chat: request failed: {}", e);
                self.messages.push(ChatTurn {
                    role: ChatRole::Assistant,
                    content: APOLOGY.to_string(),
                });
                Err(e)
            }
        }
    }
}

impl Page for ChatPage {
    fn route(&self) -> Route {
        Route::Chat
    }

    fn render(&self, screen: &mut Screen) {
        screen.title("Intel Chat");
        screen.placeholder("Ask anything about competitors, deals, or market intel");
        screen.blank();

        if self.messages.is_empty() {
            screen.heading("Ask about competitive intel");
            screen.placeholder("I have access to all dossiers, signals, deals, and news.");
            for (i, example) in EXAMPLES.iter().enumerate() {
                screen.line(format!("  {}. {}", i + 1, example));
            }
        }

        for turn in &self.messages {
            let speaker = match turn.role {
                ChatRole::User => "You",
                ChatRole::Assistant => "Intel",
            };
            let mut lines = turn.content.lines();
            screen.line(format!("{}: {}", speaker, lines.next().unwrap_or("")));
            for rest in lines {
                screen.indented(2, rest);
            }
        }
        if self.pending {
            screen.placeholder("Thinking...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use crate::types::Role;

    #[tokio::test]
    async fn test_history_carries_prior_turns_only() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond_seq(
            "POST /api/chat",
            vec![
                json!({"response": "Acme leads in claims."}),
                json!({"response": "Dana Reyes is their CRO."}),
            ],
        );
        let mut page = ChatPage::new(signed_in(&backend));

        page.send("Who leads claims?").await.unwrap();
        let body = backend.last_body("POST /api/chat").unwrap();
        assert_eq!(body["message"], "Who leads claims?");
        assert_eq!(body["history"], json!([]));

        page.send("  Who runs sales there?  ").await.unwrap();
        let body = backend.last_body("POST /api/chat").unwrap();
        assert_eq!(body["message"], "Who runs sales there?");
        assert_eq!(
            body["history"],
            json!([
                {"role": "user", "content": "Who leads claims?"},
                {"role": "assistant", "content": "Acme leads in claims."}
            ])
        );
        assert_eq!(page.messages().len(), 4);

        let screen = screen_of(&page);
        assert!(screen.contains("You: Who runs sales there?"));
        assert!(screen.contains("Intel: Dana Reyes is their CRO."));
        assert!(!screen.contains("Ask about competitive intel"));
    }

    #[tokio::test]
    async fn test_failure_appends_apology() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail(
            "POST /api/chat",
            ClientError::Http {
                status: 500,
                message: "model unavailable".to_string(),
            },
        );
        let mut page = ChatPage::new(signed_in(&backend));
        assert!(page.send("Anything new?").await.is_err());
        assert!(!page.is_pending());
        let last = page.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, APOLOGY);
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored_and_viewers_may_chat() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("POST /api/chat", json!({"response": "Hi"}));
        let mut page = ChatPage::new(with_role(&backend, Role::Viewer));
        page.send("   ").await.unwrap();
        assert_eq!(backend.call_count("POST /api/chat"), 0);
        assert!(screen_of(&page).contains("1. Brief me on Cohere vs Distyl for claims"));

        page.send_example(2).await.unwrap();
        assert_eq!(
            backend.last_body("POST /api/chat").unwrap()["message"],
            EXAMPLES[2]
        );
        assert!(matches!(page.send_example(9).await, Err(ClientError::InvalidInput(_))));
    }
}
