// ============================
// crates/backend-lib/src/hub/mod.rs
// ============================
//! Chat broadcast hub.
//!
//! The hub relays every chat line to all connected clients by invoking
//! `ReceiveMessage` on them. It never stores messages and never changes
//! the text. Delivery itself is left to a [`HubClients`] implementation,
//! by default the [`ConnectionRegistry`] that tracks live `/chathub` sockets.

pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use authchat_common::ChatMessage;
use metrics::counter;
use serde_json::Value;
use thiserror::Error;

use crate::metrics::HUB_MESSAGES;

pub use registry::ConnectionRegistry;

/// Client-side method invoked for every broadcast chat line
pub const RECEIVE_MESSAGE: &str = "ReceiveMessage";
/// Hub method clients invoke to post a chat line
pub const SEND_MESSAGE: &str = "SendMessage";

/// The "all connected clients" broadcast target
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HubClients: Send + Sync {
    /// Invoke `method` on every connected client with the given positional arguments
    async fn send_all(&self, method: &str, arguments: Vec<Value>);
}

/// Reasons a client invocation is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Method does not exist: {0}")]
    UnknownMethod(String),

    #[error("Invalid arguments for {method}: {reason}")]
    InvalidArguments { method: String, reason: String },
}

pub struct ChatHub {
    clients: Arc<dyn HubClients>,
}

impl ChatHub {
    pub fn new(clients: Arc<dyn HubClients>) -> Self {
        Self { clients }
    }

    /// Broadcast one chat line to every connected client, sender included.
    pub async fn send_message(&self, user: &str, message: &str) {
        counter!(HUB_MESSAGES).increment(1);
        tracing::debug!(user, len = message.len(), "broadcasting chat message");
        self.clients
            .send_all(RECEIVE_MESSAGE, ChatMessage::new(user, message).into_arguments())
            .await;
    }

    /// Dispatch a client invocation by method name.
    pub async fn invoke(&self, target: &str, arguments: Vec<Value>) -> Result<(), HubError> {
        match target {
            SEND_MESSAGE => {
                let (user, message) = string_pair(target, &arguments)?;
                self.send_message(user, message).await;
                Ok(())
            },
            other => Err(HubError::UnknownMethod(other.to_string())),
        }
    }
}

fn string_pair<'a>(method: &str, arguments: &'a [Value]) -> Result<(&'a str, &'a str), HubError> {
    let invalid = |reason: String| HubError::InvalidArguments {
        method: method.to_string(),
        reason,
    };

    match arguments {
        [Value::String(user), Value::String(message)] => Ok((user.as_str(), message.as_str())),
        [_, _] => Err(invalid("arguments must be strings".to_string())),
        other => Err(invalid(format!("expected 2 arguments, got {}", other.len()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use serde_json::json;

    #[tokio::test]
    async fn send_message_broadcasts_receive_message() {
        let mut clients = MockHubClients::new();
        clients
            .expect_send_all()
            .with(eq(RECEIVE_MESSAGE), eq(vec![json!("TestUser"), json!("TestMessage")]))
            .times(1)
            .returning(|_, _| ());

        let hub = ChatHub::new(Arc::new(clients));
        hub.send_message("TestUser", "TestMessage").await;
    }

    #[tokio::test]
    async fn send_message_passes_text_through_untouched() {
        let mut clients = MockHubClients::new();
        clients
            .expect_send_all()
            .with(eq(RECEIVE_MESSAGE), eq(vec![json!(""), json!("  <b>hi</b>  ")]))
            .times(1)
            .returning(|_, _| ());

        ChatHub::new(Arc::new(clients))
            .send_message("", "  <b>hi</b>  ")
            .await;
    }

    #[tokio::test]
    async fn invoke_send_message() {
        let mut clients = MockHubClients::new();
        clients
            .expect_send_all()
            .with(eq(RECEIVE_MESSAGE), eq(vec![json!("a@a.a"), json!("hello")]))
            .times(1)
            .returning(|_, _| ());

        let hub = ChatHub::new(Arc::new(clients));
        assert_eq!(
            hub.invoke(SEND_MESSAGE, vec![json!("a@a.a"), json!("hello")]).await,
            Ok(())
        );
    }

    #[tokio::test]
    async fn invoke_rejects_unknown_method_and_bad_arguments() {
        let mut clients = MockHubClients::new();
        clients.expect_send_all().never();
        let hub = ChatHub::new(Arc::new(clients));

        assert_eq!(
            hub.invoke("SendPrivate", vec![json!("a"), json!("b")]).await,
            Err(HubError::UnknownMethod("SendPrivate".to_string()))
        );
        assert!(matches!(
            hub.invoke(SEND_MESSAGE, vec![json!("only-user")]).await,
            Err(HubError::InvalidArguments { .. })
        ));
        assert!(matches!(
            hub.invoke(SEND_MESSAGE, vec![json!("user"), json!(42)]).await,
            Err(HubError::InvalidArguments { .. })
        ));
    }
}
