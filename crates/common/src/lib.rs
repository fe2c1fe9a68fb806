// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the chat clients and the server.
//! This module defines the account form records and the hub frame protocol.

use serde::{Deserialize, Serialize};

/// Registration form posted to the account endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationRequest {
    /// Email address, doubles as the user name
    #[serde(default)]
    pub email: String,
    /// Plain-text password
    #[serde(default)]
    pub password: String,
    /// Must equal `password`
    #[serde(default)]
    pub confirm_password: String,
}

/// Login form posted to the account endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Keep the session cookie across browser restarts
    #[serde(default)]
    pub remember_me: bool,
    /// Where to go after a successful login
    #[serde(default)]
    pub return_url: Option<String>,
}

/// A chat line as it travels through the hub. Never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Display name of the sender
    pub user: String,
    /// Message body
    pub message: String,
}

impl ChatMessage {
    pub fn new(user: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            message: message.into(),
        }
    }

    /// Positional arguments in the order the hub methods take them
    pub fn into_arguments(self) -> Vec<serde_json::Value> {
        vec![
            serde_json::Value::String(self.user),
            serde_json::Value::String(self.message),
        ]
    }
}

/// Frames sent from client to server over `/chathub`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType")]
pub enum ClientToServer {
    /// Invoke a hub method
    /// # Fields
    /// * `invocation_id` - Optional id echoed back in the completion frame
    /// * `target` - Hub method name, e.g. `SendMessage`
    /// * `arguments` - Positional arguments
    Invocation {
        #[serde(rename = "invocationId", default)]
        invocation_id: Option<String>,
        target: String,
        #[serde(default)]
        arguments: Vec<serde_json::Value>,
    },
    /// Keep-alive
    Ping,
}

/// Frames sent from server to client over `/chathub`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType")]
pub enum ServerToClient {
    /// Server-to-client method call, e.g. `ReceiveMessage`
    Invocation {
        target: String,
        arguments: Vec<serde_json::Value>,
    },
    /// Result of a client invocation, sent only to the caller
    Completion {
        #[serde(rename = "invocationId")]
        invocation_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
    /// Reply to `Ping`
    Pong,
    /// Error response for frames that are not valid JSON
    MalformedMessage {
        #[serde(rename = "errMsg")]
        err_msg: String,
    },
}
