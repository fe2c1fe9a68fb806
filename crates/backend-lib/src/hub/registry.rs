//! Live `/chathub` connections and broadcast delivery to them.
use async_trait::async_trait;
use authchat_common::ServerToClient;
use dashmap::DashMap;
use metrics::counter;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::HubClients;
use crate::metrics::HUB_DELIVERY_FAILED;

/// Outbound channel of every connected hub client, keyed by connection id
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: DashMap<Uuid, mpsc::Sender<ServerToClient>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, returning its id
    pub fn register(&self, tx: mpsc::Sender<ServerToClient>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        tracing::debug!(connection_id = %id, "hub client registered");
        id
    }

    pub fn unregister(&self, id: &Uuid) {
        if self.clients.remove(id).is_some() {
            tracing::debug!(connection_id = %id, "hub client unregistered");
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl HubClients for ConnectionRegistry {
    async fn send_all(&self, method: &str, arguments: Vec<Value>) {
        let frame = ServerToClient::Invocation {
            target: method.to_string(),
            arguments,
        };

        // Snapshot first so no map shard lock is held while sending
        let targets: Vec<(Uuid, mpsc::Sender<ServerToClient>)> = self
            .clients
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut failed = 0u64;
        for (id, tx) in targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => {},
                Err(TrySendError::Full(_)) => {
                    failed += 1;
                    tracing::warn!(connection_id = %id, "hub client buffer full, message dropped");
                },
                Err(TrySendError::Closed(_)) => {
                    failed += 1;
                    self.clients.remove(&id);
                    tracing::debug!(connection_id = %id, "dropping closed hub client");
                },
            }
        }

        if failed > 0 {
            counter!(HUB_DELIVERY_FAILED).increment(failed);
            tracing::warn!(failed, method, "some hub clients did not receive the invocation");
        }
    }
}
