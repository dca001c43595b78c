//! Connected page contexts.
//!
//! Each client owns the receiving half of an unbounded channel. The worker
//! claims clients on activation and broadcasts outbound messages to them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

pub type ClientId = u64;

/// Messages pushed from the worker to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// Ask pages to flush bookmarks, progress and analytics.
    SyncData { timestamp: i64 },
}

struct ClientHandle {
    controller: Option<String>,
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

/// Registry of open page contexts, shared by every worker version.
#[derive(Clone, Default)]
pub struct Clients {
    inner: Arc<RwLock<HashMap<ClientId, ClientHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page. It starts uncontrolled until a worker claims it.
    pub async fn connect(&self) -> (ClientId, mpsc::UnboundedReceiver<OutboundMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .write()
            .await
            .insert(id, ClientHandle { controller: None, tx });
        (id, rx)
    }

    pub async fn disconnect(&self, id: ClientId) {
        self.inner.write().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Version of the worker controlling a client, if any.
    pub async fn controller(&self, id: ClientId) -> Option<String> {
        self.inner
            .read()
            .await
            .get(&id)
            .and_then(|client| client.controller.clone())
    }

    /// Put every connected client under `version`. Returns how many were claimed.
    pub async fn claim(&self, version: &str) -> usize {
        let mut clients = self.inner.write().await;
        for client in clients.values_mut() {
            client.controller = Some(version.to_string());
        }
        clients.len()
    }

    /// Send to every client, forgetting those whose receiver is gone.
    /// Returns how many received the message.
    pub async fn broadcast(&self, message: OutboundMessage) -> usize {
        let mut clients = self.inner.write().await;
        clients.retain(|id, client| match client.tx.send(message.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(client = id, "dropping closed client");
                false
            }
        });
        clients.len()
    }
}
