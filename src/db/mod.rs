mod memory;
mod postgres;

pub use memory::MemoryBackend;
pub use postgres::Database;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::models::{ClientDraft, Entity, ProjectDraft};

/// Everything the dashboard needs from the hosted backend.
///
/// Implementations are injected into the synchronized lists, so tests can
/// swap the database for [`MemoryBackend`].
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// All rows of `T`'s table owned by `owner`, newest first
    async fn fetch_all<T: Entity>(&self, owner: Uuid) -> Result<Vec<T>>;

    async fn insert_client(&self, owner: Uuid, draft: &ClientDraft) -> Result<Uuid>;

    async fn update_client(&self, id: Uuid, draft: &ClientDraft) -> Result<()>;

    async fn insert_project(&self, owner: Uuid, draft: &ProjectDraft) -> Result<Uuid>;

    async fn update_project(&self, id: Uuid, draft: &ProjectDraft) -> Result<()>;

    async fn delete<T: Entity>(&self, id: Uuid) -> Result<()>;

    /// Open a named change-feed channel for one table
    async fn subscribe(&self, name: &str, table: &'static str) -> Result<Channel>;

    /// Release a channel. Taking it by value means it is released once.
    async fn remove_channel(&self, channel: Channel);
}

/// A live change-feed subscription.
///
/// Yields raw notification payloads in the order the backend emitted them.
#[derive(Debug)]
pub struct Channel {
    id: u64,
    name: String,
    table: &'static str,
    events: mpsc::UnboundedReceiver<String>,
    listener: Option<JoinHandle<()>>,
}

impl Channel {
    pub(crate) fn new(
        id: u64,
        name: &str,
        table: &'static str,
        events: mpsc::UnboundedReceiver<String>,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            table,
            events,
            listener,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Next payload, or `None` once the feed has closed. Cancel safe.
    pub async fn recv(&mut self) -> Option<String> {
        self.events.recv().await
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> Result<Database> {
    Database::new(config).await
}
