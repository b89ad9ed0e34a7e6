use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::event::ChangeEvent;
use super::store::{Applied, FetchOutcome, FetchTicket, ListOrder, ListStatus, ListStore};
use crate::db::{Backend, Channel};
use crate::error::{DashboardError, Result};
use crate::models::Entity;

/// What one call to [`LiveList::next`] did to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncUpdate {
    /// A snapshot was installed
    Loaded { count: usize, replayed: usize },
    FetchFailed(String),
    /// A change notification was applied
    Changed(Applied),
    /// A notification arrived but the list did not change
    Unchanged,
    /// An unrecognized notification triggered a full reload
    Resync,
    /// A fetch result arrived for a ticket that is no longer current
    StaleFetch,
    /// The backend closed the change feed
    FeedClosed,
}

struct PendingFetch<T> {
    ticket: FetchTicket,
    handle: JoinHandle<Result<Vec<T>>>,
}

enum Wake<T> {
    Fetched(std::result::Result<Result<Vec<T>>, JoinError>),
    Feed(Option<String>),
}

/// A table mirror kept current by an initial fetch plus the change feed.
///
/// Nothing happens in the background: the owner drives the list by awaiting
/// [`next`](Self::next), typically inside a `tokio::select!` next to terminal
/// input. `next` is cancel safe.
pub struct LiveList<T: Entity, B: Backend> {
    backend: Arc<B>,
    owner: Uuid,
    channel_name: String,
    store: ListStore<T>,
    channel: Option<Channel>,
    fetch: Option<PendingFetch<T>>,
}

impl<T: Entity, B: Backend> LiveList<T, B> {
    /// Subscribe to `T`'s table and start the initial fetch.
    ///
    /// The subscription is opened first so no change made during the fetch
    /// is missed.
    pub async fn open(
        backend: Arc<B>,
        owner: Uuid,
        channel_name: &str,
        order: ListOrder<T>,
    ) -> Result<Self> {
        let channel = backend.subscribe(channel_name, T::TABLE).await?;

        let mut list = Self {
            backend,
            owner,
            channel_name: channel_name.to_string(),
            store: ListStore::new(order),
            channel: Some(channel),
            fetch: None,
        };
        list.refetch();

        Ok(list)
    }

    pub fn items(&self) -> &[T] {
        self.store.items()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.store.get(id)
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn status(&self) -> ListStatus {
        self.store.status()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.store.last_error()
    }

    /// Start a full reload. Returns false once the list is torn down.
    pub fn refetch(&mut self) -> bool {
        let Some(ticket) = self.store.begin_fetch() else {
            return false;
        };

        let backend = Arc::clone(&self.backend);
        let owner = self.owner;
        let handle = tokio::spawn(async move { backend.fetch_all::<T>(owner).await });

        // A replaced fetch keeps running detached; its ticket is already stale
        self.fetch = Some(PendingFetch { ticket, handle });
        debug!(table = T::TABLE, ?ticket, "fetch started");
        true
    }

    /// Reopen the change feed if the backend closed it, then start a full
    /// reload. Returns false once the list is torn down.
    pub async fn reload(&mut self) -> Result<bool> {
        if self.store.status() == ListStatus::Unsubscribed {
            return Ok(false);
        }

        if self.channel.is_none() {
            let channel = self.backend.subscribe(&self.channel_name, T::TABLE).await?;
            info!(table = T::TABLE, "change feed reopened");
            self.channel = Some(channel);
        }

        Ok(self.refetch())
    }

    /// Whether the list is still subscribed to the change feed
    pub fn is_live(&self) -> bool {
        self.channel.is_some()
    }

    /// Delete a row on the backend.
    ///
    /// The list itself only changes when the delete notification arrives.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.backend.delete::<T>(id).await
    }

    /// Wait for the next fetch result or notification and apply it.
    ///
    /// Returns `None` once the list is unsubscribed or has nothing left to
    /// wait for.
    pub async fn next(&mut self) -> Option<SyncUpdate> {
        if self.store.status() == ListStatus::Unsubscribed {
            return None;
        }
        if self.fetch.is_none() && self.channel.is_none() {
            return None;
        }

        let wake = {
            let fetch = &mut self.fetch;
            let channel = &mut self.channel;

            let fetched = async move {
                match fetch {
                    Some(pending) => (&mut pending.handle).await,
                    None => std::future::pending().await,
                }
            };
            let feed = async move {
                match channel {
                    Some(channel) => channel.recv().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                joined = fetched => Wake::Fetched(joined),
                payload = feed => Wake::Feed(payload),
            }
        };

        Some(match wake {
            Wake::Fetched(joined) => self.finish_fetch(joined),
            Wake::Feed(Some(payload)) => self.apply_payload(&payload),
            Wake::Feed(None) => {
                warn!(table = T::TABLE, "change feed closed");
                self.channel = None;
                SyncUpdate::FeedClosed
            }
        })
    }

    /// Tear the list down: release the channel and ignore any fetch still in
    /// flight. Calling it again does nothing.
    pub async fn unsubscribe(&mut self) {
        if !self.store.close() {
            return;
        }

        // Dropping the handle detaches the task; its result is never applied
        self.fetch = None;

        if let Some(channel) = self.channel.take() {
            self.backend.remove_channel(channel).await;
        }
        info!(table = T::TABLE, "list unsubscribed");
    }

    fn finish_fetch(&mut self, joined: std::result::Result<Result<Vec<T>>, JoinError>) -> SyncUpdate {
        let Some(pending) = self.fetch.take() else {
            return SyncUpdate::StaleFetch;
        };
        let result = joined.unwrap_or_else(|err| Err(DashboardError::from(err)));

        match self.store.complete_fetch(pending.ticket, result) {
            FetchOutcome::Applied { count, replayed } => {
                info!(table = T::TABLE, count, replayed, "snapshot loaded");
                SyncUpdate::Loaded { count, replayed }
            }
            FetchOutcome::Failed(message) => SyncUpdate::FetchFailed(message),
            FetchOutcome::Superseded | FetchOutcome::Closed => SyncUpdate::StaleFetch,
        }
    }

    fn apply_payload(&mut self, payload: &str) -> SyncUpdate {
        let event = ChangeEvent::<T>::decode(payload);

        // The feed carries every owner's rows
        if let ChangeEvent::Insert(row) | ChangeEvent::Update(row) = &event {
            if row.user_id() != self.owner {
                debug!(table = T::TABLE, id = %row.id(), "skipping change for another owner");
                return SyncUpdate::Unchanged;
            }
        }

        match self.store.apply(event) {
            Applied::NeedsRefetch => {
                info!(table = T::TABLE, "unrecognized change, reloading");
                self.refetch();
                SyncUpdate::Resync
            }
            Applied::Unchanged | Applied::Ignored => SyncUpdate::Unchanged,
            applied => SyncUpdate::Changed(applied),
        }
    }
}
