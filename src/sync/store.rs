use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, warn};
use uuid::Uuid;

use super::event::ChangeEvent;
use crate::error::Result;
use crate::models::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Initial fetch in flight
    Loading,
    Ready,
    /// Torn down; nothing mutates the list any more
    Unsubscribed,
}

/// Events buffered behind one fetch before that fetch is abandoned
pub const MAX_REPLAY: usize = 256;

/// Identifies one issued fetch. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

/// Where rows go in the list
pub enum ListOrder<T> {
    /// Backend order for snapshots, new rows at the front
    NewestFirst,
    /// Keep the list sorted with a comparator
    SortedBy(fn(&T, &T) -> Ordering),
}

impl<T> Clone for ListOrder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListOrder<T> {}

impl<T> Default for ListOrder<T> {
    fn default() -> Self {
        ListOrder::NewestFirst
    }
}

impl<T> ListOrder<T> {
    fn insert_at(&self, items: &[T], row: &T) -> usize {
        match self {
            ListOrder::NewestFirst => 0,
            ListOrder::SortedBy(cmp) => items.partition_point(|x| cmp(x, row) != Ordering::Greater),
        }
    }

    /// Position for an update whose row is not in the list
    fn fallback_at(&self, items: &[T], row: &T) -> usize {
        match self {
            ListOrder::NewestFirst => items.len(),
            ListOrder::SortedBy(_) => self.insert_at(items, row),
        }
    }

    fn arrange(&self, items: &mut [T]) {
        if let ListOrder::SortedBy(cmp) = self {
            items.sort_by(|a, b| cmp(a, b));
        }
    }
}

/// Result of feeding one event to the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Updated,
    Removed,
    /// Duplicate insert or delete of an absent row
    Unchanged,
    /// The caller should start a full fetch
    NeedsRefetch,
    /// The list is torn down
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot installed and buffered events replayed on top of it
    Applied { count: usize, replayed: usize },
    /// The fetch failed; the list keeps what it had
    Failed(String),
    /// A newer fetch was issued after this one
    Superseded,
    /// The list was torn down while the fetch was in flight
    Closed,
}

/// In-memory mirror of one backend table.
///
/// Pure state: the reducer never performs I/O, so it can be driven directly
/// by tests or by [`LiveList`](super::LiveList).
///
/// Fetch reconciliation: only the newest ticket's result is installed. Events
/// applied while that fetch is in flight are also recorded and replayed onto
/// the snapshot, so a snapshot taken before an event never erases it.
pub struct ListStore<T> {
    items: Vec<T>,
    status: ListStatus,
    order: ListOrder<T>,
    last_error: Option<String>,
    issued: u64,
    in_flight: Option<FetchTicket>,
    replay: Vec<ChangeEvent<T>>,
}

impl<T: Entity> ListStore<T> {
    pub fn new(order: ListOrder<T>) -> Self {
        Self {
            items: Vec::new(),
            status: ListStatus::Loading,
            order,
            last_error: None,
            issued: 0,
            in_flight: None,
            replay: Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|row| row.id() == id)
    }

    pub fn status(&self) -> ListStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Issue a new fetch ticket, superseding any fetch still in flight.
    ///
    /// Returns `None` once the list is torn down.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.status == ListStatus::Unsubscribed {
            return None;
        }

        self.issued += 1;
        let ticket = FetchTicket(self.issued);
        self.in_flight = Some(ticket);
        self.replay.clear();
        Some(ticket)
    }

    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<T>>) -> FetchOutcome {
        if self.status == ListStatus::Unsubscribed {
            return FetchOutcome::Closed;
        }
        if self.in_flight != Some(ticket) {
            debug!(table = T::TABLE, ?ticket, "discarding superseded fetch");
            return FetchOutcome::Superseded;
        }

        self.in_flight = None;
        let buffered = std::mem::take(&mut self.replay);

        match result {
            Ok(rows) => {
                self.items = self.snapshot(rows);
                let replayed = buffered.len();
                for event in buffered {
                    self.reduce(event);
                }
                self.status = ListStatus::Ready;
                self.last_error = None;
                FetchOutcome::Applied {
                    count: self.items.len(),
                    replayed,
                }
            }
            Err(err) => {
                warn!(table = T::TABLE, error = %err, "fetch failed");
                let message = err.to_string();
                self.last_error = Some(message.clone());
                if self.status == ListStatus::Loading {
                    self.status = ListStatus::Ready;
                }
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Apply one change notification
    pub fn apply(&mut self, event: ChangeEvent<T>) -> Applied {
        if self.status == ListStatus::Unsubscribed {
            return Applied::Ignored;
        }
        if matches!(event, ChangeEvent::Unknown) {
            return Applied::NeedsRefetch;
        }
        if self.in_flight.is_some() {
            self.replay.push(event.clone());
        }
        let applied = self.reduce(event);

        // A fetch that never answers must not buffer the feed forever
        if self.replay.len() > MAX_REPLAY {
            warn!(table = T::TABLE, buffered = self.replay.len(), "fetch overdue, abandoning it");
            self.in_flight = None;
            self.replay.clear();
            return Applied::NeedsRefetch;
        }
        applied
    }

    /// Tear the list down. Returns false if it already was.
    pub fn close(&mut self) -> bool {
        if self.status == ListStatus::Unsubscribed {
            return false;
        }
        self.status = ListStatus::Unsubscribed;
        self.in_flight = None;
        self.replay.clear();
        true
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|row| row.id() == id)
    }

    fn snapshot(&self, rows: Vec<T>) -> Vec<T> {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut rows: Vec<T> = rows.into_iter().filter(|row| seen.insert(row.id())).collect();
        self.order.arrange(&mut rows);
        rows
    }

    fn reduce(&mut self, event: ChangeEvent<T>) -> Applied {
        match event {
            ChangeEvent::Insert(row) => {
                if self.position(row.id()).is_some() {
                    return Applied::Unchanged;
                }
                let at = self.order.insert_at(&self.items, &row);
                self.items.insert(at, row);
                Applied::Inserted
            }
            ChangeEvent::Update(row) => match self.position(row.id()) {
                Some(index) => {
                    self.items[index] = row;
                    Applied::Updated
                }
                None => {
                    let at = self.order.fallback_at(&self.items, &row);
                    self.items.insert(at, row);
                    Applied::Inserted
                }
            },
            ChangeEvent::Delete(id) => match self.position(id) {
                Some(index) => {
                    self.items.remove(index);
                    Applied::Removed
                }
                None => Applied::Unchanged,
            },
            ChangeEvent::Unknown => Applied::NeedsRefetch,
        }
    }
}
