use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Backend, Channel};
use crate::error::{DashboardError, Result};
use crate::models::{Client, ClientDraft, Entity, Project, ProjectDraft};
use crate::sync::ChangeNotice;

struct Listener {
    id: u64,
    table: &'static str,
    sender: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<&'static str, Vec<Value>>,
    listeners: Vec<Listener>,
    next_channel: u64,
    fetch_failure: Option<String>,
    last_created: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn notify(&mut self, table: &'static str, notice: ChangeNotice) {
        let payload = notice.to_payload();
        self.listeners
            .retain(|l| l.table != table || l.sender.send(payload.clone()).is_ok());
    }

    /// Creation stamps strictly increase so newest-first order is total
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(stamp);
        stamp
    }

    fn row_index(&self, table: &'static str, id: Uuid) -> Option<usize> {
        self.tables.get(table)?.iter().position(|row| row_id(row) == Some(id))
    }
}

fn row_id(row: &Value) -> Option<Uuid> {
    row.get("id")?.as_str()?.parse().ok()
}

fn row_owner(row: &Value) -> Option<Uuid> {
    row.get("user_id")?.as_str()?.parse().ok()
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// In-process backend with the same change-feed contract as [`Database`](super::Database).
///
/// Backs the `--demo` mode and the tests. Fetches can be held open or made to
/// fail, and raw payloads can be pushed to subscribers.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    gate: watch::Sender<bool>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(MemoryState {
                next_channel: 1,
                ..MemoryState::default()
            }),
            gate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store rows without notifying subscribers
    pub fn seed<T: Entity>(&self, rows: &[T]) -> Result<()> {
        let mut state = self.lock();
        for row in rows {
            let value = serde_json::to_value(row)?;
            state.tables.entry(T::TABLE).or_default().push(value);
        }
        Ok(())
    }

    /// Push a raw payload to every subscriber of `table`
    pub fn emit(&self, table: &'static str, payload: &str) {
        let mut state = self.lock();
        state
            .listeners
            .retain(|l| l.table != table || l.sender.send(payload.to_string()).is_ok());
    }

    /// Drop every subscriber of `table`, as a lost database connection would
    pub fn close_feeds(&self, table: &str) {
        self.lock().listeners.retain(|l| l.table != table);
    }

    /// Make subsequent fetches fail with `message`, or succeed again with `None`
    pub fn fail_fetches(&self, message: Option<&str>) {
        self.lock().fetch_failure = message.map(str::to_string);
    }

    /// Hold fetch responses until [`release_fetches`](Self::release_fetches).
    ///
    /// A held fetch answers with the rows as they were when it started.
    pub fn hold_fetches(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_fetches(&self) {
        self.gate.send_replace(true);
    }

    pub fn listener_count(&self, table: &str) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|l| l.table == table && !l.sender.is_closed())
            .count()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, Vec::len)
    }

    async fn wait_for_gate(&self) {
        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow_and_update();
            if open {
                break;
            }
            if gate.changed().await.is_err() {
                break;
            }
        }
    }

    fn insert_row<T: Entity>(&self, row: &T) -> Result<()> {
        let value = serde_json::to_value(row)?;
        let mut state = self.lock();
        state.tables.entry(T::TABLE).or_default().push(value.clone());
        state.notify(T::TABLE, ChangeNotice::insert(T::TABLE, value));
        Ok(())
    }

    fn replace_row<T: Entity>(&self, id: Uuid, build: impl FnOnce(T) -> T) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .row_index(T::TABLE, id)
            .ok_or(DashboardError::NotFound { entity: T::KIND, id })?;

        let rows = state.tables.entry(T::TABLE).or_default();
        let current: T = serde_json::from_value(rows[index].clone())?;
        let value = serde_json::to_value(build(current))?;
        rows[index] = value.clone();

        state.notify(T::TABLE, ChangeNotice::update(T::TABLE, id, value));
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn fetch_all<T: Entity>(&self, owner: Uuid) -> Result<Vec<T>> {
        let snapshot: Result<Vec<T>> = {
            let state = self.lock();
            match &state.fetch_failure {
                Some(message) => Err(DashboardError::Db(sqlx::Error::Protocol(message.clone()))),
                None => state
                    .tables
                    .get(T::TABLE)
                    .into_iter()
                    .flatten()
                    .filter(|row| row_owner(row) == Some(owner))
                    .map(|row| serde_json::from_value::<T>(row.clone()).map_err(DashboardError::from))
                    .collect(),
            }
        };

        self.wait_for_gate().await;

        let mut rows = snapshot?;
        rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        debug!(table = T::TABLE, count = rows.len(), "memory fetch");
        Ok(rows)
    }

    async fn insert_client(&self, owner: Uuid, draft: &ClientDraft) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let created_at = self.lock().stamp();
        let client = Client {
            id,
            user_id: owner,
            company_name: draft.company_name.clone(),
            contact_person: draft.contact_person.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            country: draft.country.clone(),
            created_at,
        };
        self.insert_row(&client)?;
        Ok(id)
    }

    async fn update_client(&self, id: Uuid, draft: &ClientDraft) -> Result<()> {
        self.replace_row::<Client>(id, |current| Client {
            company_name: draft.company_name.clone(),
            contact_person: draft.contact_person.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            country: draft.country.clone(),
            ..current
        })
    }

    async fn insert_project(&self, owner: Uuid, draft: &ProjectDraft) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let created_at = self.lock().stamp();
        let project = Project {
            id,
            user_id: owner,
            client_id: draft.client_id,
            name: draft.name.clone(),
            client_name: draft.client_name.clone(),
            status: draft.status,
            progress: Some(0),
            budget: draft.budget,
            currency: draft.currency.clone(),
            start_date: date_text(draft.start_date),
            end_date: date_text(draft.end_date),
            work_days_type: draft.work_days_type,
            created_at,
        };
        self.insert_row(&project)?;
        Ok(id)
    }

    async fn update_project(&self, id: Uuid, draft: &ProjectDraft) -> Result<()> {
        self.replace_row::<Project>(id, |current| Project {
            client_id: draft.client_id,
            client_name: draft.client_name.clone(),
            name: draft.name.clone(),
            status: draft.status,
            budget: draft.budget,
            currency: draft.currency.clone(),
            start_date: date_text(draft.start_date),
            end_date: date_text(draft.end_date),
            work_days_type: draft.work_days_type,
            ..current
        })
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> Result<()> {
        let mut state = self.lock();
        let index = state
            .row_index(T::TABLE, id)
            .ok_or(DashboardError::NotFound { entity: T::KIND, id })?;

        if let Some(rows) = state.tables.get_mut(T::TABLE) {
            rows.remove(index);
        }
        state.notify(T::TABLE, ChangeNotice::delete(T::TABLE, id));
        Ok(())
    }

    async fn subscribe(&self, name: &str, table: &'static str) -> Result<Channel> {
        let (sender, events) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_channel;
        state.next_channel += 1;
        state.listeners.push(Listener { id, table, sender });

        info!(channel = name, table, "subscribed to memory change feed");
        Ok(Channel::new(id, name, table, events, None))
    }

    async fn remove_channel(&self, channel: Channel) {
        self.lock().listeners.retain(|l| l.id != channel.id());
        info!(channel = channel.name(), table = channel.table(), "removed memory change feed channel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;
    use crate::sync::ChangeEvent;

    fn draft(name: &str) -> ClientDraft {
        ClientDraft {
            contact_person: name.to_string(),
            ..ClientDraft::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_is_owner_scoped_and_newest_first() {
        let backend = MemoryBackend::new();
        let owner = Uuid::new_v4();

        let first = backend.insert_client(owner, &draft("first")).await.unwrap();
        let second = backend.insert_client(owner, &draft("second")).await.unwrap();
        backend.insert_client(Uuid::new_v4(), &draft("stranger")).await.unwrap();

        let rows: Vec<Client> = backend.fetch_all(owner).await.unwrap();
        let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_mutations_notify_subscribers() {
        let backend = MemoryBackend::new();
        let owner = Uuid::new_v4();
        let mut channel = backend.subscribe("projects-changes", "projects").await.unwrap();

        let mut project = ProjectDraft::new(None, None);
        project.name = "Office".to_string();
        let id = backend.insert_project(owner, &project).await.unwrap();

        project.status = ProjectStatus::Active;
        backend.update_project(id, &project).await.unwrap();
        backend.delete::<Project>(id).await.unwrap();

        let inserted = ChangeEvent::<Project>::decode(&channel.recv().await.unwrap());
        assert!(matches!(inserted, ChangeEvent::Insert(p) if p.id == id));

        let updated = ChangeEvent::<Project>::decode(&channel.recv().await.unwrap());
        assert!(matches!(updated, ChangeEvent::Update(p) if p.status == ProjectStatus::Active));

        let deleted = ChangeEvent::<Project>::decode(&channel.recv().await.unwrap());
        assert_eq!(deleted, ChangeEvent::Delete(id));
    }

    #[tokio::test]
    async fn test_other_tables_are_not_notified() {
        let backend = MemoryBackend::new();
        let mut clients = backend.subscribe("clients-changes", "clients").await.unwrap();

        backend
            .insert_project(Uuid::new_v4(), &ProjectDraft::new(None, None))
            .await
            .unwrap();
        backend.emit("clients", "ping");

        assert_eq!(clients.recv().await.as_deref(), Some("ping"));
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let backend = MemoryBackend::new();
        let id = Uuid::new_v4();

        let err = backend.delete::<Client>(id).await.unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { entity: "client", .. }));

        let err = backend.update_client(id, &draft("x")).await.unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_removed_channel_stops_counting() {
        let backend = MemoryBackend::new();
        let channel = backend.subscribe("clients-changes", "clients").await.unwrap();
        assert_eq!(backend.listener_count("clients"), 1);

        backend.remove_channel(channel).await;
        assert_eq!(backend.listener_count("clients"), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let backend = MemoryBackend::new();
        backend.fail_fetches(Some("network down"));

        let result = backend.fetch_all::<Client>(Uuid::new_v4()).await;
        assert!(matches!(result, Err(DashboardError::Db(_))));

        backend.fail_fetches(None);
        assert!(backend.fetch_all::<Client>(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
