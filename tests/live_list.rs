use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use uuid::Uuid;

use project_dashboard::DashboardError;
use project_dashboard::db::{Backend, MemoryBackend};
use project_dashboard::models::{
    Client, ClientDraft, Entity, Project, ProjectDraft, ProjectStatus, WorkDaysType,
};
use project_dashboard::sync::{Applied, ChangeNotice, ListOrder, ListStatus, LiveList, SyncUpdate};

async fn next_update<T: Entity, B: Backend>(list: &mut LiveList<T, B>) -> SyncUpdate {
    timeout(Duration::from_secs(2), list.next())
        .await
        .expect("timed out waiting for the list")
        .expect("list stopped")
}

async fn add_project(backend: &MemoryBackend, owner: Uuid, name: &str) -> Uuid {
    let mut draft = ProjectDraft::new(None, None);
    draft.name = name.to_string();
    backend.insert_project(owner, &draft).await.unwrap()
}

async fn open_projects(backend: &Arc<MemoryBackend>, owner: Uuid) -> LiveList<Project, MemoryBackend> {
    LiveList::open(Arc::clone(backend), owner, "projects-changes", ListOrder::NewestFirst)
        .await
        .unwrap()
}

fn names(list: &LiveList<Project, MemoryBackend>) -> Vec<&str> {
    list.items().iter().map(|p| p.name.as_str()).collect()
}

fn stray_project(owner: Uuid, name: &str) -> Project {
    Project {
        id: Uuid::new_v4(),
        user_id: owner,
        client_id: None,
        name: name.to_string(),
        client_name: None,
        status: ProjectStatus::New,
        progress: None,
        budget: None,
        currency: None,
        start_date: None,
        end_date: None,
        work_days_type: WorkDaysType::Calendar,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_insert_and_delete_scenario() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "two").await;
    let one = add_project(&backend, owner, "one").await;

    let mut list = open_projects(&backend, owner).await;
    assert!(list.is_loading());
    assert_eq!(next_update(&mut list).await, SyncUpdate::Loaded { count: 2, replayed: 0 });
    assert_eq!(names(&list), ["one", "two"]);

    add_project(&backend, owner, "three").await;
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));
    assert_eq!(names(&list), ["three", "one", "two"]);

    list.delete(one).await.unwrap();
    // Nothing changes until the notification arrives
    assert_eq!(names(&list), ["three", "one", "two"]);

    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Removed));
    assert_eq!(names(&list), ["three", "two"]);
}

#[tokio::test]
async fn test_update_replaces_in_place() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    let first = add_project(&backend, owner, "first").await;
    add_project(&backend, owner, "second").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;

    let mut draft = ProjectDraft::from(list.get(first).unwrap());
    draft.name = "first, renamed".to_string();
    backend.update_project(first, &draft).await.unwrap();

    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Updated));
    assert_eq!(names(&list), ["second", "first, renamed"]);
}

#[tokio::test]
async fn test_feed_edge_cases_follow_the_reducer() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "kept").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;

    // An update for a row the list never saw lands at the end
    let stray = stray_project(owner, "stray");
    let row = serde_json::to_value(&stray).unwrap();
    backend.emit("projects", &ChangeNotice::update("projects", stray.id, row.clone()).to_payload());
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));
    assert_eq!(names(&list), ["kept", "stray"]);

    // Duplicate inserts are dropped
    backend.emit("projects", &ChangeNotice::insert("projects", row).to_payload());
    assert_eq!(next_update(&mut list).await, SyncUpdate::Unchanged);
    assert_eq!(list.items().len(), 2);

    // Deleting an absent row is a no-op
    backend.emit("projects", &ChangeNotice::delete("projects", Uuid::new_v4()).to_payload());
    assert_eq!(next_update(&mut list).await, SyncUpdate::Unchanged);
    assert_eq!(list.items().len(), 2);
}

#[tokio::test]
async fn test_unknown_event_triggers_reload() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "only").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;

    backend.emit("projects", r#"{"eventType":"TRUNCATE"}"#);
    assert_eq!(next_update(&mut list).await, SyncUpdate::Resync);
    assert_eq!(next_update(&mut list).await, SyncUpdate::Loaded { count: 1, replayed: 0 });
}

#[tokio::test]
async fn test_unsubscribe_is_final() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "before").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;
    assert_eq!(backend.listener_count("projects"), 1);

    list.unsubscribe().await;
    list.unsubscribe().await;
    assert_eq!(backend.listener_count("projects"), 0);
    assert_eq!(list.status(), ListStatus::Unsubscribed);

    add_project(&backend, owner, "after").await;
    assert_eq!(list.next().await, None);
    assert!(!list.refetch());
    assert_eq!(names(&list), ["before"]);
}

#[tokio::test]
async fn test_fetch_finishing_after_unsubscribe_is_discarded() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "late").await;
    backend.hold_fetches();

    let mut list = open_projects(&backend, owner).await;
    list.unsubscribe().await;
    backend.release_fetches();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(list.next().await, None);
    assert!(list.items().is_empty());
}

#[tokio::test]
async fn test_events_during_fetch_survive_the_snapshot() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "existing").await;
    backend.hold_fetches();

    let mut list = open_projects(&backend, owner).await;
    // Let the fetch take its snapshot before the insert
    tokio::time::sleep(Duration::from_millis(20)).await;
    let fresh = add_project(&backend, owner, "fresh").await;
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));

    backend.release_fetches();
    assert_eq!(next_update(&mut list).await, SyncUpdate::Loaded { count: 2, replayed: 1 });
    assert_eq!(names(&list), ["fresh", "existing"]);
    assert_eq!(list.items().iter().filter(|p| p.id == fresh).count(), 1);
}

#[tokio::test]
async fn test_fetch_failure_keeps_list_usable() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "unreachable").await;
    backend.fail_fetches(Some("network down"));

    let mut list = open_projects(&backend, owner).await;
    let SyncUpdate::FetchFailed(message) = next_update(&mut list).await else {
        panic!("expected a failed fetch");
    };
    assert!(message.contains("network down"));
    assert_eq!(list.status(), ListStatus::Ready);
    assert!(list.last_error().is_some());
    assert!(list.items().is_empty());

    // Live events still apply while the snapshot is missing
    add_project(&backend, owner, "live").await;
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));

    backend.fail_fetches(None);
    assert!(list.refetch());
    assert_eq!(next_update(&mut list).await, SyncUpdate::Loaded { count: 2, replayed: 0 });
    assert_eq!(list.last_error(), None);
}

#[tokio::test]
async fn test_owner_scoped_sorted_client_list() {
    fn by_contact(a: &Client, b: &Client) -> Ordering {
        a.contact_person.cmp(&b.contact_person)
    }

    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    for name in ["Maria", "Andrei"] {
        let draft = ClientDraft {
            contact_person: name.to_string(),
            ..ClientDraft::default()
        };
        backend.insert_client(owner, &draft).await.unwrap();
    }

    let mut list: LiveList<Client, MemoryBackend> =
        LiveList::open(Arc::clone(&backend), owner, "clients-changes", ListOrder::SortedBy(by_contact))
            .await
            .unwrap();
    next_update(&mut list).await;

    let draft = ClientDraft {
        contact_person: "Igor".to_string(),
        ..ClientDraft::default()
    };
    backend.insert_client(owner, &draft).await.unwrap();
    backend.insert_client(Uuid::new_v4(), &draft).await.unwrap();
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));
    // The other owner's insert reaches the feed but not the list
    assert_eq!(next_update(&mut list).await, SyncUpdate::Unchanged);

    let contacts: Vec<&str> = list.items().iter().map(|c| c.contact_person.as_str()).collect();
    assert_eq!(contacts, ["Andrei", "Igor", "Maria"]);
}

#[tokio::test]
async fn test_failed_delete_leaves_list_untouched() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "kept").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;

    let result = list.delete(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DashboardError::NotFound { entity: "project", .. })));
    assert_eq!(names(&list), ["kept"]);
    assert_eq!(backend.row_count("projects"), 1);

    // No notification followed the failed delete
    let quiet = timeout(Duration::from_millis(50), list.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test]
async fn test_reload_reopens_a_closed_feed() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = Uuid::new_v4();
    add_project(&backend, owner, "first").await;

    let mut list = open_projects(&backend, owner).await;
    next_update(&mut list).await;

    backend.close_feeds("projects");
    assert_eq!(next_update(&mut list).await, SyncUpdate::FeedClosed);
    assert!(!list.is_live());
    assert_eq!(backend.listener_count("projects"), 0);

    assert!(list.reload().await.unwrap());
    assert!(list.is_live());
    assert_eq!(backend.listener_count("projects"), 1);
    assert_eq!(next_update(&mut list).await, SyncUpdate::Loaded { count: 1, replayed: 0 });

    add_project(&backend, owner, "second").await;
    assert_eq!(next_update(&mut list).await, SyncUpdate::Changed(Applied::Inserted));
    assert_eq!(names(&list), ["second", "first"]);

    list.unsubscribe().await;
    assert!(!list.reload().await.unwrap());
}
