mod client;
mod project;

pub use client::{Client, ClientDraft};
pub use project::{Project, ProjectDraft, ProjectStatus, WorkDaysType};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::PgRow;
use uuid::Uuid;

/// A row type mirrored from one backend table.
///
/// Rows decode both from query results (`FromRow`) and from change-feed
/// payloads (`Deserialize`).
pub trait Entity:
    for<'r> sqlx::FromRow<'r, PgRow>
    + DeserializeOwned
    + Serialize
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Backend table the rows live in
    const TABLE: &'static str;
    /// Singular name used in messages
    const KIND: &'static str;
    /// Owner-scoped query, newest first, taking the owner id as `$1`
    const SELECT_BY_OWNER: &'static str;

    fn id(&self) -> Uuid;

    /// Owner of the row
    fn user_id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;
}
