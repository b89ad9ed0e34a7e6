use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Backend, Channel};
use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::models::{ClientDraft, Entity, ProjectDraft};
use crate::sync::RESYNC_PAYLOAD;

/// PostgreSQL backend.
///
/// Row changes reach the dashboard through `NOTIFY` on `<table>_changes`,
/// raised by the trigger in `migrations/`.
pub struct Database {
    pool: PgPool,
    next_channel: AtomicU64,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(config.database_url()?)
            .await?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            next_channel: AtomicU64::new(1),
        }
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Backend for Database {
    async fn fetch_all<T: Entity>(&self, owner: Uuid) -> Result<Vec<T>> {
        let rows = sqlx::query_as::<_, T>(T::SELECT_BY_OWNER)
            .bind(owner)
            .fetch_all(self.get_pool())
            .await?;

        Ok(rows)
    }

    async fn insert_client(&self, owner: Uuid, draft: &ClientDraft) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO clients (user_id, company_name, contact_person, phone, email, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(&draft.company_name)
        .bind(&draft.contact_person)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.country)
        .fetch_one(self.get_pool())
        .await?;

        Ok(id)
    }

    async fn update_client(&self, id: Uuid, draft: &ClientDraft) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET company_name = $1, contact_person = $2, phone = $3, email = $4,
                country = $5, updated_at = now()
            WHERE id = $6
            "#,
        )
        .bind(&draft.company_name)
        .bind(&draft.contact_person)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(&draft.country)
        .bind(id)
        .execute(self.get_pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DashboardError::NotFound { entity: "client", id });
        }

        Ok(())
    }

    async fn insert_project(&self, owner: Uuid, draft: &ProjectDraft) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO projects (user_id, client_id, client_name, name, status, budget,
                                  currency, start_date, end_date, work_days_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(draft.client_id)
        .bind(&draft.client_name)
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(draft.budget)
        .bind(&draft.currency)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.work_days_type.as_str())
        .fetch_one(self.get_pool())
        .await?;

        Ok(id)
    }

    async fn update_project(&self, id: Uuid, draft: &ProjectDraft) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET client_id = $1, client_name = $2, name = $3, status = $4, budget = $5,
                currency = $6, start_date = $7, end_date = $8, work_days_type = $9,
                updated_at = now()
            WHERE id = $10
            "#,
        )
        .bind(draft.client_id)
        .bind(&draft.client_name)
        .bind(&draft.name)
        .bind(draft.status.as_str())
        .bind(draft.budget)
        .bind(&draft.currency)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.work_days_type.as_str())
        .bind(id)
        .execute(self.get_pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DashboardError::NotFound { entity: "project", id });
        }

        Ok(())
    }

    async fn delete<T: Entity>(&self, id: Uuid) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(self.get_pool()).await?;

        if result.rows_affected() == 0 {
            return Err(DashboardError::NotFound { entity: T::KIND, id });
        }

        Ok(())
    }

    async fn subscribe(&self, name: &str, table: &'static str) -> Result<Channel> {
        let mut listener = PgListener::connect_with(self.get_pool()).await?;
        let topic = format!("{table}_changes");
        listener.listen(&topic).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let channel_name = name.to_string();
        let task = tokio::spawn(async move {
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => {
                        if tx.send(notification.payload().to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // Reconnected; anything sent meanwhile is lost
                        warn!(channel = %channel_name, "change feed connection lost");
                        if tx.send(RESYNC_PAYLOAD.to_string()).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(channel = %channel_name, error = %err, "change feed closed");
                        break;
                    }
                }
            }
        });

        let id = self.next_channel.fetch_add(1, Ordering::Relaxed);
        info!(channel = name, table, topic = %topic, "subscribed to change feed");
        Ok(Channel::new(id, name, table, rx, Some(task)))
    }

    async fn remove_channel(&self, channel: Channel) {
        info!(channel = channel.name(), table = channel.table(), "removing change feed channel");
        drop(channel);
    }
}
