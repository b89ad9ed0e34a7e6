use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub contact_person: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Name shown in lists: the company if known, otherwise the contact
    pub fn display_name(&self) -> &str {
        match self.company_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.contact_person,
        }
    }
}

impl Entity for Client {
    const TABLE: &'static str = "clients";
    const KIND: &'static str = "client";
    const SELECT_BY_OWNER: &'static str = r#"
        SELECT id, user_id, company_name, contact_person, phone, email, country, created_at
        FROM clients
        WHERE user_id = $1
        ORDER BY created_at DESC
    "#;

    fn id(&self) -> Uuid {
        self.id
    }

    fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Editable client fields sent on create and update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientDraft {
    pub company_name: Option<String>,
    pub contact_person: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

impl From<&Client> for ClientDraft {
    fn from(client: &Client) -> Self {
        Self {
            company_name: client.company_name.clone(),
            contact_person: client.contact_person.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
            country: client.country.clone(),
        }
    }
}
