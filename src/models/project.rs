use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::error::DashboardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    New,
    Active,
    Paused,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::New => "new",
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
        }
    }

    /// New and active projects both count as ongoing work
    pub fn is_ongoing(&self) -> bool {
        matches!(self, ProjectStatus::New | ProjectStatus::Active)
    }

    /// Cycle used by the project wizard
    pub fn next(&self) -> Self {
        match self {
            ProjectStatus::New => ProjectStatus::Active,
            ProjectStatus::Active => ProjectStatus::Paused,
            ProjectStatus::Paused => ProjectStatus::Completed,
            ProjectStatus::Completed => ProjectStatus::New,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ProjectStatus {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "new" => Ok(ProjectStatus::New),
            "active" => Ok(ProjectStatus::Active),
            "paused" => Ok(ProjectStatus::Paused),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(DashboardError::InvalidValue(format!(
                "unknown project status '{other}'"
            ))),
        }
    }
}

/// Which days inside a project's date range count as work days.
///
/// Only `working` is special: it drops Saturdays and Sundays. A missing or
/// unrecognized value behaves like `calendar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum WorkDaysType {
    Working,
    #[default]
    Calendar,
}

impl WorkDaysType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkDaysType::Working => "working",
            WorkDaysType::Calendar => "calendar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkDaysType::Working => "Working days",
            WorkDaysType::Calendar => "Calendar days",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            WorkDaysType::Working => WorkDaysType::Calendar,
            WorkDaysType::Calendar => WorkDaysType::Working,
        }
    }
}

impl From<Option<String>> for WorkDaysType {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("working") => WorkDaysType::Working,
            _ => WorkDaysType::Calendar,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub name: String,
    pub client_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub progress: Option<i32>,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    /// Raw date text as stored by the backend, parsed leniently on use
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[sqlx(try_from = "Option<String>")]
    #[serde(default)]
    pub work_days_type: WorkDaysType,
    pub created_at: DateTime<Utc>,
}

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const KIND: &'static str = "project";
    const SELECT_BY_OWNER: &'static str = r#"
        SELECT
            id,
            user_id,
            client_id,
            name,
            client_name,
            status,
            progress,
            budget::float8 AS budget,
            currency,
            start_date::text AS start_date,
            end_date::text AS end_date,
            work_days_type,
            created_at
        FROM projects
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

/// Editable project fields sent on create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDraft {
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub work_days_type: WorkDaysType,
}

impl ProjectDraft {
    pub fn new(client_id: Option<Uuid>, client_name: Option<String>) -> Self {
        Self {
            client_id,
            client_name,
            name: String::new(),
            status: ProjectStatus::New,
            budget: None,
            currency: None,
            start_date: None,
            end_date: None,
            work_days_type: WorkDaysType::Working,
        }
    }
}

impl From<&Project> for ProjectDraft {
    fn from(project: &Project) -> Self {
        Self {
            client_id: project.client_id,
            client_name: project.client_name.clone(),
            name: project.name.clone(),
            status: project.status,
            budget: project.budget,
            currency: project.currency.clone(),
            start_date: project.start_date.as_deref().and_then(crate::calendar::parse_day),
            end_date: project.end_date.as_deref().and_then(crate::calendar::parse_day),
            work_days_type: project.work_days_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_work_days_type_defaults_to_calendar() {
        assert_eq!(WorkDaysType::from(None::<String>), WorkDaysType::Calendar);
        assert_eq!(
            WorkDaysType::from(Some("weekends-too".to_string())),
            WorkDaysType::Calendar
        );
        assert_eq!(
            WorkDaysType::from(Some("working".to_string())),
            WorkDaysType::Working
        );
    }

    #[test]
    fn test_status_rejects_unknown_text() {
        assert_eq!(
            ProjectStatus::try_from("paused".to_string()).unwrap(),
            ProjectStatus::Paused
        );
        assert!(ProjectStatus::try_from("archived".to_string()).is_err());
    }

    #[test]
    fn test_deserializes_feed_row_with_null_policy() {
        let row = json!({
            "id": "0b5c1f9e-5f0a-4d3e-9a57-0d8f1f0b6a11",
            "user_id": "6f1c2a4e-8a57-4a4c-9e43-2f6f0c1d9b10",
            "client_id": null,
            "name": "Warehouse 500t",
            "client_name": null,
            "status": "active",
            "progress": 65,
            "budget": 125000.0,
            "currency": "BYN",
            "start_date": "2024-01-15",
            "end_date": "2024-04-30",
            "work_days_type": null,
            "created_at": "2024-01-10T09:30:00+00:00"
        });

        let project: Project = serde_json::from_value(row).unwrap();
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.work_days_type, WorkDaysType::Calendar);
        assert_eq!(project.start_date.as_deref(), Some("2024-01-15"));
    }

    #[test]
    fn test_draft_keeps_parseable_dates_only() {
        let project = Project {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: None,
            name: "Office".to_string(),
            client_name: None,
            status: ProjectStatus::New,
            progress: None,
            budget: None,
            currency: None,
            start_date: Some("2024-02-01".to_string()),
            end_date: Some("someday".to_string()),
            work_days_type: WorkDaysType::Working,
            created_at: Utc::now(),
        };

        let draft = ProjectDraft::from(&project);
        assert_eq!(draft.start_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(draft.end_date, None);
    }
}
