use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::MemoryBackend;
use crate::error::Result;
use crate::models::{Client, Project, ProjectStatus, WorkDaysType};

struct DemoProject {
    name: &'static str,
    client: usize,
    status: ProjectStatus,
    progress: i32,
    budget: f64,
    /// Offsets from today, in days
    starts: i64,
    ends: i64,
    work_days_type: WorkDaysType,
}

const CLIENTS: [(&str, &str, &str); 3] = [
    ("Logistics Plus LLC", "Andrei Kovalev", "Belarus"),
    ("StroyInvest CJSC", "Maria Petrova", "Belarus"),
    ("RetailDev LLC", "Igor Sidorov", "Belarus"),
];

const PROJECTS: [DemoProject; 3] = [
    DemoProject {
        name: "Warehouse 500t",
        client: 0,
        status: ProjectStatus::Active,
        progress: 65,
        budget: 125_000.0,
        starts: -40,
        ends: 66,
        work_days_type: WorkDaysType::Working,
    },
    DemoProject {
        name: "Office building",
        client: 1,
        status: ProjectStatus::Active,
        progress: 30,
        budget: 280_000.0,
        starts: -10,
        ends: 186,
        work_days_type: WorkDaysType::Calendar,
    },
    DemoProject {
        name: "Shopping center",
        client: 2,
        status: ProjectStatus::Completed,
        progress: 100,
        budget: 450_000.0,
        starts: -190,
        ends: -39,
        work_days_type: WorkDaysType::Working,
    },
];

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// An in-memory backend seeded with sample clients and projects for `owner`.
///
/// Project schedules are placed around `today` so the calendar has something
/// to show.
pub fn seeded_backend(owner: Uuid, today: NaiveDate) -> Result<MemoryBackend> {
    let backend = MemoryBackend::new();
    let base: DateTime<Utc> = Utc::now() - Duration::days(30);

    let clients: Vec<Client> = CLIENTS
        .iter()
        .enumerate()
        .map(|(i, (company, contact, country))| Client {
            id: Uuid::new_v4(),
            user_id: owner,
            company_name: Some(company.to_string()),
            contact_person: contact.to_string(),
            phone: None,
            email: None,
            country: Some(country.to_string()),
            created_at: base + Duration::hours(i as i64),
        })
        .collect();

    let projects: Vec<Project> = PROJECTS
        .iter()
        .enumerate()
        .map(|(i, demo)| {
            let client = &clients[demo.client];
            Project {
                id: Uuid::new_v4(),
                user_id: owner,
                client_id: Some(client.id),
                name: demo.name.to_string(),
                client_name: Some(client.display_name().to_string()),
                status: demo.status,
                progress: Some(demo.progress),
                budget: Some(demo.budget),
                currency: Some("BYN".to_string()),
                start_date: Some(iso(today + Duration::days(demo.starts))),
                end_date: Some(iso(today + Duration::days(demo.ends))),
                work_days_type: demo.work_days_type,
                created_at: base + Duration::hours(10 + i as i64),
            }
        })
        .collect();

    backend.seed(&clients)?;
    backend.seed(&projects)?;

    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{ProjectScope, is_project_day};
    use crate::db::Backend;
    use crate::stats::DashboardStats;

    #[tokio::test]
    async fn test_seeded_backend_serves_sample_rows() {
        let owner = Uuid::new_v4();
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        let backend = seeded_backend(owner, today).unwrap();

        let clients: Vec<Client> = backend.fetch_all(owner).await.unwrap();
        let projects: Vec<Project> = backend.fetch_all(owner).await.unwrap();
        assert_eq!(clients.len(), 3);
        assert_eq!(projects.len(), 3);
        assert_eq!(projects[0].name, "Shopping center");

        let stats = DashboardStats::compute(&projects, &clients, "BYN");
        assert_eq!(stats.active_projects, 2);
        assert_eq!(stats.total_revenue, 855_000.0);

        // Wednesday inside both active schedules
        assert!(is_project_day(today, &projects, ProjectScope::All));
    }

    #[tokio::test]
    async fn test_other_owners_see_nothing() {
        let backend = seeded_backend(Uuid::new_v4(), Utc::now().date_naive()).unwrap();
        let rows: Vec<Project> = backend.fetch_all(Uuid::new_v4()).await.unwrap();
        assert!(rows.is_empty());
    }
}
