use uuid::Uuid;

use crate::models::{Client, Project, ProjectStatus};

/// Status tabs on the projects pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectFilter {
    #[default]
    Active,
    All,
    Completed,
}

impl ProjectFilter {
    pub const TABS: [ProjectFilter; 3] = [
        ProjectFilter::Active,
        ProjectFilter::All,
        ProjectFilter::Completed,
    ];

    pub fn matches(&self, project: &Project) -> bool {
        match self {
            ProjectFilter::Active => project.status == ProjectStatus::Active,
            ProjectFilter::Completed => project.status == ProjectStatus::Completed,
            ProjectFilter::All => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectFilter::Active => "Active",
            ProjectFilter::All => "All",
            ProjectFilter::Completed => "Completed",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ProjectFilter::Active => 0,
            ProjectFilter::All => 1,
            ProjectFilter::Completed => 2,
        }
    }

    pub fn next(&self) -> Self {
        Self::TABS[(self.index() + 1) % Self::TABS.len()]
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Case-insensitive search over company name and contact person
pub fn search_clients<'a>(clients: &'a [Client], query: &str) -> Vec<&'a Client> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return clients.iter().collect();
    }

    clients
        .iter()
        .filter(|client| {
            client
                .company_name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
                || client.contact_person.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Number of new or active projects belonging to a client
pub fn active_project_count(client_id: Uuid, projects: &[Project]) -> usize {
    projects
        .iter()
        .filter(|p| p.client_id == Some(client_id) && p.status.is_ongoing())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkDaysType;
    use chrono::Utc;

    fn project(status: ProjectStatus, client_id: Option<Uuid>) -> Project {
        Project {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            client_id,
            name: status.to_string(),
            client_name: None,
            status,
            progress: None,
            budget: None,
            currency: None,
            start_date: None,
            end_date: None,
            work_days_type: WorkDaysType::Working,
            created_at: Utc::now(),
        }
    }

    fn client(company: Option<&str>, contact: &str) -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            company_name: company.map(str::to_string),
            contact_person: contact.to_string(),
            phone: None,
            email: None,
            country: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_filter_tabs() {
        let projects = vec![
            project(ProjectStatus::New, None),
            project(ProjectStatus::Active, None),
            project(ProjectStatus::Completed, None),
        ];

        assert_eq!(ProjectFilter::Active.apply(&projects).len(), 1);
        assert_eq!(ProjectFilter::Completed.apply(&projects).len(), 1);
        assert_eq!(ProjectFilter::All.apply(&projects).len(), 3);
        assert_eq!(ProjectFilter::Completed.next(), ProjectFilter::Active);
    }

    #[test]
    fn test_search_matches_company_or_contact() {
        let clients = vec![
            client(Some("Logistics Plus LLC"), "Ivan Petrov"),
            client(None, "Maria Logvinova"),
            client(Some("RetailDev"), "Oleg"),
        ];

        assert_eq!(search_clients(&clients, "LOG").len(), 2);
        assert_eq!(search_clients(&clients, "oleg").len(), 1);
        assert_eq!(search_clients(&clients, "  ").len(), 3);
        assert!(search_clients(&clients, "nobody").is_empty());
    }

    #[test]
    fn test_active_project_count_per_client() {
        let client_id = Uuid::new_v4();
        let projects = vec![
            project(ProjectStatus::New, Some(client_id)),
            project(ProjectStatus::Active, Some(client_id)),
            project(ProjectStatus::Completed, Some(client_id)),
            project(ProjectStatus::Active, Some(Uuid::new_v4())),
        ];

        assert_eq!(active_project_count(client_id, &projects), 2);
    }
}
