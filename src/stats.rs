use crate::models::{Client, Project};

/// Share of revenue reported as profit on the statistics bar
pub const PROFIT_RATIO: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub active_projects: usize,
    pub total_clients: usize,
    pub total_revenue: f64,
    pub total_profit: f64,
    pub currency: String,
}

impl DashboardStats {
    /// Aggregate the synchronized lists into the four headline numbers
    pub fn compute(projects: &[Project], clients: &[Client], currency: &str) -> Self {
        let active_projects = projects.iter().filter(|p| p.status.is_ongoing()).count();
        let total_revenue: f64 = projects.iter().map(|p| p.budget.unwrap_or(0.0)).sum();

        Self {
            active_projects,
            total_clients: clients.len(),
            total_revenue,
            total_profit: total_revenue * PROFIT_RATIO,
            currency: currency.to_string(),
        }
    }
}

/// Format an amount with thousands separators, e.g. `125,500 BYN`
pub fn format_amount(amount: f64, currency: &str) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if whole < 0 { "-" } else { "" };
    format!("{sign}{grouped} {currency}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectStatus, WorkDaysType};
    use chrono::Utc;
    use uuid::Uuid;

    fn project(status: ProjectStatus, budget: Option<f64>) -> Project {
        Project {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            client_id: None,
            name: "p".to_string(),
            client_name: None,
            status,
            progress: None,
            budget,
            currency: None,
            start_date: None,
            end_date: None,
            work_days_type: WorkDaysType::Calendar,
            created_at: Utc::now(),
        }
    }

    fn client() -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            company_name: None,
            contact_person: "Anna".to_string(),
            phone: None,
            email: None,
            country: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compute_counts_new_and_active() {
        let projects = vec![
            project(ProjectStatus::New, Some(100.0)),
            project(ProjectStatus::Active, Some(200.0)),
            project(ProjectStatus::Paused, None),
            project(ProjectStatus::Completed, Some(700.0)),
        ];
        let clients = vec![client(), client()];

        let stats = DashboardStats::compute(&projects, &clients, "BYN");
        assert_eq!(stats.active_projects, 2);
        assert_eq!(stats.total_clients, 2);
        assert_eq!(stats.total_revenue, 1000.0);
        assert!((stats.total_profit - 700.0).abs() < 1e-9);
        assert_eq!(stats.currency, "BYN");
    }

    #[test]
    fn test_compute_on_empty_lists() {
        let stats = DashboardStats::compute(&[], &[], "EUR");
        assert_eq!(stats.active_projects, 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert_eq!(stats.total_profit, 0.0);
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(125_500.0, "BYN"), "125,500 BYN");
        assert_eq!(format_amount(999.4, "BYN"), "999 BYN");
        assert_eq!(format_amount(1_234_567.0, "EUR"), "1,234,567 EUR");
        assert_eq!(format_amount(-4500.0, "USD"), "-4,500 USD");
    }
}
