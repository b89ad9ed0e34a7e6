//! Calendar arithmetic and the project-day classifier.
//!
//! Dates are naive local calendar dates. Nothing here converts time zones.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Local, NaiveDate, Weekday};
use uuid::Uuid;

use crate::models::{Project, WorkDaysType};

/// Which projects a calendar query looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProjectScope {
    #[default]
    All,
    Client(Uuid),
    Project(Uuid),
}

impl ProjectScope {
    pub fn contains(&self, project: &Project) -> bool {
        match self {
            ProjectScope::All => true,
            ProjectScope::Client(client_id) => project.client_id == Some(*client_id),
            ProjectScope::Project(project_id) => project.id == *project_id,
        }
    }
}

/// Parse a stored date. Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_day(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|ts| ts.date_naive()))
}

/// Whether `date` is a project day for this one project.
///
/// Missing or unparseable bounds never match.
pub fn is_project_day_for(project: &Project, date: NaiveDate) -> bool {
    let (Some(start), Some(end)) = (
        project.start_date.as_deref().and_then(parse_day),
        project.end_date.as_deref().and_then(parse_day),
    ) else {
        return false;
    };

    if date < start || date > end {
        return false;
    }

    match project.work_days_type {
        WorkDaysType::Working => !is_weekend(date),
        WorkDaysType::Calendar => true,
    }
}

/// True if any project in `scope` treats `date` as a project day
pub fn is_project_day(date: NaiveDate, projects: &[Project], scope: ProjectScope) -> bool {
    projects
        .iter()
        .filter(|project| scope.contains(project))
        .any(|project| is_project_day_for(project, date))
}

/// Every project day in `[first, last]` for the scope.
///
/// Renderers call this once per quarter instead of classifying each cell.
pub fn project_days(
    first: NaiveDate,
    last: NaiveDate,
    projects: &[Project],
    scope: ProjectScope,
) -> BTreeSet<NaiveDate> {
    first
        .iter_days()
        .take_while(|day| *day <= last)
        .filter(|day| is_project_day(*day, projects, scope))
        .collect()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

/// Same month and day of month, ignoring the year
pub fn is_same_month_day(a: NaiveDate, b: NaiveDate) -> bool {
    a.month() == b.month() && a.day() == b.day()
}

/// Number of days in a month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// Empty cells before the 1st in a Monday-first month grid
pub fn leading_blanks(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first| first.weekday().num_days_from_monday())
        .unwrap_or(0)
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "",
    }
}

/// A calendar quarter. `number` stays in 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quarter {
    year: i32,
    number: u32,
}

impl Quarter {
    pub fn new(year: i32, number: u32) -> Option<Self> {
        (1..=4).contains(&number).then_some(Self { year, number })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn next(&self) -> Self {
        if self.number == 4 {
            Self { year: self.year + 1, number: 1 }
        } else {
            Self { year: self.year, number: self.number + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.number == 1 {
            Self { year: self.year - 1, number: 4 }
        } else {
            Self { year: self.year, number: self.number - 1 }
        }
    }

    pub fn months(&self) -> [u32; 3] {
        let first = (self.number - 1) * 3 + 1;
        [first, first + 1, first + 2]
    }

    pub fn first_day(&self) -> NaiveDate {
        let [first, _, _] = self.months();
        NaiveDate::from_ymd_opt(self.year, first, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let [_, _, last] = self.months();
        NaiveDate::from_ymd_opt(self.year, last, days_in_month(self.year, last))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn label(&self) -> String {
        format!("Q{} {}", self.number, self.year)
    }
}
