use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

use crate::calendar::days_in_month;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Segment-by-segment date entry: type four digits for the year, two for
/// month and day, Left/Right to move between segments.
#[derive(Debug, Clone)]
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pub current_date_input: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            current_date_input: String::new(),
        }
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.date_part = DatePart::Year;
            self.current_date_input.clear();
        }
    }

    pub fn next_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.current_date_input.clear();
    }

    pub fn previous_date_part(&mut self) {
        self.date_part = match self.date_part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.current_date_input.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.current_date_input.push(c);
                let wanted = if self.date_part == DatePart::Year { 4 } else { 2 };
                if self.current_date_input.len() >= wanted {
                    self.commit_segment();
                    self.current_date_input.clear();
                }
            }
            KeyCode::Backspace => {
                self.current_date_input.pop();
            }
            KeyCode::Right => self.next_date_part(),
            KeyCode::Left => self.previous_date_part(),
            _ => {}
        }
    }

    fn commit_segment(&mut self) {
        let Ok(value) = self.current_date_input.parse::<u32>() else {
            return;
        };
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());

        let candidate = match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => {
                // Feb 29 in a non-leap year clamps to the 28th
                let year = value as i32;
                NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
            }
            DatePart::Month if (1..=12).contains(&value) => {
                NaiveDate::from_ymd_opt(year, value, day.min(days_in_month(year, value)))
            }
            DatePart::Day if (1..=days_in_month(year, month)).contains(&value) => {
                NaiveDate::from_ymd_opt(year, month, value)
            }
            _ => None,
        };

        if let Some(date) = candidate {
            self.date = date;
        }
    }

    pub fn get_display_string(&self) -> String {
        let date_str = self.date.format("%Y-%m-%d").to_string();
        if !self.editing {
            return date_str;
        }

        let current_input = if !self.current_date_input.is_empty() {
            format!("[{}]", self.current_date_input)
        } else {
            match self.date_part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        let (year, month, day) = (
            self.date.format("%Y"),
            self.date.format("%m"),
            self.date.format("%d"),
        );
        match self.date_part {
            DatePart::Year => format!("{year}{current_input}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{current_input}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{current_input}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn type_digits(state: &mut DateInputState, digits: &str) {
        for c in digits.chars() {
            state.handle_input(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_segments_replace_parts_of_the_date() {
        let mut state = DateInputState::new(date(2024, 1, 15));
        state.toggle_editing();

        type_digits(&mut state, "2025");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "04");
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "30");

        assert_eq!(state.date, date(2025, 4, 30));
    }

    #[test]
    fn test_out_of_range_segments_are_ignored() {
        let mut state = DateInputState::new(date(2024, 4, 10));
        state.toggle_editing();
        state.handle_input(KeyCode::Left);
        type_digits(&mut state, "31");

        assert_eq!(state.date, date(2024, 4, 10));
    }

    #[test]
    fn test_month_change_clamps_the_day() {
        let mut state = DateInputState::new(date(2024, 1, 31));
        state.toggle_editing();
        state.handle_input(KeyCode::Right);
        type_digits(&mut state, "02");

        assert_eq!(state.date, date(2024, 2, 29));
    }

    #[test]
    fn test_display_marks_the_active_segment() {
        let mut state = DateInputState::new(date(2024, 3, 5));
        assert_eq!(state.get_display_string(), "2024-03-05");

        state.toggle_editing();
        state.handle_input(KeyCode::Right);
        assert_eq!(state.get_display_string(), "2024-03[MM]-05");
    }
}
