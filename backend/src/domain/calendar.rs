//! Calendar grid logic for month navigation.
//!
//! Builds the month view a presentation layer renders: leading padding for
//! the weekday the month starts on, one cell per calendar day with that
//! day's entry attached, trailing padding to square off the final week.
//! Pure computation over the read set; nothing here touches storage.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use shared::{CalendarDay, CalendarDayType, CalendarMonth, DailyEntry};

use super::errors::{DomainError, DomainResult};

/// Calendar service that handles all calendar-related grid computation
#[derive(Clone)]
pub struct CalendarService;

impl CalendarService {
    pub fn new() -> Self {
        Self
    }

    /// Generate a month grid with each day's entry attached
    pub fn month_grid(
        &self,
        year: i32,
        month: u32,
        entries: Vec<DailyEntry>,
    ) -> DomainResult<CalendarMonth> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation("Month must be between 1 and 12"));
        }

        let days_in_month = self.days_in_month(year, month);
        let first_day = self.first_day_of_month(year, month)?;

        // Index entries by day of month; malformed or out-of-month dates are
        // simply not shown
        let mut entries_by_day: HashMap<u32, DailyEntry> = HashMap::new();
        for entry in entries {
            if let Some(date) = entry.calendar_date() {
                if date.year() == year && date.month() == month {
                    entries_by_day.insert(date.day(), entry);
                }
            }
        }

        let mut days = Vec::new();

        for _ in 0..first_day {
            days.push(CalendarDay {
                day: 0,
                day_type: CalendarDayType::PaddingBefore,
                entry: None,
            });
        }

        for day in 1..=days_in_month {
            days.push(CalendarDay {
                day,
                day_type: CalendarDayType::MonthDay,
                entry: entries_by_day.remove(&day),
            });
        }

        while days.len() % 7 != 0 {
            days.push(CalendarDay {
                day: 0,
                day_type: CalendarDayType::PaddingAfter,
                entry: None,
            });
        }

        Ok(CalendarMonth {
            year,
            month,
            first_day_of_week: first_day,
            days,
        })
    }

    /// Get the number of days in a given month and year
    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match month {
            2 => {
                if self.is_leap_year(year) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Check if a year is a leap year
    pub fn is_leap_year(&self, year: i32) -> bool {
        year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
    }

    /// Weekday of day 1 (0 = Sunday, 1 = Monday, ...)
    pub fn first_day_of_month(&self, year: i32, month: u32) -> DomainResult<u32> {
        let date = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| DomainError::validation("Month is out of range"))?;
        Ok(date.weekday().num_days_from_sunday())
    }
}

impl Default for CalendarService {
    fn default() -> Self {
        Self::new()
    }
}
