use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::habit::{Habit, HabitLog};

/// Days counted by the weekly completion percentage, today included.
pub const PROGRESS_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HabitProgress {
    pub weekly_percent: u8,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_completions: usize,
}

impl HabitProgress {
    pub fn compute(habit: &Habit, today: NaiveDate) -> Self {
        let dates = completed_dates(&habit.logs);
        Self {
            weekly_percent: weekly_percent(&dates, today),
            current_streak: current_streak(&dates, today),
            longest_streak: longest_streak(&dates),
            total_completions: dates.len(),
        }
    }
}

/// Distinct days with at least one completed log.
pub fn completed_dates(logs: &[HabitLog]) -> BTreeSet<NaiveDate> {
    logs.iter()
        .filter(|log| log.is_completed)
        .map(|log| log.date)
        .collect()
}

/// Share of the trailing window that was completed, rounded to the nearest
/// whole percent.
pub fn weekly_percent(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u8 {
    let start = today - Duration::days(PROGRESS_WINDOW_DAYS - 1);
    let done = dates.range(start..=today).count() as f64;
    (done / PROGRESS_WINDOW_DAYS as f64 * 100.0).round() as u8
}

/// Consecutive completed days ending today. Today not logged yet means 0.
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0u32;
    let mut check_date = today;

    while dates.contains(&check_date) {
        streak += 1;
        match check_date.pred_opt() {
            Some(prev) => check_date = prev,
            None => break,
        }
    }

    streak
}

pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    let mut streak = 0u32;
    let mut prev_date: Option<NaiveDate> = None;

    for date in dates {
        streak = match prev_date {
            Some(prev) if *date == prev + Duration::days(1) => streak + 1,
            _ => 1,
        };
        longest = longest.max(streak);
        prev_date = Some(*date);
    }

    longest
}
