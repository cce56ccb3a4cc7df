use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Session;

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    #[schema(value_type = String, format = "date", example = "2025-01-10")]
    pub date: NaiveDate,
    pub in_month: bool,
    pub sessions: Vec<Session>,
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday through Sunday of the week containing `anchor`.
pub fn week_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    let monday = week_start(anchor);
    (0..7).map(|i| monday + Duration::days(i)).collect()
}

/// Whole weeks covering the month of `anchor`, Monday first.
pub fn month_grid_days(anchor: NaiveDate) -> Vec<NaiveDate> {
    let first = anchor.with_day(1).unwrap_or(anchor);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .map(|next| next - Duration::days(1))
        .unwrap_or(first);
    let grid_start = week_start(first);
    let grid_end = week_start(last) + Duration::days(6);
    grid_start
        .iter_days()
        .take_while(|day| *day <= grid_end)
        .collect()
}

/// Sessions keyed by their local start date, each day ordered by start time.
pub fn sessions_by_day(sessions: &[Session], tz: Tz) -> BTreeMap<NaiveDate, Vec<Session>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        let day = session.starts_at.with_timezone(&tz).date_naive();
        by_day.entry(day).or_default().push(session.clone());
    }
    for day in by_day.values_mut() {
        day.sort_by_key(|s| s.starts_at);
    }
    by_day
}

fn layout(days: Vec<NaiveDate>, anchor: NaiveDate, sessions: &[Session], tz: Tz) -> Vec<CalendarDay> {
    let mut by_day = sessions_by_day(sessions, tz);
    days.into_iter()
        .map(|date| CalendarDay {
            date,
            in_month: date.month() == anchor.month() && date.year() == anchor.year(),
            sessions: by_day.remove(&date).unwrap_or_default(),
        })
        .collect()
}

pub fn week_view(sessions: &[Session], anchor: NaiveDate, tz: Tz) -> Vec<CalendarDay> {
    layout(week_days(anchor), anchor, sessions, tz)
}

pub fn month_view(sessions: &[Session], anchor: NaiveDate, tz: Tz) -> Vec<CalendarDay> {
    layout(month_grid_days(anchor), anchor, sessions, tz)
}
