//! Session classification and filtering.
//!
//! Every function here is a pure function of its inputs. The evaluation
//! instant `now` is always passed in, so results are reproducible for a
//! frozen clock.
//!
//! Three different notions of "status" live side by side:
//! - [`Tab`] partitions sessions into upcoming (including live) and past.
//! - [`StatusFilter`] is a three-way filter that cannot select a live session.
//! - [`SessionStatus`] is the four-way classification used for grouping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Session, SessionType};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Upcoming,
    Past,
}

impl Tab {
    /// Cancellation wins over timing: a cancelled session is always `Past`.
    pub fn contains(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match self {
            Tab::Upcoming => !session.is_cancelled && now <= session.ends_at,
            Tab::Past => now > session.ends_at || session.is_cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Upcoming,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Upcoming,
        SessionStatus::InProgress,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
    ];

    pub fn at(session: &Session, now: DateTime<Utc>) -> Self {
        if session.is_cancelled {
            SessionStatus::Cancelled
        } else if now < session.starts_at {
            SessionStatus::Upcoming
        } else if now <= session.ends_at {
            SessionStatus::InProgress
        } else {
            SessionStatus::Completed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Upcoming => "upcoming",
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Upcoming,
    Completed,
    Cancelled,
}

impl StatusFilter {
    /// A live session matches none of the variants.
    pub fn matches(&self, session: &Session, now: DateTime<Utc>) -> bool {
        match self {
            StatusFilter::Upcoming => !session.is_cancelled && now < session.starts_at,
            StatusFilter::Completed => !session.is_cancelled && now > session.ends_at,
            StatusFilter::Cancelled => session.is_cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CapacityFilter {
    Available,
    Full,
    Waitlist,
}

impl CapacityFilter {
    pub fn matches(&self, session: &Session) -> bool {
        let open = session.available_spots() > 0;
        match self {
            CapacityFilter::Available => open,
            CapacityFilter::Full => !open && !session.has_waitlist(),
            CapacityFilter::Waitlist => !open && session.has_waitlist(),
        }
    }
}

/// Bounds on `startsAt`, both exclusive. `endsAt` is never consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, starts_at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| starts_at > start)
            && self.end.is_none_or(|end| starts_at < end)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilters {
    pub search_term: Option<String>,
    pub date_range: DateRange,
    pub class_type: Option<SessionType>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub status: Option<StatusFilter>,
    pub capacity: Option<CapacityFilter>,
}

impl SessionFilters {
    /// Number of active constraints, as shown on the filter panel badge.
    pub fn active_count(&self) -> usize {
        [
            self.search_term().is_some(),
            self.date_range != DateRange::default(),
            self.class_type.is_some(),
            self.instructor.is_some(),
            self.location.is_some(),
            self.status.is_some(),
            self.capacity.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    fn search_term(&self) -> Option<String> {
        self.search_term
            .as_deref()
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

fn matches_search(session: &Session, term: &str) -> bool {
    session.name.to_lowercase().contains(term)
        || session
            .description
            .as_deref()
            .is_some_and(|desc| desc.to_lowercase().contains(term))
        || session.teacher.full_name().to_lowercase().contains(term)
}

/// Returns the sessions of `tab` that pass every filter, in input order.
pub fn compute_visible_sessions(
    sessions: &[Session],
    tab: Tab,
    filters: &SessionFilters,
    now: DateTime<Utc>,
) -> Vec<Session> {
    let mut visible: Vec<Session> = sessions
        .iter()
        .filter(|session| tab.contains(session, now))
        .cloned()
        .collect();

    if let Some(term) = filters.search_term() {
        visible.retain(|s| matches_search(s, &term));
    }
    visible.retain(|s| filters.date_range.contains(s.starts_at));
    if let Some(class_type) = filters.class_type {
        visible.retain(|s| s.session_type == class_type);
    }
    if let Some(instructor) = &filters.instructor {
        visible.retain(|s| s.teacher.full_name() == *instructor);
    }
    if let Some(location) = &filters.location {
        visible.retain(|s| s.location_name() == Some(location.as_str()));
    }
    if let Some(status) = filters.status {
        visible.retain(|s| status.matches(s, now));
    }
    if let Some(capacity) = filters.capacity {
        visible.retain(|s| capacity.matches(s));
    }

    visible
}

/// Badge counts over the unfiltered session set.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounts {
    pub in_progress: usize,
    pub upcoming: usize,
    pub past: usize,
}

impl SessionCounts {
    pub fn compute(sessions: &[Session], now: DateTime<Utc>) -> Self {
        sessions
            .iter()
            .fold(SessionCounts::default(), |mut counts, session| {
                match SessionStatus::at(session, now) {
                    SessionStatus::InProgress => counts.in_progress += 1,
                    SessionStatus::Upcoming => counts.upcoming += 1,
                    SessionStatus::Completed | SessionStatus::Cancelled => counts.past += 1,
                }
                counts
            })
    }

    /// Size of the "Upcoming & Live" tab.
    pub fn upcoming_tab(&self) -> usize {
        self.upcoming + self.in_progress
    }

    pub fn past_tab(&self) -> usize {
        self.past
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    StartsAt,
    Name,
    BookingCount,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Stable sort: ties keep their input order in both directions.
pub fn sort_sessions(sessions: &mut [Session], key: SortKey, order: SortOrder) {
    sessions.sort_by(|a, b| {
        let ordering = match key {
            SortKey::StartsAt => a.starts_at.cmp(&b.starts_at),
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::BookingCount => a.booking_count.cmp(&b.booking_count),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Status,
    Instructor,
    Type,
    Location,
    Date,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct SessionGroup {
    pub key: String,
    pub sessions: Vec<Session>,
}

const ONLINE_GROUP: &str = "Online";

fn group_key(session: &Session, group_by: GroupBy, now: DateTime<Utc>, tz: Tz) -> String {
    match group_by {
        GroupBy::Status => SessionStatus::at(session, now).as_str().to_string(),
        GroupBy::Instructor => session.teacher.full_name(),
        GroupBy::Type => session.session_type.as_str().to_string(),
        GroupBy::Location => session.location_name().unwrap_or(ONLINE_GROUP).to_string(),
        GroupBy::Date => session
            .starts_at
            .with_timezone(&tz)
            .format("%b %d, %Y")
            .to_string(),
    }
}

/// Buckets sessions for board and calendar layouts.
///
/// Status buckets come out in lifecycle order, other buckets in order of
/// first appearance. Empty buckets are omitted. Each bucket is ordered by
/// start time.
pub fn group_sessions(
    sessions: &[Session],
    group_by: GroupBy,
    now: DateTime<Utc>,
    tz: Tz,
) -> Vec<SessionGroup> {
    let mut groups: Vec<SessionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for session in sessions {
        let key = group_key(session, group_by, now, tz);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(SessionGroup {
                key,
                sessions: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].sessions.push(session.clone());
    }

    for group in &mut groups {
        group.sessions.sort_by_key(|s| s.starts_at);
    }

    if group_by == GroupBy::Status {
        groups.sort_by_key(|group| {
            SessionStatus::ALL
                .iter()
                .position(|status| status.as_str() == group.key)
                .unwrap_or(usize::MAX)
        });
    }

    groups
}

/// Distinct values offered by the filter panel, in first-seen order.
#[derive(Debug, Clone, Default, Serialize, PartialEq, ToSchema)]
pub struct FilterOptions {
    pub types: Vec<SessionType>,
    pub instructors: Vec<String>,
    pub locations: Vec<String>,
}

impl FilterOptions {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let mut options = FilterOptions::default();
        for session in sessions {
            push_unique(&mut options.types, session.session_type);
            push_unique(&mut options.instructors, session.teacher.full_name());
            if let Some(location) = session.location_name() {
                push_unique(&mut options.locations, location.to_string());
            }
        }
        options
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Session>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slices out 1-based page `page` of `per_page` items.
pub fn paginate(sessions: Vec<Session>, page: usize, per_page: usize) -> Page {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_items = sessions.len();
    let total_pages = total_items.div_ceil(per_page);
    let items = sessions
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();
    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}
