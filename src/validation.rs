use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::engine::{DateRange, GroupBy, SessionFilters, SortKey, SortOrder, Tab};
use crate::error::ApiError;
use crate::models::NewMember;

pub const MAX_PER_PAGE: usize = 100;
pub const DEFAULT_PER_PAGE: usize = 10;

/// Raw query string shared by the session listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub token: Option<String>,
    pub tab: Option<String>,
    pub search: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub class_type: Option<String>,
    pub instructor: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub capacity: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub group_by: Option<String>,
    pub date: Option<String>,
}

/// Empty strings and the exact value "all" mean the filter is off.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty() && *v != "all")
}

/// Parses `value` as one of the serde names of `T`.
fn parse_choice<T: DeserializeOwned>(name: &str, value: &str) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {value}")))
}

fn parse_optional<T: DeserializeOwned>(name: &str, value: &Option<String>) -> Result<Option<T>, ApiError> {
    present(value).map(|v| parse_choice(name, v)).transpose()
}

/// Accepts RFC 3339 instants or plain dates (midnight UTC).
pub fn parse_instant(name: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_date(name, value).map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

pub fn parse_date(name: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {value}")))
}

pub fn validate_per_page(value: usize) -> Result<usize, ApiError> {
    if (1..=MAX_PER_PAGE).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )))
    }
}

pub fn validate_page(value: usize) -> Result<usize, ApiError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ApiError::BadRequest("page must be 1 or greater".into()))
    }
}

pub fn validate_new_member(member: &NewMember) -> Result<(), ApiError> {
    if member.first_name.trim().is_empty() || member.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest("first and last name are required".into()));
    }
    match member.email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::BadRequest("a valid email is required".into())),
    }
}

impl SessionQuery {
    pub fn tab(&self) -> Result<Tab, ApiError> {
        Ok(parse_optional("tab", &self.tab)?.unwrap_or_default())
    }

    pub fn filters(&self) -> Result<SessionFilters, ApiError> {
        let date_range = DateRange {
            start: present(&self.start)
                .map(|v| parse_instant("start", v))
                .transpose()?,
            end: present(&self.end)
                .map(|v| parse_instant("end", v))
                .transpose()?,
        };
        Ok(SessionFilters {
            search_term: present(&self.search).map(str::to_string),
            date_range,
            class_type: parse_optional("type", &self.class_type)?,
            instructor: present(&self.instructor).map(str::to_string),
            location: present(&self.location).map(str::to_string),
            status: parse_optional("status", &self.status)?,
            capacity: parse_optional("capacity", &self.capacity)?,
        })
    }

    pub fn sort(&self) -> Result<(SortKey, SortOrder), ApiError> {
        Ok((
            parse_optional("sort", &self.sort)?.unwrap_or_default(),
            parse_optional("order", &self.order)?.unwrap_or_default(),
        ))
    }

    pub fn pagination(&self) -> Result<(usize, usize), ApiError> {
        let page = validate_page(self.page.unwrap_or(1))?;
        let per_page = validate_per_page(self.per_page.unwrap_or(DEFAULT_PER_PAGE))?;
        Ok((page, per_page))
    }

    pub fn group_by(&self) -> Result<GroupBy, ApiError> {
        Ok(parse_optional("group_by", &self.group_by)?.unwrap_or_default())
    }

    pub fn anchor_date(&self, today: NaiveDate) -> Result<NaiveDate, ApiError> {
        present(&self.date)
            .map(|v| parse_date("date", v))
            .transpose()
            .map(|date| date.unwrap_or(today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CapacityFilter, StatusFilter};
    use crate::models::SessionType;

    fn query() -> SessionQuery {
        SessionQuery::default()
    }

    #[test]
    fn test_empty_query_is_unfiltered() {
        let q = query();
        assert_eq!(q.tab().unwrap(), Tab::Upcoming);
        assert!(q.filters().unwrap().is_empty());
        assert_eq!(q.sort().unwrap(), (SortKey::StartsAt, SortOrder::Asc));
        assert_eq!(q.pagination().unwrap(), (1, DEFAULT_PER_PAGE));
        assert_eq!(q.group_by().unwrap(), GroupBy::Status);
    }

    #[test]
    fn test_all_and_blank_disable_filters() {
        let q = SessionQuery {
            status: Some("all".to_string()),
            capacity: Some("all".to_string()),
            instructor: Some(String::new()),
            ..query()
        };
        assert!(q.filters().unwrap().is_empty());
    }

    #[test]
    fn test_all_is_matched_exactly() {
        let q = SessionQuery {
            search: Some("All".to_string()),
            location: Some("ALL".to_string()),
            ..query()
        };
        let filters = q.filters().unwrap();
        assert_eq!(filters.search_term.as_deref(), Some("All"));
        assert_eq!(filters.location.as_deref(), Some("ALL"));

        let status = SessionQuery {
            status: Some("ALL".to_string()),
            ..query()
        };
        assert!(status.filters().is_err());
    }

    #[test]
    fn test_parses_enum_filters() {
        let q = SessionQuery {
            tab: Some("past".to_string()),
            class_type: Some("private".to_string()),
            status: Some("cancelled".to_string()),
            capacity: Some("waitlist".to_string()),
            sort: Some("bookingCount".to_string()),
            order: Some("desc".to_string()),
            ..query()
        };
        let filters = q.filters().unwrap();
        assert_eq!(q.tab().unwrap(), Tab::Past);
        assert_eq!(filters.class_type, Some(SessionType::Private));
        assert_eq!(filters.status, Some(StatusFilter::Cancelled));
        assert_eq!(filters.capacity, Some(CapacityFilter::Waitlist));
        assert_eq!(q.sort().unwrap(), (SortKey::BookingCount, SortOrder::Desc));
    }

    #[test]
    fn test_in_progress_is_not_a_status_filter() {
        let q = SessionQuery {
            status: Some("in-progress".to_string()),
            ..query()
        };
        assert!(q.filters().is_err());
    }

    #[test]
    fn test_date_bounds() {
        let q = SessionQuery {
            start: Some("2025-01-10".to_string()),
            end: Some("2025-01-11T12:00:00+05:30".to_string()),
            ..query()
        };
        let range = q.filters().unwrap().date_range;
        assert_eq!(range.start.unwrap().to_rfc3339(), "2025-01-10T00:00:00+00:00");
        assert_eq!(range.end.unwrap().to_rfc3339(), "2025-01-11T06:30:00+00:00");

        let bad = SessionQuery {
            start: Some("10/01/2025".to_string()),
            ..query()
        };
        assert!(bad.filters().is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(validate_per_page(0).is_err());
        assert!(validate_per_page(1).is_ok());
        assert!(validate_per_page(100).is_ok());
        assert!(validate_per_page(101).is_err());
        assert!(validate_page(0).is_err());
    }

    #[test]
    fn test_validate_new_member() {
        let mut member = NewMember {
            email: "priya@gmail.com".to_string(),
            first_name: "Priya".to_string(),
            last_name: "Shah".to_string(),
            phone_number: None,
            home_location_id: None,
        };
        assert!(validate_new_member(&member).is_ok());
        member.email = "priya".to_string();
        assert!(validate_new_member(&member).is_err());
        member.email = "priya@gmail.com".to_string();
        member.last_name = " ".to_string();
        assert!(validate_new_member(&member).is_err());
    }
}
