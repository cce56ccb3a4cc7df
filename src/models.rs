use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Fitness,
    Private,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Fitness => "fitness",
            SessionType::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

impl Teacher {
    /// "first last", the form used for display, search and instructor filtering.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Location {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub is_customer_badge: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(value_type = String, format = "date-time", example = "2025-01-10T09:00:00Z")]
    pub starts_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", example = "2025-01-10T10:00:00Z")]
    pub ends_at: DateTime<Utc>,
    pub duration_in_minutes: u32,
    pub capacity: i64,
    pub booking_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_booking_count: Option<i64>,
    pub teacher: Teacher,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_teachers: Vec<Teacher>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub is_in_person: bool,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_person_location: Option<Location>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Session {
    /// Spots left before the session is full. Negative when overbooked.
    pub fn available_spots(&self) -> i64 {
        self.capacity - self.booking_count
    }

    pub fn has_waitlist(&self) -> bool {
        self.waitlist_capacity.is_some_and(|cap| cap > 0)
    }

    pub fn location_name(&self) -> Option<&str> {
        self.in_person_location.as_ref().map(|loc| loc.name.as_str())
    }
}

/// Full session record as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_teacher: Option<Teacher>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingMember {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_spot_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets_bought: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub member: BookingMember,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u32,
}

/// Paged envelope used by the booking API list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub payload: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};

    use super::*;

    pub fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    /// A one-hour fitness class with free spots, taught by Ana Lee.
    pub fn session(id: i64, name: &str, starts_at: &str, ends_at: &str) -> Session {
        let starts_at = at(starts_at);
        let ends_at = at(ends_at);
        Session {
            id,
            name: name.to_string(),
            session_type: SessionType::Fitness,
            description: None,
            starts_at,
            ends_at,
            duration_in_minutes: (ends_at - starts_at).num_minutes() as u32,
            capacity: 10,
            booking_count: 0,
            waitlist_capacity: None,
            waitlist_booking_count: None,
            teacher: Teacher {
                id: 1,
                first_name: "Ana".to_string(),
                last_name: "Lee".to_string(),
                picture_url: None,
            },
            additional_teachers: Vec::new(),
            is_recurring: false,
            is_cancelled: false,
            is_in_person: true,
            is_draft: false,
            in_person_location: None,
            tags: Vec::new(),
        }
    }
}
