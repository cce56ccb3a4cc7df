use icalendar::{Calendar, Component, Event, EventLike, EventStatus};

use crate::models::Session;

#[derive(Clone)]
pub struct ICalExporter {
    calendar_name: String,
}

impl Default for ICalExporter {
    fn default() -> Self {
        Self::new("Studio Class Schedule")
    }
}

impl ICalExporter {
    pub fn new(calendar_name: impl Into<String>) -> Self {
        Self {
            calendar_name: calendar_name.into(),
        }
    }

    pub fn generate(&self, sessions: &[Session]) -> Vec<u8> {
        if sessions.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(&self.calendar_name);

        for session in sessions {
            let mut event = Event::new();
            event.summary(&session.name);
            event.starts(session.starts_at);
            event.ends(session.ends_at);
            event.location(session.location_name().unwrap_or("Online"));

            let mut description = format!(
                "Instructor: {}\nBooked: {}/{}",
                session.teacher.full_name(),
                session.booking_count,
                session.capacity
            );
            if let Some(details) = &session.description {
                description.push_str("\n\n");
                description.push_str(details);
            }
            event.description(&description);
            event.uid(&format!("momence-session-{}@studio-schedule", session.id));
            if session.is_cancelled {
                event.status(EventStatus::Cancelled);
            }
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
