//! Calendar events and their conversion into the todo lines printed next to the calendar

pub mod builder;
pub mod ical;
pub mod payload;

pub use builder::{todolist_from_events, TodoListBuilder, SEPARATOR};
pub use payload::todolist_from_payload;

/// Start of an event. Values we could not interpret are kept as they came.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStart {
    /// Seconds since the unix epoch
    Timestamp(i64),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    summary: Option<String>,
    start: Option<EventStart>,
    location: Option<String>,
}

impl CalendarEvent {
    pub fn new(
        summary: Option<String>,
        start: Option<EventStart>,
        location: Option<String>,
    ) -> Self {
        Self {
            summary: summary.filter(|s| !s.is_empty()),
            start,
            location: location.filter(|s| !s.is_empty()),
        }
    }

    /// Placeholder event reporting a failed calendar query
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Some(message.into()), None, None)
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn start(&self) -> Option<&EventStart> {
        self.start.as_ref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn timestamp(&self) -> Option<i64> {
        match self.start {
            Some(EventStart::Timestamp(ts)) => Some(ts),
            _ => None,
        }
    }

    /// Events without a usable start sort as if they started at the epoch
    pub fn sort_key(&self) -> i64 {
        self.timestamp().unwrap_or(0)
    }
}
