//! Todo lines from an event list the caller already prepared

use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, warn};
use serde::Deserialize;

use super::builder::{format_line, TodoListBuilder};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadEvent {
    /// Start, milliseconds since the unix epoch
    pub time: i64,
    pub time_label: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Parse the JSON array and bucket it by local date.
///
/// A payload that doesn't parse gives an empty list, the render still goes ahead.
pub fn todolist_from_payload(raw: &str, now: &DateTime<Tz>) -> Vec<String> {
    let mut events: Vec<PayloadEvent> = match serde_json::from_str(raw) {
        Ok(events) => events,
        Err(e) => {
            warn!("Ignoring malformed calendar payload: {e}");
            return Vec::new();
        }
    };
    debug!("Calendar payload carries {} events", events.len());
    events.sort_by_key(|e| e.time);

    let tz = now.timezone();
    let mut builder = TodoListBuilder::new(now.date_naive()).suppress_repeats();
    for event in &events {
        let Some(start) = DateTime::from_timestamp_millis(event.time) else {
            warn!("Skipping payload event with out of range time {}", event.time);
            continue;
        };
        let location = event.location.as_deref().filter(|l| !l.is_empty());
        let line = format_line(&event.time_label, &event.title, location);
        builder.push(start.with_timezone(&tz).date_naive(), line);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DEFAULT_TZ;
    use chrono::TimeZone;

    fn now() -> DateTime<Tz> {
        DEFAULT_TZ.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap()
    }

    fn ms(day: u32, h: u32) -> i64 {
        DEFAULT_TZ
            .with_ymd_and_hms(2024, 1, day, h, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn buckets_and_dedups() {
        let raw = format!(
            r#"[
                {{"time": {t3}, "timeLabel": "08:00", "title": "Gym"}},
                {{"time": {t1}, "timeLabel": "09:00", "title": "Standup", "location": "A1"}},
                {{"time": {t1}, "timeLabel": "09:00", "title": "Standup", "location": "A1"}},
                {{"time": {t2}, "timeLabel": "全天", "title": "Trip", "location": ""}}
            ]"#,
            t1 = ms(5, 9),
            t2 = ms(5, 23),
            t3 = ms(6, 8),
        );
        let lines = todolist_from_payload(&raw, &now());
        assert_eq!(lines, vec!["09:00 Standup(A1)", "全天 Trip", "", "08:00 Gym"]);
    }

    #[test]
    fn only_future_days_has_no_leading_separator() {
        let raw = format!(r#"[{{"time": {}, "timeLabel": "10:00", "title": "x"}}]"#, ms(7, 10));
        assert_eq!(todolist_from_payload(&raw, &now()), vec!["10:00 x"]);
    }

    #[test]
    fn malformed_payload_is_empty() {
        assert!(todolist_from_payload("{not json", &now()).is_empty());
        assert!(todolist_from_payload(r#"[{"time": 1}]"#, &now()).is_empty());
        assert!(todolist_from_payload("[]", &now()).is_empty());
    }
}
