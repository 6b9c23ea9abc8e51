use arrayvec::ArrayString;
use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;
use core::fmt::Write;

use super::CalendarEvent;
use crate::time::epoch_to_local;

/// Marks the place where a day separator rule is drawn
pub const SEPARATOR: &str = "";

/// Accumulates todo lines, inserting a separator whenever the day changes.
///
/// Days are compared as full local dates. The list never starts with a separator and never
/// holds two in a row.
#[derive(Debug, Clone)]
pub struct TodoListBuilder {
    lines: Vec<String>,
    current_day: NaiveDate,
    suppress_repeats: bool,
}

impl TodoListBuilder {
    /// `today` seeds the day cursor, so lines for today get no leading separator
    pub fn new(today: NaiveDate) -> Self {
        Self {
            lines: Vec::new(),
            current_day: today,
            suppress_repeats: false,
        }
    }

    /// Drop a line identical to the one right before it
    pub fn suppress_repeats(mut self) -> Self {
        self.suppress_repeats = true;
        self
    }

    pub fn push(&mut self, day: NaiveDate, line: String) {
        if day != self.current_day {
            if self.lines.last().is_some_and(|last| last != SEPARATOR) {
                self.lines.push(SEPARATOR.to_string());
            }
            self.current_day = day;
        }
        if self.suppress_repeats && self.lines.last() == Some(&line) {
            return;
        }
        self.lines.push(line);
    }

    pub fn finish(self) -> Vec<String> {
        self.lines
    }
}

pub fn time_label(time: &DateTime<Tz>) -> ArrayString<5> {
    let mut label = ArrayString::new();
    // two zero padded fields always fit
    let _ = write!(label, "{:02}:{:02}", time.hour(), time.minute());
    label
}

/// `"<time> <summary>"` with `"(<location>)"` appended when known
pub fn format_line(time_label: &str, summary: &str, location: Option<&str>) -> String {
    let mut line = format!("{time_label} {summary}");
    if let Some(location) = location {
        line.push('(');
        line.push_str(location);
        line.push(')');
    }
    line
}

/// Sort events by start and turn the ones with a summary and a known start into lines
pub fn todolist_from_events(mut events: Vec<CalendarEvent>, now: &DateTime<Tz>) -> Vec<String> {
    let tz = now.timezone();
    events.sort_by_key(CalendarEvent::sort_key);

    let mut builder = TodoListBuilder::new(now.date_naive());
    for event in &events {
        let (Some(summary), Some(ts)) = (event.summary(), event.timestamp()) else {
            continue;
        };
        let Some(start) = epoch_to_local(ts, tz) else {
            continue;
        };
        let line = format_line(&time_label(&start), summary, event.location());
        builder.push(start.date_naive(), line);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{local_to_epoch, DEFAULT_TZ};
    use crate::todolist::EventStart;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Tz> {
        DEFAULT_TZ.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> i64 {
        let naive = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap();
        local_to_epoch(&naive, DEFAULT_TZ).unwrap()
    }

    fn event(summary: &str, ts: i64) -> CalendarEvent {
        CalendarEvent::new(Some(summary.to_string()), Some(EventStart::Timestamp(ts)), None)
    }

    #[test]
    fn three_today_one_tomorrow() {
        let events = vec![
            event("D+1 early", at(6, 8, 0)),
            event("Noon", at(5, 12, 0)),
            event("Morning", at(5, 9, 0)),
            event("Afternoon", at(5, 15, 0)),
        ];
        let lines = todolist_from_events(events, &now());
        assert_eq!(
            lines,
            vec![
                "09:00 Morning",
                "12:00 Noon",
                "15:00 Afternoon",
                "",
                "08:00 D+1 early",
            ]
        );
    }

    #[test]
    fn first_day_later_than_today_gets_no_leading_separator() {
        let lines = todolist_from_events(vec![event("Later", at(8, 10, 30))], &now());
        assert_eq!(lines, vec!["10:30 Later"]);
    }

    #[test]
    fn location_is_appended() {
        let events = vec![CalendarEvent::new(
            Some("Sync".to_string()),
            Some(EventStart::Timestamp(at(5, 14, 5))),
            Some("Room 2".to_string()),
        )];
        assert_eq!(todolist_from_events(events, &now()), vec!["14:05 Sync(Room 2)"]);
    }

    #[test]
    fn events_without_summary_or_start_are_skipped() {
        let events = vec![
            CalendarEvent::error("REPORT request failed, HTTP status code: 500"),
            CalendarEvent::new(None, Some(EventStart::Timestamp(at(5, 9, 0))), None),
            CalendarEvent::new(Some("Raw".to_string()), Some(EventStart::Raw("x".to_string())), None),
        ];
        assert!(todolist_from_events(events, &now()).is_empty());
    }

    #[test]
    fn protocol_path_keeps_repeats() {
        let events = vec![event("Same", at(5, 9, 0)), event("Same", at(5, 9, 0))];
        assert_eq!(todolist_from_events(events, &now()).len(), 2);
    }

    #[test]
    fn repeat_suppression() {
        let today = now().date_naive();
        let mut builder = TodoListBuilder::new(today).suppress_repeats();
        builder.push(today, "a".to_string());
        builder.push(today, "a".to_string());
        builder.push(today, "b".to_string());
        assert_eq!(builder.finish(), vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn separators_never_lead_or_double(days in proptest::collection::vec(0u32..6, 0..40)) {
            let today = now().date_naive();
            let mut sorted = days.clone();
            sorted.sort_unstable();
            let mut builder = TodoListBuilder::new(today);
            for (i, d) in sorted.iter().enumerate() {
                builder.push(today + chrono::Days::new(u64::from(*d)), format!("line {i}"));
            }
            let lines = builder.finish();
            prop_assert!(lines.first().map_or(true, |l| l != SEPARATOR));
            for pair in lines.windows(2) {
                prop_assert!(!(pair[0] == SEPARATOR && pair[1] == SEPARATOR));
            }
            prop_assert_eq!(lines.iter().filter(|l| *l != SEPARATOR).count(), days.len());
        }
    }
}
