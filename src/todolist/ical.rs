//! Lenient reader for the VEVENT blocks embedded in calendar query responses
//!
//! Only the properties the todo list needs are kept. Nothing in here fails: values that
//! can't be interpreted stay raw and the block is still turned into an event.

use chrono::NaiveDateTime;
use chrono_tz::Tz;

use super::{CalendarEvent, EventStart};
use crate::time::{local_to_epoch, parse_tz};

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

#[derive(Default)]
struct PendingEvent {
    seen_any: bool,
    summary: Option<String>,
    start: Option<EventStart>,
    location: Option<String>,
}

impl PendingEvent {
    fn finish(self) -> Option<CalendarEvent> {
        self.seen_any
            .then(|| CalendarEvent::new(self.summary, self.start, self.location))
    }
}

/// Parse every VEVENT in an iCalendar text block.
///
/// `local_tz` resolves TZID parameters naming a zone we don't know.
pub fn parse_events(data: &str, local_tz: Tz) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut pending: Option<PendingEvent> = None;
    // nesting inside the current VEVENT, VALARM and friends
    let mut depth = 0_u32;

    for line in unfold(data) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(component) = strip_prefix_ignore_case(line, "BEGIN:") {
            if component.eq_ignore_ascii_case("VEVENT") && pending.is_none() {
                pending = Some(PendingEvent::default());
                depth = 0;
            } else if pending.is_some() {
                depth += 1;
            }
            continue;
        }

        if let Some(component) = strip_prefix_ignore_case(line, "END:") {
            if pending.is_some() {
                if depth > 0 {
                    depth -= 1;
                } else if component.eq_ignore_ascii_case("VEVENT") {
                    if let Some(event) = pending.take().and_then(PendingEvent::finish) {
                        events.push(event);
                    }
                }
            }
            continue;
        }

        let Some(event) = pending.as_mut() else {
            continue;
        };
        if depth > 0 {
            continue;
        }
        let Some(property) = Property::parse(line) else {
            continue;
        };

        event.seen_any = true;
        match property.name.to_ascii_uppercase().as_str() {
            "SUMMARY" => event.summary = Some(unescape_text(property.value)),
            "LOCATION" => event.location = Some(unescape_text(property.value)),
            "DTSTART" => event.start = Some(parse_start(&property, local_tz)),
            _ => {}
        }
    }

    events
}

/// Join folded lines: a line starting with a space or tab continues the previous one
fn unfold(data: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in data.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(previous)) => previous.push_str(rest),
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| line[prefix.len()..].trim())
}

struct Property<'a> {
    name: &'a str,
    params: Vec<(&'a str, &'a str)>,
    value: &'a str,
}

impl<'a> Property<'a> {
    /// `NAME[;PARAM=value...]:VALUE`, colons inside quoted parameter values don't split
    fn parse(line: &'a str) -> Option<Self> {
        let mut in_quotes = false;
        let split = line.char_indices().find_map(|(idx, c)| match c {
            '"' => {
                in_quotes = !in_quotes;
                None
            }
            ':' if !in_quotes => Some(idx),
            _ => None,
        })?;

        let (head, value) = (&line[..split], &line[split + 1..]);
        let mut parts = head.split(';');
        let name = parts.next()?.trim();
        if name.is_empty() {
            return None;
        }
        let params = parts
            .filter_map(|p| p.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim().trim_matches('"')))
            .collect();
        Some(Self {
            name,
            params,
            value,
        })
    }

    fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }
}

fn parse_start(property: &Property<'_>, local_tz: Tz) -> EventStart {
    let value = property.value.trim();

    if let Some(tzid) = property.param("TZID") {
        let tz = parse_tz(tzid.trim_start_matches('/'), local_tz);
        return NaiveDateTime::parse_from_str(value, LOCAL_FORMAT)
            .ok()
            .and_then(|naive| local_to_epoch(&naive, tz))
            .map(EventStart::Timestamp)
            .unwrap_or_else(|| EventStart::Raw(value.to_string()));
    }

    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(utc, LOCAL_FORMAT) {
            return EventStart::Timestamp(naive.and_utc().timestamp());
        }
    }

    EventStart::Raw(value.to_string())
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push(' '),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DEFAULT_TZ;
    use chrono::NaiveDate;

    fn shanghai_ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
            .timestamp()
            - 8 * 3600
    }

    #[test]
    fn parses_basic_block() {
        let data = "BEGIN:VCALENDAR\r\n\
                    BEGIN:VEVENT\r\n\
                    DTSTART;TZID=Asia/Shanghai:20240105T090000\r\n\
                    SUMMARY:Standup\r\n\
                    LOCATION:Room 4\r\n\
                    END:VEVENT\r\n\
                    END:VCALENDAR\r\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.summary(), Some("Standup"));
        assert_eq!(event.location(), Some("Room 4"));
        assert_eq!(event.timestamp(), Some(shanghai_ts(2024, 1, 5, 9, 0)));
    }

    #[test]
    fn continuation_lines_extend_previous_value() {
        let data = "BEGIN:VEVENT\n\
                    SUMMARY:Quarterly planning with\n \
                    the whole team\n\
                    DTSTART:20240105T010000Z\n\
                    END:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events[0].summary(), Some("Quarterly planning withthe whole team"));
        assert_eq!(
            events[0].timestamp(),
            Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(1, 0, 0).unwrap().and_utc().timestamp())
        );
    }

    #[test]
    fn unparseable_tz_value_stays_raw() {
        let data = "BEGIN:VEVENT\nSUMMARY:Odd\nDTSTART;TZID=Asia/Shanghai:tomorrow-ish\nEND:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events[0].start(), Some(&EventStart::Raw("tomorrow-ish".to_string())));
        assert_eq!(events[0].sort_key(), 0);
    }

    #[test]
    fn all_day_value_without_tz_stays_raw() {
        let data = "BEGIN:VEVENT\nSUMMARY:Holiday\nDTSTART;VALUE=DATE:20240105\nEND:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events[0].start(), Some(&EventStart::Raw("20240105".to_string())));
    }

    #[test]
    fn unknown_zone_uses_local_zone() {
        let data = "BEGIN:VEVENT\nDTSTART;TZID=\"China Standard Time\":20240105T090000\nSUMMARY:x\nEND:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events[0].timestamp(), Some(shanghai_ts(2024, 1, 5, 9, 0)));
    }

    #[test]
    fn nested_alarm_does_not_override_summary() {
        let data = "BEGIN:VEVENT\n\
                    SUMMARY:Dentist\n\
                    BEGIN:VALARM\n\
                    SUMMARY:Reminder\n\
                    END:VALARM\n\
                    END:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), Some("Dentist"));
    }

    #[test]
    fn multiple_events_and_escapes() {
        let data = "BEGIN:VEVENT\nSUMMARY:Lunch\\, then coffee\nEND:VEVENT\n\
                    BEGIN:VEVENT\nSUMMARY:Second\nEND:VEVENT\n\
                    BEGIN:VEVENT\nEND:VEVENT\n";
        let events = parse_events(data, DEFAULT_TZ);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary(), Some("Lunch, then coffee"));
        assert_eq!(events[1].summary(), Some("Second"));
    }

    #[test]
    fn lines_outside_events_are_ignored() {
        let events = parse_events("SUMMARY:stray\nBEGIN:VTODO\nEND:VTODO\n", DEFAULT_TZ);
        assert!(events.is_empty());
    }
}
