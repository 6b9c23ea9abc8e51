//! CalDAV backed event source
//!
//! Two flavours share the request bodies and response parsing:
//! - DingTalk: fixed server, calendars live under `/dav/<user>/`, the server ignores time
//!   filters so the window is applied after fetching.
//! - Generic (Google and other standard servers): configured URL, `Depth: 1` discovery,
//!   only resources typed as calendars count, the window goes into the query.

use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, info, warn};

use super::transport::{DavRequest, DavTransport};
use super::xml;
use super::{CalendarCollection, EventSource, TimeWindow};
use crate::error::{Error, Result};
use crate::todolist::ical::parse_events;
use crate::todolist::CalendarEvent;

pub const DINGTALK_BASE_URL: &str = "https://calendar.dingtalk.com";
/// Multi-Status
const MULTI_STATUS: u16 = 207;
/// Scheduling and notification collections, not calendars
const DINGTALK_SKIPPED: [&str; 3] = ["Outbox", "Inbox", "Notifications"];
const UNNAMED_CALENDAR: &str = "Unnamed Calendar";

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav" xmlns:cs="http://calendarserver.org/ns/">
  <d:prop>
    <d:resourcetype />
    <d:displayname />
    <c:supported-calendar-component-set />
    <cs:getctag />
  </d:prop>
</d:propfind>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavour {
    DingTalk,
    Generic,
}

pub struct CalDavSource {
    flavour: Flavour,
    base_url: String,
    /// Path of the calendar home set, relative to `base_url`
    home: String,
    transport: Box<dyn DavTransport>,
    local_tz: Tz,
    calendars: Option<Vec<CalendarCollection>>,
}

impl CalDavSource {
    pub fn dingtalk(username: &str, transport: Box<dyn DavTransport>, local_tz: Tz) -> Self {
        Self {
            flavour: Flavour::DingTalk,
            base_url: DINGTALK_BASE_URL.to_string(),
            home: format!("/dav/{username}/"),
            transport,
            local_tz,
            calendars: None,
        }
    }

    pub fn generic(url: &str, transport: Box<dyn DavTransport>, local_tz: Tz) -> Self {
        Self {
            flavour: Flavour::Generic,
            base_url: url.trim().trim_end_matches('/').to_string(),
            home: String::new(),
            transport,
            local_tz,
            calendars: None,
        }
    }

    fn collection_url(&self, href: &str) -> String {
        if self.flavour == Flavour::Generic && href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{href}", self.base_url)
        }
    }

    fn is_home_set(&self, href: &str) -> bool {
        href.trim_end_matches('/') == self.home.trim_end_matches('/')
    }

    fn parse_collections(&self, body: &str) -> Result<Vec<CalendarCollection>> {
        let mut calendars = Vec::new();
        for response in xml::multistatus_responses(body)? {
            let Some(href) = xml::first_text(response, "href")? else {
                continue;
            };
            let display_name = xml::first_text(response, "displayname")?;

            match self.flavour {
                Flavour::DingTalk => {
                    if self.is_home_set(&href) {
                        continue;
                    }
                    if display_name
                        .as_deref()
                        .is_some_and(|name| DINGTALK_SKIPPED.contains(&name))
                    {
                        continue;
                    }
                }
                Flavour::Generic => {
                    let Some(kinds) = xml::elements(response, "resourcetype")?.into_iter().next()
                    else {
                        continue;
                    };
                    if !xml::has_element(kinds, "calendar")? {
                        continue;
                    }
                }
            }

            calendars.push(CalendarCollection {
                href,
                display_name: display_name.unwrap_or_else(|| UNNAMED_CALENDAR.to_string()),
                ctag: xml::first_text(response, "getctag")?,
            });
        }
        Ok(calendars)
    }

    fn query_calendar(
        &self,
        calendar: &CalendarCollection,
        window: &TimeWindow,
    ) -> Result<Vec<CalendarEvent>> {
        let filter = match self.flavour {
            Flavour::DingTalk => None,
            Flavour::Generic => Some(window),
        };
        let request = DavRequest {
            method: "REPORT",
            url: self.collection_url(&calendar.href),
            depth: Some(1),
            body: calendar_query_body(filter),
        };
        let response = self.transport.send(&request)?;

        if response.status != MULTI_STATUS {
            warn!(
                "REPORT on {} answered with status {}",
                calendar.display_name, response.status
            );
            return Ok(vec![CalendarEvent::error(format!(
                "REPORT request failed, HTTP status code: {}",
                response.status
            ))]);
        }

        match parse_query_response(&response.body, self.local_tz) {
            Ok(events) => {
                debug!("{} events in {}", events.len(), calendar.display_name);
                Ok(events)
            }
            Err(e) => {
                warn!("Skipping calendar {}: {e}", calendar.display_name);
                Ok(Vec::new())
            }
        }
    }
}

impl EventSource for CalDavSource {
    fn discover(&mut self) -> Result<Vec<CalendarCollection>> {
        if let Some(calendars) = &self.calendars {
            return Ok(calendars.clone());
        }

        let (url, depth) = match self.flavour {
            Flavour::DingTalk => (format!("{}{}", self.base_url, self.home), None),
            Flavour::Generic => (self.base_url.clone(), Some(1)),
        };
        let request = DavRequest {
            method: "PROPFIND",
            url,
            depth,
            body: PROPFIND_BODY.to_string(),
        };
        let response = self.transport.send(&request)?;
        if response.status != MULTI_STATUS {
            return Err(Error::protocol(response.status, "calendar discovery"));
        }

        let calendars = self.parse_collections(&response.body)?;
        info!("Discovered {} calendars", calendars.len());
        self.calendars = Some(calendars.clone());
        Ok(calendars)
    }

    fn fetch_events(&mut self, window: &TimeWindow) -> Result<Vec<CalendarEvent>> {
        let calendars = self.discover()?;
        let mut events = Vec::new();
        for calendar in &calendars {
            events.extend(self.query_calendar(calendar, window)?);
        }

        if self.flavour == Flavour::DingTalk {
            events.retain(|event| event.timestamp().map_or(true, |ts| window.contains(ts)));
        }
        events.sort_by_key(CalendarEvent::sort_key);
        Ok(events)
    }

    fn close(&mut self) {
        self.calendars = None;
    }
}

fn calendar_query_body(window: Option<&TimeWindow>) -> String {
    let time_filter = window
        .map(|w| {
            format!(
                r#"<C:time-range start="{}" end="{}"/>"#,
                caldav_utc(w.start),
                caldav_utc(w.end)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data/>
  </D:prop>
  <C:filter>
    <C:comp-filter name="VCALENDAR">
      <C:comp-filter name="VEVENT">
        {time_filter}
      </C:comp-filter>
    </C:comp-filter>
  </C:filter>
</C:calendar-query>"#
    )
}

fn caldav_utc(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y%m%dT%H%M%SZ").to_string())
        .unwrap_or_default()
}

/// Events of every `calendar-data` block in a REPORT response
fn parse_query_response(body: &str, local_tz: Tz) -> Result<Vec<CalendarEvent>> {
    let mut events = Vec::new();
    for response in xml::multistatus_responses(body)? {
        for data in xml::elements(response, "calendar-data")? {
            events.extend(parse_events(&xml::unescape(data), local_tz));
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_source::DavResponse;
    use crate::time::DEFAULT_TZ;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeTransport {
        replies: RefCell<VecDeque<(u16, String)>>,
        sent: RefCell<Vec<DavRequest>>,
    }

    impl FakeTransport {
        fn reply(&self, status: u16, body: &str) {
            self.replies.borrow_mut().push_back((status, body.to_string()));
        }
    }

    struct Shared(Rc<FakeTransport>);

    impl DavTransport for Shared {
        fn send(&self, request: &DavRequest) -> Result<DavResponse> {
            self.0.sent.borrow_mut().push(request.clone());
            let (status, body) = self
                .0
                .replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| Error::Parse("no reply queued".to_string()))?;
            Ok(DavResponse { status, body })
        }
    }

    const DINGTALK_DISCOVERY: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/">
  <d:response><d:href>/dav/bob/</d:href></d:response>
  <d:response>
    <d:href>/dav/bob/primary/</d:href>
    <d:propstat><d:prop><d:displayname>Primary</d:displayname><cs:getctag>7</cs:getctag></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/bob/inbox/</d:href>
    <d:propstat><d:prop><d:displayname>Inbox</d:displayname></d:prop></d:propstat>
  </d:response>
  <d:response><d:href>/dav/bob/nameless/</d:href></d:response>
</d:multistatus>"#;

    const GENERIC_DISCOVERY: &str = r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/cal/</d:href>
    <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>https://other.example.org/cal/home/</d:href>
    <d:propstat><d:prop>
      <d:displayname>Home</d:displayname>
      <d:resourcetype><d:collection/><c:calendar/></d:resourcetype>
    </d:prop></d:propstat>
  </d:response>
</d:multistatus>"#;

    fn report(events: &[(&str, &str)]) -> String {
        let mut body = String::from(r#"<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">"#);
        for (summary, start) in events {
            body.push_str(&format!(
                "<d:response><d:propstat><d:prop><c:calendar-data>BEGIN:VCALENDAR\n\
                 BEGIN:VEVENT\nSUMMARY:{summary}\nDTSTART;TZID=Asia/Shanghai:{start}\nEND:VEVENT\n\
                 END:VCALENDAR\n</c:calendar-data></d:prop></d:propstat></d:response>"
            ));
        }
        body.push_str("</d:multistatus>");
        body
    }

    fn window() -> TimeWindow {
        let now = DEFAULT_TZ.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap();
        TimeWindow::lookahead(&now, 7)
    }

    #[test]
    fn dingtalk_discovery_skips_home_and_scheduling_collections() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, DINGTALK_DISCOVERY);
        let mut source = CalDavSource::dingtalk("bob", Box::new(Shared(fake.clone())), DEFAULT_TZ);

        let calendars = source.discover().unwrap();
        assert_eq!(
            calendars,
            vec![
                CalendarCollection {
                    href: "/dav/bob/primary/".to_string(),
                    display_name: "Primary".to_string(),
                    ctag: Some("7".to_string()),
                },
                CalendarCollection {
                    href: "/dav/bob/nameless/".to_string(),
                    display_name: UNNAMED_CALENDAR.to_string(),
                    ctag: None,
                },
            ]
        );

        let sent = fake.sent.borrow();
        assert_eq!(sent[0].method, "PROPFIND");
        assert_eq!(sent[0].url, "https://calendar.dingtalk.com/dav/bob/");
        assert_eq!(sent[0].depth, None);

        // remembered until closed
        drop(sent);
        assert_eq!(source.discover().unwrap().len(), 2);
        assert_eq!(fake.sent.borrow().len(), 1);
    }

    #[test]
    fn generic_discovery_keeps_only_calendars() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, GENERIC_DISCOVERY);
        let mut source = CalDavSource::generic(
            "https://example.org/dav/",
            Box::new(Shared(fake.clone())),
            DEFAULT_TZ,
        );
        let calendars = source.discover().unwrap();
        assert_eq!(calendars.len(), 1);
        assert_eq!(calendars[0].display_name, "Home");
        assert_eq!(fake.sent.borrow()[0].url, "https://example.org/dav");
        assert_eq!(fake.sent.borrow()[0].depth, Some(1));
    }

    #[test]
    fn discovery_status_is_protocol_error() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(401, "");
        let mut source = CalDavSource::dingtalk("bob", Box::new(Shared(fake)), DEFAULT_TZ);
        assert!(matches!(
            source.discover(),
            Err(Error::Protocol { status: 401, .. })
        ));
    }

    #[test]
    fn dingtalk_filters_window_client_side() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, DINGTALK_DISCOVERY);
        fake.reply(
            207,
            &report(&[
                ("Late", "20240106T150000"),
                ("Past", "20231220T090000"),
                ("Early", "20240105T090000"),
                ("Far", "20240301T090000"),
            ]),
        );
        fake.reply(500, "");

        let mut source = CalDavSource::dingtalk("bob", Box::new(Shared(fake.clone())), DEFAULT_TZ);
        let events = source.fetch_events(&window()).unwrap();
        let summaries: Vec<_> = events.iter().filter_map(|e| e.summary()).collect();
        // the failed REPORT has no start so it sorts first
        assert_eq!(
            summaries,
            vec!["REPORT request failed, HTTP status code: 500", "Early", "Late"]
        );

        let sent = fake.sent.borrow();
        assert_eq!(sent[1].url, "https://calendar.dingtalk.com/dav/bob/primary/");
        assert!(!sent[1].body.contains("time-range"));
    }

    #[test]
    fn generic_sends_time_range_in_utc() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, GENERIC_DISCOVERY);
        fake.reply(207, &report(&[("Dentist", "20240105T100000")]));

        let mut source = CalDavSource::generic(
            "https://example.org/dav",
            Box::new(Shared(fake.clone())),
            DEFAULT_TZ,
        );
        let events = source.fetch_events(&window()).unwrap();
        assert_eq!(events.len(), 1);

        let sent = fake.sent.borrow();
        assert_eq!(sent[1].url, "https://other.example.org/cal/home/");
        // local midnight in Shanghai is 16:00 UTC the day before
        assert!(sent[1]
            .body
            .contains(r#"<C:time-range start="20240104T160000Z" end="20240111T160000Z"/>"#));
    }

    #[test]
    fn malformed_report_only_drops_that_calendar() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, DINGTALK_DISCOVERY);
        fake.reply(207, "<html>gateway hiccup");
        fake.reply(207, &report(&[("Kept", "20240105T120000")]));

        let mut source = CalDavSource::dingtalk("bob", Box::new(Shared(fake)), DEFAULT_TZ);
        let events = source.fetch_events(&window()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), Some("Kept"));
    }

    #[test]
    fn close_forgets_calendars() {
        let fake = Rc::new(FakeTransport::default());
        fake.reply(207, DINGTALK_DISCOVERY);
        fake.reply(207, DINGTALK_DISCOVERY);
        let mut source = CalDavSource::dingtalk("bob", Box::new(Shared(fake.clone())), DEFAULT_TZ);
        source.discover().unwrap();
        source.close();
        source.discover().unwrap();
        assert_eq!(fake.sent.borrow().len(), 2);
    }
}
