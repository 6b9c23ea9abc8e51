//! Minimal element scanner for WebDAV multi-status bodies
//!
//! Not a general-purpose parser. Forward-only and lenient, tags are matched by local name
//! so `d:href`, `D:href` and `href` are all the same element. Only unterminated markup is
//! an error.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    local_name: &'a str,
    kind: TagKind,
    /// Byte offset of `<`
    start: usize,
    /// Byte offset right after `>`
    end: usize,
}

struct Tags<'a> {
    data: &'a str,
    pos: usize,
}

impl<'a> Tags<'a> {
    fn new(data: &'a str) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_past(&mut self, from: usize, terminator: &str) -> Result<()> {
        let rest = &self.data[from..];
        let idx = rest
            .find(terminator)
            .ok_or_else(|| Error::Parse(format!("unterminated markup, expected {terminator:?}")))?;
        self.pos = from + idx + terminator.len();
        Ok(())
    }

    fn next_tag(&mut self) -> Result<Option<Tag<'a>>> {
        loop {
            let Some(offset) = self.data[self.pos..].find('<') else {
                return Ok(None);
            };
            let start = self.pos + offset;
            let rest = &self.data[start..];

            if rest.starts_with("<!--") {
                self.skip_past(start, "-->")?;
                continue;
            }
            if rest.starts_with("<![CDATA[") {
                self.skip_past(start, "]]>")?;
                continue;
            }
            if rest.starts_with("<?") {
                self.skip_past(start, "?>")?;
                continue;
            }
            if rest.starts_with("<!") {
                self.skip_past(start, ">")?;
                continue;
            }

            let end = start + tag_end(rest).ok_or_else(|| Error::Parse("unterminated tag".to_string()))?;
            let inner = &self.data[start + 1..end - 1];
            self.pos = end;

            let (kind, body) = if let Some(body) = inner.strip_prefix('/') {
                (TagKind::Close, body)
            } else if let Some(body) = inner.strip_suffix('/') {
                (TagKind::Empty, body)
            } else {
                (TagKind::Open, inner)
            };
            let name = body
                .split(|c: char| c.is_ascii_whitespace())
                .next()
                .unwrap_or_default();
            let local_name = name.rsplit(':').next().unwrap_or(name);

            return Ok(Some(Tag {
                local_name,
                kind,
                start,
                end,
            }));
        }
    }
}

/// Offset right after the `>` closing the tag at the start of `tag`, quotes respected
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (idx, c) in tag.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

/// Raw inner markup of every top-level element called `local_name`.
///
/// Nested elements of the same name stay inside their parent's content. Self-closing
/// elements give an empty string.
pub fn elements<'a>(data: &'a str, local_name: &str) -> Result<Vec<&'a str>> {
    let mut found = Vec::new();
    let mut tags = Tags::new(data);
    // content start and nesting depth of the element being collected
    let mut open: Option<(usize, u32)> = None;

    while let Some(tag) = tags.next_tag()? {
        if tag.local_name != local_name {
            continue;
        }
        match (tag.kind, open.as_mut()) {
            (TagKind::Open, None) => open = Some((tag.end, 1)),
            (TagKind::Open, Some((_, depth))) => *depth += 1,
            (TagKind::Close, Some((content_start, depth))) => {
                *depth -= 1;
                if *depth == 0 {
                    found.push(&data[*content_start..tag.start]);
                    open = None;
                }
            }
            (TagKind::Empty, None) => found.push(""),
            // stray close tags and empty tags nested in a match are part of its content
            _ => {}
        }
    }

    if open.is_some() {
        return Err(Error::Parse(format!("unclosed <{local_name}> element")));
    }
    Ok(found)
}

pub fn has_element(data: &str, local_name: &str) -> Result<bool> {
    Ok(!elements(data, local_name)?.is_empty())
}

/// Text of the first `local_name` element, unescaped and trimmed. Empty text is `None`.
pub fn first_text(data: &str, local_name: &str) -> Result<Option<String>> {
    Ok(elements(data, local_name)?
        .first()
        .map(|raw| unescape(raw).trim().to_string())
        .filter(|text| !text.is_empty()))
}

/// The `response` children of a `multistatus` document
pub fn multistatus_responses(data: &str) -> Result<Vec<&str>> {
    let Some(body) = elements(data, "multistatus")?.into_iter().next() else {
        return Err(Error::Parse("response has no multistatus element".to_string()));
    };
    elements(body, "response")
}

/// Resolve entities and CDATA sections in character data
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(idx) = rest.find(['&', '<']) {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
            let (text, tail) = cdata.split_once("]]>").unwrap_or((cdata, ""));
            out.push_str(text);
            rest = tail;
            continue;
        }

        if rest.starts_with('&') {
            if let Some((c, len)) = decode_entity(rest) {
                out.push(c);
                rest = &rest[len..];
                continue;
            }
        }

        // not something we decode, keep it literally
        let c = rest.chars().next().unwrap_or_default();
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out.push_str(rest);
    out
}

/// Decode the entity at the start of `s`, giving the char and the entity's length
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let semi = s.get(..12).unwrap_or(s).find(';')?;
    let name = &s[1..semi];
    let c = match name {
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some((c, semi + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISCOVERY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/">
  <!-- first one is the home set -->
  <d:response>
    <d:href>/dav/bob/</d:href>
    <d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat>
  </d:response>
  <d:response>
    <d:href>/dav/bob/work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Work &amp; Life</d:displayname>
        <d:resourcetype><d:collection/><c:calendar xmlns:c="urn:ietf:params:xml:ns:caldav"/></d:resourcetype>
        <cs:getctag>"abc"</cs:getctag>
      </d:prop>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    #[test]
    fn finds_responses_regardless_of_prefix() {
        let responses = multistatus_responses(DISCOVERY).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(first_text(responses[0], "href").unwrap().as_deref(), Some("/dav/bob/"));
        assert_eq!(first_text(responses[1], "displayname").unwrap().as_deref(), Some("Work & Life"));
        assert_eq!(first_text(responses[1], "getctag").unwrap().as_deref(), Some("\"abc\""));
        assert_eq!(first_text(responses[0], "displayname").unwrap(), None);
    }

    #[test]
    fn self_closing_elements_are_present() {
        let responses = multistatus_responses(DISCOVERY).unwrap();
        let kinds = elements(responses[1], "resourcetype").unwrap();
        assert!(has_element(kinds[0], "calendar").unwrap());
        assert!(!has_element(elements(responses[0], "resourcetype").unwrap()[0], "calendar").unwrap());
    }

    #[test]
    fn nested_same_name_stays_in_parent() {
        let found = elements("<a><a>x</a></a><a/>", "a").unwrap();
        assert_eq!(found, vec!["<a>x</a>", ""]);
    }

    #[test]
    fn cdata_content_is_kept_raw() {
        let data = "<c:calendar-data><![CDATA[SUMMARY:a <b> & c]]></c:calendar-data>";
        let raw = elements(data, "calendar-data").unwrap();
        assert_eq!(unescape(raw[0]), "SUMMARY:a <b> & c");
    }

    #[test]
    fn numeric_entities() {
        assert_eq!(unescape("&#13;&#x41;&bogus; &"), "\rA&bogus; &");
    }

    #[test]
    fn malformed_bodies_are_parse_errors() {
        assert!(matches!(multistatus_responses("<html>nope</html>"), Err(Error::Parse(_))));
        assert!(matches!(
            multistatus_responses("<d:multistatus><d:response>"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(elements("<a attr=\"x", "a"), Err(Error::Parse(_))));
    }
}
