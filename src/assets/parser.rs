// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Best-effort decoding of NFT listings from textual script output.
//!
//! Expected record shape:
//!
//! ```text
//! [42, A.631e88ae7f1d7c20.MetadataViews.Display(name: "X", description: "Y",
//!      thumbnail: A.631e88ae7f1d7c20.MetadataViews.HTTPFile(url: "https://e/x")), true]
//! ```
//!
//! Anything that does not match is skipped, so malformed text yields a
//! partial or empty list rather than an error.

use serde::Serialize;

/// Display metadata of a single NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct NftDisplay {
    pub name: String,
    pub description: String,
    pub thumbnail: String,
}

/// An owned ticket NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct NftRecord {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub thumbnail: String,
    /// Whether the ticket grants the organizer role.
    pub organizer: bool,
}

const DISPLAY_TYPE: &str = "MetadataViews.Display";

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Option<()> {
        self.eat(token).then_some(())
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn number(&mut self) -> Option<u64> {
        self.take_while(|c| c.is_ascii_digit()).parse().ok()
    }

    fn boolean(&mut self) -> Option<bool> {
        if self.eat("true") {
            Some(true)
        } else if self.eat("false") {
            Some(false)
        } else {
            None
        }
    }

    /// Qualified type name such as `A.0123.MetadataViews.Display`.
    fn type_name(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    }

    fn quoted(&mut self) -> Option<String> {
        self.expect("\"")?;
        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += i + 1;
                    return Some(out);
                }
                '\\' => {
                    let (_, escaped) = chars.next()?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                }
                other => out.push(other),
            }
        }
        None
    }

    /// `name: value` where value is a quoted string or `nil`.
    fn field(&mut self) -> Option<(&'a str, Option<String>)> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        self.expect(":")?;
        if self.eat("nil") {
            return Some((name, None));
        }
        Some((name, Some(self.quoted()?)))
    }

    /// File view such as `HTTPFile(url: "...")` or `IPFSFile(cid: "...", path: nil)`.
    fn file(&mut self) -> Option<String> {
        self.type_name();
        self.expect("(")?;
        let mut location = String::new();
        loop {
            let (name, value) = self.field()?;
            if matches!(name, "url" | "cid") {
                location = value.unwrap_or_default();
            }
            if self.eat(")") {
                return Some(location);
            }
            self.expect(",")?;
        }
    }

    /// Body of `Display(` up to and including its closing parenthesis.
    fn display_body(&mut self) -> Option<NftDisplay> {
        let (_, name) = self.field().filter(|(n, _)| *n == "name")?;
        self.expect(",")?;
        let (_, description) = self.field().filter(|(n, _)| *n == "description")?;
        self.expect(",")?;
        self.expect("thumbnail")?;
        self.expect(":")?;
        let thumbnail = self.file()?;
        self.expect(")")?;
        Some(NftDisplay {
            name: name.unwrap_or_default(),
            description: description.unwrap_or_default(),
            thumbnail,
        })
    }

    fn display(&mut self) -> Option<NftDisplay> {
        if !self.type_name().ends_with(DISPLAY_TYPE) {
            return None;
        }
        self.expect("(")?;
        self.display_body()
    }

    /// `[id, Display(...), organizer]` starting at `[`.
    fn record(&mut self) -> Option<NftRecord> {
        self.expect("[")?;
        let id = self.number()?;
        self.expect(",")?;
        let display = self.display()?;
        self.expect(",")?;
        let organizer = self.boolean()?;
        self.expect("]")?;
        Some(NftRecord {
            id,
            name: display.name,
            description: display.description,
            thumbnail: display.thumbnail,
            organizer,
        })
    }
}

/// Decode every well-formed `[id, Display, bool]` record in `text`.
pub fn parse_records(text: &str) -> Vec<NftRecord> {
    let mut records = Vec::new();
    let mut from = 0;
    while let Some(offset) = text[from..].find('[') {
        let start = from + offset;
        let mut scanner = Scanner::at(text, start);
        match scanner.record() {
            Some(record) => {
                records.push(record);
                from = scanner.pos;
            }
            None => from = start + 1,
        }
    }
    records
}

/// Decode every well-formed `Display(...)` value in `text`.
pub fn parse_displays(text: &str) -> Vec<NftDisplay> {
    let marker = format!("{DISPLAY_TYPE}(");
    let mut displays = Vec::new();
    let mut from = 0;
    while let Some(offset) = text[from..].find(&marker) {
        let body = from + offset + marker.len();
        let mut scanner = Scanner::at(text, body);
        match scanner.display_body() {
            Some(display) => {
                displays.push(display);
                from = scanner.pos;
            }
            None => from = body,
        }
    }
    displays
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"[7, A.631e88ae7f1d7c20.MetadataViews.Display(name: "X", description: "Y", thumbnail: A.631e88ae7f1d7c20.MetadataViews.HTTPFile(url: "https://e/x")), true]"#;

    #[test]
    fn parses_record_list() {
        let text = format!(
            "[{RECORD}, {}]",
            RECORD.replace("[7", "[8").replace("true]", "false]").replace("\"X\"", "\"Z\"")
        );
        let records = parse_records(&text);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            NftRecord {
                id: 7,
                name: "X".into(),
                description: "Y".into(),
                thumbnail: "https://e/x".into(),
                organizer: true,
            }
        );
        assert_eq!(records[1].id, 8);
        assert_eq!(records[1].name, "Z");
        assert!(!records[1].organizer);
    }

    #[test]
    fn skips_malformed_records() {
        let broken = RECORD.replace("description:", "descr:");
        let text = format!("[{broken}, {}]", RECORD.replace("[7", "[9"));
        let records = parse_records(&text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 9);
    }

    #[test]
    fn garbage_yields_empty_list() {
        assert!(parse_records("").is_empty());
        assert!(parse_records("[]").is_empty());
        assert!(parse_records("panic: could not borrow").is_empty());
        assert!(parse_records("[1, A.x.MetadataViews.Display(name: \"unterminated").is_empty());
    }

    #[test]
    fn handles_escaped_quotes() {
        let text = RECORD.replace(r#""X""#, r#""say \"hi\"""#);
        assert_eq!(parse_records(&text)[0].name, "say \"hi\"");
    }

    #[test]
    fn parses_display_only_listing() {
        let text = r#"[A.631e88ae7f1d7c20.MetadataViews.Display(name: "A", description: "B", thumbnail: A.631e88ae7f1d7c20.MetadataViews.IPFSFile(cid: "bafy", path: nil)), A.631e88ae7f1d7c20.MetadataViews.Display(name: "C", description: "D", thumbnail: A.631e88ae7f1d7c20.MetadataViews.HTTPFile(url: "https://e/c"))]"#;
        let displays = parse_displays(text);
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].thumbnail, "bafy");
        assert_eq!(displays[1].name, "C");
        assert_eq!(displays[1].thumbnail, "https://e/c");
    }
}
