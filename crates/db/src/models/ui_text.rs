//! The `ui_text.csv` resource: translated interface strings grouped under
//! header rows.
//!
//! The format is line-oriented with the first comma as the only delimiter:
//! `key,value` per line, values escaped RFC4180-style when they contain
//! commas, quotes, or newlines. A group header is a quoted key with an empty
//! value.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::csv::{escape_field, take_quoted};

pub const UI_TEXT_FILE: &str = "ui_text.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct UiTextItem {
    pub key: String,
    pub value: String,
    pub is_group: bool,
}

impl UiTextItem {
    pub fn entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_group: false,
        }
    }

    pub fn group(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: String::new(),
            is_group: true,
        }
    }
}

pub fn to_csv(items: &[UiTextItem]) -> String {
    let mut out = String::new();
    for item in items {
        if item.is_group {
            // Group headers are always quoted, even when they would not
            // strictly need it, so the parser can tell them apart.
            out.push_str(&format!("\"{}\",\n", item.key.replace('"', "\"\"")));
        } else {
            out.push_str(&format!("{},{}\n", item.key, escape_field(&item.value)));
        }
    }
    out
}

pub fn parse_csv(input: &str) -> Vec<UiTextItem> {
    let mut items = Vec::new();
    let mut first = true;
    for record in split_records(input) {
        let record_trimmed = record.trim_end_matches('\r');
        if record_trimmed.is_empty() {
            continue;
        }
        // A conventional header line is ignored when present.
        if first && record_trimmed == "key,value" {
            first = false;
            continue;
        }
        first = false;
        items.push(parse_record(record_trimmed));
    }
    items
}

fn parse_record(record: &str) -> UiTextItem {
    if record.starts_with('"') {
        if let Some((key, rest)) = take_quoted(record) {
            let value_part = rest.strip_prefix(',').unwrap_or(rest);
            if value_part.is_empty() {
                return UiTextItem::group(key);
            }
            return UiTextItem::entry(key, unquote_value(value_part));
        }
    }
    match record.split_once(',') {
        Some((key, value)) => UiTextItem::entry(key, unquote_value(value)),
        None => UiTextItem::entry(record, ""),
    }
}

/// Unquote a value: a leading quoted segment wins and anything after its
/// closing quote (stray extra columns from older exports) is dropped.
fn unquote_value(value: &str) -> String {
    if value.starts_with('"') {
        if let Some((content, _rest)) = take_quoted(value) {
            return content;
        }
    }
    value.to_string()
}

/// Split on newlines that are not inside a quoted field, so escaped values
/// may span lines.
fn split_records(input: &str) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '\n' if !in_quotes => {
                records.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_items() {
        let items = vec![
            UiTextItem::group("Navigation"),
            UiTextItem::entry("nav.home", "Home"),
            UiTextItem::entry("nav.orders", "Orders, open"),
            UiTextItem::entry("nav.note", "say \"hi\""),
            UiTextItem::group("Footer, legal"),
            UiTextItem::entry("footer.copyright", "All rights reserved"),
        ];
        assert_eq!(parse_csv(&to_csv(&items)), items);
    }

    #[test]
    fn round_trip_handles_escaped_newlines() {
        let items = vec![UiTextItem::entry("intro.body", "line one\nline two")];
        assert_eq!(parse_csv(&to_csv(&items)), items);
    }

    #[test]
    fn first_comma_is_the_only_delimiter() {
        let items = parse_csv("key,\"a, b\"\n");
        assert_eq!(items, vec![UiTextItem::entry("key", "a, b")]);
    }

    #[test]
    fn stray_columns_after_a_quoted_value_are_dropped() {
        // Older three-column exports carried a second language column; the
        // quoted first value wins.
        let items = parse_csv("key,\"a, b\",en value\n");
        assert_eq!(items, vec![UiTextItem::entry("key", "a, b")]);
    }

    #[test]
    fn quoted_key_with_empty_value_is_a_group() {
        let items = parse_csv("\"Print Settings\",\n");
        assert_eq!(items, vec![UiTextItem::group("Print Settings")]);
    }

    #[test]
    fn header_line_is_skipped() {
        let items = parse_csv("key,value\nnav.home,Home\n");
        assert_eq!(items, vec![UiTextItem::entry("nav.home", "Home")]);
    }

    #[test]
    fn unquoted_values_pass_through() {
        let items = parse_csv("nav.home,Home\n\nnav.about,About\n");
        assert_eq!(
            items,
            vec![
                UiTextItem::entry("nav.home", "Home"),
                UiTextItem::entry("nav.about", "About"),
            ]
        );
    }

    #[test]
    fn group_escaping_is_reversible() {
        let items = vec![UiTextItem::group("He said \"stop\"")];
        assert_eq!(parse_csv(&to_csv(&items)), items);
    }
}
