// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Record;

/// A record that survived the pipeline, carrying the search term as typed
/// (original casing) when one was active.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub record: Record,
    pub matched_term: Option<String>,
}

pub fn annotate(record: &Record, term: &str) -> ViewRow {
    ViewRow {
        record: record.clone(),
        matched_term: (!term.is_empty()).then(|| term.to_owned()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub matched: bool,
}

impl Segment {
    fn plain(chars: &[char]) -> Self {
        Self {
            text: chars.iter().collect(),
            matched: false,
        }
    }

    fn marked(chars: &[char]) -> Self {
        Self {
            text: chars.iter().collect(),
            matched: true,
        }
    }
}

/// Lowercases one char at a time. Search and highlighting both fold through
/// this, so a record the search keeps always has a marked span.
pub fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Splits `text` at case-insensitive occurrences of `term`, scanning left to
/// right and skipping past each hit, so matches never overlap.
pub fn highlight(text: &str, term: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }
    let haystack: Vec<char> = text.chars().collect();
    let needle: Vec<char> = fold_case(term).chars().collect();
    // Each folded char remembers the source char it came from.
    let folded: Vec<(char, usize)> = haystack
        .iter()
        .enumerate()
        .flat_map(|(source, ch)| ch.to_lowercase().map(move |lower| (lower, source)))
        .collect();
    if needle.is_empty() || needle.len() > folded.len() {
        return vec![Segment::plain(&haystack)];
    }

    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut index = 0;
    while index + needle.len() <= folded.len() {
        let window = &folded[index..index + needle.len()];
        if window.iter().map(|(ch, _)| ch).eq(needle.iter()) {
            let start = window[0].1.max(plain_start);
            let end = window[window.len() - 1].1 + 1;
            if plain_start < start {
                segments.push(Segment::plain(&haystack[plain_start..start]));
            }
            segments.push(Segment::marked(&haystack[start..end]));
            plain_start = end;
            index += needle.len();
            while index < folded.len() && folded[index].1 < end {
                index += 1;
            }
        } else {
            index += 1;
        }
    }
    if plain_start < haystack.len() {
        segments.push(Segment::plain(&haystack[plain_start..]));
    }
    segments
}

pub fn render_markup(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        if segment.matched {
            out.push_str("<mark>");
            out.push_str(&escape_html(&segment.text));
            out.push_str("</mark>");
        } else {
            out.push_str(&escape_html(&segment.text));
        }
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
