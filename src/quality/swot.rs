//! SWOT text parser
//!
//! Splits a markdown-ish report into its four sections. Headers are matched
//! loosely (`## Strengths`, `**Weaknesses:**`, `Opportunities -`), items are
//! bullets, numbered entries or plain content lines.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Strengths,
    Weaknesses,
    Opportunities,
    Threats,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Strengths,
        Section::Weaknesses,
        Section::Opportunities,
        Section::Threats,
    ];

    fn stem(&self) -> &'static str {
        match self {
            Section::Strengths => "strength",
            Section::Weaknesses => "weakness",
            Section::Opportunities => "opportunit",
            Section::Threats => "threat",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Swot {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub opportunities: Vec<String>,
    pub threats: Vec<String>,
}

impl Swot {
    pub fn items(&self, section: Section) -> &[String] {
        match section {
            Section::Strengths => &self.strengths,
            Section::Weaknesses => &self.weaknesses,
            Section::Opportunities => &self.opportunities,
            Section::Threats => &self.threats,
        }
    }

    fn items_mut(&mut self, section: Section) -> &mut Vec<String> {
        match section {
            Section::Strengths => &mut self.strengths,
            Section::Weaknesses => &mut self.weaknesses,
            Section::Opportunities => &mut self.opportunities,
            Section::Threats => &mut self.threats,
        }
    }
}

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s*(.+)|\d+[.)]\s*(.+))$").expect("valid bullet regex")
});
static HEADER_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_:\[\]()]").expect("valid header regex"));
static LEADING_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[:\-–—#*_\s]+").expect("valid separator regex"));
static FORMATTING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_:\-–—\[\]()]").expect("valid formatting regex"));

pub fn parse_swot(text: &str) -> Swot {
    let mut swot = Swot::default();
    let mut current: Option<Section> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(section) = header_section(line) {
            current = Some(section);
            if let Some(rest) = after_header(line, section) {
                swot.items_mut(section).push(rest);
            }
            continue;
        }

        let Some(section) = current else {
            continue;
        };

        if let Some(caps) = BULLET.captures(line) {
            let item = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim());
            if let Some(item) = item.filter(|i| !i.is_empty()) {
                swot.items_mut(section).push(strip_emphasis(item));
            }
        } else if !is_header_like(line) && line.chars().count() > 10 {
            swot.items_mut(section).push(line.to_string());
        }
    }

    swot
}

fn header_section(line: &str) -> Option<Section> {
    let lower = line.to_lowercase();
    let clean = HEADER_NOISE.replace_all(&lower, "");
    let clean = clean.trim();
    if clean.chars().count() >= 50 {
        return None;
    }
    Section::ALL.into_iter().find(|s| clean.contains(s.stem()))
}

/// Content written on the same line as the header, e.g. `Strengths: strong margins`
fn after_header(line: &str, section: Section) -> Option<String> {
    let lower = line.to_lowercase();
    let start = lower.find(section.stem())?;
    let mut end = start + section.stem().len();
    let bytes = lower.as_bytes();
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }

    // `lower` and `line` share byte offsets for ASCII stems
    let remainder = line.get(end..)?.trim();
    let remainder = LEADING_SEPARATORS.replace(remainder, "");
    let remainder = remainder.trim();

    let starts_with_stem = Section::ALL
        .iter()
        .any(|s| remainder.to_lowercase().starts_with(s.stem()));
    if remainder.chars().count() > 10 && !starts_with_stem {
        Some(remainder.to_string())
    } else {
        None
    }
}

fn is_header_like(line: &str) -> bool {
    let clean = FORMATTING.replace_all(line, "");
    clean.trim().chars().count() < 5 || line.trim_end().ends_with(':')
}

fn strip_emphasis(item: &str) -> String {
    item.trim_matches(|c| c == '*' || c == '_').trim().to_string()
}
