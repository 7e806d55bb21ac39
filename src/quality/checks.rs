//! Deterministic structural checks on a draft
//!
//! Four checks worth 8 points in total:
//!
//! | check | points |
//! |-------|--------|
//! | all four SWOT sections present | 0-2 |
//! | distinct quantified statements | 0-3 |
//! | coverage of the sources that returned data | 0-2 |
//! | balance between sections | 0-1 |

use super::swot::{parse_swot, Section};
use crate::research::DataSource;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

pub const MAX_POINTS: u8 = 8;

static SECTION_WORDS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"(?i)\bstrengths?\b",
        r"(?i)\bweaknesses?\b",
        r"(?i)\bopportunit(y|ies)\b",
        r"(?i)\bthreats?\b",
    ]
    .map(|p| Regex::new(p).expect("valid section regex"))
});

static CITATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\$[\d,]+\.?\d*[BMK]?",
        r"\d+\.?\d*\s*%",
        r"\d+\.?\d*x",
        r"(?i)P/E[:\s]+\d+",
        r"(?i)P/S[:\s]+\d+",
        r"(?i)P/B[:\s]+\d+",
        r"(?i)EV/EBITDA[:\s]+\d+",
        r"(?i)PEG[:\s]+\d+",
        r"(?i)VIX[:\s]+\d+",
        r"(?i)Beta[:\s]+\d+",
        r"\d+/100",
        r"(?i)CAGR[:\s]*\d+",
        r"\b\d{4}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid citation regex"))
    .collect()
});

/// Words that show a draft drew on a given source
pub fn source_keywords(source: DataSource) -> &'static [&'static str] {
    match source {
        DataSource::Fundamentals => &["revenue", "net margin", "debt", "cash flow", "eps", "earnings"],
        DataSource::Valuation => &["p/e", "p/s", "p/b", "ev/ebitda", "peg", "valuation", "market cap"],
        DataSource::Volatility => &["beta", "volatility", "vix", "price swing"],
        DataSource::Macro => &["gdp", "interest rate", "inflation", "unemployment", "fed"],
        DataSource::News => &["news", "analyst", "article", "report", "headline"],
        DataSource::Sentiment => &["sentiment", "bullish", "bearish"],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveReport {
    pub sections_present: usize,
    pub missing_sections: Vec<String>,
    pub section_points: u8,
    pub citation_count: usize,
    pub citation_points: u8,
    pub coverage_pct: f64,
    pub unreferenced_sources: Vec<DataSource>,
    pub coverage_points: u8,
    pub balanced: bool,
    pub balance_points: u8,
}

impl ObjectiveReport {
    pub fn total(&self) -> u8 {
        self.section_points + self.citation_points + self.coverage_points + self.balance_points
    }

    /// Total on a 0-10 scale
    pub fn score(&self) -> f64 {
        f64::from(self.total()) / f64::from(MAX_POINTS) * 10.0
    }
}

pub fn run_checks(draft: &str, sources_available: &[DataSource]) -> ObjectiveReport {
    let (sections_present, missing_sections, section_points) = check_sections(draft);
    let (citation_count, citation_points) = count_citations(draft);
    let (coverage_pct, unreferenced_sources, coverage_points) =
        check_coverage(draft, sources_available);
    let balanced = check_balance(draft);

    ObjectiveReport {
        sections_present,
        missing_sections,
        section_points,
        citation_count,
        citation_points,
        coverage_pct,
        unreferenced_sources,
        coverage_points,
        balanced,
        balance_points: u8::from(balanced),
    }
}

fn check_sections(draft: &str) -> (usize, Vec<String>, u8) {
    let names = ["Strengths", "Weaknesses", "Opportunities", "Threats"];
    let missing: Vec<String> = SECTION_WORDS
        .iter()
        .zip(names)
        .filter(|(re, _)| !re.is_match(draft))
        .map(|(_, name)| name.to_string())
        .collect();

    let present = 4 - missing.len();
    let points = match present {
        4 => 2,
        2 | 3 => 1,
        _ => 0,
    };
    (present, missing, points)
}

fn count_citations(draft: &str) -> (usize, u8) {
    let unique: HashSet<&str> = CITATIONS
        .iter()
        .flat_map(|re| re.find_iter(draft).map(|m| m.as_str()))
        .collect();

    let count = unique.len();
    let points = match count {
        n if n >= 10 => 3,
        n if n >= 6 => 2,
        n if n >= 3 => 1,
        _ => 0,
    };
    (count, points)
}

fn check_coverage(draft: &str, sources: &[DataSource]) -> (f64, Vec<DataSource>, u8) {
    if sources.is_empty() {
        return (0.0, Vec::new(), 0);
    }

    let lower = draft.to_lowercase();
    let unreferenced: Vec<DataSource> = sources
        .iter()
        .copied()
        .filter(|s| !source_keywords(*s).iter().any(|kw| lower.contains(kw)))
        .collect();

    let referenced = sources.len() - unreferenced.len();
    let pct = referenced as f64 / sources.len() as f64 * 100.0;
    let points = if pct >= 75.0 {
        2
    } else if pct >= 50.0 {
        1
    } else {
        0
    };
    (pct, unreferenced, points)
}

/// Balanced when no present section has fewer than a quarter of the
/// average item count.
fn check_balance(draft: &str) -> bool {
    let swot = parse_swot(draft);
    let counts: Vec<usize> = Section::ALL
        .iter()
        .map(|s| swot.items(*s).len())
        .filter(|n| *n > 0)
        .collect();

    if counts.len() < 4 {
        return false;
    }
    let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    counts.iter().all(|c| *c as f64 >= avg * 0.25)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "\
Strengths:
- Revenue of $3.6B grew at a CAGR 9% since 2021
- Net margin of 12.4% and EPS growth
Weaknesses:
- P/E: 48 is above the sector average
- Debt rose 14% in 2023
Opportunities:
- GDP growth of 2.1% and falling inflation at 3.2%
- Analyst news flow is bullish
Threats:
- Beta: 1.8 signals elevated volatility
- VIX: 22 during 2024 selloffs
";

    #[test]
    fn strong_draft_scores_full_structure() {
        let report = run_checks(GOOD, &DataSource::ALL);

        assert_eq!(report.sections_present, 4);
        assert_eq!(report.section_points, 2);
        assert!(report.citation_count >= 10, "found {}", report.citation_count);
        assert_eq!(report.citation_points, 3);
        assert_eq!(report.coverage_points, 2);
        assert!(report.balanced);
        assert_eq!(report.total(), 8);
        assert_eq!(report.score(), 10.0);
    }

    #[test]
    fn missing_sections_are_listed() {
        let report = run_checks("Strengths\n- Good brand\nThreats\n- Competition", &[]);

        assert_eq!(report.sections_present, 2);
        assert_eq!(report.section_points, 1);
        assert_eq!(report.missing_sections, vec!["Weaknesses", "Opportunities"]);
        assert!(!report.balanced);
    }

    #[test]
    fn duplicate_figures_count_once() {
        let (count, _) = count_citations("margin 12% and again 12% and 12%");
        assert_eq!(count, 1);
    }

    #[test]
    fn coverage_only_counts_available_sources() {
        let (pct, unreferenced, points) =
            check_coverage("Beta is high", &[DataSource::Volatility, DataSource::Macro]);
        assert_eq!(pct, 50.0);
        assert_eq!(unreferenced, vec![DataSource::Macro]);
        assert_eq!(points, 1);
    }
}
