//! Final report assembly and strategic confidence

use crate::quality::{parse_swot, Score, Swot};
use crate::research::{DataSource, ResearchMaterial};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Readiness {
    #[serde(rename = "Board-ready")]
    BoardReady,
    #[serde(rename = "Review recommended")]
    ReviewRecommended,
    #[serde(rename = "Exploratory")]
    Exploratory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Confidence {
    /// 0-100
    pub confidence: u8,
    pub readiness: Readiness,
    pub level: ConfidenceLevel,
    pub score_contribution: u8,
    pub data_contribution: u8,
}

impl Confidence {
    /// Up to 60 points from the score and 40 from source coverage
    pub fn calculate(score: Score, used: usize, failed: usize) -> Self {
        let from_score = f64::from(score.value()) / 10.0 * 60.0;
        let total_sources = used + failed;
        let from_data = if total_sources == 0 {
            20.0
        } else {
            used as f64 / total_sources as f64 * 40.0
        };
        let total = from_score + from_data;

        let (readiness, level) = if total >= 75.0 && failed == 0 {
            (Readiness::BoardReady, ConfidenceLevel::High)
        } else if total >= 60.0 {
            (Readiness::ReviewRecommended, ConfidenceLevel::Medium)
        } else {
            (Readiness::Exploratory, ConfidenceLevel::Low)
        };

        Self {
            confidence: total.round() as u8,
            readiness,
            level,
            score_contribution: from_score.round() as u8,
            data_contribution: from_data.round() as u8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalReport {
    pub company: String,
    pub ticker: Option<String>,
    pub strategy_focus: String,
    pub draft: String,
    pub critique: String,
    pub score: Score,
    pub revision_count: u8,
    /// False when the revision budget ran out below the threshold
    pub meets_quality_bar: bool,
    pub swot: Swot,
    pub confidence: Confidence,
    pub provider_used: Option<String>,
    pub sources_used: Vec<DataSource>,
    pub sources_failed: Vec<DataSource>,
    pub cached: bool,
}

/// Everything the output step needs to finalize a report
pub struct ReportInput<'a> {
    pub material: &'a ResearchMaterial,
    pub strategy_focus: &'a str,
    pub draft: &'a str,
    pub critique: &'a str,
    pub score: Score,
    pub revision_count: u8,
    pub provider_used: Option<String>,
    pub pass_threshold: u8,
    pub cached: bool,
}

impl FinalReport {
    pub fn build(input: ReportInput<'_>) -> Self {
        let sources_used = input.material.usable_sources();
        let sources_failed = input.material.failed_sources();

        Self {
            company: input.material.company.clone(),
            ticker: input.material.ticker.clone(),
            strategy_focus: input.strategy_focus.to_string(),
            draft: input.draft.to_string(),
            critique: input.critique.to_string(),
            score: input.score,
            revision_count: input.revision_count,
            meets_quality_bar: input.score.passes(input.pass_threshold),
            swot: parse_swot(input.draft),
            confidence: Confidence::calculate(input.score, sources_used.len(), sources_failed.len()),
            provider_used: input.provider_used,
            sources_used,
            sources_failed,
            cached: input.cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 6, 0, 100, Readiness::BoardReady)]
    #[case(8, 5, 1, 81, Readiness::ReviewRecommended)]
    #[case(7, 3, 3, 62, Readiness::ReviewRecommended)]
    #[case(4, 2, 4, 37, Readiness::Exploratory)]
    fn confidence_bands(
        #[case] score: u8,
        #[case] used: usize,
        #[case] failed: usize,
        #[case] expected: u8,
        #[case] readiness: Readiness,
    ) {
        let c = Confidence::calculate(Score::new(score), used, failed);
        assert_eq!(c.confidence, expected);
        assert_eq!(c.readiness, readiness);
    }

    #[test]
    fn readiness_labels_serialize_for_humans() {
        assert_eq!(
            serde_json::to_string(&Readiness::BoardReady).unwrap(),
            "\"Board-ready\""
        );
    }
}
