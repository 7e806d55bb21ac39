//! Model-judged rubric: completeness, specificity, relevance, depth

use crate::utils::toml_config::RubricWeights;
use serde::{Deserialize, Serialize};

pub const CRITIC_SYSTEM: &str =
    "You are a strict strategy evaluator. You respond with a single JSON object and nothing else.";

/// Scores returned by the critic model, each 1-10
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricScores {
    pub completeness: u8,
    pub specificity: u8,
    pub relevance: u8,
    pub depth: u8,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Deserialize)]
struct RawScores {
    completeness: f64,
    specificity: f64,
    relevance: f64,
    depth: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

impl RubricScores {
    /// Weighted mean on a 1-10 scale
    pub fn weighted(&self, weights: &RubricWeights) -> f64 {
        let pairs = [
            (self.completeness, weights.completeness),
            (self.specificity, weights.specificity),
            (self.relevance, weights.relevance),
            (self.depth, weights.depth),
        ];
        let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        pairs.iter().map(|(s, w)| f64::from(*s) * w).sum::<f64>() / total_weight
    }
}

/// Extract the rubric JSON from a model response. Surrounding prose and code
/// fences are tolerated; a missing dimension is an error.
pub fn parse_rubric(text: &str) -> Result<RubricScores, String> {
    let start = text.find('{').ok_or("no JSON object in critic response")?;
    let end = text.rfind('}').ok_or("unterminated JSON object in critic response")?;
    if end < start {
        return Err("unterminated JSON object in critic response".into());
    }

    let raw: RawScores = serde_json::from_str(&text[start..=end])
        .map_err(|e| format!("critic JSON invalid: {}", e))?;

    let clamp = |v: f64| -> u8 {
        if v.is_nan() {
            1
        } else {
            v.round().clamp(1.0, 10.0) as u8
        }
    };

    Ok(RubricScores {
        completeness: clamp(raw.completeness),
        specificity: clamp(raw.specificity),
        relevance: clamp(raw.relevance),
        depth: clamp(raw.depth),
        reasoning: raw
            .reasoning
            .unwrap_or_else(|| "No reasoning provided".to_string()),
    })
}

pub fn critic_prompt(draft: &str, company: &str, focus: &str, source_data: &str) -> String {
    format!(
        r#"Evaluate this SWOT analysis of {company}.

SWOT DRAFT:
{draft}

Strategic Focus: {focus}

SOURCE DATA (the analysis must be based ONLY on this):
{source_data}

Score each dimension from 1 to 10:
1. completeness: are all four sections present and substantive?
2. specificity: does every point cite concrete figures from the source data? Score 1-3 if figures are invented.
3. relevance: does the analysis address the strategic focus and this company's industry?
4. depth: does it explain what the figures mean rather than restating them?

Respond in this JSON format only, no other text:
{{
  "completeness": <1-10>,
  "specificity": <1-10>,
  "relevance": <1-10>,
  "depth": <1-10>,
  "reasoning": "<one or two sentences>"
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"completeness\": 8, \"specificity\": 6, \"relevance\": 7, \"depth\": 5, \"reasoning\": \"ok\"}\n```";
        let scores = parse_rubric(text).unwrap();
        assert_eq!(scores.completeness, 8);
        assert_eq!(scores.depth, 5);
        assert_eq!(scores.reasoning, "ok");
    }

    #[test]
    fn clamps_out_of_range_values() {
        let scores =
            parse_rubric(r#"{"completeness": 14, "specificity": 0, "relevance": 7.6, "depth": 3}"#)
                .unwrap();
        assert_eq!(scores.completeness, 10);
        assert_eq!(scores.specificity, 1);
        assert_eq!(scores.relevance, 8);
    }

    #[test]
    fn missing_dimension_is_rejected() {
        assert!(parse_rubric(r#"{"completeness": 8, "specificity": 6}"#).is_err());
        assert!(parse_rubric("looks great, 9/10").is_err());
    }

    #[test]
    fn weighted_mean_respects_weights() {
        let scores = RubricScores {
            completeness: 10,
            specificity: 2,
            relevance: 10,
            depth: 2,
            reasoning: String::new(),
        };
        assert_eq!(scores.weighted(&RubricWeights::default()), 6.0);

        let weights = RubricWeights {
            completeness: 1.0,
            specificity: 0.0,
            relevance: 0.0,
            depth: 0.0,
        };
        assert_eq!(scores.weighted(&weights), 10.0);
    }
}
