//! Quality gate (critic)
//!
//! A draft is scored by blending two components:
//! - an objective score from deterministic structural checks ([`checks`])
//! - a subjective score from a model-judged rubric ([`rubric`])
//!
//! The blend weights, the rubric weights and the acceptance threshold all
//! come from `[quality]` configuration. If the scoring call fails on every
//! provider the error is returned; no score is invented.

pub mod checks;
pub mod rubric;
pub mod swot;

pub use checks::{run_checks, ObjectiveReport};
pub use rubric::{parse_rubric, RubricScores};
pub use swot::{parse_swot, Swot};

use crate::llm::ProviderRouter;
use crate::research::{ResearchMaterial, GROUNDING_LIMIT};
use crate::telemetry::ProgressSink;
use crate::types::Result;
use crate::utils::toml_config::QualityConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

/// An integer quality score, always within 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Round and clamp into 1..=10
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Score(Self::MIN);
        }
        Score(value.round().clamp(f64::from(Self::MIN), f64::from(Self::MAX)) as u8)
    }

    pub fn new(value: u8) -> Self {
        Score(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn passes(&self, threshold: u8) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

/// Result of one critic pass
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: Score,
    pub critique: String,
    pub objective: ObjectiveReport,
    pub rubric: RubricScores,
    pub provider_used: String,
}

pub struct QualityGate {
    router: Arc<ProviderRouter>,
    config: QualityConfig,
}

impl QualityGate {
    pub fn new(router: Arc<ProviderRouter>, config: QualityConfig) -> Self {
        Self { router, config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub async fn evaluate(
        &self,
        draft: &str,
        focus: &str,
        material: &ResearchMaterial,
        sink: &dyn ProgressSink,
    ) -> Result<Evaluation> {
        let objective = run_checks(draft, &material.usable_sources());
        sink.log(&format!(
            "Objective checks: {}/{} points",
            objective.total(),
            checks::MAX_POINTS
        ));

        let prompt = rubric::critic_prompt(
            draft,
            &material.company,
            focus,
            &material.render_truncated(GROUNDING_LIMIT),
        );
        let routed = self
            .router
            .generate_with(rubric::CRITIC_SYSTEM, &prompt, sink, parse_rubric)
            .await?;

        let subjective = routed.value.weighted(&self.config.rubric);
        let score = self.blend(objective.score(), subjective);
        info!(
            objective = objective.score(),
            subjective, score = score.value(), provider = %routed.provider_used,
            "Draft scored"
        );

        let critique = render_critique(&objective, &routed.value, subjective, score, self.config.pass_threshold);
        Ok(Evaluation {
            score,
            critique,
            objective,
            rubric: routed.value,
            provider_used: routed.provider_used,
        })
    }

    /// Weighted blend of the two components, both on a 0-10 scale
    pub fn blend(&self, objective: f64, subjective: f64) -> Score {
        let ow = self.config.objective_weight;
        let sw = self.config.subjective_weight;
        let total = ow + sw;
        if total <= 0.0 {
            return Score::from_f64(subjective);
        }
        Score::from_f64((objective * ow + subjective * sw) / total)
    }
}

fn render_critique(
    objective: &ObjectiveReport,
    rubric: &RubricScores,
    subjective: f64,
    score: Score,
    threshold: u8,
) -> String {
    let mut lines = vec![
        format!(
            "Objective checks ({}/{} points):",
            objective.total(),
            checks::MAX_POINTS
        ),
        format!("  - SWOT sections: {}/4 present", objective.sections_present),
        format!("  - Numeric citations: {} found", objective.citation_count),
        format!("  - Data source coverage: {:.0}%", objective.coverage_pct),
        format!(
            "  - Section balance: {}",
            if objective.balanced { "balanced" } else { "unbalanced" }
        ),
        String::new(),
        format!("Rubric ({:.1}/10):", subjective),
        format!("  - Completeness: {}/10", rubric.completeness),
        format!("  - Specificity: {}/10", rubric.specificity),
        format!("  - Relevance: {}/10", rubric.relevance),
        format!("  - Depth: {}/10", rubric.depth),
        format!("Reasoning: {}", rubric.reasoning),
        String::new(),
    ];

    if !score.passes(threshold) {
        lines.push("Required improvements:".to_string());
        if !objective.missing_sections.is_empty() {
            lines.push(format!(
                "  - Add the missing sections: {}",
                objective.missing_sections.join(", ")
            ));
        }
        if objective.citation_points < 3 {
            lines.push("  - Cite more specific figures from the source data".to_string());
        }
        if !objective.unreferenced_sources.is_empty() {
            let names: Vec<&str> = objective
                .unreferenced_sources
                .iter()
                .map(|s| s.as_str())
                .collect();
            lines.push(format!("  - Use data from: {}", names.join(", ")));
        }
        if !objective.balanced {
            lines.push("  - Balance the number of points across sections".to_string());
        }
        lines.push(String::new());
    }

    lines.push(format!("Score: {}", score));
    lines.join("\n")
}
