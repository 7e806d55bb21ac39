//! Analyzer and editor prompts
//!
//! The critic prompt lives with the rubric in [`crate::quality::rubric`].

use crate::research::{ResearchMaterial, GROUNDING_LIMIT};

pub const ANALYZER_SYSTEM: &str =
    "You are a financial analyst. You only state facts that appear in the data you are given.";

pub const EDITOR_SYSTEM: &str =
    "You are an editor revising a SWOT analysis. You only use facts from the source data you are given.";

const STRATEGIES: &[(&str, &str)] = &[
    (
        "Cost Leadership",
        "Focus on pricing efficiency, economies of scale, and supply chain optimization to achieve the lowest cost position in the industry.",
    ),
    (
        "Differentiation",
        "Focus on unique product features, brand strength, innovation, and customer experience to command premium pricing.",
    ),
    (
        "Focus",
        "Focus on serving a specific market segment exceptionally well, with deep expertise and tailored solutions.",
    ),
    (
        "Innovation",
        "Focus on research investment, new product pipelines, and the ability to open new markets ahead of competitors.",
    ),
    (
        "Growth",
        "Focus on revenue expansion, market share gains, and the capacity to fund growth from cash flow or capital markets.",
    ),
    (
        "Defensive",
        "Focus on balance sheet resilience, earnings stability, and protection against macroeconomic and competitive shocks.",
    ),
];

/// Context sentence for a focus label. Unknown labels are passed through.
pub fn strategy_context(focus: &str) -> String {
    STRATEGIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(focus.trim()))
        .map(|(_, context)| context.to_string())
        .unwrap_or_else(|| focus.to_string())
}

pub fn analyzer_prompt(material: &ResearchMaterial, focus: &str) -> String {
    let company = &material.company;
    let ticker = material.ticker.as_deref().unwrap_or("N/A");
    let context = strategy_context(focus);
    let data = material.render();

    format!(
        r#"You are creating a SWOT analysis for {company} ({ticker}).

CRITICAL INSTRUCTIONS:
1. ONLY use the data provided below. DO NOT invent or assume any information.
2. Every point MUST cite specific numbers from the data (e.g. "P/E of 21.3", "Beta of 0.88").
3. If data is missing for a category, say "Insufficient data". Do not make up information.
4. Focus on what the numbers actually mean for this specific company.
5. Tailor the analysis to the industry {company} operates in.

Strategic Focus: {focus}
Context: {context}

=== ACTUAL DATA FROM FINANCIAL SOURCES ===
{data}

Based ONLY on the data above, provide a SWOT analysis in this format:

Strengths:
- [Cite specific metrics that show strengths]

Weaknesses:
- [Cite specific metrics that show weaknesses]

Opportunities:
- [Cite macro or market conditions that create opportunities]

Threats:
- [Cite risks from volatility, macro conditions or sentiment]

Every bullet point must reference actual data provided above."#
    )
}

pub fn editor_prompt(
    material: &ResearchMaterial,
    draft: &str,
    critique: &str,
    focus: &str,
) -> String {
    let source_data = material.render_truncated(GROUNDING_LIMIT);

    format!(
        r#"Revise this SWOT analysis based on the critique.

GROUNDING RULES:
1. Use ONLY facts and numbers from the SOURCE DATA below.
2. Do not invent, assume or fabricate anything that is not in the source data.
3. Every claim must cite specific numbers from the source data.
4. If the critique asks for information that is not in the source data, write "Data not available".

SOURCE DATA:
{source_data}

CURRENT DRAFT:
{draft}

CRITIQUE:
{critique}

Strategic Focus: {focus}

REVISION INSTRUCTIONS:
1. Address the critique points using only the source data
2. Keep all four sections: Strengths, Weaknesses, Opportunities, Threats
3. Make strengths and opportunities positive, weaknesses and threats negative
4. Align the analysis with the {focus} strategic focus
5. Remove any point whose data is missing rather than inventing figures

Return only the improved SWOT analysis."#
    )
}
