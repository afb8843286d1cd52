//! Prompt builder - deterministic instruction construction
//!
//! Maps (content, level, domain context) to the instruction text sent to the
//! remote model. Pure functions only; validation of the content itself
//! happens in the orchestrator before any prompt is built.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EnhanceError;

/// Required response shape, stated verbatim in every outbound instruction so
/// the parser's expectations stay self-consistent with what the model is told.
pub const RESPONSE_CONTRACT: &str =
    r#"{"enhancedContent": string, "improvementsSummary": string[], "confidence": number}"#;

/// Enhancement intensity preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementLevel {
    /// Minimal clarity and grammar pass
    Spark,
    /// Adds persona framing, step structure, and examples
    Glow,
    /// Adds systematic multi-phase reasoning, validation, and optimization
    Shine,
}

impl std::fmt::Display for EnhancementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spark => write!(f, "spark"),
            Self::Glow => write!(f, "glow"),
            Self::Shine => write!(f, "shine"),
        }
    }
}

impl std::str::FromStr for EnhancementLevel {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spark" => Ok(Self::Spark),
            "glow" => Ok(Self::Glow),
            "shine" => Ok(Self::Shine),
            other => Err(EnhanceError::Configuration(format!(
                "unknown enhancement level '{}', expected spark, glow, or shine",
                other
            ))),
        }
    }
}

/// Domain the prompt is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DomainContext {
    General,
    Technical,
    Creative,
    Analytical,
    Business,
}

impl std::fmt::Display for DomainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Technical => write!(f, "technical"),
            Self::Creative => write!(f, "creative"),
            Self::Analytical => write!(f, "analytical"),
            Self::Business => write!(f, "business"),
        }
    }
}

impl std::str::FromStr for DomainContext {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "technical" => Ok(Self::Technical),
            "creative" => Ok(Self::Creative),
            "analytical" => Ok(Self::Analytical),
            "business" => Ok(Self::Business),
            other => Err(EnhanceError::Configuration(format!(
                "unknown domain context '{}'",
                other
            ))),
        }
    }
}

impl DomainContext {
    /// Descriptive phrase embedded in the instruction text
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::General => "general-purpose writing",
            Self::Technical => "technical documentation and software engineering",
            Self::Creative => "creative and narrative writing",
            Self::Analytical => "analytical and data-driven reasoning",
            Self::Business => "business and professional communication",
        }
    }
}

/// One logical enhancement request. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct EnhancementRequest {
    pub content: String,
    pub level: EnhancementLevel,
    pub context: DomainContext,
}

impl EnhancementRequest {
    pub fn new(content: impl Into<String>, level: EnhancementLevel, context: DomainContext) -> Self {
        Self {
            content: content.into(),
            level,
            context,
        }
    }
}

/// Spark: minimal clarity/grammar pass
const SPARK_TEMPLATE: &str = r#"You are an expert prompt editor working in the domain of {context}.

Lightly improve the prompt below: fix grammar and spelling, tighten wording, and remove ambiguity. Preserve the author's intent, tone, and structure. Do not add new requirements or expand scope. If there is code in triple backticks (```) leave it unchanged.

Respond with ONLY a JSON object of this exact shape, and nothing else:
{contract}

Here is the prompt to improve:

{prompt}"#;

/// Glow: persona framing, step structure, examples
const GLOW_TEMPLATE: &str = r#"You are an expert prompt engineer working in the domain of {context}.

Rewrite the prompt below to be substantially clearer and more effective:
- Open with an appropriate expert persona for the task.
- Restructure the request into explicit, ordered steps.
- Add one or two concrete examples of the desired output where they help.
- Resolve ambiguity and state implicit constraints explicitly.
Preserve the author's intent. If there is code in triple backticks (```) leave it unchanged.

Respond with ONLY a JSON object of this exact shape, and nothing else:
{contract}

Here is the prompt to improve:

{prompt}"#;

/// Shine: systematic multi-phase reasoning, validation, optimization
const SHINE_TEMPLATE: &str = r#"You are an expert prompt engineer working in the domain of {context}.

Perform a deep rewrite of the prompt below into a rigorous, production-quality instruction:
1. Analyze the underlying goal and restate it precisely.
2. Open with an appropriate expert persona and the context the model needs.
3. Decompose the task into explicit phases with ordered steps and clear inputs/outputs for each phase.
4. Specify validation criteria the answer must satisfy, and instruct the model to self-check against them before responding.
5. Add guidance for edge cases and for optimizing the quality of the final output.
Preserve the author's intent. If there is code in triple backticks (```) leave it unchanged.

Respond with ONLY a JSON object of this exact shape, and nothing else:
{contract}

Here is the prompt to improve:

{prompt}"#;

fn level_template(level: EnhancementLevel) -> &'static str {
    match level {
        EnhancementLevel::Spark => SPARK_TEMPLATE,
        EnhancementLevel::Glow => GLOW_TEMPLATE,
        EnhancementLevel::Shine => SHINE_TEMPLATE,
    }
}

/// Build the instruction text for one request.
///
/// The static placeholders are substituted with `replace`; the user content
/// is spliced with split+concat so a literal `{prompt}` or `{contract}`
/// inside user content is never substituted.
pub fn build_prompt(request: &EnhancementRequest) -> Result<String, EnhanceError> {
    let template = level_template(request.level)
        .replace("{context}", request.context.phrase())
        .replace("{contract}", RESPONSE_CONTRACT);

    let (before, after) = template.split_once("{prompt}").ok_or_else(|| {
        EnhanceError::Configuration("enhancement template missing {prompt} placeholder".to_string())
    })?;

    let content = request.content.trim();
    let mut rendered = String::with_capacity(before.len() + content.len() + after.len());
    rendered.push_str(before);
    rendered.push_str(content);
    rendered.push_str(after);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_contains_contract() {
        let request = EnhancementRequest::new(
            "Write a poem",
            EnhancementLevel::Spark,
            DomainContext::Creative,
        );
        let prompt = build_prompt(&request).unwrap();
        assert!(prompt.contains(RESPONSE_CONTRACT));
        assert!(prompt.contains("creative and narrative writing"));
        assert!(prompt.ends_with("Write a poem"));
    }

    #[test]
    fn test_build_prompt_preserves_placeholder_in_content() {
        let request = EnhancementRequest::new(
            "Explain what {prompt} interpolation means",
            EnhancementLevel::Glow,
            DomainContext::Technical,
        );
        let prompt = build_prompt(&request).unwrap();
        assert!(prompt.contains("Explain what {prompt} interpolation means"));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(
            "Shine".parse::<EnhancementLevel>().unwrap(),
            EnhancementLevel::Shine
        );
        assert!("blaze".parse::<EnhancementLevel>().is_err());
    }

    #[test]
    fn test_context_parsing() {
        assert_eq!(
            " Business ".parse::<DomainContext>().unwrap(),
            DomainContext::Business
        );
        assert!("legal".parse::<DomainContext>().is_err());
    }
}
