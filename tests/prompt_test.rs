//! Tests for the prompt builder

use promptglow::enhancer::{
    build_prompt, DomainContext, EnhancementLevel, EnhancementRequest, RESPONSE_CONTRACT,
};

fn request(level: EnhancementLevel, context: DomainContext) -> EnhancementRequest {
    EnhancementRequest::new("Summarize the quarterly report", level, context)
}

// ========================================================================
// Response contract
// ========================================================================

#[test]
fn test_every_level_states_contract_verbatim() {
    for level in [
        EnhancementLevel::Spark,
        EnhancementLevel::Glow,
        EnhancementLevel::Shine,
    ] {
        let prompt = build_prompt(&request(level, DomainContext::General)).unwrap();
        assert!(
            prompt.contains(RESPONSE_CONTRACT),
            "level {} must state the response contract",
            level
        );
    }
}

#[test]
fn test_contract_names_all_fields() {
    assert!(RESPONSE_CONTRACT.contains("enhancedContent"));
    assert!(RESPONSE_CONTRACT.contains("improvementsSummary"));
    assert!(RESPONSE_CONTRACT.contains("confidence"));
}

// ========================================================================
// Domain context phrases
// ========================================================================

#[test]
fn test_every_context_maps_to_its_phrase() {
    let cases = [
        (DomainContext::General, "general-purpose writing"),
        (
            DomainContext::Technical,
            "technical documentation and software engineering",
        ),
        (DomainContext::Creative, "creative and narrative writing"),
        (
            DomainContext::Analytical,
            "analytical and data-driven reasoning",
        ),
        (
            DomainContext::Business,
            "business and professional communication",
        ),
    ];

    for (context, phrase) in cases {
        assert_eq!(context.phrase(), phrase);
        let prompt = build_prompt(&request(EnhancementLevel::Glow, context)).unwrap();
        assert!(
            prompt.contains(phrase),
            "context {} phrase missing from prompt",
            context
        );
    }
}

// ========================================================================
// Level escalation
// ========================================================================

#[test]
fn test_levels_produce_distinct_escalating_instructions() {
    let spark = build_prompt(&request(EnhancementLevel::Spark, DomainContext::General)).unwrap();
    let glow = build_prompt(&request(EnhancementLevel::Glow, DomainContext::General)).unwrap();
    let shine = build_prompt(&request(EnhancementLevel::Shine, DomainContext::General)).unwrap();

    assert_ne!(spark, glow);
    assert_ne!(glow, shine);

    // Spark stays minimal; Glow introduces persona and steps; Shine adds
    // phased reasoning and validation on top.
    assert!(spark.contains("Lightly improve"));
    assert!(!spark.contains("persona"));
    assert!(glow.contains("persona"));
    assert!(glow.contains("steps"));
    assert!(shine.contains("phases"));
    assert!(shine.contains("validation criteria"));
}

// ========================================================================
// Content handling
// ========================================================================

#[test]
fn test_content_is_trimmed_and_appended() {
    let req = EnhancementRequest::new(
        "   Write docs   ",
        EnhancementLevel::Spark,
        DomainContext::Technical,
    );
    let prompt = build_prompt(&req).unwrap();
    assert!(prompt.ends_with("Write docs"));
}

#[test]
fn test_placeholder_text_inside_content_survives() {
    let req = EnhancementRequest::new(
        "Explain {prompt} and {context} template placeholders",
        EnhancementLevel::Shine,
        DomainContext::Technical,
    );
    let prompt = build_prompt(&req).unwrap();
    assert!(prompt.contains("Explain {prompt} and {context} template placeholders"));
}

#[test]
fn test_determinism() {
    let a = build_prompt(&request(EnhancementLevel::Glow, DomainContext::Business)).unwrap();
    let b = build_prompt(&request(EnhancementLevel::Glow, DomainContext::Business)).unwrap();
    assert_eq!(a, b);
}
