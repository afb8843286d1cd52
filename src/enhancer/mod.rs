//! Enhancement core: prompt construction, orchestration, response
//! normalization, and connection tracking

pub mod client;
pub mod connection;
pub mod parser;
pub mod prompt;

pub use client::{EnhancementClient, EnhancerOptions};
pub use connection::{ConnectionState, ConnectionTracker};
pub use parser::{
    normalize_text, parse_response, parse_response_with_strategy, EnhancementResult,
    ParseStrategy, DEFAULT_CONFIDENCE, FALLBACK_CONFIDENCE,
};
pub use prompt::{
    build_prompt, DomainContext, EnhancementLevel, EnhancementRequest, RESPONSE_CONTRACT,
};
