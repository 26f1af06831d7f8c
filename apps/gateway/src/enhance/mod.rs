// Content enhancement: rewrites a single resume text field through the LLM.
// Implements: input sanitisation and filters, randomised prompts, output cleanup.
// All LLM calls go through llm_client; nothing here talks to Anthropic directly.

pub mod enhancer;
pub mod handlers;
pub mod models;
pub mod postprocess;
pub mod prompts;
pub mod validation;
