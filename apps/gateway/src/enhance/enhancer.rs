//! Content enhancement: sanitise, filter, prompt, call the model, clean up.
//!
//! Flow: sanitize → validate_input → build_prompt → TextGenerator::generate →
//!       clean_output.
//!
//! Signature, origin and rate-limit checks happen in the handler before any
//! of this runs.

use tracing::{info, warn};

use crate::enhance::models::FieldKind;
use crate::enhance::postprocess::{clean_output, OutputError};
use crate::enhance::prompts::build_prompt;
use crate::enhance::validation::{sanitize, validate_input, ContentRejection, RejectionReason};
use crate::errors::AppError;
use crate::llm_client::{GenerationParams, TextGenerator};

/// Short outputs, high temperature for varied phrasing.
const ENHANCE_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 700,
    temperature: 0.9,
};

pub async fn enhance_text(
    generator: &dyn TextGenerator,
    field: FieldKind,
    raw_text: &str,
) -> Result<String, AppError> {
    let text = sanitize(raw_text);

    if let Err(rejection) = validate_input(field, &text) {
        info!(
            field = ?field,
            reason = ?rejection.reason,
            chars = text.chars().count(),
            "Enhancement input rejected"
        );
        return Err(rejection.into());
    }

    let prompt = {
        let mut rng = rand::thread_rng();
        build_prompt(field, &text, &mut rng)
    };

    let raw_output = generator
        .generate(&prompt.system, &prompt.user, ENHANCE_PARAMS)
        .await?;

    match clean_output(field, &raw_output) {
        Ok(enhanced) => {
            info!(
                field = ?field,
                input_chars = text.chars().count(),
                output_chars = enhanced.chars().count(),
                "Enhancement succeeded"
            );
            Ok(enhanced)
        }
        Err(OutputError::NotResumeContent) => {
            info!(field = ?field, "Model classified input as not resume content");
            Err(ContentRejection::new(RejectionReason::NotResumeContent).into())
        }
        Err(e) => {
            warn!(field = ?field, "Discarding model output: {e}");
            Err(AppError::Llm(e.to_string()))
        }
    }
}
