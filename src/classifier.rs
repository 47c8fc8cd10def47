//! Intent classification boundary.
//!
//! `IntentModel` abstracts the LLM call so the pipeline can run against
//! Gemini in production and canned models in tests. `parse_intent`
//! coerces the model's raw text into the closed `ClassifiedIntent`
//! union; anything that does not fit is a classification failure.

use crate::error::AssistantError;
use crate::models::ClassifiedIntent;
use crate::Result;
use async_trait::async_trait;

/// Trait for the structured-output model call (LLM controlled)
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Classify `message` against `system_prompt`, returning the raw
    /// model text.
    async fn classify(&self, system_prompt: &str, message: &str) -> Result<String>;
}

/// Parse a model response into one of the three intent shapes.
pub fn parse_intent(response: &str) -> Result<ClassifiedIntent> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let intent: ClassifiedIntent = serde_json::from_str(cleaned).map_err(|e| {
        AssistantError::UnrecognizedIntent(format!(
            "Output matched none of the declared shapes: {} | raw={}",
            e, response
        ))
    })?;

    if let ClassifiedIntent::Summary(ref summary) = intent {
        if summary.period_days < 1 {
            return Err(AssistantError::UnrecognizedIntent(format!(
                "period_days must be at least 1, got {}",
                summary.period_days
            )));
        }
    }

    Ok(intent)
}
