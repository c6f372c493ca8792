use hnjobs_core::error::AppError;
use hnjobs_core::models::JobFields;
use hnjobs_core::traits::FieldExtractor;

use crate::heuristic::HeuristicExtractor;
use crate::llm::OpenAiExtractor;

/// Extraction strategy chosen once at startup.
#[derive(Clone)]
pub enum ExtractionStrategy {
    Heuristic(HeuristicExtractor),
    Delegated(OpenAiExtractor),
}

impl ExtractionStrategy {
    /// Delegate to the LLM when an extractor is configured, otherwise
    /// fall back to the heuristic parser.
    pub fn select(delegated: Option<OpenAiExtractor>) -> Self {
        match delegated {
            Some(extractor) => Self::Delegated(extractor),
            None => Self::Heuristic(HeuristicExtractor::new()),
        }
    }
}

impl FieldExtractor for ExtractionStrategy {
    async fn extract(&self, text: &str) -> Result<JobFields, AppError> {
        match self {
            Self::Heuristic(e) => e.extract(text).await,
            Self::Delegated(e) => e.extract(text).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Heuristic(e) => e.name(),
            Self::Delegated(e) => e.name(),
        }
    }
}
