pub mod fetcher;
pub mod heuristic;
pub mod llm;
pub mod strategy;

pub use fetcher::ReqwestFetcher;
pub use heuristic::{HeuristicExtractor, parse_job_post};
pub use llm::OpenAiExtractor;
pub use strategy::ExtractionStrategy;
