pub mod answer_solver;
pub mod file_fetcher;
pub mod file_summarizer;
pub mod llm_service;
pub mod quiz_extractor;
pub mod submitter;

pub use answer_solver::FileSummary;
pub use file_fetcher::{FileFetcher, HttpFileFetcher};
pub use file_summarizer::{DefaultSummarizer, FileKind, FileSummarizer};
pub use llm_service::{LlmGateway, LlmService};
pub use submitter::{HttpSubmitter, SubmissionPayload, Submitter};
