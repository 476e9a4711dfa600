pub mod answer;
pub mod chain;
pub mod quiz;

pub use answer::{Answer, AnswerKind};
pub use chain::{ChainReport, ChainRun, ChainStatus};
pub use quiz::{DownloadedFile, QuizSpec, StepOutcome};
