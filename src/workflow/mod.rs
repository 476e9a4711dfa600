pub mod quiz_step;
pub mod step_ctx;

pub use quiz_step::{QuizStepExecutor, StepRunner, StepServices};
pub use step_ctx::StepCtx;
