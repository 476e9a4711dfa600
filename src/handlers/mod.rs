pub mod quiz_handler;

pub use quiz_handler::{handle_quiz, health_check, json_config, QuizRequest};
