//! Instruction interpreter — maps (recipe context + utterance) to a reply.
//!
//! This module provides:
//! * [`InstructionInterpreter`] — async trait implemented by all backends.
//! * [`ApiInterpreter`] — OpenAI-compatible REST backend.
//! * [`OfflineInterpreter`] — keyword navigation, no network.
//! * [`PromptBuilder`] — chat prompt for the REST backend.
//! * [`parse_reply`] — lenient JSON reply parsing.
//! * [`from_config`] — picks a backend from [`InterpreterConfig`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use savora_cook::config::AppConfig;
//! use savora_cook::interpreter::{self, InstructionRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let interpreter = interpreter::from_config(&config.interpreter);
//!
//!     let request = InstructionRequest {
//!         recipe_title: "Toast".into(),
//!         instructions: vec!["Slice bread".into(), "Toast it".into()],
//!         current_step: 0,
//!         current_instruction: "Slice bread".into(),
//!         user_query: "next".into(),
//!         language: "en-US".into(),
//!     };
//!     let reply = interpreter.interpret(&request).await.unwrap();
//!     println!("{} -> step {}", reply.response_text, reply.next_step);
//! }
//! ```

pub mod client;
pub mod offline;
pub mod prompt;
pub mod reply;

use std::sync::Arc;

use crate::config::{InterpreterConfig, InterpreterMode};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{
    ApiInterpreter, InstructionInterpreter, InstructionRequest, InstructionResponse,
    InterpreterError, END_OF_SESSION,
};
pub use offline::OfflineInterpreter;
pub use prompt::PromptBuilder;
pub use reply::parse_reply;

/// Build the interpreter selected by `config.mode`.
pub fn from_config(config: &InterpreterConfig) -> Arc<dyn InstructionInterpreter> {
    match config.mode {
        InterpreterMode::Offline => {
            log::info!("interpreter: offline keyword mode");
            Arc::new(OfflineInterpreter::new())
        }
        InterpreterMode::Api => {
            log::info!(
                "interpreter: {} via {}",
                config.model,
                config.base_url
            );
            Arc::new(ApiInterpreter::from_config(config))
        }
    }
}
