//! Core `InstructionInterpreter` trait and `ApiInterpreter` implementation.
//!
//! `ApiInterpreter` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint (Ollama in OpenAI mode, OpenAI, Groq, LM Studio, vLLM …).
//! All connection details come from [`InterpreterConfig`]; nothing is
//! hardcoded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InterpreterConfig;
use crate::interpreter::prompt::PromptBuilder;
use crate::interpreter::reply::parse_reply;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Everything the interpreter needs to answer one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionRequest {
    pub recipe_title: String,
    pub instructions: Vec<String>,
    pub current_step: usize,
    pub current_instruction: String,
    pub user_query: String,
    pub language: String,
}

/// Interpreter answer.  `next_step == -1` ends the session.
///
/// `next_step` is not trusted: the session controller validates it against
/// the recipe before moving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionResponse {
    pub response_text: String,
    pub next_step: i64,
}

impl InstructionResponse {
    pub fn new(response_text: impl Into<String>, next_step: i64) -> Self {
        Self {
            response_text: response_text.into(),
            next_step,
        }
    }
}

/// Sentinel `next_step` value that ends the session.
pub const END_OF_SESSION: i64 = -1;

// ---------------------------------------------------------------------------
// InterpreterError
// ---------------------------------------------------------------------------

/// Errors that can occur while interpreting an utterance.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("interpreter request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status code.
    #[error("interpreter returned HTTP {0}")]
    Status(u16),

    /// The reply could not be parsed as the expected JSON.
    #[error("failed to parse interpreter reply: {0}")]
    Parse(String),

    /// The reply carried no usable content.
    #[error("interpreter returned an empty reply")]
    EmptyResponse,
}

impl From<reqwest::Error> for InterpreterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InterpreterError::Timeout
        } else if let Some(status) = e.status() {
            InterpreterError::Status(status.as_u16())
        } else {
            InterpreterError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// InstructionInterpreter trait
// ---------------------------------------------------------------------------

/// Maps (recipe context + utterance) to (spoken reply, next step).
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn InstructionInterpreter>` and called from a spawned task.
#[async_trait]
pub trait InstructionInterpreter: Send + Sync {
    async fn interpret(
        &self,
        request: &InstructionRequest,
    ) -> Result<InstructionResponse, InterpreterError>;
}

// ---------------------------------------------------------------------------
// ApiInterpreter
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint and asks for a
/// JSON object reply.
pub struct ApiInterpreter {
    client: reqwest::Client,
    config: InterpreterConfig,
    prompt_builder: PromptBuilder,
}

impl ApiInterpreter {
    /// Build an `ApiInterpreter` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &InterpreterConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl InstructionInterpreter for ApiInterpreter {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn interpret(
        &self,
        request: &InstructionRequest,
    ) -> Result<InstructionResponse, InterpreterError> {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(request);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream":          false,
            "temperature":     self.config.temperature,
            "max_tokens":      256,
            "response_format": { "type": "json_object" }
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        log::debug!(
            "interpreter: POST {} (step {}, query {:?})",
            self.endpoint(),
            request.current_step,
            request.user_query
        );

        let response = req.send().await?.error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InterpreterError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(InterpreterError::EmptyResponse)?;

        parse_reply(content, request.current_step)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
