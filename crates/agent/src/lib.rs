//! Chat agent runtime.
//!
//! This crate turns one inbound chat message into one structured reply:
//! - **Prompt** (`prompt`) - fixed sales-assistant instruction, optional catalog text
//! - **Model** (`llm`) - pluggable `LlmClient` with Gemini, OpenAI and Ollama backends
//! - **Runtime** (`runtime`) - `ChatRuntime` ties catalog, prompt, model and order
//!   extraction together
//!
//! # Flow
//!
//! ```text
//! message → catalog text (if enabled) → prompt → model → raw reply → OrderIntent
//! ```
//!
//! No conversation history is kept; every call to `ChatRuntime::handle_message`
//! is independent.

pub mod llm;
pub mod prompt;
pub mod runtime;

pub use llm::{build_llm_client, HttpLlmClient, LlmClient};
pub use prompt::PromptTemplate;
pub use runtime::ChatRuntime;
