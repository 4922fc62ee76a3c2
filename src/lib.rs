//! Talk to your PC in natural language.
//!
//! A request names one of three capabilities (diagnosis, settings lookup,
//! troubleshooting) plus free text. The model is asked for a JSON action,
//! the action's `command` runs through the platform shell, and the caller
//! gets readable text back.

pub mod action;
pub mod config;
pub mod error;
pub mod events;
pub mod exec;
pub mod extract;
pub mod host;
pub mod inference;
pub mod llm;
pub mod prompts;
pub mod server;
pub mod synth;
pub mod tools;
pub mod types;

pub use action::StructuredAction;
pub use config::{Credential, Settings};
pub use error::{InferenceError, ToolError};
pub use events::ToolEvent;
pub use exec::{CommandOutput, ShellExecutor};
pub use extract::{extract_json_block, extract_with_mode, FenceMode};
pub use host::HostInfo;
pub use inference::{
    create_provider, AnthropicProvider, AzureOpenAiProvider, InferenceProvider, OpenAiProvider,
};
pub use llm::LlmClient;
pub use server::AppState;
pub use synth::CommandSynthesizer;
pub use tools::{Dispatcher, ToolRegistry};
pub use types::{
    Capability, ContentBlock, InferenceRequest, InferenceResponse, LlmExchange, StopReason,
    ToolRequest, ToolResult, Usage,
};
