//! Portfolio engine: outbound completion calls and their cancellation.
mod complete;
mod engine;
mod types;

pub use complete::{
    extract_reply, Completer, CompletionSettings, ReqwestCompleter, DEFAULT_ENDPOINT,
    DEFAULT_MODEL,
};
pub use engine::CompletionEngine;
pub use types::{
    ChatMessage, ChatRole, CompletionError, CompletionRequest, EngineEvent, FailureKind,
    Generation,
};
