use std::fmt;

use crate::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the chat input box.
    InputChanged(String),
    /// User submitted the current chat input.
    Submitted,
    /// The completion request for `generation` resolved.
    CompletionFinished {
        generation: Generation,
        result: Result<String, ChatFailure>,
    },
}

/// Why a reply could not be produced, as shown in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFailure {
    Network,
    Timeout,
    HttpStatus(u16),
    MalformedResponse,
    Cancelled,
    /// The proxy has no credential configured.
    Unavailable,
}

impl fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatFailure::Network => write!(f, "Could not reach the assistant. Please try again."),
            ChatFailure::Timeout => write!(f, "The assistant took too long to answer."),
            ChatFailure::HttpStatus(code) => {
                write!(f, "The assistant service returned an error (HTTP {code}).")
            }
            ChatFailure::MalformedResponse => {
                write!(f, "The assistant sent a reply that could not be read.")
            }
            ChatFailure::Cancelled => write!(f, "The request was cancelled."),
            ChatFailure::Unavailable => write!(f, "The assistant is not available right now."),
        }
    }
}
