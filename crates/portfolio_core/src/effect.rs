use crate::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the completion endpoint for a reply to `text`.
    RequestCompletion { generation: Generation, text: String },
    /// Abort a request that a newer submission superseded.
    CancelCompletion { generation: Generation },
}
