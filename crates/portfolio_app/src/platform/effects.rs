use std::collections::VecDeque;

use portfolio_core::{ChatFailure, Effect, Msg};
use portfolio_engine::{CompletionError, EngineEvent, FailureKind};
use site_logging::{site_info, site_warn};

use super::session::Session;

/// Executes a session's effects and feeds the resulting messages back into it.
pub struct EffectRunner<'a> {
    session: &'a Session,
}

impl<'a> EffectRunner<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn run(&self, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::CancelCompletion { generation } => {
                    site_info!("CancelCompletion generation={}", generation);
                    self.session.engine().cancel(generation);
                }
                Effect::RequestCompletion { generation, text } => {
                    site_info!(
                        "RequestCompletion generation={} text_len={}",
                        generation,
                        text.len()
                    );
                    let event = self.session.engine().complete(generation, &text).await;
                    let msg = map_event(event);
                    pending.extend(self.session.dispatch(msg));
                }
            }
        }
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Completed { generation, result } => Msg::CompletionFinished {
            generation,
            result: result.map_err(|err| {
                if err.kind != FailureKind::Cancelled {
                    site_warn!("Completion generation={} failed: {}", generation, err);
                }
                map_failure(&err)
            }),
        },
    }
}

/// Collapses engine failures into what the transcript can show.
pub(crate) fn map_failure(err: &CompletionError) -> ChatFailure {
    match err.kind {
        FailureKind::InvalidEndpoint | FailureKind::MissingCredential => ChatFailure::Unavailable,
        FailureKind::HttpStatus(code) => ChatFailure::HttpStatus(code),
        FailureKind::Timeout => ChatFailure::Timeout,
        FailureKind::TooLarge { .. }
        | FailureKind::MalformedResponse
        | FailureKind::MissingCompletion => ChatFailure::MalformedResponse,
        FailureKind::Cancelled => ChatFailure::Cancelled,
        FailureKind::Network => ChatFailure::Network,
    }
}
