use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use site_logging::site_debug;
use tokio_util::sync::CancellationToken;

use crate::{Completer, CompletionError, EngineEvent, FailureKind, Generation};

/// Runs completions for one chat session, each under its own cancellation token.
///
/// Generations are expected to start in increasing order.
pub struct CompletionEngine {
    completer: Arc<dyn Completer>,
    tokens: Mutex<Tokens>,
}

#[derive(Default)]
struct Tokens {
    live: HashMap<Generation, CancellationToken>,
    // Highest generation whose request has started.
    started_through: Generation,
}

impl CompletionEngine {
    pub fn new(completer: Arc<dyn Completer>) -> Self {
        Self {
            completer,
            tokens: Mutex::new(Tokens::default()),
        }
    }

    pub async fn complete(&self, generation: Generation, text: &str) -> EngineEvent {
        // A cancel may land before the request starts; reuse its token if so.
        let token = {
            let mut tokens = self.tokens();
            tokens.started_through = tokens.started_through.max(generation);
            tokens.live.entry(generation).or_default().clone()
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(CompletionError::new(
                FailureKind::Cancelled,
                "superseded by a newer submission",
            )),
            result = self.completer.complete(text) => result,
        };

        self.tokens().live.remove(&generation);
        site_debug!(
            "Completion generation={} finished ok={}",
            generation,
            result.is_ok()
        );
        EngineEvent::Completed { generation, result }
    }

    /// Cancels the request for `generation`, or pre-cancels it if it has not started.
    /// A generation that already finished is left alone.
    pub fn cancel(&self, generation: Generation) {
        let mut tokens = self.tokens();
        if let Some(token) = tokens.live.get(&generation) {
            site_debug!("Cancelling completion generation={}", generation);
            token.cancel();
        } else if generation > tokens.started_through {
            site_debug!("Pre-cancelling completion generation={}", generation);
            let token = CancellationToken::new();
            token.cancel();
            tokens.live.insert(generation, token);
        } else {
            site_debug!("Completion generation={} already finished", generation);
        }
    }

    /// Number of requests currently tracked (running or pre-cancelled).
    pub fn tracked(&self) -> usize {
        self.tokens().live.len()
    }

    fn tokens(&self) -> MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
