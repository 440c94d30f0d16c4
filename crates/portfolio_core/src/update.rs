use crate::{AppState, Effect, Msg, Role};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::Submitted => {
            // Blank input is ignored outright; the input box keeps its contents.
            if state.input().trim().is_empty() {
                return (state, Vec::new());
            }

            let text = state.take_input().trim().to_string();
            state.push_entry(Role::User, text.clone());
            let (generation, superseded) = state.begin_request();

            let mut effects = Vec::with_capacity(2);
            if let Some(stale) = superseded {
                effects.push(Effect::CancelCompletion { generation: stale });
            }
            effects.push(Effect::RequestCompletion { generation, text });
            effects
        }
        Msg::CompletionFinished { generation, result } => {
            // Latest submission wins: anything else is a stale reply.
            if !state.finish_request(generation) {
                return (state, Vec::new());
            }
            match result {
                Ok(reply) => state.push_entry(Role::Assistant, reply),
                Err(failure) => state.push_entry(Role::Error, failure.to_string()),
            }
            Vec::new()
        }
    };

    (state, effects)
}
