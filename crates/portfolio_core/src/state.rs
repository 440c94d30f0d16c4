use crate::view_model::{AppViewModel, TranscriptEntryView};

pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Visible failure notice; never sent upstream.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    transcript: Vec<TranscriptEntry>,
    last_generation: Generation,
    in_flight: Option<Generation>,
    scroll_to_end: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            input: self.input.clone(),
            transcript: self
                .transcript
                .iter()
                .map(|entry| TranscriptEntryView {
                    role: entry.role,
                    text: entry.text.clone(),
                })
                .collect(),
            awaiting_reply: self.in_flight.is_some(),
            scroll_to_end: self.scroll_to_end,
        }
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Generation of the request whose reply is still expected, if any.
    pub fn in_flight(&self) -> Option<Generation> {
        self.in_flight
    }

    pub(crate) fn set_input(&mut self, text: String) {
        self.input = text;
    }

    pub(crate) fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    pub(crate) fn push_entry(&mut self, role: Role, text: String) {
        self.transcript.push(TranscriptEntry { role, text });
        self.scroll_to_end = role != Role::User;
    }

    /// Tags a new submission; returns its generation and the one it supersedes.
    pub(crate) fn begin_request(&mut self) -> (Generation, Option<Generation>) {
        self.last_generation += 1;
        let superseded = self.in_flight.replace(self.last_generation);
        (self.last_generation, superseded)
    }

    /// Closes the in-flight request if `generation` is still the current one.
    pub(crate) fn finish_request(&mut self, generation: Generation) -> bool {
        if self.in_flight == Some(generation) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }
}
