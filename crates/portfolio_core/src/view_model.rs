use crate::{ProjectRecord, Role};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub input: String,
    pub transcript: Vec<TranscriptEntryView>,
    pub awaiting_reply: bool,
    /// Set when the latest entry is a reply the reader should be scrolled to.
    pub scroll_to_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntryView {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectBlockView {
    pub name: String,
    pub description: String,
}

/// One display block per record, in input order.
pub fn project_blocks(projects: &[ProjectRecord]) -> Vec<ProjectBlockView> {
    projects
        .iter()
        .map(|project| ProjectBlockView {
            name: project.name.clone(),
            description: project.description.clone(),
        })
        .collect()
}
