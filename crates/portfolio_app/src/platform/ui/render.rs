use handlebars::{Handlebars, RenderError, TemplateError};
use portfolio_core::{AppViewModel, ProjectBlockView, Role};
use serde::Serialize;

use super::constants::*;

const PAGE_TEMPLATE: &str = "page";

/// Renders the portfolio page. Every interpolated value is HTML-escaped.
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

#[derive(Debug, Serialize)]
pub struct PageContext {
    pub owner_name: String,
    pub tagline: String,
    pub session_id: String,
    pub input: String,
    pub awaiting_reply: bool,
    pub scroll_to_end: bool,
    pub transcript: Vec<EntryContext>,
    pub projects: Vec<ProjectContext>,
    pub ids: ElementIds,
}

#[derive(Debug, Serialize)]
pub struct EntryContext {
    pub role: &'static str,
    pub speaker: &'static str,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectContext {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ElementIds {
    pub input: &'static str,
    pub send: &'static str,
    pub chat: &'static str,
    pub chat_end: &'static str,
    pub projects: &'static str,
    pub field_session: &'static str,
    pub field_message: &'static str,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            input: INPUT_USER,
            send: BUTTON_SEND,
            chat: BOX_CHAT,
            chat_end: ANCHOR_CHAT_END,
            projects: LIST_PROJECTS,
            field_session: FIELD_SESSION,
            field_message: FIELD_MESSAGE,
        }
    }
}

impl PageRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(
            PAGE_TEMPLATE,
            include_str!("../../../templates/page.html.hbs"),
        )?;
        Ok(Self { registry })
    }

    pub fn render(&self, page: &PageContext) -> Result<String, RenderError> {
        self.registry.render(PAGE_TEMPLATE, page)
    }
}

pub fn page_context(
    owner_name: &str,
    tagline: &str,
    session_id: &str,
    view: &AppViewModel,
    projects: &[ProjectBlockView],
) -> PageContext {
    PageContext {
        owner_name: owner_name.to_string(),
        tagline: tagline.to_string(),
        session_id: session_id.to_string(),
        input: view.input.clone(),
        awaiting_reply: view.awaiting_reply,
        scroll_to_end: view.scroll_to_end,
        transcript: view
            .transcript
            .iter()
            .map(|entry| EntryContext {
                role: role_class(entry.role),
                speaker: speaker_label(entry.role),
                text: entry.text.clone(),
            })
            .collect(),
        projects: projects
            .iter()
            .map(|block| ProjectContext {
                name: block.name.clone(),
                description: block.description.clone(),
            })
            .collect(),
        ids: ElementIds::default(),
    }
}

fn role_class(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Error => "error",
    }
}

fn speaker_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "AI",
        Role::Error => "Error",
    }
}
