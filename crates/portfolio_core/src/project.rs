use serde::{Deserialize, Serialize};

/// One portfolio project as shown in the project list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    pub description: String,
}

impl ProjectRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

const DEFAULT_PROJECTS: &[(&str, &str)] = &[
    (
        "Excel Stock Automation",
        "Automates ceramic tile stock management using Excel VBA and triggers smart alerts for dispatch mismatches.",
    ),
    (
        "Secure Web Inventory App",
        "Web-based inventory tool with password-protected actions, CSV import/export, and real-time stock alerts.",
    ),
    (
        "AI-Powered Resume Analyzer",
        "GPT-based tool that evaluates resumes and offers suggestions based on job role alignment.",
    ),
];

/// The built-in project list, used when configuration does not supply one.
pub fn default_projects() -> Vec<ProjectRecord> {
    DEFAULT_PROJECTS
        .iter()
        .map(|(name, description)| ProjectRecord::new(*name, *description))
        .collect()
}
