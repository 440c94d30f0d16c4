//! Stable element identifiers shared by the template and the routes.

pub const INPUT_USER: &str = "user-input";
pub const BUTTON_SEND: &str = "send-button";
pub const BOX_CHAT: &str = "chat-box";
pub const ANCHOR_CHAT_END: &str = "chat-end";
pub const LIST_PROJECTS: &str = "project-list";

/// Form field carrying the session id.
pub const FIELD_SESSION: &str = "sid";
/// Form field carrying the chat text.
pub const FIELD_MESSAGE: &str = "message";
