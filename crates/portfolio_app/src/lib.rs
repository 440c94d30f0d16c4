//! Portfolio site: page rendering, chat sessions and the completion proxy.
mod platform;

pub use platform::{
    handle, load_config, run_app, serve, Args, CompletionConfig, ConfigError, LogTarget, Session,
    SessionId, SessionStore, Site, SiteConfig, SiteError, MAX_BODY_BYTES,
};
