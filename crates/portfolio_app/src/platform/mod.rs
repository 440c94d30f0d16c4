mod app;
mod cli;
mod config;
mod effects;
mod routes;
mod session;
mod ui;

pub use app::{run_app, serve, Site, SiteError};
pub use cli::{Args, LogTarget};
pub use config::{load_config, CompletionConfig, ConfigError, SiteConfig};
pub use routes::{handle, MAX_BODY_BYTES};
pub use session::{Session, SessionId, SessionStore};
