use std::convert::Infallible;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use portfolio_core::{project_blocks, ProjectBlockView, StockLedger};
use portfolio_engine::{Completer, CompletionError, ReqwestCompleter};
use site_logging::{site_debug, site_info, site_warn};
use tokio::net::TcpListener;

use super::cli::Args;
use super::config::{load_config, ConfigError, SiteConfig};
use super::routes;
use super::session::SessionStore;
use super::ui::render::PageRenderer;

#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("completion client error: {0}")]
    Completion(#[from] CompletionError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a request handler needs, shared across connections.
pub struct Site {
    config: SiteConfig,
    renderer: PageRenderer,
    sessions: SessionStore,
    completer: Arc<dyn Completer>,
    projects: Vec<ProjectBlockView>,
    stock: Mutex<StockLedger>,
}

impl Site {
    pub fn new(config: SiteConfig, completer: Arc<dyn Completer>) -> Result<Self, SiteError> {
        let renderer = PageRenderer::new().map_err(Box::new)?;
        let sessions = SessionStore::new(
            completer.clone(),
            config.session_ttl(),
            config.max_sessions,
        );
        let projects = project_blocks(&config.projects());
        Ok(Self {
            config,
            renderer,
            sessions,
            completer,
            projects,
            stock: Mutex::new(StockLedger::new()),
        })
    }

    /// Builds the site with a real completion client; the credential comes from the environment.
    pub fn from_config(config: SiteConfig) -> Result<Self, SiteError> {
        let settings = config.completion_settings(|name| std::env::var(name).ok());
        site_debug!("Completion settings: {:?}", settings);
        let completer = ReqwestCompleter::new(settings)?;
        Self::new(config, Arc::new(completer))
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub(crate) fn renderer(&self) -> &PageRenderer {
        &self.renderer
    }

    pub(crate) fn completer(&self) -> &dyn Completer {
        self.completer.as_ref()
    }

    pub(crate) fn project_blocks(&self) -> &[ProjectBlockView] {
        &self.projects
    }

    pub(crate) fn stock(&self) -> MutexGuard<'_, StockLedger> {
        self.stock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn projects_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.projects
                .iter()
                .map(|block| {
                    serde_json::json!({
                        "name": block.name,
                        "description": block.description,
                    })
                })
                .collect(),
        )
    }
}

/// Accepts connections until `shutdown` resolves.
pub async fn serve<F>(site: Arc<Site>, listener: TcpListener, shutdown: F) -> Result<(), SiteError>
where
    F: Future<Output = ()>,
{
    site_info!("Listening on http://{}", listener.local_addr()?);
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                site_info!("Shutdown requested");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        site_warn!("Accept failed: {}", err);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let site = site.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let site = site.clone();
                        async move { Ok::<_, Infallible>(routes::handle(site, req).await) }
                    });
                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        site_debug!("Connection from {} ended with error: {}", peer, err);
                    }
                });
            }
        }
    }
}

pub fn run_app(args: Args) -> anyhow::Result<()> {
    if !site_logging::initialize(
        args.log.into(),
        args.log_level,
        Path::new(site_logging::DEFAULT_LOG_FILE),
    ) {
        eprintln!("Warning: Could not initialize logging; continuing without logs");
    }

    let mut config = load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    let bind = config.bind;
    let site = Arc::new(Site::from_config(config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(bind).await?;
        serve(site, listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                site_warn!("Could not listen for ctrl-c: {}", err);
                std::future::pending::<()>().await;
            }
        })
        .await?;
        Ok::<(), SiteError>(())
    })?;
    Ok(())
}
