use std::error::Error as StdError;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use portfolio_core::{
    boxes_to_sqm, sqm_to_sqft, ChatFailure, Msg, ProductionRecord, StockLevel,
};
use portfolio_engine::FailureKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use site_logging::{site_error, site_info, site_warn};

use super::app::Site;
use super::effects::{map_failure, EffectRunner};
use super::session::{Session, SessionId};
use super::ui::render::page_context;

/// Largest request body accepted on any route.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const KNOWN_PATHS: &[&str] = &[
    "/",
    "/chat",
    "/api/chat",
    "/api/projects",
    "/api/stock",
    "/api/stock/production",
    "/api/stock/convert",
    "/healthz",
];

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiChatRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct ProductionAdded<'a> {
    key: &'a str,
    stock: StockLevel,
}

#[derive(Debug, Deserialize)]
struct ConvertQuery {
    size: String,
    #[serde(default)]
    quality: String,
    boxes: u32,
}

/// Routes one HTTP request. Never fails: every error becomes a response.
pub async fn handle<B>(site: Arc<Site>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => index(&site),
        (&Method::POST, "/chat") => match read_body(req.into_body()).await {
            Ok(body) => chat_form(&site, &body).await,
            Err(response) => response,
        },
        (&Method::POST, "/api/chat") => match read_body(req.into_body()).await {
            Ok(body) => api_chat(&site, &body).await,
            Err(response) => response,
        },
        (&Method::GET, "/api/projects") => json_response(StatusCode::OK, &site.projects_json()),
        (&Method::GET, "/api/stock") => stock_levels(&site),
        (&Method::DELETE, "/api/stock") => reset_stock(&site),
        (&Method::POST, "/api/stock/production") => match read_body(req.into_body()).await {
            Ok(body) => add_production(&site, &body),
            Err(response) => response,
        },
        (&Method::GET, "/api/stock/convert") => convert(req.uri().query().unwrap_or_default()),
        (&Method::GET, "/healthz") => text_response(StatusCode::OK, "ok"),
        (_, known) if KNOWN_PATHS.contains(&known) => {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        }
        _ => text_response(StatusCode::NOT_FOUND, "not found"),
    };

    site_info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

fn index(site: &Site) -> Response<Full<Bytes>> {
    let (id, session) = site.sessions().create();
    render_page(site, id, &session)
}

async fn chat_form(site: &Site, body: &[u8]) -> Response<Full<Bytes>> {
    let form: ChatForm = match serde_urlencoded::from_bytes(body) {
        Ok(form) => form,
        Err(err) => {
            return text_response(StatusCode::BAD_REQUEST, &format!("invalid form: {err}"));
        }
    };

    let (id, session) = site.sessions().resume_or_create(form.sid.as_deref());
    session.dispatch(Msg::InputChanged(form.message));
    let effects = session.dispatch(Msg::Submitted);
    EffectRunner::new(&session).run(effects).await;

    render_page(site, id, &session)
}

async fn api_chat(site: &Site, body: &[u8]) -> Response<Full<Bytes>> {
    let request: ApiChatRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": format!("invalid request: {err}") }),
            );
        }
    };

    let text = request.message.trim();
    if text.is_empty() {
        return json_response(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "message is empty" }),
        );
    }

    match site.completer().complete(text).await {
        Ok(reply) => json_response(StatusCode::OK, &json!({ "reply": reply })),
        Err(err) => {
            let status = match err.kind {
                FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                FailureKind::MissingCredential | FailureKind::InvalidEndpoint => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                _ => StatusCode::BAD_GATEWAY,
            };
            site_error!("Proxy completion failed: {}", err);
            let failure: ChatFailure = map_failure(&err);
            json_response(status, &json!({ "error": failure.to_string() }))
        }
    }
}

fn stock_levels(site: &Site) -> Response<Full<Bytes>> {
    let stock = site.stock();
    serialized_response(StatusCode::OK, stock.levels())
}

fn reset_stock(site: &Site) -> Response<Full<Bytes>> {
    site.stock().reset();
    site_info!("Stock ledger reset");
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

fn add_production(site: &Site, body: &[u8]) -> Response<Full<Bytes>> {
    let record: ProductionRecord = match serde_json::from_slice(body) {
        Ok(record) => record,
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": format!("invalid production record: {err}") }),
            );
        }
    };

    let added = site.stock().add_production(&record);
    match added {
        Ok((key, stock)) => {
            site_info!(
                "Production added key={} boxes={} total_boxes={}",
                key,
                record.boxes,
                stock.boxes
            );
            serialized_response(StatusCode::OK, &ProductionAdded { key: &key, stock })
        }
        Err(err) => {
            site_warn!("Production rejected: {}", err);
            json_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &json!({ "error": err.to_string() }),
            )
        }
    }
}

fn convert(query: &str) -> Response<Full<Bytes>> {
    let query: ConvertQuery = match serde_urlencoded::from_str(query) {
        Ok(query) => query,
        Err(err) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &json!({ "error": format!("invalid query: {err}") }),
            );
        }
    };
    match boxes_to_sqm(&query.size, &query.quality, query.boxes) {
        Ok(sqm) => json_response(
            StatusCode::OK,
            &json!({ "sqm": sqm, "sqft": sqm_to_sqft(sqm) }),
        ),
        Err(err) => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &json!({ "error": err.to_string() }),
        ),
    }
}

fn render_page(site: &Site, id: SessionId, session: &Session) -> Response<Full<Bytes>> {
    let config = site.config();
    let context = page_context(
        &config.owner_name,
        &config.tagline,
        &id.to_string(),
        &session.view(),
        site.project_blocks(),
    );
    match site.renderer().render(&context) {
        Ok(html) => with_content_type(
            Response::new(Full::new(Bytes::from(html))),
            "text/html; charset=utf-8",
        ),
        Err(err) => {
            site_error!("Failed to render page: {}", err);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

async fn read_body<B>(body: B) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(text_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large",
        )),
        Err(err) => Err(text_response(
            StatusCode::BAD_REQUEST,
            &format!("failed to read body: {err}"),
        )),
    }
}

fn text_response(status: StatusCode, text: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(text.to_owned())));
    *response.status_mut() = status;
    with_content_type(response, "text/plain; charset=utf-8")
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    with_content_type(response, "application/json")
}

fn serialized_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            *response.status_mut() = status;
            with_content_type(response, "application/json")
        }
        Err(err) => {
            site_error!("Failed to serialize response: {}", err);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn with_content_type(
    mut response: Response<Full<Bytes>>,
    content_type: &'static str,
) -> Response<Full<Bytes>> {
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
