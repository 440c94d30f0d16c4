use std::sync::{Arc, Once};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use portfolio_app::{handle, Site, SiteConfig, MAX_BODY_BYTES};
use portfolio_core::{ProjectRecord, Role};
use portfolio_engine::{CompletionSettings, ReqwestCompleter};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "sk-test-secret-do-not-leak";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(site_logging::initialize_for_tests);
}

fn settings_for(server: &MockServer) -> CompletionSettings {
    CompletionSettings {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        model: "test-model".to_string(),
        api_key: Some(SECRET.to_string()),
        ..CompletionSettings::default()
    }
}

fn site_with(settings: CompletionSettings) -> Arc<Site> {
    init_logging();
    let completer = ReqwestCompleter::new(settings).expect("client");
    Arc::new(Site::new(SiteConfig::default(), Arc::new(completer)).expect("site"))
}

fn site_for(server: &MockServer) -> Arc<Site> {
    site_with(settings_for(server))
}

fn api_chat(message: &str) -> Request<Full<Bytes>> {
    post(
        "/api/chat",
        "application/json",
        json!({ "message": message }).to_string(),
    )
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn post(uri: &str, content_type: &str, body: String) -> Request<Full<Bytes>> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn chat_form(sid: &str, message: &str) -> Request<Full<Bytes>> {
    let body = serde_urlencoded::to_string([("sid", sid), ("message", message)]).unwrap();
    post("/chat", "application/x-www-form-urlencoded", body)
}

async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn roles(site: &Site, sid: &str) -> Vec<Role> {
    let id = sid.parse().unwrap();
    site.sessions()
        .get(&id)
        .expect("session")
        .view()
        .transcript
        .iter()
        .map(|entry| entry.role)
        .collect()
}

#[tokio::test]
async fn index_renders_projects_in_order_and_a_session() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    let response = handle(site.clone(), get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert_eq!(html.matches("class=\"project\"").count(), 3);
    let excel = html.find("Excel Stock Automation").unwrap();
    let inventory = html.find("Secure Web Inventory App").unwrap();
    let resume = html.find("AI-Powered Resume Analyzer").unwrap();
    assert!(excel < inventory && inventory < resume);

    assert!(html.contains("id=\"chat-box\""));
    assert!(html.contains("id=\"project-list\""));
    assert!(html.contains("name=\"sid\""));
    assert!(!html.contains("class=\"entry "));
    assert_eq!(site.sessions().len(), 1);
}

#[tokio::test]
async fn chat_round_trip_appends_user_then_assistant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(reply("Hello!"))
        .expect(1)
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let response = handle(site.clone(), chat_form(&sid, "Hi")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let user = html.find("entry entry-user").unwrap();
    let assistant = html.find("entry entry-assistant").unwrap();
    assert!(user < assistant);
    assert!(html.contains("<span>Hi</span>"));
    assert!(html.contains("<span>Hello!</span>"));
    assert!(!html.contains(SECRET));
    assert_eq!(roles(&site, &sid), vec![Role::User, Role::Assistant]);
}

#[tokio::test]
async fn blank_message_makes_no_entry_and_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let html = body_text(handle(site.clone(), chat_form(&sid, "   ")).await).await;

    assert!(!html.contains("class=\"entry "));
    assert!(roles(&site, &sid).is_empty());
}

#[tokio::test]
async fn upstream_error_status_becomes_error_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let response = handle(site.clone(), chat_form(&sid, "anything")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert!(html.contains("entry entry-error"));
    assert!(html.contains("HTTP 500"));
    assert_eq!(roles(&site, &sid), vec![Role::User, Role::Error]);
}

#[tokio::test]
async fn body_without_choices_becomes_error_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "object": "list" })))
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let html = body_text(handle(site.clone(), chat_form(&sid, "Hi")).await).await;

    assert!(html.contains("entry entry-error"));
    assert_eq!(roles(&site, &sid), vec![Role::User, Role::Error]);
}

#[tokio::test]
async fn unreachable_endpoint_becomes_error_entry() {
    let site = site_with(CompletionSettings {
        endpoint: "http://127.0.0.1:1/v1/chat/completions".to_string(),
        api_key: Some(SECRET.to_string()),
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..CompletionSettings::default()
    });
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let response = handle(site.clone(), chat_form(&sid, "Hi")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    assert!(html.contains("Could not reach the assistant"));
    assert_eq!(roles(&site, &sid), vec![Role::User, Role::Error]);
}

#[tokio::test]
async fn missing_credential_becomes_unavailable_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let site = site_with(CompletionSettings {
        api_key: None,
        ..settings_for(&server)
    });
    let (id, _) = site.sessions().create();
    let sid = id.to_string();

    let html = body_text(handle(site.clone(), chat_form(&sid, "Hi")).await).await;

    assert!(html.contains("entry entry-error"));
    assert!(html.contains("not available right now"));
    assert_eq!(roles(&site, &sid), vec![Role::User, Role::Error]);
}

#[tokio::test]
async fn markup_in_messages_is_escaped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("<img src=x onerror=alert(1)>"))
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, _) = site.sessions().create();

    let html = body_text(
        handle(
            site.clone(),
            chat_form(&id.to_string(), "<script>alert(1)</script>"),
        )
        .await,
    )
    .await;

    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!html.contains("<script>"));
    assert!(!html.contains("<img src"));
}

#[tokio::test]
async fn unknown_session_id_starts_a_fresh_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("fresh"))
        .mount(&server)
        .await;
    let site = site_for(&server);

    let html = body_text(handle(site.clone(), chat_form("stale-session", "Hi")).await).await;

    assert_eq!(html.matches("class=\"entry ").count(), 2);
    assert_eq!(site.sessions().len(), 1);
}

#[tokio::test]
async fn newer_submission_supersedes_slow_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("slow question"))
        .respond_with(reply("slow answer").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("fast question"))
        .respond_with(reply("fast answer"))
        .mount(&server)
        .await;
    let site = site_for(&server);
    let (id, session) = site.sessions().create();
    let sid = id.to_string();

    let first = {
        let site = site.clone();
        let sid = sid.clone();
        tokio::spawn(async move { handle(site, chat_form(&sid, "slow question")).await })
    };
    while !session.view().awaiting_reply {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let html = body_text(handle(site.clone(), chat_form(&sid, "fast question")).await).await;
    assert!(html.contains("fast answer"));

    let first = tokio::time::timeout(Duration::from_secs(2), first)
        .await
        .expect("stale request was cancelled")
        .expect("join");
    assert_eq!(first.status(), StatusCode::OK);

    let transcript = session.view().transcript;
    let texts: Vec<_> = transcript.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["slow question", "fast question", "fast answer"]);
}

#[tokio::test]
async fn api_chat_proxies_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("\"content\":\"Hi\""))
        .respond_with(reply("Hello!"))
        .expect(1)
        .mount(&server)
        .await;
    let site = site_for(&server);

    let response = handle(site, api_chat("  Hi ")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({ "reply": "Hello!" }));
}

#[tokio::test]
async fn api_chat_rejects_blank_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let site = site_for(&server);

    let response = handle(site, api_chat(" \n")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_chat_maps_upstream_failure_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let site = site_for(&server);

    let response = handle(site, api_chat("Hi")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let text = body_text(response).await;
    assert!(text.contains("error"));
    assert!(!text.contains(SECRET));
}

#[tokio::test]
async fn api_projects_lists_configured_records() {
    let server = MockServer::start().await;
    init_logging();
    let config = SiteConfig {
        projects: Some(vec![
            ProjectRecord::new("B", "second letter"),
            ProjectRecord::new("A", "first letter"),
        ]),
        ..SiteConfig::default()
    };
    let completer = ReqwestCompleter::new(CompletionSettings {
        endpoint: server.uri(),
        ..CompletionSettings::default()
    })
    .unwrap();
    let site = Arc::new(Site::new(config, Arc::new(completer)).unwrap());

    let response = handle(site, get("/api/projects")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body,
        json!([
            { "name": "B", "description": "second letter" },
            { "name": "A", "description": "first letter" },
        ])
    );
}

#[tokio::test]
async fn unknown_paths_and_methods_are_rejected() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    let missing = handle(site.clone(), get("/nope")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let wrong_method = handle(site.clone(), get("/chat")).await;
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);

    let health = handle(site, get("/healthz")).await;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_text(health).await, "ok");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    let body = format!("sid=x&message={}", "a".repeat(MAX_BODY_BYTES + 1));
    let response = handle(site, post("/chat", "application/x-www-form-urlencoded", body)).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn api_chat_without_credential_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let site = site_with(CompletionSettings {
        api_key: None,
        ..settings_for(&server)
    });

    let response = handle(site, api_chat("Hi")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body,
        json!({ "error": "The assistant is not available right now." })
    );
}

#[tokio::test]
async fn api_chat_maps_slow_upstream_to_gateway_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("too late").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let site = site_with(CompletionSettings {
        request_timeout: Duration::from_millis(200),
        ..settings_for(&server)
    });

    let response = handle(site, api_chat("Hi")).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let text = body_text(response).await;
    assert!(text.contains("took too long"));
}

fn production(body: serde_json::Value) -> Request<Full<Bytes>> {
    post("/api/stock/production", "application/json", body.to_string())
}

async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn production_accumulates_into_stock_levels() {
    let server = MockServer::start().await;
    let site = site_for(&server);
    let batch = json!({
        "size": "600x1200",
        "thickness_mm": 9,
        "quality": "ECO",
        "plant_code": "P1",
        "boxes": 10,
    });

    let first = handle(site.clone(), production(batch.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(
        body_json(first).await,
        json!({
            "key": "600x1200_9mm_ECO_P1",
            "stock": { "boxes": 10, "sqm": 21.6, "sqft": 232.5 },
        })
    );

    handle(site.clone(), production(batch)).await;
    let levels = handle(site.clone(), get("/api/stock")).await;
    assert_eq!(levels.status(), StatusCode::OK);
    assert_eq!(
        body_json(levels).await,
        json!({ "600x1200_9mm_ECO_P1": { "boxes": 20, "sqm": 43.2, "sqft": 465.0 } })
    );

    let reset = Request::builder()
        .method("DELETE")
        .uri("/api/stock")
        .body(Full::new(Bytes::new()))
        .unwrap();
    assert_eq!(handle(site.clone(), reset).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(body_json(handle(site, get("/api/stock")).await).await, json!({}));
}

#[tokio::test]
async fn production_with_unknown_tile_is_rejected() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    let response = handle(
        site.clone(),
        production(json!({
            "size": "300x300",
            "thickness_mm": 8,
            "quality": "PRE",
            "plant_code": "P1",
            "boxes": 4,
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let text = body_text(response).await;
    assert!(text.contains("300x300"));

    let malformed = handle(site.clone(), production(json!({ "size": "600x600" }))).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    assert_eq!(body_json(handle(site, get("/api/stock")).await).await, json!({}));
}

#[tokio::test]
async fn convert_reports_area_for_boxes() {
    let server = MockServer::start().await;
    let site = site_for(&server);

    let response = handle(
        site.clone(),
        get("/api/stock/convert?size=600x1200&quality=REJ&boxes=3"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "sqm": 6.48, "sqft": 69.75 })
    );

    let unknown = handle(
        site.clone(),
        get("/api/stock/convert?size=1x1&quality=PRE&boxes=3"),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = handle(site, get("/api/stock/convert?size=600x600")).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}
