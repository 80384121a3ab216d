//! Queue protocol tests against an in-process fake provider
//!
//! The fake answers on 127.0.0.1 with the submit → status → result sequence
//! and checks the `Key` authorization scheme on every call.

#![cfg(feature = "server")]

use actix_web::{dev::ServerHandle, web, App, HttpRequest, HttpResponse, HttpServer};
use photo_genius::{
    config::{Credential, ProviderConfig},
    error::ProviderError,
    provider::{BackgroundRemovalProvider, FalProvider},
    types::ProviderInput,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MODEL: &str = "fal-ai/imageutils/rembg";
const KEY: &str = "test-key";

#[derive(Default)]
struct FakeQueue {
    /// Status values returned in order; the last one repeats
    statuses: Vec<&'static str>,
    polls: AtomicUsize,
    submitted: Mutex<Vec<Value>>,
    fetched: AtomicUsize,
}

fn authorized(request: &HttpRequest) -> bool {
    request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Key {KEY}"))
}

async fn submit(request: HttpRequest, queue: web::Data<FakeQueue>, body: web::Json<Value>) -> HttpResponse {
    if !authorized(&request) {
        return HttpResponse::Unauthorized().json(json!({ "detail": "bad key" }));
    }
    queue.submitted.lock().unwrap().push(body.into_inner());
    HttpResponse::Ok().json(json!({ "request_id": "req-1" }))
}

async fn status(request: HttpRequest, queue: web::Data<FakeQueue>) -> HttpResponse {
    if !authorized(&request) {
        return HttpResponse::Unauthorized().finish();
    }
    let poll = queue.polls.fetch_add(1, Ordering::SeqCst);
    let status = queue
        .statuses
        .get(poll)
        .or_else(|| queue.statuses.last())
        .copied()
        .unwrap_or("COMPLETED");
    HttpResponse::Ok().json(json!({ "status": status, "queue_position": 0 }))
}

async fn result(request: HttpRequest, queue: web::Data<FakeQueue>) -> HttpResponse {
    if !authorized(&request) {
        return HttpResponse::Unauthorized().finish();
    }
    queue.fetched.fetch_add(1, Ordering::SeqCst);
    HttpResponse::Ok().json(json!({
        "image": { "url": "https://cdn.example/req-1.png", "width": 4, "height": 4 }
    }))
}

async fn start(queue: web::Data<FakeQueue>) -> (String, ServerHandle) {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(queue.clone())
            .route(&format!("/{MODEL}"), web::post().to(submit))
            .route("/fal-ai/imageutils/requests/req-1/status", web::get().to(status))
            .route("/fal-ai/imageutils/requests/req-1", web::get().to(result))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    (format!("http://{addr}"), handle)
}

fn provider(queue_url: String) -> FalProvider {
    FalProvider::new(ProviderConfig {
        model_id: MODEL.to_string(),
        queue_url,
        poll_interval: Duration::from_millis(5),
    })
    .unwrap()
}

fn input() -> ProviderInput {
    ProviderInput {
        image_url: "data:image/png;base64,iVBORw0K".to_string(),
    }
}

#[actix_web::test]
async fn test_polls_until_completed_and_returns_result() {
    let queue = web::Data::new(FakeQueue {
        statuses: vec!["IN_QUEUE", "IN_PROGRESS", "COMPLETED"],
        ..FakeQueue::default()
    });
    let (url, handle) = start(queue.clone()).await;

    let credential = Credential::new(KEY).unwrap();
    let value = provider(url).remove_background(&credential, &input()).await.unwrap();

    assert_eq!(value["image"]["url"], "https://cdn.example/req-1.png");
    assert_eq!(queue.polls.load(Ordering::SeqCst), 3);
    assert_eq!(queue.fetched.load(Ordering::SeqCst), 1);
    assert_eq!(
        queue.submitted.lock().unwrap().clone(),
        vec![json!({ "image_url": "data:image/png;base64,iVBORw0K" })]
    );

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_failed_status_is_an_error() {
    let queue = web::Data::new(FakeQueue {
        statuses: vec!["IN_QUEUE", "ERROR"],
        ..FakeQueue::default()
    });
    let (url, handle) = start(queue.clone()).await;

    let credential = Credential::new(KEY).unwrap();
    let err = provider(url).remove_background(&credential, &input()).await.unwrap_err();

    match err {
        ProviderError::Failed { request_id, status } => {
            assert_eq!(request_id, "req-1");
            assert_eq!(status, "ERROR");
        },
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(queue.fetched.load(Ordering::SeqCst), 0);

    handle.stop(false).await;
}

#[actix_web::test]
async fn test_rejected_credential_surfaces_http_status() {
    let queue = web::Data::new(FakeQueue::default());
    let (url, handle) = start(queue.clone()).await;

    let credential = Credential::new("wrong-key").unwrap();
    let err = provider(url).remove_background(&credential, &input()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Http { status: 401, .. }));
    assert!(queue.submitted.lock().unwrap().is_empty());

    handle.stop(false).await;
}
