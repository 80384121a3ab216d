//! Client workflow tests: capture → remove → view → download
//!
//! The first test runs the real HTTP client against a gateway bound on
//! 127.0.0.1 whose provider is mocked. The others drive the controller with
//! a gated mock service to observe it while an action is in flight.

#![cfg(feature = "server")]

use actix_web::{App, HttpServer};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use photo_genius::{
    client::HttpGatewayClient,
    config::{ClientConfig, GatewayConfig},
    controller::{ActionOutcome, ControllerState, PresentationController},
    gateway::RemovalGateway,
    server::configure_app,
    test_utils::{png_fixture, MockProvider, MockRemovalService, RecordingAlertSink},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn controller(
    service: Arc<dyn photo_genius::RemovalService>,
    alerts: &RecordingAlertSink,
    config: ClientConfig,
) -> Arc<PresentationController> {
    Arc::new(PresentationController::new(config, service, Arc::new(alerts.clone())))
}

/// Yield until `condition` holds, giving spawned tasks a chance to run
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[actix_web::test]
async fn test_end_to_end_through_http_gateway() {
    let processed_png = png_fixture(4, 4);
    let processed_url = format!("data:image/png;base64,{}", STANDARD.encode(&processed_png));
    let provider = MockProvider::returning(json!({
        "image": { "url": processed_url, "width": 4, "height": 4 }
    }));

    let gateway = RemovalGateway::new(
        GatewayConfig::default().with_credential("test-key"),
        Arc::new(provider.clone()),
    );
    let server = HttpServer::new(move || {
        let gateway = gateway.clone();
        App::new().configure(|cfg| configure_app(cfg, gateway, 20 * 1024 * 1024))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let scratch = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let config = ClientConfig::builder()
        .server_url(format!("http://{addr}"))
        .scratch_dir(scratch.path())
        .build()
        .unwrap();
    let service = HttpGatewayClient::new(&config).unwrap();
    let alerts = RecordingAlertSink::default();
    let controller = controller(Arc::new(service), &alerts, config);

    controller.load_image(&png_fixture(32, 24)).unwrap();
    let processed = controller.remove_background().await.unwrap().completed().unwrap();
    assert_eq!(processed.url, processed_url);
    assert_eq!(processed.result.as_value()["image"]["width"], 4);

    assert!(controller.view_full_screen());
    let saved = controller.download_into(output.path()).await.unwrap().completed().unwrap();
    assert_eq!(saved.file_name().unwrap(), "processed_image.png");
    assert_eq!(std::fs::read(&saved).unwrap(), processed_png);

    assert_eq!(provider.call_count(), 1);
    assert!(provider.calls()[0].image_url.starts_with("data:image/jpeg;base64,"));
    assert!(alerts.messages().is_empty());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

    handle.stop(false).await;
}

#[tokio::test]
async fn test_actions_are_ignored_while_processing() {
    let scratch = tempfile::tempdir().unwrap();
    let (service, gate) = MockRemovalService::succeeding("https://cdn.example/r.png").gated();
    let alerts = RecordingAlertSink::default();
    let config = ClientConfig::builder().scratch_dir(scratch.path()).build().unwrap();
    let controller = controller(Arc::new(service.clone()), &alerts, config);

    controller.load_image(&png_fixture(8, 8)).unwrap();
    let in_flight = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.remove_background().await }
    });
    wait_until(|| service.remove_calls() == 1).await;

    assert!(controller.is_busy());
    assert!(!controller.can_remove());
    assert_eq!(controller.remove_label(), "Processing...");
    assert!(controller.remove_background().await.unwrap().is_ignored());
    assert!(controller.download_into(scratch.path()).await.unwrap().is_ignored());
    assert!(controller.load_image(&png_fixture(2, 2)).unwrap().is_ignored());

    gate.add_permits(1);
    let processed = in_flight.await.unwrap().unwrap();
    assert!(matches!(processed, ActionOutcome::Completed(_)));
    assert_eq!(service.remove_calls(), 1);
    assert!(!controller.is_busy());
    assert!(controller.can_download());
}

#[tokio::test]
async fn test_downloads_are_not_duplicated() {
    let scratch = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let (service, gate) = MockRemovalService::succeeding("https://cdn.example/r.png").gated();
    let alerts = RecordingAlertSink::default();
    let config = ClientConfig::builder().scratch_dir(scratch.path()).build().unwrap();
    let controller = controller(Arc::new(service.clone()), &alerts, config);

    controller.load_image(&png_fixture(8, 8)).unwrap();
    gate.add_permits(1);
    controller.remove_background().await.unwrap();

    let in_flight = tokio::spawn({
        let controller = Arc::clone(&controller);
        let dir = output.path().to_path_buf();
        async move { controller.download_into(dir).await }
    });
    wait_until(|| service.fetch_calls() == 1).await;

    assert_eq!(controller.download_label(), "Downloading...");
    assert!(controller.download_into(output.path()).await.unwrap().is_ignored());
    assert!(controller.remove_background().await.unwrap().is_ignored());
    // Full-screen stays available while downloading.
    assert!(controller.view_full_screen());

    gate.add_permits(1);
    in_flight.await.unwrap().unwrap();
    assert_eq!(service.fetch_calls(), 1);
    assert!(matches!(
        controller.state(),
        ControllerState::ResultReady { full_screen: true, .. }
    ));
}

#[tokio::test]
async fn test_repeated_cycles_leave_no_scratch_files() {
    let scratch = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let service = MockRemovalService::succeeding("https://cdn.example/r.png")
        .with_download(png_fixture(3, 3));
    let alerts = RecordingAlertSink::default();
    let config = ClientConfig::builder().scratch_dir(scratch.path()).build().unwrap();
    let controller = controller(Arc::new(service.clone()), &alerts, config);

    for size in 1..=5 {
        controller.load_image(&png_fixture(size * 4, size * 3)).unwrap();
        controller.remove_background().await.unwrap();
        controller.download_into(output.path()).await.unwrap();
    }

    assert_eq!(service.remove_calls(), 5);
    assert_eq!(service.fetch_calls(), 5);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_failed_retry_keeps_previous_result() {
    let scratch = tempfile::tempdir().unwrap();
    let service = MockRemovalService::succeeding("https://cdn.example/first.png").failing_after(1);
    let alerts = RecordingAlertSink::default();
    let config = ClientConfig::builder().scratch_dir(scratch.path()).build().unwrap();
    let controller = controller(Arc::new(service.clone()), &alerts, config);

    controller.load_image(&png_fixture(8, 8)).unwrap();
    controller.remove_background().await.unwrap();
    controller.view_full_screen();
    let before = controller.state();

    assert!(controller.remove_background().await.is_err());
    let after = controller.state();
    assert_eq!(after.original(), before.original());
    assert_eq!(
        after.processed().map(|p| p.url.as_str()),
        Some("https://cdn.example/first.png")
    );
    assert!(controller.can_download());
    assert_eq!(service.remove_calls(), 2);
    assert_eq!(
        alerts.messages(),
        vec!["Failed to remove background. Error: Failed to remove background: Failed to remove background".to_string()]
    );
}
