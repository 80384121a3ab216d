//! actix-web HTTP gateway exposing `POST /api/remove-background`
//!
//! Handlers are stateless: every request gets a clone of the shared
//! [`RemovalGateway`] and its own request id for log correlation.

use crate::{
    config::{ServerConfig, REMOVE_BACKGROUND_ROUTE},
    error::GatewayError,
    gateway::RemovalGateway,
};
use actix_web::{
    http::StatusCode,
    middleware,
    web::{self, Bytes},
    App, HttpResponse, HttpServer, ResponseError,
};
use anyhow::{Context, Result};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(GatewayError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self)).json(self.to_body())
    }
}

/// Register the gateway route and its shared state on an app
pub fn configure_app(cfg: &mut web::ServiceConfig, gateway: RemovalGateway, max_payload_bytes: usize) {
    cfg.app_data(web::Data::new(gateway))
        .app_data(web::PayloadConfig::new(max_payload_bytes))
        .route(REMOVE_BACKGROUND_ROUTE, web::post().to(remove_background_route));
}

/// Relay one removal request through the gateway
async fn remove_background_route(
    gateway: web::Data<RemovalGateway>,
    body: std::result::Result<Bytes, actix_web::Error>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let span = info_span!("remove_background", request_id = %request_id);

    async move {
        let outcome = match body {
            Ok(body) => gateway.handle_body(&body).await,
            Err(e) => {
                tracing::error!(error = %e, "Could not read request body");
                Err(GatewayError::MalformedBody(e.to_string()))
            },
        };

        match outcome {
            Ok(result) => HttpResponse::Ok().json(result.as_value()),
            Err(e) => e.error_response(),
        }
    }
    .instrument(span)
    .await
}

/// Build the gateway from `config` and serve until shutdown
///
/// # Errors
/// - Invalid configuration
/// - Provider client construction failure
/// - Bind or server failure
pub async fn run(config: ServerConfig) -> Result<()> {
    config.validate().context("Invalid server configuration")?;
    let gateway =
        RemovalGateway::with_fal(config.gateway.clone()).context("Failed to create provider client")?;
    let max_payload_bytes = config.max_payload_bytes;

    if config.gateway.credential.is_none() {
        tracing::warn!("FAL_KEY is not set; every removal request will fail with 500");
    }
    info!(
        host = %config.host,
        port = config.port,
        model = %config.gateway.provider.model_id,
        "Starting background removal gateway"
    );

    HttpServer::new(move || {
        let gateway = gateway.clone();
        App::new()
            .wrap(middleware::Logger::default())
            .configure(|cfg| configure_app(cfg, gateway, max_payload_bytes))
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .run()
    .await
    .context("HTTP server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::test_utils::MockProvider;
    use actix_web::test;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_payload_limit_returns_json() {
        let provider = MockProvider::returning(json!({}));
        let gateway = RemovalGateway::new(
            GatewayConfig::default().with_credential("key"),
            Arc::new(provider.clone()),
        );
        let app = test::init_service(App::new().configure(|cfg| configure_app(cfg, gateway, 64))).await;

        let image = format!("data:image/png;base64,{}", "A".repeat(256));
        let request = test::TestRequest::post()
            .uri(REMOVE_BACKGROUND_ROUTE)
            .set_json(json!({ "image": image }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "error": "Failed to remove background" }));
        assert_eq!(provider.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_get_is_not_routed() {
        let gateway = RemovalGateway::new(
            GatewayConfig::default(),
            Arc::new(MockProvider::returning(json!({}))),
        );
        let app =
            test::init_service(App::new().configure(|cfg| configure_app(cfg, gateway, 1024))).await;

        let request = test::TestRequest::get().uri(REMOVE_BACKGROUND_ROUTE).to_request();
        let response = test::call_service(&app, request).await;
        assert!(response.status().is_client_error());
    }
}
