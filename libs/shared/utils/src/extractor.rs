use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::signature::{verify_webhook_signature, SIGNATURE_HEADER};

const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

// Buffers the body so the signature can be checked, then hands it on unchanged.
pub async fn webhook_signature_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !config.is_webhook_signature_enabled() {
        warn!("WHATSAPP_APP_SECRET not set, accepting unsigned webhook payload");
        return Ok(next.run(request).await);
    }

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid webhook signature header".to_string()))?
        .to_string();

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_WEBHOOK_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Unreadable webhook body: {}", e)))?;

    verify_webhook_signature(&bytes, &signature, &config.whatsapp_app_secret)
        .map_err(AppError::Unauthorized)?;

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_webhook_payload;
    use crate::test_utils::TestConfig;
    use axum::{http::StatusCode, middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app(config: AppConfig) -> Router {
        let config = Arc::new(config);
        Router::new()
            .route("/hook", post(|body: String| async move { body }))
            .layer(middleware::from_fn_with_state(config, webhook_signature_middleware))
    }

    fn signed_config() -> AppConfig {
        let mut config = TestConfig::default().to_app_config();
        config.whatsapp_app_secret = "app-secret".to_string();
        config
    }

    #[tokio::test]
    async fn test_valid_signature_passes_body_through() {
        let body = r#"{"entry":[]}"#;
        let signature = sign_webhook_payload(body.as_bytes(), "app-secret").unwrap();

        let response = app(signed_config())
            .oneshot(
                Request::post("/hook")
                    .header(SIGNATURE_HEADER, signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&echoed[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_missing_signature_is_unauthorized() {
        let response = app(signed_config())
            .oneshot(Request::post("/hook").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unsigned_payload_accepted_without_secret() {
        let response = app(TestConfig::default().to_app_config())
            .oneshot(Request::post("/hook").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
