use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mandrill: String,
    pub templates: String,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = state.mailer.ping().await;

    let templates = if state.mailer.use_templates() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: if reachable { "healthy" } else { "unhealthy" }.to_string(),
        mandrill: if reachable { "reachable" } else { "unreachable" }.to_string(),
        templates: templates.to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use crate::api::test_helpers::{call, test_router};
    use crate::mail::test_support::MockMandrillServer;

    fn health_request() -> Request<Body> {
        Request::get("/health").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_reachable_provider() {
        let server = MockMandrillServer::start().await;
        let router = test_router(&server.base_url);
        let server_task = tokio::spawn(server.respond_once(200, "\"PONG!\""));

        let (status, body) = call(router, health_request()).await;
        server_task.await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["mandrill"], "reachable");
        assert_eq!(body["templates"], "disabled");
    }

    #[tokio::test]
    async fn test_health_reports_invalid_key() {
        let server = MockMandrillServer::start().await;
        let router = test_router(&server.base_url);
        let server_task = tokio::spawn(server.respond_once(
            500,
            r#"{"status":"error","code":-1,"name":"Invalid_Key","message":"Invalid API key"}"#,
        ));

        let (status, body) = call(router, health_request()).await;
        server_task.await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["mandrill"], "unreachable");
    }
}
