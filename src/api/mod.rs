pub mod health;
pub mod mail;

use axum::Router;

use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .merge(health::health_routes())
        .with_state(state)
}

/// API v1 routes
fn api_routes() -> Router<AppState> {
    Router::new().nest("/mail", mail::mail_routes())
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::mail::client::MandrillClient;
    use crate::mail::view::ViewRenderer;
    use crate::mail::Mailer;
    use crate::state::AppState;

    /// Router wired to a Mandrill client at `base_url` with an in-memory `welcome` view
    pub fn test_router(base_url: &str) -> Router {
        let config = Config::from_vars(|key| match key {
            "MANDRILL_API_KEY" => Some("test-key".to_string()),
            "MAIL_FROM" => Some("noreply@example.com".to_string()),
            _ => None,
        })
        .unwrap();

        let client = MandrillClient::new(&config.mailer, Duration::from_secs(5))
            .unwrap()
            .with_base_url(base_url);
        let mut views = ViewRenderer::new();
        views.add_text("welcome", "Welcome {{ name }}").unwrap();

        let mailer = Mailer::with_client(config.mailer.clone(), client, views)
            .with_sender(config.from_email.clone(), None);

        super::create_router(AppState::new(config, mailer))
    }

    pub async fn call(
        router: Router,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
