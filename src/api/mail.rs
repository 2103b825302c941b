use axum::{extract::State, routing::post, Json, Router};

use crate::error::{AppError, Result};
use crate::models::{SendMailRequest, SendMailResponse};
use crate::state::AppState;

/// Mail routes
pub fn mail_routes() -> Router<AppState> {
    Router::new().route("/send", post(send_mail))
}

/// POST /api/v1/mail/send
///
/// Rejected recipients and Mandrill failures are not HTTP errors: they come
/// back as `sent: false` with the details in the service logs.
async fn send_mail(
    State(state): State<AppState>,
    Json(request): Json<SendMailRequest>,
) -> Result<Json<SendMailResponse>> {
    if request.to.is_empty() {
        return Err(AppError::BadRequest(
            "At least one recipient is required".to_string(),
        ));
    }
    if request.view.trim().is_empty() {
        return Err(AppError::BadRequest("View name is required".to_string()));
    }

    let mut message = state.mailer.compose(
        &request.view,
        request.params,
        request.send_async,
        request.send_at,
    )?;
    if let Some(subject) = request.subject {
        message.subject = subject;
    }

    let recipients = request.to.len();
    message.recipients = request.to;

    let sent = state.mailer.send(message).await;

    tracing::info!(view = %request.view, recipients, sent, "Mail relay request handled");

    Ok(Json(SendMailResponse { sent, recipients }))
}
