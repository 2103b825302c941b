use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::message::{MergeVar, ProviderMessage, ProviderPayload, TemplatePayload};
use super::response::DeliveryResult;
use crate::config::{MailerConfig, DEFAULT_API_URL};

/// Failure of a call into the Mandrill API
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Mandrill request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mandrill API error {name} ({code}): {message}")]
    Api {
        code: i64,
        name: String,
        message: String,
    },

    #[error("Mandrill returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected Mandrill response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The two Mandrill send calls this crate relies on, plus a reachability check
#[async_trait]
pub trait MandrillApi: Send + Sync {
    /// `messages/send`: deliver a locally composed message
    async fn send(&self, payload: &ProviderPayload) -> Result<Vec<DeliveryResult>, ProviderError>;

    /// `messages/send-template`: deliver through a provider-hosted template
    async fn send_template(
        &self,
        template: &TemplatePayload,
        payload: &ProviderPayload,
    ) -> Result<Vec<DeliveryResult>, ProviderError>;

    /// `users/ping`
    async fn ping(&self) -> Result<(), ProviderError>;
}

/// HTTP client for the Mandrill JSON API
#[derive(Clone)]
pub struct MandrillClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    key: &'a str,
    message: &'a ProviderMessage,
    #[serde(rename = "async")]
    send_async: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_at: Option<String>,
}

#[derive(Serialize)]
struct SendTemplateRequest<'a> {
    key: &'a str,
    template_name: &'a str,
    template_content: &'a [MergeVar],
    message: &'a ProviderMessage,
    #[serde(rename = "async")]
    send_async: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_at: Option<String>,
}

#[derive(Serialize)]
struct KeyRequest<'a> {
    key: &'a str,
}

/// Error body Mandrill returns with non-2xx responses
#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    name: String,
    message: String,
}

impl MandrillClient {
    pub fn new(config: &MailerConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key().to_string(),
            base_url: DEFAULT_API_URL.to_string(),
        })
    }

    /// Point the client at another API root (a mock server in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(target: super::LOG_TARGET, url = %url, "Calling Mandrill");

        let res = self.client.post(&url).json(body).send().await?;
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(err) => ProviderError::Api {
                    code: err.code,
                    name: err.name,
                    message: err.message,
                },
                Err(_) => ProviderError::Http {
                    status: status.as_u16(),
                    body: text,
                },
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl MandrillApi for MandrillClient {
    async fn send(&self, payload: &ProviderPayload) -> Result<Vec<DeliveryResult>, ProviderError> {
        let request = SendRequest {
            key: &self.api_key,
            message: &payload.message,
            send_async: payload.send_async,
            send_at: payload.send_at_param(),
        };
        self.call("messages/send.json", &request).await
    }

    async fn send_template(
        &self,
        template: &TemplatePayload,
        payload: &ProviderPayload,
    ) -> Result<Vec<DeliveryResult>, ProviderError> {
        let request = SendTemplateRequest {
            key: &self.api_key,
            template_name: &template.template_name,
            template_content: &template.template_content,
            message: &payload.message,
            send_async: payload.send_async,
            send_at: payload.send_at_param(),
        };
        self.call("messages/send-template.json", &request).await
    }

    async fn ping(&self) -> Result<(), ProviderError> {
        let _: String = self
            .call("users/ping.json", &KeyRequest { key: &self.api_key })
            .await?;
        Ok(())
    }
}
