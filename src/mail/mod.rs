pub mod client;
pub mod message;
pub mod response;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{Config, MailerConfig};
use client::{MandrillApi, MandrillClient, ProviderError};
use message::{Composition, MergeParams, Message};
use view::{ViewError, ViewRenderer};

/// Log target (category) for every mail event
pub const LOG_TARGET: &str = "mandrill";

/// Mailer abstraction backed by Mandrill
pub struct Mailer<C = MandrillClient> {
    config: MailerConfig,
    client: C,
    views: ViewRenderer,
    from_email: Option<String>,
    from_name: Option<String>,
}

impl Mailer<MandrillClient> {
    /// Create the mailer and its Mandrill client from the service configuration
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let client = MandrillClient::new(&config.mailer, Duration::from_secs(config.timeout_seconds))?
            .with_base_url(&config.api_url);

        Ok(Self::with_client(
            config.mailer.clone(),
            client,
            ViewRenderer::from_dir(&config.views_dir),
        )
        .with_sender(config.from_email.clone(), config.from_name.clone()))
    }
}

impl<C: MandrillApi> Mailer<C> {
    pub fn with_client(config: MailerConfig, client: C, views: ViewRenderer) -> Self {
        Self {
            config,
            client,
            views,
            from_email: None,
            from_name: None,
        }
    }

    /// Default sender for messages that do not set their own
    #[must_use]
    pub fn with_sender(mut self, email: Option<String>, name: Option<String>) -> Self {
        self.from_email = email;
        self.from_name = name;
        self
    }

    pub fn use_templates(&self) -> bool {
        self.config.use_templates()
    }

    /// Compose a message from a view (or, in template mode, a Mandrill template).
    ///
    /// In template mode nothing is rendered: the message carries the template
    /// name and `params` as merge vars. If the template message cannot be built
    /// the failure is logged at info and the view is rendered locally with the
    /// same name and params instead. A `subject` string in `params` becomes the
    /// message subject.
    pub fn compose(
        &self,
        view: &str,
        params: MergeParams,
        send_async: bool,
        send_at: Option<DateTime<Utc>>,
    ) -> Result<Message, ViewError> {
        let message = if self.use_templates() {
            match Composition::template(view, &params) {
                Composition::Ready(message) => message,
                Composition::Failed(reason) => {
                    tracing::info!(
                        target: LOG_TARGET,
                        view = %view,
                        reason = %reason,
                        "Template composition failed, falling back to view rendering"
                    );
                    self.render_view(view, &params)?
                }
            }
        } else {
            self.render_view(view, &params)?
        };

        let mut message = message.send_async(send_async).send_at(send_at);
        if let Some(subject) = params.get("subject").and_then(|s| s.as_str()) {
            message = message.subject(subject);
        }

        Ok(message)
    }

    fn render_view(&self, view: &str, params: &MergeParams) -> Result<Message, ViewError> {
        let rendered = self.views.render(view, params)?;
        Ok(Message::new()
            .html(rendered.html.unwrap_or_default())
            .text(rendered.text.unwrap_or_default()))
    }

    /// Send a message and report whether Mandrill accepted it for every recipient.
    ///
    /// This is a batch-level verdict: a single rejected or invalid recipient
    /// makes the whole call return `false`, even if the others were sent.
    /// Provider failures also return `false`. Details only appear in the logs
    /// under the `mandrill` target; nothing here returns an error.
    pub async fn send(&self, mut message: Message) -> bool {
        if message.recipients.is_empty() {
            tracing::warn!(target: LOG_TARGET, "Message has no recipients, nothing sent");
            return false;
        }
        if message.is_templated() && !self.use_templates() {
            tracing::warn!(
                target: LOG_TARGET,
                template = ?message.template_name(),
                "Templated message while template mode is disabled, nothing sent"
            );
            return false;
        }

        if message.from_email.is_none() {
            message.from_email = self.from_email.clone();
            message.from_name = message.from_name.or_else(|| self.from_name.clone());
        }

        let payload = message.to_provider_payload();
        tracing::debug!(
            target: LOG_TARGET,
            recipients = payload.message.to.len(),
            template = ?message.template_name(),
            "Sending message"
        );

        let outcome = match &payload.template {
            Some(template) => self.client.send_template(template, &payload).await,
            None => self.client.send(&payload).await,
        };

        match outcome {
            Ok(results) => response::all_accepted(&results),
            Err(e) => {
                tracing::error!(target: LOG_TARGET, error = %e, "A Mandrill error occurred");
                false
            }
        }
    }

    /// Whether the Mandrill API answers with the configured key
    pub async fn ping(&self) -> bool {
        match self.client.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "Mandrill ping failed");
                false
            }
        }
    }
}
