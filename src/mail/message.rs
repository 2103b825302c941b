use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named values substituted into a provider-hosted template, in insertion order
pub type MergeParams = serde_json::Map<String, Value>;

/// Single recipient with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Recipient {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// `{name, content}` pair as Mandrill expects for merge vars and template content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeVar {
    pub name: String,
    pub content: Value,
}

/// Convert merge parameters into Mandrill's list form, keeping input order.
pub fn merge_vars(params: &MergeParams) -> Vec<MergeVar> {
    params
        .iter()
        .map(|(name, content)| MergeVar {
            name: name.clone(),
            content: content.clone(),
        })
        .collect()
}

/// Outbound email, consumed once by [`Mailer::send`](super::Mailer::send)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub from_email: Option<String>,
    pub from_name: Option<String>,
    pub tags: Vec<String>,
    pub headers: BTreeMap<String, String>,
    pub send_async: bool,
    pub send_at: Option<DateTime<Utc>>,
    template_name: Option<String>,
    template_params: MergeParams,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message for a provider-hosted template.
    ///
    /// Nothing is rendered locally; `params` are passed through as merge vars.
    pub fn templated(
        template_name: &str,
        params: &MergeParams,
    ) -> Result<Self, CompositionError> {
        let template_name = template_name.trim();
        if template_name.is_empty() {
            return Err(CompositionError::BlankTemplateName);
        }
        // Mandrill reserves merge var names starting with an underscore.
        if let Some(name) = params
            .keys()
            .find(|name| name.is_empty() || name.starts_with('_'))
        {
            return Err(CompositionError::InvalidMergeVar(name.clone()));
        }

        Ok(Self {
            template_name: Some(template_name.to_string()),
            template_params: params.clone(),
            ..Self::default()
        })
    }

    pub fn template_name(&self) -> Option<&str> {
        self.template_name.as_deref()
    }

    pub fn template_params(&self) -> &MergeParams {
        &self.template_params
    }

    pub fn is_templated(&self) -> bool {
        self.template_name.is_some()
    }

    #[must_use]
    pub fn to(mut self, email: impl Into<String>) -> Self {
        self.recipients.push(Recipient::new(email));
        self
    }

    #[must_use]
    pub fn to_named(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.recipients.push(Recipient::with_name(email, name));
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    #[must_use]
    pub fn sender(mut self, email: impl Into<String>, name: Option<String>) -> Self {
        self.from_email = Some(email.into());
        self.from_name = name;
        self
    }

    #[must_use]
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.body_html = html.into();
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body_text = text.into();
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn send_async(mut self, send_async: bool) -> Self {
        self.send_async = send_async;
        self
    }

    #[must_use]
    pub fn send_at(mut self, send_at: Option<DateTime<Utc>>) -> Self {
        self.send_at = send_at;
        self
    }

    /// Build the Mandrill request shape for this message.
    pub fn to_provider_payload(&self) -> ProviderPayload {
        let global_merge_vars = if self.is_templated() {
            merge_vars(&self.template_params)
        } else {
            Vec::new()
        };

        let message = ProviderMessage {
            html: non_empty(&self.body_html),
            text: non_empty(&self.body_text),
            subject: non_empty(&self.subject),
            from_email: self.from_email.clone(),
            from_name: self.from_name.clone(),
            to: self
                .recipients
                .iter()
                .map(|r| ProviderRecipient {
                    email: r.email.clone(),
                    name: r.name.clone(),
                    kind: "to",
                })
                .collect(),
            headers: self.headers.clone(),
            tags: self.tags.clone(),
            global_merge_vars: global_merge_vars.clone(),
        };

        ProviderPayload {
            message,
            template: self.template_name.clone().map(|template_name| TemplatePayload {
                template_name,
                template_content: global_merge_vars,
            }),
            send_async: self.send_async,
            send_at: self.send_at,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Provider request shape produced by [`Message::to_provider_payload`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayload {
    pub message: ProviderMessage,
    pub template: Option<TemplatePayload>,
    pub send_async: bool,
    pub send_at: Option<DateTime<Utc>>,
}

impl ProviderPayload {
    /// `send_at` in the `YYYY-MM-DD HH:MM:SS` UTC form Mandrill expects
    pub fn send_at_param(&self) -> Option<String> {
        self.send_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// Template name and editable-region content for `send-template`
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePayload {
    pub template_name: String,
    pub template_content: Vec<MergeVar>,
}

/// The `message` object of a Mandrill send request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    pub to: Vec<ProviderRecipient>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub global_merge_vars: Vec<MergeVar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRecipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Why a template-mode message could not be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("template name is blank")]
    BlankTemplateName,
    #[error("invalid merge variable name '{0}'")]
    InvalidMergeVar(String),
}

/// Outcome of template-mode composition
#[derive(Debug)]
pub enum Composition {
    Ready(Message),
    Failed(CompositionError),
}

impl Composition {
    pub fn template(template_name: &str, params: &MergeParams) -> Self {
        match Message::templated(template_name, params) {
            Ok(message) => Composition::Ready(message),
            Err(reason) => Composition::Failed(reason),
        }
    }
}
