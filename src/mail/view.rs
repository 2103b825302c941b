//! Local view rendering for the non-template send path.
//!
//! A view named `welcome` is the pair of MiniJinja templates `welcome.html`
//! and `welcome.txt`; either may be missing, but not both.

use std::path::Path;

use minijinja::{Environment, ErrorKind};

use super::message::MergeParams;

/// Rendered bodies of a view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedView {
    pub html: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("View '{0}' not found")]
    NotFound(String),

    #[error("Failed to render view '{view}': {source}")]
    Render {
        view: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Renders named views with merge parameters as the template context
pub struct ViewRenderer {
    env: Environment<'static>,
}

impl ViewRenderer {
    /// Renderer with no views registered
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Renderer that loads `<view>.html` / `<view>.txt` from `dir` on demand
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        Self { env }
    }

    pub fn add_html(&mut self, view: &str, source: impl Into<String>) -> Result<(), ViewError> {
        self.add(view, "html", source.into())
    }

    pub fn add_text(&mut self, view: &str, source: impl Into<String>) -> Result<(), ViewError> {
        self.add(view, "txt", source.into())
    }

    fn add(&mut self, view: &str, ext: &str, source: String) -> Result<(), ViewError> {
        self.env
            .add_template_owned(format!("{view}.{ext}"), source)
            .map_err(|source| ViewError::Render {
                view: view.to_string(),
                source,
            })
    }

    pub fn render(&self, view: &str, params: &MergeParams) -> Result<RenderedView, ViewError> {
        let ctx = minijinja::Value::from_serialize(params);

        let rendered = RenderedView {
            html: self.render_part(view, "html", &ctx)?,
            text: self.render_part(view, "txt", &ctx)?,
        };

        if rendered.html.is_none() && rendered.text.is_none() {
            return Err(ViewError::NotFound(view.to_string()));
        }

        Ok(rendered)
    }

    fn render_part(
        &self,
        view: &str,
        ext: &str,
        ctx: &minijinja::Value,
    ) -> Result<Option<String>, ViewError> {
        let to_error = |source| ViewError::Render {
            view: view.to_string(),
            source,
        };

        let template = match self.env.get_template(&format!("{view}.{ext}")) {
            Ok(template) => template,
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => return Ok(None),
            Err(e) => return Err(to_error(e)),
        };

        template.render(ctx).map(Some).map_err(to_error)
    }
}

impl Default for ViewRenderer {
    fn default() -> Self {
        Self::new()
    }
}
