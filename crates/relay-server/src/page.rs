//! The chat page served at `/`, rendered from a Handlebars template.

use handlebars::Handlebars;
use serde_json::json;

const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");
const INDEX: &str = "index";

/// Errors building the chat page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The bundled template failed to parse.
    #[error("failed to register page template: {0}")]
    Template(#[from] handlebars::TemplateError),
    /// Rendering failed.
    #[error("failed to render page: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Registered page templates.
pub struct Pages {
    handlebars: Handlebars<'static>,
}

impl Pages {
    /// Register the bundled templates.
    pub fn new() -> Result<Self, PageError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_template_string(INDEX, INDEX_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Render the chat page. `server_name` is HTML-escaped.
    pub fn index(&self, server_name: &str) -> Result<String, PageError> {
        let data = json!({ "server_name": server_name });
        Ok(self.handlebars.render(INDEX, &data)?)
    }
}
