//! Page templates.
//!
//! The build only needs `render(name, context)`; [`TemplateEngine`] is that
//! seam. [`FileTemplates`] implements it with Jinja templates loaded from a
//! directory. Block tags swallow their own line (`trim_blocks` and
//! `lstrip_blocks`) and values are inserted verbatim, since page content is
//! already HTML.

use std::path::PathBuf;

use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{name}`: {source}")]
    Render {
        name: String,
        source: minijinja::Error,
    },
}

/// Renders a named template against a JSON context.
pub trait TemplateEngine {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError>;
}

/// Templates loaded from a directory, one file per template name.
pub struct FileTemplates {
    env: Environment<'static>,
}

impl FileTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.into()));
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }
}

impl TemplateEngine for FileTemplates {
    fn render(&self, name: &str, context: &Value) -> Result<String, TemplateError> {
        let render_error = |source| TemplateError::Render {
            name: name.to_string(),
            source,
        };

        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(render_error)
    }
}
