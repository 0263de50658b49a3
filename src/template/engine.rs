//! Template engine for config objects
//!
//! Uses minijinja with its default delimiters:
//! - Variables: `{{ ... }}`
//! - Blocks: `{% ... %}`
//! - Comments: `{# ... #}`
//!
//! Undefined variables are an error, so a typo in a template fails the
//! config object instead of silently rendering an empty string.

use minijinja::{Environment, UndefinedBehavior};

use super::context::TemplateContext;
use super::error::TemplateError;
use super::filters;

/// Renders config templates against a [`TemplateContext`]
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new engine with strict undefined handling and custom filters
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_filter("default", filters::default_filter);
        env.add_filter("base64_encode", filters::base64_encode);
        env.add_filter("base64_decode", filters::base64_decode);

        Self { env }
    }

    /// Render template source with the given context
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if the template syntax is invalid, a referenced
    /// variable is undefined, or a filter fails.
    pub fn render(&self, source: &str, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        Ok(self.env.render_str(source, ctx)?)
    }

    /// Render raw file bytes, which must be UTF-8
    pub fn render_bytes(
        &self,
        source: Vec<u8>,
        ctx: &TemplateContext<'_>,
    ) -> Result<String, TemplateError> {
        let source = String::from_utf8(source)?;
        self.render(&source, ctx)
    }
}
