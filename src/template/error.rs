//! Template error types

use thiserror::Error;

/// Errors that can occur while rendering a config template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template failed to parse or render
    #[error("template render error: {0}")]
    Render(#[from] minijinja::Error),
    /// Template source is not valid UTF-8
    #[error("template is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
