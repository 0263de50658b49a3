//! Text templates for config objects
//!
//! Config sources using the template transform are rendered with minijinja
//! against the run's tenant, callback body and application fields:
//!
//! - `{{ tenant }}` - Tenant id
//! - `{{ request.additionalInformation.clientId }}` - Callback body fields
//! - `{{ app.name }}`, `{{ app.domain }}`, `{{ app.namespace }}`, `{{ app.url }}`
//! - `{{ resourceName }}` - Name of the config object being produced
//! - Filters: `default`, `base64_encode`, `base64_decode`

mod context;
mod engine;
mod error;
mod filters;

pub use context::{AppValues, TemplateContext};
pub use engine::TemplateEngine;
pub use error::TemplateError;
