//! Error types for the provisioner
//!
//! These errors cover loading and validating the application template and
//! bringing up the process. Failures that happen while a tenant is being
//! provisioned are not raised as errors; they are recorded per resource in a
//! [`crate::provision::ProvisionReport`].

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for provisioner setup and template loading
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes client could not be constructed
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A template or request file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Application template failed to parse
    #[error("invalid application template {}: {message}", path.display())]
    Config {
        /// Template file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Application template parsed but is not usable
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "routes[2].image")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a template field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a template parse error for the given file
    pub fn config(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an I/O error for the given file
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Field path for validation errors, if known
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: template authors get pointed at the broken field
    #[test]
    fn story_validation_error_carries_field_path() {
        let err = Error::validation_for_field("routes[1].image", "image must not be empty");
        assert!(err.to_string().contains("validation error"));
        assert!(err.to_string().contains("image must not be empty"));
        assert_eq!(err.field(), Some("routes[1].image"));

        let err = Error::validation("appName must not be empty");
        assert_eq!(err.field(), None);
    }

    /// Story: parse failures name the template file
    #[test]
    fn story_config_error_names_the_file() {
        let err = Error::config("/etc/app/template.yaml", "missing field `appName`");
        let msg = err.to_string();
        assert!(msg.contains("/etc/app/template.yaml"));
        assert!(msg.contains("missing field"));
    }

    /// Story: wrapped into anyhow at the binary edge, the cause survives
    #[test]
    fn story_io_cause_survives_anyhow_context() {
        use anyhow::Context;

        let err = Error::io(
            "/etc/app/template.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let wrapped = Err::<(), _>(err)
            .context("application template is not usable")
            .unwrap_err();

        let chain: Vec<String> = wrapped.chain().map(|e| e.to_string()).collect();
        assert_eq!(chain.len(), 3);
        assert!(chain[1].contains("/etc/app/template.yaml"));
        assert_eq!(chain[2], "no such file");
    }

    /// Story: helpers accept both String and &str
    #[test]
    fn story_error_construction_ergonomics() {
        let tenant = "acme";
        let err = Error::validation(format!("tenant {} rejected", tenant));
        assert!(err.to_string().contains("acme"));

        let err = Error::serialization("static message");
        assert!(err.to_string().contains("static message"));
    }
}
