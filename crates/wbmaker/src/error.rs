//! Error types shared across the crate.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, WbError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration section `[{0}]` is missing")]
    MissingSection(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WbError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("property `{0}` not found in property map")]
    UnknownProperty(String),

    #[error("unsupported property datatype `{0}`")]
    UnsupportedDatatype(String),

    #[error("invalid value `{value}` for {datatype} property {pid}")]
    InvalidValue {
        pid: String,
        datatype: String,
        value: String,
    },

    #[error("template error: {0}")]
    Template(String),

    #[error("unexpected response from {service}: {message}")]
    Response {
        service: &'static str,
        message: String,
    },
}

impl From<handlebars::TemplateError> for WbError {
    fn from(value: handlebars::TemplateError) -> Self {
        WbError::Template(value.to_string())
    }
}

impl From<handlebars::RenderError> for WbError {
    fn from(value: handlebars::RenderError) -> Self {
        WbError::Template(value.to_string())
    }
}
