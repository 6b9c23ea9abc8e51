//! Error taxonomy shared by the fetchers, the normalizer and the renderers

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider answered with a status code we don't handle
    #[error("{context}: unexpected status {status}")]
    Protocol { status: u16, context: String },

    /// A provider response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Required configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    /// The caller presented no token or the wrong one
    #[error("Forbidden")]
    Forbidden,

    #[cfg(feature = "http")]
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub fn protocol(status: u16, context: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            context: context.into(),
        }
    }
}
