//! Handler error types
//!
//! Every failure is terminal for the invocation; `main` turns these into an
//! error report on stderr and a non-zero exit.

use thiserror::Error;

/// Errors raised while turning one Sensu event into one Squadcast POST
#[derive(Error, Debug)]
pub enum HandlerError {
    /// No webhook URL configured
    #[error("missing Squadcast API URL")]
    MissingApiUrl,

    /// Webhook URL is not an absolute http(s) URL
    #[error("invalid Squadcast API URL specification: {0}")]
    InvalidApiUrl(String),

    /// Event JSON could not be decoded
    #[error("failed to parse event: {0}")]
    EventParse(#[from] serde_json::Error),

    /// Event decoded but is missing required parts
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Template does not parse
    #[error("invalid template {template:?}")]
    TemplateSyntax {
        template: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    /// Template parsed but could not be evaluated against the event
    #[error("failed to evaluate template {template:?}")]
    TemplateRender {
        template: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// Payload could not be encoded
    #[error("failed to marshal Squadcast event: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Network-level failure talking to the webhook
    #[error("POST to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// Webhook answered outside 200-299
    #[error("POST to {url} failed with {status}")]
    Status { url: String, status: String },
}

/// Result type alias using HandlerError
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Reduce a webhook URL to scheme, host and port
///
/// Squadcast webhook URLs embed the API token in the path, so only the origin
/// is fit for error messages and logs.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{}://{}:{}/…", parsed.scheme(), host, port),
                None => format!("{}://{}/…", parsed.scheme(), host),
            },
            None => "<redacted>".to_string(),
        },
        Err(_) => "<redacted>".to_string(),
    }
}
