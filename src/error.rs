/// Error types shared by mail intake, configuration and Slack delivery
use thiserror::Error;

/// Error type for all delivery operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// IO error when reading messages or writing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON encoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid or incomplete configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// IMAP protocol or connection failure.
    #[error("imap error: {0}")]
    Imap(#[from] imap::Error),
    /// TLS setup for the IMAP connection failed.
    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),
    /// Raw message could not be parsed as RFC 822.
    #[error("mail parse error: {0}")]
    MailParse(String),
    /// Slack answered with `ok: false`.
    #[error("{method} failed: {error}")]
    SlackApi { method: String, error: String },
    /// Neither a channel nor a user is configured for the message.
    #[error("no destination for subject: {0}")]
    NoDestination(String),
}

/// Errors raised while loading [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SLACK_BOT_TOKEN is not set")]
    MissingToken,
    #[error("invalid entry {entry:?} in {var}, expected route=ID")]
    InvalidMapping { var: String, entry: String },
    #[error("IMAP_HOST is not set")]
    MissingImapHost,
    #[error("IMAP_USERNAME is not set")]
    MissingImapCredentials,
    #[error("invalid IMAP_PORT {0:?}")]
    InvalidPort(String),
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, Error>;
