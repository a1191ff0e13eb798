/// Runtime configuration read from the environment
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::routing::{self, Router};

pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_ALLOWED_FROM: &str = "noreply@sandiego.gov,ahmadyar228@gmail.com";
pub const DEFAULT_NOTIFICATION_PREFIX: &str = "City of San Diego";
pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_IMAP_MAILBOX: &str = "INBOX";
pub const DEFAULT_STATE_FILE: &str = ".last_uid";

/// IMAP mailbox polled by the `fetch` command.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub mailbox: String,
    /// Holds the highest UID already handed to Slack
    pub state_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub slack_token: Option<String>,
    pub slack_api_base_url: String,
    /// Sender substrings accepted by the intake
    pub allowed_from: Vec<String>,
    pub channel_ids: HashMap<String, String>,
    pub user_ids: HashMap<String, String>,
    /// Prefix of the plain-text fallback shown in notifications
    pub notification_prefix: String,
    pub imap: ImapConfig,
}

impl Config {
    /// Build a config from a variable lookup.
    ///
    /// `SLACK_CHANNEL_IDS` and `SLACK_USER_IDS` replace the built-in tables
    /// wholesale when set to a non-empty value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let allowed = var("IMAP_ALLOWED_FROM").unwrap_or_else(|| DEFAULT_ALLOWED_FROM.to_string());
        let allowed_from = allowed
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();

        let channel_ids = match var("SLACK_CHANNEL_IDS") {
            Some(value) => parse_mapping("SLACK_CHANNEL_IDS", &value)?,
            None => routing::default_channel_ids(),
        };
        let user_ids = match var("SLACK_USER_IDS") {
            Some(value) => parse_mapping("SLACK_USER_IDS", &value)?,
            None => routing::default_user_ids(),
        };

        let port = match var("IMAP_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value.clone()))?,
            None => DEFAULT_IMAP_PORT,
        };
        let imap = ImapConfig {
            host: var("IMAP_HOST").map(|h| h.trim().to_string()).unwrap_or_default(),
            port,
            username: var("IMAP_USERNAME").unwrap_or_default(),
            password: var("IMAP_PASSWORD").unwrap_or_default(),
            mailbox: var("IMAP_MAILBOX").unwrap_or_else(|| DEFAULT_IMAP_MAILBOX.to_string()),
            state_file: var("IMAP_STATE_FILE")
                .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string())
                .into(),
        };

        Ok(Config {
            slack_token: var("SLACK_BOT_TOKEN").map(|t| t.trim().to_string()),
            slack_api_base_url: var("SLACK_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            allowed_from,
            channel_ids,
            user_ids,
            notification_prefix: var("NOTIFICATION_PREFIX")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_PREFIX.to_string()),
            imap,
        })
    }

    /// IMAP settings, or an error when the mailbox can't be reached
    pub fn require_imap(&self) -> Result<&ImapConfig, ConfigError> {
        if self.imap.host.is_empty() {
            return Err(ConfigError::MissingImapHost);
        }
        if self.imap.username.is_empty() {
            return Err(ConfigError::MissingImapCredentials);
        }
        Ok(&self.imap)
    }

    /// Bot token, or an error when delivery is attempted without one
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.slack_token
            .as_deref()
            .ok_or(ConfigError::MissingToken)
    }

    pub fn router(&self) -> Router {
        Router::new(self.channel_ids.clone(), self.user_ids.clone())
    }
}

/// Load configuration from the process environment.
///
/// Call this after `dotenv()` so a local `.env` file is honoured.
pub fn load() -> Result<Config, ConfigError> {
    Config::from_lookup(|name| env::var(name).ok())
}

/// Parse `route=ID,route=ID` into a map.
fn parse_mapping(var: &str, value: &str) -> Result<HashMap<String, String>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, id)) if !key.trim().is_empty() && !id.trim().is_empty() => {
                Ok((key.trim().to_string(), id.trim().to_string()))
            }
            _ => Err(ConfigError::InvalidMapping {
                var: var.to_string(),
                entry: entry.to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.slack_token, None);
        assert_eq!(config.slack_api_base_url, DEFAULT_SLACK_API_BASE);
        assert_eq!(
            config.allowed_from,
            vec!["noreply@sandiego.gov", "ahmadyar228@gmail.com"]
        );
        assert_eq!(config.channel_ids, routing::default_channel_ids());
        assert_eq!(config.user_ids, routing::default_user_ids());
        assert_eq!(config.notification_prefix, DEFAULT_NOTIFICATION_PREFIX);
        assert!(matches!(
            config.require_token(),
            Err(ConfigError::MissingToken)
        ));
        assert_eq!(config.imap.port, 993);
        assert_eq!(config.imap.mailbox, "INBOX");
        assert_eq!(config.imap.state_file, PathBuf::from(".last_uid"));
        assert!(matches!(
            config.require_imap(),
            Err(ConfigError::MissingImapHost)
        ));
    }

    #[test]
    fn test_reads_imap_settings() {
        let config = Config::from_lookup(lookup(&[
            ("IMAP_HOST", " imap.mail.yahoo.com "),
            ("IMAP_PORT", "1993"),
            ("IMAP_USERNAME", "permits@example.test"),
            ("IMAP_PASSWORD", "app-password"),
            ("IMAP_STATE_FILE", "/var/lib/email-to-slack/uid"),
        ]))
        .unwrap();

        let imap = config.require_imap().unwrap();
        assert_eq!(imap.host, "imap.mail.yahoo.com");
        assert_eq!(imap.port, 1993);
        assert_eq!(imap.username, "permits@example.test");
        assert_eq!(imap.password, "app-password");
        assert_eq!(imap.state_file, PathBuf::from("/var/lib/email-to-slack/uid"));
    }

    #[test]
    fn test_imap_host_without_username_is_incomplete() {
        let config = Config::from_lookup(lookup(&[("IMAP_HOST", "imap.example.test")])).unwrap();
        assert!(matches!(
            config.require_imap(),
            Err(ConfigError::MissingImapCredentials)
        ));
    }

    #[test]
    fn test_rejects_bad_imap_port() {
        let err = Config::from_lookup(lookup(&[("IMAP_PORT", "imaps")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(ref v) if v == "imaps"));
    }

    #[test]
    fn test_reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SLACK_BOT_TOKEN", " xoxb-1 "),
            ("IMAP_ALLOWED_FROM", " a@x.test , ,b@y.test"),
            ("SLACK_CHANNEL_IDS", "review_pending=C9, permit_issuance = C8"),
            ("SLACK_USER_IDS", "test_flow=U7"),
            ("NOTIFICATION_PREFIX", "Permits"),
        ]))
        .unwrap();

        assert_eq!(config.require_token().unwrap(), "xoxb-1");
        assert_eq!(config.allowed_from, vec!["a@x.test", "b@y.test"]);
        assert_eq!(config.channel_ids.len(), 2);
        assert_eq!(config.channel_ids["permit_issuance"], "C8");
        assert_eq!(config.user_ids["test_flow"], "U7");
        assert_eq!(config.notification_prefix, "Permits");
    }

    #[test]
    fn test_empty_token_counts_as_missing() {
        let config = Config::from_lookup(lookup(&[("SLACK_BOT_TOKEN", "  ")])).unwrap();
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_rejects_malformed_mapping() {
        let err = Config::from_lookup(lookup(&[("SLACK_CHANNEL_IDS", "review_pending")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidMapping { ref var, .. } if var == "SLACK_CHANNEL_IDS"
        ));
    }
}
