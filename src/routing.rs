/// Subject-based routing of emails to Slack channels or users
use std::collections::HashMap;

/// Subject phrase → route key. Matching is a case-insensitive substring test
/// and the first matching phrase wins.
pub const DEFAULT_ROUTES: &[(&str, &str)] = &[
    ("recheck required", "recheck_required"),
    ("review is pending", "review_pending"),
    ("permit issu", "permit_issuance"),
    ("checklist requested", "checklist_required"),
    ("test flow", "test_flow"),
];

const DEFAULT_CHANNEL_IDS: &[(&str, &str)] = &[
    ("recheck_required", "C0ACMRV4JKY"),
    ("review_pending", "C0ACHG9EFNF"),
    ("permit_issuance", "C0ACHGN84BV"),
    ("checklist_required", "C0ACHGN84BV"),
];

const DEFAULT_USER_IDS: &[(&str, &str)] = &[("test_flow", "U0ACD9N7ZTN")];

pub fn default_channel_ids() -> HashMap<String, String> {
    to_map(DEFAULT_CHANNEL_IDS)
}

pub fn default_user_ids() -> HashMap<String, String> {
    to_map(DEFAULT_USER_IDS)
}

fn to_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Where a message gets posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Channel(String),
    /// Direct message to a user
    User(String),
}

impl Destination {
    /// Conversation ID to hand to the Slack API
    pub fn id(&self) -> &str {
        match self {
            Destination::Channel(id) | Destination::User(id) => id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<(String, String)>,
    channel_ids: HashMap<String, String>,
    user_ids: HashMap<String, String>,
}

impl Router {
    /// Router over the default subject table with the given ID maps
    pub fn new(channel_ids: HashMap<String, String>, user_ids: HashMap<String, String>) -> Self {
        Router {
            routes: DEFAULT_ROUTES
                .iter()
                .map(|(phrase, key)| (phrase.to_lowercase(), key.to_string()))
                .collect(),
            channel_ids,
            user_ids,
        }
    }

    /// Route key of the first phrase contained in `subject`
    pub fn route_key(&self, subject: &str) -> Option<&str> {
        let subject = subject.to_lowercase();
        self.routes
            .iter()
            .find(|(phrase, _)| subject.contains(phrase.as_str()))
            .map(|(_, key)| key.as_str())
    }

    /// Channel configured for the subject's route, falling back to a user.
    pub fn destination(&self, subject: &str) -> Option<Destination> {
        let key = self.route_key(subject)?;
        if let Some(channel) = self.channel_ids.get(key) {
            return Some(Destination::Channel(channel.clone()));
        }
        self.user_ids
            .get(key)
            .map(|user| Destination::User(user.clone()))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(default_channel_ids(), default_user_ids())
    }
}
