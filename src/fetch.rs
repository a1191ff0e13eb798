/// IMAP intake of unseen messages newer than the last handled UID
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use native_tls::TlsConnector;

use crate::config::ImapConfig;
use crate::error::Result;

/// One message as fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    pub uid: u32,
    /// Full RFC 822 source
    pub raw: Vec<u8>,
}

/// File holding the highest UID already processed.
#[derive(Debug, Clone)]
pub struct UidState {
    path: PathBuf,
}

impl UidState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UidState { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing, empty or non-numeric file means nothing was processed yet.
    pub fn load(&self) -> Result<Option<u32>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    return Ok(None);
                }
                match contents.parse() {
                    Ok(uid) => Ok(Some(uid)),
                    Err(_) => {
                        warn!(
                            "Ignoring unreadable UID {:?} in {}",
                            contents,
                            self.path.display()
                        );
                        Ok(None)
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, uid: u32) -> Result<()> {
        fs::write(&self.path, uid.to_string())?;
        Ok(())
    }
}

/// UIDs above `last_uid`, ascending.
pub fn newer_than(uids: impl IntoIterator<Item = u32>, last_uid: Option<u32>) -> Vec<u32> {
    let mut uids: Vec<u32> = uids
        .into_iter()
        .filter(|&uid| last_uid.is_none_or(|last| uid > last))
        .collect();
    uids.sort_unstable();
    uids
}

/// Highest UID in a batch, used as the next state value.
pub fn highest_uid(messages: &[FetchedMessage]) -> Option<u32> {
    messages.iter().map(|m| m.uid).max()
}

/// Fetch UNSEEN messages with a UID above `last_uid`.
///
/// With `peek` the messages are read with `BODY.PEEK[]` and stay unseen on
/// the server; otherwise `RFC822` is fetched, which marks them seen. This is
/// a blocking call.
pub fn fetch_unseen(
    config: &ImapConfig,
    last_uid: Option<u32>,
    peek: bool,
) -> Result<Vec<FetchedMessage>> {
    debug!("connecting to {}:{}", config.host, config.port);
    let tls = TlsConnector::builder().build()?;
    let client = imap::connect((config.host.as_str(), config.port), &config.host, &tls)?;
    let mut session = client
        .login(&config.username, &config.password)
        .map_err(|(e, _client)| e)?;

    let result = fetch_from_session(&mut session, config, last_uid, peek);
    if let Err(e) = session.logout() {
        debug!("logout failed: {}", e);
    }
    result
}

fn fetch_from_session<T: std::io::Read + std::io::Write>(
    session: &mut imap::Session<T>,
    config: &ImapConfig,
    last_uid: Option<u32>,
    peek: bool,
) -> Result<Vec<FetchedMessage>> {
    session.select(&config.mailbox)?;
    let unseen = session.uid_search("UNSEEN")?;
    let uids = newer_than(unseen, last_uid);
    info!(
        "{} unseen message(s) in {} after UID {:?}",
        uids.len(),
        config.mailbox,
        last_uid
    );

    let query = if peek { "BODY.PEEK[]" } else { "RFC822" };
    let mut messages = Vec::with_capacity(uids.len());
    for uid in uids {
        let fetches = session.uid_fetch(uid.to_string(), query)?;
        match fetches.iter().find_map(|f| f.body()) {
            Some(body) => messages.push(FetchedMessage {
                uid,
                raw: body.to_vec(),
            }),
            None => warn!("UID {} returned no message body", uid),
        }
    }

    Ok(messages)
}
