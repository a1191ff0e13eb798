mod cli;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use log::{error, info};

use cli::{Args, Commands};
use email_to_slack::blocks::build_blocks;
use email_to_slack::config::{self, Config};
use email_to_slack::deliver::Dispatcher;
use email_to_slack::fetch::{UidState, fetch_unseen, highest_uid};
use email_to_slack::mail::parse_raw_message;
use email_to_slack::message::RawMessage;
use email_to_slack::slack::{DryRun, SlackClient};
use email_to_slack::{Error, Result, html_to_mrkdwn};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .try_init()
        .ok();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Commands::Convert { input } => {
            println!("{}", html_to_mrkdwn(&read_input(&input)?));
        }
        Commands::Blocks {
            input,
            subject,
            date,
            attachments,
        } => {
            let text = html_to_mrkdwn(&read_input(&input)?);
            let blocks = build_blocks(&subject, &date, &text, attachments);
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
        Commands::Deliver { messages, dry_run } => {
            let config = config::load()?;
            let (parsed, unreadable) = read_messages(&messages);
            return deliver(&config, &parsed, dry_run, unreadable).await;
        }
        Commands::Fetch { dry_run } => return fetch(dry_run).await,
    }
    Ok(ExitCode::SUCCESS)
}

async fn deliver(
    config: &Config,
    messages: &[RawMessage],
    dry_run: bool,
    unreadable: usize,
) -> Result<ExitCode> {
    let summary = if dry_run {
        let dispatcher = Dispatcher::new(config, DryRun::default());
        let summary = dispatcher.deliver_all(messages).await;
        for payload in dispatcher.sink().take_payloads() {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        summary
    } else {
        let client = SlackClient::with_base_url(
            config.require_token()?.to_string(),
            config.slack_api_base_url.clone(),
        );
        Dispatcher::new(config, client).deliver_all(messages).await
    };

    eprintln!(
        "delivered {}, skipped {}, failed {}",
        summary.delivered,
        summary.skipped,
        summary.failed + unreadable
    );
    if summary.failed + unreadable > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Pull unseen mail newer than the recorded UID, deliver it, then move the
/// recorded UID forward. A dry run peeks and leaves the state file alone.
async fn fetch(dry_run: bool) -> Result<ExitCode> {
    let config = config::load()?;
    let imap = config.require_imap()?.clone();
    if !dry_run {
        config.require_token()?;
    }

    let state = UidState::new(&imap.state_file);
    let last_uid = state.load()?;
    let fetched = tokio::task::spawn_blocking(move || fetch_unseen(&imap, last_uid, dry_run))
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))??;
    info!("Fetched {} unseen email(s)", fetched.len());

    let mut messages = Vec::with_capacity(fetched.len());
    let mut unreadable = 0;
    for message in &fetched {
        match parse_raw_message(&message.raw, &message.uid.to_string()) {
            Ok(raw) => messages.push(raw),
            Err(e) => {
                error!("Skipping UID {}: {}", message.uid, e);
                unreadable += 1;
            }
        }
    }

    let code = deliver(&config, &messages, dry_run, unreadable).await?;
    if !dry_run && let Some(uid) = highest_uid(&fetched) {
        state.save(uid)?;
    }
    Ok(code)
}

/// Parse every message file, logging the ones that can't be read.
fn read_messages(paths: &[impl AsRef<Path>]) -> (Vec<RawMessage>, usize) {
    let mut parsed = Vec::new();
    let mut unreadable = 0;

    for path in paths {
        let path = path.as_ref();
        let fallback_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match fs::read(path)
            .map_err(Error::from)
            .and_then(|raw| parse_raw_message(&raw, &fallback_id))
        {
            Ok(message) => parsed.push(message),
            Err(e) => {
                error!("Skipping {}: {}", path.display(), e);
                unreadable += 1;
            }
        }
    }

    (parsed, unreadable)
}

/// Read HTML from a file or stdin; invalid UTF-8 becomes U+FFFD.
fn read_input(path: &Path) -> io::Result<String> {
    let bytes = if path == Path::new("-") {
        let mut input = Vec::new();
        io::stdin().read_to_end(&mut input)?;
        input
    } else {
        fs::read(path)?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
