/// CLI definitions: argument parsing and subcommands
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

const AFTER_HELP: &str = "\
EXAMPLES:
  email-to-slack convert body.html           Print the mrkdwn for an HTML body
  email-to-slack convert - < body.html       Read the HTML from stdin
  email-to-slack blocks body.html --subject \"Permit Issued\" --date today
  email-to-slack deliver inbox/*.eml         Post messages to their routed channels
  email-to-slack deliver --dry-run msg.eml   Print payloads instead of posting
  email-to-slack fetch                       Post unseen IMAP messages to Slack
";

/// Command-line arguments for the application.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Republish email notifications into Slack",
    after_help = AFTER_HELP
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (use multiple times for debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce log output (errors only)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an HTML body to Slack mrkdwn
    Convert {
        /// HTML file, or '-' for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
    /// Print the Block Kit JSON for an HTML body
    Blocks {
        /// HTML file, or '-' for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        date: String,
        /// Add the attachments footer
        #[arg(long)]
        attachments: bool,
    },
    /// Parse raw RFC 822 messages and post them to Slack
    Deliver {
        /// Message files (.eml)
        #[arg(required = true)]
        messages: Vec<PathBuf>,
        /// Print the payloads instead of calling Slack
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch unseen messages over IMAP and post them to Slack
    Fetch {
        /// Print the payloads instead of calling Slack; messages stay unseen
        #[arg(long)]
        dry_run: bool,
    },
}

impl Args {
    /// Log level based on -v/-q flags: error, warn, info, or debug.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose >= 2 {
            "debug"
        } else if self.verbose >= 1 {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_defaults_to_stdin() {
        let args = Args::try_parse_from(["email-to-slack", "convert"]).unwrap();
        assert_eq!(args.log_level(), "warn");
        match &args.command {
            Commands::Convert { input } => assert_eq!(input, &PathBuf::from("-")),
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_verbosity_flags() {
        let args = Args::try_parse_from(["email-to-slack", "-vv", "convert"]).unwrap();
        assert_eq!(args.log_level(), "debug");
        let args = Args::try_parse_from(["email-to-slack", "convert", "-q"]).unwrap();
        assert_eq!(args.log_level(), "error");
    }

    #[test]
    fn test_deliver_requires_messages() {
        assert!(Args::try_parse_from(["email-to-slack", "deliver"]).is_err());
        let args =
            Args::try_parse_from(["email-to-slack", "deliver", "--dry-run", "a.eml", "b.eml"])
                .unwrap();
        match args.command {
            Commands::Deliver { messages, dry_run } => {
                assert!(dry_run);
                assert_eq!(messages.len(), 2);
            }
            _ => panic!("expected deliver"),
        }
    }

    #[test]
    fn test_fetch_takes_no_files() {
        let args = Args::try_parse_from(["email-to-slack", "fetch", "--dry-run"]).unwrap();
        assert!(matches!(args.command, Commands::Fetch { dry_run: true }));
        assert!(Args::try_parse_from(["email-to-slack", "fetch", "a.eml"]).is_err());
    }
}
