//! Integration tests that run the CLI binary.

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

const EMAIL: &str = "From: City Permits <noreply@sandiego.gov>\r\n\
Subject: Permit Issued for PRJ-7\r\n\
Date: Tue, 3 Feb 2026 09:30:00 -0800\r\n\
Message-ID: <prj-7@sandiego.gov>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Your permit is <b>ready</b>.</p>\r\n";

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_email-to-slack"));
    for var in [
        "SLACK_BOT_TOKEN",
        "SLACK_API_BASE_URL",
        "IMAP_ALLOWED_FROM",
        "SLACK_CHANNEL_IDS",
        "SLACK_USER_IDS",
        "NOTIFICATION_PREFIX",
        "IMAP_HOST",
        "IMAP_PORT",
        "IMAP_USERNAME",
        "IMAP_PASSWORD",
        "IMAP_MAILBOX",
        "IMAP_STATE_FILE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn cli_help_succeeds_and_outputs_usage() {
    let output = bin()
        .arg("--help")
        .output()
        .expect("binary not found - run cargo build first");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("convert"));
    assert!(stdout.contains("deliver"));
}

#[test]
fn cli_convert_reads_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("body.html");
    fs::write(&path, "<b>Hi</b> <i>there</i> &amp; bye").unwrap();

    let output = bin().arg("convert").arg(&path).output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "*Hi* _there_ & bye\n"
    );
}

#[test]
fn cli_convert_replaces_invalid_utf8() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("latin1.html");
    fs::write(&path, b"<b>Caf\xe9</b>").unwrap();

    let output = bin().arg("convert").arg(&path).output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "*Caf\u{FFFD}*\n"
    );
}

#[test]
fn cli_convert_reads_stdin() {
    let mut child = bin()
        .arg("convert")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"<a href=\"https://x.test\">click</a>")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "<https://x.test|click>\n"
    );
}

#[test]
fn cli_blocks_prints_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("body.html");
    fs::write(&path, "<p>Body</p>").unwrap();

    let output = bin()
        .args(["blocks", "--subject", "Hello", "--date", "today", "--attachments"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let blocks: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(blocks.len(), 5);
    assert_eq!(blocks[0]["text"]["text"], "*Hello*");
    assert_eq!(blocks[2]["text"]["text"], "Body");
}

#[test]
fn cli_deliver_dry_run_prints_payload() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("prj-7.eml");
    fs::write(&path, EMAIL).unwrap();

    // Run from the temp dir so dotenv() won't pick up a project .env
    let output = bin()
        .current_dir(dir.path())
        .args(["deliver", "--dry-run"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["channel"], "C0ACHGN84BV");
    assert_eq!(payload["text"], "City of San Diego: Permit Issued for PRJ-7");
    assert_eq!(payload["blocks"][2]["text"]["text"], "Your permit is *ready*.");
}

#[test]
fn cli_deliver_without_token_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("prj-7.eml");
    fs::write(&path, EMAIL).unwrap();

    let output = bin()
        .current_dir(dir.path())
        .arg("deliver")
        .arg(&path)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("SLACK_BOT_TOKEN"));
}

#[test]
fn cli_fetch_without_imap_host_fails() {
    let dir = tempfile::tempdir().expect("temp dir");

    let output = bin()
        .current_dir(dir.path())
        .args(["fetch", "--dry-run"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("IMAP_HOST"));
    assert!(!dir.path().join(".last_uid").exists());
}
