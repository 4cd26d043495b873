//! End-to-end CLI tests for chatvault.
//!
//! These tests run the actual binary against a JSON dump written into a
//! temporary directory and check the backup it produces.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test cli_e2e
//! ```

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

// ============================================================================
// Test Fixtures
// ============================================================================

const DUMP: &str = r#"{
  "conversations": [
    {
      "peer": {"id": 1, "kind": "group", "name": "My Chat"},
      "messages": [
        {"id": 4, "date": 1705314780, "text": "latest", "src": {"id": 10, "kind": "user", "name": "Alice", "first_name": "Alice"}},
        null,
        {"id": 2, "date": 1705314660, "media": {"type": "photo", "location": "media/2.jpg"}},
        {"id": 1, "text": "undated"}
      ]
    },
    {
      "peer": {"id": 2, "kind": "channel", "name": "OtherChat"},
      "messages": [{"id": 1, "date": 1705314600, "text": "news"}]
    },
    {
      "peer": {"id": 3, "kind": "user", "name": ""},
      "messages": [{"id": 1, "text": "ghost"}]
    }
  ]
}"#;

fn setup_dump() -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");
    fs::create_dir(dir.path().join("media")).unwrap();
    fs::write(dir.path().join("media/2.jpg"), b"\xFF\xD8\xFF").unwrap();
    fs::write(dir.path().join("dump.json"), DUMP).unwrap();
    dir
}

fn chatvault() -> Command {
    Command::cargo_bin("chatvault").unwrap()
}

fn fast<'a>(cmd: &'a mut Command, dir: &Path) -> &'a mut Command {
    cmd.arg("--dump")
        .arg(dir.join("dump.json"))
        .arg("-o")
        .arg(dir.join("out"))
        .args(["--request-delay-ms", "0", "--media-delay-ms", "0"])
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

// ============================================================================
// Basic functionality
// ============================================================================

#[test]
fn test_backs_up_every_identifiable_conversation() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Done!"))
        .stderr(predicate::str::contains("Backing up My Chat [messages 0-99]"))
        .stderr(predicate::str::contains("All backups have been completed"));

    let out = dir.path().join("out");
    assert_eq!(line_count(&out.join("My_Chat.jsonl")), 3);
    assert_eq!(line_count(&out.join("OtherChat.jsonl")), 1);
    assert!(!out.join(".jsonl").exists());
}

#[test]
fn test_target_filter() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["-t", "My Chat"])
        .assert()
        .success();

    let out = dir.path().join("out");
    assert!(out.join("My_Chat.jsonl").exists());
    assert!(!out.join("OtherChat.jsonl").exists());
}

#[test]
fn test_nothing_selected() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["--target", "Nobody"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to back up"))
        .stderr(predicate::str::contains("No dialogs selected"));
}

#[test]
fn test_limit_flag() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["--limit", "2", "-t", "My Chat"])
        .assert()
        .success();

    // two slots requested, one of them empty
    assert_eq!(line_count(&dir.path().join("out/My_Chat.jsonl")), 1);
}

#[test]
fn test_missing_timestamp_warning() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["-t", "My Chat"])
        .assert()
        .success()
        .stderr(predicate::str::contains("1 message(s) in My Chat had no timestamp"));
}

// ============================================================================
// Media
// ============================================================================

#[test]
fn test_photos_are_downloaded() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["--photos", "-t", "My Chat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 saved, 0 failed"));

    let out = dir.path().join("out");
    assert!(out.join("My_Chat_files/2_2.jpg").exists());
    let text = fs::read_to_string(out.join("My_Chat.jsonl")).unwrap();
    assert!(text.contains(r#""file":"My_Chat_files/2_2.jpg""#));
    // the dump keeps its copy
    assert!(dir.path().join("media/2.jpg").exists());
}

#[test]
fn test_missing_media_file_is_not_fatal() {
    let dir = setup_dump();
    fs::remove_file(dir.path().join("media/2.jpg")).unwrap();

    fast(&mut chatvault(), dir.path())
        .args(["--photos", "-t", "My Chat"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Media of message 2"));

    let text = fs::read_to_string(dir.path().join("out/My_Chat.jsonl")).unwrap();
    assert!(text.contains(r#""file":null"#));
}

#[test]
fn test_media_skipped_without_flags() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path()).assert().success();

    let out = dir.path().join("out");
    assert!(!out.join("My_Chat_files").exists());
    let text = fs::read_to_string(out.join("My_Chat.jsonl")).unwrap();
    assert!(!text.contains(r#""file""#));
}

// ============================================================================
// Flags
// ============================================================================

#[test]
fn test_list_does_not_write() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 conversation(s) selected"))
        .stdout(predicate::str::contains("My Chat (group 1)"));

    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_config_file() {
    let dir = setup_dump();
    fs::write(
        dir.path().join("chatvault.toml"),
        "targets = [\"Other\"]\nrequest_delay_ms = 0\nmedia_delay_ms = 0\n",
    )
    .unwrap();

    chatvault()
        .arg("--dump")
        .arg(dir.path().join("dump.json"))
        .arg("-o")
        .arg(dir.path().join("out"))
        .arg("--config")
        .arg(dir.path().join("chatvault.toml"))
        .assert()
        .success();

    assert!(dir.path().join("out/OtherChat.jsonl").exists());
    assert!(!dir.path().join("out/My_Chat.jsonl").exists());
}

#[test]
fn test_help() {
    chatvault()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dump"))
        .stdout(predicate::str::contains("--target"));
}

#[cfg(feature = "gen-test")]
#[test]
fn test_generated_dump_backs_up_every_conversation() {
    let dir = tempdir().unwrap();
    let dump = dir.path().join("dump.json");

    // 12 conversations over a small name pool, so sanitized names repeat
    Command::cargo_bin("gen_dump")
        .unwrap()
        .args(["12", "30"])
        .arg(&dump)
        .assert()
        .success();

    let parsed: chatvault::source::DumpFile =
        serde_json::from_str(&fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(parsed.conversations.len(), 12);

    fast(&mut chatvault(), dir.path()).assert().success();

    let outputs = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "jsonl"))
        .count();
    assert_eq!(outputs, 12);
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_missing_dump_fails() {
    let dir = tempdir().unwrap();

    chatvault()
        .arg("--dump")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_malformed_dump_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dump.json"), "{ not json").unwrap();

    fast(&mut chatvault(), dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON error"));
}

#[test]
fn test_zero_chunk_size_rejected() {
    let dir = setup_dump();

    fast(&mut chatvault(), dir.path())
        .args(["--chunk-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_size"));
}

#[test]
fn test_dump_flag_required() {
    chatvault().assert().failure();
}
