// Drives the compiled binary against a throwaway settings file and database.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use typeboard::score::ScoreEntry;
use typeboard::store::{ScoreStore, SqliteScoreStore};

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("settings.json")
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("scores.db")
    }

    fn seed(&self, entries: &[ScoreEntry]) {
        let store = SqliteScoreStore::open(self.database()).unwrap();
        for entry in entries {
            store.insert(entry).unwrap();
        }
    }

    fn usernames(&self) -> Vec<String> {
        let store = SqliteScoreStore::open(self.database()).unwrap();
        store
            .scan()
            .unwrap()
            .into_iter()
            .map(|s| s.entry.username)
            .collect()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("typeboard").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("TYPEBOARD_DATABASE")
            .env_remove("TYPEBOARD_ADMIN_TOKEN")
            .env_remove("TYPEBOARD_SUBMIT_POLICY")
            .env("RUST_LOG", "off")
            .arg("--config")
            .arg(self.config())
            .arg("--database")
            .arg(self.database());
        cmd
    }
}

fn path_arg(p: &Path) -> String {
    p.display().to_string()
}

#[test]
fn check_username_accepts_clean_names() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["check-username", "fast_fingers"])
        .assert()
        .success()
        .stdout("accepted\n");
}

#[test]
fn check_username_rejects_with_reason() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["check-username", "ab"])
        .assert()
        .code(1)
        .stdout("rejected: Username must be at least 3 characters long.\n");

    sb.cmd()
        .args(["check-username", "s h i t_lord"])
        .assert()
        .code(1)
        .stdout("rejected: Username contains inappropriate content.\n");
}

#[test]
fn leaderboard_csv_export() {
    let sb = Sandbox::new();
    sb.seed(&[
        ScoreEntry::new("alice", 50.0, 90.0).with_college("NMIMS"),
        ScoreEntry::new("alice", 70.0, 80.0).with_college("NMIMS"),
        ScoreEntry::new("bob", 65.0, 99.0).with_college("DJSCE"),
    ]);

    sb.cmd()
        .args(["leaderboard", "--csv"])
        .assert()
        .success()
        .stdout(
            "rank,username,college,best_wpm,avg_accuracy,tests_taken\n\
             1,alice,NMIMS,70.0,85.0,2\n\
             2,bob,DJSCE,65.0,99.0,1\n",
        );

    sb.cmd()
        .args(["leaderboard", "--csv", "--college", "djsce"])
        .assert()
        .success()
        .stdout(
            "rank,username,college,best_wpm,avg_accuracy,tests_taken\n\
             1,bob,DJSCE,65.0,99.0,1\n",
        );
}

#[test]
fn empty_leaderboard_table() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("leaderboard")
        .assert()
        .success()
        .stdout("No results yet.\n");
}

#[test]
fn remove_user_and_clear() {
    let sb = Sandbox::new();
    sb.seed(&[
        ScoreEntry::new("alice", 50.0, 90.0),
        ScoreEntry::new("bob", 65.0, 99.0),
        ScoreEntry::new("carol", 60.0, 95.0),
    ]);

    sb.cmd().args(["remove-user", "bob"]).assert().success();
    assert_eq!(sb.usernames(), vec!["alice", "carol"]);

    sb.cmd().arg("clear").assert().failure();
    assert_eq!(sb.usernames().len(), 2);

    sb.cmd().args(["clear", "--yes"]).assert().success();
    assert!(sb.usernames().is_empty());
}

#[test]
fn purge_removes_names_the_rules_reject() {
    let sb = Sandbox::new();
    sb.seed(&[
        ScoreEntry::new("alice", 50.0, 90.0),
        ScoreEntry::new("riya_fan", 65.0, 99.0),
        ScoreEntry::new("bad name!", 60.0, 95.0),
    ]);

    sb.cmd().args(["purge", "--dry-run"]).assert().success();
    assert_eq!(sb.usernames().len(), 3);

    sb.cmd().arg("purge").assert().success();
    assert_eq!(sb.usernames(), vec!["alice"]);
}

#[test]
fn init_config_refuses_to_overwrite() {
    let sb = Sandbox::new();
    let assert = sb.cmd().arg("init-config").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert_eq!(stdout.trim_end(), path_arg(&sb.config()));
    assert!(sb.config().exists());

    sb.cmd().arg("init-config").assert().failure();
    sb.cmd().args(["init-config", "--force"]).assert().success();
}

#[test]
fn malformed_config_is_reported() {
    let sb = Sandbox::new();
    std::fs::write(sb.config(), "{ nope").unwrap();
    sb.cmd().args(["check-username", "alice"]).assert().failure();
}
