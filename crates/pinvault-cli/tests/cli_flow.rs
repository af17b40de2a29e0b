use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pinvault"))
}

/// Isolated XDG directories and a store path for one test.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("config")).expect("create config dir");
        std::fs::create_dir_all(dir.path().join("data")).expect("create data dir");
        Self { dir }
    }

    fn store_path(&self) -> PathBuf {
        self.dir.path().join("data").join("vault.db")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config").join("pinvault").join("config.toml")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(bin());
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env("HOME", self.dir.path())
            .env_remove("PINVAULT_CONFIG")
            .env_remove("PINVAULT_STORE")
            .env_remove("PINVAULT_AS")
            .env_remove("PINVAULT_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("run pinvault")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "{:?} failed: stdout={}, stderr={}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    fn init(&self) {
        let store = self.store_path();
        self.run_ok(&[
            "init",
            store.to_str().expect("utf-8 path"),
            "--device-token",
            "author",
        ]);
    }
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("process exited normally")
}

fn json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout).expect("parse json output")
}

#[test]
fn test_cli_init_writes_config_and_store() {
    let sandbox = Sandbox::new();
    sandbox.init();

    assert!(sandbox.store_path().exists());
    let config = std::fs::read_to_string(sandbox.config_path()).expect("read config");
    assert!(config.contains("device_token = \"author\""));
    assert!(config.contains("window = \"rolling\""));

    let again = sandbox.run(&["init", sandbox.store_path().to_str().expect("utf-8 path")]);
    assert_eq!(exit_code(&again), 4);
}

#[test]
fn test_cli_steal_flow() {
    let sandbox = Sandbox::new();
    sandbox.init();

    sandbox.run_ok(&[
        "create",
        "sunset",
        "--body",
        "meet at the pier",
        "--passcode",
        "482",
    ]);

    let visitor_view = sandbox.run_ok(&["show", "sunset", "--as", "account:visitor"]);
    assert!(visitor_view.contains("meet at the pier"));
    assert!(visitor_view.contains("3 digits"));

    let failed = sandbox.run_ok(&["challenge", "sunset", "428", "--as", "account:thief"]);
    assert_eq!(failed.trim(), "failed:◎○○");

    let limited = sandbox.run_ok(&["challenge", "sunset", "482", "--as", "account:thief"]);
    assert_eq!(limited.trim(), "limit_exceeded");

    let success = sandbox.run_ok(&["challenge", "sunset", "482", "--as", "account:other"]);
    assert_eq!(success.trim(), "success");

    // Hidden during the grace period.
    let hidden = sandbox.run(&["show", "sunset", "--as", "account:visitor"]);
    assert_eq!(exit_code(&hidden), 3);

    let listed = json(&sandbox.run_ok(&["list", "--json", "--as", "account:other"]));
    let entries = listed.as_array().expect("list output array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["owner"], "account:other");
    assert_eq!(entries[0]["stolen_count"], 1);
    assert_eq!(entries[0]["visibility"]["state"], "grace_hidden");

    let previous_owner = json(&sandbox.run_ok(&["list", "--json"]));
    assert!(previous_owner
        .as_array()
        .expect("list output array")
        .is_empty());

    sandbox.run_ok(&[
        "set-passcode",
        "sunset",
        "--passcode",
        "913",
        "--as",
        "account:other",
    ]);
    let shown = json(&sandbox.run_ok(&[
        "show",
        "sunset",
        "--json",
        "--reveal",
        "--as",
        "account:other",
    ]));
    assert_eq!(shown["passcode"], "913");
    assert_eq!(shown["visibility"]["state"], "public");
}

#[test]
fn test_cli_challenge_json_and_errors() {
    let sandbox = Sandbox::new();
    sandbox.init();
    let created = json(&sandbox.run_ok(&["create", "harbor", "--passcode", "112", "--json"]));
    let entry_id = created["id"].as_str().expect("entry id").to_string();

    let malformed = sandbox.run(&["challenge", &entry_id, "12", "--as", "account:v"]);
    assert_eq!(exit_code(&malformed), 4);

    let own = sandbox.run(&["challenge", &entry_id, "112"]);
    assert_eq!(exit_code(&own), 5);

    let missing = sandbox.run(&["challenge", "nowhere", "112", "--as", "account:v"]);
    assert_eq!(exit_code(&missing), 3);

    let bad_identity = sandbox.run(&["list", "--as", "robot:x"]);
    assert_eq!(exit_code(&bad_identity), 4);

    let outcome = json(&sandbox.run_ok(&[
        "challenge", &entry_id, "211", "--json", "--as", "account:v",
    ]));
    assert_eq!(outcome["outcome"], "failed:○◎○");

    let limited = json(&sandbox.run_ok(&[
        "challenge", &entry_id, "112", "--json", "--as", "account:v",
    ]));
    assert_eq!(limited["outcome"], "limit_exceeded");
    assert!(limited["retry_at"].is_string());

    let duplicate = sandbox.run(&["create", "harbor", "--passcode", "000"]);
    assert_eq!(exit_code(&duplicate), 5);
}

#[test]
fn test_cli_upgrade_requires_grant() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_ok(&["create", "sunset", "--passcode", "482"]);

    let denied = sandbox.run(&["upgrade", "sunset", "--length", "5"]);
    assert_eq!(exit_code(&denied), 5);

    let grant = sandbox.run_ok(&["grant", "--length", "5", "--reference", "receipt-1"]);
    assert!(grant.contains("Recorded"));
    let replay = sandbox.run_ok(&["grant", "--length", "5", "--reference", "receipt-1"]);
    assert!(replay.contains("already recorded"));

    sandbox.run_ok(&["upgrade", "sunset", "--length", "5"]);

    let unavailable = sandbox.run(&["challenge", "sunset", "00000", "--as", "account:v"]);
    assert_eq!(exit_code(&unavailable), 5);

    let wrong_length = sandbox.run(&["set-passcode", "sunset", "--passcode", "482"]);
    assert_eq!(exit_code(&wrong_length), 4);
    sandbox.run_ok(&["set-passcode", "sunset", "--passcode", "48213"]);

    let consumed = sandbox.run(&["upgrade", "sunset", "--length", "6"]);
    assert_eq!(exit_code(&consumed), 5);

    let outcome = sandbox.run_ok(&["challenge", "sunset", "48231", "--as", "account:v"]);
    assert_eq!(outcome.trim(), "failed:◎◎◎○○");
}

#[test]
fn test_cli_edit_notify_delete() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_ok(&["create", "sunset", "--body", "old", "--passcode", "482"]);

    sandbox.run_ok(&[
        "edit",
        "sunset",
        "--body",
        "new body",
        "--media",
        "https://cdn.example/a.png",
    ]);
    let shown = json(&sandbox.run_ok(&["show", "sunset", "--json"]));
    assert_eq!(shown["body"], "new body");
    assert_eq!(shown["media_urls"][0], "https://cdn.example/a.png");

    let bad_media = sandbox.run(&["edit", "sunset", "--media", "ftp://x"]);
    assert_eq!(exit_code(&bad_media), 4);

    sandbox.run_ok(&["notify", "sunset", "--every", "3"]);
    let shown = json(&sandbox.run_ok(&["show", "sunset", "--json"]));
    assert_eq!(shown["notify_threshold"], 3);

    let not_owner = sandbox.run(&["delete", "sunset", "--yes", "--as", "account:v"]);
    assert_eq!(exit_code(&not_owner), 5);

    sandbox.run_ok(&["delete", "sunset", "--yes"]);
    let gone = sandbox.run(&["show", "sunset"]);
    assert_eq!(exit_code(&gone), 3);
}

#[test]
fn test_cli_maintenance_commands() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_ok(&["create", "sunset", "--passcode", "482"]);

    let check = sandbox.run_ok(&["check"]);
    assert!(check.contains("Integrity check passed"));

    let sweep = json(&sandbox.run_ok(&["sweep", "--json"]));
    assert!(sweep["published"]
        .as_array()
        .expect("published array")
        .is_empty());

    let flush = json(&sandbox.run_ok(&["notifications", "flush", "--json"]));
    assert_eq!(flush["failed"], 0);

    let backup = sandbox.path("backups/vault.backup.db");
    let backup_str = backup.to_str().expect("utf-8 path");
    sandbox.run_ok(&["backup", backup_str]);
    assert!(backup.exists());

    let restored = sandbox.run_ok(&["show", "sunset", "--store", backup_str]);
    assert!(restored.contains("sunset"));
    sandbox.run_ok(&["check", "--store", backup_str]);
}

#[test]
fn test_cli_without_config_reports_not_found() {
    let sandbox = Sandbox::new();

    let list = sandbox.run(&["list"]);
    assert_eq!(exit_code(&list), 3);

    let missing_store = sandbox.path("missing.db");
    let show = sandbox.run(&[
        "show",
        "sunset",
        "--as",
        "device:x",
        "--store",
        missing_store.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(exit_code(&show), 3);
}

#[test]
fn test_cli_completions() {
    let sandbox = Sandbox::new();
    let output = sandbox.run_ok(&["completions", "bash"]);
    assert!(output.contains("pinvault"));
}


#[test]
fn test_cli_challenge_by_keyword_counts_no_view() {
    let sandbox = Sandbox::new();
    sandbox.init();
    sandbox.run_ok(&["create", "sunset", "--passcode", "482"]);

    let failed = sandbox.run_ok(&["challenge", "sunset", "111", "--as", "account:c1"]);
    assert_eq!(failed.trim(), "failed:×××");
    let limited = sandbox.run_ok(&["challenge", "sunset", "111", "--as", "account:c1"]);
    assert_eq!(limited.trim(), "limit_exceeded");

    let shown = json(&sandbox.run_ok(&["show", "sunset", "--json"]));
    assert_eq!(shown["view_count"], 0);
    assert_eq!(shown["failed_count"], 1);
}

#[test]
fn test_cli_rejects_uuid_shaped_keyword() {
    let sandbox = Sandbox::new();
    sandbox.init();
    let created = sandbox.run(&[
        "create",
        "0b1e3f2a-6c1d-4a52-9d8e-2f7c1a9b3e40",
        "--passcode",
        "482",
    ]);
    assert_eq!(exit_code(&created), 4);
}
