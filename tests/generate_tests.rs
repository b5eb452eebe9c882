//! End-to-end generation tests
//!
//! Each test lays out an inventory (and any key files) in a tempdir, loads
//! it through `Config::load`, and drives the full render-and-write pipeline
//! the binary uses.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use fleetkey::config::Config;
use fleetkey::output::OutputPlan;
use fleetkey::summary::{self, StepOutputSink, SummarySink};

/// Write an inventory file and return its path
fn write_inventory(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("config.yml");
    fs::write(&path, yaml).unwrap();
    path
}

/// Load, render, and write in one go, returning the output directory
fn generate(dir: &Path, yaml: &str) -> PathBuf {
    let config_path = write_inventory(dir, yaml);
    let config = Config::load(&config_path).unwrap();
    let out = dir.join("generated");
    OutputPlan::build(&config).unwrap().write(&out).unwrap();
    out
}

#[test]
fn test_scenario_single_person_single_server() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: "ssh-ed25519 AAAA alice"
    access: [web1]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
    );

    let keys = fs::read_to_string(out.join("authorized_keys.web1")).unwrap();
    assert_eq!(
        keys,
        "# alice\nssh-ed25519 AAAA alice\n# root_key (deployment)\nssh-rsa BBBB root\n"
    );

    let ssh_config = fs::read_to_string(out.join("config")).unwrap();
    assert_eq!(ssh_config, "Host web1\n    HostName 10.0.0.1\n    User deploy\n");
}

#[test]
fn test_scenario_disabled_person_leaves_only_root_key() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: "ssh-ed25519 AAAA alice"
    enabled: false
    access: [web1]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
    );

    let keys = fs::read_to_string(out.join("authorized_keys.web1")).unwrap();
    assert_eq!(keys, "# root_key (deployment)\nssh-rsa BBBB root\n");
    assert!(!keys.contains("alice"));
}

#[test]
fn test_scenario_group_grants_both_servers() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  bob:
    keys: "ssh-rsa CCCC bob"
    access:
      groups: [ops]
groups:
  ops: [web1, web2]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
  web2:
    hostname: 10.0.0.2
    user: deploy
"#,
    );

    for server in ["web1", "web2"] {
        let keys = fs::read_to_string(out.join(format!("authorized_keys.{server}"))).unwrap();
        assert!(keys.contains("# bob"), "bob missing on {server}");
    }
}

#[test]
fn test_scenario_missing_root_key_aborts_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_inventory(
        dir.path(),
        r#"
root_key:
  public: /nonexistent/root.pub
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
    );

    let err = Config::load(&config_path).unwrap_err();
    assert!(matches!(err, fleetkey::Error::RootKey(_)));
    assert!(
        !dir.path().join("generated").exists(),
        "no output may exist after an aborted run"
    );
}

#[test]
fn test_scenario_port_rendered_only_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
    port: 2222
  web2:
    hostname: 10.0.0.2
    user: deploy
"#,
    );

    let ssh_config = fs::read_to_string(out.join("config")).unwrap();
    let blocks: Vec<&str> = ssh_config.split("\n\n").collect();
    assert!(blocks[0].contains("    Port 2222"));
    assert!(!blocks[1].contains("Port"));
}

#[test]
fn test_key_file_references_resolve_and_trim() {
    let dir = tempfile::tempdir().unwrap();
    let keys_dir = dir.path().join("keys");
    fs::create_dir_all(&keys_dir).unwrap();
    let root_pub = keys_dir.join("deploy.pub");
    fs::write(&root_pub, "ssh-rsa ROOTKEY deploy\n").unwrap();
    let alice_pub = keys_dir.join("alice.pub");
    fs::write(&alice_pub, "  ssh-ed25519 AAAA alice@laptop  \n").unwrap();

    let out = generate(
        dir.path(),
        &format!(
            r#"
root_key:
  public: {}
people:
  alice:
    keys: {}
    access: [web1]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
            root_pub.display(),
            alice_pub.display()
        ),
    );

    let keys = fs::read_to_string(out.join("authorized_keys.web1")).unwrap();
    // File contents are trimmed before rendering
    assert_eq!(
        keys,
        "# alice\nssh-ed25519 AAAA alice@laptop\n# root_key (deployment)\nssh-rsa ROOTKEY deploy\n"
    );
}

#[test]
fn test_disabled_server_gets_no_outputs_at_all() {
    let dir = tempfile::tempdir().unwrap();
    let out = generate(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
  old:
    hostname: 10.0.0.9
    user: deploy
    enabled: false
"#,
    );

    assert!(out.join("authorized_keys.web1").exists());
    assert!(!out.join("authorized_keys.old").exists());
    let ssh_config = fs::read_to_string(out.join("config")).unwrap();
    assert!(!ssh_config.contains("Host old"));
}

#[test]
fn test_unreadable_person_key_aborts_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_inventory(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: /nonexistent/alice.pub
    access: [web1]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
  web2:
    hostname: 10.0.0.2
    user: deploy
"#,
    );

    let config = Config::load(&config_path).unwrap();
    let err = OutputPlan::build(&config).unwrap_err();
    assert!(matches!(err, fleetkey::Error::KeyFile { .. }));
    // Nothing was written, not even for web2 which would have rendered fine
    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_summary_records_and_step_output() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_inventory(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
    restart_service: nginx
  old:
    hostname: 10.0.0.9
    user: deploy
    enabled: false
  web2:
    hostname: 10.0.0.2
    user: deploy
"#,
    );

    let config = Config::load(&config_path).unwrap();
    let records = summary::server_records(&config);
    let line = summary::summary_line(&records).unwrap();
    assert_eq!(
        line,
        r#"servers=[{"name":"web1","restart_service":"nginx"},{"name":"web2","restart_service":""}]"#
    );

    let step_output = dir.path().join("step_output");
    let mut sink = StepOutputSink::new(step_output.clone());
    sink.emit(&line).unwrap();
    assert_eq!(fs::read_to_string(&step_output).unwrap(), format!("{line}\n"));
}

#[test]
fn test_regeneration_is_deterministic() {
    let inventory = r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: "ssh-ed25519 AAAA alice"
    access: [ops]
groups:
  ops: [web1, web2]
servers:
  web2:
    hostname: 10.0.0.2
    user: deploy
  web1:
    hostname: 10.0.0.1
    user: deploy
"#;

    let dir1 = tempfile::tempdir().unwrap();
    let dir2 = tempfile::tempdir().unwrap();
    let out1 = generate(dir1.path(), inventory);
    let out2 = generate(dir2.path(), inventory);

    for file in ["config", "authorized_keys.web1", "authorized_keys.web2"] {
        assert_eq!(
            fs::read_to_string(out1.join(file)).unwrap(),
            fs::read_to_string(out2.join(file)).unwrap(),
            "{file} differs between runs"
        );
    }

    // Declaration order survives: web2 was declared first
    let ssh_config = fs::read_to_string(out1.join("config")).unwrap();
    let web2 = ssh_config.find("Host web2").unwrap();
    let web1 = ssh_config.find("Host web1").unwrap();
    assert!(web2 < web1);
}

#[test]
fn test_strict_check_flags_unknown_targets() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_inventory(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: "ssh-ed25519 AAAA alice"
    access: [opz]
groups:
  ops: [web1, ghost]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
    );

    let config = Config::load(&config_path).unwrap();
    let findings = fleetkey::access::unknown_targets(&config);
    let entries: Vec<&str> = findings.iter().map(|f| f.entry.as_str()).collect();
    assert_eq!(entries, vec!["opz", "ghost"]);
}

#[test]
fn test_strict_check_clean_inventory_has_no_findings() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_inventory(
        dir.path(),
        r#"
root_key:
  public: "ssh-rsa BBBB root"
people:
  alice:
    keys: "ssh-ed25519 AAAA alice"
    access:
      servers: [web1]
      groups: [ops]
groups:
  ops: [web1]
servers:
  web1:
    hostname: 10.0.0.1
    user: deploy
"#,
    );

    let config = Config::load(&config_path).unwrap();
    assert!(fleetkey::access::unknown_targets(&config).is_empty());
}
