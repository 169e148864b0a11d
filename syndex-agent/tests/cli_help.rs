use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn help_mentions_connection_options() {
    let mut cmd = cargo_bin_cmd!("syndex-agent");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--target"), "help missing --target");
    assert!(text.contains("--api-key"), "help missing --api-key");
    assert!(
        text.contains("--api-key-from-stdin"),
        "help missing --api-key-from-stdin"
    );
    assert!(text.contains("--insecure"), "help missing --insecure");
}

#[test]
fn help_mentions_mapping_and_scanner_options() {
    let mut cmd = cargo_bin_cmd!("syndex-agent");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--occ"), "help missing --occ");
    assert!(text.contains("--mappings"), "help missing --mappings");
    assert!(text.contains("--map"), "help missing --map");
    assert!(text.contains("--shallow"), "help missing --shallow");
    assert!(
        text.contains("FOLDER=OWNER:DEST"),
        "help missing inline mapping syntax"
    );
}

#[test]
fn missing_occ_path_is_reported() {
    let mut cmd = cargo_bin_cmd!("syndex-agent");
    cmd.env_remove("SYNDEX_OCC")
        .env_remove("SYNDEX_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--occ"));
}
