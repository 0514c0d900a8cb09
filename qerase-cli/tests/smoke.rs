use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, data).unwrap();
}

// Keeps the rolling log file inside the fixture.
fn qerase(td: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qerase").unwrap();
    cmd.env("XDG_DATA_HOME", td.path().join("xdg")).env("RUST_LOG", "warn");
    cmd
}

#[test]
fn erase_file_and_folder() {
    let td = assert_fs::TempDir::new().unwrap();
    let data = td.child("data");
    data.create_dir_all().unwrap();
    write_random(data.child("a.bin").path(), 64 * 1024, 1);
    write_random(data.child("b.bin").path(), 10 * 1024, 2);
    let loose = td.child("loose.txt");
    loose.write_str("top secret").unwrap();

    qerase(&td)
        .args(["erase", "--yes", "--standard", "dod7-ece", "--chunk-size", "4096"])
        .arg(data.path())
        .arg(loose.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("All files securely erased"))
        .stdout(predicate::str::contains("[100%]"));

    data.assert(predicate::path::missing());
    loose.assert(predicate::path::missing());
}

#[test]
fn json_lines_end_with_finished_and_report() {
    let td = assert_fs::TempDir::new().unwrap();
    let f = td.child("x.bin");
    write_random(f.path(), 2048, 3);

    let out = qerase(&td)
        .args(["erase", "--yes", "--json"])
        .arg(f.path())
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(lines.iter().all(|v| v["ts"].is_string()));
    let n = lines.len();
    assert_eq!(lines[n - 2]["event"], "finished");
    assert_eq!(lines[n - 1]["report"]["state"], "finished");
    assert_eq!(lines[n - 1]["report"]["bytes_written"], 2048);
    let progress: Vec<_> = lines.iter().filter(|v| v["event"] == "progress").collect();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0]["value"], 100);
}

#[test]
fn nothing_to_erase_fails() {
    let td = assert_fs::TempDir::new().unwrap();
    qerase(&td)
        .args(["erase", "--yes"])
        .arg(td.child("not-there").path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("nothing to erase"));
}

#[test]
fn declining_confirmation_keeps_files() {
    let td = assert_fs::TempDir::new().unwrap();
    let f = td.child("keep.txt");
    f.write_str("still here").unwrap();

    qerase(&td)
        .args(["erase"])
        .arg(f.path())
        .write_stdin("n\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Continue?"));

    f.assert("still here");
}

#[test]
fn unknown_standard_is_rejected() {
    let td = assert_fs::TempDir::new().unwrap();
    let f = td.child("f.txt");
    f.write_str("x").unwrap();
    qerase(&td)
        .args(["erase", "--yes", "--standard", "dod5"])
        .arg(f.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown erasure standard"));
    f.assert("x");
}

#[test]
fn bad_config_file_is_reported() {
    let td = assert_fs::TempDir::new().unwrap();
    let cfg = td.child("cfg.json");
    cfg.write_str(r#"{ "chunk_size": 0 }"#).unwrap();
    let f = td.child("f.txt");
    f.write_str("x").unwrap();

    qerase(&td)
        .args(["erase", "--yes", "--config"])
        .arg(cfg.path())
        .arg(f.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("chunk_size"));
    f.assert("x");
}

#[test]
fn standards_lists_all_five() {
    let td = assert_fs::TempDir::new().unwrap();
    qerase(&td)
        .arg("standards")
        .assert()
        .success()
        .stdout(predicate::str::contains("gutmann"))
        .stdout(predicate::str::contains("dod7-ece"))
        .stdout(predicate::str::contains("[35 passes] Gutmann"));

    let out = qerase(&td).args(["standards", "--json"]).output().unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 5);
    assert_eq!(v[1]["passes"], 7);
}

#[test]
fn holders_on_a_free_file() {
    let td = assert_fs::TempDir::new().unwrap();
    let f = td.child("free.txt");
    f.write_str("x").unwrap();
    qerase(&td)
        .arg("holders")
        .arg(f.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("not locked"));
}
