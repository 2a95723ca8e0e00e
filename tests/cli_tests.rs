//! Integration tests for the CLI interface
//!
//! Tests the main entry point, command parsing and exit codes

mod common;

use assert_cmd::Command;
use common::{parse_result_lines, TestContext};
use predicates::prelude::*;

fn mapmul() -> Command {
    let mut cmd = Command::cargo_bin("mapmul").unwrap();
    cmd.env_remove("MAPMUL_STRATEGY")
        .env_remove("MAPMUL_LOG_LEVEL")
        .env_remove("MAPMUL_SKIP_ZEROS");
    cmd
}

fn write_pair(ctx: &TestContext) -> (std::path::PathBuf, std::path::PathBuf) {
    let a = ctx.create_file("A.txt", "1 2\n3 4\n").unwrap();
    let b = ctx.create_file("B.txt", "5 6\n7 8\n").unwrap();
    (a, b)
}

#[test]
fn test_cli_help_flag() {
    mapmul()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("multiply"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("generate"));
}

#[test]
fn test_invalid_command() {
    mapmul()
        .arg("transpose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_multiply_prints_result_lines() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = write_pair(&ctx);

    for strategy in ["fan-out", "shared-dimension", "auto"] {
        let output = mapmul()
            .arg("multiply")
            .arg(&a)
            .arg(&b)
            .args(["--strategy", strategy])
            .output()
            .unwrap();
        assert!(output.status.success(), "{strategy} failed");

        let stdout = String::from_utf8(output.stdout).unwrap();
        assert_eq!(
            parse_result_lines(&stdout),
            vec![(0, 0, 19.0), (0, 1, 22.0), (1, 0, 43.0), (1, 1, 50.0)]
        );
        assert!(stdout.lines().all(|line| line.split(", ").count() == 3));
    }
}

#[test]
fn test_multiply_writes_output_file_and_stats() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = write_pair(&ctx);
    let out = ctx.path().join("C.txt");

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out)
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"result_cells\": 4"));

    let written = ctx.read_file("C.txt").unwrap();
    assert_eq!(parse_result_lines(&written).len(), 4);
}

#[test]
fn test_multiply_rejects_incompatible_shapes() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.create_file("A.txt", "1 2 3\n4 5 6\n").unwrap();
    let b = ctx.create_file("B.txt", "1 2\n3 4\n5 6\n7 8\n").unwrap();

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("[E2000] Cannot multiply"));
}

#[test]
fn test_failed_multiply_leaves_no_output_file() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.create_file("A.txt", "1 2 3\n4 5 6\n").unwrap();
    let b = ctx.create_file("B.txt", "1 2 3 4 5\n1 2 3 4 5\n1 2 3 4 5\n1 2 3 4 5\n").unwrap();
    let out = ctx.path().join("C.txt");

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out)
        .assert()
        .code(3);

    assert!(!out.exists());
    // No staged temp file is left next to the inputs either
    let leftovers: Vec<_> = std::fs::read_dir(ctx.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .filter(|name| name != "A.txt" && name != "B.txt")
        .collect();
    assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
}

#[test]
fn test_multiply_rejects_ragged_rows() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.create_file("A.txt", "1 2\n3\n").unwrap();
    let b = ctx.create_file("B.txt", "1\n2\n").unwrap();

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_multiply_missing_input() {
    let ctx = TestContext::new().unwrap();
    let b = ctx.create_file("B.txt", "1\n").unwrap();

    mapmul()
        .arg("multiply")
        .arg(ctx.path().join("missing.txt"))
        .arg(&b)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_multiply_sparse_skip_zeros() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.create_file("A.txt", "0 1 2\n").unwrap();
    let b = ctx.create_file("B.txt", "1 2 3\n").unwrap();

    let output = mapmul()
        .args(["multiply", "--format", "sparse", "--skip-zeros"])
        .args(["--shape-a", "2x2", "--shape-b", "2x3"])
        .arg(&a)
        .arg(&b)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(parse_result_lines(&stdout), vec![(0, 2, 6.0)]);
}

#[test]
fn test_multiply_reads_config_file() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = write_pair(&ctx);
    let config = ctx
        .create_file(
            "mapmul.toml",
            "strategy = \"fan-out\"\ncombiner = false\nmax_parallel = 2\n",
        )
        .unwrap();

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("fan-out strategy"));
}

#[test]
fn test_multiply_rejects_unknown_config_key() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = write_pair(&ctx);
    let config = ctx.create_file("mapmul.toml", "workers = 4\n").unwrap();

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .arg("-c")
        .arg(&config)
        .assert()
        .code(2);
}

#[test]
fn test_generate_then_multiply_then_verify() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.path().join("A.txt");
    let b = ctx.path().join("B.txt");
    let c = ctx.path().join("C.txt");

    mapmul()
        .args(["generate", "--rows", "8", "--shared", "5", "--cols", "6"])
        .args(["--seed", "11", "--low", "-10", "--high", "10"])
        .arg("--out-a")
        .arg(&a)
        .arg("--out-b")
        .arg(&b)
        .assert()
        .success();

    mapmul()
        .arg("multiply")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&c)
        .assert()
        .success();

    mapmul()
        .arg("verify")
        .arg(&a)
        .arg(&b)
        .arg(&c)
        .assert()
        .success()
        .stdout(predicate::str::contains("Frobenius norm of difference: 0"))
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_generate_reference_product() {
    let ctx = TestContext::new().unwrap();
    let a = ctx.path().join("A.txt");
    let b = ctx.path().join("B.txt");
    let c = ctx.path().join("C.txt");

    mapmul()
        .args(["generate", "--rows", "3", "--shared", "4", "--cols", "2", "--seed", "5"])
        .arg("--out-a")
        .arg(&a)
        .arg("--out-b")
        .arg(&b)
        .arg("--out-c")
        .arg(&c)
        .assert()
        .success();

    let written = ctx.read_file("C.txt").unwrap();
    assert_eq!(parse_result_lines(&written).len(), 6);

    mapmul()
        .arg("verify")
        .arg(&a)
        .arg(&b)
        .arg(&c)
        .assert()
        .success();
}

#[test]
fn test_verify_detects_wrong_result() {
    let ctx = TestContext::new().unwrap();
    let (a, b) = write_pair(&ctx);
    let c = ctx
        .create_file("C.txt", "0, 0, 19\n0, 1, 22\n1, 0, 43\n1, 1, 51\n")
        .unwrap();

    mapmul()
        .arg("verify")
        .arg(&a)
        .arg(&b)
        .arg(&c)
        .assert()
        .code(9)
        .stdout(predicate::str::contains("Frobenius norm of difference: 1"));
}
