use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            // 参数校验失败时不会连接数据库，这里保证即使误连也会立刻失败
            cmd.env("SEMSEARCH_DB_DSN", "postgres://nobody@127.0.0.1:1/none");
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

#[test]
fn help_lists_subcommands() -> Result<()> {
    cargo_run!("semsearch", "--help")
        .success()
        .stdout(predicate::str::contains("server"))
        .stdout(predicate::str::contains("search"));
    Ok(())
}

#[test]
fn search_requires_input() -> Result<()> {
    cargo_run!("semsearch", "search")
        .failure()
        .stderr(predicate::str::contains("--text"));
    Ok(())
}

#[test]
fn search_text_conflicts_with_image() -> Result<()> {
    cargo_run!("semsearch", "search", "--text", "cat", "--image", "cat.jpg")
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[rstest]
#[case::bad_size(&["server", "--max-upload-size", "10XB"])]
#[case::limit_zero(&["server", "--result-limit", "0"])]
#[case::bad_auth(&["server", "--prometheus-auth", "no-colon"])]
#[case::bad_format(&["search", "--text", "cat", "--output-format", "xml"])]
#[case::timeout_zero(&["--query-timeout", "0", "search", "--text", "cat"])]
fn invalid_arguments(#[case] args: &[&str]) -> Result<()> {
    Command::cargo_bin("semsearch")?
        .env("SEMSEARCH_DB_DSN", "postgres://nobody@127.0.0.1:1/none")
        .args(args)
        .assert()
        .failure()
        .code(2);
    Ok(())
}

#[test]
fn unsafe_identifier_rejected_before_connecting() -> Result<()> {
    cargo_run!("semsearch", "search", "--text", "cat", "--table", "t; DROP TABLE t")
        .failure()
        .stderr(predicate::str::contains("无效的 SQL 标识符"));
    Ok(())
}
