//! Integration tests for transcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn transcache() -> Command {
        cargo_bin_cmd!("transcache")
    }

    #[test]
    fn help_displays() {
        transcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("request-time transformation cache"));
    }

    #[test]
    fn version_displays() {
        transcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("transcache"));
    }

    #[test]
    fn config_path_respects_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        transcache()
            .args(["config", "path", "--config"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        transcache()
            .current_dir(temp.path())
            .args(["--no-local", "config", "show", "--config"])
            .arg(temp.path().join("missing.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn serve_without_root_fails() {
        let temp = TempDir::new().unwrap();
        transcache()
            .current_dir(temp.path())
            .args(["--no-local", "serve", "/foo.js", "--config"])
            .arg(temp.path().join("missing.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("No source root"));
    }
}

#[cfg(unix)]
mod serve_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Project with a source root and a shell transformer that upper-cases
    /// its input and records each invocation in calls.log
    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/vendor")).unwrap();
        fs::write(temp.path().join("src/foo.js"), "let a = 1;\n").unwrap();
        fs::write(temp.path().join("src/vendor/lib.js"), "raw vendor\n").unwrap();
        fs::write(temp.path().join("src/bad.js"), "let =\n").unwrap();
        fs::write(
            temp.path().join("transcache.toml"),
            r#"
[server]
source_root = "src"
exclude = ["vendor/**"]

[transform]
command = "sh"
args = [
  "-c",
  "printf x >> calls.log; case \"$1\" in *bad.js) echo 'SyntaxError: Unexpected token' >&2; exit 1;; esac; tr a-z A-Z < \"$1\"",
  "transform",
]
"#,
        )
        .unwrap();
        temp
    }

    fn transcache(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("transcache");
        cmd.current_dir(dir)
            .env_remove("RUST_LOG")
            .args(["--no-local", "--config", "transcache.toml"]);
        cmd
    }

    fn calls(dir: &Path) -> usize {
        fs::read_to_string(dir.join("calls.log"))
            .map(|s| s.len())
            .unwrap_or(0)
    }

    fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
        String::from_utf8_lossy(stdout)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn miss_then_hit_in_one_process() {
        let temp = project();
        let output = transcache(temp.path())
            .args(["serve", "/foo.js", "/foo.js", "--format", "json"])
            .output()
            .unwrap();

        assert!(output.status.success());
        let responses = json_lines(&output.stdout);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["headers"]["X-Transform-Cache-Hit"], "false");
        assert_eq!(responses[1]["headers"]["X-Transform-Cache-Hit"], "true");
        assert_eq!(responses[0]["body"], "LET A = 1;\n");
        assert_eq!(responses[1]["body"], responses[0]["body"]);
        assert_eq!(calls(temp.path()), 1);
    }

    #[test]
    fn excluded_path_served_raw() {
        let temp = project();
        transcache(temp.path())
            .args(["serve", "/vendor/lib.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("X-Transform-Cache: false"))
            .stdout(predicate::str::contains("raw vendor"))
            .stdout(predicate::str::contains("X-Transform-Cache-Hash").not());

        assert_eq!(calls(temp.path()), 0);
    }

    #[test]
    fn transform_error_retried() {
        let temp = project();
        let output = transcache(temp.path())
            .args(["serve", "/bad.js", "/bad.js", "--format", "json"])
            .output()
            .unwrap();

        let responses = json_lines(&output.stdout);
        assert_eq!(responses[0]["status"], 500);
        assert!(responses[0]["body"]
            .as_str()
            .unwrap()
            .contains("SyntaxError: Unexpected token"));
        assert_eq!(responses[1]["status"], 500);
        assert_eq!(calls(temp.path()), 2);
    }

    #[test]
    fn transform_error_console_script() {
        let temp = project();
        transcache(temp.path())
            .args(["--console-errors", "serve", "/bad.js"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("200 /bad.js"))
            .stdout(predicate::str::contains("console.error("));
    }

    #[test]
    fn missing_source_is_404() {
        let temp = project();
        transcache(temp.path())
            .args(["serve", "/nope.js"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("404 /nope.js"));
    }

    #[test]
    fn durable_cache_survives_restart() {
        let temp = project();

        transcache(temp.path())
            .args(["--cache", "artifacts", "serve", "/foo.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("X-Transform-Cache-Hit: false"));

        transcache(temp.path())
            .args(["--cache", "artifacts", "serve", "/foo.js"])
            .assert()
            .success()
            .stdout(predicate::str::contains("X-Transform-Cache-Hit: true"))
            .stdout(predicate::str::contains("LET A = 1;"));

        assert_eq!(calls(temp.path()), 1);
        assert_eq!(fs::read_dir(temp.path().join("artifacts")).unwrap().count(), 1);
    }

    #[test]
    fn stdin_requests() {
        let temp = project();
        let output = transcache(temp.path())
            .args(["serve", "--stdin", "--format", "json"])
            .write_stdin("/foo.js\n\n/foo.js\n")
            .output()
            .unwrap();

        let responses = json_lines(&output.stdout);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1]["headers"]["X-Transform-Cache-Hit"], "true");
    }

    #[test]
    fn cache_list_and_clear() {
        let temp = project();
        transcache(temp.path())
            .args(["--cache", "artifacts", "serve", "/foo.js"])
            .assert()
            .success();

        let listed = transcache(temp.path())
            .args(["--cache", "artifacts", "cache", "list", "--format", "plain"])
            .output()
            .unwrap();
        let fingerprints = String::from_utf8_lossy(&listed.stdout);
        assert_eq!(fingerprints.lines().count(), 1);
        assert_eq!(fingerprints.trim().len(), 32);

        transcache(temp.path())
            .args(["--cache", "artifacts", "cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 1 artifact(s)"));

        assert_eq!(fs::read_dir(temp.path().join("artifacts")).unwrap().count(), 0);
    }
}
