//! End-to-end tests for the `cmdb` console host.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// `cmdb` running in an empty directory, so the built-in metadata is used.
fn cmdb(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("cmdb");
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--exec"))
            .stdout(predicate::str::contains("--grant"));
    }

    #[test]
    fn shows_version() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn rejects_unknown_color_mode() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--color", "sometimes", "--exec", "echo hi"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid color mode"));
    }
}

mod exec {
    use super::*;

    #[test]
    fn runs_a_leaf() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "calc add 2 3"])
            .assert()
            .success()
            .stdout("2 + 3 = 5\n");
    }

    #[test]
    fn accepts_a_leading_slash() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "/echo hello world"])
            .assert()
            .success()
            .stdout("hello world\n");
    }

    #[test]
    fn reports_parse_errors_with_usage() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "calc add x 3"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "Incorrect command: not a valid integer",
            ))
            .stdout(predicate::str::contains("Usage: calc add <a> <b>"));
    }

    #[test]
    fn suggests_close_subcommands() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "calc ad 1 2"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "no such subcommand 'ad', did you mean 'add'?",
            ));
    }

    #[test]
    fn help_hides_children_without_permission() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "calc help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--------- Help: calc "))
            .stdout(predicate::str::contains("calc add <a> <b>: Add two integers"))
            .stdout(predicate::str::contains("admin").not());

        cmdb(&dir)
            .args(["--grant", "cmdb.admin", "--exec", "calc help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("admin: Calculator administration"));
    }

    #[test]
    fn interactive_only_commands() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "whoami"])
            .assert()
            .success()
            .stdout("you are console\n");

        cmdb(&dir)
            .args(["--non-interactive", "--exec", "whoami"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "Only interactive senders can use this command",
            ));
    }

    #[test]
    fn relative_coordinates_use_the_console_location() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--exec", "tp ~ ~1 ~-2"])
            .assert()
            .success()
            .stdout("teleported console to 0 65 -2\n");
    }

    #[test]
    fn colors_on_demand() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--color", "always", "--exec", "calc nope"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("\x1b["));
    }
}

mod completion {
    use super::*;

    #[test]
    fn completes_root_and_children() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--complete", "ca"])
            .assert()
            .success()
            .stdout("calc\n");

        cmdb(&dir)
            .args(["--complete", "calc a"])
            .assert()
            .success()
            .stdout("add\n");

        cmdb(&dir)
            .args(["--grant", "*", "--complete", "calc a"])
            .assert()
            .success()
            .stdout("add\nadmin\n");
    }

    #[test]
    fn completes_after_a_leading_slash() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--complete", "/calc a"])
            .assert()
            .success()
            .stdout("add\n");

        cmdb(&dir)
            .args(["--complete", "/"])
            .assert()
            .success()
            .stdout(predicate::str::contains("calc\n"))
            .stdout(predicate::str::contains("echo\n"));
    }

    #[test]
    fn completes_member_backed_arguments() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .args(["--grant", "cmdb.admin", "--complete", "calc admin reset "])
            .assert()
            .success()
            .stdout("history\nlast\n");
    }
}

mod metadata {
    use super::*;

    #[test]
    fn metadata_file_overrides_and_declares_commands() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("commands.toml");
        std::fs::write(
            &path,
            r#"
[commands.calc]
usage = "calc <subcommand>"

[commands.calc.subcommands.add]
description = "Sum two numbers"
usage = "/calc add <x> <y>"
"#,
        )
        .expect("write metadata");

        cmdb(&dir)
            .arg("--metadata")
            .arg(&path)
            .args(["--exec", "calc help add"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Description: Sum two numbers"))
            .stdout(predicate::str::contains("Usage: /calc add <x> <y>"));

        cmdb(&dir)
            .arg("--metadata")
            .arg(&path)
            .args(["--exec", "echo hi"])
            .assert()
            .code(1)
            .stdout("unknown command 'echo'\n")
            .stderr(predicate::str::contains("was not declared"));
    }

    #[test]
    fn default_location_is_picked_up() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(".cmdb")).expect("create .cmdb");
        std::fs::write(
            dir.path().join(".cmdb").join("commands.toml"),
            "[commands.echo]\nusage = \"echo <words...>\"\n",
        )
        .expect("write metadata");

        cmdb(&dir)
            .args(["--exec", "echo still here"])
            .assert()
            .success()
            .stdout("still here\n");
        cmdb(&dir)
            .args(["--exec", "calc add 1 2"])
            .assert()
            .code(1)
            .stdout("unknown command 'calc'\n");
    }
}

mod repl {
    use super::*;

    #[test]
    fn runs_lines_until_exit() {
        let dir = TempDir::new().expect("temp dir");
        cmdb(&dir)
            .write_stdin("calc add 1 1\n\ncalc sum 4 5 6\ncalc history\nexit\necho unreachable\n")
            .assert()
            .success()
            .stdout("1 + 1 = 2\n4 + 5 + 6 = 15\n1 + 1 = 2\n4 + 5 + 6 = 15\n");
    }
}
