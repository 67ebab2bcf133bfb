mod support;

use predicates::str::contains;

#[test]
fn td_help_works() {
    support::td_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("local to-do list"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = ["add", "list", "toggle", "rm", "clear", "split"];

    for cmd in subcommands {
        support::td_cmd()
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn list_on_empty_store_succeeds() {
    let home = support::TestHome::new();
    home.td()
        .arg("list")
        .assert()
        .success()
        .stdout(contains("0 task(s)"))
        .stdout(contains("td add <title>"));
}
