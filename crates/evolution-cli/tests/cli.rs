use assert_cmd::Command;
use tempfile::TempDir;

fn cli(workspace: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("evolution").unwrap();
    cmd.env("EVOLUTION_WORKSPACE", workspace);
    cmd
}

#[test]
fn status_on_a_fresh_workspace_succeeds() {
    let workspace = TempDir::new().unwrap();

    cli(workspace.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicates::str::contains("scheduler:"));
}

#[test]
fn apply_with_an_unknown_proposal_id_fails_with_invalid_argument_exit_code() {
    let workspace = TempDir::new().unwrap();

    cli(workspace.path()).arg("apply").arg("not-a-valid-id").assert().code(2);
}

#[test]
fn apply_with_a_well_formed_but_unrecognized_id_fails_with_exit_code_two() {
    let workspace = TempDir::new().unwrap();
    let id = format!("proposal-{}", uuid::Uuid::new_v4());

    cli(workspace.path()).arg("apply").arg(&id).assert().code(2);
}

#[test]
fn rollback_of_an_unknown_application_id_fails_with_exit_code_two() {
    let workspace = TempDir::new().unwrap();
    let id = format!("application-{}", uuid::Uuid::new_v4());

    cli(workspace.path()).arg("rollback").arg(&id).arg("--auto").assert().code(2);
}

#[test]
fn open_on_a_fresh_workspace_reports_no_backup() {
    let workspace = TempDir::new().unwrap();

    cli(workspace.path())
        .arg("open")
        .assert()
        .success()
        .stdout(predicates::str::contains("latest backup"));
}

#[test]
fn stop_without_a_running_process_fails_with_recoverable_exit_code() {
    let workspace = TempDir::new().unwrap();

    cli(workspace.path()).arg("stop").assert().code(1);
}
