use super::*;
use crate::cli::{
    CheckArgs, DefinitionKind, ListKind, LsArgs, OutputFormat, RunArgs, SandboxCommand,
    SandboxResetArgs, StxArgs,
};
use crate::test_support::{TestRuntime, write_file};
use tempfile::TempDir;

const WORKER_W1: &str = "worker w1 {\n  allow fs.open;\n  allow fs.create;\n}\n";
const AGENT_ALPHA: &str = "agent alpha {\n  use worker w1 count = 2;\n}\n";
const TASK_HELLO: &str = r#"@access { agents: [alpha] }
task hello {
  fs.open "sandbox/input.txt";
}
"#;

struct Captured {
    out: Vec<u8>,
    err: Vec<u8>,
}

impl Captured {
    fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}

/// Run `command` against `session`, capturing both streams.
fn run(session: &mut Session, command: Command) -> (Result<()>, Captured) {
    let mut captured = Captured {
        out: Vec::new(),
        err: Vec::new(),
    };
    let result = run_command(session, command, &mut captured.out, &mut captured.err);
    (result, captured)
}

/// A session whose runtime has the standard worker/agent/task loaded.
fn loaded_session() -> (TempDir, Session) {
    let test = TestRuntime::with_defs(&[
        ("w1.psyw", WORKER_W1),
        ("alpha.psya", AGENT_ALPHA),
        ("hello.psy", TASK_HELLO),
    ]);
    (
        test.temp_dir,
        Session {
            runtime: test.runtime,
        },
    )
}

fn empty_session() -> (TempDir, Session) {
    let test = TestRuntime::new();
    (
        test.temp_dir,
        Session {
            runtime: test.runtime,
        },
    )
}

#[test]
fn test_check_directory_reports_files_in_load_order() {
    let (temp, mut session) = empty_session();
    let defs = temp.path().join("defs");
    write_file(&defs, "hello.psy", TASK_HELLO);
    write_file(&defs, "alpha.psya", AGENT_ALPHA);
    write_file(&defs, "w1.psyw", WORKER_W1);

    let (result, captured) = run(
        &mut session,
        Command::Check(CheckArgs {
            paths: vec![defs.clone()],
        }),
    );

    result.unwrap();
    let expected = format!(
        "loaded: {}\nloaded: {}\nloaded: {}\n",
        defs.join("w1.psyw").display(),
        defs.join("alpha.psya").display(),
        defs.join("hello.psy").display()
    );
    assert_eq!(captured.stdout(), expected);
}

#[test]
fn test_check_stops_at_rejected_file() {
    let (temp, mut session) = empty_session();
    let good = write_file(temp.path(), "w1.psyw", WORKER_W1);
    let bad = write_file(temp.path(), "bad.psya", "agent bad { use worker ghost count = 1; }");
    let never = write_file(temp.path(), "hello.psy", TASK_HELLO);

    let (result, captured) = run(
        &mut session,
        Command::Check(CheckArgs {
            paths: vec![good.clone(), bad, never],
        }),
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind_name(), "ReferenceError");
    assert_eq!(captured.stdout(), format!("loaded: {}\n", good.display()));
    assert!(session.runtime.registries().task("hello").is_none());
}

#[test]
fn test_ls_lists_each_kind() {
    let (_temp, mut session) = loaded_session();

    let (result, captured) = run(
        &mut session,
        Command::Ls(LsArgs {
            kind: ListKind::Workers,
        }),
    );
    result.unwrap();
    assert_eq!(
        captured.stdout(),
        "name | type   | capabilities\n-----+--------+-------------\nw1   | worker | 2\n"
    );

    let (result, captured) = run(
        &mut session,
        Command::Ls(LsArgs {
            kind: ListKind::Agents,
        }),
    );
    result.unwrap();
    assert!(captured.stdout().contains("worker_instances"));
    assert!(captured.stdout().contains("alpha | agent | 2"));

    let (result, captured) = run(
        &mut session,
        Command::Ls(LsArgs {
            kind: ListKind::Tasks,
        }),
    );
    result.unwrap();
    assert!(captured.stdout().contains("hello | task | 1"));
}

#[test]
fn test_ls_empty_registry() {
    let (_temp, mut session) = empty_session();
    let (result, captured) = run(
        &mut session,
        Command::Ls(LsArgs {
            kind: ListKind::Tasks,
        }),
    );
    result.unwrap();
    assert_eq!(captured.stdout(), "(empty)\n");
}

#[test]
fn test_stx_json_serializes_definition() {
    let (_temp, mut session) = loaded_session();
    let (result, captured) = run(
        &mut session,
        Command::Stx(StxArgs {
            kind: DefinitionKind::Agent,
            name: "alpha".into(),
            output: OutputFormat::Json,
        }),
    );
    result.unwrap();

    let value: serde_json::Value = serde_json::from_str(&captured.stdout()).unwrap();
    assert_eq!(value["name"], "alpha");
    assert_eq!(value["uses"][0]["worker_name"], "w1");
    assert_eq!(value["uses"][0]["count"], 2);
}

#[test]
fn test_stx_table_lists_fields() {
    let (_temp, mut session) = loaded_session();
    let (result, captured) = run(
        &mut session,
        Command::Stx(StxArgs {
            kind: DefinitionKind::Worker,
            name: "w1".into(),
            output: OutputFormat::Table,
        }),
    );
    result.unwrap();

    let stdout = captured.stdout();
    assert!(stdout.starts_with("field"));
    assert!(stdout.lines().any(|l| l.starts_with("name") && l.ends_with("w1")));
    assert!(stdout.lines().any(|l| l.starts_with("cwd") && l.ends_with("null")));
}

#[test]
fn test_stx_unknown_name_is_error() {
    let (_temp, mut session) = loaded_session();
    let (result, captured) = run(
        &mut session,
        Command::Stx(StxArgs {
            kind: DefinitionKind::Task,
            name: "ghost".into(),
            output: OutputFormat::Table,
        }),
    );
    let err = result.unwrap_err();
    assert_eq!(err.message(), "Unknown task 'ghost'");
    assert_eq!(err.exit_code(), crate::exit_codes::GENERAL_ERROR);
    assert!(captured.stdout().is_empty());
}

#[test]
fn test_run_prints_output_then_status_line() {
    let (_temp, mut session) = loaded_session();
    let input = session.runtime.sandbox().root().join("sandbox/input.txt");
    write_file(input.parent().unwrap(), "input.txt", "hi there\n");

    let (result, captured) = run(
        &mut session,
        Command::Run(RunArgs {
            agent: "alpha".into(),
            task: "hello".into(),
        }),
    );

    result.unwrap();
    assert_eq!(
        captured.stdout(),
        "hi there\nstatus=0 agent=alpha worker=w1 task=hello\n"
    );
    assert!(captured.stderr().is_empty());
}

#[test]
fn test_run_denied_prints_nothing() {
    let (temp, mut session) = loaded_session();
    let path = write_file(
        &temp.path().join("defs"),
        "locked.psy",
        "@access { agents: [someone_else] }\ntask locked { fs.open \"a.txt\"; }\n",
    );
    session.runtime.load_file(&path).unwrap();

    let (result, captured) = run(
        &mut session,
        Command::Run(RunArgs {
            agent: "alpha".into(),
            task: "locked".into(),
        }),
    );

    let err = result.unwrap_err();
    assert_eq!(err.kind_name(), "AccessError");
    assert!(captured.stdout().is_empty());
}

#[test]
fn test_sandbox_reset_reports_cleared_directories() {
    let (_temp, mut session) = empty_session();
    let sandbox = session.runtime.sandbox().clone();
    sandbox.ensure_layout().unwrap();
    write_file(&sandbox.workspace(), "scratch.txt", "x");
    write_file(&sandbox.logs(), "keep.txt", "x");

    let (result, captured) = run(
        &mut session,
        Command::Sandbox(SandboxCommand {
            action: SandboxAction::Reset(SandboxResetArgs { logs: false }),
        }),
    );

    result.unwrap();
    assert_eq!(captured.stdout(), "sandbox reset: workspace and tmp cleared\n");
    assert!(!sandbox.workspace().join("scratch.txt").exists());
    assert!(sandbox.logs().join("keep.txt").exists());

    let (result, captured) = run(
        &mut session,
        Command::Sandbox(SandboxCommand {
            action: SandboxAction::Reset(SandboxResetArgs { logs: true }),
        }),
    );
    result.unwrap();
    assert_eq!(
        captured.stdout(),
        "sandbox reset: workspace, tmp, and logs cleared\n"
    );
    assert!(!sandbox.logs().join("keep.txt").exists());
}

#[test]
fn test_session_open_loads_defs_in_order() {
    let temp = TempDir::new().unwrap();
    let defs = temp.path().join("defs");
    write_file(&defs, "w1.psyw", WORKER_W1);
    write_file(&defs, "alpha.psya", AGENT_ALPHA);
    let task = write_file(temp.path(), "hello.psy", TASK_HELLO);
    let config = write_file(temp.path(), "psyker.yaml", "shell:\n  cmd: \"cmd /c\"\n");

    let global = GlobalArgs {
        sandbox: Some(temp.path().join("box")),
        config: Some(config),
        defs: vec![defs, task],
        verbose: false,
    };
    let session = Session::open(&global).unwrap();

    assert_eq!(
        session.runtime.sandbox().root(),
        crate::sandbox::normalize_lexically(&temp.path().join("box"))
    );
    let registries = session.runtime.registries();
    assert!(registries.worker("w1").is_some());
    assert!(registries.agent("alpha").is_some());
    assert!(registries.task("hello").is_some());
}

#[test]
fn test_session_open_propagates_load_failure() {
    let temp = TempDir::new().unwrap();
    let bad = write_file(temp.path(), "bad.psy", "task broken {");
    let config = write_file(temp.path(), "psyker.yaml", "");

    let global = GlobalArgs {
        sandbox: Some(temp.path().join("box")),
        config: Some(config),
        defs: vec![bad],
        verbose: false,
    };
    let err = Session::open(&global).unwrap_err();
    assert_eq!(err.kind_name(), "SyntaxError");
    assert_eq!(err.exit_code(), crate::exit_codes::SYNTAX_FAILURE);
}
