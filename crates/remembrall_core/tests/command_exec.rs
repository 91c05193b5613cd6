use remembrall_core::db::open_db_in_memory;
use remembrall_core::{
    parse_args, Command, CommandError, CommandService, Console, MemoryRepository, Outcome,
    ParseOutcome, SqliteMemoryRepository, ValidationError,
};
use rusqlite::Connection;
use std::io::{self, Write};

type TestConsole = Console<Vec<u8>, Vec<u8>>;

fn command(tokens: &[&str]) -> Command {
    match parse_args(tokens).unwrap() {
        ParseOutcome::Run(command) => command,
        other => panic!("expected a runnable command, got {other:?}"),
    }
}

/// Runs `tokens` and returns the outcome plus captured stdout.
fn exec(conn: &Connection, tokens: &[&str]) -> (Result<Outcome, CommandError>, String) {
    let service = CommandService::new(SqliteMemoryRepository::new(conn));
    let mut console: TestConsole = Console::new(Vec::new(), Vec::new());
    let outcome = service.execute(&command(tokens), &mut console);
    let (out, _) = console.into_parts();
    (outcome, String::from_utf8(out).unwrap())
}

fn rows(conn: &Connection) -> Vec<(i64, String, String, String)> {
    let mut stmt = conn
        .prepare("SELECT id, task, project, created_at FROM memories ORDER BY id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn tasks(conn: &Connection) -> Vec<String> {
    rows(conn).into_iter().map(|row| row.1).collect()
}

#[test]
fn add_then_peek_returns_the_pair() {
    let conn = open_db_in_memory().unwrap();

    let (outcome, out) = exec(&conn, &["add", "buy eggs", "-p", "errands"]);
    assert!(matches!(outcome.unwrap(), Outcome::Added { dry_run: false, .. }));
    assert!(out.contains("\"buy eggs\" was added to your memory!"));

    let (outcome, out) = exec(&conn, &["peek"]);
    assert_eq!(outcome.unwrap(), Outcome::Peeked { count: 1 });
    assert_eq!(
        out,
        "[INFO] Currently Remembering:\n[INFO]     \"buy eggs\" -- errands\n"
    );
}

#[test]
fn oversized_task_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let long_task = "x".repeat(257);

    let (outcome, _) = exec(&conn, &["add", long_task.as_str()]);
    assert!(matches!(
        outcome,
        Err(CommandError::Validation(ValidationError::FieldTooLong { field: "task", .. }))
    ));
    assert!(rows(&conn).is_empty());

    let long_project = "p".repeat(257);
    let (outcome, _) = exec(&conn, &["peek", "-p", long_project.as_str()]);
    assert!(matches!(
        outcome,
        Err(CommandError::Validation(ValidationError::FieldTooLong { field: "project", .. }))
    ));
}

#[test]
fn add_without_task_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let (outcome, _) = exec(&conn, &["add", "-v"]);
    assert!(matches!(
        outcome,
        Err(CommandError::Validation(ValidationError::MissingTask))
    ));
}

#[test]
fn peek_without_rows_reports_zero_matches() {
    let conn = open_db_in_memory().unwrap();

    let (outcome, out) = exec(&conn, &["peek", "-p", "nothing"]);
    assert_eq!(outcome.unwrap(), Outcome::Peeked { count: 0 });
    assert_eq!(out, "[INFO] Currently Remembering:\n");
}

#[test]
fn peek_all_lists_most_recent_first() {
    let conn = open_db_in_memory().unwrap();
    for task in ["one", "two", "three"] {
        exec(&conn, &["add", task]).0.unwrap();
    }

    let (outcome, out) = exec(&conn, &["peek", "--all", "--silent"]);
    assert_eq!(outcome.unwrap(), Outcome::Peeked { count: 3 });
    assert_eq!(
        out,
        "[INFO]     \"three\"\n[INFO]     \"two\"\n[INFO]     \"one\"\n"
    );
}

#[test]
fn peek_ignores_dry_run() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "note"]).0.unwrap();

    let (outcome, _) = exec(&conn, &["peek", "-n"]);
    assert_eq!(outcome.unwrap(), Outcome::Peeked { count: 1 });
    assert_eq!(tasks(&conn), vec!["note"]);
}

#[test]
fn verbose_peek_shows_query_and_date() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "dated", "-p=work"]).0.unwrap();
    let created_at = rows(&conn)[0].3.clone();

    let (_, out) = exec(&conn, &["peek", "-v", "-p", "work"]);
    assert!(out.contains("[INFO] Query: select latest memory where project = \"work\""));
    assert!(out.contains(&format!("\"dated\" -- work -- {}\n", &created_at[..10])));
}

#[test]
fn verbose_reports_matching_row_count() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "w1", "-p", "work"]).0.unwrap();
    exec(&conn, &["add", "w2", "-p", "work"]).0.unwrap();
    exec(&conn, &["add", "h1", "-p", "home"]).0.unwrap();

    let (_, out) = exec(&conn, &["peek", "-a", "-v", "-p", "work"]);
    assert!(out.contains("[INFO] 2 matching memories\n"));

    let (_, out) = exec(&conn, &["clear", "-v", "-p", "home"]);
    assert!(out.contains("[INFO] 1 matching memory\n"));

    let (_, out) = exec(&conn, &["peek", "-p", "work"]);
    assert!(!out.contains("matching"));
}

#[test]
fn verbose_dry_run_echoes_transaction_boundaries() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "stay"]).0.unwrap();

    let (_, out) = exec(&conn, &["add", "ghost", "-n", "-v"]);
    let notice = out.find("Performing dry run").unwrap();
    let begin = out.find("[INFO] Begin transaction...\n").unwrap();
    let added = out.find("\"ghost\" was added").unwrap();
    let rollback = out.find("[INFO] Rollback transaction...\n").unwrap();
    assert!(notice < begin && begin < added && added < rollback);

    let (_, out) = exec(&conn, &["clear", "-a", "-n", "-v"]);
    assert!(out.contains("[INFO] Begin transaction...\n"));
    assert!(out.ends_with("[INFO] Rollback transaction...\n"));

    let (_, out) = exec(&conn, &["clear", "-n"]);
    assert!(!out.contains("transaction"));
    assert_eq!(tasks(&conn), vec!["stay"]);
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn stored_add_succeeds_when_confirmation_cannot_be_written() {
    let conn = open_db_in_memory().unwrap();
    let service = CommandService::new(SqliteMemoryRepository::new(&conn));
    let mut console = Console::new(BrokenPipe, Vec::new());

    let outcome = service.execute(&command(&["add", "kept"]), &mut console);
    assert!(matches!(outcome.unwrap(), Outcome::Added { dry_run: false, .. }));
    assert_eq!(tasks(&conn), vec!["kept"]);
}

#[test]
fn clear_removes_only_the_most_recent_row() {
    let conn = open_db_in_memory().unwrap();
    for task in ["a", "b", "c"] {
        exec(&conn, &["add", task]).0.unwrap();
    }

    let (outcome, out) = exec(&conn, &["clear"]);
    match outcome.unwrap() {
        Outcome::Cleared { forgotten, dry_run } => {
            assert!(!dry_run);
            assert_eq!(forgotten.len(), 1);
            assert_eq!(forgotten[0].task, "c");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(out.contains("[INFO] Forgotten Memories:\n[INFO]     \"c\"\n"));
    assert_eq!(tasks(&conn), vec!["a", "b"]);
}

#[test]
fn clear_with_project_targets_latest_in_project() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "x1", "-p", "x"]).0.unwrap();
    exec(&conn, &["add", "x2", "-p", "x"]).0.unwrap();
    exec(&conn, &["add", "y1", "-p", "y"]).0.unwrap();

    exec(&conn, &["clear", "-p", "x"]).0.unwrap();
    assert_eq!(tasks(&conn), vec!["x1", "y1"]);
}

#[test]
fn clear_all_with_project_removes_exactly_that_project() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "x1", "-p", "x"]).0.unwrap();
    exec(&conn, &["add", "plain"]).0.unwrap();
    exec(&conn, &["add", "x2", "-p", "x"]).0.unwrap();

    let (outcome, _) = exec(&conn, &["clear", "--all", "--project", "x"]);
    match outcome.unwrap() {
        Outcome::Cleared { forgotten, .. } => {
            let names: Vec<_> = forgotten.iter().map(|m| m.task.as_str()).collect();
            assert_eq!(names, vec!["x2", "x1"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(tasks(&conn), vec!["plain"]);
}

#[test]
fn clear_single_with_nothing_to_forget_fails() {
    let conn = open_db_in_memory().unwrap();

    let (outcome, _) = exec(&conn, &["clear", "-p", "ghost"]);
    assert!(matches!(
        outcome,
        Err(CommandError::NothingToForget { project: Some(ref p) }) if p == "ghost"
    ));

    let (outcome, _) = exec(&conn, &["clear", "-a"]);
    assert!(matches!(
        outcome.unwrap(),
        Outcome::Cleared { ref forgotten, .. } if forgotten.is_empty()
    ));
}

#[test]
fn dry_run_leaves_rows_identical() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "keep me", "-p", "k"]).0.unwrap();
    exec(&conn, &["add", "and me"]).0.unwrap();
    let before = rows(&conn);

    let (outcome, out) = exec(&conn, &["add", "ghost", "--dry-run"]);
    assert!(matches!(outcome.unwrap(), Outcome::Added { dry_run: true, .. }));
    assert!(out.contains("Performing dry run. Memory will NOT be remembered!"));
    assert!(out.contains("\"ghost\" was added to your memory!"));
    assert_eq!(rows(&conn), before);

    let (outcome, out) = exec(&conn, &["clear", "-n"]);
    match outcome.unwrap() {
        Outcome::Cleared { forgotten, dry_run } => {
            assert!(dry_run);
            assert_eq!(forgotten[0].task, "and me");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(out.contains("Performing dry run. Memory will NOT be forgotten!"));
    assert_eq!(rows(&conn), before);

    exec(&conn, &["clear", "-a", "-n"]).0.unwrap();
    assert_eq!(rows(&conn), before);

    // A failing dry-run body is rolled back as well.
    let (outcome, _) = exec(&conn, &["clear", "-n", "-p", "missing"]);
    assert!(outcome.is_err());
    assert_eq!(rows(&conn), before);
}

#[test]
fn silent_hides_headers_and_notices_but_not_rows() {
    let conn = open_db_in_memory().unwrap();
    exec(&conn, &["add", "quiet"]).0.unwrap();

    let (_, out) = exec(&conn, &["clear", "-s", "-n"]);
    assert_eq!(out, "[INFO]     \"quiet\"\n");
}

#[test]
fn scenario_milk_and_eggs() {
    let conn = open_db_in_memory().unwrap();

    exec(&conn, &["add", "buy milk"]).0.unwrap();
    let (_, out) = exec(&conn, &["peek"]);
    assert!(out.ends_with("[INFO]     \"buy milk\"\n"));

    exec(&conn, &["add", "buy eggs", "-p", "errands"]).0.unwrap();
    let (_, out) = exec(&conn, &["peek", "--project", "errands"]);
    assert!(out.ends_with("[INFO]     \"buy eggs\" -- errands\n"));
    assert!(!out.contains("buy milk"));

    exec(&conn, &["clear", "-p", "errands"]).0.unwrap();
    let (outcome, _) = exec(&conn, &["peek", "--all", "--project", "errands"]);
    assert_eq!(outcome.unwrap(), Outcome::Peeked { count: 0 });

    let repo = SqliteMemoryRepository::new(&conn);
    assert_eq!(repo.count(None).unwrap(), 1);
}
