//! End-to-end workspace coordination tests.
//!
//! These exercise the coordinator-side and worker-side components against a
//! real temporary workspace, with results written by the test in place of a
//! live agent executor.

use std::time::Duration;

use tempfile::TempDir;

use hive::coordinator::scheduler::TaskScheduler;
use hive::core::{
    ContextEntry, ResultStatus, Task, TaskResult, TaskStatus, TeamConfig, WorkerRole,
};
use hive::store::watcher::Watcher;
use hive::store::{is_document, FileStore};

fn success(task: &Task, contribution: &str) -> TaskResult {
    TaskResult {
        task_id: task.id.clone(),
        status: ResultStatus::Success,
        output: format!("{} done", task.title),
        artifacts: vec![],
        context_contribution: contribution.to_string(),
        cost_usd: 0.01,
        duration_ms: 1200,
    }
}

/// The canonical two-wave batch: parallel investigation, then
/// implementation, then testing.
fn wave_batch() -> Vec<Task> {
    let t1 = Task::new(
        "survey auth",
        "map the auth module",
        WorkerRole::Investigator,
        "investigator-1",
        vec![],
    );
    let t2 = Task::new(
        "survey routes",
        "map the routing layer",
        WorkerRole::Investigator,
        "investigator-2",
        vec![],
    );
    let t3 = Task::new(
        "add login",
        "implement the login page",
        WorkerRole::Implementer,
        "implementer-1",
        vec![t1.id.clone(), t2.id.clone()],
    );
    let t4 = Task::new(
        "test login",
        "write tests for the login page",
        WorkerRole::Tester,
        "tester-1",
        vec![t3.id.clone()],
    );
    vec![t1, t2, t3, t4]
}

#[test]
fn dependency_waves_release_in_order() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();
    let scheduler = TaskScheduler::new(store.clone());

    let mut tasks = wave_batch();
    scheduler.write_tasks(&tasks).unwrap();

    // Wave 1: only the independent investigations are runnable
    assert_eq!(tasks[0].status, TaskStatus::Assigned);
    assert_eq!(tasks[1].status, TaskStatus::Assigned);
    assert_eq!(tasks[2].status, TaskStatus::Pending);
    assert_eq!(tasks[3].status, TaskStatus::Pending);

    // First investigation finishing releases nothing
    tasks[0].status = TaskStatus::Success;
    store.write_task(&tasks[0]).unwrap();
    let released = scheduler.resolve_dependencies(&mut tasks).unwrap();
    assert!(released.is_empty());
    assert_eq!(tasks[2].status, TaskStatus::Pending);

    // Second one releases the implementation task
    tasks[1].status = TaskStatus::Success;
    store.write_task(&tasks[1]).unwrap();
    let released = scheduler.resolve_dependencies(&mut tasks).unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].id, tasks[2].id);
    assert_eq!(tasks[2].status, TaskStatus::Assigned);
    assert_eq!(tasks[3].status, TaskStatus::Pending);

    // The release was persisted, not just held in memory
    assert_eq!(
        store.read_task(&tasks[2].id).unwrap().status,
        TaskStatus::Assigned
    );

    // Implementation finishing releases the test task
    tasks[2].status = TaskStatus::Success;
    store.write_task(&tasks[2]).unwrap();
    let released = scheduler.resolve_dependencies(&mut tasks).unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].id, tasks[3].id);

    tasks[3].status = TaskStatus::Success;
    assert!(scheduler.is_all_complete(&tasks));
}

#[test]
fn failed_dependency_still_releases_dependents() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();
    let scheduler = TaskScheduler::new(store.clone());

    let mut tasks = wave_batch();
    scheduler.write_tasks(&tasks).unwrap();

    // Both investigations fail; the implementation must still run rather
    // than wait forever
    tasks[0].status = TaskStatus::Failure;
    tasks[1].status = TaskStatus::Failure;
    store.write_task(&tasks[0]).unwrap();
    store.write_task(&tasks[1]).unwrap();

    let released = scheduler.resolve_dependencies(&mut tasks).unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(tasks[2].status, TaskStatus::Assigned);
}

#[test]
fn two_store_views_share_one_workspace() {
    // Coordinator and worker each construct their own FileStore over the
    // same working directory; documents written by one are visible to the
    // other.
    let dir = TempDir::new().unwrap();
    let coordinator_store = FileStore::new(dir.path());
    let worker_store = FileStore::new(dir.path());
    coordinator_store.init().unwrap();

    let task = Task::new(
        "survey",
        "survey the code",
        WorkerRole::Investigator,
        "investigator-1",
        vec![],
    );
    coordinator_store.write_task(&task).unwrap();

    let seen = worker_store.list_tasks().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, task.id);

    worker_store
        .update_task_status(&task.id, TaskStatus::Running)
        .unwrap();
    worker_store.write_result(&success(&task, "found it")).unwrap();
    worker_store
        .append_context_entry(ContextEntry {
            from: "investigator-1".to_string(),
            task_id: task.id.clone(),
            summary: "found it".to_string(),
        })
        .unwrap();

    assert_eq!(
        coordinator_store.read_task(&task.id).unwrap().status,
        TaskStatus::Running
    );
    assert!(coordinator_store.has_result(&task.id));
    let result = coordinator_store.read_result(&task.id).unwrap();
    assert_eq!(result.status, ResultStatus::Success);
    assert_eq!(
        coordinator_store.read_context().unwrap().entries[0].summary,
        "found it"
    );
}

#[test]
fn directives_survive_process_restart() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();

    store
        .write_directives(&["always run the linter".to_string()])
        .unwrap();

    // A fresh store over the same directory models a restarted coordinator
    let restarted = FileStore::new(dir.path());
    assert_eq!(
        restarted.read_directives().unwrap(),
        vec!["always run the linter"]
    );
}

#[test]
fn temp_files_are_never_documents() {
    assert!(is_document("task-12345678.json"));
    assert!(!is_document(".tmp-83ab12.json"));
    assert!(!is_document("notes.txt"));

    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();

    // A stalled in-flight write must be invisible to readers
    std::fs::write(
        store.tasks_dir().join(".tmp-crashed.json"),
        "{not even json",
    )
    .unwrap();
    assert!(store.list_tasks().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn watcher_reports_new_result_files() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let mut watcher = Watcher::new();
    watcher.watch(
        store.results_dir(),
        Duration::from_millis(20),
        move |name| {
            let _ = tx.send(name.to_string());
        },
    );

    // Let the baseline scan happen before the write
    tokio::time::sleep(Duration::from_millis(60)).await;

    let task = Task::new(
        "survey",
        "survey",
        WorkerRole::Investigator,
        "investigator-1",
        vec![],
    );
    store.write_result(&success(&task, "")).unwrap();

    let name = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("watcher never reported the new file")
        .expect("channel closed");
    assert_eq!(name, format!("{}.json", task.id));

    watcher.stop();
}

#[test]
fn default_team_round_trips_through_session() {
    use hive::core::{Session, SessionStatus};

    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().unwrap();

    let session = Session::new(dir.path().to_path_buf(), TeamConfig::default());
    store.write_session(&session).unwrap();

    let read = store.read_session().unwrap();
    assert_eq!(read.id, session.id);
    assert_eq!(read.status, SessionStatus::Active);
    assert_eq!(read.team.investigators, 2);
    assert_eq!(read.team.implementers, 2);
    assert_eq!(read.team.testers, 1);
}
