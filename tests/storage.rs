use td::storage::{FileStore, KeyValueStore, TaskRepository, TASKS_KEY};
use td::task::{Priority, TaskDraft, TaskList};

#[test]
fn list_survives_reopen_through_file_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path());

    let mut list = TaskList::new(TaskRepository::new(store.clone()));
    let mut draft = TaskDraft::new("Water plants");
    draft.priority = Priority::Low;
    let first = list.add(draft)?.expect("task added");
    let second = list.add(TaskDraft::new("Pay rent"))?.expect("task added");
    list.toggle_completed(second.id)?;
    let saved = list.tasks().to_vec();

    let mut reopened = TaskList::new(TaskRepository::new(store.clone()));
    assert_eq!(reopened.tasks(), saved.as_slice());
    assert_eq!(reopened.get(first.id).map(|task| task.priority), Some(Priority::Low));
    assert_eq!(reopened.remaining(), 1);

    let raw = store.get(TASKS_KEY)?.expect("blob written");
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(value.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn store_without_blob_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut list = TaskList::new(TaskRepository::new(FileStore::new(dir.path().join("fresh"))));
    assert!(list.tasks().is_empty());
    assert_eq!(list.remaining(), 0);
    Ok(())
}
