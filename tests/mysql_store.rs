//! Runs against a real MySQL when `TEST_DATABASE_URL` is set, skipped otherwise.

use taskhub_backend::models::task::NewTask;
use taskhub_backend::store::{MySqlStore, TaskHubStore};
use uuid::Uuid;

async fn connect() -> Option<MySqlStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let store = MySqlStore::connect(&url, 2).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

fn new_task(workspace_id: &str, title: String, parent_id: Option<String>) -> NewTask {
    NewTask {
        title,
        description: None,
        status: Default::default(),
        priority: Default::default(),
        due_date: None,
        start_date: None,
        workspace_id: workspace_id.to_string(),
        assignee_id: None,
        parent_id,
    }
}

/// Root id and deepest id of a `depth`-level sub-task chain.
async fn chain(store: &MySqlStore, workspace_id: &str, depth: usize) -> (String, String) {
    let root = store
        .create_task(new_task(workspace_id, "level 0".into(), None))
        .await
        .unwrap();
    let mut parent = root.id.clone();
    for level in 1..=depth {
        let task = store
            .create_task(new_task(workspace_id, format!("level {}", level), Some(parent)))
            .await
            .unwrap();
        parent = task.id;
    }
    (root.id, parent)
}

#[tokio::test]
async fn deleting_a_deep_task_chain() {
    let Some(store) = connect().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let workspace_id = format!("org_{}", Uuid::new_v4());
    store.create_workspace(&workspace_id, "Deep", "u1").await.unwrap();
    let (root, deepest) = chain(&store, &workspace_id, 20).await;

    assert!(store.delete_task(&root).await.unwrap().is_some());
    assert!(store.find_task(&deepest).await.unwrap().is_none());
    assert!(store.list_tasks(&workspace_id).await.unwrap().is_empty());

    store.delete_workspace(&workspace_id).await.unwrap();
}

#[tokio::test]
async fn deleting_a_workspace_with_a_deep_task_chain() {
    let Some(store) = connect().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let workspace_id = format!("org_{}", Uuid::new_v4());
    store.create_workspace(&workspace_id, "Deep", "u1").await.unwrap();
    let (_, deepest) = chain(&store, &workspace_id, 20).await;

    assert!(store.delete_workspace(&workspace_id).await.unwrap().is_some());
    assert!(store.find_task(&deepest).await.unwrap().is_none());
    assert!(store.find_workspace(&workspace_id).await.unwrap().is_none());
}
