// src/store/mod.rs

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::attachment::{Attachment, NewAttachment};
use crate::models::membership::{MemberRef, MemberWithTasks, Membership, Role};
use crate::models::tag::{Tag, TagWithCount};
use crate::models::task::{NewTask, SubTaskView, Task, TaskCounts, TaskPatch, TaskSummary, TaskView};
use crate::models::workspace::{Workspace, WorkspaceDetail, WorkspaceSummary};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary of the service.
///
/// Implementations own referential cleanup: deleting a workspace removes its
/// memberships, tasks, tags and attachments; deleting a task removes its
/// sub-tasks, tag links and attachments. Deletions return the attachment rows
/// they removed so the caller can drop the backing blobs.
#[async_trait]
pub trait TaskHubStore: Send + Sync {
    // Workspaces

    async fn find_workspace(&self, id: &str) -> StoreResult<Option<Workspace>>;

    /// Inserts the workspace unless a row with `id` exists, then returns the row.
    async fn get_or_create_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace>;

    /// Creates the workspace and its first ADMIN membership atomically.
    /// Fails with `Conflict` when `id` is taken.
    async fn create_workspace(&self, id: &str, name: &str, creator_id: &str) -> StoreResult<Workspace>;

    /// Creates or renames, used by provider sync.
    async fn upsert_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace>;

    async fn rename_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace>;

    /// Returns `None` when no such workspace existed.
    async fn delete_workspace(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>>;

    /// Workspaces the user belongs to, plus `personal_id` when provisioned.
    async fn list_workspaces_for_user(&self, user_id: &str, personal_id: &str) -> StoreResult<Vec<WorkspaceSummary>>;

    async fn workspace_detail(&self, id: &str) -> StoreResult<Option<WorkspaceDetail>>;

    // Memberships

    async fn find_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<Option<Membership>>;

    async fn find_membership_by_id(&self, id: &str) -> StoreResult<Option<Membership>>;

    /// Strict insert: `Conflict` when the user already belongs to the workspace.
    async fn add_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership>;

    /// Insert or role update, used by provider sync.
    async fn upsert_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership>;

    /// Returns whether a row was removed.
    async fn delete_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<bool>;

    async fn list_members(&self, workspace_id: &str) -> StoreResult<Vec<MemberWithTasks>>;

    // Tasks

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>>;

    /// Top-level tasks (`parent_id IS NULL`), newest first.
    async fn list_tasks(&self, workspace_id: &str) -> StoreResult<Vec<TaskView>>;

    async fn task_view(&self, id: &str) -> StoreResult<Option<TaskView>>;

    async fn create_task(&self, task: NewTask) -> StoreResult<Task>;

    /// Applies the patch under a row lock. `NotFound` when the task is gone.
    async fn update_task(&self, id: &str, patch: &TaskPatch) -> StoreResult<Task>;

    /// Replaces the tag set of a task.
    async fn set_task_tags(&self, task_id: &str, tag_ids: &[String]) -> StoreResult<()>;

    async fn delete_task(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>>;

    // Tags

    async fn find_tag(&self, id: &str) -> StoreResult<Option<Tag>>;

    async fn find_tags(&self, ids: &[String]) -> StoreResult<Vec<Tag>>;

    /// Alphabetical by name.
    async fn list_tags(&self, workspace_id: &str) -> StoreResult<Vec<TagWithCount>>;

    /// `Conflict` when the workspace already has a tag with this name.
    async fn create_tag(&self, workspace_id: &str, name: &str, color: &str) -> StoreResult<TagWithCount>;

    /// `Conflict` when another tag of the workspace has this name.
    async fn update_tag(&self, id: &str, name: &str, color: &str) -> StoreResult<TagWithCount>;

    async fn delete_tag(&self, id: &str) -> StoreResult<bool>;

    // Attachments

    async fn create_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment>;

    async fn find_attachment(&self, id: &str) -> StoreResult<Option<Attachment>>;

    async fn find_attachment_by_url(&self, file_url: &str) -> StoreResult<Option<Attachment>>;

    async fn delete_attachment(&self, id: &str) -> StoreResult<bool>;
}

/// Rows needed to render the task views of one workspace.
pub(crate) struct TaskGraph {
    pub tasks: Vec<Task>,
    pub members: Vec<Membership>,
    /// (task_id, tag) pairs.
    pub tag_links: Vec<(String, Tag)>,
    pub attachments: Vec<Attachment>,
}

impl TaskGraph {
    /// Builds the views of `roots` in the given order, with sub-tasks drawn
    /// from `self.tasks`.
    pub fn views_for(&self, roots: &[&Task]) -> Vec<TaskView> {
        let members: HashMap<&str, &Membership> =
            self.members.iter().map(|m| (m.id.as_str(), m)).collect();
        let assignee = |task: &Task| {
            task.assignee_id
                .as_deref()
                .and_then(|id| members.get(id))
                .map(|m| MemberRef::from(*m))
        };

        roots
            .iter()
            .map(|root| {
                let sub_tasks: Vec<SubTaskView> = self
                    .tasks
                    .iter()
                    .filter(|t| t.parent_id.as_deref() == Some(root.id.as_str()))
                    .map(|t| SubTaskView {
                        task: t.clone(),
                        assignee: assignee(t),
                    })
                    .collect();
                let mut tags: Vec<Tag> = self
                    .tag_links
                    .iter()
                    .filter(|(task_id, _)| task_id == &root.id)
                    .map(|(_, tag)| tag.clone())
                    .collect();
                tags.sort_by(|a, b| a.name.cmp(&b.name));
                let attachments: Vec<Attachment> = self
                    .attachments
                    .iter()
                    .filter(|a| a.task_id == root.id)
                    .cloned()
                    .collect();

                TaskView {
                    task: (*root).clone(),
                    assignee: assignee(root),
                    count: TaskCounts {
                        sub_tasks: sub_tasks.len() as i64,
                        attachments: attachments.len() as i64,
                    },
                    tags,
                    sub_tasks,
                    attachments,
                }
            })
            .collect()
    }

    /// Top-level views ordered by `created_at` descending.
    pub fn top_level_views(&self) -> Vec<TaskView> {
        // rows arrive oldest first; reversing keeps ties newest first after the stable sort
        let mut roots: Vec<&Task> = self
            .tasks
            .iter()
            .rev()
            .filter(|t| t.parent_id.is_none())
            .collect();
        roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.views_for(&roots)
    }

    pub fn members_with_tasks(&self) -> Vec<MemberWithTasks> {
        self.members
            .iter()
            .map(|m| {
                let assigned = self
                    .tasks
                    .iter()
                    .filter(|t| t.assignee_id.as_deref() == Some(m.id.as_str()))
                    .map(TaskSummary::from)
                    .collect();
                MemberWithTasks::new(m, assigned)
            })
            .collect()
    }
}
