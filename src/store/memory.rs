//! In-process store backed by a single `RwLock`.
//!
//! Every operation takes the lock once, so check-then-write sequences (tag
//! name uniqueness, membership existence) are atomic here.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreResult, TaskGraph, TaskHubStore};
use crate::error::StoreError;
use crate::models::attachment::{Attachment, NewAttachment};
use crate::models::membership::{MemberRef, MemberWithTasks, Membership, Role};
use crate::models::tag::{Tag, TagCounts, TagWithCount};
use crate::models::task::{NewTask, Task, TaskPatch, TaskView};
use crate::models::workspace::{Workspace, WorkspaceCounts, WorkspaceDetail, WorkspaceSummary};

#[derive(Default)]
struct MemoryState {
    workspaces: Vec<Workspace>,
    members: Vec<Membership>,
    tasks: Vec<Task>,
    tags: Vec<Tag>,
    /// (task_id, tag_id)
    task_tags: Vec<(String, String)>,
    attachments: Vec<Attachment>,
}

impl MemoryState {
    fn graph(&self, workspace_id: &str) -> TaskGraph {
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| t.workspace_id == workspace_id)
            .cloned()
            .collect();
        let task_ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        let tag_links = self
            .task_tags
            .iter()
            .filter(|(task_id, _)| task_ids.contains(task_id.as_str()))
            .filter_map(|(task_id, tag_id)| {
                self.tags
                    .iter()
                    .find(|tag| &tag.id == tag_id)
                    .map(|tag| (task_id.clone(), tag.clone()))
            })
            .collect();
        let attachments = self
            .attachments
            .iter()
            .filter(|a| task_ids.contains(a.task_id.as_str()))
            .cloned()
            .collect();
        TaskGraph {
            members: self.members_of(workspace_id),
            tasks,
            tag_links,
            attachments,
        }
    }

    fn members_of(&self, workspace_id: &str) -> Vec<Membership> {
        self.members
            .iter()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect()
    }

    fn counts(&self, workspace_id: &str) -> WorkspaceCounts {
        WorkspaceCounts {
            tasks: self.tasks.iter().filter(|t| t.workspace_id == workspace_id).count() as i64,
            members: self.members.iter().filter(|m| m.workspace_id == workspace_id).count() as i64,
        }
    }

    fn tag_with_count(&self, tag: &Tag) -> TagWithCount {
        TagWithCount {
            tag: tag.clone(),
            count: TagCounts {
                tasks: self.task_tags.iter().filter(|(_, tag_id)| tag_id == &tag.id).count() as i64,
            },
        }
    }

    fn name_taken(&self, workspace_id: &str, name: &str, except: Option<&str>) -> bool {
        self.tags.iter().any(|t| {
            t.workspace_id == workspace_id && t.name == name && Some(t.id.as_str()) != except
        })
    }

    /// Removes the given tasks with their tag links and attachments.
    fn remove_tasks(&mut self, ids: &HashSet<String>) -> Vec<Attachment> {
        self.task_tags.retain(|(task_id, _)| !ids.contains(task_id));
        let (removed, kept): (Vec<Attachment>, Vec<Attachment>) = self
            .attachments
            .drain(..)
            .partition(|a| ids.contains(&a.task_id));
        self.attachments = kept;
        self.tasks.retain(|t| !ids.contains(&t.id));
        removed
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl TaskHubStore for MemoryStore {
    async fn find_workspace(&self, id: &str) -> StoreResult<Option<Workspace>> {
        let state = self.state.read().await;
        Ok(state.workspaces.iter().find(|w| w.id == id).cloned())
    }

    async fn get_or_create_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.workspaces.iter().find(|w| w.id == id) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let workspace = Workspace {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn create_workspace(&self, id: &str, name: &str, creator_id: &str) -> StoreResult<Workspace> {
        let mut state = self.state.write().await;
        if state.workspaces.iter().any(|w| w.id == id) {
            return Err(StoreError::Conflict(format!("Workspace {} already exists", id)));
        }
        let now = Utc::now();
        let workspace = Workspace {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.workspaces.push(workspace.clone());
        state.members.push(Membership {
            id: new_id(),
            workspace_id: id.to_string(),
            user_id: creator_id.to_string(),
            role: Role::Admin,
            created_at: now,
        });
        Ok(workspace)
    }

    async fn upsert_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        if let Some(existing) = state.workspaces.iter_mut().find(|w| w.id == id) {
            existing.name = name.to_string();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let workspace = Workspace {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn rename_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        let mut state = self.state.write().await;
        let workspace = state
            .workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or(StoreError::NotFound)?;
        workspace.name = name.to_string();
        workspace.updated_at = Utc::now();
        Ok(workspace.clone())
    }

    async fn delete_workspace(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>> {
        let mut state = self.state.write().await;
        let before = state.workspaces.len();
        state.workspaces.retain(|w| w.id != id);
        if state.workspaces.len() == before {
            return Ok(None);
        }
        let task_ids: HashSet<String> = state
            .tasks
            .iter()
            .filter(|t| t.workspace_id == id)
            .map(|t| t.id.clone())
            .collect();
        state.members.retain(|m| m.workspace_id != id);
        let removed = state.remove_tasks(&task_ids);
        let tag_ids: HashSet<String> = state
            .tags
            .iter()
            .filter(|t| t.workspace_id == id)
            .map(|t| t.id.clone())
            .collect();
        state.task_tags.retain(|(_, tag_id)| !tag_ids.contains(tag_id));
        state.tags.retain(|t| t.workspace_id != id);
        Ok(Some(removed))
    }

    async fn list_workspaces_for_user(&self, user_id: &str, personal_id: &str) -> StoreResult<Vec<WorkspaceSummary>> {
        let state = self.state.read().await;
        let summaries = state
            .workspaces
            .iter()
            .filter(|w| {
                w.id == personal_id
                    || state
                        .members
                        .iter()
                        .any(|m| m.workspace_id == w.id && m.user_id == user_id)
            })
            .map(|w| WorkspaceSummary {
                workspace: w.clone(),
                members: state.members_of(&w.id).iter().map(MemberRef::from).collect(),
                count: state.counts(&w.id),
            })
            .collect();
        Ok(summaries)
    }

    async fn workspace_detail(&self, id: &str) -> StoreResult<Option<WorkspaceDetail>> {
        let state = self.state.read().await;
        let Some(workspace) = state.workspaces.iter().find(|w| w.id == id) else {
            return Ok(None);
        };
        let graph = state.graph(id);
        let mut tags: Vec<Tag> = state.tags.iter().filter(|t| t.workspace_id == id).cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(WorkspaceDetail {
            workspace: workspace.clone(),
            members: graph.members.iter().map(MemberRef::from).collect(),
            tasks: graph.top_level_views(),
            tags,
            count: state.counts(id),
        }))
    }

    async fn find_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<Option<Membership>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .iter()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_membership_by_id(&self, id: &str) -> StoreResult<Option<Membership>> {
        let state = self.state.read().await;
        Ok(state.members.iter().find(|m| m.id == id).cloned())
    }

    async fn add_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership> {
        let mut state = self.state.write().await;
        if !state.workspaces.iter().any(|w| w.id == workspace_id) {
            return Err(StoreError::NotFound);
        }
        if state
            .members
            .iter()
            .any(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        {
            return Err(StoreError::Conflict("User is already a member".to_string()));
        }
        let member = Membership {
            id: new_id(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role,
            created_at: Utc::now(),
        };
        state.members.push(member.clone());
        Ok(member)
    }

    async fn upsert_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership> {
        let mut state = self.state.write().await;
        if !state.workspaces.iter().any(|w| w.id == workspace_id) {
            return Err(StoreError::NotFound);
        }
        if let Some(existing) = state
            .members
            .iter_mut()
            .find(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        {
            existing.role = role;
            return Ok(existing.clone());
        }
        let member = Membership {
            id: new_id(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role,
            created_at: Utc::now(),
        };
        state.members.push(member.clone());
        Ok(member)
    }

    async fn delete_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(pos) = state
            .members
            .iter()
            .position(|m| m.workspace_id == workspace_id && m.user_id == user_id)
        else {
            return Ok(false);
        };
        let removed = state.members.remove(pos);
        for task in state.tasks.iter_mut() {
            if task.assignee_id.as_deref() == Some(removed.id.as_str()) {
                task.assignee_id = None;
            }
        }
        Ok(true)
    }

    async fn list_members(&self, workspace_id: &str) -> StoreResult<Vec<MemberWithTasks>> {
        let state = self.state.read().await;
        Ok(state.graph(workspace_id).members_with_tasks())
    }

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks(&self, workspace_id: &str) -> StoreResult<Vec<TaskView>> {
        let state = self.state.read().await;
        Ok(state.graph(workspace_id).top_level_views())
    }

    async fn task_view(&self, id: &str) -> StoreResult<Option<TaskView>> {
        let state = self.state.read().await;
        let Some(task) = state.tasks.iter().find(|t| t.id == id) else {
            return Ok(None);
        };
        let graph = state.graph(&task.workspace_id);
        Ok(graph.views_for(&[task]).into_iter().next())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        if !state.workspaces.iter().any(|w| w.id == task.workspace_id) {
            return Err(StoreError::NotFound);
        }
        let task = task.into_task(new_id(), Utc::now());
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        patch.apply_to(task, Utc::now());
        Ok(task.clone())
    }

    async fn set_task_tags(&self, task_id: &str, tag_ids: &[String]) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.task_tags.retain(|(t, _)| t != task_id);
        let mut seen = HashSet::new();
        for tag_id in tag_ids {
            if seen.insert(tag_id.as_str()) {
                state.task_tags.push((task_id.to_string(), tag_id.clone()));
            }
        }
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>> {
        let mut state = self.state.write().await;
        if !state.tasks.iter().any(|t| t.id == id) {
            return Ok(None);
        }
        let mut subtree: HashSet<String> = HashSet::from([id.to_string()]);
        loop {
            let next: Vec<String> = state
                .tasks
                .iter()
                .filter(|t| {
                    t.parent_id.as_ref().is_some_and(|p| subtree.contains(p)) && !subtree.contains(&t.id)
                })
                .map(|t| t.id.clone())
                .collect();
            if next.is_empty() {
                break;
            }
            subtree.extend(next);
        }
        Ok(Some(state.remove_tasks(&subtree)))
    }

    async fn find_tag(&self, id: &str) -> StoreResult<Option<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn find_tags(&self, ids: &[String]) -> StoreResult<Vec<Tag>> {
        let state = self.state.read().await;
        Ok(state.tags.iter().filter(|t| ids.contains(&t.id)).cloned().collect())
    }

    async fn list_tags(&self, workspace_id: &str) -> StoreResult<Vec<TagWithCount>> {
        let state = self.state.read().await;
        let mut tags: Vec<TagWithCount> = state
            .tags
            .iter()
            .filter(|t| t.workspace_id == workspace_id)
            .map(|t| state.tag_with_count(t))
            .collect();
        tags.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(tags)
    }

    async fn create_tag(&self, workspace_id: &str, name: &str, color: &str) -> StoreResult<TagWithCount> {
        let mut state = self.state.write().await;
        if state.name_taken(workspace_id, name, None) {
            return Err(StoreError::Conflict("Tag with this name already exists".to_string()));
        }
        let tag = Tag {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            workspace_id: workspace_id.to_string(),
            created_at: Utc::now(),
        };
        state.tags.push(tag.clone());
        Ok(state.tag_with_count(&tag))
    }

    async fn update_tag(&self, id: &str, name: &str, color: &str) -> StoreResult<TagWithCount> {
        let mut state = self.state.write().await;
        let workspace_id = state
            .tags
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.workspace_id.clone())
            .ok_or(StoreError::NotFound)?;
        if state.name_taken(&workspace_id, name, Some(id)) {
            return Err(StoreError::Conflict("Tag with this name already exists".to_string()));
        }
        let tag = state
            .tags
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound)?;
        tag.name = name.to_string();
        tag.color = color.to_string();
        let tag = tag.clone();
        Ok(state.tag_with_count(&tag))
    }

    async fn delete_tag(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.tags.len();
        state.tags.retain(|t| t.id != id);
        state.task_tags.retain(|(_, tag_id)| tag_id != id);
        Ok(state.tags.len() != before)
    }

    async fn create_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment> {
        let mut state = self.state.write().await;
        if !state.tasks.iter().any(|t| t.id == attachment.task_id) {
            return Err(StoreError::NotFound);
        }
        let row = Attachment {
            id: new_id(),
            file_name: attachment.file_name,
            file_url: attachment.file_url,
            file_size: attachment.file_size,
            file_type: attachment.file_type,
            uploaded_at: Utc::now(),
            task_id: attachment.task_id,
        };
        state.attachments.push(row.clone());
        Ok(row)
    }

    async fn find_attachment(&self, id: &str) -> StoreResult<Option<Attachment>> {
        let state = self.state.read().await;
        Ok(state.attachments.iter().find(|a| a.id == id).cloned())
    }

    async fn find_attachment_by_url(&self, file_url: &str) -> StoreResult<Option<Attachment>> {
        let state = self.state.read().await;
        Ok(state.attachments.iter().find(|a| a.file_url == file_url).cloned())
    }

    async fn delete_attachment(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.attachments.len();
        state.attachments.retain(|a| a.id != id);
        Ok(state.attachments.len() != before)
    }
}
