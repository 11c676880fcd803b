//! MySQL backend. Schema lives in `migrations/`.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{FromRow, MySql, QueryBuilder};
use uuid::Uuid;

use super::{StoreResult, TaskGraph, TaskHubStore};
use crate::error::StoreError;
use crate::models::attachment::{Attachment, NewAttachment};
use crate::models::membership::{MemberRef, MemberWithTasks, Membership, Role};
use crate::models::tag::{Tag, TagCounts, TagWithCount};
use crate::models::task::{NewTask, Task, TaskPatch, TaskView};
use crate::models::workspace::{Workspace, WorkspaceCounts, WorkspaceDetail, WorkspaceSummary};

const WORKSPACE_COLUMNS: &str = "id, name, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, workspace_id, user_id, role, created_at";
const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, start_date, \
     workspace_id, assignee_id, parent_id, created_at, updated_at";
const TAG_COLUMNS: &str = "id, name, color, workspace_id, created_at";
const ATTACHMENT_COLUMNS: &str = "id, file_name, file_url, file_size, file_type, uploaded_at, task_id";

#[derive(FromRow)]
struct MemberRow {
    id: String,
    workspace_id: String,
    user_id: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Membership {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            workspace_id: row.workspace_id,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    start_date: Option<DateTime<Utc>>,
    workspace_id: String,
    assignee_id: Option<String>,
    parent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            priority: row.priority.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            start_date: row.start_date,
            workspace_id: row.workspace_id,
            assignee_id: row.assignee_id,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TagLinkRow {
    task_id: String,
    #[sqlx(flatten)]
    tag: Tag,
}

#[derive(FromRow)]
struct TagCountRow {
    #[sqlx(flatten)]
    tag: Tag,
    task_count: i64,
}

impl From<TagCountRow> for TagWithCount {
    fn from(row: TagCountRow) -> Self {
        TagWithCount {
            tag: row.tag,
            count: TagCounts { tasks: row.task_count },
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Maps a unique-key violation to `Conflict` and a dangling foreign key to
/// `NotFound`.
fn classify(err: sqlx::Error, conflict: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(err)
}

/// `<prefix> (?, ?, ..)` bound to `ids`. Callers make sure `ids` is not empty.
fn with_id_list<'a>(prefix: &str, ids: &'a [String]) -> QueryBuilder<'a, MySql> {
    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!("{} (", prefix));
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    builder
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn members_of(&self, workspace_id: &str) -> StoreResult<Vec<Membership>> {
        let rows: Vec<MemberRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspace_members WHERE workspace_id = ? ORDER BY created_at",
            MEMBER_COLUMNS
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn tasks_of(&self, workspace_id: &str) -> StoreResult<Vec<Task>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tasks WHERE workspace_id = ? ORDER BY created_at",
            TASK_COLUMNS
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn graph(&self, workspace_id: &str) -> StoreResult<TaskGraph> {
        let tasks = self.tasks_of(workspace_id).await?;
        let members = self.members_of(workspace_id).await?;
        let tag_links: Vec<TagLinkRow> = sqlx::query_as(
            "SELECT tt.task_id, t.id, t.name, t.color, t.workspace_id, t.created_at
             FROM task_tags tt
             JOIN tags t ON t.id = tt.tag_id
             WHERE t.workspace_id = ?",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        let attachments: Vec<Attachment> = sqlx::query_as(
            "SELECT a.id, a.file_name, a.file_url, a.file_size, a.file_type, a.uploaded_at, a.task_id
             FROM attachments a
             JOIN tasks t ON t.id = a.task_id
             WHERE t.workspace_id = ?
             ORDER BY a.uploaded_at",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TaskGraph {
            tasks,
            members,
            tag_links: tag_links.into_iter().map(|r| (r.task_id, r.tag)).collect(),
            attachments,
        })
    }

    async fn counts(&self, workspace_id: &str) -> StoreResult<WorkspaceCounts> {
        let (tasks, members): (i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM tasks WHERE workspace_id = ?),
                (SELECT COUNT(*) FROM workspace_members WHERE workspace_id = ?)",
        )
        .bind(workspace_id)
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(WorkspaceCounts { tasks, members })
    }

    async fn tag_with_count(&self, id: &str) -> StoreResult<Option<TagWithCount>> {
        let row: Option<TagCountRow> = sqlx::query_as(
            "SELECT t.id, t.name, t.color, t.workspace_id, t.created_at,
                (SELECT COUNT(*) FROM task_tags tt WHERE tt.tag_id = t.id) AS task_count
             FROM tags t
             WHERE t.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TagWithCount::from))
    }
}

#[async_trait]
impl TaskHubStore for MySqlStore {
    async fn find_workspace(&self, id: &str) -> StoreResult<Option<Workspace>> {
        let workspace = sqlx::query_as(&format!("SELECT {} FROM workspaces WHERE id = ?", WORKSPACE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(workspace)
    }

    async fn get_or_create_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO workspaces (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE id = id",
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.find_workspace(id).await?.ok_or(StoreError::NotFound)
    }

    async fn create_workspace(&self, id: &str, name: &str, creator_id: &str) -> StoreResult<Workspace> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO workspaces (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, &format!("Workspace {} already exists", id)))?;

        sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new_id())
        .bind(id)
        .bind(creator_id)
        .bind(Role::Admin.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Workspace {} created with admin {}", id, creator_id);
        Ok(Workspace {
            id: id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn upsert_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO workspaces (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE name = VALUES(name), updated_at = VALUES(updated_at)",
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.find_workspace(id).await?.ok_or(StoreError::NotFound)
    }

    async fn rename_workspace(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        sqlx::query("UPDATE workspaces SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find_workspace(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete_workspace(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM workspaces WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let attachments: Vec<Attachment> = sqlx::query_as(
            "SELECT a.id, a.file_name, a.file_url, a.file_size, a.file_type, a.uploaded_at, a.task_id
             FROM attachments a
             JOIN tasks t ON t.id = a.task_id
             WHERE t.workspace_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        // children before parents; parent links are cut first so the
        // self-referencing cascade never chains
        let statements = [
            "UPDATE tasks SET parent_id = NULL WHERE workspace_id = ?",
            "DELETE tt FROM task_tags tt JOIN tasks t ON t.id = tt.task_id WHERE t.workspace_id = ?",
            "DELETE tt FROM task_tags tt JOIN tags g ON g.id = tt.tag_id WHERE g.workspace_id = ?",
            "DELETE a FROM attachments a JOIN tasks t ON t.id = a.task_id WHERE t.workspace_id = ?",
            "DELETE FROM tasks WHERE workspace_id = ?",
            "DELETE FROM tags WHERE workspace_id = ?",
            "DELETE FROM workspace_members WHERE workspace_id = ?",
            "DELETE FROM workspaces WHERE id = ?",
        ];
        for statement in statements {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Workspace {} deleted", id);
        Ok(Some(attachments))
    }

    async fn list_workspaces_for_user(&self, user_id: &str, personal_id: &str) -> StoreResult<Vec<WorkspaceSummary>> {
        let workspaces: Vec<Workspace> = sqlx::query_as(
            "SELECT w.id, w.name, w.created_at, w.updated_at
             FROM workspaces w
             WHERE w.id = ?
                OR EXISTS (SELECT 1 FROM workspace_members m WHERE m.workspace_id = w.id AND m.user_id = ?)
             ORDER BY w.created_at",
        )
        .bind(personal_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(workspaces.len());
        for workspace in workspaces {
            let members = self.members_of(&workspace.id).await?;
            let count = self.counts(&workspace.id).await?;
            summaries.push(WorkspaceSummary {
                members: members.iter().map(MemberRef::from).collect(),
                workspace,
                count,
            });
        }
        Ok(summaries)
    }

    async fn workspace_detail(&self, id: &str) -> StoreResult<Option<WorkspaceDetail>> {
        let Some(workspace) = self.find_workspace(id).await? else {
            return Ok(None);
        };
        let graph = self.graph(id).await?;
        let tags: Vec<Tag> = sqlx::query_as(&format!(
            "SELECT {} FROM tags WHERE workspace_id = ? ORDER BY name",
            TAG_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        let count = self.counts(id).await?;

        Ok(Some(WorkspaceDetail {
            workspace,
            members: graph.members.iter().map(MemberRef::from).collect(),
            tasks: graph.top_level_views(),
            tags,
            count,
        }))
    }

    async fn find_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<Option<Membership>> {
        let row: Option<MemberRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspace_members WHERE workspace_id = ? AND user_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Membership::try_from).transpose()
    }

    async fn find_membership_by_id(&self, id: &str) -> StoreResult<Option<Membership>> {
        let row: Option<MemberRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspace_members WHERE id = ?",
            MEMBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Membership::try_from).transpose()
    }

    async fn add_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership> {
        let member = Membership {
            id: new_id(),
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            role,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&member.id)
        .bind(&member.workspace_id)
        .bind(&member.user_id)
        .bind(member.role.as_str())
        .bind(member.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "User is already a member"))?;
        Ok(member)
    }

    async fn upsert_membership(&self, workspace_id: &str, user_id: &str, role: Role) -> StoreResult<Membership> {
        sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, created_at) VALUES (?, ?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE role = VALUES(role)",
        )
        .bind(new_id())
        .bind(workspace_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "User is already a member"))?;
        self.find_membership(workspace_id, user_id)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn delete_membership(&self, workspace_id: &str, user_id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM workspace_members WHERE workspace_id = ? AND user_id = ?")
            .bind(workspace_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, workspace_id: &str) -> StoreResult<Vec<MemberWithTasks>> {
        let graph = TaskGraph {
            tasks: self.tasks_of(workspace_id).await?,
            members: self.members_of(workspace_id).await?,
            tag_links: Vec::new(),
            attachments: Vec::new(),
        };
        Ok(graph.members_with_tasks())
    }

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn list_tasks(&self, workspace_id: &str) -> StoreResult<Vec<TaskView>> {
        Ok(self.graph(workspace_id).await?.top_level_views())
    }

    async fn task_view(&self, id: &str) -> StoreResult<Option<TaskView>> {
        let Some(task) = self.find_task(id).await? else {
            return Ok(None);
        };
        let graph = self.graph(&task.workspace_id).await?;
        Ok(graph.views_for(&[&task]).into_iter().next())
    }

    async fn create_task(&self, task: NewTask) -> StoreResult<Task> {
        let task = task.into_task(new_id(), Utc::now());
        sqlx::query(&format!(
            "INSERT INTO tasks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TASK_COLUMNS
        ))
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.start_date)
        .bind(&task.workspace_id)
        .bind(&task.assignee_id)
        .bind(&task.parent_id)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "Task already exists"))?;
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> StoreResult<Task> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TaskRow> = sqlx::query_as(&format!("SELECT {} FROM tasks WHERE id = ? FOR UPDATE", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut task = Task::try_from(row.ok_or(StoreError::NotFound)?)?;
        patch.apply_to(&mut task, Utc::now());

        sqlx::query(
            "UPDATE tasks
             SET title = ?, description = ?, status = ?, priority = ?, due_date = ?, start_date = ?,
                 assignee_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.start_date)
        .bind(&task.assignee_id)
        .bind(task.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "Task update conflicts with an existing row"))?;

        tx.commit().await?;
        Ok(task)
    }

    async fn set_task_tags(&self, task_id: &str, tag_ids: &[String]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        let mut seen = HashSet::new();
        for tag_id in tag_ids.iter().filter(|id| seen.insert(id.as_str())) {
            sqlx::query("INSERT INTO task_tags (task_id, tag_id) VALUES (?, ?)")
                .bind(task_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| classify(e, "Tag already attached"))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> StoreResult<Option<Vec<Attachment>>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM tasks WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let subtree: Vec<String> = sqlx::query_scalar(
            "WITH RECURSIVE subtree (id) AS (
                SELECT id FROM tasks WHERE id = ?
                UNION ALL
                SELECT t.id FROM tasks t JOIN subtree s ON t.parent_id = s.id
             )
             SELECT id FROM subtree",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let attachments: Vec<Attachment> = with_id_list(
            &format!("SELECT {} FROM attachments WHERE task_id IN", ATTACHMENT_COLUMNS),
            &subtree,
        )
        .build_query_as()
        .fetch_all(&mut *tx)
        .await?;

        // cut parent links first so deep chains do not hit InnoDB's cascade
        // depth limit; tag links and attachments still cascade one level
        with_id_list("UPDATE tasks SET parent_id = NULL WHERE id IN", &subtree)
            .build()
            .execute(&mut *tx)
            .await?;
        with_id_list("DELETE FROM tasks WHERE id IN", &subtree)
            .build()
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(attachments))
    }

    async fn find_tag(&self, id: &str) -> StoreResult<Option<Tag>> {
        let tag = sqlx::query_as(&format!("SELECT {} FROM tags WHERE id = ?", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn find_tags(&self, ids: &[String]) -> StoreResult<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let tags = with_id_list(&format!("SELECT {} FROM tags WHERE id IN", TAG_COLUMNS), ids)
            .build_query_as::<Tag>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn list_tags(&self, workspace_id: &str) -> StoreResult<Vec<TagWithCount>> {
        let rows: Vec<TagCountRow> = sqlx::query_as(
            "SELECT t.id, t.name, t.color, t.workspace_id, t.created_at,
                (SELECT COUNT(*) FROM task_tags tt WHERE tt.tag_id = t.id) AS task_count
             FROM tags t
             WHERE t.workspace_id = ?
             ORDER BY t.name",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TagWithCount::from).collect())
    }

    async fn create_tag(&self, workspace_id: &str, name: &str, color: &str) -> StoreResult<TagWithCount> {
        let tag = Tag {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            workspace_id: workspace_id.to_string(),
            created_at: Utc::now(),
        };
        // uq_tags_workspace_name turns a concurrent duplicate into a conflict
        sqlx::query(&format!("INSERT INTO tags ({}) VALUES (?, ?, ?, ?, ?)", TAG_COLUMNS))
            .bind(&tag.id)
            .bind(&tag.name)
            .bind(&tag.color)
            .bind(&tag.workspace_id)
            .bind(tag.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "Tag with this name already exists"))?;
        Ok(TagWithCount {
            tag,
            count: TagCounts { tasks: 0 },
        })
    }

    async fn update_tag(&self, id: &str, name: &str, color: &str) -> StoreResult<TagWithCount> {
        sqlx::query("UPDATE tags SET name = ?, color = ? WHERE id = ?")
            .bind(name)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "Tag with this name already exists"))?;
        self.tag_with_count(id).await?.ok_or(StoreError::NotFound)
    }

    async fn delete_tag(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_attachment(&self, attachment: NewAttachment) -> StoreResult<Attachment> {
        let row = Attachment {
            id: new_id(),
            file_name: attachment.file_name,
            file_url: attachment.file_url,
            file_size: attachment.file_size,
            file_type: attachment.file_type,
            uploaded_at: Utc::now(),
            task_id: attachment.task_id,
        };
        sqlx::query(&format!(
            "INSERT INTO attachments ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
            ATTACHMENT_COLUMNS
        ))
        .bind(&row.id)
        .bind(&row.file_name)
        .bind(&row.file_url)
        .bind(row.file_size)
        .bind(&row.file_type)
        .bind(row.uploaded_at)
        .bind(&row.task_id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "Attachment already exists"))?;
        Ok(row)
    }

    async fn find_attachment(&self, id: &str) -> StoreResult<Option<Attachment>> {
        let attachment = sqlx::query_as(&format!("SELECT {} FROM attachments WHERE id = ?", ATTACHMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attachment)
    }

    async fn find_attachment_by_url(&self, file_url: &str) -> StoreResult<Option<Attachment>> {
        let attachment = sqlx::query_as(&format!(
            "SELECT {} FROM attachments WHERE file_url = ?",
            ATTACHMENT_COLUMNS
        ))
        .bind(file_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attachment)
    }

    async fn delete_attachment(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
