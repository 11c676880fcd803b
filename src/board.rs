//! Board projection over a workspace's task list: search, filters, status
//! columns and optimistic status changes.
//!
//! Everything here is recomputed from the authoritative `Vec<TaskView>` on
//! each change; no incremental state is kept besides pending snapshots.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::task::{TaskPriority, TaskStatus, TaskView};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskFilters {
    pub status: Vec<TaskStatus>,
    pub priority: Vec<TaskPriority>,
    /// Assignee user ids.
    pub assignee: Vec<String>,
    /// Tag ids; a task matches when it carries any of them.
    pub tags: Vec<String>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl TaskFilters {
    pub fn active_count(&self) -> usize {
        [
            !self.status.is_empty(),
            !self.priority.is_empty(),
            !self.assignee.is_empty(),
            !self.tags.is_empty(),
            self.due_from.is_some() || self.due_to.is_some(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }

    pub fn matches(&self, view: &TaskView) -> bool {
        let task = &view.task;
        if !self.status.is_empty() && !self.status.contains(&task.status) {
            return false;
        }
        if !self.priority.is_empty()
            && (task.priority == TaskPriority::None || !self.priority.contains(&task.priority))
        {
            return false;
        }
        if !self.assignee.is_empty() {
            match &view.assignee {
                Some(member) if self.assignee.contains(&member.user_id) => {}
                _ => return false,
            }
        }
        if !self.tags.is_empty() && !view.tags.iter().any(|t| self.tags.contains(&t.id)) {
            return false;
        }
        if self.due_from.is_some() || self.due_to.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) || self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive match on title, description or any tag name.
/// A blank query matches everything.
pub fn matches_query(view: &TaskView, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    view.task.title.to_lowercase().contains(&query)
        || view
            .task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
        || view.tags.iter().any(|t| t.name.to_lowercase().contains(&query))
}

/// Search then filter, keeping the input order.
pub fn project<'a>(tasks: &'a [TaskView], query: &str, filters: &TaskFilters) -> Vec<&'a TaskView> {
    tasks
        .iter()
        .filter(|view| matches_query(view, query) && filters.matches(view))
        .collect()
}

#[derive(Debug, PartialEq)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a TaskView>,
}

pub fn columns<'a>(projected: &[&'a TaskView]) -> Vec<Column<'a>> {
    TaskStatus::ALL
        .iter()
        .map(|status| Column {
            status: *status,
            tasks: projected
                .iter()
                .copied()
                .filter(|view| view.task.status == *status)
                .collect(),
        })
        .collect()
}

/// Snapshot taken before a tentative change.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub task_id: String,
    previous: TaskView,
}

/// Authoritative task list plus tentative local edits.
#[derive(Debug, Clone, Default)]
pub struct OptimisticBoard {
    tasks: Vec<TaskView>,
}

impl OptimisticBoard {
    pub fn new(tasks: Vec<TaskView>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskView] {
        &self.tasks
    }

    /// Moves the task to `status` locally. `None` when the task is not on
    /// the board.
    pub fn begin_status_change(&mut self, task_id: &str, status: TaskStatus) -> Option<PendingChange> {
        let view = self.tasks.iter_mut().find(|v| v.task.id == task_id)?;
        let pending = PendingChange {
            task_id: task_id.to_string(),
            previous: view.clone(),
        };
        view.task.status = status;
        Some(pending)
    }

    /// Accepts the server's copy of the task.
    pub fn confirm(&mut self, pending: PendingChange, server: TaskView) {
        if let Some(view) = self.tasks.iter_mut().find(|v| v.task.id == pending.task_id) {
            *view = server;
        }
    }

    /// Restores the snapshot taken by `begin_status_change`.
    pub fn rollback(&mut self, pending: PendingChange) {
        if let Some(view) = self.tasks.iter_mut().find(|v| v.task.id == pending.task_id) {
            *view = pending.previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membership::{MemberRef, Role};
    use crate::models::tag::Tag;
    use crate::models::task::{parse_datetime, NewTask, TaskCounts};

    fn view(id: &str, title: &str, status: TaskStatus, priority: TaskPriority) -> TaskView {
        let task = NewTask {
            title: title.to_string(),
            description: None,
            status,
            priority,
            due_date: None,
            start_date: None,
            workspace_id: "org_1".into(),
            assignee_id: None,
            parent_id: None,
        }
        .into_task(id.to_string(), Utc::now());
        TaskView {
            task,
            assignee: None,
            tags: vec![],
            sub_tasks: vec![],
            attachments: vec![],
            count: TaskCounts {
                sub_tasks: 0,
                attachments: 0,
            },
        }
    }

    fn tag(id: &str, name: &str) -> Tag {
        Tag {
            id: id.into(),
            name: name.into(),
            color: "#EF4444".into(),
            workspace_id: "org_1".into(),
            created_at: Utc::now(),
        }
    }

    fn board() -> Vec<TaskView> {
        let mut report = view("t1", "Ship report", TaskStatus::Todo, TaskPriority::High);
        report.task.description = Some("Quarterly numbers".into());
        report.task.due_date = parse_datetime("2024-05-10").unwrap();
        report.assignee = Some(MemberRef {
            id: "m1".into(),
            user_id: "u1".into(),
            role: Role::Member,
        });

        let mut deploy = view("t2", "Deploy", TaskStatus::InProgress, TaskPriority::None);
        deploy.tags = vec![tag("g1", "urgent")];

        let done = view("t3", "Retro", TaskStatus::Done, TaskPriority::Low);
        vec![report, deploy, done]
    }

    fn ids(views: &[&TaskView]) -> Vec<String> {
        views.iter().map(|v| v.task.id.clone()).collect()
    }

    #[test]
    fn search_looks_at_title_description_and_tags() {
        let tasks = board();
        let none = TaskFilters::default();
        assert_eq!(ids(&project(&tasks, "QUARTERLY", &none)), vec!["t1"]);
        assert_eq!(ids(&project(&tasks, "urg", &none)), vec!["t2"]);
        assert_eq!(project(&tasks, "  ", &none).len(), 3);
    }

    #[test]
    fn priority_filter_never_matches_none() {
        let tasks = board();
        let filters = TaskFilters {
            priority: vec![TaskPriority::None, TaskPriority::High],
            ..Default::default()
        };
        assert_eq!(ids(&project(&tasks, "", &filters)), vec!["t1"]);
    }

    #[test]
    fn assignee_tag_and_date_filters() {
        let tasks = board();
        let by_assignee = TaskFilters {
            assignee: vec!["u1".into()],
            ..Default::default()
        };
        assert_eq!(ids(&project(&tasks, "", &by_assignee)), vec!["t1"]);

        let by_tag = TaskFilters {
            tags: vec!["g1".into()],
            ..Default::default()
        };
        assert_eq!(ids(&project(&tasks, "", &by_tag)), vec!["t2"]);

        let in_range = TaskFilters {
            due_from: parse_datetime("2024-05-01").unwrap(),
            due_to: parse_datetime("2024-05-10").unwrap(),
            ..Default::default()
        };
        assert_eq!(ids(&project(&tasks, "", &in_range)), vec!["t1"]);
        assert_eq!(in_range.active_count(), 1);

        let out_of_range = TaskFilters {
            due_to: parse_datetime("2024-05-09").unwrap(),
            ..Default::default()
        };
        assert!(project(&tasks, "", &out_of_range).is_empty());
    }

    #[test]
    fn columns_follow_status_order() {
        let tasks = board();
        let projected = project(&tasks, "", &TaskFilters::default());
        let cols = columns(&projected);
        let statuses: Vec<TaskStatus> = cols.iter().map(|c| c.status).collect();
        assert_eq!(statuses, TaskStatus::ALL.to_vec());
        assert_eq!(ids(&cols[1].tasks), vec!["t2"]);
    }

    #[test]
    fn rollback_restores_snapshot() {
        let mut board = OptimisticBoard::new(board());
        let pending = board.begin_status_change("t1", TaskStatus::Done).unwrap();
        assert_eq!(board.tasks()[0].task.status, TaskStatus::Done);

        board.rollback(pending);
        assert_eq!(board.tasks()[0].task.status, TaskStatus::Todo);
        assert!(board.begin_status_change("missing", TaskStatus::Done).is_none());
    }

    #[test]
    fn confirm_takes_server_copy() {
        let mut board = OptimisticBoard::new(board());
        let pending = board.begin_status_change("t2", TaskStatus::Done).unwrap();

        let mut server = board.tasks()[1].clone();
        server.task.title = "Deploy v2".into();
        board.confirm(pending, server);

        assert_eq!(board.tasks()[1].task.status, TaskStatus::Done);
        assert_eq!(board.tasks()[1].task.title, "Deploy v2");
    }
}
