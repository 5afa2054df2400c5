//! Scheduling
//!
//! Projects get their status from their date range unless someone sets it by
//! hand, tasks are overdue once their due date has passed without being
//! completed, and `ScheduleSummary` rolls a project's tasks and time logs up
//! into one view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::project::{Project, ProjectStatus};
use crate::models::task::{Task, TaskStatus};
use crate::models::time_log::TimeLog;

impl ProjectStatus {
    /// Derives a status from a date range.
    ///
    /// | Range | Status |
    /// |---|---|
    /// | no start, or `today < start` | `NotStarted` |
    /// | end set and `today > end` | `Completed` |
    /// | otherwise | `InProgress` |
    ///
    /// `OnHold` is never derived.
    pub fn derive(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        match (start, end) {
            (None, _) => ProjectStatus::NotStarted,
            (Some(start), _) if today < start => ProjectStatus::NotStarted,
            (Some(_), Some(end)) if today > end => ProjectStatus::Completed,
            _ => ProjectStatus::InProgress,
        }
    }
}

impl Task {
    /// Due date in the past and not completed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < today)
    }
}

/// Task counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
        }
    }
}

/// Roll-up of a project's schedule, budget and logged time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub project_id: Uuid,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub total_tasks: usize,
    pub tasks_by_status: StatusCounts,
    pub overdue_tasks: usize,

    pub earliest_due_date: Option<NaiveDate>,
    pub latest_due_date: Option<NaiveDate>,

    pub budget: i64,
    pub allocated_budget: i64,
    pub remaining_budget: i64,

    /// Minutes across all time logs; running timers count up to `now`
    pub logged_minutes: i64,
    pub running_timers: usize,
}

impl ScheduleSummary {
    pub fn build(project: &Project, tasks: &[Task], logs: &[TimeLog], now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        let mut tasks_by_status = StatusCounts::default();
        let mut overdue_tasks = 0;
        let mut allocated_budget: i64 = 0;

        for task in tasks {
            tasks_by_status.record(task.status);
            if task.is_overdue(today) {
                overdue_tasks += 1;
            }
            allocated_budget = allocated_budget.saturating_add(task.budget);
        }

        let due_dates = tasks.iter().filter_map(|task| task.due_date);
        let earliest_due_date = due_dates.clone().min();
        let latest_due_date = due_dates.max();

        Self {
            project_id: project.id,
            status: project.status,
            start_date: project.start_date,
            end_date: project.end_date,
            total_tasks: tasks.len(),
            tasks_by_status,
            overdue_tasks,
            earliest_due_date,
            latest_due_date,
            budget: project.budget,
            allocated_budget,
            remaining_budget: project.budget - allocated_budget,
            logged_minutes: logs.iter().map(|log| log.duration_minutes(now)).sum(),
            running_timers: logs.iter().filter(|log| log.is_running()).count(),
        }
    }
}
