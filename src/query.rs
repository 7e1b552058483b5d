//! Pure derivations over task sequences: ordering, filtering, statistics.
//!
//! Nothing here mutates its input; every function returns a fresh value.

use std::cmp::Ordering;

use crate::models::{Priority, Task, TaskFilter, TaskStats, TaskStatus};

/// Numeric urgency used as a sort key (`Urgent = 4` .. `Low = 1`).
pub const fn priority_weight(priority: Priority) -> u8 {
    match priority {
        Priority::Urgent => 4,
        Priority::High => 3,
        Priority::Medium => 2,
        Priority::Low => 1,
    }
}

/// In-progress first, then pending, completed last.
const fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::InProgress => 0,
        TaskStatus::Pending => 1,
        TaskStatus::Completed => 2,
    }
}

/// Most-important-first ordering: status bucket, then priority (descending),
/// then creation time (newest first).
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| priority_weight(b.priority).cmp(&priority_weight(a.priority)))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sorted copy of `tasks`; the input is left untouched.
pub fn sort_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(compare_tasks);
    sorted
}

/// Whether `task` satisfies every present constraint of `filter`.
pub fn matches_filter(task: &Task, filter: &TaskFilter) -> bool {
    if let Some(statuses) = filter.status.as_deref()
        && !statuses.is_empty()
        && !statuses.contains(&task.status)
    {
        return false;
    }

    if let Some(priorities) = filter.priority.as_deref()
        && !priorities.is_empty()
        && !priorities.contains(&task.priority)
    {
        return false;
    }

    // Tasks without a due date are never excluded by a date range.
    if let Some(range) = &filter.date_range {
        let in_range = match task.due_date {
            Some(due) => range.contains(due),
            None => true,
        };
        if !in_range {
            return false;
        }
    }

    if let Some(tags) = filter.tags.as_deref()
        && !tags.is_empty()
        && !tags.iter().any(|tag| task.tags.contains(tag))
    {
        return false;
    }

    if let Some(query) = filter.search_query.as_deref()
        && !query.is_empty()
    {
        let query = query.to_lowercase();
        let title = task.title.to_lowercase();
        let description = task.description.as_deref().unwrap_or_default().to_lowercase();
        if !title.contains(&query) && !description.contains(&query) {
            return false;
        }
    }

    true
}

/// Tasks satisfying `filter`, in input order.
pub fn filter_tasks(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches_filter(task, filter))
        .cloned()
        .collect()
}

/// Counts per status and priority plus the rounded completion percentage.
pub fn compute_stats(tasks: &[Task]) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..TaskStats::default()
    };

    for task in tasks {
        match task.status {
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Pending => stats.pending += 1,
        }
        stats.by_priority[task.priority] += 1;
    }

    stats.completion_rate = completion_rate(stats.completed, stats.total);
    stats
}

/// `round(100 * completed / total)` with halves rounded up, 0 for no tasks.
fn completion_rate(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rate = (200 * completed + total) / (2 * total);
    u32::try_from(rate).unwrap_or(100)
}
