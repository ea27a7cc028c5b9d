#![forbid(unsafe_code)]

use std::fmt::Write as _;

use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::output::table::{Table, truncate};
use crate::task::model::{Task, TaskStatus, format_date};
use crate::task::policy;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

#[derive(Debug, Clone, Copy, Default)]
pub struct RowStyle {
    pub icons: bool,
    pub verbose: bool,
    pub show_dates: bool,
}

#[must_use]
pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "○",
        TaskStatus::Doing => "●",
        TaskStatus::Done => "✓",
    }
}

/// `2024-06-01 (in 3d)`, `(today)`, `(2d overdue)`, or `-` without deadline.
#[must_use]
pub fn deadline_label(task: &Task, now: OffsetDateTime) -> String {
    let Some(deadline) = task.deadline else {
        return "-".to_owned();
    };
    let left = policy::days_left(deadline, now);
    let rel = match left {
        0 => "today".to_owned(),
        1 => "tomorrow".to_owned(),
        n if n < 0 => format!("{}d overdue", -n),
        n => format!("in {n}d"),
    };
    format!("{} ({rel})", format_date(deadline))
}

#[must_use]
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.to_offset(time::UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| ts.to_string())
}

#[must_use]
pub fn task_table(tasks: &[&Task], now: OffsetDateTime, style: RowStyle) -> Table {
    let mut headers = vec!["ID", "STATUS", "PRI", "DEADLINE", "TITLE"];
    if style.verbose {
        headers.extend(["SCORE", "DESCRIPTION"]);
    }
    if style.show_dates {
        headers.extend(["CREATED", "UPDATED"]);
    }

    let mut t = Table::new(headers);
    for task in tasks {
        let status = if style.icons {
            format!("{} {}", status_icon(task.status), task.status)
        } else {
            task.status.to_string()
        };
        let mut row = vec![
            task.id.to_string(),
            status,
            task.priority.to_string(),
            deadline_label(task, now),
            truncate(&task.title, 50),
        ];
        if style.verbose {
            row.push(policy::score(task, now).to_string());
            row.push(if task.description.is_empty() {
                "-".to_owned()
            } else {
                truncate(&task.description, 60)
            });
        }
        if style.show_dates {
            row.push(format_timestamp(task.created_at));
            row.push(format_timestamp(task.updated_at));
        }
        t.row(row);
    }
    t
}

/// Multi-line description of one task, used by `show` and the board.
#[must_use]
pub fn task_details(task: &Task, now: OffsetDateTime) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Task: {} (ID: {})", task.title, task.id);
    let _ = writeln!(out, "Status: {}", task.status);
    let _ = writeln!(
        out,
        "Priority: {} ({})",
        task.priority,
        task.priority.label()
    );
    let _ = writeln!(out, "Deadline: {}", deadline_label(task, now));
    let _ = writeln!(out, "Score: {}", policy::score(task, now));
    let _ = writeln!(
        out,
        "Urgent: {}",
        if policy::is_urgent(task, now) { "yes" } else { "no" }
    );
    let _ = writeln!(out, "Created: {}", format_timestamp(task.created_at));
    let _ = writeln!(out, "Updated: {}", format_timestamp(task.updated_at));
    if !task.description.trim().is_empty() {
        let _ = write!(out, "\n{}\n", task.description);
    }
    out
}
