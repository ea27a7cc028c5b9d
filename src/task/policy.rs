#![forbid(unsafe_code)]

//! Urgency and ordering rules.
//!
//! Everything here is a pure function of the task fields and an explicit
//! `now`, so the store decides when time is sampled.

use std::cmp::Reverse;

use time::{Date, OffsetDateTime};

use crate::task::model::{Priority, Task, TaskStatus};

const MILLIS_PER_DAY: i128 = 24 * 60 * 60 * 1000;

pub const OVERDUE_BONUS: i64 = 50;
pub const DUE_SOON_BONUS: i64 = 20;
pub const DUE_THIS_WEEK_BONUS: i64 = 10;

/// Whole days until the deadline, rounded up.
///
/// The deadline counts from 00:00 UTC of its date. A deadline of today is
/// `0` for the whole day, tomorrow is `1`, yesterday is `-1`.
#[must_use]
pub fn days_left(deadline: Date, now: OffsetDateTime) -> i64 {
    let target = deadline.midnight().assume_utc();
    let ms = (target - now).whole_milliseconds();
    let days = ms.div_euclid(MILLIS_PER_DAY) + i128::from(ms.rem_euclid(MILLIS_PER_DAY) != 0);
    i64::try_from(days).unwrap_or(if days < 0 { i64::MIN } else { i64::MAX })
}

#[must_use]
pub fn score(task: &Task, now: OffsetDateTime) -> i64 {
    let base = i64::from(task.priority.value()) * 10;
    let Some(deadline) = task.deadline else {
        return base;
    };

    let left = days_left(deadline, now);
    let bonus = if left < 0 {
        OVERDUE_BONUS
    } else if left <= 2 {
        DUE_SOON_BONUS
    } else if left <= 5 {
        DUE_THIS_WEEK_BONUS
    } else {
        0
    };
    base + bonus
}

#[must_use]
pub fn is_urgent(task: &Task, now: OffsetDateTime) -> bool {
    if task.status.is_done() {
        return false;
    }
    let Some(deadline) = task.deadline else {
        return false;
    };

    let left = days_left(deadline, now);
    left < 0
        || (left <= 2 && task.priority >= Priority::Medium)
        || (task.priority == Priority::High && left <= 5)
}

/// Score descending. Stable: equal scores keep their current order.
pub fn sort_by_score(tasks: &mut [Task], now: OffsetDateTime) {
    tasks.sort_by_cached_key(|t| Reverse(score(t, now)));
}

/// Urgent tasks, soonest deadline first.
#[must_use]
pub fn urgent(tasks: &[Task], now: OffsetDateTime) -> Vec<&Task> {
    let mut out: Vec<&Task> = tasks
        .iter()
        .filter(|t| is_urgent(t, now) && !t.status.is_done())
        .collect();
    out.sort_by_key(|t| t.deadline);
    out
}

/// Not-done tasks in collection order.
#[must_use]
pub fn active(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| !t.status.is_done()).collect()
}

/// Done tasks in collection order.
#[must_use]
pub fn done(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.status.is_done()).collect()
}

/// The three lists a renderer shows, computed together against one `now`.
#[derive(Debug, Clone, Default)]
pub struct Views<'a> {
    pub urgent: Vec<&'a Task>,
    pub active: Vec<&'a Task>,
    pub done: Vec<&'a Task>,
}

impl<'a> Views<'a> {
    /// `tasks` is expected to already be in score order.
    #[must_use]
    pub fn compute(tasks: &'a [Task], now: OffsetDateTime) -> Self {
        Self {
            urgent: urgent(tasks, now),
            active: active(tasks),
            done: done(tasks),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub todo: usize,
    pub doing: usize,
    pub done: usize,
    pub urgent: usize,
}

#[must_use]
pub fn counts(tasks: &[Task], now: OffsetDateTime) -> Counts {
    let mut c = Counts {
        total: tasks.len(),
        ..Counts::default()
    };
    for t in tasks {
        match t.status {
            TaskStatus::Todo => c.todo += 1,
            TaskStatus::Doing => c.doing += 1,
            TaskStatus::Done => c.done += 1,
        }
        if is_urgent(t, now) {
            c.urgent += 1;
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-03-10 15:30 UTC);

    fn task(id: i64, priority: Priority, deadline: Option<Date>) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            description: String::new(),
            deadline,
            priority,
            status: TaskStatus::Todo,
            created_at: NOW,
            updated_at: NOW,
        }
    }

    fn in_days(n: i64) -> Date {
        NOW.date() + Duration::days(n)
    }

    #[test]
    fn days_left_uses_midnight_utc_and_rounds_up() {
        assert_eq!(days_left(date!(2024 - 03 - 10), NOW), 0);
        assert_eq!(days_left(date!(2024 - 03 - 11), NOW), 1);
        assert_eq!(days_left(date!(2024 - 03 - 09), NOW), -1);
        assert_eq!(days_left(date!(2024 - 03 - 20), NOW), 10);
    }

    #[test]
    fn days_left_midnight_boundaries() {
        let d = date!(2024 - 03 - 11);
        assert_eq!(days_left(d, datetime!(2024-03-11 00:00 UTC)), 0);
        assert_eq!(days_left(d, datetime!(2024-03-10 23:59:59.999 UTC)), 1);
        assert_eq!(days_left(d, datetime!(2024-03-10 00:00 UTC)), 1);
        assert_eq!(days_left(d, datetime!(2024-03-09 23:59:59.999 UTC)), 2);
        assert_eq!(days_left(d, datetime!(2024-03-11 23:59:59.999 UTC)), 0);
        assert_eq!(days_left(d, datetime!(2024-03-12 00:00 UTC)), -1);
    }

    #[test]
    fn days_left_ignores_local_offset_of_now() {
        // Same instant as 2024-03-10 23:30 UTC.
        let now = datetime!(2024-03-11 08:30 +9);
        assert_eq!(days_left(date!(2024 - 03 - 11), now), 1);
    }

    #[test]
    fn no_deadline_scores_priority_only_and_is_never_urgent() {
        for p in Priority::ALL {
            let t = task(1, p, None);
            assert_eq!(score(&t, NOW), i64::from(p.value()) * 10);
            assert!(!is_urgent(&t, NOW));
        }
    }

    #[test]
    fn overdue_by_one_day_is_urgent_for_every_priority() {
        let yesterday = (NOW - Duration::days(1)).date();
        for p in Priority::ALL {
            let t = task(1, p, Some(yesterday));
            assert!(is_urgent(&t, NOW), "priority {p}");
            assert_eq!(score(&t, NOW), i64::from(p.value()) * 10 + OVERDUE_BONUS);
        }
    }

    #[test]
    fn score_bonus_tiers() {
        let p = Priority::Low;
        assert_eq!(score(&task(1, p, Some(in_days(2))), NOW), 10 + DUE_SOON_BONUS);
        assert_eq!(score(&task(1, p, Some(in_days(3))), NOW), 10 + DUE_THIS_WEEK_BONUS);
        assert_eq!(score(&task(1, p, Some(in_days(5))), NOW), 10 + DUE_THIS_WEEK_BONUS);
        assert_eq!(score(&task(1, p, Some(in_days(6))), NOW), 10);
    }

    #[test]
    fn score_is_monotonic_in_priority() {
        for offset in [-3, -1, 0, 1, 2, 3, 5, 6, 30] {
            let deadline = Some(in_days(offset));
            let scores: Vec<i64> = Priority::ALL
                .iter()
                .map(|&p| score(&task(1, p, deadline), NOW))
                .collect();
            assert!(scores.windows(2).all(|w| w[0] <= w[1]), "offset {offset}");
        }
    }

    #[test]
    fn urgency_rules() {
        // due soon needs at least medium priority
        assert!(!is_urgent(&task(1, Priority::Low, Some(in_days(1))), NOW));
        assert!(is_urgent(&task(1, Priority::Medium, Some(in_days(2))), NOW));
        // high priority stretches the window to five days
        assert!(!is_urgent(&task(1, Priority::Medium, Some(in_days(4))), NOW));
        assert!(is_urgent(&task(1, Priority::High, Some(in_days(5))), NOW));
        assert!(!is_urgent(&task(1, Priority::High, Some(in_days(6))), NOW));
    }

    #[test]
    fn done_is_never_urgent_even_when_overdue() {
        let mut t = task(1, Priority::High, Some(in_days(-4)));
        t.status = TaskStatus::Done;
        assert!(!is_urgent(&t, NOW));
        assert!(urgent(std::slice::from_ref(&t), NOW).is_empty());
    }

    #[test]
    fn scenario_high_tomorrow_beats_low_next_week() {
        let a = task(1, Priority::High, Some(in_days(1)));
        let b = task(2, Priority::Low, Some(in_days(10)));
        assert!(is_urgent(&a, NOW));
        assert_eq!(score(&a, NOW), 50);
        assert!(!is_urgent(&b, NOW));
        assert_eq!(score(&b, NOW), 10);

        let mut tasks = vec![b, a];
        sort_by_score(&mut tasks, NOW);
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn sort_is_non_increasing_and_stable() {
        let mut tasks = vec![
            task(1, Priority::Low, None),
            task(2, Priority::Medium, None),
            task(3, Priority::Low, None),
            task(4, Priority::Medium, Some(in_days(30))),
            task(5, Priority::Low, Some(in_days(-1))),
            task(6, Priority::Low, None),
        ];
        sort_by_score(&mut tasks, NOW);
        let scores: Vec<i64> = tasks.iter().map(|t| score(t, NOW)).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![5, 2, 4, 1, 3, 6]);

        sort_by_score(&mut tasks, NOW);
        sort_by_score(&mut tasks, NOW);
        let again: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn views_partition_and_order() {
        let mut overdue = task(1, Priority::Low, Some(in_days(-2)));
        overdue.status = TaskStatus::Doing;
        let soon = task(2, Priority::High, Some(in_days(1)));
        let far = task(3, Priority::High, Some(in_days(40)));
        let mut finished = task(4, Priority::High, Some(in_days(-9)));
        finished.status = TaskStatus::Done;

        let mut tasks = vec![soon, far, finished, overdue];
        sort_by_score(&mut tasks, NOW);
        let views = Views::compute(&tasks, NOW);

        let ids = |v: &[&Task]| v.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(&views.urgent), vec![1, 2]);
        assert_eq!(ids(&views.active), vec![1, 2, 3]);
        assert_eq!(ids(&views.done), vec![4]);

        let c = counts(&tasks, NOW);
        assert_eq!(
            c,
            Counts {
                total: 4,
                todo: 2,
                doing: 1,
                done: 1,
                urgent: 2
            }
        );
    }
}
