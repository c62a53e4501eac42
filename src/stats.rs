use std::collections::BTreeSet;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::types::Task;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

impl ProgressSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        let total = tasks.len();
        let percentage = if total == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / total as f64
        };
        Self {
            completed,
            total,
            percentage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayActivity {
    pub date: NaiveDate,
    pub weekday: String,
    pub completed: usize,
}

/// Completions per day for the seven days ending on `today`, oldest first.
pub fn weekly_activity(tasks: &[Task], today: NaiveDate) -> Vec<DayActivity> {
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            DayActivity {
                date,
                weekday: date.format("%a").to_string(),
                completed: tasks
                    .iter()
                    .filter(|t| t.completed_on == Some(date))
                    .count(),
            }
        })
        .collect()
}

/// One calendar month laid out Sunday-first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub title: String,
    /// Empty cells before day 1.
    pub leading_blanks: u32,
    pub days: u32,
    pub days_with_tasks: BTreeSet<u32>,
}

impl MonthView {
    pub fn new(year: i32, month: u32, tasks: &[Task]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = first.checked_add_months(Months::new(1))?;
        let days = u32::try_from((next - first).num_days()).ok()?;
        let days_with_tasks = tasks
            .iter()
            .filter(|t| t.date.year() == year && t.date.month() == month)
            .map(|t| t.date.day())
            .collect();
        Some(Self {
            year,
            month,
            title: first.format("%B %Y").to_string(),
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
            days_with_tasks,
        })
    }

    pub fn containing(date: NaiveDate, tasks: &[Task]) -> Option<Self> {
        Self::new(date.year(), date.month(), tasks)
    }

    /// The month `offset` months away; negative goes back.
    pub fn shifted(&self, offset: i32, tasks: &[Task]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let months = Months::new(offset.unsigned_abs());
        let d = if offset < 0 {
            first.checked_sub_months(months)?
        } else {
            first.checked_add_months(months)?
        };
        Self::containing(d, tasks)
    }

    /// Rows of seven cells; `None` is an empty cell.
    pub fn weeks(&self) -> Vec<Vec<Option<u32>>> {
        let cells: Vec<Option<u32>> = std::iter::repeat_n(None, self.leading_blanks as usize)
            .chain((1..=self.days).map(Some))
            .collect();
        cells
            .chunks(7)
            .map(|w| {
                let mut week = w.to_vec();
                week.resize(7, None);
                week
            })
            .collect()
    }
}

pub const REMINDER_LEAD_MINUTES: i64 = 5;

/// Window length for `lead_minutes`. `None` when negative or too large to
/// represent.
pub fn reminder_lead(lead_minutes: i64) -> Option<Duration> {
    if lead_minutes < 0 {
        return None;
    }
    Duration::try_minutes(lead_minutes)
}

/// Open tasks whose scheduled date and time fall in `[now, now + lead]`.
/// `None` when the window end is out of range.
pub fn due_reminders<'a>(
    tasks: &'a [Task],
    now: NaiveDateTime,
    lead: Duration,
) -> Option<Vec<&'a Task>> {
    let until = now.checked_add_signed(lead)?;
    let due = tasks
        .iter()
        .filter(|t| !t.completed)
        .filter(|t| {
            t.time
                .as_deref()
                .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
                .map(|time| {
                    let at = t.date.and_time(time);
                    at >= now && at <= until
                })
                .unwrap_or(false)
        })
        .collect();
    Some(due)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: &str, date: NaiveDate, time: Option<&str>) -> Task {
        Task {
            id: id.into(),
            title: id.to_uppercase(),
            subtitle: String::new(),
            icon: "Pencil".into(),
            streak: 0,
            completed: false,
            show_play: false,
            time: time.map(str::to_string),
            duration: Some(5),
            music: None,
            date,
            completed_on: None,
        }
    }

    #[test]
    fn progress_handles_empty_and_partial() {
        assert_eq!(ProgressSummary::from_tasks(&[]).percentage, 0.0);
        let mut a = task("a", day(2026, 10, 19), None);
        a.completed = true;
        let b = task("b", day(2026, 10, 19), None);
        let p = ProgressSummary::from_tasks(&[a, b]);
        assert_eq!((p.completed, p.total), (1, 2));
        assert!((p.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_activity_counts_completion_dates() {
        let today = day(2026, 10, 19);
        let mut a = task("a", today, None);
        a.completed = true;
        a.completed_on = Some(today);
        let mut b = task("b", today, None);
        b.completed = true;
        b.completed_on = Some(day(2026, 10, 17));
        let mut old = task("old", today, None);
        old.completed = true;
        old.completed_on = Some(day(2026, 10, 1));

        let week = weekly_activity(&[a, b, old], today);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, day(2026, 10, 13));
        assert_eq!(week[6].date, today);
        assert_eq!(week[6].weekday, "Mon");
        assert_eq!(week[6].completed, 1);
        assert_eq!(week[4].completed, 1);
        assert_eq!(week.iter().map(|d| d.completed).sum::<usize>(), 2);
    }

    #[test]
    fn month_view_layout_and_markers() {
        let tasks = vec![
            task("a", day(2026, 2, 3), None),
            task("b", day(2026, 2, 3), None),
            task("c", day(2026, 3, 1), None),
        ];
        let feb = MonthView::new(2026, 2, &tasks).unwrap();
        assert_eq!(feb.title, "February 2026");
        assert_eq!(feb.days, 28);
        // 2026-02-01 is a Sunday
        assert_eq!(feb.leading_blanks, 0);
        assert_eq!(feb.days_with_tasks.iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(feb.weeks().len(), 4);

        let mar = feb.shifted(1, &tasks).unwrap();
        assert_eq!((mar.year, mar.month), (2026, 3));
        assert!(mar.days_with_tasks.contains(&1));
        let jan = feb.shifted(-1, &tasks).unwrap();
        assert_eq!(jan.days, 31);
        let prev_year = feb.shifted(-14, &tasks).unwrap();
        assert_eq!((prev_year.year, prev_year.month), (2024, 12));
        assert_eq!(feb.shifted(0, &tasks).unwrap(), feb);
        assert!(feb.shifted(i32::MAX, &tasks).is_none());
        assert!(MonthView::new(2026, 13, &tasks).is_none());
    }

    #[test]
    fn reminders_only_cover_the_lead_window() {
        let today = day(2026, 10, 19);
        let now = today.and_hms_opt(9, 57, 0).unwrap();
        let mut done = task("done", today, Some("09:59"));
        done.completed = true;
        let tasks = vec![
            task("soon", today, Some("10:00")),
            task("later", today, Some("10:30")),
            task("past", today, Some("09:00")),
            task("tomorrow", day(2026, 10, 20), Some("10:00")),
            task("untimed", today, None),
            done,
        ];
        let lead = reminder_lead(REMINDER_LEAD_MINUTES).unwrap();
        let due = due_reminders(&tasks, now, lead).unwrap();
        let ids: Vec<&str> = due.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["soon"]);
    }

    #[test]
    fn reminder_window_crosses_midnight() {
        let now = day(2026, 10, 19).and_hms_opt(23, 58, 0).unwrap();
        let tasks = vec![
            task("early", day(2026, 10, 20), Some("00:02")),
            task("too-late", day(2026, 10, 20), Some("00:10")),
        ];
        let due = due_reminders(&tasks, now, reminder_lead(5).unwrap()).unwrap();
        let ids: Vec<&str> = due.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early"]);
    }

    #[test]
    fn out_of_range_leads_are_rejected() {
        assert!(reminder_lead(-1).is_none());
        assert!(reminder_lead(i64::MAX).is_none());
        assert_eq!(reminder_lead(0), Some(Duration::zero()));

        let now = day(2026, 10, 19).and_hms_opt(9, 0, 0).unwrap();
        let huge = reminder_lead(1_000_000_000_000).unwrap();
        assert!(due_reminders(&[], now, huge).is_none());
    }
}
