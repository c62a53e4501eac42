use std::sync::LazyLock;

use regex::Regex;

use crate::types::NewTask;

pub const SERVER_INSTRUCTIONS: &str = r#"Task Forest keeps a daily task list, runs Pomodoro focus sessions and grows a forest from completed work.

WORKING WITH TASKS
- list_tasks shows today's tasks (pass a date as YYYY-MM-DD for another day)
- add_task creates a task; add_task_from_template uses one of list_templates
- complete_task marks a task done and extends its streak; a task can only be completed once
- import_tasks turns a plain-text plan into tasks, one per line or per paragraph:
    1. Morning run 30 min @07:30 #Footprints
    - Read 20 min #BookOpen

FOCUS
- pomodoro_start / pomodoro_pause / pomodoro_reset drive the shared timer
- pomodoro_select switches between work, short-break and long-break
- every finished focus session is recorded as a completed task

FOREST AND PROGRESS
- forest_layout returns the planted forest: one element per completed task
- forest_stats, progress_summary, weekly_activity and calendar_month summarise progress
- due_reminders lists tasks starting within the next five minutes

Preferences (theme, notifications, Pomodoro lengths), the media library and the user profile are
available through their own tools. Resources forest://tasks, forest://layout and forest://themes
mirror the same data."#;

static SECTIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?:[0-9]+[.)]|[-*•])\s*").unwrap());
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([0-9]{1,3})\s*min(?:ute)?s?\b").unwrap());
static TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\s*([01]?[0-9]|2[0-3]):([0-5][0-9])\b").unwrap());
static ICON: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([A-Za-z][A-Za-z0-9]*)").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Turn a free-form plan into tasks.
///
/// Paragraph-separated text yields one task per paragraph, whose first line
/// is the title; otherwise every non-empty line is a task. Inline `NN min`,
/// `@HH:MM` and `#Icon` annotations fill in duration, time and icon.
pub fn parse_task_plan(plan: &str) -> Vec<NewTask> {
    let plan = plan.replace("\r\n", "\n");
    let sections: Vec<&str> = SECTIONS
        .split(&plan)
        .filter(|s| !s.trim().is_empty())
        .collect();

    let entries: Vec<&str> = if sections.len() > 1 {
        sections
    } else {
        plan.lines().filter(|l| !l.trim().is_empty()).collect()
    };

    entries.into_iter().filter_map(parse_entry).collect()
}

fn parse_entry(entry: &str) -> Option<NewTask> {
    let duration = DURATION
        .captures(entry)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|d| *d > 0);
    let time = TIME
        .captures(entry)
        .map(|c| format!("{:0>2}:{}", &c[1], &c[2]));
    let icon = ICON.captures(entry).map(|c| c[1].to_string());

    let first = entry.lines().find(|l| !l.trim().is_empty())?;
    let title = MARKER.replace(first, "");
    let title = DURATION.replace_all(&title, "");
    let title = TIME.replace_all(&title, "");
    let title = ICON.replace_all(&title, "");
    let title = SPACES.replace_all(title.trim(), " ").to_string();
    if title.is_empty() {
        return None;
    }

    Some(NewTask {
        title,
        icon,
        time,
        duration,
        ..NewTask::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_task_per_line() {
        let tasks = parse_task_plan(
            "1. Morning run 30 min @7:30 #Footprints\n- Read 20 mins #BookOpen\n* Stretch\n",
        );
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].title, "Morning run");
        assert_eq!(tasks[0].duration, Some(30));
        assert_eq!(tasks[0].time.as_deref(), Some("07:30"));
        assert_eq!(tasks[0].icon.as_deref(), Some("Footprints"));
        assert_eq!(tasks[1].title, "Read");
        assert_eq!(tasks[1].duration, Some(20));
        assert_eq!(tasks[2].title, "Stretch");
        assert!(tasks[2].duration.is_none());
    }

    #[test]
    fn paragraphs_use_first_line_as_title() {
        let plan = "1. Write chapter three\nAim for 45 min in the evening @19:00\n\n2. Call the clinic\n";
        let tasks = parse_task_plan(plan);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Write chapter three");
        assert_eq!(tasks[0].duration, Some(45));
        assert_eq!(tasks[0].time.as_deref(), Some("19:00"));
        assert_eq!(tasks[1].title, "Call the clinic");
    }

    #[test]
    fn blank_and_marker_only_entries_are_skipped() {
        assert!(parse_task_plan("").is_empty());
        assert!(parse_task_plan("\n\n  \n").is_empty());
        assert!(parse_task_plan("1.\n- 10 min").is_empty());
    }
}
