//! Terminal front end: every non-server subcommand lands here.

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};
use tokio::time::MissedTickBehavior;

use crate::catalog::{self, THEMES};
use crate::cli::{MediaCommand, ProfileCommand, TaskCommand, ThemeCommand};
use crate::error::{ServiceError, ServiceResult};
use crate::forest::{self, ForestLayout, ForestStats};
use crate::prompts::parse_task_plan;
use crate::stats::{self, MonthView, ProgressSummary};
use crate::storage::{self, Storage};
use crate::timer::{
    PlantStage, PomodoroEvent, PomodoroTimer, QuickSession, TaskSession, Tick, format_clock,
};
use crate::types::{
    BackgroundSlot, MediaEntry, MediaKind, NewTask, NotificationSettings, PomodoroSettings, Task,
    UserProfile,
};

fn parse_date(raw: Option<&str>) -> ServiceResult<NaiveDate> {
    match raw {
        None => Ok(storage::today()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| ServiceError::InvalidArgs(format!("invalid date '{s}': {e}"))),
    }
}

fn parse_arg<T: std::str::FromStr<Err = String>>(raw: &str) -> ServiceResult<T> {
    raw.parse().map_err(ServiceError::InvalidArgs)
}

fn progress_bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed {
        "[x]".green()
    } else {
        "[ ]".normal()
    };
    let streak = if task.streak > 0 {
        format!(" streak {}", task.streak).yellow().to_string()
    } else {
        String::new()
    };
    format!(
        "{mark} {:<18} {}{}  {}",
        task.title.bold(),
        task.display_subtitle().dimmed(),
        streak,
        task.id.dimmed()
    )
}

fn media_line(entry: &MediaEntry) -> String {
    format!(
        "{:<6} {:<24} {}  {}",
        entry.kind.as_str(),
        entry.title.bold(),
        entry.url.dimmed(),
        entry.id.dimmed()
    )
}

// tasks

pub fn task(storage: &mut Storage, action: TaskCommand) -> ServiceResult<()> {
    match action {
        TaskCommand::Add {
            title,
            template,
            icon,
            time,
            duration,
            music,
            date,
        } => {
            let date = date.as_deref().map(|d| parse_date(Some(d))).transpose()?;
            let task = match template {
                Some(name) => storage.add_task_from_template(&name, date, duration)?,
                None => storage.add_task(NewTask {
                    title: title.unwrap_or_default(),
                    icon,
                    time,
                    duration,
                    music_id: music,
                    date,
                })?,
            };
            storage.save()?;
            println!("{} {}", "Added".green(), task_line(&task));
        }
        TaskCommand::List { date, all } => {
            let tasks = if all {
                storage.list_tasks().to_vec()
            } else {
                storage.tasks_on(parse_date(date.as_deref())?)
            };
            if tasks.is_empty() {
                println!("{}", "No tasks.".dimmed());
            }
            for task in &tasks {
                println!("{}", task_line(task));
            }
            let summary = ProgressSummary::from_tasks(&tasks);
            println!(
                "\n{} {}/{} ({:.0}%)",
                progress_bar(summary.percentage / 100.0, 20),
                summary.completed,
                summary.total,
                summary.percentage
            );
        }
        TaskCommand::Done { id } => {
            let task = storage.complete_task(&id, storage::today())?;
            storage.save()?;
            println!("{} {}", "Completed".green().bold(), task_line(&task));
        }
        TaskCommand::Delete { id } => {
            let task = storage.delete_task(&id)?;
            storage.save()?;
            println!("{} {}", "Deleted".red(), task.title);
        }
        TaskCommand::Templates => {
            for t in storage.templates() {
                println!("{:<18} {}", t.name.bold(), t.icon.dimmed());
            }
        }
        TaskCommand::Import { file, date } => {
            let date = date.as_deref().map(|d| parse_date(Some(d))).transpose()?;
            let plan = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let parsed = parse_task_plan(&plan);
            if parsed.is_empty() {
                return Err(ServiceError::InvalidArgs("plan contains no tasks".to_string()));
            }
            for mut new in parsed {
                new.date = new.date.or(date);
                let task = storage.add_task(new)?;
                println!("{} {}", "Added".green(), task_line(&task));
            }
            storage.save()?;
        }
    }
    Ok(())
}

// timers

fn one_second() -> tokio::time::Interval {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn redraw(line: &str) {
    print!("\r\x1b[2K{line}");
    let _ = std::io::stdout().flush();
}

fn show_background(storage: &Storage, slot: BackgroundSlot) {
    if let Some(bg) = storage.session_background(slot) {
        println!("{} {}", "Background:".dimmed(), bg.title);
    }
}

pub async fn session(storage: &mut Storage, task_id: &str) -> ServiceResult<()> {
    let task = storage.get_task(task_id)?;
    if task.completed {
        return Err(storage::StorageError::TaskAlreadyCompleted(task.id).into());
    }
    let mut session = TaskSession::for_task(&task);
    println!("{}  {}", session.title().bold(), task.display_subtitle().dimmed());
    show_background(storage, BackgroundSlot::TaskSession);

    let mut interval = one_second();
    interval.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    if !session.is_complete() {
        loop {
            let c = session.countdown();
            redraw(&format!(
                "{} {}",
                format_clock(c.remaining_secs()).bold(),
                progress_bar(c.progress(), 30)
            ));
            tokio::select! {
                _ = &mut ctrl_c => {
                    println!("\n{}", "Session stopped.".yellow());
                    return Ok(());
                }
                _ = interval.tick() => {
                    if session.tick() == Tick::Finished {
                        break;
                    }
                }
            }
        }
    }
    println!("\n{}", "Time's up!".green().bold());

    let auto = storage.preferences().notifications.auto_complete;
    let done = auto
        || Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Mark {} as done?", task.title))
            .default(true)
            .interact()?;
    if done {
        let task = storage.complete_task(session.task_id(), storage::today())?;
        storage.save()?;
        println!("{} {}", "Completed".green().bold(), task_line(&task));
    }
    Ok(())
}

pub async fn quick(title: Option<String>, subtitle: Option<String>, minutes: Option<u32>) -> ServiceResult<()> {
    let mut session = QuickSession::new(title, subtitle, minutes);
    println!("{}  {}", session.title.bold(), session.subtitle.dimmed());

    let mut interval = one_second();
    interval.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        let c = session.countdown();
        redraw(&format!(
            "{} {} {}",
            session.growth().glyph(),
            format_clock(c.remaining_secs()).bold(),
            progress_bar(c.progress(), 30)
        ));
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\n{}", "Session stopped.".yellow());
                return Ok(());
            }
            _ = interval.tick() => {
                if session.tick() == Tick::Finished {
                    break;
                }
            }
        }
    }
    println!("\n{} {}", PlantStage::Fruiting.glyph(), "Done.".green().bold());
    Ok(())
}

/// Terminal Pomodoro. Each focus session that finishes is recorded as a
/// completed task; the next session starts right away.
pub async fn pomodoro(storage: &mut Storage, cycles: Option<u32>) -> ServiceResult<()> {
    let mut timer = PomodoroTimer::new(storage.preferences().pomodoro)?;
    show_background(storage, BackgroundSlot::Pomodoro);
    timer.start();

    let mut interval = one_second();
    interval.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        let snap = timer.snapshot();
        redraw(&format!(
            "{} {:<14} {} {}  sessions: {}",
            snap.plant.glyph(),
            snap.title,
            snap.clock.bold(),
            progress_bar(snap.progress, 24),
            snap.completed_work_sessions
        ));
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\n{}", "Pomodoro stopped.".yellow());
                break;
            }
            _ = interval.tick() => {
                if let PomodoroEvent::Finished { finished, next, completed_work_sessions } = timer.tick() {
                    println!("\n{} {}", finished.title().green().bold(), "finished".green());
                    if !finished.is_break() {
                        storage.record_pomodoro(timer.settings().work_minutes, storage::today());
                        storage.save()?;
                        if cycles.is_some_and(|n| completed_work_sessions >= n) {
                            break;
                        }
                    }
                    tracing::debug!(next = ?next, "next pomodoro session");
                    timer.start();
                }
            }
        }
    }
    Ok(())
}

// forest & progress

pub fn forest(storage: &Storage, seed: u32, width: usize, height: usize) {
    let layout = ForestLayout::generate(seed);
    let planted = layout.plant(&forest::completed_tasks(storage.list_tasks()));
    for row in forest::render_ascii(&planted, width.max(1), height.max(1)) {
        println!("{}", row.green());
    }
    let stats = ForestStats::from_tasks(storage.list_tasks());
    println!(
        "\n{} {}   {} {}   {} {}",
        "Trees".bold(),
        stats.total_trees,
        "Longest streak".bold(),
        stats.longest_streak,
        "Tasks left".bold(),
        stats.tasks_left
    );
    for milestone in forest::milestones_reached(&planted) {
        println!("{} {}", "#".yellow(), milestone.label());
    }
}

pub fn progress(storage: &Storage, date: Option<&str>) -> ServiceResult<()> {
    let summary = match date {
        Some(d) => ProgressSummary::from_tasks(&storage.tasks_on(parse_date(Some(d))?)),
        None => ProgressSummary::from_tasks(storage.list_tasks()),
    };
    println!(
        "{} {} {}/{} ({:.0}%)",
        "Progress".bold(),
        progress_bar(summary.percentage / 100.0, 30),
        summary.completed,
        summary.total,
        summary.percentage
    );
    println!();
    for day in stats::weekly_activity(storage.list_tasks(), storage::today()) {
        println!("{} {:>2} {}", day.weekday, day.completed, "#".repeat(day.completed).green());
    }
    Ok(())
}

pub fn calendar(
    storage: &Storage,
    year: Option<i32>,
    month: Option<u32>,
    offset: i32,
) -> ServiceResult<()> {
    let today = storage::today();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let view = MonthView::new(year, month, storage.list_tasks())
        .and_then(|v| v.shifted(offset, storage.list_tasks()))
        .ok_or_else(|| {
            ServiceError::InvalidArgs(format!("invalid month {year}-{month} (offset {offset})"))
        })?;
    println!("{:^27}", view.title.bold());
    println!("Su  Mo  Tu  We  Th  Fr  Sa");
    for week in view.weeks() {
        let row: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                None => "   ".to_string(),
                Some(d) if view.days_with_tasks.contains(d) => format!("{d:>2}*").green().to_string(),
                Some(d) => format!("{d:>2} "),
            })
            .collect();
        println!("{}", row.join(" "));
    }
    Ok(())
}

fn due_now(storage: &Storage, lead_minutes: i64) -> ServiceResult<Vec<&Task>> {
    let out_of_range =
        || ServiceError::InvalidArgs(format!("lead minutes out of range: {lead_minutes}"));
    let lead = stats::reminder_lead(lead_minutes).ok_or_else(out_of_range)?;
    stats::due_reminders(storage.list_tasks(), Local::now().naive_local(), lead)
        .ok_or_else(out_of_range)
}

pub fn reminders(storage: &Storage, lead_minutes: i64) -> ServiceResult<()> {
    if !storage.preferences().notifications.reminders {
        println!("{}", "Reminders are turned off (task-forest config).".dimmed());
        return Ok(());
    }
    let due = due_now(storage, lead_minutes)?;
    if due.is_empty() {
        println!("{}", "Nothing due.".dimmed());
    }
    for task in due {
        println!(
            "{} {} at {}",
            "Reminder:".yellow().bold(),
            task.title,
            task.time.as_deref().unwrap_or("--:--")
        );
    }
    Ok(())
}

// preferences & media

pub fn theme(storage: &mut Storage, action: ThemeCommand) -> ServiceResult<()> {
    match action {
        ThemeCommand::List => {
            let current = storage.preferences().theme.clone();
            for t in THEMES {
                let marker = if t.name == current { "*" } else { " " };
                println!("{marker} {:<24} {}", t.name, t.class_name.dimmed());
            }
        }
        ThemeCommand::Set { name } => {
            let theme = storage.set_theme(&name)?;
            storage.save()?;
            println!("{} {}", "Theme set to".green(), theme.name.bold());
        }
    }
    Ok(())
}

pub fn media(storage: &mut Storage, action: MediaCommand) -> ServiceResult<()> {
    match action {
        MediaCommand::List => {
            println!("{}", "Backgrounds".bold());
            for b in storage.backgrounds() {
                println!("  {}", media_line(b));
            }
            println!("{}", "Music".bold());
            for t in catalog::MEDITATION_MUSIC {
                println!("  {:<6} {:<24} {}  {}", "audio", t.title, t.duration.dimmed(), t.id.dimmed());
            }
            for m in storage.music() {
                println!("  {}", media_line(m));
            }
        }
        MediaCommand::AddBackground { kind, url, title } => {
            let kind: MediaKind = parse_arg(&kind)?;
            if kind == MediaKind::Audio {
                return Err(ServiceError::InvalidArgs(
                    "backgrounds must be image or video; use add-music for audio".to_string(),
                ));
            }
            let entry = storage.add_background(kind, url, title);
            storage.save()?;
            println!("{} {}", "Added".green(), media_line(&entry));
        }
        MediaCommand::AddMusic { url, title } => {
            let entry = storage.add_music(url, title);
            storage.save()?;
            println!("{} {}", "Added".green(), media_line(&entry));
        }
        MediaCommand::Import { path, kind, title } => {
            let kind = kind.as_deref().map(parse_arg::<MediaKind>).transpose()?;
            let entry = storage.import_media(Path::new(&path), kind, title)?;
            storage.save()?;
            println!("{} {}", "Imported".green(), media_line(&entry));
        }
        MediaCommand::Remove { id } => {
            let entry = match storage.remove_background(&id) {
                Err(storage::StorageError::MediaNotFound(_)) => storage.remove_music(&id)?,
                other => other?,
            };
            storage.save()?;
            println!("{} {}", "Removed".red(), entry.title);
        }
        MediaCommand::Use { slot, id } => {
            let slot: BackgroundSlot = parse_arg(&slot)?;
            match storage.set_session_background(slot, id)? {
                Some(bg) => println!("{} {}", "Background set to".green(), bg.title.bold()),
                None => println!("{}", "Background cleared".green()),
            }
            storage.save()?;
        }
    }
    Ok(())
}

pub fn profile(storage: &mut Storage, action: ProfileCommand) -> ServiceResult<()> {
    match action {
        ProfileCommand::Show => {
            let p = storage.profile();
            let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
            println!("{:<8} {}", "Name".bold(), p.name);
            println!("{:<8} {}", "Email".bold(), p.email);
            println!("{:<8} {}", "Mobile".bold(), or_dash(&p.mobile));
            println!("{:<8} {}", "Hobbies".bold(), or_dash(&p.hobbies));
            println!("{:<8} {}", "Avatar".bold(), or_dash(&p.avatar_url));
        }
        ProfileCommand::Edit => {
            let current = storage.profile().clone();
            let theme = ColorfulTheme::default();
            let optional = |prompt: &str, value: &Option<String>| -> ServiceResult<Option<String>> {
                let answer: String = Input::with_theme(&theme)
                    .with_prompt(prompt)
                    .with_initial_text(value.clone().unwrap_or_default())
                    .allow_empty(true)
                    .interact_text()?;
                Ok(Some(answer.trim().to_string()).filter(|s| !s.is_empty()))
            };

            let name: String = Input::with_theme(&theme)
                .with_prompt("Name")
                .with_initial_text(current.name.clone())
                .validate_with(|s: &String| {
                    if s.trim().is_empty() { Err("name is required") } else { Ok(()) }
                })
                .interact_text()?;
            let email: String = Input::with_theme(&theme)
                .with_prompt("Email")
                .with_initial_text(current.email.clone())
                .validate_with(|s: &String| {
                    if s.contains('@') { Ok(()) } else { Err("enter an email address") }
                })
                .interact_text()?;
            let profile = UserProfile {
                name: name.trim().to_string(),
                email: email.trim().to_string(),
                mobile: optional("Mobile", &current.mobile)?,
                hobbies: optional("Hobbies", &current.hobbies)?,
                avatar_url: optional("Avatar URL", &current.avatar_url)?,
            };
            storage.update_profile(profile)?;
            storage.save()?;
            println!("{}", "Profile saved.".green());
        }
    }
    Ok(())
}

fn ask_minutes(theme: &ColorfulTheme, prompt: &str, current: u32) -> ServiceResult<u32> {
    Ok(Input::with_theme(theme)
        .with_prompt(prompt)
        .default(current)
        .validate_with(|m: &u32| if *m > 0 { Ok(()) } else { Err("must be at least 1") })
        .interact_text()?)
}

/// Interactive preferences editor; changes are saved on exit.
pub fn config(storage: &mut Storage) -> ServiceResult<()> {
    let theme = ColorfulTheme::default();
    let items = [
        "Theme",
        "Reminders",
        "Auto-complete finished task sessions",
        "Pomodoro timings",
        "Save and exit",
    ];
    loop {
        let prefs = storage.preferences().clone();
        let choice = Select::with_theme(&theme)
            .with_prompt(format!(
                "Preferences (theme: {}, reminders: {}, auto-complete: {})",
                prefs.theme, prefs.notifications.reminders, prefs.notifications.auto_complete
            ))
            .items(&items)
            .default(0)
            .interact()?;
        match choice {
            0 => {
                let names: Vec<&str> = THEMES.iter().map(|t| t.name).collect();
                let current = names.iter().position(|n| *n == prefs.theme).unwrap_or(0);
                let picked = Select::with_theme(&theme)
                    .with_prompt("Theme")
                    .items(&names)
                    .default(current)
                    .interact()?;
                storage.set_theme(names[picked])?;
            }
            1 | 2 => {
                let mut n: NotificationSettings = prefs.notifications;
                let (label, flag) = if choice == 1 {
                    ("Remind me before scheduled tasks?", &mut n.reminders)
                } else {
                    ("Mark tasks done automatically when their session ends?", &mut n.auto_complete)
                };
                *flag = Confirm::with_theme(&theme)
                    .with_prompt(label)
                    .default(*flag)
                    .interact()?;
                storage.set_notifications(n);
            }
            3 => {
                let p = prefs.pomodoro;
                let settings = PomodoroSettings {
                    work_minutes: ask_minutes(&theme, "Focus minutes", p.work_minutes)?,
                    short_break_minutes: ask_minutes(&theme, "Short break minutes", p.short_break_minutes)?,
                    long_break_minutes: ask_minutes(&theme, "Long break minutes", p.long_break_minutes)?,
                    long_break_interval: ask_minutes(&theme, "Focus sessions per long break", p.long_break_interval)?,
                    auto_continue: Confirm::with_theme(&theme)
                        .with_prompt("Start the next session automatically?")
                        .default(p.auto_continue)
                        .interact()?,
                };
                storage.set_pomodoro_settings(settings)?;
            }
            _ => break,
        }
    }
    storage.save()?;
    println!("{}", "Preferences saved.".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(0.5, 4), "[##--]");
        assert_eq!(progress_bar(3.0, 4), "[####]");
        assert_eq!(progress_bar(-1.0, 2), "[--]");
    }

    #[test]
    fn dates_parse_or_report() {
        assert_eq!(
            parse_date(Some("2026-10-19")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
        );
        assert!(matches!(parse_date(Some("tomorrow")), Err(ServiceError::InvalidArgs(_))));
    }

    #[test]
    fn remove_falls_back_to_music() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = Storage::with_dir(dir.path());
        storage.initialize().unwrap();
        let track = storage.add_music("https://x/a.mp3".into(), "A".into());
        media(&mut storage, MediaCommand::Remove { id: track.id }).unwrap();
        assert!(storage.music().is_empty());
        assert!(media(&mut storage, MediaCommand::Remove { id: "nope".into() }).is_err());
    }

    #[test]
    fn reminder_lead_is_bounded() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = Storage::with_dir(dir.path());
        storage.initialize().unwrap();
        assert!(due_now(&storage, 5).is_ok());
        assert!(matches!(due_now(&storage, -1), Err(ServiceError::InvalidArgs(_))));
        assert!(matches!(
            due_now(&storage, 1_000_000_000_000),
            Err(ServiceError::InvalidArgs(_))
        ));
        assert!(matches!(due_now(&storage, i64::MAX), Err(ServiceError::InvalidArgs(_))));
    }

    #[test]
    fn calendar_rejects_unreachable_offsets() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = Storage::with_dir(dir.path());
        storage.initialize().unwrap();
        assert!(calendar(&storage, Some(2026), Some(1), -1).is_ok());
        assert!(calendar(&storage, Some(2026), Some(1), i32::MAX).is_err());
    }
}
