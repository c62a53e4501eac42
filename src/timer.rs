//! Countdown and Pomodoro session logic.
//!
//! Everything here is driven by explicit `tick()` calls, one per elapsed
//! second. The async ticker in `state.rs` and the terminal loops in
//! `console.rs` own the clock; this module only owns the state transitions.

use serde::Serialize;
use thiserror::Error;

use crate::types::{PomodoroSettings, Task};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("invalid timer settings: {0}")]
    InvalidSettings(String),
}

/// `MM:SS`; minutes are not wrapped into hours.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "state", content = "remaining")]
pub enum Tick {
    Idle,
    Running(u64),
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    duration_secs: u64,
    remaining_secs: u64,
    active: bool,
}

impl Countdown {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            active: false,
        }
    }

    pub fn started(duration_secs: u64) -> Self {
        let mut countdown = Self::new(duration_secs);
        countdown.start();
        countdown
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Resume, or begin again from the full duration once finished.
    pub fn start(&mut self) {
        if self.remaining_secs == 0 {
            self.remaining_secs = self.duration_secs;
        }
        self.active = true;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    /// Stop and restore the full duration.
    pub fn reset(&mut self) {
        self.active = false;
        self.remaining_secs = self.duration_secs;
    }

    /// Replace the duration; the countdown restarts from the new value, paused.
    pub fn set_duration(&mut self, duration_secs: u64) {
        self.duration_secs = duration_secs;
        self.reset();
    }

    /// Advance one second. The tick that brings `remaining` to zero reports
    /// `Finished` and deactivates the countdown.
    pub fn tick(&mut self) -> Tick {
        if !self.active {
            return Tick::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.active = false;
            Tick::Finished
        } else {
            Tick::Running(self.remaining_secs)
        }
    }

    /// Fraction of the duration already elapsed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration_secs == 0 {
            return 0.0;
        }
        let elapsed = self.duration_secs - self.remaining_secs.min(self.duration_secs);
        elapsed as f64 / self.duration_secs as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SessionKind::Work => "Focus Session",
            SessionKind::ShortBreak => "Short Break",
            SessionKind::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionKind::Work)
    }
}

impl std::str::FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(SessionKind::Work),
            "short-break" | "shortBreak" | "short" => Ok(SessionKind::ShortBreak),
            "long-break" | "longBreak" | "long" => Ok(SessionKind::LongBreak),
            other => Err(format!("unknown session kind '{other}' (work, short-break, long-break)")),
        }
    }
}

pub fn validate_settings(settings: &PomodoroSettings) -> Result<(), TimerError> {
    if settings.work_minutes == 0
        || settings.short_break_minutes == 0
        || settings.long_break_minutes == 0
    {
        return Err(TimerError::InvalidSettings(
            "session durations must be at least one minute".to_string(),
        ));
    }
    if settings.long_break_interval == 0 {
        return Err(TimerError::InvalidSettings(
            "long break interval must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn duration_for(settings: &PomodoroSettings, kind: SessionKind) -> u64 {
    let minutes = match kind {
        SessionKind::Work => settings.work_minutes,
        SessionKind::ShortBreak => settings.short_break_minutes,
        SessionKind::LongBreak => settings.long_break_minutes,
    };
    u64::from(minutes) * 60
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum PomodoroEvent {
    Idle,
    Running { remaining: u64 },
    Finished {
        finished: SessionKind,
        next: SessionKind,
        completed_work_sessions: u32,
    },
}

/// Work / short break / long break cycle.
#[derive(Clone, Debug)]
pub struct PomodoroTimer {
    settings: PomodoroSettings,
    kind: SessionKind,
    countdown: Countdown,
    completed_work_sessions: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSnapshot {
    pub kind: SessionKind,
    pub title: &'static str,
    pub remaining_secs: u64,
    pub clock: String,
    pub active: bool,
    pub completed_work_sessions: u32,
    pub progress: f64,
    pub plant: PlantStage,
    pub settings: PomodoroSettings,
}

impl PomodoroTimer {
    pub fn new(settings: PomodoroSettings) -> Result<Self, TimerError> {
        validate_settings(&settings)?;
        Ok(Self {
            countdown: Countdown::new(duration_for(&settings, SessionKind::Work)),
            settings,
            kind: SessionKind::Work,
            completed_work_sessions: 0,
        })
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn settings(&self) -> &PomodoroSettings {
        &self.settings
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn start(&mut self) {
        self.countdown.start();
    }

    pub fn pause(&mut self) {
        self.countdown.pause();
    }

    pub fn reset(&mut self) {
        self.countdown.reset();
    }

    /// Switch to `kind` by hand. The clock is reset to that kind's duration and paused.
    pub fn select(&mut self, kind: SessionKind) {
        self.kind = kind;
        self.countdown.set_duration(duration_for(&self.settings, kind));
    }

    pub fn apply_settings(&mut self, settings: PomodoroSettings) -> Result<(), TimerError> {
        validate_settings(&settings)?;
        self.settings = settings;
        self.countdown.set_duration(duration_for(&settings, self.kind));
        Ok(())
    }

    fn next_kind(&self) -> SessionKind {
        match self.kind {
            SessionKind::Work => {
                if self.completed_work_sessions % self.settings.long_break_interval == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        }
    }

    pub fn tick(&mut self) -> PomodoroEvent {
        match self.countdown.tick() {
            Tick::Idle => PomodoroEvent::Idle,
            Tick::Running(remaining) => PomodoroEvent::Running { remaining },
            Tick::Finished => {
                let finished = self.kind;
                if finished == SessionKind::Work {
                    self.completed_work_sessions += 1;
                }
                let next = self.next_kind();
                self.select(next);
                if self.settings.auto_continue {
                    self.countdown.start();
                }
                PomodoroEvent::Finished {
                    finished,
                    next,
                    completed_work_sessions: self.completed_work_sessions,
                }
            }
        }
    }

    /// Plant growth only tracks focus time; during breaks it stays a sprout.
    pub fn growth(&self) -> f64 {
        if self.kind == SessionKind::Work {
            self.countdown.progress()
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> PomodoroSnapshot {
        let growth = self.growth();
        PomodoroSnapshot {
            kind: self.kind,
            title: self.kind.title(),
            remaining_secs: self.countdown.remaining_secs(),
            clock: format_clock(self.countdown.remaining_secs()),
            active: self.countdown.is_active(),
            completed_work_sessions: self.completed_work_sessions,
            progress: self.countdown.progress(),
            plant: PlantStage::for_progress(growth),
            settings: self.settings,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlantStage {
    Sprout,
    Sapling,
    Leafy,
    Flowering,
    Fruiting,
}

impl PlantStage {
    const THRESHOLDS: [(f64, PlantStage); 5] = [
        (1.0, PlantStage::Fruiting),
        (0.75, PlantStage::Flowering),
        (0.5, PlantStage::Leafy),
        (0.25, PlantStage::Sapling),
        (0.0, PlantStage::Sprout),
    ];

    pub fn for_progress(progress: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(at, _)| progress >= *at)
            .map(|(_, stage)| *stage)
            .unwrap_or(PlantStage::Sprout)
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            PlantStage::Sprout => ".",
            PlantStage::Sapling => "i",
            PlantStage::Leafy => "Y",
            PlantStage::Flowering => "*",
            PlantStage::Fruiting => "@",
        }
    }
}

/// Timed session for a single task. When the countdown runs out the session
/// is complete; marking the task as done is left to the caller.
#[derive(Clone, Debug)]
pub struct TaskSession {
    task_id: String,
    title: String,
    countdown: Countdown,
}

impl TaskSession {
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            countdown: Countdown::started(task.duration_secs()),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn is_complete(&self) -> bool {
        self.countdown.is_finished()
    }

    pub fn tick(&mut self) -> Tick {
        self.countdown.tick()
    }
}

/// Ad-hoc focus timer; nothing about it is persisted.
#[derive(Clone, Debug)]
pub struct QuickSession {
    pub title: String,
    pub subtitle: String,
    countdown: Countdown,
}

impl QuickSession {
    pub const DEFAULT_MINUTES: u32 = 10;

    pub fn new(title: Option<String>, subtitle: Option<String>, minutes: Option<u32>) -> Self {
        let minutes = minutes.unwrap_or(Self::DEFAULT_MINUTES);
        Self {
            title: title.unwrap_or_else(|| "Quick Session".to_string()),
            subtitle: subtitle.unwrap_or_else(|| "Focus time".to_string()),
            countdown: Countdown::started(u64::from(minutes) * 60),
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn tick(&mut self) -> Tick {
        self.countdown.tick()
    }

    pub fn growth(&self) -> PlantStage {
        PlantStage::for_progress(self.countdown.progress())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(work: u32, short: u32, long: u32, interval: u32) -> PomodoroSettings {
        PomodoroSettings {
            work_minutes: work,
            short_break_minutes: short,
            long_break_minutes: long,
            long_break_interval: interval,
            auto_continue: false,
        }
    }

    fn run_until_finished(timer: &mut PomodoroTimer) -> PomodoroEvent {
        timer.start();
        loop {
            match timer.tick() {
                PomodoroEvent::Running { .. } => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn countdown_reaches_zero_after_exactly_d_ticks() {
        for d in [1_u64, 2, 7, 60, 1500] {
            let mut c = Countdown::started(d);
            for i in 1..d {
                assert_eq!(c.tick(), Tick::Running(d - i), "tick {i} of {d}");
            }
            assert_eq!(c.tick(), Tick::Finished);
            assert_eq!(c.remaining_secs(), 0);
            assert!(!c.is_active());
            assert_eq!(c.tick(), Tick::Idle);
        }
    }

    #[test]
    fn paused_countdown_does_not_move() {
        let mut c = Countdown::started(10);
        c.tick();
        c.pause();
        for _ in 0..5 {
            assert_eq!(c.tick(), Tick::Idle);
        }
        assert_eq!(c.remaining_secs(), 9);
        c.start();
        assert_eq!(c.tick(), Tick::Running(8));
        c.pause();
        assert!(!c.is_active());
    }

    #[test]
    fn starting_a_finished_countdown_counts_again() {
        let mut c = Countdown::started(2);
        c.tick();
        assert_eq!(c.tick(), Tick::Finished);
        c.start();
        assert_eq!(c.remaining_secs(), 2);
        assert_eq!(c.tick(), Tick::Running(1));
        assert_eq!(c.tick(), Tick::Finished);
    }

    #[test]
    fn zero_duration_finishes_on_first_tick() {
        let mut c = Countdown::started(0);
        assert_eq!(c.tick(), Tick::Finished);
        assert_eq!(c.progress(), 0.0);
    }

    #[test]
    fn reset_restores_full_duration_and_pauses() {
        let mut c = Countdown::started(30);
        c.tick();
        c.tick();
        c.reset();
        assert_eq!(c.remaining_secs(), 30);
        assert!(!c.is_active());
    }

    #[test]
    fn work_sessions_alternate_with_breaks_and_long_break_every_interval() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 2, 3)).unwrap();
        let mut kinds = Vec::new();
        for _ in 0..8 {
            match run_until_finished(&mut timer) {
                PomodoroEvent::Finished { next, .. } => kinds.push(next),
                other => panic!("unexpected {other:?}"),
            }
        }
        use SessionKind::*;
        assert_eq!(
            kinds,
            vec![ShortBreak, Work, ShortBreak, Work, LongBreak, Work, ShortBreak, Work]
        );
        assert_eq!(timer.completed_work_sessions(), 4);
    }

    #[test]
    fn transition_resets_clock_and_pauses_without_auto_continue() {
        let mut timer = PomodoroTimer::new(settings(1, 5, 15, 4)).unwrap();
        let event = run_until_finished(&mut timer);
        assert_eq!(
            event,
            PomodoroEvent::Finished {
                finished: SessionKind::Work,
                next: SessionKind::ShortBreak,
                completed_work_sessions: 1,
            }
        );
        assert_eq!(timer.kind(), SessionKind::ShortBreak);
        assert_eq!(timer.countdown().remaining_secs(), 300);
        assert!(!timer.countdown().is_active());
    }

    #[test]
    fn auto_continue_keeps_running() {
        let mut s = settings(1, 1, 1, 4);
        s.auto_continue = true;
        let mut timer = PomodoroTimer::new(s).unwrap();
        run_until_finished(&mut timer);
        assert!(timer.countdown().is_active());
    }

    #[test]
    fn breaks_do_not_count_as_work() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 1, 1)).unwrap();
        timer.select(SessionKind::ShortBreak);
        let event = run_until_finished(&mut timer);
        assert_eq!(
            event,
            PomodoroEvent::Finished {
                finished: SessionKind::ShortBreak,
                next: SessionKind::Work,
                completed_work_sessions: 0,
            }
        );
    }

    #[test]
    fn settings_are_validated() {
        assert!(PomodoroTimer::new(settings(0, 5, 15, 4)).is_err());
        let mut timer = PomodoroTimer::new(PomodoroSettings::default()).unwrap();
        assert!(timer.apply_settings(settings(25, 5, 15, 0)).is_err());
        timer.start();
        timer.apply_settings(settings(50, 10, 20, 2)).unwrap();
        assert_eq!(timer.countdown().remaining_secs(), 3000);
        assert!(!timer.countdown().is_active());
    }

    #[test]
    fn plant_grows_only_during_work() {
        let mut timer = PomodoroTimer::new(settings(1, 1, 1, 4)).unwrap();
        timer.start();
        for _ in 0..30 {
            timer.tick();
        }
        assert_eq!(timer.snapshot().plant, PlantStage::Leafy);
        timer.select(SessionKind::ShortBreak);
        timer.start();
        for _ in 0..45 {
            timer.tick();
        }
        assert_eq!(timer.snapshot().plant, PlantStage::Sprout);
    }

    #[test]
    fn plant_stage_boundaries() {
        assert_eq!(PlantStage::for_progress(0.0), PlantStage::Sprout);
        assert_eq!(PlantStage::for_progress(0.24), PlantStage::Sprout);
        assert_eq!(PlantStage::for_progress(0.25), PlantStage::Sapling);
        assert_eq!(PlantStage::for_progress(0.75), PlantStage::Flowering);
        assert_eq!(PlantStage::for_progress(1.0), PlantStage::Fruiting);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(6000), "100:00");
    }

    #[test]
    fn quick_session_defaults_to_ten_minutes_running() {
        let q = QuickSession::new(None, None, None);
        assert_eq!(q.title, "Quick Session");
        assert_eq!(q.countdown().remaining_secs(), 600);
        assert!(q.countdown().is_active());
    }
}
