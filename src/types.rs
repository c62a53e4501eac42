use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reference to a piece of music attached to a task.
///
/// `duration` is a display label ("15:00"), or "Custom" for entries that
/// come from the user's own music library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicRef {
    pub id: String,
    pub title: String,
    pub duration: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub icon: String,
    pub streak: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub show_play: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Session length in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicRef>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<NaiveDate>,
}

impl Task {
    /// Subtitle as shown under the task: music first, then scheduled time.
    pub fn display_subtitle(&self) -> String {
        if let Some(music) = &self.music {
            if music.duration == "Custom" {
                return music.title.clone();
            }
            return format!("{} - {}", music.title, music.duration);
        }
        match &self.time {
            Some(time) => format!("{time} - {}", self.subtitle),
            None => self.subtitle.clone(),
        }
    }

    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration.unwrap_or(0)) * 60
    }
}

/// User input for a new task. Missing fields fall back to the same defaults
/// the dashboard's "new task" flow uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub music_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub name: String,
    pub icon: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Best guess from a file extension; unknown extensions are treated as images.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "webm" | "mov" | "mkv" => MediaKind::Video,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => MediaKind::Audio,
            _ => MediaKind::Image,
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(format!("unknown media kind '{other}' (image, video, audio)")),
        }
    }
}

/// A background or music library entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub id: String,
    pub kind: MediaKind,
    pub url: String,
    pub title: String,
    /// Path relative to the data dir when the file was imported locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub hobbies: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub reminders: bool,
    pub auto_complete: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            reminders: true,
            auto_complete: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub long_break_interval: u32,
    #[serde(default)]
    pub auto_continue: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_interval: 4,
            auto_continue: false,
        }
    }
}

/// Which session screen a background is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackgroundSlot {
    Pomodoro,
    TaskSession,
}

impl std::str::FromStr for BackgroundSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(BackgroundSlot::Pomodoro),
            "task-session" | "taskSession" | "session" => Ok(BackgroundSlot::TaskSession),
            other => Err(format!("unknown background slot '{other}' (pomodoro, task-session)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: String,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub pomodoro: PomodoroSettings,
    #[serde(default)]
    pub pomodoro_background: Option<String>,
    #[serde(default)]
    pub task_session_background: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "Default".to_string(),
            notifications: NotificationSettings::default(),
            pomodoro: PomodoroSettings::default(),
            pomodoro_background: None,
            task_session_background: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub templates: Vec<TaskTemplate>,
    #[serde(default)]
    pub backgrounds: Vec<MediaEntry>,
    #[serde(default)]
    pub music: Vec<MediaEntry>,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub preferences: Preferences,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task {
            id: "1".into(),
            title: "MEDITATE".into(),
            subtitle: "15 min".into(),
            icon: "Heart".into(),
            streak: 0,
            completed: false,
            show_play: true,
            time: Some("09:00".into()),
            duration: Some(15),
            music: None,
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            completed_on: None,
        }
    }

    #[test]
    fn subtitle_prefers_music_then_time() {
        let mut t = task();
        assert_eq!(t.display_subtitle(), "09:00 - 15 min");

        t.music = Some(MusicRef {
            id: "2".into(),
            title: "Gentle Stream".into(),
            duration: "15:00".into(),
        });
        assert_eq!(t.display_subtitle(), "Gentle Stream - 15:00");

        t.music.as_mut().unwrap().duration = "Custom".into();
        assert_eq!(t.display_subtitle(), "Gentle Stream");
    }

    #[test]
    fn task_json_uses_camel_case_and_iso_dates() {
        let json = serde_json::to_value(task()).unwrap();
        assert_eq!(json["showPlay"], true);
        assert_eq!(json["date"], "2026-10-19");
        assert!(json.get("completedOn").is_none());
    }

    #[test]
    fn media_kind_guesses_from_extension() {
        assert_eq!(MediaKind::from_extension("MP3"), MediaKind::Audio);
        assert_eq!(MediaKind::from_extension("webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("png"), MediaKind::Image);
    }

    #[test]
    fn preferences_fill_missing_fields_from_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"theme":"Night Sakura"}"#).unwrap();
        assert_eq!(prefs.theme, "Night Sakura");
        assert_eq!(prefs.pomodoro.long_break_interval, 4);
        assert!(prefs.notifications.reminders);
    }
}
