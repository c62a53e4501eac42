use chrono::{Local, NaiveDate, NaiveTime};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use ulid::Ulid;

use crate::catalog;
use crate::metadata::DATA_DIR_NAME;
use crate::timer::{self, TimerError};
use crate::types::{
    BackgroundSlot, MediaEntry, MediaKind, MusicRef, NewTask, NotificationSettings,
    PomodoroSettings, Preferences, StorageData, Task, TaskTemplate, UserProfile,
};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not locate a home directory; pass --data-dir or set TASK_FOREST_HOME")]
    HomeDirMissing,
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Task already completed: {0}")]
    TaskAlreadyCompleted(String),
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
    #[error("Media entry not found: {0}")]
    MediaNotFound(String),
    #[error("Unknown music: {0}")]
    UnknownMusic(String),
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
    #[error("Invalid time (expected HH:MM): {0}")]
    InvalidTime(String),
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
    #[error("{0}")]
    InvalidSettings(#[from] TimerError),
}

impl StorageError {
    /// Errors caused by the caller's input rather than by the machine.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            StorageError::Io(_) | StorageError::Json(_) | StorageError::HomeDirMissing
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `$HOME/<DATA_DIR_NAME>` unless overridden.
pub fn default_data_dir() -> StorageResult<PathBuf> {
    let home = dirs::home_dir().ok_or(StorageError::HomeDirMissing)?;
    Ok(home.join(DATA_DIR_NAME))
}

const MEDIA_DIR: &str = "media";

pub struct Storage {
    data_dir: PathBuf,
    storage_path: PathBuf,
    data: StorageData,
}

impl Storage {
    pub fn new(data_dir: Option<PathBuf>) -> StorageResult<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        Ok(Self::with_dir(data_dir))
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let storage_path = data_dir.join("data.json");
        Self {
            data_dir,
            storage_path,
            data: StorageData::default(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the store, or seed a fresh one with the default tasks and
    /// templates and write it out.
    pub fn initialize(&mut self) -> StorageResult<()> {
        fs::create_dir_all(&self.data_dir)?;

        if self.storage_path.exists() {
            let mut file = File::open(&self.storage_path)?;
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            self.data = serde_json::from_str(&contents)?;
            tracing::debug!(path = %self.storage_path.display(), tasks = self.data.tasks.len(), "loaded store");
        } else {
            self.data = StorageData {
                tasks: catalog::default_tasks(today()),
                templates: catalog::default_templates(),
                ..StorageData::default()
            };
            self.save()?;
            tracing::info!(path = %self.storage_path.display(), "seeded new store");
        }

        Ok(())
    }

    pub fn snapshot_for_save(&self) -> (PathBuf, StorageData) {
        (self.storage_path.clone(), self.data.clone())
    }

    pub async fn save_snapshot_async(storage_path: PathBuf, data: StorageData) -> StorageResult<()> {
        tokio::task::spawn_blocking(move || write_atomically(&storage_path, &data))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Persist the current document with a temp file and an atomic rename.
    pub fn save(&self) -> StorageResult<()> {
        write_atomically(&self.storage_path, &self.data)
    }

    // tasks

    pub fn list_tasks(&self) -> &[Task] {
        &self.data.tasks
    }

    pub fn tasks_on(&self, date: NaiveDate) -> Vec<Task> {
        self.data
            .tasks
            .iter()
            .filter(|t| t.date == date)
            .cloned()
            .collect()
    }

    pub fn get_task(&self, id: &str) -> StorageResult<Task> {
        self.data
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| StorageError::TaskNotFound(id.to_string()))
    }

    pub fn add_task(&mut self, new: NewTask) -> StorageResult<Task> {
        let music = new
            .music_id
            .as_deref()
            .map(|id| self.resolve_music(id))
            .transpose()?;
        let time = match new.time.as_deref().map(str::trim) {
            None => "10:00".to_string(),
            Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
                .map_err(|_| StorageError::InvalidTime(raw.to_string()))?
                .format("%H:%M")
                .to_string(),
        };
        let icon = new.icon.unwrap_or_else(|| "Pencil".to_string());
        let duration = new.duration.unwrap_or(30);
        let title = match new.title.trim() {
            "" => "NEW TASK".to_string(),
            t => t.to_uppercase(),
        };
        let task = Task {
            id: Ulid::new().to_string(),
            title,
            subtitle: format!("{duration} min"),
            show_play: music.is_some() || icon == "Timer",
            icon,
            streak: 0,
            completed: false,
            time: Some(time),
            duration: Some(duration),
            music,
            date: new.date.unwrap_or_else(today),
            completed_on: None,
        };
        self.data.tasks.push(task.clone());
        // not persisted until save()
        Ok(task)
    }

    pub fn add_task_from_template(
        &mut self,
        name: &str,
        date: Option<NaiveDate>,
        duration: Option<u32>,
    ) -> StorageResult<Task> {
        let template = self
            .data
            .templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| StorageError::TemplateNotFound(name.to_string()))?;
        self.add_task(NewTask {
            title: template.name,
            icon: Some(template.icon),
            duration,
            date,
            ..NewTask::default()
        })
    }

    pub fn templates(&self) -> &[TaskTemplate] {
        &self.data.templates
    }

    pub fn complete_task(&mut self, id: &str, on: NaiveDate) -> StorageResult<Task> {
        let task = self
            .data
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StorageError::TaskNotFound(id.to_string()))?;
        if task.completed {
            return Err(StorageError::TaskAlreadyCompleted(id.to_string()));
        }
        task.completed = true;
        task.streak += 1;
        task.completed_on = Some(on);
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, id: &str) -> StorageResult<Task> {
        let pos = self
            .data
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StorageError::TaskNotFound(id.to_string()))?;
        Ok(self.data.tasks.remove(pos))
    }

    /// Synthetic, already-completed task for a finished focus session.
    pub fn record_pomodoro(&mut self, work_minutes: u32, on: NaiveDate) -> Task {
        let task = Task {
            id: format!("pomodoro-{}", Ulid::new()),
            title: "Pomodoro Session".to_string(),
            subtitle: format!("{work_minutes} min focus"),
            icon: "Timer".to_string(),
            streak: 1,
            completed: true,
            show_play: false,
            time: None,
            duration: Some(work_minutes),
            music: None,
            date: on,
            completed_on: Some(on),
        };
        self.data.tasks.push(task.clone());
        task
    }

    // media

    pub fn backgrounds(&self) -> &[MediaEntry] {
        &self.data.backgrounds
    }

    pub fn music(&self) -> &[MediaEntry] {
        &self.data.music
    }

    pub fn add_background(&mut self, kind: MediaKind, url: String, title: String) -> MediaEntry {
        let entry = MediaEntry {
            id: Ulid::new().to_string(),
            kind,
            url,
            title,
            storage_path: None,
        };
        self.data.backgrounds.push(entry.clone());
        entry
    }

    pub fn add_music(&mut self, url: String, title: String) -> MediaEntry {
        let entry = MediaEntry {
            id: Ulid::new().to_string(),
            kind: MediaKind::Audio,
            url,
            title,
            storage_path: None,
        };
        self.data.music.push(entry.clone());
        entry
    }

    /// Copy a local file under `<data dir>/media/` and register it as a
    /// background (images, video) or as music (audio).
    pub fn import_media(
        &mut self,
        source: &Path,
        kind: Option<MediaKind>,
        title: Option<String>,
    ) -> StorageResult<MediaEntry> {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();
        let kind = kind.unwrap_or_else(|| MediaKind::from_extension(&ext));
        let id = Ulid::new().to_string();
        let relative = PathBuf::from(MEDIA_DIR).join(format!("{id}.{ext}"));
        let target = self.data_dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &target)?;

        let title = title.unwrap_or_else(|| {
            source
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });
        let entry = MediaEntry {
            id,
            kind,
            url: format!("file://{}", target.display()),
            title,
            storage_path: Some(relative.to_string_lossy().into_owned()),
        };
        tracing::info!(id = %entry.id, kind = kind.as_str(), "imported media");
        match kind {
            MediaKind::Audio => self.data.music.push(entry.clone()),
            MediaKind::Image | MediaKind::Video => self.data.backgrounds.push(entry.clone()),
        }
        Ok(entry)
    }

    fn discard_media_file(&self, entry: &MediaEntry) {
        if let Some(rel) = &entry.storage_path {
            let path = self.data_dir.join(rel);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "could not delete media file");
            }
        }
    }

    pub fn remove_background(&mut self, id: &str) -> StorageResult<MediaEntry> {
        let pos = self
            .data
            .backgrounds
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| StorageError::MediaNotFound(id.to_string()))?;
        let removed = self.data.backgrounds.remove(pos);
        let prefs = &mut self.data.preferences;
        if prefs.pomodoro_background.as_deref() == Some(id) {
            prefs.pomodoro_background = None;
        }
        if prefs.task_session_background.as_deref() == Some(id) {
            prefs.task_session_background = None;
        }
        self.discard_media_file(&removed);
        Ok(removed)
    }

    pub fn remove_music(&mut self, id: &str) -> StorageResult<MediaEntry> {
        let pos = self
            .data
            .music
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StorageError::MediaNotFound(id.to_string()))?;
        let removed = self.data.music.remove(pos);
        self.discard_media_file(&removed);
        Ok(removed)
    }

    /// Bundled tracks first, then the user's own library.
    pub fn resolve_music(&self, id: &str) -> StorageResult<MusicRef> {
        if let Some(track) = catalog::find_bundled_track(id) {
            return Ok(track.to_ref());
        }
        self.data
            .music
            .iter()
            .find(|m| m.id == id)
            .map(|m| MusicRef {
                id: m.id.clone(),
                title: m.title.clone(),
                duration: "Custom".to_string(),
            })
            .ok_or_else(|| StorageError::UnknownMusic(id.to_string()))
    }

    pub fn set_session_background(
        &mut self,
        slot: BackgroundSlot,
        id: Option<String>,
    ) -> StorageResult<Option<MediaEntry>> {
        let entry = match id.as_deref() {
            Some(id) => Some(
                self.data
                    .backgrounds
                    .iter()
                    .find(|b| b.id == id)
                    .cloned()
                    .ok_or_else(|| StorageError::MediaNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let prefs = &mut self.data.preferences;
        match slot {
            BackgroundSlot::Pomodoro => prefs.pomodoro_background = id,
            BackgroundSlot::TaskSession => prefs.task_session_background = id,
        }
        Ok(entry)
    }

    pub fn session_background(&self, slot: BackgroundSlot) -> Option<&MediaEntry> {
        let prefs = &self.data.preferences;
        let id = match slot {
            BackgroundSlot::Pomodoro => prefs.pomodoro_background.as_deref(),
            BackgroundSlot::TaskSession => prefs.task_session_background.as_deref(),
        }?;
        self.data.backgrounds.iter().find(|b| b.id == id)
    }

    // profile & preferences

    pub fn profile(&self) -> &UserProfile {
        &self.data.profile
    }

    pub fn update_profile(&mut self, profile: UserProfile) -> StorageResult<UserProfile> {
        if profile.name.trim().is_empty() {
            return Err(StorageError::InvalidProfile("name is required".to_string()));
        }
        let well_formed = profile
            .email
            .split_once('@')
            .is_some_and(|(user, host)| !user.is_empty() && !host.is_empty() && !host.contains('@'));
        if !well_formed {
            return Err(StorageError::InvalidProfile(format!(
                "'{}' is not an email address",
                profile.email
            )));
        }
        self.data.profile = profile.clone();
        Ok(profile)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.data.preferences
    }

    pub fn set_theme(&mut self, name: &str) -> StorageResult<&'static catalog::Theme> {
        let theme =
            catalog::find_theme(name).ok_or_else(|| StorageError::UnknownTheme(name.to_string()))?;
        self.data.preferences.theme = theme.name.to_string();
        Ok(theme)
    }

    pub fn set_notifications(&mut self, settings: NotificationSettings) {
        self.data.preferences.notifications = settings;
    }

    pub fn set_pomodoro_settings(&mut self, settings: PomodoroSettings) -> StorageResult<()> {
        timer::validate_settings(&settings)?;
        self.data.preferences.pomodoro = settings;
        Ok(())
    }
}

fn write_atomically(storage_path: &Path, data: &StorageData) -> StorageResult<()> {
    if let Some(parent) = storage_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = storage_path.with_extension("tmp");
    let mut f = File::create(&temp)?;
    let content = serde_json::to_string_pretty(data)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(temp, storage_path)?;
    Ok(())
}
