use chrono::{Datelike, Local, NaiveDate};
use rmcp::RoleServer;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog::{self, THEMES};
use crate::forest::{self, DEFAULT_SEED, ForestLayout, ForestStats};
use crate::prompts::{SERVER_INSTRUCTIONS, parse_task_plan};
use crate::state::AppState;
use crate::stats::{self, MonthView, ProgressSummary, REMINDER_LEAD_MINUTES};
use crate::storage::{self, Storage};
use crate::timer::SessionKind;
use crate::types::{
    BackgroundSlot, MediaKind, NewTask, NotificationSettings, PomodoroSettings, UserProfile,
};

// Tool argument types

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ListTasksArgs {
    /// YYYY-MM-DD; defaults to today
    #[serde(default)]
    pub date: Option<String>,
    /// Return every stored task regardless of date
    #[serde(default)]
    pub all: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskArgs {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// HH:MM
    #[serde(default)]
    pub time: Option<String>,
    /// Minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub music_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TemplateTaskArgs {
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub duration: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ImportTasksArgs {
    pub plan: String,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ForestLayoutArgs {
    #[serde(default)]
    pub seed: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateArgs {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct CalendarArgs {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u32>,
    /// Months to move from that month; negative goes back
    #[serde(default)]
    pub offset: Option<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemindersArgs {
    #[serde(default)]
    pub lead_minutes: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SelectSessionArgs {
    /// work, short-break or long-break
    pub kind: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroConfigArgs {
    #[serde(default)]
    pub work_minutes: Option<u32>,
    #[serde(default)]
    pub short_break_minutes: Option<u32>,
    #[serde(default)]
    pub long_break_minutes: Option<u32>,
    #[serde(default)]
    pub long_break_interval: Option<u32>,
    #[serde(default)]
    pub auto_continue: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ThemeArgs {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationArgs {
    #[serde(default)]
    pub reminders: Option<bool>,
    #[serde(default)]
    pub auto_complete: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct AddBackgroundArgs {
    /// image or video
    pub kind: String,
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct AddMusicArgs {
    pub url: String,
    pub title: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ImportMediaArgs {
    /// Local file to copy into the media library
    pub path: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SessionBackgroundArgs {
    /// pomodoro or task-session
    pub slot: String,
    /// Background id; omit to clear
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileArgs {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub hobbies: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Result<NaiveDate, ErrorData> {
    match raw {
        None => Ok(storage::today()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
            ErrorData::invalid_params(format!("invalid date '{s}': {e}"), None)
        }),
    }
}

fn parse_arg<T: std::str::FromStr<Err = String>>(raw: &str) -> Result<T, ErrorData> {
    raw.parse().map_err(|e: String| ErrorData::invalid_params(e, None))
}

fn json_result(value: impl Serialize) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}

fn layout_json(storage: &Storage, seed: u32) -> serde_json::Value {
    let layout = ForestLayout::generate(seed);
    let planted = layout.plant(&forest::completed_tasks(storage.list_tasks()));
    json!({
        "seed": layout.seed(),
        "planted": planted,
        "stats": ForestStats::from_tasks(storage.list_tasks()),
    })
}

#[derive(Clone)]
pub struct TaskForestServer {
    state: AppState,
    pub tool_router: ToolRouter<TaskForestServer>,
}

#[tool_router]
impl TaskForestServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    async fn persist(&self) -> Result<(), ErrorData> {
        self.state.persist().await.map_err(ErrorData::from)
    }

    // tasks

    #[tool(description = "List tasks for a day (default today), or all tasks")]
    async fn list_tasks(
        &self,
        Parameters(args): Parameters<ListTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        if args.all {
            return json_result(storage.list_tasks());
        }
        let date = parse_date(args.date.as_deref())?;
        json_result(storage.tasks_on(date))
    }

    #[tool(description = "Create a task")]
    async fn add_task(
        &self,
        Parameters(args): Parameters<AddTaskArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let date = args.date.as_deref().map(|d| parse_date(Some(d))).transpose()?;
        let task = self.state.storage.lock().await.add_task(NewTask {
            title: args.title,
            icon: args.icon,
            time: args.time,
            duration: args.duration,
            music_id: args.music_id,
            date,
        })?;
        self.persist().await?;
        json_result(task)
    }

    #[tool(description = "Create a task from a named template (see list_templates)")]
    async fn add_task_from_template(
        &self,
        Parameters(args): Parameters<TemplateTaskArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let date = args.date.as_deref().map(|d| parse_date(Some(d))).transpose()?;
        let task = self
            .state
            .storage
            .lock()
            .await
            .add_task_from_template(&args.name, date, args.duration)?;
        self.persist().await?;
        json_result(task)
    }

    #[tool(description = "List task templates")]
    async fn list_templates(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.state.storage.lock().await.templates())
    }

    #[tool(description = "Mark a task complete and extend its streak")]
    async fn complete_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let task = self
            .state
            .storage
            .lock()
            .await
            .complete_task(&args.id, storage::today())?;
        self.persist().await?;
        json_result(task)
    }

    #[tool(description = "Delete a task")]
    async fn delete_task(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let task = self.state.storage.lock().await.delete_task(&args.id)?;
        self.persist().await?;
        json_result(json!({ "deleted": task.id }))
    }

    #[tool(description = "Create tasks from a plain-text plan, one per line or paragraph. \
        Inline `NN min`, `@HH:MM` and `#Icon` set duration, time and icon")]
    async fn import_tasks(
        &self,
        Parameters(args): Parameters<ImportTasksArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let date = args.date.as_deref().map(|d| parse_date(Some(d))).transpose()?;
        let parsed = parse_task_plan(&args.plan);
        if parsed.is_empty() {
            return Err(ErrorData::invalid_params("plan contains no tasks", None));
        }
        let mut created = Vec::with_capacity(parsed.len());
        {
            let mut storage = self.state.storage.lock().await;
            for mut new in parsed {
                new.date = new.date.or(date);
                created.push(storage.add_task(new)?);
            }
        }
        self.persist().await?;
        json_result(created)
    }

    // forest & progress

    #[tool(description = "Forest layout: one planted element per completed task")]
    async fn forest_layout(
        &self,
        Parameters(args): Parameters<ForestLayoutArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        json_result(layout_json(&storage, args.seed.unwrap_or(DEFAULT_SEED)))
    }

    #[tool(description = "Total trees, longest streak and tasks left")]
    async fn forest_stats(&self) -> Result<CallToolResult, ErrorData> {
        json_result(ForestStats::from_tasks(self.state.storage.lock().await.list_tasks()))
    }

    #[tool(description = "Completed vs total tasks; pass a date to limit to one day")]
    async fn progress_summary(
        &self,
        Parameters(args): Parameters<DateArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        let summary = match args.date.as_deref() {
            Some(d) => ProgressSummary::from_tasks(&storage.tasks_on(parse_date(Some(d))?)),
            None => ProgressSummary::from_tasks(storage.list_tasks()),
        };
        json_result(summary)
    }

    #[tool(description = "Completions per day for the last seven days")]
    async fn weekly_activity(&self) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        json_result(stats::weekly_activity(storage.list_tasks(), storage::today()))
    }

    #[tool(description = "Month calendar with the days that have tasks")]
    async fn calendar_month(
        &self,
        Parameters(args): Parameters<CalendarArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let today = storage::today();
        let year = args.year.unwrap_or(today.year());
        let month = args.month.unwrap_or(today.month());
        let storage = self.state.storage.lock().await;
        let offset = args.offset.unwrap_or(0);
        let view = MonthView::new(year, month, storage.list_tasks())
            .and_then(|v| v.shifted(offset, storage.list_tasks()))
            .ok_or_else(|| {
                ErrorData::invalid_params(
                    format!("invalid month {year}-{month} (offset {offset})"),
                    None,
                )
            })?;
        json_result(json!({ "view": view, "weeks": view.weeks() }))
    }

    #[tool(description = "Open tasks starting within the next few minutes")]
    async fn due_reminders(
        &self,
        Parameters(args): Parameters<RemindersArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        if !storage.preferences().notifications.reminders {
            return json_result(json!({ "enabled": false, "due": [] }));
        }
        let lead_minutes = args.lead_minutes.unwrap_or(REMINDER_LEAD_MINUTES);
        let due = stats::reminder_lead(lead_minutes)
            .and_then(|lead| {
                stats::due_reminders(storage.list_tasks(), Local::now().naive_local(), lead)
            })
            .ok_or_else(|| {
                ErrorData::invalid_params(
                    format!("lead_minutes out of range: {lead_minutes}"),
                    None,
                )
            })?;
        json_result(json!({ "enabled": true, "due": due }))
    }

    // pomodoro

    #[tool(description = "Current Pomodoro state")]
    async fn pomodoro_status(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.state.pomodoro.lock().await.snapshot())
    }

    #[tool(description = "Start or resume the Pomodoro timer")]
    async fn pomodoro_start(&self) -> Result<CallToolResult, ErrorData> {
        let mut timer = self.state.pomodoro.lock().await;
        timer.start();
        json_result(timer.snapshot())
    }

    #[tool(description = "Pause the Pomodoro timer")]
    async fn pomodoro_pause(&self) -> Result<CallToolResult, ErrorData> {
        let mut timer = self.state.pomodoro.lock().await;
        timer.pause();
        json_result(timer.snapshot())
    }

    #[tool(description = "Stop the Pomodoro timer and restore the full session length")]
    async fn pomodoro_reset(&self) -> Result<CallToolResult, ErrorData> {
        let mut timer = self.state.pomodoro.lock().await;
        timer.reset();
        json_result(timer.snapshot())
    }

    #[tool(description = "Switch to a work, short-break or long-break session")]
    async fn pomodoro_select(
        &self,
        Parameters(args): Parameters<SelectSessionArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let kind: SessionKind = parse_arg(&args.kind)?;
        let mut timer = self.state.pomodoro.lock().await;
        timer.select(kind);
        json_result(timer.snapshot())
    }

    #[tool(description = "Change Pomodoro durations, long-break interval or auto-continue")]
    async fn pomodoro_configure(
        &self,
        Parameters(args): Parameters<PomodoroConfigArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let settings = {
            let mut storage = self.state.storage.lock().await;
            let current = storage.preferences().pomodoro;
            let settings = PomodoroSettings {
                work_minutes: args.work_minutes.unwrap_or(current.work_minutes),
                short_break_minutes: args.short_break_minutes.unwrap_or(current.short_break_minutes),
                long_break_minutes: args.long_break_minutes.unwrap_or(current.long_break_minutes),
                long_break_interval: args.long_break_interval.unwrap_or(current.long_break_interval),
                auto_continue: args.auto_continue.unwrap_or(current.auto_continue),
            };
            storage.set_pomodoro_settings(settings)?;
            settings
        };
        let snapshot = {
            let mut timer = self.state.pomodoro.lock().await;
            timer.apply_settings(settings)?;
            timer.snapshot()
        };
        self.persist().await?;
        json_result(snapshot)
    }

    // preferences

    #[tool(description = "List the available themes")]
    async fn list_themes(&self) -> Result<CallToolResult, ErrorData> {
        json_result(THEMES)
    }

    #[tool(description = "Set the active theme by name")]
    async fn set_theme(
        &self,
        Parameters(args): Parameters<ThemeArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let theme = *self.state.storage.lock().await.set_theme(&args.name)?;
        self.persist().await?;
        json_result(theme)
    }

    #[tool(description = "Theme, notification and Pomodoro preferences")]
    async fn get_preferences(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.state.storage.lock().await.preferences())
    }

    #[tool(description = "Turn reminders or auto-complete on or off")]
    async fn set_notifications(
        &self,
        Parameters(args): Parameters<NotificationArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let settings = {
            let mut storage = self.state.storage.lock().await;
            let current = storage.preferences().notifications;
            let settings = NotificationSettings {
                reminders: args.reminders.unwrap_or(current.reminders),
                auto_complete: args.auto_complete.unwrap_or(current.auto_complete),
            };
            storage.set_notifications(settings);
            settings
        };
        self.persist().await?;
        json_result(settings)
    }

    // media

    #[tool(description = "List session backgrounds")]
    async fn list_backgrounds(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.state.storage.lock().await.backgrounds())
    }

    #[tool(description = "Add a background image or video by URL")]
    async fn add_background(
        &self,
        Parameters(args): Parameters<AddBackgroundArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let kind: MediaKind = parse_arg(&args.kind)?;
        if kind == MediaKind::Audio {
            return Err(ErrorData::invalid_params(
                "backgrounds must be image or video; use add_music for audio",
                None,
            ));
        }
        let entry = self
            .state
            .storage
            .lock()
            .await
            .add_background(kind, args.url, args.title);
        self.persist().await?;
        json_result(entry)
    }

    #[tool(description = "Remove a background; session selections using it are cleared")]
    async fn remove_background(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let entry = self.state.storage.lock().await.remove_background(&args.id)?;
        self.persist().await?;
        json_result(json!({ "deleted": entry.id }))
    }

    #[tool(description = "Copy a local image, video or audio file into the media library")]
    async fn import_media(
        &self,
        Parameters(args): Parameters<ImportMediaArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let kind = args.kind.as_deref().map(parse_arg::<MediaKind>).transpose()?;
        let entry = self.state.storage.lock().await.import_media(
            std::path::Path::new(&args.path),
            kind,
            args.title,
        )?;
        self.persist().await?;
        json_result(entry)
    }

    #[tool(description = "Choose the background for the pomodoro or task-session screen")]
    async fn set_session_background(
        &self,
        Parameters(args): Parameters<SessionBackgroundArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let slot: BackgroundSlot = parse_arg(&args.slot)?;
        let entry = self
            .state
            .storage
            .lock()
            .await
            .set_session_background(slot, args.id)?;
        self.persist().await?;
        json_result(json!({ "slot": slot, "background": entry }))
    }

    #[tool(description = "List bundled meditation music and the user's own tracks")]
    async fn list_music(&self) -> Result<CallToolResult, ErrorData> {
        let storage = self.state.storage.lock().await;
        json_result(json!({
            "bundled": catalog::MEDITATION_MUSIC,
            "custom": storage.music(),
        }))
    }

    #[tool(description = "Add a music track by URL")]
    async fn add_music(
        &self,
        Parameters(args): Parameters<AddMusicArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let entry = self.state.storage.lock().await.add_music(args.url, args.title);
        self.persist().await?;
        json_result(entry)
    }

    #[tool(description = "Remove a music track from the user's library")]
    async fn remove_music(
        &self,
        Parameters(args): Parameters<IdArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let entry = self.state.storage.lock().await.remove_music(&args.id)?;
        self.persist().await?;
        json_result(json!({ "deleted": entry.id }))
    }

    // profile

    #[tool(description = "The user's profile")]
    async fn get_profile(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.state.storage.lock().await.profile())
    }

    #[tool(description = "Replace the user's profile; name and a valid email are required")]
    async fn update_profile(
        &self,
        Parameters(args): Parameters<ProfileArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        let profile = self.state.storage.lock().await.update_profile(UserProfile {
            name: args.name,
            email: args.email,
            mobile: args.mobile,
            hobbies: args.hobbies,
            avatar_url: args.avatar_url,
        })?;
        self.persist().await?;
        json_result(profile)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for TaskForestServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("forest://tasks", "Tasks").no_annotation(),
                RawResource::new("forest://layout", "Forest Layout").no_annotation(),
                RawResource::new("forest://themes", "Themes").no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let body = match uri.as_str() {
            "forest://tasks" => serde_json::to_string(self.state.storage.lock().await.list_tasks()),
            "forest://layout" => {
                serde_json::to_string(&layout_json(&*self.state.storage.lock().await, DEFAULT_SEED))
            }
            "forest://themes" => serde_json::to_string(THEMES),
            _ => {
                return Err(ErrorData::resource_not_found(
                    "Unknown resource URI",
                    Some(json!({ "uri": uri })),
                ));
            }
        }
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(body, uri)],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: rmcp::service::RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, ErrorData> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn server() -> (TempDir, TaskForestServer) {
        let dir = TempDir::new().unwrap();
        let mut storage = Storage::with_dir(dir.path());
        storage.initialize().unwrap();
        let state = AppState::from_storage(storage).unwrap();
        (dir, TaskForestServer::new(state))
    }

    fn text(result: &CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(result).unwrap();
        serde_json::from_str(value["content"][0]["text"].as_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn add_and_complete_through_tools() {
        let (_dir, server) = server();
        let added = server
            .add_task(Parameters(AddTaskArgs {
                title: "stretch".into(),
                icon: None,
                time: Some("07:00".into()),
                duration: Some(10),
                music_id: None,
                date: None,
            }))
            .await
            .unwrap();
        let id = text(&added)["id"].as_str().unwrap().to_string();

        let done = server
            .complete_task(Parameters(IdArgs { id: id.clone() }))
            .await
            .unwrap();
        assert_eq!(text(&done)["streak"], 1);

        let again = server.complete_task(Parameters(IdArgs { id })).await;
        assert_eq!(again.unwrap_err().code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn bad_date_is_invalid_params() {
        let (_dir, server) = server();
        let err = server
            .list_tasks(Parameters(ListTasksArgs {
                date: Some("19/10/2026".into()),
                all: false,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn import_creates_one_task_per_line() {
        let (_dir, server) = server();
        let result = server
            .import_tasks(Parameters(ImportTasksArgs {
                plan: "- Walk 20 min\n- Read #BookOpen".into(),
                date: Some("2026-10-20".into()),
            }))
            .await
            .unwrap();
        let created = text(&result);
        assert_eq!(created.as_array().unwrap().len(), 2);
        assert_eq!(created[0]["date"], "2026-10-20");
        assert_eq!(created[1]["icon"], "BookOpen");
    }

    #[tokio::test]
    async fn configure_updates_timer_and_preferences() {
        let (_dir, server) = server();
        let result = server
            .pomodoro_configure(Parameters(PomodoroConfigArgs {
                work_minutes: Some(50),
                short_break_minutes: None,
                long_break_minutes: None,
                long_break_interval: None,
                auto_continue: None,
            }))
            .await
            .unwrap();
        assert_eq!(text(&result)["remainingSecs"], 3000);
        let prefs = server.state.storage.lock().await.preferences().clone();
        assert_eq!(prefs.pomodoro.work_minutes, 50);

        let err = server
            .pomodoro_configure(Parameters(PomodoroConfigArgs {
                work_minutes: Some(0),
                short_break_minutes: None,
                long_break_minutes: None,
                long_break_interval: None,
                auto_continue: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn forest_grows_with_completions() {
        let (_dir, server) = server();
        server
            .complete_task(Parameters(IdArgs { id: "1".into() }))
            .await
            .unwrap();
        let result = server
            .forest_layout(Parameters(ForestLayoutArgs { seed: None }))
            .await
            .unwrap();
        let layout = text(&result);
        assert_eq!(layout["planted"].as_array().unwrap().len(), 1);
        assert_eq!(layout["stats"]["totalTrees"], 1);
    }

    #[tokio::test]
    async fn reminder_lead_out_of_range_is_invalid_params() {
        let (_dir, server) = server();
        for lead in [-1, 1_000_000_000_000, i64::MAX] {
            let err = server
                .due_reminders(Parameters(RemindersArgs {
                    lead_minutes: Some(lead),
                }))
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        }
        let ok = server
            .due_reminders(Parameters(RemindersArgs { lead_minutes: None }))
            .await
            .unwrap();
        assert_eq!(text(&ok)["enabled"], true);
    }

    #[tokio::test]
    async fn bad_task_time_is_invalid_params() {
        let (_dir, server) = server();
        let err = server
            .add_task(Parameters(AddTaskArgs {
                title: "stretch".into(),
                icon: None,
                time: Some("7pm".into()),
                duration: None,
                music_id: None,
                date: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn calendar_month_navigates_by_offset() {
        let (_dir, server) = server();
        let result = server
            .calendar_month(Parameters(CalendarArgs {
                year: Some(2026),
                month: Some(1),
                offset: Some(-1),
            }))
            .await
            .unwrap();
        let view = text(&result);
        assert_eq!(view["view"]["year"], 2025);
        assert_eq!(view["view"]["month"], 12);

        let err = server
            .calendar_month(Parameters(CalendarArgs {
                year: Some(2026),
                month: Some(1),
                offset: Some(i32::MAX),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }
}
