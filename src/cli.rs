use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    /// Where tasks, preferences and imported media are kept
    #[arg(long, env = "TASK_FOREST_HOME", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the MCP server
    Serve {
        #[command(flatten)]
        args: ServeArgs,
        #[command(flatten)]
        files: RuntimeFileArgs,
    },
    /// Show whether a server is running
    Status(RuntimeFileArgs),
    /// Stop a running server (using the pid file)
    Shutdown(RuntimeFileArgs),
    /// Print version information
    Version,
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Run a task's focus countdown, then offer to mark it done
    Session {
        task_id: String,
    },
    /// Run an unsaved quick session
    Quick {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        subtitle: Option<String>,
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Run Pomodoro cycles in the terminal (Ctrl-C to stop)
    Pomodoro {
        /// Stop after this many focus sessions
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        cycles: Option<u32>,
    },
    /// Draw the forest grown from completed tasks
    Forest {
        #[arg(long, default_value_t = crate::forest::DEFAULT_SEED)]
        seed: u32,
        #[arg(long, default_value_t = 60)]
        width: usize,
        #[arg(long, default_value_t = 20)]
        height: usize,
    },
    /// Completion progress and the last seven days of activity
    Progress {
        /// YYYY-MM-DD; limits the summary to one day
        #[arg(long)]
        date: Option<String>,
    },
    /// Month calendar with task days marked
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        /// Months to move from that month; negative goes back
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,
    },
    /// Tasks starting in the next few minutes
    Reminders {
        #[arg(long, default_value_t = crate::stats::REMINDER_LEAD_MINUTES)]
        lead_minutes: i64,
    },
    /// List or choose a theme
    Theme {
        #[command(subcommand)]
        action: ThemeCommand,
    },
    /// Backgrounds and music
    Media {
        #[command(subcommand)]
        action: MediaCommand,
    },
    /// Show or edit the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Open an interactive editor for preferences
    Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// Title; ignored with --template
        #[arg(required_unless_present = "template")]
        title: Option<String>,
        /// Create from a named template
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        /// HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Minutes
        #[arg(long)]
        duration: Option<u32>,
        /// Music id (bundled 1-5 or a library id)
        #[arg(long)]
        music: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<String>,
    },
    /// List tasks for a day (default today)
    List {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Mark a task complete
    Done { id: String },
    /// Delete a task
    Delete { id: String },
    /// List task templates
    Templates,
    /// Create tasks from a plain-text plan (file or stdin)
    Import {
        file: Option<PathBuf>,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ThemeCommand {
    List,
    Set { name: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum MediaCommand {
    /// List backgrounds and music
    List,
    /// Add a background by URL
    AddBackground {
        /// image or video
        #[arg(long, default_value = "image")]
        kind: String,
        url: String,
        title: String,
    },
    /// Add a music track by URL
    AddMusic { url: String, title: String },
    /// Copy a local file into the media library
    Import {
        path: PathBuf,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Remove a background or music entry
    Remove { id: String },
    /// Choose the background for a session screen; omit the id to clear it
    Use {
        /// pomodoro or task-session
        slot: String,
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    Show,
    Edit,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Enable stdio transport
    #[arg(long, env = "MCP_ENABLE_STDIO", default_value_t = true, action = ArgAction::Set)]
    pub enable_stdio: bool,

    /// Enable streamable HTTP transport
    #[arg(long, env = "MCP_ENABLE_HTTP", default_value_t = false, action = ArgAction::Set)]
    pub enable_http: bool,

    /// HTTP bind address (streamable HTTP)
    #[arg(long, env = "MCP_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub http_addr: String,
}

impl ServeArgs {
    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enable_stdio && !self.enable_http {
            return Err("Enable at least one transport (stdio or http)".to_string());
        }
        if self.enable_http {
            self.http_addr
                .parse::<SocketAddr>()
                .map_err(|e| format!("Invalid MCP_HTTP_ADDR '{}': {e}", self.http_addr))?;
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct RuntimeFileArgs {
    /// PID file path for shutdown coordination (default: <data dir>/server.pid)
    #[arg(long, env = "MCP_PID_FILE")]
    pub pid_file: Option<PathBuf>,

    /// Runtime info file used by status (default: <data dir>/runtime.json)
    #[arg(long, env = "MCP_RUNTIME_INFO_FILE")]
    pub runtime_info_file: Option<PathBuf>,
}

/// Runtime file locations with defaults filled in.
#[derive(Debug, Clone)]
pub struct RuntimeFiles {
    pub pid_file: PathBuf,
    pub runtime_info_file: PathBuf,
}

impl RuntimeFileArgs {
    pub fn resolve(self, data_dir: &std::path::Path) -> RuntimeFiles {
        RuntimeFiles {
            pid_file: self.pid_file.unwrap_or_else(|| data_dir.join("server.pid")),
            runtime_info_file: self
                .runtime_info_file
                .unwrap_or_else(|| data_dir.join("runtime.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_needs_a_transport() {
        let cli = Cli::try_parse_from(["task-forest", "serve", "--enable-stdio", "false"]).unwrap();
        let Command::Serve { args, .. } = cli.command else {
            panic!("expected serve");
        };
        assert!(args.validate().is_err());

        let ok = ServeArgs {
            enable_stdio: false,
            enable_http: true,
            http_addr: "127.0.0.1:0".into(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn template_replaces_title() {
        let cli =
            Cli::try_parse_from(["task-forest", "task", "add", "--template", "Swim"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Task {
                action: TaskCommand::Add { title: None, template: Some(_), .. }
            }
        ));
        assert!(Cli::try_parse_from(["task-forest", "task", "add"]).is_err());
    }

    #[test]
    fn pomodoro_cycles_must_be_positive() {
        assert!(Cli::try_parse_from(["task-forest", "pomodoro", "--cycles", "0"]).is_err());
        let cli = Cli::try_parse_from(["task-forest", "pomodoro", "--cycles", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Pomodoro { cycles: Some(2) }));
    }

    #[test]
    fn calendar_offset_accepts_negative_months() {
        let cli = Cli::try_parse_from(["task-forest", "calendar", "--offset", "-2"]).unwrap();
        assert!(matches!(cli.command, Command::Calendar { offset: -2, .. }));
        let cli = Cli::try_parse_from(["task-forest", "calendar"]).unwrap();
        assert!(matches!(cli.command, Command::Calendar { offset: 0, .. }));
    }
}
