mod catalog;
mod cli;
mod console;
mod error;
mod forest;
mod metadata;
mod prompts;
mod server;
mod state;
mod stats;
mod storage;
mod timer;
mod transport;
mod types;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::error::ServiceResult;
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::state::AppState;
use crate::storage::Storage;
use crate::transport::ServerStatus;

#[tokio::main]
async fn main() {
    // Logs go to stderr so the stdio transport keeps stdout to itself.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn open_storage(cli_dir: Option<std::path::PathBuf>) -> ServiceResult<Storage> {
    let mut storage = Storage::new(cli_dir)?;
    storage.initialize()?;
    Ok(storage)
}

async fn run(cli: Cli) -> ServiceResult<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => storage::default_data_dir()?,
    };

    match cli.command {
        Command::Serve { args, files } => {
            let files = files.resolve(&data_dir);
            let state = AppState::load(Some(data_dir))?;
            transport::serve(args, files, state).await
        }
        Command::Status(files) => {
            match transport::status(&files.resolve(&data_dir))? {
                ServerStatus::Running(info) => {
                    println!("{} pid {} since {}", "running".green().bold(), info.pid, info.started_at);
                    println!("  stdio: {}", info.stdio);
                    if let Some(addr) = info.http_addr {
                        println!("  http:  http://{addr}/");
                    }
                    println!("  data:  {}", info.data_dir);
                }
                ServerStatus::Stale(info) => println!(
                    "{} (runtime file names pid {}, which is not running)",
                    "stopped".yellow().bold(),
                    info.pid
                ),
                ServerStatus::Stopped => println!("{}", "stopped".yellow().bold()),
            }
            Ok(())
        }
        Command::Shutdown(files) => {
            match transport::shutdown(&files.resolve(&data_dir))? {
                Some(pid) => println!("{} pid {pid}", "stopped".green().bold()),
                None => println!("{}", "no running server".yellow()),
            }
            Ok(())
        }
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            Ok(())
        }
        Command::Task { action } => console::task(&mut open_storage(Some(data_dir))?, action),
        Command::Session { task_id } => {
            console::session(&mut open_storage(Some(data_dir))?, &task_id).await
        }
        Command::Quick {
            title,
            subtitle,
            minutes,
        } => console::quick(title, subtitle, minutes).await,
        Command::Pomodoro { cycles } => {
            console::pomodoro(&mut open_storage(Some(data_dir))?, cycles).await
        }
        Command::Forest {
            seed,
            width,
            height,
        } => {
            console::forest(&open_storage(Some(data_dir))?, seed, width, height);
            Ok(())
        }
        Command::Progress { date } => {
            console::progress(&open_storage(Some(data_dir))?, date.as_deref())
        }
        Command::Calendar {
            year,
            month,
            offset,
        } => console::calendar(&open_storage(Some(data_dir))?, year, month, offset),
        Command::Reminders { lead_minutes } => {
            console::reminders(&open_storage(Some(data_dir))?, lead_minutes)
        }
        Command::Theme { action } => console::theme(&mut open_storage(Some(data_dir))?, action),
        Command::Media { action } => console::media(&mut open_storage(Some(data_dir))?, action),
        Command::Profile { action } => {
            console::profile(&mut open_storage(Some(data_dir))?, action)
        }
        Command::Config => console::config(&mut open_storage(Some(data_dir))?),
    }
}
