use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use chrono::{DateTime, Utc};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto::Builder,
    service::TowerToHyperService,
};
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use rmcp::{ServiceExt, transport::stdio};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::{RuntimeFiles, ServeArgs};
use crate::error::{ServiceError, ServiceResult};
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::server::TaskForestServer;
use crate::state::AppState;

/// Written next to the pid file while a server is running.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub pid: u32,
    pub version: String,
    pub stdio: bool,
    #[serde(default)]
    pub http_addr: Option<String>,
    pub data_dir: String,
    pub started_at: DateTime<Utc>,
}

impl RuntimeInfo {
    pub fn read(path: &Path) -> ServiceResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn write_runtime_files(files: &RuntimeFiles, info: &RuntimeInfo) -> ServiceResult<()> {
    for path in [&files.pid_file, &files.runtime_info_file] {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&files.pid_file, info.pid.to_string())?;
    fs::write(&files.runtime_info_file, serde_json::to_string_pretty(info)?)?;
    Ok(())
}

fn remove_runtime_files(files: &RuntimeFiles) {
    for path in [&files.pid_file, &files.runtime_info_file] {
        if let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "could not remove runtime file");
        }
    }
}

async fn spawn_http(
    state: AppState,
    addr: SocketAddr,
    token: CancellationToken,
) -> ServiceResult<(SocketAddr, JoinHandle<()>)> {
    let http_service = TowerToHyperService::new(StreamableHttpService::new(
        move || Ok(TaskForestServer::new(state.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    ));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "streamable HTTP transport listening on /");

    let handle = tokio::spawn(async move {
        loop {
            let stream = tokio::select! {
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((s, _)) => s,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            let io = TokioIo::new(stream);
            let service = http_service.clone();
            tokio::spawn(async move {
                if let Err(e) = Builder::new(TokioExecutor::default())
                    .serve_connection(io, service)
                    .await
                {
                    tracing::debug!(error = %e, "http connection closed with error");
                }
            });
        }
    });
    Ok((local, handle))
}

/// A disabled transport never finishes.
async fn join_or_pending(handle: Option<JoinHandle<()>>) {
    match handle {
        Some(h) => {
            let _ = h.await;
        }
        None => futures::future::pending().await,
    }
}

/// Run the MCP server until stdin closes (stdio), Ctrl-C, or the HTTP
/// listener stops.
pub async fn serve(args: ServeArgs, files: RuntimeFiles, state: AppState) -> ServiceResult<()> {
    args.validate().map_err(ServiceError::InvalidArgs)?;
    let data_dir = state.storage.lock().await.data_dir().display().to_string();
    tracing::info!(name = PKG_NAME, version = PKG_VERSION, data_dir = %data_dir, "starting server");

    let token = CancellationToken::new();
    let ticker = state.spawn_ticker(token.child_token());

    let mut http_addr = None;
    let mut http_handle = None;
    if args.enable_http {
        let addr: SocketAddr = args
            .http_addr
            .parse()
            .map_err(|e| ServiceError::InvalidArgs(format!("{}: {e}", args.http_addr)))?;
        let (local, handle) = spawn_http(state.clone(), addr, token.child_token()).await?;
        http_addr = Some(local.to_string());
        http_handle = Some(handle);
    }

    let std_handle = if args.enable_stdio {
        let running = TaskForestServer::new(state.clone())
            .serve(stdio())
            .await
            .map_err(|e| ServiceError::FromString(format!("stdio transport failed: {e}")))?;
        Some(tokio::spawn(async move {
            let _ = running.waiting().await;
        }))
    } else {
        None
    };

    let info = RuntimeInfo {
        pid: std::process::id(),
        version: PKG_VERSION.to_string(),
        stdio: args.enable_stdio,
        http_addr,
        data_dir,
        started_at: Utc::now(),
    };
    write_runtime_files(&files, &info)?;

    tokio::select! {
        _ = join_or_pending(std_handle) => tracing::info!("stdio client disconnected"),
        _ = join_or_pending(http_handle) => tracing::warn!("http listener stopped"),
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupt received"),
    }

    token.cancel();
    let _ = ticker.await;
    state.persist().await?;
    remove_runtime_files(&files);
    tracing::info!("server stopped");
    Ok(())
}

fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

pub enum ServerStatus {
    Running(RuntimeInfo),
    Stale(RuntimeInfo),
    Stopped,
}

pub fn status(files: &RuntimeFiles) -> ServiceResult<ServerStatus> {
    if !files.runtime_info_file.exists() {
        return Ok(ServerStatus::Stopped);
    }
    let info = RuntimeInfo::read(&files.runtime_info_file)?;
    if process_alive(info.pid) {
        Ok(ServerStatus::Running(info))
    } else {
        Ok(ServerStatus::Stale(info))
    }
}

/// Terminate the server named by the pid file. Returns the pid when a
/// process was signalled.
pub fn shutdown(files: &RuntimeFiles) -> ServiceResult<Option<u32>> {
    let raw = match fs::read_to_string(&files.pid_file) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let pid: u32 = raw.trim().parse().map_err(|e| {
        ServiceError::FromString(format!("bad pid file {}: {e}", files.pid_file.display()))
    })?;

    let sys_pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
    let signalled = match sys.process(sys_pid) {
        Some(process) => process.kill(),
        None => false,
    };
    remove_runtime_files(files);
    if signalled {
        tracing::info!(pid, "server terminated");
        Ok(Some(pid))
    } else {
        tracing::warn!(pid, "no running process for pid file; removed stale files");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files(dir: &TempDir) -> RuntimeFiles {
        RuntimeFiles {
            pid_file: dir.path().join("server.pid"),
            runtime_info_file: dir.path().join("runtime.json"),
        }
    }

    #[test]
    fn status_reports_own_process_as_running() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir);
        assert!(matches!(status(&files).unwrap(), ServerStatus::Stopped));

        let info = RuntimeInfo {
            pid: std::process::id(),
            version: PKG_VERSION.to_string(),
            stdio: false,
            http_addr: Some("127.0.0.1:9".into()),
            data_dir: "/tmp".into(),
            started_at: Utc::now(),
        };
        write_runtime_files(&files, &info).unwrap();
        match status(&files).unwrap() {
            ServerStatus::Running(read) => assert_eq!(read.pid, info.pid),
            _ => panic!("expected running"),
        }
        remove_runtime_files(&files);
        assert!(!files.pid_file.exists());
    }

    #[test]
    fn shutdown_without_pid_file_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        assert_eq!(shutdown(&files(&dir)).unwrap(), None);
    }
}
