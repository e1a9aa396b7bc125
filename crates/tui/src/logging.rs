use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Routes tracing output to a daily log file; the terminal belongs to the UI.
/// Returns `None` when no data directory can be resolved.
pub fn init() -> Result<Option<WorkerGuard>> {
    let Some(dirs) = ProjectDirs::from("", "", "qachat") else {
        return Ok(None);
    };
    let dir = dirs.data_local_dir().join("logs");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating log dir {}", dir.display()))?;
    let appender = tracing_appender::rolling::daily(&dir, "qachat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(Some(guard))
}
