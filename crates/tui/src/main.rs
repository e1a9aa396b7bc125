mod app;
mod events;
mod logging;
mod strings;
mod terminal;
mod theme;
mod ui;

use anyhow::Result;
use providers::groq::GroqConfig;
use terminal::TerminalGuard;
use tracing::info;

fn main() -> Result<()> {
    let _log_guard = logging::init()?;
    let cfg = GroqConfig::load();
    info!(target: "tui", "starting qachat: model={} base_url={}", cfg.model, cfg.base_url);
    let mut app = app::App::new(cfg);
    let mut term = TerminalGuard::new()?;
    let res = events::run(&mut term.terminal, &mut app);
    info!(target: "tui", "exiting");
    res
}
