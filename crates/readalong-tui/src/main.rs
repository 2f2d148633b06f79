mod app;
mod handler;
#[cfg(test)]
mod test_support;
mod tui;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use log::{error, info, warn};
use readalong_core::{fetch_library, Config, DataSource, FileStorage, Library, Navigator};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::{self, File};
use std::path::PathBuf;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "readalong", version, about = "Read scripture along with an auto-scrolling text")]
struct Args {
    /// Library JSON: a file path or an http(s) URL
    #[arg(short, long)]
    data: Option<String>,

    /// Initial autoscroll speed (0.1 to 5.0)
    #[arg(short, long)]
    speed: Option<f64>,

    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("readalong"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("readalong.log")
}

fn init_logging(args: &Args) {
    let path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };

    if let Ok(log_file) = File::create(&path) {
        let _ = WriteLogger::init(level, log_config, log_file);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config_path = Config::get_config_path().ok();
    let config = match &config_path {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config {}: {:#}", path.display(), e);
            Config::new()
        }),
        None => Config::new(),
    };

    let source = args
        .data
        .as_deref()
        .map(DataSource::parse)
        .unwrap_or_else(|| config.data_source());
    info!("readalong {} starting, data from {}", env!("CARGO_PKG_VERSION"), source);

    let (library, load_error) = match fetch_library(&source).await {
        Ok(library) => (library, None),
        Err(e) => {
            error!("Failed to load library: {}", e);
            (Library::new(), Some(e.to_string()))
        }
    };

    let storage = match FileStorage::open_default() {
        Ok(storage) => storage,
        Err(e) => {
            warn!("No data directory, session will not persist: {:#}", e);
            FileStorage::open(std::env::temp_dir().join("readalong-storage.json"))
        }
    };

    let mut navigator = Navigator::new(library, config.navigator_settings(), Box::new(storage));
    navigator.set_speed(args.speed.unwrap_or_else(|| config.speed()));
    if load_error.is_none() && !navigator.restore() {
        warn!("Library is empty, nothing to read");
    }

    let mut app = App::new(navigator, config_path);
    if let Some(message) = load_error {
        app = app.with_load_error(message);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!("readalong exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // Sleep until the next input or the navigator's next frame/timer,
        // whichever comes first.
        let deadline = app.next_deadline();
        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            _ = sleep_until(deadline) => app.run_due(),
        }
    }

    Ok(())
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}
