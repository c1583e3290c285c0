use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use world_music_map::app::App;
use world_music_map::catalog::Catalog;
use world_music_map::config::Config;
use world_music_map::map::MapRenderer;
use world_music_map::player::Player;
use world_music_map::resolver::SongResolver;
use world_music_map::search::JamendoClient;
use world_music_map::songs::SongTable;
use world_music_map::ui;

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config.log_file)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting world-music-map");

    let runtime = Runtime::new().context("failed to start async runtime")?;

    // The catalog is complete before any UI state exists
    let source = config.catalog_source();
    eprintln!("Loading countries from {source}…");
    let http = reqwest::Client::new();
    let catalog = runtime
        .block_on(Catalog::load(&source, &http))
        .with_context(|| format!("failed to load country catalog from {source}"))?;

    let mut songs = SongTable::builtin()?;
    if let Some(path) = &config.songs {
        songs.merge(SongTable::load_file(path)?);
    }
    info!(songs = songs.len(), "song table ready");

    let search = JamendoClient::with_base_url(config.client_id.clone(), &config.jamendo_url);
    if !search.has_credential() {
        warn!("JAMENDO_CLIENT_ID not set; only curated songs will resolve");
    }
    let resolver = SongResolver::new(songs, search).with_limit(config.search_limit);
    let player = Player::from_command_line(config.player.as_deref());
    info!(launcher = ?player.launcher(), "player ready");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let app = App::new(
        size.width,
        size.height,
        MapRenderer::new(catalog),
        resolver,
        runtime.handle().clone(),
        player,
    );
    let result = run(&mut terminal, app);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    info!("exiting");
    result
}

/// Log to a file; stdout belongs to the UI
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

/// Mouse: wheel zooms at the pointer, drag pans, click selects
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.release(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps; network completions are picked up between frames
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    // Pan with hjkl or arrow keys
                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    // Zoom
                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
                    KeyCode::Char('0') => app.reset_view(),

                    // Quiz
                    KeyCode::Char('s') => app.start_quiz(),
                    KeyCode::Char('v') => app.reveal_answer(),
                    KeyCode::Char('n') => app.next_question(),
                    KeyCode::Char('e') => app.end_quiz(),

                    KeyCode::Char('p') => app.play(),
                    KeyCode::Char('r') => app.retry(),
                    KeyCode::Char('b') => app.map_renderer.toggle_outlines(),

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        app.poll_resolutions();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
