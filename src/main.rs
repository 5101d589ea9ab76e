mod event;

use std::fs;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use narratype::api::client::OfflineApi;
use narratype::api::{ApiEvent, ApiWorker, HttpApi, PracticeApi};
use narratype::config::Config;
use narratype::session::{CharState, SessionEngine};
use narratype::store::preferences::PreferencesPatch;
use narratype::store::{FavoriteSet, JsonFileStore, KeyValueStore, MemoryStore, PreferenceStore};
use narratype::text::{self, TargetText};

use event::{AppEvent, EventHandler};

#[derive(Parser)]
#[command(
    name = "narratype",
    version,
    about = "Typing practice with live speed and accuracy feedback"
)]
struct Cli {
    #[arg(short, long, help = "Id of the server text to practice")]
    text_id: Option<i64>,

    #[arg(short, long, help = "Server API base URL")]
    server: Option<String>,

    #[arg(long, help = "Never contact the server")]
    offline: bool,

    #[arg(long, help = "Practice this text instead of fetching one")]
    text: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if cli.offline {
        config.offline = true;
    }
    config.validate();

    let _log_guard = init_logging(&config);

    let api: Box<dyn PracticeApi + Send> = if config.offline {
        Box::new(OfflineApi)
    } else {
        Box::new(HttpApi::new(&config.server_url, config.request_timeout())?)
    };

    let target = match cli.text {
        Some(content) => TargetText::new(None, "Custom Text", &content),
        None => text::load_text(api.as_ref(), cli.text_id),
    };

    let storage: Rc<dyn KeyValueStore> = match JsonFileStore::with_base_dir(config.data_path()) {
        Ok(store) => Rc::new(store),
        Err(e) => {
            warn!(error = %e, "data directory unavailable, preferences will not persist");
            Rc::new(MemoryStore::new())
        }
    };
    let preferences = Rc::new(PreferenceStore::new(storage.clone()));
    let favorites = FavoriteSet::new(storage);

    let events = EventHandler::new(Duration::from_millis(100));
    let worker = ApiWorker::spawn(api, events.sender());
    let mut engine = SessionEngine::start(target, preferences);
    worker.submit_all(engine.take_effects());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = run(&mut engine, &worker, &events, &favorites);

    execute!(io::stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    if let Some(summary) = engine.session().summary() {
        println!(
            "{}: {} wpm, {}% accuracy, {} errors",
            engine.session().text().title,
            summary.wpm,
            summary.accuracy,
            summary.errors
        );
    }
    // Give the completion request a chance to go out before exiting.
    drop(worker);
    result
}

fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config.data_path();
    fs::create_dir_all(&log_dir).ok()?;
    let file_appender = tracing_appender::rolling::never(&log_dir, "narratype.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn run(
    engine: &mut SessionEngine,
    worker: &ApiWorker,
    events: &EventHandler,
    favorites: &FavoriteSet,
) -> Result<()> {
    let mut dirty = true;
    loop {
        if dirty {
            draw(engine, favorites)?;
            dirty = false;
        }

        match events.next()? {
            AppEvent::Key(key) if key.kind == KeyEventKind::Press => {
                if !handle_key(engine, favorites, key) {
                    return Ok(());
                }
                worker.submit_all(engine.take_effects());
                dirty = true;
            }
            AppEvent::Api(ApiEvent::SessionCreated { token, result }) => {
                engine.on_session_created(token, result);
                dirty = true;
            }
            AppEvent::Api(ApiEvent::SessionCompleted { result, .. }) => {
                if result.is_ok() {
                    info!("server recorded the session");
                }
            }
            AppEvent::Resize => dirty = true,
            AppEvent::Key(_) | AppEvent::Tick => {}
        }
    }
}

/// Translate one key press into an input-widget change. Returns false to quit.
fn handle_key(engine: &mut SessionEngine, favorites: &FavoriteSet, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return false,
        KeyCode::Char('c') if ctrl => return false,
        KeyCode::Char('r') if ctrl => engine.restart(),
        KeyCode::Char('e') if ctrl => {
            let prefs = engine.preferences();
            let highlight = !prefs.get().highlight_errors;
            prefs.update(&PreferencesPatch {
                highlight_errors: Some(highlight),
                ..Default::default()
            });
        }
        KeyCode::Char('f') if ctrl => {
            if let Some(id) = engine.session().text().server_id() {
                favorites.toggle(&id.to_string());
            }
        }
        KeyCode::Char(ch) => {
            let raw = format!("{}{}", engine.session().input(), ch);
            engine.handle_edit(&raw);
        }
        KeyCode::Enter => {
            let raw = format!("{}\n", engine.session().input());
            engine.handle_edit(&raw);
        }
        KeyCode::Backspace => {
            let mut raw = engine.session().input().to_string();
            raw.pop();
            engine.handle_edit(&raw);
        }
        _ => {}
    }
    true
}

fn draw(engine: &SessionEngine, favorites: &FavoriteSet) -> Result<()> {
    let mut out = io::stdout();
    let session = engine.session();
    let prefs = engine.preferences().get();
    let (width, _) = terminal::size()?;
    let width = width.max(20) as usize;

    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    let mut row: u16 = 0;

    if prefs.show_title {
        let star = match session.text().server_id() {
            Some(id) if favorites.is_favorited(&id.to_string()) => " *",
            _ => "",
        };
        queue!(out, MoveTo(0, row), Print(format!("{}{}", session.text().title, star)))?;
        row += 2;
    }

    if prefs.show_stats {
        let metrics = session.metrics();
        queue!(
            out,
            MoveTo(0, row),
            Print(format!(
                "WPM: {}  Accuracy: {}%  Errors: {}",
                metrics.wpm,
                metrics.display_accuracy(),
                session.error_count()
            ))
        )?;
        row += 1;
    }

    if prefs.show_progress {
        let filled = (session.progress() * (width - 2) as f64) as usize;
        queue!(
            out,
            MoveTo(0, row),
            Print(format!("[{}{}]", "#".repeat(filled), " ".repeat(width - 2 - filled)))
        )?;
        row += 1;
    }
    row += 1;

    let mut col = 0;
    queue!(out, MoveTo(0, row))?;
    for (ch, state) in session.char_states() {
        match state {
            CharState::Typed => queue!(out, SetForegroundColor(Color::Green))?,
            CharState::Cursor => queue!(
                out,
                SetBackgroundColor(Color::White),
                SetForegroundColor(Color::Black)
            )?,
            CharState::Pending => queue!(out, SetForegroundColor(Color::DarkGrey))?,
        }
        if ch == '\n' || col >= width {
            row += 1;
            col = 0;
            queue!(out, ResetColor, MoveTo(0, row))?;
            if ch == '\n' {
                continue;
            }
        }
        queue!(out, Print(ch), ResetColor)?;
        col += 1;
    }

    row += 2;
    let footer = if session.is_complete() {
        "Practice complete! Ctrl-R to try again, Esc to quit"
    } else {
        "Esc quit | Ctrl-R restart | Ctrl-E toggle error counting | Ctrl-F favorite"
    };
    queue!(out, MoveTo(0, row), Print(footer))?;

    out.flush()?;
    Ok(())
}
