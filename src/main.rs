use std::io;
use std::time::Duration;

use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod app;
mod audio;
mod cache;
mod config;
mod db;
mod defaults;
mod error;
mod i18n;
mod models;
mod state;
mod storage;
mod tui;
mod view;

use app::App;
use cache::TipCache;
use config::{BackendKind, Config};
use db::Repository;
use error::{AppError, Result};
use models::{Language, NewTip, Situation};
use storage::LocalStore;
use tui::{draw, handle_key_event, AppAction};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load()?;

    // Check for --seed flag (populate an empty local database and exit)
    if args.len() >= 2 && args[1] == "--seed" {
        let repository = open_repository(&config).await?;
        let inserted = repository.seed_defaults().await?;
        println!("Seeded {} tips into {}", inserted, config.db_path);
        return Ok(());
    }

    // Tip administration flags (sqlite backend only)
    if args.len() >= 2 && ADMIN_FLAGS.contains(&args[1].as_str()) {
        let repository = open_repository(&config).await?;
        return run_admin_command(&repository, &args[1..]).await;
    }

    // Check for --clear-cache flag
    if args.len() >= 2 && args[1] == "--clear-cache" {
        let store = LocalStore::new(&config.storage_path);
        TipCache::new(store.clone(), config.cache_ttl()).clear();
        println!("Cleared tip cache in {}", store.path().display());
        return Ok(());
    }

    // Initialize app
    let mut app = App::new(&config).await?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

const ADMIN_FLAGS: [&str; 5] = ["--add", "--show", "--update", "--soft-delete", "--hard-delete"];

async fn open_repository(config: &Config) -> Result<Repository> {
    if config.backend != BackendKind::Sqlite {
        return Err(AppError::Config(
            "tip administration only applies to the sqlite backend".into(),
        ));
    }
    Repository::new(&config.db_path).await
}

fn usage_error(usage: &str) -> AppError {
    AppError::Validation(format!("usage: tip-station {usage}"))
}

async fn run_admin_command(repository: &Repository, args: &[String]) -> Result<()> {
    match args {
        [flag, id, situation, language, content] if flag == "--add" => {
            repository
                .insert_tip(NewTip {
                    id: id.clone(),
                    situation: situation.parse::<Situation>()?,
                    language: language.parse::<Language>()?,
                    content: content.clone(),
                })
                .await?;
            println!("Added tip {}", id);
        }
        [flag, id] if flag == "--show" => {
            let tip = repository.get_tip_details(id).await?;
            let interactions = repository.get_interactions(id).await?;
            println!("{}", serde_json::to_string_pretty(&tip)?);
            println!("{} interactions", interactions.len());
            for interaction in interactions {
                println!(
                    "  {} {} {}",
                    interaction.id,
                    interaction.interaction_type.as_str(),
                    interaction.created_at.to_rfc3339()
                );
            }
        }
        [flag, id, fields] if flag == "--update" => {
            let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(fields)?;
            let tip = repository.update_tip(id, &fields).await?;
            println!("{}", serde_json::to_string_pretty(&tip)?);
        }
        [flag, id] if flag == "--soft-delete" => {
            repository.soft_delete_tip(id).await?;
            println!("Deactivated tip {}", id);
        }
        [flag, id] if flag == "--hard-delete" => {
            repository.hard_delete_tip(id).await?;
            println!("Deleted tip {} and its interactions", id);
        }
        [flag, ..] => {
            let usage = match flag.as_str() {
                "--add" => "--add <id> <situation> <language> <content>",
                "--update" => "--update <id> '<json fields>'",
                other => return Err(usage_error(&format!("{other} <id>"))),
            };
            return Err(usage_error(usage));
        }
        [] => return Err(usage_error("<flag> ...")),
    }
    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    // Show the loading state while tips are fetched
    app.view.is_loading = true;
    terminal.draw(|frame| draw(frame, app))?;
    app.load_tips().await;

    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Expire like confirmation and banner
        app.tick();

        // Poll for completed like requests
        app.poll_like_result();

        // Poll for events with timeout to allow async operations
        if event::poll(Duration::from_millis(100))? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(key, app.show_help)
                }
                Event::FocusLost => Some(AppAction::Visibility(false)),
                Event::FocusGained => Some(AppAction::Visibility(true)),
                _ => None,
            };

            if let Some(action) = action {
                let should_quit = app.handle_action(action).await?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}
