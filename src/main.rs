mod app;
mod config;
mod context;
mod document;
mod filter;
mod geometry;
mod history;
mod input;
mod logging;
mod models;
mod network;
mod popover;
mod prompts;
mod proximity;
mod session;
mod store;
mod theme;
mod ui;
mod utils;

use std::io::{self, Stdout};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, prelude::CrosstermBackend};
use tokio::runtime::Runtime;

use crate::app::App;
use crate::config::Settings;
use crate::document::Document;
use crate::filter::normalize_host;
use crate::history::HistoryEntry;
use crate::models::{Language, Request};
use crate::network::{Dispatcher, OpenAiClient};
use crate::store::Store;
use crate::utils::now_millis;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Text file to read; select a word with the mouse and hover to define it.
    file: Option<PathBuf>,

    /// Site name used for exclusions (defaults to the file name).
    #[arg(long)]
    host: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a file in the reader
    Read {
        file: PathBuf,
        #[arg(long)]
        host: Option<String>,
    },
    /// Define a word or phrase
    Define {
        text: String,
        #[arg(long, default_value = "")]
        context: String,
        /// en, es or pt
        #[arg(long, value_parser = parse_language)]
        lang: Option<Language>,
    },
    /// Translate text
    Translate {
        text: String,
        #[arg(long, value_parser = parse_language, default_value = "es")]
        to: Language,
    },
    /// Ask a custom question about some text
    Ask {
        prompt: String,
        text: String,
        #[arg(long, default_value = "")]
        context: String,
    },
    /// Past definitions
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Sites where the reader stays quiet
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },
    /// Inspect or edit ~/.config/hoverdef/hoverdef.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List {
        #[arg(long)]
        favorites: bool,
    },
    /// Toggle the favorite flag of entry N (1 is the newest)
    Favorite { index: usize },
    Clear,
}

#[derive(Subcommand, Debug)]
enum ExcludeAction {
    Add { host: String },
    Remove { host: String },
    List,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    /// Set a dotted key, e.g. `trigger.selection_delay 800`
    Set { key: String, value: String },
    SetKey { key: String },
    /// Put the default system prompt back
    RestorePrompt,
    /// Check the API key against the provider
    Check,
}

fn parse_language(raw: &str) -> Result<Language, String> {
    Language::parse(raw).ok_or_else(|| format!("unsupported language '{raw}' (use en, es or pt)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new().context("failed to load settings")?;

    let data_dir = settings.data_dir();
    if let Err(err) = logging::init_logging(&data_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
    let store = Store::open(Store::default_path(&data_dir))?;

    match cli.command {
        None => match cli.file {
            Some(file) => read(file, cli.host, &settings, store),
            None => bail!("nothing to read: pass a file, or see --help"),
        },
        Some(Command::Read { file, host }) => read(file, host, &settings, store),
        Some(Command::Define { text, context, lang }) => {
            let request = Request::Definition {
                text,
                context,
                target_lang: lang,
            };
            ask(&settings, Some(store), request)
        }
        Some(Command::Translate { text, to }) => {
            ask(&settings, None, Request::Translation { text, target: to })
        }
        Some(Command::Ask { prompt, text, context }) => {
            ask(&settings, None, Request::CustomPrompt { prompt, text, context })
        }
        Some(Command::History { action }) => history(store, action.unwrap_or(HistoryAction::List { favorites: false })),
        Some(Command::Exclude { action }) => exclude(store, action),
        Some(Command::Config { action }) => configure(&settings, action),
    }
}

fn read(file: PathBuf, host: Option<String>, settings: &Settings, store: Store) -> anyhow::Result<()> {
    let document = Document::from_file(&file, host.map(|h| normalize_host(&h)))?;
    let runtime = Runtime::new()?;
    let mut app = App::new(document, settings, store, runtime.handle().clone())?;
    tracing::info!(host = app.session.hostname(), file = %file.display(), "reader started");

    terminal::enable_raw_mode()?;
    let mut terminal = setup_or_restore(enter_screen, restore_terminal)?;

    let result = app::run(&mut terminal, &mut app);

    restore_terminal()?;
    terminal.show_cursor()?;
    result
}

fn enter_screen() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal() -> anyhow::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Runs `setup`; if it fails, `restore` runs before the error is returned.
fn setup_or_restore<T>(
    setup: impl FnOnce() -> anyhow::Result<T>,
    restore: impl FnOnce() -> anyhow::Result<()>,
) -> anyhow::Result<T> {
    setup().or_else(|err| {
        if let Err(restore_err) = restore() {
            tracing::warn!(?restore_err, "could not restore the terminal");
        }
        Err(err)
    })
}

/// One-shot request from the command line.
fn ask(settings: &Settings, store: Option<Store>, request: Request) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_settings(settings)?;
    let runtime = Runtime::new()?;
    let reply = match runtime.block_on(dispatcher.execute(&request)) {
        Ok(reply) => reply,
        Err(err) => bail!("{}", err.user_message()),
    };
    println!("{reply}");

    if let (Some(mut store), Request::Definition { text, .. }) = (store, &request) {
        store.record_history(HistoryEntry::new(text.clone(), reply, now_millis()))?;
    }
    Ok(())
}

fn history(mut store: Store, action: HistoryAction) -> anyhow::Result<()> {
    let mut history = store.history();
    match action {
        HistoryAction::List { favorites } => {
            if history.is_empty() {
                println!("No history yet.");
            }
            let shown: Vec<(usize, &HistoryEntry)> = if favorites {
                history.favorites().collect()
            } else {
                history.entries().iter().enumerate().collect()
            };
            for (index, entry) in shown {
                let star = if entry.favorite { "*" } else { " " };
                println!("{:>3}{star} {}  {}", index + 1, entry.formatted_time(), entry.text);
                println!("      {}", entry.definition);
            }
        }
        HistoryAction::Favorite { index } => {
            let Some(favorite) = index.checked_sub(1).and_then(|i| history.toggle_favorite(i)) else {
                bail!("no history entry {index}");
            };
            store.set_history(&history)?;
            println!("Entry {index} {}", if favorite { "marked as favorite" } else { "unmarked" });
        }
        HistoryAction::Clear => {
            history.clear();
            store.set_history(&history)?;
            println!("History cleared.");
        }
    }
    Ok(())
}

fn exclude(mut store: Store, action: ExcludeAction) -> anyhow::Result<()> {
    let mut exclusions = store.exclusions();
    match action {
        ExcludeAction::Add { host } => {
            if exclusions.add(&host) {
                store.set_exclusions(&exclusions)?;
            }
            println!("{} excluded", normalize_host(&host));
        }
        ExcludeAction::Remove { host } => {
            if exclusions.remove(&host) {
                store.set_exclusions(&exclusions)?;
                println!("{} enabled", normalize_host(&host));
            } else {
                println!("{} was not excluded", normalize_host(&host));
            }
        }
        ExcludeAction::List => {
            for host in exclusions.iter() {
                println!("{host}");
            }
        }
    }
    Ok(())
}

fn configure(settings: &Settings, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => print!("{}", settings.to_display_toml()?),
        ConfigAction::Set { key, value } => {
            config::save_setting(&key, &value)?;
            println!("{key} saved");
        }
        ConfigAction::SetKey { key } => {
            config::save_api_key(&key)?;
            println!("API key saved");
        }
        ConfigAction::RestorePrompt => {
            config::restore_default_prompt()?;
            println!("Default system prompt restored");
        }
        ConfigAction::Check => {
            let client = OpenAiClient::from_settings(settings)?;
            let runtime = Runtime::new()?;
            match runtime.block_on(client.test_connection()) {
                Ok(()) => println!("Connection OK ({})", settings.model),
                Err(err) => bail!("{}", err.user_message()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn failed_terminal_setup_still_restores() {
        let restored = Cell::new(false);
        let result: anyhow::Result<()> = setup_or_restore(
            || bail!("alternate screen unavailable"),
            || {
                restored.set(true);
                Ok(())
            },
        );

        assert!(result.is_err());
        assert!(restored.get());
    }

    #[test]
    fn successful_setup_leaves_the_terminal_alone() {
        let restored = Cell::new(false);
        let value = setup_or_restore(
            || Ok(7),
            || {
                restored.set(true);
                Ok(())
            },
        )
        .expect("setup succeeds");

        assert_eq!(value, 7);
        assert!(!restored.get());
    }
}
