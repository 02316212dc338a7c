mod app;
mod cli;
mod handler;
mod logging;
mod tui;
mod ui;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};

use bhojan_core::{ChatCompletionsClient, Config, HistoryStore, Provider};

use crate::app::App;
use crate::cli::{Cli, Commands, HistoryAction};
use crate::tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        None => {
            if let Some(path) = logging::default_log_path() {
                if let Err(e) = logging::init_file(&path) {
                    eprintln!("logging disabled: {:#}", e);
                }
            }
        }
        Some(_) => logging::init_stderr()?,
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("using default config: {:#}", e);
        Config::new()
    });

    if let Some(name) = &cli.provider {
        let provider = Provider::from_str(name)
            .ok_or_else(|| anyhow!("unknown provider '{}' (expected groq, openai or ollama)", name))?;
        if provider != config.provider() {
            config.model = None;
            config.base_url = None;
        }
        config.provider = Some(provider.as_str().to_string());
    }
    if let Some(path) = cli.history_file {
        config.history_file = Some(path);
    }

    let provider = config.provider();
    let mut client = ChatCompletionsClient::from_config(&config, provider);
    if let Some(model) = &cli.model {
        client = client.with_model(model);
    }

    let mut history = HistoryStore::open(config.history_path()?);
    info!(
        provider = provider.as_str(),
        model = client.model(),
        history = %history.path().display(),
        "starting"
    );

    match cli.command {
        None => {
            let mut app = App::new(config, client, history);
            if let Some(model) = &cli.model {
                app = app.with_model_override(model);
            }
            run_tui(app).await
        }
        Some(Commands::Analyze { text, image }) => {
            cli::analyze(&client, &mut history, text, image).await
        }
        Some(Commands::History { action: HistoryAction::List }) => {
            cli::list_history(&history);
            Ok(())
        }
        Some(Commands::History { action: HistoryAction::Clear }) => cli::clear_history(&mut history),
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}
