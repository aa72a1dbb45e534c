//! Songdeck - Playlist Playback Session
//!
//! Console entry point: loads settings, builds the playlist and engine,
//! then reads commands from stdin until `quit` or end of input.

use std::{
    io::{stderr, stdout},
    sync::Arc,
};

use {
    anyhow::Result,
    tokio::io::{AsyncBufReadExt, BufReader, stdin},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use songdeck::{
    audio::{AssetSource, DirectoryAssets, SimulatedEngine, UncheckedAssets},
    config::{SettingsManager, UserSettings},
    error::{ErrorReporter, ResultExt},
    library::Playlist,
    playback::{SessionConfig, SessionController},
    state::spawn_observer,
    ui::{ConsoleCommand, ConsoleRenderer, HELP},
};

/// Main entry point for Songdeck.
#[tokio::main]
async fn main() -> Result<()> {
    let settings_manager = SettingsManager::new().add_context("Failed to load settings")?;
    let settings = settings_manager.get_settings().clone();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with(fmt::layer().with_writer(stderr))
        .init();
    info!(config = ?settings_manager.get_config_path(), "Settings loaded");

    let playlist = Arc::new(load_playlist(&settings));
    info!(tracks = playlist.len(), "Playlist ready");

    let assets: Arc<dyn AssetSource> = match &settings.asset_directory {
        Some(directory) => Arc::new(DirectoryAssets::new(directory)),
        None => Arc::new(UncheckedAssets),
    };
    let engine = SimulatedEngine::from_settings(assets, &settings).with_catalogue(&playlist);
    let controller = SessionController::new(
        Arc::new(engine),
        Arc::clone(&playlist),
        SessionConfig::from(&settings),
    );

    let mut renderer = ConsoleRenderer::new(Arc::clone(&playlist), stdout());
    renderer.draw_full(&controller.snapshot());
    println!("{HELP}");
    let renderer_task = spawn_observer(controller.state(), renderer);

    if settings.looping
        && let Err(error) = controller.set_looping(true).await
        && let Some(message) = ErrorReporter::report_session(&error, "loop")
    {
        eprintln!("error: {message}");
    }

    if let Err(error) = run_console(&controller, &playlist, &settings_manager).await {
        ErrorReporter::error(&error, "console");
        eprintln!("{}", ErrorReporter::to_user_message(&error));
    }

    controller.shutdown().await;
    // The renderer stops once the last controller handle is gone.
    drop(controller);
    if let Err(error) = renderer_task.await {
        warn!(error = %error, "Renderer task failed");
    }
    info!("Goodbye");
    Ok(())
}

/// Loads the playlist named in the settings, or the built-in one.
///
/// A playlist file that cannot be read is reported and replaced by the
/// built-in playlist.
fn load_playlist(settings: &UserSettings) -> Playlist {
    let Some(path) = &settings.playlist_path else {
        return Playlist::builtin();
    };

    let loaded =
        Playlist::from_json_file(path).add_contextf(format_args!("Failed to load playlist {path}"));
    match loaded {
        Ok(playlist) => playlist,
        Err(error) => {
            ErrorReporter::warn(&error, "playlist");
            eprintln!(
                "{}; using the built-in playlist",
                ErrorReporter::to_user_message(&error)
            );
            Playlist::builtin()
        }
    }
}

/// Reads and applies commands until `quit` or end of input.
async fn run_console(
    controller: &SessionController<SimulatedEngine>,
    playlist: &Arc<Playlist>,
    settings_manager: &SettingsManager,
) -> Result<()> {
    let mut lines = BufReader::new(stdin()).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .add_context("Failed to read from stdin")?
    {
        let command = match line.parse::<ConsoleCommand>() {
            Ok(command) => command,
            Err(error) => {
                println!("{error}. {HELP}");
                continue;
            }
        };

        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::List => {
                let mut listing = ConsoleRenderer::new(Arc::clone(playlist), stdout());
                listing.draw_full(&controller.snapshot());
            }
            command => match command.apply(controller).await {
                Ok(()) => {
                    if let ConsoleCommand::Loop(looping) = command
                        && let Err(error) = settings_manager
                            .set_looping(looping)
                            .add_context("Failed to save looping preference")
                    {
                        ErrorReporter::warn(&error, "settings");
                    }
                }
                Err(error) => {
                    if let Some(message) = ErrorReporter::report_session(&error, command.name()) {
                        println!("error: {message}");
                    }
                }
            },
        }
    }
    Ok(())
}
