//! Line-oriented console front end.
//!
//! Parses user input into commands, applies them to the session and
//! redraws the status line whenever the session changes.

use std::{io::Write, result::Result as StdResult, str::FromStr, sync::Arc};

use {async_trait::async_trait, thiserror::Error, tracing::warn};

use crate::{
    audio::AudioEngine,
    error::Result,
    library::Playlist,
    playback::SessionController,
    state::{SessionEvent, SessionSnapshot, StateObserver},
    ui::view::PlayerView,
};

/// Input that could not be turned into a command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// The line held only whitespace.
    #[error("Empty command")]
    Empty,
    /// The command word is not recognized.
    #[error("Unknown command: {0}")]
    Unknown(String),
    /// A command is missing its argument.
    #[error("Missing argument for '{command}'")]
    MissingArgument { command: &'static str },
    /// A track number is not a positive integer.
    #[error("Invalid track number: {0}")]
    InvalidTrackNumber(String),
    /// A track id is not an integer.
    #[error("Invalid track id: {0}")]
    InvalidTrackId(String),
    /// `loop` got something other than `on` or `off`.
    #[error("Expected 'on' or 'off', got: {0}")]
    InvalidLoopMode(String),
}

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Select a track by its 0-based playlist index.
    Select(usize),
    /// Select a track by its id.
    Track(i64),
    Toggle,
    Next,
    Previous,
    Loop(bool),
    List,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    /// Parses one input line. Track numbers are 1-based as shown on screen.
    fn from_str(line: &str) -> StdResult<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Empty);
        };

        match word.to_ascii_lowercase().as_str() {
            "select" | "s" => {
                let number = words.next().ok_or(CommandError::MissingArgument {
                    command: "select",
                })?;
                number
                    .parse::<usize>()
                    .ok()
                    .and_then(|number| number.checked_sub(1))
                    .map(Self::Select)
                    .ok_or_else(|| CommandError::InvalidTrackNumber(number.to_string()))
            }
            "track" | "t" => {
                let id = words.next().ok_or(CommandError::MissingArgument {
                    command: "track",
                })?;
                id.parse::<i64>()
                    .map(Self::Track)
                    .map_err(|_| CommandError::InvalidTrackId(id.to_string()))
            }
            "toggle" | "p" => Ok(Self::Toggle),
            "next" | "n" => Ok(Self::Next),
            "prev" | "previous" | "b" => Ok(Self::Previous),
            "loop" => match words.next() {
                Some("on") => Ok(Self::Loop(true)),
                Some("off") => Ok(Self::Loop(false)),
                Some(other) => Err(CommandError::InvalidLoopMode(other.to_string())),
                None => Err(CommandError::MissingArgument { command: "loop" }),
            },
            "list" | "ls" => Ok(Self::List),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

impl ConsoleCommand {
    /// Applies a session command to `controller`.
    ///
    /// `List` and `Quit` are handled by the caller and do nothing here.
    ///
    /// # Errors
    ///
    /// Whatever the corresponding controller operation returns.
    pub async fn apply<E: AudioEngine>(self, controller: &SessionController<E>) -> Result<()> {
        match self {
            Self::Select(index) => controller.select(index).await,
            Self::Track(id) => controller.select_track(id).await,
            Self::Toggle => controller.toggle_play_pause().await,
            Self::Next => controller.next().await,
            Self::Previous => controller.previous().await,
            Self::Loop(looping) => controller.set_looping(looping).await,
            Self::List | Self::Quit => Ok(()),
        }
    }

    /// Short name used in log records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::Track(_) => "track",
            Self::Toggle => "toggle",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::Loop(_) => "loop",
            Self::List => "list",
            Self::Quit => "quit",
        }
    }
}

/// Help text listing the accepted commands.
pub const HELP: &str = "Commands: select <n>, track <id>, toggle (p), next (n), \
                        prev (b), loop on|off, list, quit (q)";

/// Session observer that writes status lines to a text sink.
pub struct ConsoleRenderer<W: Write + Send + 'static> {
    playlist: Arc<Playlist>,
    out: W,
    last_line: Option<String>,
}

impl<W: Write + Send + 'static> ConsoleRenderer<W> {
    /// Creates a renderer for `playlist` writing to `out`.
    pub fn new(playlist: Arc<Playlist>, out: W) -> Self {
        Self {
            playlist,
            out,
            last_line: None,
        }
    }

    /// Consumes the renderer, returning its sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes the full view: every row and the status line.
    pub fn draw_full(&mut self, snapshot: &SessionSnapshot) {
        let rendered = PlayerView::project(&self.playlist, snapshot).render();
        self.write_line(&rendered);
    }

    fn write_line(&mut self, line: &str) {
        if let Err(error) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!(error = %error, "Failed to write to console");
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> StateObserver for ConsoleRenderer<W> {
    async fn handle_state_change(&mut self, event: SessionEvent, snapshot: SessionSnapshot) {
        match event {
            SessionEvent::Error(message) => self.write_line(&format!("error: {message}")),
            // Position ticks would flood the terminal.
            SessionEvent::Progress { .. } => {}
            _ => {
                let line = PlayerView::project(&self.playlist, &snapshot).status_line();
                if self.last_line.as_deref() != Some(line.as_str()) {
                    self.write_line(&line);
                    self.last_line = Some(line);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        audio::scripted::ScriptedEngine,
        error::SessionError,
        library::Playlist,
        playback::{SessionConfig, SessionController},
        state::{SessionEvent, SessionPhase, SessionSnapshot, StateObserver, spawn_observer},
        ui::console::{CommandError, ConsoleCommand, ConsoleRenderer},
    };

    #[test]
    fn test_parse_commands() {
        assert_eq!("select 1".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Select(0)));
        assert_eq!("  S 12 ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Select(11)));
        assert_eq!("track 7".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Track(7)));
        assert_eq!("t -3".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Track(-3)));
        assert_eq!("p".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Toggle));
        assert_eq!("toggle".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Toggle));
        assert_eq!("n".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Next));
        assert_eq!("prev".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Previous));
        assert_eq!("b".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Previous));
        assert_eq!("loop on".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Loop(true)));
        assert_eq!("loop off".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Loop(false)));
        assert_eq!("list".parse::<ConsoleCommand>(), Ok(ConsoleCommand::List));
        assert_eq!("QUIT".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<ConsoleCommand>(), Err(CommandError::Empty));
        assert_eq!(
            "dance".parse::<ConsoleCommand>(),
            Err(CommandError::Unknown("dance".to_string()))
        );
        assert_eq!(
            "select".parse::<ConsoleCommand>(),
            Err(CommandError::MissingArgument { command: "select" })
        );
        assert_eq!(
            "select 0".parse::<ConsoleCommand>(),
            Err(CommandError::InvalidTrackNumber("0".to_string()))
        );
        assert_eq!(
            "select -1".parse::<ConsoleCommand>(),
            Err(CommandError::InvalidTrackNumber("-1".to_string()))
        );
        assert_eq!(
            "track one".parse::<ConsoleCommand>(),
            Err(CommandError::InvalidTrackId("one".to_string()))
        );
        assert_eq!(
            "loop maybe".parse::<ConsoleCommand>(),
            Err(CommandError::InvalidLoopMode("maybe".to_string()))
        );
    }

    #[tokio::test]
    async fn test_apply_drives_controller() {
        let engine = ScriptedEngine::new();
        let controller = SessionController::new(
            engine,
            Arc::new(Playlist::builtin()),
            SessionConfig::default(),
        );

        ConsoleCommand::Select(1).apply(&controller).await.unwrap();
        ConsoleCommand::Toggle.apply(&controller).await.unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.current_index, Some(1));
        assert_eq!(snapshot.phase, SessionPhase::ReadyPaused);

        ConsoleCommand::Next.apply(&controller).await.unwrap();
        assert_eq!(controller.snapshot().current_index, Some(0));

        ConsoleCommand::Track(2).apply(&controller).await.unwrap();
        assert_eq!(controller.snapshot().current_index, Some(1));

        ConsoleCommand::List.apply(&controller).await.unwrap();
        assert!(ConsoleCommand::Select(5).apply(&controller).await.is_err());
        assert!(matches!(
            ConsoleCommand::Track(99).apply(&controller).await,
            Err(SessionError::UnknownTrack { id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_renderer_writes_changes_and_errors() {
        let mut renderer = ConsoleRenderer::new(Arc::new(Playlist::builtin()), Vec::new());
        let snapshot = SessionSnapshot {
            phase: SessionPhase::ReadyPlaying,
            current_index: Some(0),
            is_playing: true,
            handle_lease: Some(1),
            ..SessionSnapshot::default()
        };

        renderer
            .handle_state_change(SessionEvent::PhaseChanged(snapshot.phase), snapshot.clone())
            .await;
        renderer
            .handle_state_change(SessionEvent::PlayingChanged(true), snapshot.clone())
            .await;
        renderer
            .handle_state_change(
                SessionEvent::Progress {
                    position_ms: 1_000,
                    duration_ms: None,
                },
                snapshot.clone(),
            )
            .await;
        renderer
            .handle_state_change(SessionEvent::Error("No active track".to_string()), snapshot)
            .await;

        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            output,
            "[||] Now playing: Grease - Artist A  00:00 / --:--\nerror: No active track\n"
        );
    }

    #[tokio::test]
    async fn test_renderer_outputs_final_state_after_shutdown() {
        let playlist = Arc::new(Playlist::builtin());
        let controller = SessionController::new(
            ScriptedEngine::new(),
            Arc::clone(&playlist),
            SessionConfig::default(),
        );
        let renderer_task = spawn_observer(
            controller.state(),
            ConsoleRenderer::new(playlist, Vec::new()),
        );

        controller.select(0).await.unwrap();
        controller.shutdown().await;
        drop(controller);

        let renderer = renderer_task.await.unwrap();
        let output = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            output.lines().last(),
            Some("[>] Nothing selected  00:00 / --:--")
        );
    }
}
