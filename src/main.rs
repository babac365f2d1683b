//! Entry point for readaloud.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments and load `conf/config.toml`.
//! - Open the book through the core chapter source.
//! - Wire the audio worker, stdin and Ctrl+C into one event channel and feed
//!   every event to the read-aloud session on this thread.

mod cli;
mod console;
mod tts;
mod voice;

use crate::cli::Cli;
use crate::console::{ConsoleCommand, ConsoleEvent, HELP, StatusPrinter};
use crate::tts::{AudioSpeechEngine, OutputTarget};
use anyhow::{Context, Result};
use clap::Parser;
use readaloud_core::config::{AppConfig, load_config};
use readaloud_core::{
    ChapterSource, EpubChapterSource, PlaybackState, ReadAloudSession, SessionCommand, SpeechEvent,
};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// Everything the main loop reacts to.
enum AppEvent {
    Speech(SpeechEvent),
    Console(ConsoleEvent),
    Interrupted,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = Cli::parse();
    if !cli.book.exists() {
        anyhow::bail!("File not found: {}", cli.book.display());
    }

    let mut config = load_config(&cli.config);
    cli.apply_overrides(&mut config);
    let config = config.sanitized();
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %cli.book.display(),
        level = %config.log_level,
        "Starting readaloud"
    );

    let source = EpubChapterSource::open(&cli.book)
        .with_context(|| format!("Opening {}", cli.book.display()))?;
    let printer = StatusPrinter::new(cli.json);
    if cli.list {
        printer.print_chapters(source.title(), source.chapters());
        return Ok(());
    }

    voice::configure_espeak_data(Path::new(&config.tts_espeak_path));
    info!(
        engine = %config.tts_engine,
        model = %config.tts_model_path,
        espeak_voice = %config.espeak_voice,
        rate = config.tts_rate,
        volume = config.tts_volume,
        "Active TTS configuration"
    );

    let (tx, rx) = mpsc::channel::<AppEvent>();
    let engine = spawn_engine(&cli, &config, tx.clone())?;
    let mut session = ReadAloudSession::new(source, engine, config.tts_rate)
        .with_continue_to_next_chapter(config.continue_to_next_chapter);
    session.subscribe(move |update| printer.print_update(update));

    let interrupt_tx = tx.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping playback");
        let _ = interrupt_tx.send(AppEvent::Interrupted);
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }
    let console_tx = tx.clone();
    console::spawn_stdin_reader(move |event| {
        let _ = console_tx.send(AppEvent::Console(event));
    })
    .context("Spawning stdin reader")?;
    drop(tx);

    match cli.chapter.as_deref() {
        Some(chapter) => session.open_chapter(chapter),
        None => session.open_first_chapter(),
    }
    if !cli.stay && is_finished(&session) {
        return finish(&session);
    }

    let mut stdin_open = true;
    while let Ok(event) = rx.recv() {
        match event {
            AppEvent::Speech(event) => {
                session.handle_speech_event(event);
                if !cli.stay && is_finished(&session) {
                    break;
                }
                if !stdin_open && !keeps_running(session.controller().state()) {
                    break;
                }
            }
            AppEvent::Console(ConsoleEvent::Command(command)) => {
                if !dispatch(&mut session, command, printer) {
                    break;
                }
            }
            AppEvent::Console(ConsoleEvent::Closed) => {
                stdin_open = false;
                let state = session.controller().state();
                if !keeps_running(state) {
                    info!(?state, "Stdin closed with nothing playing; exiting");
                    break;
                }
                info!("Stdin closed; playing until the chapter ends");
            }
            AppEvent::Interrupted => break,
        }
    }

    session.apply_command(SessionCommand::Stop);
    finish(&session)
}

fn spawn_engine(
    cli: &Cli,
    config: &AppConfig,
    tx: mpsc::Sender<AppEvent>,
) -> Result<AudioSpeechEngine> {
    let target = match &cli.export {
        Some(dir) => OutputTarget::Directory(dir.clone()),
        None => OutputTarget::Speakers {
            volume: config.tts_volume,
            pause_after: Duration::from_secs_f32(config.pause_after_sentence),
        },
    };
    AudioSpeechEngine::spawn(
        voice::voice_factory(config),
        target,
        Box::new(move |event| {
            let _ = tx.send(AppEvent::Speech(event));
        }),
    )
}

/// Apply one console command; returns `false` when the user asked to quit.
fn dispatch<S: ChapterSource>(
    session: &mut ReadAloudSession<S, AudioSpeechEngine>,
    command: ConsoleCommand,
    printer: StatusPrinter,
) -> bool {
    match command {
        ConsoleCommand::Session(command) => {
            session.apply_command(command);
        }
        ConsoleCommand::AdjustRate(step) => {
            let rate = session.controller().rate() + step;
            session.apply_command(SessionCommand::SetRate { rate });
        }
        ConsoleCommand::Status => printer.print_snapshot(&session.snapshot()),
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => return false,
    }
    true
}

/// A session is over once its chapter completed or playback failed.
fn is_finished<S: ChapterSource>(session: &ReadAloudSession<S, AudioSpeechEngine>) -> bool {
    let controller = session.controller();
    controller.state() == PlaybackState::Completed || controller.status().is_error()
}

/// Without stdin only audio still in progress can keep the process alive.
fn keeps_running(state: PlaybackState) -> bool {
    matches!(state, PlaybackState::Playing | PlaybackState::Paused)
}

fn finish<S: ChapterSource>(session: &ReadAloudSession<S, AudioSpeechEngine>) -> Result<()> {
    let status = session.controller().status();
    if status.is_error() {
        anyhow::bail!("{status}");
    }
    info!(%status, "Exiting");
    Ok(())
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_stdin_only_waits_on_active_playback() {
        assert!(keeps_running(PlaybackState::Playing));
        assert!(keeps_running(PlaybackState::Paused));
        assert!(!keeps_running(PlaybackState::Idle));
        assert!(!keeps_running(PlaybackState::Completed));
    }
}
