//! Caller-facing reader session: chapter navigation plus playback commands.

use crate::chapter_source::{ChapterInfo, ChapterSource};
use crate::playback::{PlaybackController, PlaybackState, PlaybackStatus, PlaybackUpdate};
use crate::segmenter::segment_units;
use crate::speech::{SpeechEngine, SpeechEvent};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct ReaderSnapshot {
    pub source_title: String,
    pub chapters: Vec<ChapterInfo>,
    pub current_chapter: Option<String>,
    pub state: PlaybackState,
    pub status: PlaybackStatus,
    pub status_text: String,
    pub current_index: usize,
    pub unit_count: usize,
    pub current_unit_text: Option<String>,
    pub progress_pct: f64,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    GetSnapshot,
    OpenChapter { chapter_id: String },
    NextChapter,
    PrevChapter,
    SpeakText { text: String },
    Play,
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    SetRate { rate: f32 },
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::OpenChapter { .. } => "reader_open_chapter",
            Self::NextChapter => "reader_next_chapter",
            Self::PrevChapter => "reader_prev_chapter",
            Self::SpeakText { .. } => "reader_speak_text",
            Self::Play => "reader_tts_play",
            Self::Pause => "reader_tts_pause",
            Self::Resume => "reader_tts_resume",
            Self::TogglePlayPause => "reader_tts_toggle_play_pause",
            Self::Stop => "reader_tts_stop",
            Self::SetRate { .. } => "reader_tts_set_rate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
}

pub struct ReadAloudSession<S: ChapterSource, E: SpeechEngine> {
    source: S,
    controller: PlaybackController<E>,
    current_chapter: Option<String>,
    continue_to_next_chapter: bool,
}

impl<S: ChapterSource, E: SpeechEngine> ReadAloudSession<S, E> {
    pub fn new(source: S, engine: E, rate: f32) -> Self {
        Self {
            source,
            controller: PlaybackController::new(engine, rate),
            current_chapter: None,
            continue_to_next_chapter: false,
        }
    }

    /// Roll straight into the following chapter whenever one finishes.
    pub fn with_continue_to_next_chapter(mut self, enabled: bool) -> Self {
        self.continue_to_next_chapter = enabled;
        self
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PlaybackUpdate) + 'static) {
        self.controller.subscribe(listener);
    }

    pub fn controller(&self) -> &PlaybackController<E> {
        &self.controller
    }

    pub fn current_chapter(&self) -> Option<&str> {
        self.current_chapter.as_deref()
    }

    /// Load a chapter's text and start reading it from the first unit.
    pub fn open_chapter(&mut self, chapter_id: &str) {
        self.controller.begin_loading();
        self.current_chapter = self.source.resolve(chapter_id).map(|chapter| chapter.id.clone());
        info!(chapter = chapter_id, "Loading chapter");

        match self.source.load_chapter_text(chapter_id) {
            Ok(text) => {
                let units = segment_units(&text);
                debug!(chapter = chapter_id, units = units.len(), "Segmented chapter");
                self.controller.start(units);
            }
            Err(err) => self.controller.fail_chapter_load(err),
        }
    }

    /// Open the first spine entry, if the book has any.
    pub fn open_first_chapter(&mut self) {
        if let Some(first) = self.source.chapters().first().map(|chapter| chapter.id.clone()) {
            self.open_chapter(&first);
        }
    }

    /// Read arbitrary text outside of any chapter.
    pub fn start_text(&mut self, text: &str) {
        self.current_chapter = None;
        self.controller.start(segment_units(text));
    }

    pub fn next_chapter(&mut self) -> bool {
        let next = match self.current_position() {
            Some(index) => self.source.chapters().get(index + 1),
            None => self.source.chapters().first(),
        };
        match next.map(|chapter| chapter.id.clone()) {
            Some(id) => {
                self.open_chapter(&id);
                true
            }
            None => {
                debug!("Already at the last chapter");
                false
            }
        }
    }

    pub fn prev_chapter(&mut self) -> bool {
        let prev = self
            .current_position()
            .and_then(|index| index.checked_sub(1))
            .and_then(|index| self.source.chapters().get(index))
            .map(|chapter| chapter.id.clone());
        match prev {
            Some(id) => {
                self.open_chapter(&id);
                true
            }
            None => {
                debug!("Already at the first chapter");
                false
            }
        }
    }

    /// Resume a paused session, or restart the current chapter once it has
    /// finished or been stopped.
    pub fn play(&mut self) {
        match self.controller.state() {
            PlaybackState::Paused => self.controller.resume(),
            PlaybackState::Playing => debug!("Already playing"),
            PlaybackState::Idle | PlaybackState::Completed => {
                if let Some(chapter) = self.current_chapter.clone() {
                    self.open_chapter(&chapter);
                } else {
                    debug!("No chapter selected to play");
                }
            }
        }
    }

    /// Route an engine event to the controller; a chapter that finishes
    /// cleanly may hand over to the next one.
    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        self.controller.handle_event(event);
        if self.continue_to_next_chapter
            && self.controller.state() == PlaybackState::Completed
            && *self.controller.status() == PlaybackStatus::Finished
            && self.has_next_chapter()
        {
            info!("Chapter finished; continuing with the next one");
            self.next_chapter();
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::OpenChapter { chapter_id } => self.open_chapter(&chapter_id),
            SessionCommand::NextChapter => {
                self.next_chapter();
            }
            SessionCommand::PrevChapter => {
                self.prev_chapter();
            }
            SessionCommand::SpeakText { text } => self.start_text(&text),
            SessionCommand::Play => self.play(),
            SessionCommand::Pause => self.controller.pause(),
            SessionCommand::Resume => self.controller.resume(),
            SessionCommand::TogglePlayPause => self.controller.toggle_play_pause(),
            SessionCommand::Stop => self.controller.stop(),
            SessionCommand::SetRate { rate } => {
                self.controller.set_rate(rate);
            }
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let status = self.controller.status().clone();
        ReaderSnapshot {
            source_title: self.source.title().to_string(),
            chapters: self.source.chapters().to_vec(),
            current_chapter: self.current_chapter.clone(),
            state: self.controller.state(),
            status_text: status.to_string(),
            status,
            current_index: self.controller.current_index(),
            unit_count: self.controller.units().len(),
            current_unit_text: self
                .controller
                .current_unit()
                .map(|unit| unit.text().to_string()),
            progress_pct: (self.controller.progress_pct() * 1000.0).round() / 1000.0,
            rate: self.controller.rate(),
        }
    }

    fn current_position(&self) -> Option<usize> {
        let id = self.current_chapter.as_deref()?;
        self.source.resolve(id).map(|chapter| chapter.index)
    }

    fn has_next_chapter(&self) -> bool {
        self.current_position()
            .is_some_and(|index| index + 1 < self.source.chapters().len())
    }
}
