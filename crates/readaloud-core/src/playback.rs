//! Sequential read-aloud controller.
//!
//! The controller owns one playback session at a time: the ordered units of
//! the current chapter, the index of the unit being spoken, the pause flag,
//! the rate and the derived progress percentage. It hands units to a
//! [`SpeechEngine`] one by one and only moves forward when the engine's
//! completion event comes back through [`PlaybackController::handle_event`].
//!
//! Every request is tagged with a [`SpeechTicket`] carrying the current
//! generation. Stopping, starting a new chapter or cancelling a suspended
//! unit bumps the generation, so an event that arrives late for a superseded
//! request no longer matches and is dropped.

use crate::error::{ChapterError, PlaybackIssue};
use crate::segmenter::UtteranceUnit;
use crate::speech::{SpeechEngine, SpeechEvent, SpeechOutcome, SpeechRequest, SpeechTicket};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 3.0;
pub const DEFAULT_RATE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Completed,
}

/// What the caller should show in its status line.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Speaking {
        ordinal: usize,
        total: usize,
    },
    Paused {
        ordinal: usize,
        total: usize,
    },
    Finished,
    Stopped,
    Issue(PlaybackIssue),
}

impl PlaybackStatus {
    /// True for failures; "nothing to read" is reported but is not an error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::Issue(
                PlaybackIssue::ChapterLoadFailure(_) | PlaybackIssue::SynthesisFailure { .. }
            )
        )
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "Ready"),
            PlaybackStatus::Loading => write!(f, "Loading chapter..."),
            PlaybackStatus::Speaking { ordinal, total } => {
                write!(f, "Speaking... ({}/{})", ordinal + 1, total)
            }
            PlaybackStatus::Paused { ordinal, total } => {
                write!(f, "Paused ({}/{})", (*ordinal + 1).min(*total), total)
            }
            PlaybackStatus::Finished => write!(f, "Done!"),
            PlaybackStatus::Stopped => write!(f, "Stopped"),
            PlaybackStatus::Issue(issue) => write!(f, "{issue}"),
        }
    }
}

/// Pushed to subscribers after every state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackUpdate {
    pub status: PlaybackStatus,
    pub state: PlaybackState,
    pub progress_pct: f64,
    pub current_index: usize,
    pub unit_count: usize,
    pub rate: f32,
}

type Listener = Box<dyn FnMut(&PlaybackUpdate)>;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: SpeechTicket,
    rate: f32,
}

pub struct PlaybackController<E: SpeechEngine> {
    engine: E,
    units: Vec<UtteranceUnit>,
    current_idx: usize,
    state: PlaybackState,
    pause_requested: bool,
    suspended: bool,
    in_flight: Option<InFlight>,
    rate: f32,
    generation: u64,
    progress_pct: f64,
    status: PlaybackStatus,
    listeners: Vec<Listener>,
}

impl<E: SpeechEngine> PlaybackController<E> {
    pub fn new(engine: E, rate: f32) -> Self {
        Self {
            engine,
            units: Vec::new(),
            current_idx: 0,
            state: PlaybackState::Idle,
            pause_requested: false,
            suspended: false,
            in_flight: None,
            rate: clamp_rate(rate).unwrap_or(DEFAULT_RATE),
            generation: 0,
            progress_pct: 0.0,
            status: PlaybackStatus::Idle,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PlaybackUpdate) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Begin reading `units` from the first one, discarding any previous session.
    pub fn start(&mut self, units: Vec<UtteranceUnit>) {
        self.reset_session();
        self.units = units;

        if self.units.is_empty() {
            info!("Nothing to read; completing immediately");
            self.state = PlaybackState::Completed;
            self.progress_pct = 100.0;
            self.status = PlaybackStatus::Issue(PlaybackIssue::NoContent);
            self.notify();
            return;
        }

        info!(
            units = self.units.len(),
            generation = self.generation,
            rate = self.rate,
            "Starting playback session"
        );
        self.state = PlaybackState::Playing;
        self.request_current();
        self.notify();
    }

    /// Suppress advancement. Engines that can suspend stop mid-unit; others
    /// finish the current unit first.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "Ignoring pause outside of playback");
            return;
        }
        self.pause_requested = true;
        self.state = PlaybackState::Paused;
        if self.in_flight.is_some() {
            self.suspended = self.engine.suspend();
        }
        info!(
            index = self.current_idx,
            suspended = self.suspended,
            "Paused playback"
        );
        self.status = self.paused_status();
        self.notify();
    }

    /// Continue from the current index; never skips or rewinds.
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            debug!(state = ?self.state, "Ignoring resume while not paused");
            return;
        }
        self.pause_requested = false;
        self.state = PlaybackState::Playing;

        match self.in_flight {
            Some(in_flight) if self.suspended => {
                self.suspended = false;
                if (in_flight.rate - self.rate).abs() > f32::EPSILON {
                    debug!(
                        index = self.current_idx,
                        old_rate = in_flight.rate,
                        new_rate = self.rate,
                        "Rate changed while suspended; restarting unit"
                    );
                    self.cancel_in_flight();
                    self.request_current();
                } else {
                    self.engine.resume();
                    self.status = self.speaking_status();
                }
            }
            // Still draining the unit that was playing when pause was hit.
            Some(_) => self.status = self.speaking_status(),
            None => self.request_current(),
        }

        info!(index = self.current_idx, "Resumed playback");
        self.notify();
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            _ => debug!(state = ?self.state, "Nothing to toggle"),
        }
    }

    /// Cancel everything and forget the session.
    pub fn stop(&mut self) {
        self.reset_session();
        self.status = PlaybackStatus::Stopped;
        info!("Stopped playback");
        self.notify();
    }

    /// Set the rate used for the next request. Returns the rate in effect.
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        match clamp_rate(rate) {
            Some(clamped) => {
                self.rate = clamped;
                info!(rate = clamped, "Adjusted speech rate");
                self.notify();
            }
            None => warn!(rate, "Ignoring non-positive speech rate"),
        }
        self.rate
    }

    /// Feed a completion or failure posted by the engine.
    pub fn handle_event(&mut self, event: SpeechEvent) {
        let Some(in_flight) = self.in_flight else {
            debug!(ticket = ?event.ticket, "No unit in flight; dropping event");
            return;
        };
        if event.ticket != in_flight.ticket {
            debug!(
                ticket = ?event.ticket,
                current = ?in_flight.ticket,
                "Ignoring stale speech event"
            );
            return;
        }

        self.in_flight = None;
        self.suspended = false;
        match event.outcome {
            SpeechOutcome::Completed => self.advance(),
            SpeechOutcome::Failed(message) => {
                self.fail_synthesis(event.ticket.ordinal, message);
            }
        }
        self.notify();
    }

    /// Mark that chapter text is being fetched; cancels the running session.
    pub fn begin_loading(&mut self) {
        self.reset_session();
        self.status = PlaybackStatus::Loading;
        self.notify();
    }

    /// Report that the chapter source could not produce text.
    pub fn fail_chapter_load(&mut self, err: ChapterError) {
        warn!("Chapter load failed: {err}");
        self.reset_session();
        self.status = PlaybackStatus::Issue(PlaybackIssue::ChapterLoadFailure(err));
        self.notify();
    }

    pub fn update(&self) -> PlaybackUpdate {
        PlaybackUpdate {
            status: self.status.clone(),
            state: self.state,
            progress_pct: self.progress_pct,
            current_index: self.current_idx,
            unit_count: self.units.len(),
            rate: self.rate,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub fn progress_pct(&self) -> f64 {
        self.progress_pct
    }

    pub fn current_index(&self) -> usize {
        self.current_idx
    }

    pub fn current_unit(&self) -> Option<&UtteranceUnit> {
        self.units.get(self.current_idx)
    }

    pub fn units(&self) -> &[UtteranceUnit] {
        &self.units
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight_ticket(&self) -> Option<SpeechTicket> {
        self.in_flight.map(|in_flight| in_flight.ticket)
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn advance(&mut self) {
        self.current_idx += 1;
        let total = self.units.len();

        if self.current_idx >= total {
            self.current_idx = total;
            self.state = PlaybackState::Completed;
            self.pause_requested = false;
            self.progress_pct = 100.0;
            self.status = PlaybackStatus::Finished;
            info!(units = total, "Playback finished");
            return;
        }

        self.progress_pct = self.current_idx as f64 / total as f64 * 100.0;
        if self.pause_requested {
            debug!(
                index = self.current_idx,
                "Unit finished while paused; holding position"
            );
            self.status = self.paused_status();
            return;
        }
        self.request_current();
    }

    fn request_current(&mut self) {
        let Some(unit) = self.units.get(self.current_idx) else {
            return;
        };
        let ticket = SpeechTicket {
            generation: self.generation,
            ordinal: self.current_idx,
        };
        let request = SpeechRequest {
            ticket,
            text: unit.text().to_string(),
            rate: self.rate,
        };
        debug!(
            index = self.current_idx,
            generation = self.generation,
            rate = self.rate,
            chars = request.text.len(),
            "Requesting synthesis"
        );

        self.in_flight = Some(InFlight {
            ticket,
            rate: self.rate,
        });
        self.status = self.speaking_status();
        if let Err(err) = self.engine.speak(request) {
            self.in_flight = None;
            self.fail_synthesis(ticket.ordinal, err.to_string());
        }
    }

    fn fail_synthesis(&mut self, ordinal: usize, message: String) {
        warn!(ordinal, "Speech synthesis failed: {message}");
        self.reset_session();
        self.status = PlaybackStatus::Issue(PlaybackIssue::SynthesisFailure { ordinal, message });
    }

    fn cancel_in_flight(&mut self) {
        if self.in_flight.take().is_some() {
            self.engine.cancel_all();
        }
        self.suspended = false;
        self.generation = self.generation.wrapping_add(1);
    }

    fn reset_session(&mut self) {
        self.cancel_in_flight();
        self.units.clear();
        self.current_idx = 0;
        self.pause_requested = false;
        self.progress_pct = 0.0;
        self.state = PlaybackState::Idle;
    }

    fn speaking_status(&self) -> PlaybackStatus {
        PlaybackStatus::Speaking {
            ordinal: self.current_idx,
            total: self.units.len(),
        }
    }

    fn paused_status(&self) -> PlaybackStatus {
        PlaybackStatus::Paused {
            ordinal: self.current_idx,
            total: self.units.len(),
        }
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let update = self.update();
        for listener in &mut self.listeners {
            listener(&update);
        }
    }
}

/// Clamp into the supported range; `None` for zero, negative or non-finite input.
pub fn clamp_rate(rate: f32) -> Option<f32> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    Some(rate.clamp(MIN_RATE, MAX_RATE))
}
