//! Speech engine contract.
//!
//! An engine accepts one [`SpeechRequest`] at a time and later reports how it
//! went by posting a [`SpeechEvent`] through the [`EventNotifier`] it was
//! built with. Engines never call back into the controller directly; the
//! front end's event loop hands the event over, which keeps the controller
//! single-threaded.

use crate::error::SpeechError;
use serde::Serialize;

/// Identifies one synthesis request: the session generation it belongs to
/// and the ordinal of the unit being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpeechTicket {
    pub generation: u64,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub ticket: SpeechTicket,
    pub text: String,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub ticket: SpeechTicket,
    pub outcome: SpeechOutcome,
}

impl SpeechEvent {
    pub fn completed(ticket: SpeechTicket) -> Self {
        Self {
            ticket,
            outcome: SpeechOutcome::Completed,
        }
    }

    pub fn failed(ticket: SpeechTicket, message: impl Into<String>) -> Self {
        Self {
            ticket,
            outcome: SpeechOutcome::Failed(message.into()),
        }
    }
}

/// Callback an engine uses to hand events to whoever owns the controller.
pub type EventNotifier = Box<dyn Fn(SpeechEvent) + Send + Sync>;

pub trait SpeechEngine {
    /// Start speaking one unit. Returning `Ok` means an event for
    /// `request.ticket` will be posted later unless the unit is cancelled.
    fn speak(&mut self, request: SpeechRequest) -> Result<(), SpeechError>;

    /// Abort the in-flight unit. No event needs to follow.
    fn cancel_all(&mut self);

    /// Suspend the in-flight unit mid-utterance. Engines that cannot do that
    /// return `false` and keep speaking until the unit ends.
    fn suspend(&mut self) -> bool {
        false
    }

    /// Continue a unit previously suspended with [`SpeechEngine::suspend`].
    fn resume(&mut self) {}
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn speak(&mut self, request: SpeechRequest) -> Result<(), SpeechError> {
        (**self).speak(request)
    }

    fn cancel_all(&mut self) {
        (**self).cancel_all()
    }

    fn suspend(&mut self) -> bool {
        (**self).suspend()
    }

    fn resume(&mut self) {
        (**self).resume()
    }
}
