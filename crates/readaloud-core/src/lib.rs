//! Core of the read-aloud player.
//!
//! The crate owns everything that does not touch an audio device:
//! - `segmenter` turns chapter prose into ordered utterance units.
//! - `playback` drives a speech engine over those units one at a time.
//! - `chapter_source` resolves chapter ids to plain text through the `epub` crate.
//! - `session` is the command surface a front end talks to.
//!
//! Speech engines live behind the `speech::SpeechEngine` trait so the
//! controller can be exercised without a sound card.

pub mod cancellation;
pub mod chapter_source;
pub mod config;
pub mod error;
pub mod playback;
pub mod segmenter;
pub mod session;
pub mod speech;
pub mod wav;

pub use chapter_source::{ChapterInfo, ChapterSource, EpubChapterSource};
pub use error::{ChapterError, ConfigError, PlaybackIssue, SpeechError};
pub use playback::{PlaybackController, PlaybackState, PlaybackStatus, PlaybackUpdate};
pub use segmenter::{UtteranceUnit, segment, segment_units};
pub use session::{ReadAloudSession, ReaderSnapshot, SessionCommand, SessionEvent};
pub use speech::{EventNotifier, SpeechEngine, SpeechEvent, SpeechOutcome, SpeechRequest, SpeechTicket};
