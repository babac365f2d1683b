//! Interactive console: stdin commands in, status lines out.

use readaloud_core::{ChapterInfo, PlaybackUpdate, ReaderSnapshot, SessionCommand};
use serde::Serialize;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Rate change applied by `+` and `-`.
pub const RATE_STEP: f32 = 0.1;

pub const HELP: &str = "\
commands:
  p            toggle play/pause
  play         play (restarts a finished chapter)
  pause        pause
  resume       resume
  s, stop      stop
  n, next      next chapter
  b, prev      previous chapter
  c <id>       open chapter
  say <text>   read the given text
  + / -        speak faster / slower
  rate <r>     set rate (0.1 - 3.0)
  status       show current state
  h, help      show this help
  q, quit      quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Session(SessionCommand),
    AdjustRate(f32),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    Command(ConsoleCommand),
    Closed,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandParseError {
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("not a valid rate: {0}")]
    InvalidRate(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "p" | "toggle" => ConsoleCommand::Session(SessionCommand::TogglePlayPause),
        "play" => ConsoleCommand::Session(SessionCommand::Play),
        "pause" => ConsoleCommand::Session(SessionCommand::Pause),
        "resume" => ConsoleCommand::Session(SessionCommand::Resume),
        "s" | "stop" => ConsoleCommand::Session(SessionCommand::Stop),
        "n" | "next" => ConsoleCommand::Session(SessionCommand::NextChapter),
        "b" | "prev" => ConsoleCommand::Session(SessionCommand::PrevChapter),
        "c" | "chapter" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument("chapter"));
            }
            ConsoleCommand::Session(SessionCommand::OpenChapter {
                chapter_id: rest.to_string(),
            })
        }
        "say" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument("say"));
            }
            ConsoleCommand::Session(SessionCommand::SpeakText {
                text: rest.to_string(),
            })
        }
        "+" | "faster" => ConsoleCommand::AdjustRate(RATE_STEP),
        "-" | "slower" => ConsoleCommand::AdjustRate(-RATE_STEP),
        "rate" => {
            if rest.is_empty() {
                return Err(CommandParseError::MissingArgument("rate"));
            }
            let rate = rest
                .parse::<f32>()
                .map_err(|_| CommandParseError::InvalidRate(rest.to_string()))?;
            ConsoleCommand::Session(SessionCommand::SetRate { rate })
        }
        "status" => ConsoleCommand::Status,
        "h" | "help" | "?" => ConsoleCommand::Help,
        "q" | "quit" | "exit" => ConsoleCommand::Quit,
        _ => return Err(CommandParseError::Unknown(word.to_string())),
    };
    Ok(Some(command))
}

/// Read commands from stdin on a background thread until EOF.
pub fn spawn_stdin_reader(
    forward: impl Fn(ConsoleEvent) + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("readaloud-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("Reading stdin failed: {err}");
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(command)) => {
                        debug!(?command, "Console command");
                        forward(ConsoleEvent::Command(command));
                    }
                    Ok(None) => {}
                    Err(err) => eprintln!("{err}"),
                }
            }
            forward(ConsoleEvent::Closed);
        })
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum OutputLine<'a> {
    Update(&'a PlaybackUpdate),
    Snapshot(&'a ReaderSnapshot),
    Chapters {
        title: &'a str,
        chapters: &'a [ChapterInfo],
    },
}

/// Writes playback status to stdout as text or JSON lines.
#[derive(Debug, Clone, Copy)]
pub struct StatusPrinter {
    json: bool,
}

impl StatusPrinter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print_update(&self, update: &PlaybackUpdate) {
        self.emit(&OutputLine::Update(update), || format_update(update));
    }

    pub fn print_snapshot(&self, snapshot: &ReaderSnapshot) {
        self.emit(&OutputLine::Snapshot(snapshot), || format_snapshot(snapshot));
    }

    pub fn print_chapters(&self, title: &str, chapters: &[ChapterInfo]) {
        self.emit(&OutputLine::Chapters { title, chapters }, || {
            format_chapters(title, chapters)
        });
    }

    fn emit(&self, line: &OutputLine<'_>, text: impl FnOnce() -> String) {
        if self.json {
            match serde_json::to_string(line) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!("Failed to serialize status line: {err}"),
            }
        } else {
            println!("{}", text());
        }
    }
}

fn format_update(update: &PlaybackUpdate) -> String {
    format!(
        "[{:>6.2}%] {} (rate {:.1})",
        update.progress_pct, update.status, update.rate
    )
}

fn format_snapshot(snapshot: &ReaderSnapshot) -> String {
    let chapter = snapshot
        .current_chapter
        .as_deref()
        .and_then(|id| snapshot.chapters.iter().find(|chapter| chapter.id == id))
        .map(|chapter| format!("{} {}", chapter.id, chapter.title))
        .unwrap_or_else(|| "-".to_string());
    let mut out = format!(
        "{}\n  chapter: {}\n  status:  {}\n  progress: {:.2}% ({}/{})\n  rate:    {:.1}",
        snapshot.source_title,
        chapter,
        snapshot.status_text,
        snapshot.progress_pct,
        snapshot.current_index,
        snapshot.unit_count,
        snapshot.rate
    );
    if let Some(text) = &snapshot.current_unit_text {
        out.push_str(&format!("\n  now:     {text}"));
    }
    out
}

fn format_chapters(title: &str, chapters: &[ChapterInfo]) -> String {
    let mut out = format!("{title} ({} chapters)", chapters.len());
    for chapter in chapters {
        out.push_str(&format!("\n{:>4}  {}", chapter.id, chapter.title));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use readaloud_core::{PlaybackState, PlaybackStatus};

    #[test]
    fn short_and_long_forms_parse_to_the_same_command() {
        assert_eq!(
            parse_command("p"),
            Ok(Some(ConsoleCommand::Session(SessionCommand::TogglePlayPause)))
        );
        assert_eq!(parse_command(" STOP "), parse_command("s"));
        assert_eq!(parse_command("next"), parse_command("n"));
        assert_eq!(parse_command("q"), Ok(Some(ConsoleCommand::Quit)));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command("   "), Ok(None));
    }

    #[test]
    fn chapter_and_rate_take_arguments() {
        assert_eq!(
            parse_command("c  7 "),
            Ok(Some(ConsoleCommand::Session(SessionCommand::OpenChapter {
                chapter_id: "7".to_string()
            })))
        );
        assert_eq!(
            parse_command("rate 1.5"),
            Ok(Some(ConsoleCommand::Session(SessionCommand::SetRate { rate: 1.5 })))
        );
        assert_eq!(
            parse_command("c"),
            Err(CommandParseError::MissingArgument("chapter"))
        );
        assert_eq!(
            parse_command("rate fast"),
            Err(CommandParseError::InvalidRate("fast".to_string()))
        );
    }

    #[test]
    fn rate_steps_are_symmetric() {
        assert_eq!(parse_command("+"), Ok(Some(ConsoleCommand::AdjustRate(RATE_STEP))));
        assert_eq!(parse_command("-"), Ok(Some(ConsoleCommand::AdjustRate(-RATE_STEP))));
    }

    #[test]
    fn unknown_words_are_reported() {
        assert_eq!(
            parse_command("dance"),
            Err(CommandParseError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn update_line_shows_progress_status_and_rate() {
        let update = PlaybackUpdate {
            status: PlaybackStatus::Speaking {
                ordinal: 1,
                total: 3,
            },
            state: PlaybackState::Playing,
            progress_pct: 33.333,
            current_index: 1,
            unit_count: 3,
            rate: 1.0,
        };
        assert_eq!(format_update(&update), "[ 33.33%] Speaking... (2/3) (rate 1.0)");

        let json = serde_json::to_value(OutputLine::Update(&update)).expect("serialize");
        assert_eq!(json["kind"], "update");
        assert_eq!(json["state"], "playing");
        assert_eq!(json["unit_count"], 3);
    }

    #[test]
    fn chapter_listing_is_numbered() {
        let chapters = vec![
            ChapterInfo {
                index: 0,
                id: "1".to_string(),
                title: "Opening".to_string(),
            },
            ChapterInfo {
                index: 1,
                id: "2".to_string(),
                title: "Chapter 2".to_string(),
            },
        ];
        assert_eq!(
            format_chapters("Book", &chapters),
            "Book (2 chapters)\n   1  Opening\n   2  Chapter 2"
        );
    }
}
