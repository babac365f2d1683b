//! Sentence splitting for speech units.

use serde::Serialize;

/// One sentence queued for synthesis, tagged with its position in the chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UtteranceUnit {
    ordinal: usize,
    text: String,
}

impl UtteranceUnit {
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Split text after `.`, `!` or `?` when the terminator is followed by
/// whitespace. The terminator stays with its sentence; the separating
/// whitespace is trimmed away and blank fragments are dropped.
pub fn segment(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = matches!(ch, '.' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

/// Same as [`segment`], numbering the pieces for the playback controller.
pub fn segment_units(text: &str) -> Vec<UtteranceUnit> {
    segment(text)
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| UtteranceUnit { ordinal, text })
        .collect()
}

fn push_trimmed(sentences: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
